//! Query URL assembly: date parsing and parameter encoding.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use url::form_urlencoded;

use super::error::QueryError;
use super::geometry;
use super::SearchCriteria;

/// Format used for `timeStart`/`timeEnd` query parameters.
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A date supplied by the caller: either already parsed or an
/// ISO-8601-ish string parsed during query building.
#[derive(Debug, Clone, PartialEq)]
pub enum DateValue {
    /// An already-parsed timestamp.
    Timestamp(NaiveDateTime),
    /// A date or datetime string, parsed by [`parse_date`].
    Text(String),
}

impl From<NaiveDateTime> for DateValue {
    fn from(timestamp: NaiveDateTime) -> Self {
        Self::Timestamp(timestamp)
    }
}

impl From<NaiveDate> for DateValue {
    fn from(date: NaiveDate) -> Self {
        Self::Timestamp(date.and_time(NaiveTime::MIN))
    }
}

impl From<&str> for DateValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for DateValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Parses a date value to second precision (sub-second components are
/// truncated, never rounded).
///
/// Accepted string forms: RFC 3339, `YYYY-MM-DDTHH:MM:SS[.f]`,
/// `YYYY-MM-DD HH:MM:SS[.f]`, and bare `YYYY-MM-DD` (midnight).
///
/// # Errors
///
/// Returns [`QueryError::InvalidDate`] for unparsable strings.
pub fn parse_date(value: &DateValue) -> Result<NaiveDateTime, QueryError> {
    let parsed = match value {
        DateValue::Timestamp(timestamp) => *timestamp,
        DateValue::Text(text) => parse_date_text(text)?,
    };
    Ok(parsed.with_nanosecond(0).unwrap_or(parsed))
}

fn parse_date_text(text: &str) -> Result<NaiveDateTime, QueryError> {
    let trimmed = text.trim();
    if let Ok(with_offset) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Ok(with_offset.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(parsed);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    Err(QueryError::invalid_date(trimmed))
}

/// Extends an end date at exact midnight to 23:59:59 the same day, so a
/// bare date means "through the end of that day".
fn extend_to_end_of_day(end: NaiveDateTime) -> NaiveDateTime {
    if end.time() == NaiveTime::MIN {
        end + TimeDelta::seconds(86_399)
    } else {
        end
    }
}

/// Builds the complete first-page query URL.
///
/// Computed parameters (`timeStart`, `timeEnd`, `geometry`) are emitted
/// only for criteria the caller provided; extra parameters are applied
/// last and override computed ones on key collision. The base URL is
/// assumed to already carry a query separator.
///
/// # Errors
///
/// Returns [`QueryError::InvalidDate`] or [`QueryError::InvalidGeometry`]
/// when a criterion fails to normalize. No network I/O happens here.
pub fn build_query(base_url: &str, criteria: &SearchCriteria) -> Result<String, QueryError> {
    let mut params: Vec<(String, String)> = Vec::new();

    if let Some(start) = &criteria.start_date {
        let start = parse_date(start)?;
        params.push(("timeStart".to_string(), start.format(TIME_FORMAT).to_string()));
    }
    if let Some(end) = &criteria.end_date {
        let end = extend_to_end_of_day(parse_date(end)?);
        params.push(("timeEnd".to_string(), end.format(TIME_FORMAT).to_string()));
    }
    if let Some(geom) = &criteria.geometry {
        params.push(("geometry".to_string(), geometry::normalize(geom)?));
    }

    // Extra parameters win on key collision.
    for (key, value) in &criteria.extra {
        params.retain(|(existing, _)| existing != key);
        params.push((key.clone(), value.clone()));
    }

    if params.is_empty() {
        return Ok(base_url.to_string());
    }

    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish();
    Ok(format!("{base_url}&{encoded}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::query::Geometry;

    const BASE: &str = "https://catalog.example/Sentinel2/opensearch?productType=L1C";

    /// Decodes the query-string tail appended by `build_query`.
    fn decoded_params(url: &str) -> Vec<(String, String)> {
        let (_, tail) = url.split_once("?productType=L1C&").unwrap_or((url, ""));
        form_urlencoded::parse(tail.as_bytes())
            .into_owned()
            .collect()
    }

    fn criteria() -> SearchCriteria {
        SearchCriteria::new("Sentinel2").product_type("L1C")
    }

    #[test]
    fn test_parse_date_truncates_subseconds() {
        let parsed = parse_date(&DateValue::from("2020-01-01T10:30:15.873211")).unwrap();
        assert_eq!(parsed.to_string(), "2020-01-01 10:30:15");
    }

    #[test]
    fn test_parse_date_accepts_rfc3339() {
        let parsed = parse_date(&DateValue::from("2020-06-15T08:00:00Z")).unwrap();
        assert_eq!(parsed.to_string(), "2020-06-15 08:00:00");
    }

    #[test]
    fn test_parse_date_accepts_bare_date() {
        let parsed = parse_date(&DateValue::from("2020-01-01")).unwrap();
        assert_eq!(parsed.to_string(), "2020-01-01 00:00:00");
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        let result = parse_date(&DateValue::from("first of never"));
        assert!(matches!(result, Err(QueryError::InvalidDate { .. })));
    }

    #[test]
    fn test_same_day_range_covers_whole_day() {
        let url = build_query(
            BASE,
            &criteria()
                .start_date("2020-01-01")
                .end_date("2020-01-01"),
        )
        .unwrap();

        let params = decoded_params(&url);
        assert!(params.contains(&("timeStart".into(), "2020-01-01T00:00:00".into())));
        assert!(params.contains(&("timeEnd".into(), "2020-01-01T23:59:59".into())));
    }

    #[test]
    fn test_explicit_end_time_is_kept() {
        let url = build_query(BASE, &criteria().end_date("2020-01-01T12:00:00")).unwrap();
        let params = decoded_params(&url);
        assert!(params.contains(&("timeEnd".into(), "2020-01-01T12:00:00".into())));
    }

    #[test]
    fn test_extra_params_override_computed() {
        let url = build_query(
            BASE,
            &criteria()
                .start_date("2020-01-01")
                .geometry(Geometry::from("POLYGON ((0 0, 1 0, 1 1, 0 0))"))
                .param("timeStart", "2021-05-05T00:00:00")
                .param("geometry", "POLYGON ((5 5, 6 5, 6 6, 5 5))"),
        )
        .unwrap();

        let params = decoded_params(&url);
        assert!(params.contains(&("timeStart".into(), "2021-05-05T00:00:00".into())));
        assert!(params.contains(&("geometry".into(), "POLYGON ((5 5, 6 5, 6 6, 5 5))".into())));
        assert_eq!(
            params.iter().filter(|(key, _)| key == "timeStart").count(),
            1
        );
    }

    #[test]
    fn test_no_criteria_leaves_base_untouched() {
        let url = build_query(BASE, &criteria()).unwrap();
        assert_eq!(url, BASE);
    }

    #[test]
    fn test_geometry_is_encoded_into_query() {
        let url = build_query(
            BASE,
            &criteria().geometry(Geometry::from("POLYGON ((0 0, 1 0, 1 1, 0 0))")),
        )
        .unwrap();
        let params = decoded_params(&url);
        assert!(params.contains(&("geometry".into(), "POLYGON ((0 0, 1 0, 1 1, 0 0))".into())));
    }
}
