//! Geometry normalization for search criteria.
//!
//! The catalog accepts a WKT polygon as the `geometry` query parameter.
//! Callers may supply either a ready-made WKT string or a structured
//! [`geo_types`] shape; both normalize to canonical WKT here. The two
//! capabilities are explicit variants rather than duck-typed probing, so
//! a malformed string fails loudly instead of being passed through.

use wkt::ToWkt;

use super::error::QueryError;

/// Search-area geometry accepted by [`SearchCriteria`](super::SearchCriteria).
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// An already-canonical WKT polygon string.
    Wkt(String),
    /// A structured shape, converted to WKT during query building.
    Shape(geo_types::Geometry<f64>),
}

impl From<geo_types::Geometry<f64>> for Geometry {
    fn from(shape: geo_types::Geometry<f64>) -> Self {
        Self::Shape(shape)
    }
}

impl From<geo_types::Polygon<f64>> for Geometry {
    fn from(polygon: geo_types::Polygon<f64>) -> Self {
        Self::Shape(polygon.into())
    }
}

impl From<&str> for Geometry {
    fn from(wkt: &str) -> Self {
        Self::Wkt(wkt.to_string())
    }
}

impl From<String> for Geometry {
    fn from(wkt: String) -> Self {
        Self::Wkt(wkt)
    }
}

/// Normalizes a geometry to a canonical WKT string.
///
/// Structured shapes always convert. Plain strings are accepted only when
/// they already look like a WKT polygon (leading/trailing whitespace is
/// ignored).
///
/// # Errors
///
/// Returns [`QueryError::InvalidGeometry`] for strings that are not WKT
/// polygons.
pub fn normalize(geometry: &Geometry) -> Result<String, QueryError> {
    match geometry {
        Geometry::Shape(shape) => Ok(shape.wkt_string()),
        Geometry::Wkt(raw) => {
            let trimmed = raw.trim();
            if trimmed.starts_with("POLYGON (") {
                Ok(trimmed.to_string())
            } else {
                Err(QueryError::invalid_geometry(
                    "geometry must be a WKT polygon string or a structured shape",
                ))
            }
        }
    }
}
