//! Error types for catalog queries.

use thiserror::Error;

/// Errors that can occur while building or running a catalog query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The supplied geometry is neither a WKT polygon string nor a
    /// structured shape.
    #[error("invalid geometry: {detail}")]
    InvalidGeometry {
        /// Why the geometry was rejected.
        detail: String,
    },

    /// A date string could not be parsed.
    #[error("invalid date: {value}")]
    InvalidDate {
        /// The unparsable input.
        value: String,
    },

    /// The catalog returned a non-success HTTP status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The page URL that failed.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Network-level error fetching a catalog page.
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The page URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The feed document is not well-formed XML.
    #[error("malformed feed: {source}")]
    Xml {
        /// The underlying parse error.
        #[source]
        source: quick_xml::Error,
    },

    /// Dictionary-mode aggregation requires every entry to carry an `id`.
    #[error("feed entry has no id element")]
    MissingId,
}

impl QueryError {
    /// Creates an invalid-geometry error.
    pub fn invalid_geometry(detail: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            detail: detail.into(),
        }
    }

    /// Creates an invalid-date error.
    pub fn invalid_date(value: impl Into<String>) -> Self {
        Self::InvalidDate {
            value: value.into(),
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a feed parse error.
    pub fn xml(source: quick_xml::Error) -> Self {
        Self::Xml { source }
    }
}

// No `From<reqwest::Error>` or `From<quick_xml::Error>` impls: the network
// variant needs the page URL for context, and keeping both conversions
// explicit keeps the call sites uniform.
