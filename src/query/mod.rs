//! Catalog querying: criteria, URL building, and paginated traversal.
//!
//! A query runs strictly sequentially: each page's URL is only known once
//! the previous page has been parsed, so there is no page prefetching.
//! The whole operation fails on the first bad page — no retries, and
//! results accumulated before the failure are discarded.
//!
//! # Example
//!
//! ```no_run
//! use mundi::progress::NullProgress;
//! use mundi::query::{CatalogClient, SearchCriteria};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CatalogClient::new();
//! let criteria = SearchCriteria::new("Sentinel1")
//!     .product_type("SLC")
//!     .start_date("2020-01-01")
//!     .end_date("2020-01-31");
//! let products = client.query(&criteria, &NullProgress).await?;
//! for product in &products {
//!     println!("{:?} -> {:?}", product.field("title"), product.link);
//! }
//! # Ok(())
//! # }
//! ```

mod builder;
mod error;
mod geometry;
mod mappings;
mod parser;

use std::collections::BTreeMap;

use tracing::{debug, info, instrument};

pub use builder::DateValue;
pub use error::QueryError;
pub use geometry::Geometry;
pub use mappings::{DEFAULT_MAPPING, Mapping, mapping_for};
pub use parser::{Feed, ProductRecord, XmlValue};

use crate::progress::ProgressReporter;

/// Default Mundi catalog search endpoint.
pub const DEFAULT_CATALOG_URL: &str =
    "https://catalog-browse.default.mundiwebservices.com/acdc/catalog/proxy/search";

/// Search criteria for one catalog query.
///
/// Built with chained setters; unset criteria are simply omitted from the
/// query string. Extra parameters are appended in insertion order and
/// override computed parameters on key collision.
#[derive(Debug, Clone)]
pub struct SearchCriteria {
    pub(crate) satellite: String,
    pub(crate) product_type: Option<String>,
    pub(crate) start_date: Option<DateValue>,
    pub(crate) end_date: Option<DateValue>,
    pub(crate) geometry: Option<Geometry>,
    pub(crate) extra: Vec<(String, String)>,
}

impl SearchCriteria {
    /// Creates criteria for a satellite, e.g. `Sentinel1`, `Sentinel2`.
    #[must_use]
    pub fn new(satellite: impl Into<String>) -> Self {
        Self {
            satellite: satellite.into(),
            product_type: None,
            start_date: None,
            end_date: None,
            geometry: None,
            extra: Vec::new(),
        }
    }

    /// Sets the product type, e.g. `SLC`, `GRD`, `L1C`. Also selects the
    /// list-mode field mapping.
    #[must_use]
    pub fn product_type(mut self, product_type: impl Into<String>) -> Self {
        self.product_type = Some(product_type.into());
        self
    }

    /// Only match products sensed on or after this date.
    #[must_use]
    pub fn start_date(mut self, date: impl Into<DateValue>) -> Self {
        self.start_date = Some(date.into());
        self
    }

    /// Only match products sensed on or before this date. A date at exact
    /// midnight means "through the end of that day".
    #[must_use]
    pub fn end_date(mut self, date: impl Into<DateValue>) -> Self {
        self.end_date = Some(date.into());
        self
    }

    /// Restrict the search to an area.
    #[must_use]
    pub fn geometry(mut self, geometry: impl Into<Geometry>) -> Self {
        self.geometry = Some(geometry.into());
        self
    }

    /// Adds a free-form query parameter. Overrides a computed parameter
    /// (`timeStart`, `timeEnd`, `geometry`) with the same key.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }
}

/// Client for the catalog search API.
///
/// Wraps a pooled `reqwest` client; create once and reuse across queries.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for CatalogClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogClient {
    /// Creates a client against the default Mundi endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_CATALOG_URL)
    }

    /// Creates a client against a custom endpoint (mirrors, tests).
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Runs a query and returns the normalized online products across all
    /// pages (list mode).
    ///
    /// The field mapping is selected by the criteria's product type, with
    /// a fallback to [`DEFAULT_MAPPING`]. Progress advances one unit per
    /// page.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] on invalid criteria, a non-success page
    /// status, a transport failure, or a malformed feed.
    #[instrument(skip(self, criteria, progress), fields(satellite = %criteria.satellite))]
    pub async fn query(
        &self,
        criteria: &SearchCriteria,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<ProductRecord>, QueryError> {
        let mapping = mapping_for(criteria.product_type.as_deref());
        let mut products = Vec::new();

        self.for_each_page(criteria, progress, |feed| {
            products.extend(feed.records(mapping));
            Ok(())
        })
        .await?;

        info!(count = products.len(), "query complete");
        Ok(products)
    }

    /// Runs a query and returns the online entries as full attribute
    /// trees keyed by product id (dictionary mode).
    ///
    /// A product id seen on an earlier page is kept; later duplicates are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`query`](Self::query), plus
    /// [`QueryError::MissingId`] when an online entry has no id.
    #[instrument(skip(self, criteria, progress), fields(satellite = %criteria.satellite))]
    pub async fn query_index(
        &self,
        criteria: &SearchCriteria,
        progress: &dyn ProgressReporter,
    ) -> Result<BTreeMap<String, XmlValue>, QueryError> {
        let mut products = BTreeMap::new();

        self.for_each_page(criteria, progress, |feed| {
            for (id, value) in feed.indexed_entries()? {
                products.entry(id).or_insert(value);
            }
            Ok(())
        })
        .await?;

        info!(count = products.len(), "query complete");
        Ok(products)
    }

    /// Drives the pagination loop, feeding each parsed page to `collect`.
    async fn for_each_page(
        &self,
        criteria: &SearchCriteria,
        progress: &dyn ProgressReporter,
        mut collect: impl FnMut(&Feed) -> Result<(), QueryError>,
    ) -> Result<(), QueryError> {
        let first_url = builder::build_query(&self.search_url(criteria), criteria)?;
        let mut cursor = Some(first_url);
        let mut first_page = true;

        while let Some(url) = cursor {
            debug!(url = %url, "fetching catalog page");
            let body = self.fetch_page(&url).await?;
            let feed = Feed::parse(&body)?;

            if first_page {
                if let Some(pages) = feed.page_count() {
                    progress.set_total(pages);
                }
                first_page = false;
            }

            collect(&feed)?;
            progress.advance(1);
            cursor = feed.next_link();
        }

        progress.finish();
        Ok(())
    }

    async fn fetch_page(&self, url: &str) -> Result<String, QueryError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| QueryError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::http_status(url, status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| QueryError::network(url, e))
    }

    /// Base search URL with satellite and product type embedded, before
    /// criteria parameters are appended.
    fn search_url(&self, criteria: &SearchCriteria) -> String {
        format!(
            "{}/{}/opensearch?productType={}",
            self.base_url,
            criteria.satellite,
            criteria.product_type.as_deref().unwrap_or_default()
        )
    }
}
