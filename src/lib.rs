//! Mundi DIAS Catalog Client
//!
//! This library queries the Mundi satellite-imagery catalog (an
//! OpenSearch/Atom API) and downloads matched product archives, either
//! over HTTP or from the backing S3-compatible object store.
//!
//! # Architecture
//!
//! - [`query`] - search criteria, paginated catalog traversal, feed parsing
//! - [`download`] - resumable streaming downloads with a bounded worker pool
//! - [`storage`] - S3-compatible object-store retrieval
//! - [`progress`] - injected progress reporting shared by all operations
//!
//! # Example
//!
//! ```no_run
//! use mundi::download::HttpClient;
//! use mundi::progress::{ConsoleProgress, NullProgress};
//! use mundi::query::{CatalogClient, SearchCriteria};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = CatalogClient::new();
//! let criteria = SearchCriteria::new("Sentinel2")
//!     .product_type("L1C")
//!     .start_date("2020-01-01")
//!     .end_date("2020-01-31");
//! let products = catalog.query(&criteria, &ConsoleProgress::pages()).await?;
//!
//! let urls: Vec<String> = products.into_iter().filter_map(|p| p.link).collect();
//! let downloader = HttpClient::new();
//! downloader
//!     .download_all(
//!         &urls,
//!         Some(Path::new("./products")),
//!         Some(Path::new("./incomplete")),
//!         3,
//!         Arc::new(NullProgress),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod progress;
pub mod query;
pub mod storage;

// Re-export commonly used types
pub use download::{DEFAULT_WORKERS, DownloadError, HttpClient};
pub use progress::{ConsoleProgress, CountingProgress, NullProgress, ProgressReporter};
pub use query::{
    CatalogClient, DateValue, Geometry, ProductRecord, QueryError, SearchCriteria, XmlValue,
};
pub use storage::{ObjectStore, StorageError};
