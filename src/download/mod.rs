//! Streaming archive downloads with resume and batch support.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for multi-gigabyte archives)
//! - Resumable transfers: partial files live in a working directory under
//!   deterministic names and continue via HTTP `Range` requests
//! - Atomic completion: files appear at their destination only when whole
//! - Bounded worker pool for batch downloads
//!
//! # Example
//!
//! ```no_run
//! use mundi::download::HttpClient;
//! use mundi::progress::ConsoleProgress;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let path = client
//!     .download(
//!         "https://obs.example.com/bucket/S2B_MSIL1C_20191024T060919",
//!         Some(Path::new("./products")),
//!         Some(Path::new("./incomplete")),
//!         &ConsoleProgress::bytes(),
//!     )
//!     .await?;
//! println!("Downloaded: {}", path.display());
//! # Ok(())
//! # }
//! ```

mod batch;
mod client;
mod constants;
mod error;

pub use client::{HttpClient, partial_path};
pub use constants::{CONNECT_TIMEOUT_SECS, DEFAULT_WORKERS};
pub use error::DownloadError;
