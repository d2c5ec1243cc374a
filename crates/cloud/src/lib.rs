//! # geefetch cloud
//!
//! REST clients for Google Earth Engine and Google Drive.
//!
//! This crate sends the computation graphs built by `geefetch-core` to Earth
//! Engine, runs image exports to Drive and downloads the results, with
//! service-account authentication and retrying HTTP.
//!
//! - [`EarthEngineClient`]: `value:compute`, `image:export`, operation polling
//! - [`DriveClient`]: list, search, download, delete, trash
//! - [`export`]: export → wait → download → delete bridge
//! - [`blocking::Session`]: synchronous facade over both clients

pub mod auth;
pub mod drive;
pub mod drive_models;
pub mod earth_engine;
pub mod ee_models;
pub mod error;
pub mod export;
pub mod http;

mod sync_api;

pub use drive::{DriveClient, DriveOptions};
pub use drive_models::DriveFile;
pub use earth_engine::{EarthEngineClient, EarthEngineOptions};
pub use ee_models::{ExportImageRequest, Operation, OperationState};
pub use error::{CloudError, Result};
pub use export::{ExportJob, ExportSettings};
pub use http::{HttpClient, HttpOptions};

/// Blocking API re-exported as `blocking` module.
pub mod blocking {
    pub use crate::sync_api::*;
}
