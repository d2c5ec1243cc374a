//! Blocking (synchronous) API.
//!
//! Wraps the async clients with a Tokio runtime so callers don't need to
//! manage their own async runtime. Both clients are driven by the same
//! runtime, so their connection pools are never shared across runtimes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use geefetch_core::graph::ImageCollection;

use crate::auth::CloudAuth;
use crate::drive::{DriveClient, DriveOptions};
use crate::drive_models::DriveFile;
use crate::earth_engine::{EarthEngineClient, EarthEngineOptions};
use crate::error::{CloudError, Result};
use crate::export::{self, ExportJob, ExportSettings};

/// Blocking session over an Earth Engine and a Drive client.
///
/// Uses an internal single-threaded Tokio runtime.
pub struct Session {
    rt: tokio::runtime::Runtime,
    earth_engine: EarthEngineClient,
    drive: DriveClient,
}

impl Session {
    pub fn new(
        earth_engine: EarthEngineOptions,
        drive: DriveOptions,
        auth: Arc<dyn CloudAuth>,
    ) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CloudError::Network(e.to_string()))?;

        Ok(Self {
            rt,
            earth_engine: EarthEngineClient::new(earth_engine, auth.clone())?,
            drive: DriveClient::new(drive, auth)?,
        })
    }

    pub fn project(&self) -> &str {
        self.earth_engine.project()
    }

    // ── Earth Engine ────────────────────────────────────────────────

    pub fn collection_is_empty(&self, collection: &ImageCollection) -> Result<bool> {
        self.rt
            .block_on(self.earth_engine.collection_is_empty(collection))
    }

    /// Export `job`, wait for it and download its files (blocking).
    pub fn export_and_download(
        &self,
        job: &ExportJob,
        settings: &ExportSettings,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        self.rt.block_on(export::export_and_download(
            &self.earth_engine,
            &self.drive,
            job,
            settings,
            output_dir,
        ))
    }

    // ── Drive ───────────────────────────────────────────────────────

    pub fn clean_drive_folder(&self, folder: &str) -> Result<usize> {
        self.rt
            .block_on(export::clean_drive_folder(&self.drive, folder))
    }

    pub fn list_directory(&self, folder: Option<&DriveFile>) -> Result<Vec<DriveFile>> {
        self.rt.block_on(self.drive.list_directory(folder))
    }

    pub fn find_folders(&self, name: &str) -> Result<Vec<DriveFile>> {
        self.rt.block_on(self.drive.find_folders(name))
    }

    pub fn search(&self, text: &str) -> Result<Vec<DriveFile>> {
        self.rt.block_on(self.drive.search(text))
    }

    pub fn search_in_folder(&self, folder: &DriveFile, text: &str) -> Result<Vec<DriveFile>> {
        self.rt.block_on(self.drive.search_in_folder(folder, text))
    }

    /// Create a folder at the Drive root.
    pub fn create_directory(&self, name: &str) -> Result<DriveFile> {
        self.rt.block_on(self.drive.create_directory(name, None))
    }

    pub fn list_trash(&self) -> Result<Vec<DriveFile>> {
        self.rt.block_on(self.drive.list_trash())
    }

    pub fn empty_trash(&self) -> Result<()> {
        self.rt.block_on(self.drive.empty_trash())
    }
}
