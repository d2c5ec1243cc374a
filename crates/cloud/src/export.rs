//! Bridge between Earth Engine exports and Drive downloads.
//!
//! An [`ExportJob`] is one named image clipped to a region. Running it:
//! 1. starts an `image:export` task writing a GeoTIFF to Drive,
//! 2. polls the task until it finishes,
//! 3. downloads every file the task wrote into the output directory,
//! 4. deletes those files from Drive.

use std::path::{Path, PathBuf};

use geefetch_core::graph::{Expression, Geometry, Image};
use geefetch_core::vector::Bounds;

use crate::drive::DriveClient;
use crate::drive_models::DriveFile;
use crate::earth_engine::EarthEngineClient;
use crate::ee_models::ExportImageRequest;
use crate::error::{CloudError, Result};

/// Output settings shared by every export of a run.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Drive folder the tasks write to.
    pub folder: String,
    /// CRS code of the output grid, e.g. `EPSG:4326`.
    pub crs: String,
    /// Output pixel size in meters.
    pub scale: f64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            folder: "GEE".to_string(),
            crs: "EPSG:4326".to_string(),
            scale: 10.0,
        }
    }
}

/// One image to export, named after its output file.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub name: String,
    pub image: Image,
    pub region: Bounds,
}

impl ExportJob {
    pub fn new(name: impl Into<String>, image: Image, region: Bounds) -> Self {
        Self {
            name: name.into(),
            image,
            region,
        }
    }

    /// Export request for this job, clipped to its region at `settings.scale`.
    pub fn request(&self, settings: &ExportSettings) -> ExportImageRequest {
        let clipped = self
            .image
            .clip_to_bounds_and_scale(&Geometry::rectangle(&self.region), settings.scale);
        ExportImageRequest::to_drive(
            Expression::new(clipped.value()),
            &self.name,
            &settings.folder,
            &settings.crs,
        )
    }

    /// Whether `file` was written by this job.
    ///
    /// Large exports are split into `<name>-<row>-<col>.tif` tiles.
    pub fn owns(&self, file: &DriveFile) -> bool {
        match file.name.strip_prefix(self.name.as_str()) {
            Some(rest) => rest == ".tif" || (rest.starts_with('-') && rest.ends_with(".tif")),
            None => false,
        }
    }
}

/// Run `job` end to end and return the downloaded paths.
pub async fn export_and_download(
    earth_engine: &EarthEngineClient,
    drive: &DriveClient,
    job: &ExportJob,
    settings: &ExportSettings,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let op = earth_engine.export_image(&job.request(settings)).await?;
    earth_engine.wait_for_operation(op).await?;

    let files: Vec<DriveFile> = drive
        .search(&job.name)
        .await?
        .into_iter()
        .filter(|f| job.owns(f))
        .collect();
    if files.is_empty() {
        return Err(CloudError::MissingOutput(job.name.clone()));
    }

    download_all(drive, &files, output_dir).await
}

/// Download `files` concurrently into `output_dir`, deleting each remote
/// copy once it is on disk.
///
/// Every download runs to completion even after one fails, so no partial
/// file is left behind; the first error is returned.
async fn download_all(
    drive: &DriveClient,
    files: &[DriveFile],
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    use futures::stream::{FuturesOrdered, StreamExt};

    let mut futs = FuturesOrdered::new();
    for file in files {
        futs.push_back(async move {
            let path = output_dir.join(&file.name);
            drive.download_file(file, &path).await?;
            drive.delete_file(file).await?;
            Ok::<_, CloudError>(path)
        });
    }

    let mut paths = Vec::with_capacity(files.len());
    let mut first_err = None;
    while let Some(res) = futs.next().await {
        match res {
            Ok(path) => paths.push(path),
            Err(e) => {
                tracing::warn!("download failed: {}", e);
                first_err.get_or_insert(e);
            }
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(paths),
    }
}

/// Delete every Drive folder named `folder`, with its content.
///
/// Returns the number of folders removed.
pub async fn clean_drive_folder(drive: &DriveClient, folder: &str) -> Result<usize> {
    let folders = drive.find_folders(folder).await?;
    for f in &folders {
        tracing::debug!("deleting drive folder {} ({})", f.name, f.id);
        drive.delete_file(f).await?;
    }
    Ok(folders.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> ExportJob {
        ExportJob::new(
            "NDVI_2020-01-01_2020-02-01_1",
            Image::load("X"),
            Bounds::new(1.0, 2.0, 3.0, 4.0),
        )
    }

    fn file(name: &str) -> DriveFile {
        DriveFile {
            id: "id".into(),
            name: name.into(),
            mime_type: None,
            size: None,
        }
    }

    #[test]
    fn owns_exact_and_tiled_outputs_only() {
        let j = job();
        assert!(j.owns(&file("NDVI_2020-01-01_2020-02-01_1.tif")));
        assert!(j.owns(&file(
            "NDVI_2020-01-01_2020-02-01_1-0000000000-0000023296.tif"
        )));
        assert!(!j.owns(&file("NDVI_2020-01-01_2020-02-01_10.tif")));
        assert!(!j.owns(&file("NDVI_2020-01-01_2020-02-01_1.json")));
    }

    #[test]
    fn request_clips_to_region_at_scale() {
        let settings = ExportSettings {
            scale: 20.0,
            ..ExportSettings::default()
        };
        let req = job().request(&settings);
        let root = &req.expression.values["0"]["functionInvocationValue"];
        assert_eq!(root["functionName"], "Image.clipToBoundsAndScale");
        assert_eq!(root["arguments"]["scale"]["constantValue"], 20.0);
        assert_eq!(
            root["arguments"]["geometry"]["functionInvocationValue"]["arguments"]["coordinates"]
                ["constantValue"],
            serde_json::json!([[1.0, 2.0], [3.0, 4.0]])
        );
        assert_eq!(req.file_export_options.drive_destination.folder, "GEE");
    }
}
