//! Serde models for the Earth Engine REST API (v1).
//!
//! Field names follow the REST JSON mapping (camelCase); int64 fields are
//! sent as strings.

use std::fmt;

use geefetch_core::graph::Expression;
use serde::{Deserialize, Serialize};

/// Upper bound on exported pixels.
pub const MAX_PIXELS: &str = "10000000000000";

// ---------------------------------------------------------------------------
// value:compute
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ComputeValueRequest<'a> {
    pub expression: &'a Expression,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComputeValueResponse {
    #[serde(default)]
    pub result: serde_json::Value,
}

// ---------------------------------------------------------------------------
// image:export
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportImageRequest {
    pub expression: Expression,
    pub description: String,
    pub file_export_options: ImageFileExportOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<PixelGrid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pixels: Option<String>,
}

impl ExportImageRequest {
    /// Export `expression` as a cloud-optimized GeoTIFF to the Drive
    /// `folder`, named after `description`.
    pub fn to_drive(
        expression: Expression,
        description: impl Into<String>,
        folder: impl Into<String>,
        crs: impl Into<String>,
    ) -> Self {
        let description = description.into();
        Self {
            expression,
            file_export_options: ImageFileExportOptions {
                file_format: "GEO_TIFF".to_string(),
                drive_destination: DriveDestination {
                    folder: folder.into(),
                    filename_prefix: description.clone(),
                },
                geo_tiff_options: Some(GeoTiffOptions {
                    cloud_optimized: true,
                }),
            },
            description,
            grid: Some(PixelGrid {
                crs_code: crs.into(),
            }),
            max_pixels: Some(MAX_PIXELS.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFileExportOptions {
    pub file_format: String,
    pub drive_destination: DriveDestination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_tiff_options: Option<GeoTiffOptions>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveDestination {
    pub folder: String,
    pub filename_prefix: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoTiffOptions {
    pub cloud_optimized: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelGrid {
    pub crs_code: String,
}

// ---------------------------------------------------------------------------
// Long-running operations
// ---------------------------------------------------------------------------

/// Lifecycle state of an export task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationState {
    Pending,
    Running,
    Cancelling,
    Succeeded,
    Failed,
    Cancelled,
    /// Also any state this client does not know about.
    #[serde(other)]
    StateUnspecified,
}

impl OperationState {
    /// No further transition will happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StateUnspecified => "STATE_UNSPECIFIED",
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Cancelling => "CANCELLING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetadata {
    pub state: Option<OperationState>,
    pub description: Option<String>,
    pub progress: Option<f64>,
    pub create_time: Option<String>,
    pub update_time: Option<String>,
    #[serde(default)]
    pub destination_uris: Vec<String>,
}

/// `google.rpc.Status`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// A long-running export operation.
#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub metadata: Option<OperationMetadata>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<Status>,
}

impl Operation {
    /// State from the metadata, falling back to `done`/`error`.
    pub fn state(&self) -> OperationState {
        match self.metadata.as_ref().and_then(|m| m.state) {
            Some(state) if state != OperationState::StateUnspecified => state,
            _ if self.error.is_some() => OperationState::Failed,
            _ if self.done => OperationState::Succeeded,
            _ => OperationState::Pending,
        }
    }

    /// Task description, or the operation name when absent.
    pub fn description(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.description.as_deref())
            .unwrap_or(&self.name)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|s| s.message.as_str())
    }
}
