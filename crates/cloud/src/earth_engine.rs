//! Async Earth Engine REST client.
//!
//! Covers the three calls the fetch pipeline needs: evaluate a value
//! (`value:compute`), start an image export (`image:export`) and poll the
//! resulting long-running operation.

use std::sync::Arc;
use std::time::Duration;

use geefetch_core::graph::{Expression, ImageCollection, Value};

use crate::auth::CloudAuth;
use crate::ee_models::{
    ComputeValueRequest, ComputeValueResponse, ExportImageRequest, Operation, OperationState,
};
use crate::error::{CloudError, Result};
use crate::http::{HttpClient, HttpOptions};

pub const DEFAULT_BASE_URL: &str = "https://earthengine.googleapis.com/v1";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for [`EarthEngineClient`].
#[derive(Debug, Clone)]
pub struct EarthEngineOptions {
    /// API root, without trailing slash (default: production v1 endpoint).
    pub base_url: String,
    /// Cloud project the calls are billed to.
    pub project: String,
    /// Delay between two operation polls (default 10 s).
    pub poll_interval: Duration,
    pub http: HttpOptions,
}

impl EarthEngineOptions {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            project: project.into(),
            poll_interval: Duration::from_secs(10),
            http: HttpOptions::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct EarthEngineClient {
    http: HttpClient,
    auth: Arc<dyn CloudAuth>,
    options: EarthEngineOptions,
}

impl EarthEngineClient {
    pub fn new(options: EarthEngineOptions, auth: Arc<dyn CloudAuth>) -> Result<Self> {
        let http = HttpClient::new(options.http.clone())?;
        Ok(Self {
            http,
            auth,
            options,
        })
    }

    pub fn project(&self) -> &str {
        &self.options.project
    }

    fn project_url(&self, method: &str) -> String {
        format!(
            "{}/projects/{}/{}",
            self.options.base_url.trim_end_matches('/'),
            self.options.project,
            method
        )
    }

    // ── Values ──────────────────────────────────────────────────────

    /// Evaluate `value` remotely and return its JSON result.
    pub async fn compute_value(&self, value: &Value) -> Result<serde_json::Value> {
        let expression = Expression::new(value);
        let url = self.project_url("value:compute");
        let resp: ComputeValueResponse = self
            .http
            .post_json(&url, &ComputeValueRequest { expression: &expression }, self.auth.as_ref())
            .await?;
        Ok(resp.result)
    }

    /// Number of images in `collection`.
    pub async fn collection_size(&self, collection: &ImageCollection) -> Result<u64> {
        let result = self.compute_value(&collection.size()).await?;
        result.as_u64().ok_or_else(|| {
            CloudError::InvalidResponse(format!("expected a collection size, got {result}"))
        })
    }

    pub async fn collection_is_empty(&self, collection: &ImageCollection) -> Result<bool> {
        Ok(self.collection_size(collection).await? == 0)
    }

    // ── Exports ─────────────────────────────────────────────────────

    /// Start an export task.
    pub async fn export_image(&self, request: &ExportImageRequest) -> Result<Operation> {
        let url = self.project_url("image:export");
        let op: Operation = self.http.post_json(&url, request, self.auth.as_ref()).await?;
        tracing::debug!("started export {} as {}", request.description, op.name);
        Ok(op)
    }

    /// Fetch the current status of an operation by its full name.
    pub async fn get_operation(&self, name: &str) -> Result<Operation> {
        let url = format!("{}/{}", self.options.base_url.trim_end_matches('/'), name);
        self.http.get_json(&url, &[], self.auth.as_ref()).await
    }

    /// Poll `operation` until it reaches a terminal state.
    ///
    /// Returns the final operation when it succeeded, and
    /// [`CloudError::TaskFailed`] when it failed or was cancelled.
    pub async fn wait_for_operation(&self, operation: Operation) -> Result<Operation> {
        let mut op = operation;
        let mut last_state = None;

        while !op.state().is_terminal() {
            if last_state != Some(op.state()) {
                tracing::debug!("export {} is {}", op.description(), op.state());
                last_state = Some(op.state());
            }
            tokio::time::sleep(self.options.poll_interval).await;
            op = self.get_operation(&op.name).await?;
        }

        match op.state() {
            OperationState::Succeeded => Ok(op),
            state => Err(CloudError::TaskFailed {
                name: op.description().to_string(),
                state: state.to_string(),
                message: op.error_message().unwrap_or("no error message").to_string(),
            }),
        }
    }
}
