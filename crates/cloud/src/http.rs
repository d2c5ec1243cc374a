//! HTTP client wrapper with JSON helpers and retry logic.

use std::path::Path;
use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::auth::CloudAuth;
use crate::error::{CloudError, Result};

/// Configuration for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Total deadline of a JSON call, body included (default 30 s).
    pub request_timeout: Duration,
    /// Deadline to establish a connection (default 10 s).
    pub connect_timeout: Duration,
    /// Longest wait for the next chunk of a response (default 60 s).
    /// Downloads have no total deadline, only this one.
    pub read_timeout: Duration,
    /// Maximum retries on transient failures (default 3).
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each attempt (default 500 ms).
    pub initial_backoff: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// Authenticated JSON-over-HTTP client shared by the REST clients.
///
/// Connection failures, timeouts, HTTP 429 and 5xx responses are retried
/// with exponential backoff. Other 4xx responses fail immediately.
pub struct HttpClient {
    client: Client,
    options: HttpOptions,
}

impl HttpClient {
    pub fn new(options: HttpOptions) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(options.connect_timeout)
            .read_timeout(options.read_timeout)
            .build()
            .map_err(|e| CloudError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, options })
    }

    pub fn options(&self) -> &HttpOptions {
        &self.options
    }

    /// GET `url` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        auth: &dyn CloudAuth,
    ) -> Result<T> {
        let timeout = Some(self.options.request_timeout);
        let resp = self.send(Method::GET, url, query, None, timeout, auth).await?;
        decode(resp).await
    }

    /// POST `body` as JSON to `url` and decode the JSON response.
    pub async fn post_json<B, T>(&self, url: &str, body: &B, auth: &dyn CloudAuth) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        let timeout = Some(self.options.request_timeout);
        let resp = self
            .send(Method::POST, url, &[], Some(&body), timeout, auth)
            .await?;
        decode(resp).await
    }

    /// DELETE `url`, ignoring any response body.
    pub async fn delete(&self, url: &str, auth: &dyn CloudAuth) -> Result<()> {
        let timeout = Some(self.options.request_timeout);
        self.send(Method::DELETE, url, &[], None, timeout, auth)
            .await?;
        Ok(())
    }

    /// GET `url` and stream the body into `path`. Returns the byte count.
    ///
    /// Only `read_timeout` applies, so large files may stream for as long as
    /// data keeps arriving. A partially written file is removed on failure.
    pub async fn download(
        &self,
        url: &str,
        query: &[(&str, &str)],
        path: &Path,
        auth: &dyn CloudAuth,
    ) -> Result<u64> {
        let mut resp = self.send(Method::GET, url, query, None, None, auth).await?;
        let mut file = tokio::fs::File::create(path).await?;

        let written = async {
            let mut written = 0u64;
            while let Some(chunk) = resp.chunk().await? {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            Ok::<_, CloudError>(written)
        }
        .await;

        if written.is_err() {
            let _ = tokio::fs::remove_file(path).await;
        }
        written
    }

    /// Send a request, retrying transient failures with exponential backoff.
    async fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
        timeout: Option<Duration>,
        auth: &dyn CloudAuth,
    ) -> Result<Response> {
        let mut last_err = None;

        for attempt in 0..=self.options.max_retries {
            if attempt > 0 {
                let delay = self.options.initial_backoff * 2u32.pow(attempt - 1);
                tracing::debug!(
                    "retrying {} {} in {:?} (attempt {}/{})",
                    method,
                    url,
                    delay,
                    attempt,
                    self.options.max_retries
                );
                tokio::time::sleep(delay).await;
            }

            let mut headers = Vec::new();
            auth.sign_request(url, method.as_str(), &mut headers).await?;

            let mut req = self.client.request(method.clone(), url);
            if !query.is_empty() {
                req = req.query(query);
            }
            if let Some(body) = body {
                req = req.json(body);
            }
            if let Some(timeout) = timeout {
                req = req.timeout(timeout);
            }
            for (key, value) in &headers {
                req = req.header(key.as_str(), value.as_str());
            }

            let err = match req.send().await {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => api_error(resp).await,
                Err(e) => CloudError::Http(e),
            };

            if !err.is_transient() {
                return Err(err);
            }
            tracing::warn!("{} {} failed: {}", method, url, err);
            last_err = Some(err);
        }

        Err(last_err.unwrap_or_else(|| CloudError::Network(format!("{method} {url} failed"))))
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let body = resp
        .text()
        .await
        .map_err(|e| CloudError::Network(format!("reading response body: {e}")))?;
    serde_json::from_str(&body).map_err(|e| {
        CloudError::InvalidResponse(format!(
            "{e}: {}",
            body.chars().take(500).collect::<String>()
        ))
    })
}

/// Build an [`CloudError::Api`] from an error response.
///
/// Google APIs wrap errors as `{"error": {"code", "message", "status"}}`;
/// other bodies are kept verbatim, truncated.
async fn api_error(resp: Response) -> CloudError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    CloudError::Api {
        status: status.as_u16(),
        message: error_message(status, &body),
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error").and_then(|e| match e {
                serde_json::Value::String(s) => Some(s.clone()),
                other => other.get("message")?.as_str().map(str::to_string),
            })
        });
    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string(),
        None => body.chars().take(500).collect(),
    }
}
