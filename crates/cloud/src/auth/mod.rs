//! Authentication traits and implementations for the Google APIs.

mod none;
pub mod service_account;

pub use none::{BearerToken, NoAuth};
pub use service_account::{ServiceAccountAuth, ServiceAccountKey};

use async_trait::async_trait;

use crate::error::Result;

/// Trait for signing HTTP requests to the Earth Engine and Drive APIs.
///
/// Implementations add authentication headers (e.g. an OAuth2 bearer token)
/// to outgoing requests before they are sent. Signing is async because it may
/// have to fetch or refresh a token first.
#[async_trait]
pub trait CloudAuth: Send + Sync {
    /// Sign a request by adding authentication headers.
    ///
    /// `url` is the full request URL, `headers` is a mutable map where
    /// auth headers should be inserted.
    async fn sign_request(
        &self,
        url: &str,
        method: &str,
        headers: &mut Vec<(String, String)>,
    ) -> Result<()>;
}
