//! Authentication without a token exchange.

use async_trait::async_trait;

use crate::auth::CloudAuth;
use crate::error::Result;

/// No authentication. Used against local mock servers.
pub struct NoAuth;

#[async_trait]
impl CloudAuth for NoAuth {
    async fn sign_request(
        &self,
        _url: &str,
        _method: &str,
        _headers: &mut Vec<(String, String)>,
    ) -> Result<()> {
        Ok(())
    }
}

/// A pre-issued OAuth2 access token sent as `Authorization: Bearer`.
pub struct BearerToken(pub String);

#[async_trait]
impl CloudAuth for BearerToken {
    async fn sign_request(
        &self,
        _url: &str,
        _method: &str,
        headers: &mut Vec<(String, String)>,
    ) -> Result<()> {
        headers.push(("Authorization".into(), format!("Bearer {}", self.0)));
        Ok(())
    }
}
