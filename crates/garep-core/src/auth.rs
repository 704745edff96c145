//! Access tokens for the Reporting API.
//!
//! Production calls mint tokens from a service account key through
//! `yup-oauth2`, which also caches and refreshes them. A fixed token can be
//! injected instead (`GAREP_ACCESS_TOKEN`, tests).

use crate::{Error, Result};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use yup_oauth2::ServiceAccountAuthenticator;

/// Read-only Analytics scope.
pub const ANALYTICS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";

/// Something that can hand out bearer tokens.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// A token valid for `scopes`.
    async fn access_token(&self, scopes: &[&str]) -> Result<String>;
}

/// Fixed bearer token.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    /// Wrap an already minted token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self, _scopes: &[&str]) -> Result<String> {
        Ok(self.token.clone())
    }
}

type Mint = dyn Fn(Vec<String>) -> BoxFuture<'static, Result<String>> + Send + Sync;

/// Tokens minted from a service account JSON key.
pub struct ServiceAccountTokenSource {
    client_email: String,
    mint: Box<Mint>,
}

impl ServiceAccountTokenSource {
    /// Read the key file and prepare an authenticator.
    pub async fn from_key_file(path: &Path) -> Result<Self> {
        let key = yup_oauth2::read_service_account_key(path)
            .await
            .map_err(|e| Error::Auth(format!("Failed to read key {}: {e}", path.display())))?;
        let client_email = key.client_email.clone();

        let authenticator = ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .map_err(|e| Error::Auth(format!("Failed to build authenticator: {e}")))?;
        let authenticator = Arc::new(authenticator);

        let mint = move |scopes: Vec<String>| {
            let authenticator = Arc::clone(&authenticator);
            async move {
                let scopes: Vec<&str> = scopes.iter().map(String::as_str).collect();
                let token = authenticator
                    .token(scopes.as_slice())
                    .await
                    .map_err(|e| Error::Auth(format!("Failed to mint token: {e}")))?;
                token
                    .token()
                    .map(str::to_string)
                    .ok_or_else(|| Error::Auth("Token response had no access token".into()))
            }
            .boxed()
        };

        debug!("Loaded service account {client_email}");
        Ok(Self {
            client_email,
            mint: Box::new(mint),
        })
    }

    /// Email of the service account.
    pub fn client_email(&self) -> &str {
        &self.client_email
    }
}

impl std::fmt::Debug for ServiceAccountTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountTokenSource")
            .field("client_email", &self.client_email)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self, scopes: &[&str]) -> Result<String> {
        let scopes = scopes.iter().map(|s| (*s).to_string()).collect();
        (self.mint)(scopes).await
    }
}

/// Token source for configured credentials.
///
/// A pre-minted access token wins over the key file.
pub async fn from_credentials(
    credentials: &crate::config::CredentialsConfig,
) -> Result<Arc<dyn TokenSource>> {
    if let Some(token) = &credentials.access_token {
        debug!("Using access token from environment");
        return Ok(Arc::new(StaticTokenSource::new(token.clone())));
    }

    match &credentials.key_path {
        Some(path) => Ok(Arc::new(ServiceAccountTokenSource::from_key_file(path).await?)),
        None => Err(Error::Auth(
            "No credentials configured; set credentials.key_path or GAREP_KEY_PATH".into(),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::CredentialsConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_access_token_wins_over_key_path() {
        let credentials = CredentialsConfig {
            key_path: Some("/nonexistent/key.json".into()),
            access_token: Some("ya29.env".into()),
        };
        let source = from_credentials(&credentials).await.unwrap();
        assert_eq!(source.access_token(&[]).await.unwrap(), "ya29.env");
    }

    #[tokio::test]
    async fn test_no_credentials_is_auth_error() {
        let result = from_credentials(&CredentialsConfig::default()).await;
        match result {
            Err(Error::Auth(msg)) => assert!(msg.contains("GAREP_KEY_PATH")),
            Err(other) => panic!("expected Auth error, got {other:?}"),
            Ok(_) => panic!("expected Auth error"),
        }
    }

    #[tokio::test]
    async fn test_static_token_ignores_scopes() {
        let source = StaticTokenSource::new("ya29.fixed");
        let token = source
            .access_token(&[ANALYTICS_READONLY_SCOPE])
            .await
            .unwrap();
        assert_eq!(token, "ya29.fixed");
    }

    #[tokio::test]
    async fn test_missing_key_file_is_auth_error() {
        let dir = TempDir::new().unwrap();
        let result = ServiceAccountTokenSource::from_key_file(&dir.path().join("absent.json")).await;

        match result {
            Err(Error::Auth(msg)) => assert!(msg.contains("absent.json")),
            other => panic!("expected Auth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_key_file_is_auth_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key.json");
        std::fs::write(&path, "{\"type\": \"service_account\"}").unwrap();

        let result = ServiceAccountTokenSource::from_key_file(&path).await;
        assert!(matches!(result, Err(Error::Auth(_))));
    }
}
