use crate::{Error, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// HTTP client for discovery documents and authenticated JSON API calls
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Creates a new fetcher with the default 60 second timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(60))
    }

    /// Creates a new fetcher with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("garep/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client })
    }

    /// Fetches a URL and returns the body as text
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        info!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }

    /// POSTs a JSON body with a bearer token and decodes the JSON reply
    pub async fn post_json<B, R>(&self, url: &str, bearer: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let builder = self.client.post(url).bearer_auth(bearer).json(body);
        self.execute(builder).await
    }

    async fn execute<R: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<R> {
        let response = builder.send().await?;
        let status = response.status();
        debug!("Response status: {status}");

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Rate limited by Google API");
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        // Empty successful bodies decode as an empty object
        let body = if body.trim().is_empty() { "{}" } else { &body };
        serde_json::from_str(body).map_err(Error::from)
    }
}

/// Builds an [`Error::Api`] from a Google error envelope:
/// `{"error": {"code": 400, "message": "...", "status": "INVALID_ARGUMENT"}}`
fn api_error(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|parsed| {
            parsed
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });

    Error::Api {
        status: status.as_u16(),
        message,
    }
}
