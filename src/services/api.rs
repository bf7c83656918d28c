use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::{normalize_base_url, ApiConfig};
use crate::error::{AppError, AppResult};
use crate::models::{ErrorBody, SuccessResponse};

/// Shared HTTP plumbing for the cafe REST API.
///
/// Endpoint paths are resolved relative to the configured base URL, so
/// `api.endpoint(&["menu", "7"])` against `http://host/api/` gives
/// `http://host/api/menu/7` with every segment percent-encoded.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Self::with_client(client, &config.base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> AppResult<Self> {
        let normalized = normalize_base_url(base_url)?;
        let base_url = Url::parse(&normalized)
            .map_err(|e| AppError::Config(format!("Invalid API base URL: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn http(&self) -> &Client {
        &self.client
    }

    /// Builds an endpoint URL from path segments under the base URL.
    pub fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| AppError::Config("API base URL cannot be a base".to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    pub async fn send(&self, request: RequestBuilder) -> AppResult<Response> {
        request.send().await.map_err(|e| {
            tracing::error!("Request to cafe API failed: {}", e);
            AppError::Request(e)
        })
    }
}

/// Maps a non-success status into an `AppError`, keeping the server's
/// `error`/`message` text when the body carries one.
pub async fn check_status(response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::into_message);

    tracing::warn!(
        "Cafe API responded with {}: {}",
        status,
        message.as_deref().unwrap_or("<no message>")
    );

    if status == StatusCode::UNAUTHORIZED {
        return Err(AppError::Unauthorized);
    }

    Err(AppError::Api { status, message })
}

/// Reads a successful JSON body into `T`.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> AppResult<T> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await.map_err(AppError::Request)?;

    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::error!("Failed to parse cafe API response: {}", e);
        AppError::Parse(e.to_string())
    })
}

/// Reads a `{ success }` acknowledgement. An empty body on a 2xx is accepted.
pub async fn read_ack(response: Response) -> AppResult<()> {
    let response = check_status(response).await?;
    let status = response.status();
    let bytes = response.bytes().await.map_err(AppError::Request)?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(());
    }

    let ack: SuccessResponse =
        serde_json::from_slice(&bytes).map_err(|e| AppError::Parse(e.to_string()))?;

    if ack.success {
        Ok(())
    } else {
        Err(AppError::Api {
            status,
            message: ack.error.into_message(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::with_client(Client::new(), base).unwrap()
    }

    #[test]
    fn endpoint_joins_under_base_path() {
        let api = client("http://cafe.local/api");
        assert_eq!(
            api.endpoint(&["menu", "7"]).unwrap().as_str(),
            "http://cafe.local/api/menu/7"
        );
        assert_eq!(
            api.endpoint(&["admin", "events"]).unwrap().as_str(),
            "http://cafe.local/api/admin/events"
        );
    }

    #[test]
    fn endpoint_encodes_segments() {
        let api = client("http://cafe.local/api/");
        assert_eq!(
            api.endpoint(&["menu", "a/b c"]).unwrap().as_str(),
            "http://cafe.local/api/menu/a%2Fb%20c"
        );
    }

    #[test]
    fn root_base_url() {
        let api = client("http://cafe.local");
        assert_eq!(
            api.endpoint(&["content", "events"]).unwrap().as_str(),
            "http://cafe.local/content/events"
        );
    }
}
