/// Twitch Helix REST client
///
/// Covers the small slice of the Helix API the stream indexer needs:
/// - **App access token**: client-credentials grant, cached until shortly before expiry
/// - **Live streams**: `GET /streams` filtered by broadcast language
/// - **Follower totals**: `GET /channels/followers`, reading only the `total` field
///
/// # Example
///
/// ```rust,no_run
/// use twitch_helix::HelixClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), twitch_helix::HelixError> {
///     let client = HelixClient::new("client-id", "client-secret");
///     let streams = client.get_streams("fr", 100).await?;
///     for stream in &streams {
///         let followers = client.follower_total(&stream.user_id).await?;
///         println!("{} ({} followers)", stream.user_name, followers);
///     }
///     Ok(())
/// }
/// ```
pub mod error;
pub mod types;

pub use error::{HelixError, Result};
pub use types::{DataResponse, FollowersResponse, Pagination, Stream};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use types::TokenResponse;

pub const DEFAULT_API_URL: &str = "https://api.twitch.tv/helix";
pub const DEFAULT_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

/// `first` is capped at 100 by every paginated Helix endpoint.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Seconds of validity a cached token must still have to be reused.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

pub struct HelixClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    api_url: String,
    token_url: String,
    token_cache: Mutex<Option<CachedToken>>,
}

impl HelixClient {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            api_url: DEFAULT_API_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            token_cache: Mutex::new(None),
        }
    }

    /// Point the client at another API base and token endpoint (mock servers, proxies).
    pub fn with_endpoints(mut self, api_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self.token_url = token_url.into();
        self
    }

    /// Apply a total per-request timeout to every call, token requests included.
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Result<Self> {
        self.http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// List live streams broadcasting in `language`, most viewed first.
    pub async fn get_streams(&self, language: &str, first: u32) -> Result<Vec<Stream>> {
        let first = first.clamp(1, MAX_PAGE_SIZE);
        let query = [("first", first.to_string()), ("language", language.to_string())];

        let response: DataResponse<Stream> = self.get("streams", &query).await?;
        tracing::debug!(
            language,
            count = response.data.len(),
            has_more = response.pagination.cursor.is_some(),
            "Fetched live streams"
        );
        Ok(response.data)
    }

    /// Total number of accounts following `broadcaster_id`.
    pub async fn follower_total(&self, broadcaster_id: &str) -> Result<u64> {
        // The endpoint rejects first=0, so ask for the smallest page and drop the rows.
        let query = [
            ("broadcaster_id", broadcaster_id.to_string()),
            ("first", "1".to_string()),
        ];

        let response: FollowersResponse = self.get("channels/followers", &query).await?;
        Ok(response.total)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let token = self.access_token().await?;
        let url = format!("{}/{}", self.api_url, path);

        let resp = self
            .http
            .get(&url)
            .header("Client-Id", &self.client_id)
            .bearer_auth(&token)
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(path, "App access token rejected, dropping cached token");
            self.invalidate_token();
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HelixError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Return a valid app access token, fetching a new one when the cache is empty or stale.
    async fn access_token(&self) -> Result<String> {
        {
            let cache = self.token_cache.lock();
            if let Some(cached) = cache.as_ref() {
                if cached.expires_at > Utc::now() + Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS) {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];

        let resp = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| HelixError::Auth(format!("Token request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HelixError::Auth(format!(
                "Token request failed with status {}: {}",
                status, body
            )));
        }

        let bytes = resp.bytes().await?;
        let token: TokenResponse = serde_json::from_slice(&bytes)?;
        let expires_at = Utc::now() + Duration::seconds(token.expires_in);

        tracing::debug!(expires_at = %expires_at, "Obtained app access token");

        {
            let mut cache = self.token_cache.lock();
            *cache = Some(CachedToken {
                access_token: token.access_token.clone(),
                expires_at,
            });
        }

        Ok(token.access_token)
    }

    fn invalidate_token(&self) {
        self.token_cache.lock().take();
    }
}
