use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::time::Duration;

/// Printed to stderr when configuration cannot be loaded or validated.
pub const USAGE: &str = "\
Twitch stream indexer

Usage: stream-indexer (configured through environment variables or a .env file)

Required:
  TWITCH_CLIENT_ID          Twitch application client ID
  TWITCH_CLIENT_SECRET      Twitch application client secret

Optional:
  TWITCH_LANGUAGE           Broadcast language to poll            [default: fr]
  TWITCH_API_URL            Helix API base URL                     [default: https://api.twitch.tv/helix]
  TWITCH_TOKEN_URL          OAuth2 token endpoint                  [default: https://id.twitch.tv/oauth2/token]
  ELASTICSEARCH_URL         Comma-separated Elasticsearch URLs     [default: http://localhost:9200]
  ELASTICSEARCH_USERNAME    Elasticsearch basic auth user
  ELASTICSEARCH_PASSWORD    Elasticsearch basic auth password
  ELASTICSEARCH_INDEX       Index prefix, suffixed with year-month [default: streams]
  POLL_ENABLED              Poll Twitch on a timer                 [default: true]
  POLL_INTERVAL_SECS        Seconds between polls                  [default: 30]
  BUCKET_REFRESH_SECS       Seconds between index suffix refreshes [default: 300]
  MIN_VIEWER_COUNT          Streams below this are skipped         [default: 500]
  STREAM_BATCH_SIZE         Streams fetched per poll (1-100)       [default: 100]
  REQUEST_TIMEOUT_SECS      Timeout for each outbound request      [default: 10]
  HTTP_PORT                 Liveness probe port                    [default: 8080]
  VERBOSE                   Enable debug logging                   [default: false]
";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Twitch
    pub twitch_client_id: String,
    pub twitch_client_secret: String,
    pub twitch_language: String,
    pub twitch_api_url: String,
    pub twitch_token_url: String,

    // Elasticsearch
    pub elasticsearch_url: String,
    pub elasticsearch_username: Option<String>,
    pub elasticsearch_password: Option<String>,
    pub elasticsearch_index: String,

    // Polling
    pub poll_enabled: bool,
    pub poll_interval_secs: u64,
    pub bucket_refresh_secs: u64,
    pub min_viewer_count: u64,
    pub stream_batch_size: u32,
    pub request_timeout_secs: u64,

    // HTTP server / observability
    pub http_port: u16,
    pub verbose: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_source(config::Environment::default().separator("__"))
    }

    /// Env values stay strings until each field deserialises them.
    fn from_source(env: config::Environment) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .set_default("twitch_client_id", "")?
            .set_default("twitch_client_secret", "")?
            .set_default("twitch_language", "fr")?
            .set_default("twitch_api_url", twitch_helix::DEFAULT_API_URL)?
            .set_default("twitch_token_url", twitch_helix::DEFAULT_TOKEN_URL)?
            .set_default("elasticsearch_url", "http://localhost:9200")?
            .set_default("elasticsearch_index", "streams")?
            .set_default("poll_enabled", true)?
            .set_default("poll_interval_secs", 30)?
            .set_default("bucket_refresh_secs", 300)? // 5 minutes
            .set_default("min_viewer_count", 500)?
            .set_default("stream_batch_size", 100)?
            .set_default("request_timeout_secs", 10)?
            .set_default("http_port", 8080)?
            .set_default("verbose", false)?
            .add_source(env)
            .build()?;

        config.try_deserialize()
    }

    pub fn validate(&self) -> Result<()> {
        if self.twitch_client_id.trim().is_empty() {
            return Err(anyhow!("TWITCH_CLIENT_ID is required"));
        }

        if self.twitch_client_secret.trim().is_empty() {
            return Err(anyhow!("TWITCH_CLIENT_SECRET is required"));
        }

        if self.elasticsearch_index.trim().is_empty() {
            return Err(anyhow!("Elasticsearch index prefix must not be empty"));
        }

        let urls = self.elasticsearch_urls();
        if urls.is_empty() {
            return Err(anyhow!("ELASTICSEARCH_URL must name at least one node"));
        }
        for node in &urls {
            url::Url::parse(node)
                .map_err(|e| anyhow!("Invalid ELASTICSEARCH_URL entry '{}': {}", node, e))?;
        }

        if self.elasticsearch_username.is_some() != self.elasticsearch_password.is_some() {
            return Err(anyhow!(
                "ELASTICSEARCH_USERNAME and ELASTICSEARCH_PASSWORD must be set together"
            ));
        }

        if self.http_port == 0 {
            return Err(anyhow!("HTTP port must be greater than 0"));
        }

        if self.poll_interval_secs == 0 {
            return Err(anyhow!("Poll interval must be greater than 0"));
        }

        if self.bucket_refresh_secs == 0 {
            return Err(anyhow!("Bucket refresh interval must be greater than 0"));
        }

        if self.request_timeout_secs == 0 {
            return Err(anyhow!("Request timeout must be greater than 0"));
        }

        if self.stream_batch_size == 0 || self.stream_batch_size > twitch_helix::MAX_PAGE_SIZE {
            return Err(anyhow!(
                "Stream batch size must be between 1 and {}",
                twitch_helix::MAX_PAGE_SIZE
            ));
        }

        Ok(())
    }

    /// Store nodes listed in `ELASTICSEARCH_URL`, split on commas.
    pub fn elasticsearch_urls(&self) -> Vec<String> {
        self.elasticsearch_url
            .split(',')
            .map(str::trim)
            .filter(|node| !node.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn bucket_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.bucket_refresh_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Basic auth pair for Elasticsearch, when both halves are configured.
    pub fn elasticsearch_credentials(&self) -> Option<(String, String)> {
        match (&self.elasticsearch_username, &self.elasticsearch_password) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        }
    }
}
