use crate::bucket::TimeBucket;
use crate::error::{IndexerError, Result};
use crate::models::{EnrichedStream, WriteResult};
use elasticsearch::{
    auth::Credentials,
    http::transport::{MultiNodeConnectionPool, SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesExistsIndexTemplateParts, IndicesPutIndexTemplateParts},
    Elasticsearch, IndexParts,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Raw answer to a single-document write.
#[derive(Debug, Clone)]
pub struct StoreResponse {
    pub status: u16,
    pub body: Value,
}

impl StoreResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One network write per call, no retries.
#[async_trait::async_trait]
pub trait IndexTransport: Send + Sync {
    async fn index(&self, target: &str, document: Value) -> Result<StoreResponse>;
}

#[derive(Clone)]
pub struct ElasticsearchTransport {
    client: Elasticsearch,
}

impl ElasticsearchTransport {
    /// One node gets a single-node pool; several are balanced round-robin.
    pub fn new(
        urls: &[String],
        credentials: Option<(String, String)>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut nodes = urls
            .iter()
            .map(|url| Url::parse(url))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut builder = match nodes.len() {
            0 => {
                return Err(IndexerError::Configuration(
                    "no Elasticsearch node configured".to_string(),
                ))
            }
            1 => TransportBuilder::new(SingleNodeConnectionPool::new(nodes.remove(0))),
            _ => TransportBuilder::new(MultiNodeConnectionPool::round_robin(nodes, None)),
        };

        builder = builder.timeout(timeout);
        if let Some((username, password)) = credentials {
            builder = builder.auth(Credentials::Basic(username, password));
        }
        let transport = builder.build()?;

        Ok(Self {
            client: Elasticsearch::new(transport),
        })
    }

    pub async fn ping(&self) -> Result<()> {
        let response = self.client.ping().send().await?;
        let status = response.status_code();
        if status.is_success() {
            Ok(())
        } else {
            Err(IndexerError::StoreTransport(format!(
                "Elasticsearch ping failed with status {}",
                status.as_u16()
            )))
        }
    }

    /// Make sure `<prefix>-*` indices get date-typed timestamps and numeric
    /// counters instead of whatever dynamic mapping guesses first.
    pub async fn ensure_index_template(&self, prefix: &str) -> Result<()> {
        let exists_response = self
            .client
            .indices()
            .exists_index_template(IndicesExistsIndexTemplateParts::Name(prefix))
            .send()
            .await?;

        if exists_response.status_code().is_success() {
            debug!(template = prefix, "Index template already present");
            return Ok(());
        }

        let body = json!({
            "index_patterns": [format!("{prefix}-*")],
            "template": {
                "mappings": {
                    "properties": {
                        "@timestamp": { "type": "date" },
                        "started_at": { "type": "date" },
                        "follower_count": { "type": "long" },
                        "viewer_count": { "type": "integer" },
                        "id": { "type": "keyword" },
                        "user_id": { "type": "keyword" },
                        "user_login": { "type": "keyword" },
                        "user_name": { "type": "keyword" },
                        "game_id": { "type": "keyword" },
                        "game_name": { "type": "keyword" },
                        "language": { "type": "keyword" },
                        "title": { "type": "text" }
                    }
                }
            }
        });

        let response = self
            .client
            .indices()
            .put_index_template(IndicesPutIndexTemplateParts::Name(prefix))
            .body(body)
            .send()
            .await?;

        let status = response.status_code();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IndexerError::StoreTransport(format!(
                "index template {} rejected with status {}: {}",
                prefix,
                status.as_u16(),
                text
            )));
        }

        info!(template = prefix, "Index template created");
        Ok(())
    }
}

#[async_trait::async_trait]
impl IndexTransport for ElasticsearchTransport {
    async fn index(&self, target: &str, document: Value) -> Result<StoreResponse> {
        let response = self
            .client
            .index(IndexParts::Index(target))
            .body(document)
            .send()
            .await?;

        let status = response.status_code().as_u16();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(StoreResponse { status, body })
    }
}

/// Writes enriched streams into `<prefix>-<bucket>` and parses the store's answer.
pub struct DocumentStore {
    transport: Arc<dyn IndexTransport>,
    bucket: Arc<TimeBucket>,
}

impl DocumentStore {
    pub fn new(transport: Arc<dyn IndexTransport>, bucket: Arc<TimeBucket>) -> Self {
        Self { transport, bucket }
    }

    /// Target index for `index_prefix` under the bucket held right now.
    pub fn target_for(&self, index_prefix: &str) -> String {
        format!("{}-{}", index_prefix, self.bucket.current())
    }

    /// Index one document.
    ///
    /// Transport failures come back as ordinary errors. An error status from
    /// the store becomes [`IndexerError::StoreRejected`], which is fatal.
    pub async fn write(&self, doc: &EnrichedStream, index_prefix: &str) -> Result<WriteResult> {
        let target = self.target_for(index_prefix);
        debug!(index = %target, "Indexing stream");

        let body = serde_json::to_value(doc)?;
        let response = self.transport.index(&target, body).await?;

        if !response.is_success() {
            return Err(IndexerError::StoreRejected {
                index: target,
                status: response.status,
                reason: rejection_reason(&response.body),
            });
        }

        Ok(serde_json::from_value(response.body)?)
    }
}

/// Pull `type: reason` out of an Elasticsearch error body, falling back to the raw body.
fn rejection_reason(body: &Value) -> String {
    match body.get("error") {
        Some(Value::Object(error)) => {
            let kind = error.get("type").and_then(Value::as_str).unwrap_or("error");
            match error.get("reason").and_then(Value::as_str) {
                Some(reason) => format!("{kind}: {reason}"),
                None => kind.to_string(),
            }
        }
        Some(Value::String(message)) => message.clone(),
        _ => match body {
            Value::String(text) if !text.is_empty() => text.clone(),
            Value::Null | Value::String(_) => "empty response body".to_string(),
            other => other.to_string(),
        },
    }
}
