use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A live broadcast exactly as the platform reported it.
pub type RawStream = twitch_helix::Stream;

/// Document written to the store: the platform fields flattened at the top
/// level, plus the follower total and the enrichment time as `@timestamp`.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedStream {
    #[serde(flatten)]
    pub stream: RawStream,
    pub follower_count: u64,
    #[serde(rename = "@timestamp")]
    pub observed_at: DateTime<Utc>,
}

/// Result code reported by the store for a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    Created,
    Updated,
    #[serde(other)]
    Other,
}

/// What the store assigned to a written document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WriteResult {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_version")]
    pub version: i64,
    pub result: WriteOutcome,
}

/// Per-cycle counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleTally {
    pub stored: usize,
    pub skipped: usize,
}

impl CycleTally {
    pub fn processed(&self) -> usize {
        self.stored + self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn raw_stream() -> RawStream {
        RawStream {
            id: "40952121085".to_string(),
            user_id: "101051819".to_string(),
            user_login: "afro".to_string(),
            user_name: "Afro".to_string(),
            game_id: "32982".to_string(),
            game_name: "Grand Theft Auto V".to_string(),
            stream_type: "live".to_string(),
            title: "GTA RP".to_string(),
            viewer_count: 1490,
            started_at: Utc.with_ymd_and_hms(2021, 3, 10, 3, 18, 11).unwrap(),
            language: "fr".to_string(),
            thumbnail_url: String::new(),
            tag_ids: vec![],
            tags: vec!["Français".to_string()],
            is_mature: false,
        }
    }

    #[test]
    fn test_enriched_stream_is_flat_document() {
        let doc = EnrichedStream {
            stream: raw_stream(),
            follower_count: 42_000,
            observed_at: Utc.with_ymd_and_hms(2021, 3, 10, 4, 0, 0).unwrap(),
        };

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["follower_count"], json!(42_000));
        assert_eq!(value["@timestamp"], json!("2021-03-10T04:00:00Z"));
        assert_eq!(value["user_name"], json!("Afro"));
        assert_eq!(value["viewer_count"], json!(1490));
        assert_eq!(value["type"], json!("live"));
        assert!(value.get("stream").is_none());
        assert!(value.get("observed_at").is_none());
    }

    #[test]
    fn test_write_result_parses_store_body() {
        let body = json!({
            "_index": "streams-2021-3",
            "_id": "k3lQE3gBqkXxFX5x1N2a",
            "_version": 1,
            "result": "created",
            "_shards": { "total": 2, "successful": 1, "failed": 0 },
            "_seq_no": 0,
            "_primary_term": 1
        });

        let result: WriteResult = serde_json::from_value(body).unwrap();
        assert_eq!(result.index, "streams-2021-3");
        assert_eq!(result.version, 1);
        assert_eq!(result.result, WriteOutcome::Created);
    }

    #[test]
    fn test_unknown_result_code() {
        let body = json!({ "_index": "i", "_id": "1", "_version": 3, "result": "noop" });
        let result: WriteResult = serde_json::from_value(body).unwrap();
        assert_eq!(result.result, WriteOutcome::Other);
    }
}
