use super::StreamPlatform;
use crate::error::Result;
use crate::models::{EnrichedStream, RawStream};
use chrono::Utc;
use std::sync::Arc;

/// Default popularity threshold; streams with fewer viewers are not indexed.
pub const DEFAULT_MIN_VIEWER_COUNT: u64 = 500;

/// Outcome of evaluating one raw stream.
#[derive(Debug, Clone)]
pub enum Evaluation {
    Keep(EnrichedStream),
    Skipped,
}

/// Decides which streams are worth indexing and attaches the follower total.
pub struct EnrichmentPolicy {
    platform: Arc<dyn StreamPlatform>,
    min_viewer_count: u64,
}

impl EnrichmentPolicy {
    pub fn new(platform: Arc<dyn StreamPlatform>, min_viewer_count: u64) -> Self {
        Self {
            platform,
            min_viewer_count,
        }
    }

    pub fn min_viewer_count(&self) -> u64 {
        self.min_viewer_count
    }

    /// Skip streams under the threshold before any network call; otherwise
    /// fetch the follower total and stamp the enrichment time.
    ///
    /// A failed follower lookup is returned as an error, never downgraded to a skip.
    pub async fn evaluate(&self, raw: RawStream) -> Result<Evaluation> {
        if raw.viewer_count < self.min_viewer_count {
            return Ok(Evaluation::Skipped);
        }

        let follower_count = self.platform.follower_count(&raw.user_id).await?;

        Ok(Evaluation::Keep(EnrichedStream {
            stream: raw,
            follower_count,
            observed_at: Utc::now(),
        }))
    }
}
