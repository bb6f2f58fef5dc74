use crate::error::{IndexerError, Result};
use crate::metrics;
use crate::models::{CycleTally, RawStream};
use crate::services::{DocumentStore, EnrichmentPolicy, Evaluation, StreamPlatform};
use futures::stream::{self, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Fixed inputs of every cycle.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    /// Broadcast language passed to the platform listing.
    pub language: String,
    /// Streams requested per cycle.
    pub batch_size: u32,
    /// Logical index name; the store appends the time bucket.
    pub index_prefix: String,
}

/// One fetch → enrich/filter → write pass.
///
/// Streams are handled strictly in fetch order, one at a time. The first
/// error ends the pass: nothing after the failing stream is evaluated or
/// written, and the error is returned instead of a tally.
pub struct PollCycle {
    platform: Arc<dyn StreamPlatform>,
    policy: EnrichmentPolicy,
    store: DocumentStore,
    settings: CycleSettings,
}

impl PollCycle {
    pub fn new(
        platform: Arc<dyn StreamPlatform>,
        policy: EnrichmentPolicy,
        store: DocumentStore,
        settings: CycleSettings,
    ) -> Self {
        Self {
            platform,
            policy,
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    pub async fn run(&self) -> Result<CycleTally> {
        let streams = self.fetch().await?;
        debug!(count = streams.len(), "Got live streams");

        let tally = stream::iter(streams.into_iter().map(Ok::<_, IndexerError>))
            .try_fold(CycleTally::default(), |tally, raw| self.process(tally, raw))
            .await?;

        info!(
            stored = tally.stored,
            skipped = tally.skipped,
            "Stored {} data points in Elasticsearch",
            tally.stored
        );
        Ok(tally)
    }

    async fn fetch(&self) -> Result<Vec<RawStream>> {
        let streams = self
            .platform
            .list_live_streams(&self.settings.language, self.settings.batch_size)
            .await
            .map_err(|e| {
                warn!(
                    language = %self.settings.language,
                    status = ?e.status(),
                    error = %e,
                    "Failed to list live streams"
                );
                e
            })?;
        Ok(streams)
    }

    async fn process(&self, mut tally: CycleTally, raw: RawStream) -> Result<CycleTally> {
        let title = raw.title.clone();
        let user_name = raw.user_name.clone();
        let viewer_count = raw.viewer_count;

        let doc = match self.policy.evaluate(raw).await {
            Ok(Evaluation::Keep(doc)) => doc,
            Ok(Evaluation::Skipped) => {
                debug!(
                    %title,
                    %user_name,
                    viewer_count,
                    threshold = self.policy.min_viewer_count(),
                    "Skipping stream under viewer threshold"
                );
                metrics::record_skipped();
                tally.skipped += 1;
                return Ok(tally);
            }
            Err(e) => {
                warn!(%title, %user_name, error = %e, "Failed to enrich stream");
                return Err(e);
            }
        };

        debug!(
            %title,
            %user_name,
            follower_count = doc.follower_count,
            "Storing stream in Elasticsearch"
        );

        let result = self
            .store
            .write(&doc, &self.settings.index_prefix)
            .await
            .map_err(|e| {
                error!(%title, %user_name, error = %e, "Failed to store stream");
                e
            })?;

        debug!(
            %title,
            %user_name,
            index = %result.index,
            document_id = %result.id,
            version = result.version,
            outcome = ?result.result,
            "Stored stream in Elasticsearch"
        );
        metrics::record_stored();
        tally.stored += 1;
        Ok(tally)
    }
}
