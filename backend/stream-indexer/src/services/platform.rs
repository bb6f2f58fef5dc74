use crate::models::RawStream;
use twitch_helix::{HelixClient, HelixError};

/// The streaming platform as seen by the poll cycle.
///
/// Implementations only need to be safe for sequential use; a single cycle
/// runs at a time.
#[async_trait::async_trait]
pub trait StreamPlatform: Send + Sync {
    /// Live streams broadcasting in `language`, in platform order.
    async fn list_live_streams(&self, language: &str, limit: u32)
        -> Result<Vec<RawStream>, HelixError>;

    /// Number of followers of `broadcaster_id`.
    async fn follower_count(&self, broadcaster_id: &str) -> Result<u64, HelixError>;
}

#[async_trait::async_trait]
impl StreamPlatform for HelixClient {
    async fn list_live_streams(
        &self,
        language: &str,
        limit: u32,
    ) -> Result<Vec<RawStream>, HelixError> {
        self.get_streams(language, limit).await
    }

    async fn follower_count(&self, broadcaster_id: &str) -> Result<u64, HelixError> {
        self.follower_total(broadcaster_id).await
    }
}
