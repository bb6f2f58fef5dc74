pub mod elasticsearch;
pub mod enrichment;
pub mod platform;

pub use elasticsearch::{DocumentStore, ElasticsearchTransport, IndexTransport, StoreResponse};
pub use enrichment::{EnrichmentPolicy, Evaluation, DEFAULT_MIN_VIEWER_COUNT};
pub use platform::StreamPlatform;
