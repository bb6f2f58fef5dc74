pub mod bucket;
pub mod config;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod services;

pub use bucket::TimeBucket;
pub use error::{IndexerError, Result};
pub use jobs::{CycleSettings, PollCycle, Scheduler};
pub use models::{CycleTally, EnrichedStream, RawStream, WriteOutcome, WriteResult};
