use super::PollCycle;
use crate::error::Result;
use crate::metrics;
use crate::models::CycleTally;
use std::time::{Duration, Instant as StdInstant};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

/// Default time between two cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Runs a poll cycle at startup and then on a fixed interval.
///
/// Cycles never overlap: a slow cycle pushes the next tick back instead of
/// queueing extra runs. Cycle errors are logged and the loop goes on, except
/// for store rejections, which stop the loop and are returned to the caller.
pub struct Scheduler {
    cycle: PollCycle,
    interval: Duration,
}

impl Scheduler {
    pub fn new(cycle: PollCycle, interval: Duration) -> Self {
        Self { cycle, interval }
    }

    /// Run a single cycle with timing, metrics and logging.
    pub async fn run_once(&self) -> Result<CycleTally> {
        let start = StdInstant::now();
        let result = self.cycle.run().await;
        metrics::observe_cycle(metrics::cycle_outcome(&result), start.elapsed());
        result
    }

    /// Drive cycles until `shutdown` fires or a fatal error occurs.
    pub async fn run(self, mut shutdown: watch::Receiver<()>) -> Result<()> {
        info!(
            interval_secs = self.interval.as_secs(),
            language = %self.cycle.settings().language,
            index_prefix = %self.cycle.settings().index_prefix,
            "Scheduler started"
        );

        self.tick().await?;

        let mut timer = interval_at(Instant::now() + self.interval, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Scheduler received shutdown signal");
                    break;
                }
                _ = timer.tick() => {
                    self.tick().await?;
                }
            }
        }

        info!("Scheduler stopped");
        Ok(())
    }

    /// Spawn the scheduling loop.
    ///
    /// # Returns
    /// - `watch::Sender<()>` - send (or drop) to stop after the current cycle
    /// - `tokio::task::JoinHandle` - resolves to the fatal error, if one stopped the loop
    pub fn spawn(self) -> (watch::Sender<()>, tokio::task::JoinHandle<Result<()>>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let handle = tokio::spawn(self.run(shutdown_rx));
        (shutdown_tx, handle)
    }

    async fn tick(&self) -> Result<()> {
        match self.run_once().await {
            Ok(_) => {
                info!(
                    next_in_secs = self.interval.as_secs(),
                    "Polling is done, waiting for next tick"
                );
                Ok(())
            }
            Err(e) if e.is_fatal() => {
                error!(error = %e, kind = e.kind(), "Fatal store error, stopping scheduler");
                Err(e)
            }
            Err(e) => {
                error!(error = %e, kind = e.kind(), "Polling cycle failed");
                Ok(())
            }
        }
    }
}
