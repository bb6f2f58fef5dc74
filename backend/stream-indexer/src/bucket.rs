use chrono::{DateTime, Datelike, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Index suffix for the month containing `now`, e.g. `2021-3`.
pub fn bucket_for(now: DateTime<Utc>) -> String {
    format!("{}-{}", now.year(), now.month())
}

/// Current year-month suffix used to name write targets.
///
/// Readers take a short read lock and clone the value; the refresher swaps in
/// a whole new string, so a reader sees either the old or the new bucket.
#[derive(Debug)]
pub struct TimeBucket {
    current: RwLock<String>,
}

impl TimeBucket {
    /// Bucket initialised from the wall clock, ready before any write happens.
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            current: RwLock::new(bucket_for(now)),
        }
    }

    pub fn current(&self) -> String {
        self.current.read().clone()
    }

    /// Recompute the bucket for `now`. Returns true when the value changed.
    pub fn refresh_at(&self, now: DateTime<Utc>) -> bool {
        let next = bucket_for(now);
        if *self.current.read() == next {
            return false;
        }

        let mut slot = self.current.write();
        let previous = std::mem::replace(&mut *slot, next);
        info!(from = %previous, to = %slot.as_str(), "Index bucket rolled over");
        true
    }

    pub fn refresh(&self) -> bool {
        self.refresh_at(Utc::now())
    }

    /// Spawn the background refresher.
    ///
    /// # Returns
    /// - `watch::Sender<()>` - send (or drop) to stop the refresher
    /// - `tokio::task::JoinHandle` - completes once the refresher has stopped
    pub fn spawn_refresher(
        self: Arc<Self>,
        every: Duration,
    ) -> (watch::Sender<()>, tokio::task::JoinHandle<()>) {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(());

        let handle = tokio::spawn(async move {
            info!(
                interval_secs = every.as_secs(),
                bucket = %self.current(),
                "Index bucket refresher started"
            );

            // The bucket was computed at construction; the first refresh is one period later.
            let mut timer = interval_at(Instant::now() + every, every);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = timer.tick() => {
                        if !self.refresh() {
                            debug!(bucket = %self.current(), "Index bucket unchanged");
                        }
                    }
                }
            }

            info!("Index bucket refresher stopped");
        });

        (shutdown_tx, handle)
    }
}

impl Default for TimeBucket {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_bucket_format_is_year_dash_month() {
        let march = Utc.with_ymd_and_hms(2021, 3, 15, 12, 0, 0).unwrap();
        assert_eq!(bucket_for(march), "2021-3");

        let november = Utc.with_ymd_and_hms(2024, 11, 1, 0, 0, 0).unwrap();
        assert_eq!(bucket_for(november), "2024-11");
    }

    #[test]
    fn test_refresh_only_changes_on_month_boundary() {
        let start = Utc.with_ymd_and_hms(2021, 3, 31, 23, 50, 0).unwrap();
        let bucket = TimeBucket::starting_at(start);
        assert_eq!(bucket.current(), "2021-3");

        let same_month = Utc.with_ymd_and_hms(2021, 3, 31, 23, 55, 0).unwrap();
        assert!(!bucket.refresh_at(same_month));
        assert_eq!(bucket.current(), "2021-3");

        let next_month = Utc.with_ymd_and_hms(2021, 4, 1, 0, 0, 5).unwrap();
        assert!(bucket.refresh_at(next_month));
        assert_eq!(bucket.current(), "2021-4");
    }

    #[test]
    fn test_year_rollover() {
        let bucket = TimeBucket::starting_at(Utc.with_ymd_and_hms(2020, 12, 31, 23, 59, 59).unwrap());
        assert!(bucket.refresh_at(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(bucket.current(), "2021-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresher_stops_on_shutdown() {
        let bucket = Arc::new(TimeBucket::starting_at(
            Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap(),
        ));
        let (shutdown_tx, handle) = Arc::clone(&bucket).spawn_refresher(Duration::from_secs(300));

        // After one period the refresher recomputes from the real clock.
        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(bucket.current(), bucket_for(Utc::now()));

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
