use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use crate::config::StatsConfig;
use crate::metrics::StoreMetrics;
use crate::store::{MessageStore, StatsUpdate};

/// Background task that samples message throughput and refreshes the
/// connection counters in the store's stats
pub struct StatsSampler {
    config: StatsConfig,
    store: Arc<MessageStore>,
    shutdown: broadcast::Receiver<()>,
}

/// Messages appended per second between two samples of the store's
/// appended counter.
pub fn messages_per_second(previous_total: u64, current_total: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    current_total.saturating_sub(previous_total) as f64 / secs
}

impl StatsSampler {
    pub fn new(
        config: StatsConfig,
        store: Arc<MessageStore>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            store,
            shutdown,
        }
    }

    /// Run until the shutdown signal fires
    pub async fn run(mut self) {
        let interval = Duration::from_millis(self.config.sample_interval_ms.max(1));
        let mut timer = tokio::time::interval(interval);

        // Skip immediate first tick
        timer.tick().await;

        let mut last_total = self.store.appended_total();
        let mut last_sample = Instant::now();

        tracing::info!(
            sample_interval_ms = self.config.sample_interval_ms,
            "Stats sampler started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Stats sampler received shutdown signal");
                    break;
                }
                _ = timer.tick() => {
                    let now = Instant::now();
                    last_total = self.sample(last_total, now.duration_since(last_sample));
                    last_sample = now;
                }
            }
        }

        tracing::info!("Stats sampler stopped");
    }

    /// Take one sample; returns the total it was computed against
    fn sample(&self, previous_total: u64, elapsed: Duration) -> u64 {
        let current_total = self.store.appended_total();
        let rate = messages_per_second(previous_total, current_total, elapsed);

        self.store.refresh_connection_stats();
        self.store.update_stats(StatsUpdate {
            messages_per_second: Some(rate),
            ..Default::default()
        });
        StoreMetrics::set_throughput(rate);

        tracing::trace!(rate, appended_total = current_total, "Stats sampled");
        current_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Connection, Message};

    #[test]
    fn test_messages_per_second() {
        assert_eq!(messages_per_second(10, 30, Duration::from_secs(2)), 10.0);
        assert_eq!(messages_per_second(30, 10, Duration::from_secs(1)), 0.0);
        assert_eq!(messages_per_second(0, 5, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_sample_updates_store() {
        let store = Arc::new(MessageStore::new());
        store.add_connection(Connection::new("a", "ws://a"));
        for _ in 0..4 {
            store.add_message(Message::received("a", "x"));
        }
        let (_tx, rx) = broadcast::channel(1);
        let sampler = StatsSampler::new(StatsConfig::default(), store.clone(), rx);

        let total = sampler.sample(0, Duration::from_secs(2));

        assert_eq!(total, 4);
        let stats = store.stats();
        assert_eq!(stats.messages_per_second, 2.0);
        assert_eq!(stats.total_connections, 1);
        assert_eq!(stats.active_connections, 0);
    }

    #[test]
    fn test_sample_counts_frames_after_clear() {
        let store = Arc::new(MessageStore::new());
        for _ in 0..5 {
            store.add_message(Message::received("a", "x"));
        }
        let (_tx, rx) = broadcast::channel(1);
        let sampler = StatsSampler::new(StatsConfig::default(), store.clone(), rx);
        let previous = sampler.sample(0, Duration::from_secs(1));

        store.clear_messages(None);
        store.add_message(Message::received("a", "y"));
        store.add_message(Message::received("a", "z"));
        sampler.sample(previous, Duration::from_secs(1));

        assert_eq!(store.stats().messages_per_second, 2.0);
    }

    #[tokio::test]
    async fn test_sampler_shutdown() {
        let store = Arc::new(MessageStore::new());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let config = StatsConfig {
            sample_interval_ms: 10,
        };

        let sampler = StatsSampler::new(config, store, shutdown_rx);
        let handle = tokio::spawn(sampler.run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("Task should complete")
            .expect("Task should not panic");
    }
}
