use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info};

/// Pause after a successful send before contacting the next destination.
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);
/// Pause after a failed send before contacting the next destination.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

/// Capability to post a text message to one destination feed.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn send(&self, destination: i64, text: &str) -> Result<()>;
}

/// Delivers formatted messages to every destination, in order.
pub struct RelaySink {
    outbound: Arc<dyn Outbound>,
    destinations: Vec<i64>,
    pacing: Duration,
    backoff: Duration,
}

impl RelaySink {
    pub fn new(outbound: Arc<dyn Outbound>, destinations: Vec<i64>) -> Self {
        Self {
            outbound,
            destinations,
            pacing: DEFAULT_PACING,
            backoff: DEFAULT_BACKOFF,
        }
    }

    #[cfg(test)]
    pub fn with_delays(mut self, pacing: Duration, backoff: Duration) -> Self {
        self.pacing = pacing;
        self.backoff = backoff;
        self
    }

    /// Send `text` to each destination once.
    ///
    /// A failing destination is logged and skipped; the remaining ones are
    /// still attempted. Returns how many destinations accepted the message.
    pub async fn relay(&self, text: &str) -> usize {
        let mut delivered = 0;
        for &destination in &self.destinations {
            match self.outbound.send(destination, text).await {
                Ok(()) => {
                    info!("Forwarded to {}", destination);
                    delivered += 1;
                    tokio::time::sleep(self.pacing).await;
                }
                Err(e) => {
                    error!("Send error for {}: {:#}", destination, e);
                    tokio::time::sleep(self.backoff).await;
                }
            }
        }
        delivered
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingOutbound;
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_relay_visits_destinations_in_order() {
        let outbound = Arc::new(RecordingOutbound::default());
        let sink = RelaySink::new(outbound.clone(), vec![30, 10, 20]);

        let start = Instant::now();
        assert_eq!(sink.relay("hello").await, 3);

        let sent = outbound.sent();
        let order: Vec<i64> = sent.iter().map(|(dest, _, _)| *dest).collect();
        assert_eq!(order, vec![30, 10, 20]);
        assert_eq!(sent[1].2 - sent[0].2, DEFAULT_PACING);
        assert_eq!(start.elapsed(), DEFAULT_PACING * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_destination_does_not_stop_others() {
        let outbound = Arc::new(RecordingOutbound::failing_for(&[2]));
        let sink = RelaySink::new(outbound.clone(), vec![1, 2, 3]);

        let start = Instant::now();
        assert_eq!(sink.relay("hello").await, 2);

        let sent = outbound.sent();
        let order: Vec<i64> = sent.iter().map(|(dest, _, _)| *dest).collect();
        assert_eq!(order, vec![1, 3]);
        // 1s pacing after #1, 2s backoff after #2
        assert_eq!(sent[1].2 - start, Duration::from_secs(3));
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_delays() {
        let outbound = Arc::new(RecordingOutbound::failing_for(&[1]));
        let sink = RelaySink::new(outbound.clone(), vec![1, 2])
            .with_delays(Duration::from_millis(10), Duration::from_millis(50));

        let start = Instant::now();
        assert_eq!(sink.relay("x").await, 1);
        assert_eq!(start.elapsed(), Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_no_destinations() {
        let outbound = Arc::new(RecordingOutbound::default());
        let sink = RelaySink::new(outbound.clone(), Vec::new());
        assert_eq!(sink.relay("x").await, 0);
        assert!(outbound.sent().is_empty());
    }
}
