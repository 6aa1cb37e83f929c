use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use super::sink::RelaySink;

/// Result of admitting one formatted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Relayed straight away, opening (or extending) a forwarding episode.
    Forwarded,
    /// Appended to the pending queue, which now holds `depth` messages.
    Queued { depth: usize },
}

/// Rate-limit state and pending queue. Always mutated under one lock.
#[derive(Default)]
struct RelayState {
    forwarding: bool,
    last_forward: Option<Instant>,
    pending: VecDeque<String>,
}

impl RelayState {
    fn slot_open(&self, now: Instant, rate_limit: Duration) -> bool {
        if !self.forwarding {
            return true;
        }
        match self.last_forward {
            Some(last) => now.duration_since(last) > rate_limit,
            None => true,
        }
    }
}

/// Single global rate limiter deciding between immediate relay and queueing.
///
/// A forwarding episode starts with an immediate send while idle. It stays
/// active while the drain task runs, and ends when the drain task wakes up to
/// an empty queue. Only the idle-to-active transition spawns a drain task, so
/// at most one exists at any time.
pub struct Scheduler {
    sink: RelaySink,
    rate_limit: Duration,
    queue_delay: Duration,
    state: Mutex<RelayState>,
}

impl Scheduler {
    pub fn new(sink: RelaySink, rate_limit: Duration, queue_delay: Duration) -> Self {
        Self {
            sink,
            rate_limit,
            queue_delay,
            state: Mutex::new(RelayState::default()),
        }
    }

    /// Relay `text` now if the rate-limit slot is free, otherwise queue it.
    pub async fn admit(self: &Arc<Self>, text: String) -> Admission {
        let now = Instant::now();

        {
            let mut state = self.state.lock().await;
            if !state.slot_open(now, self.rate_limit) {
                state.pending.push_back(text);
                let depth = state.pending.len();
                info!("Queued message. Queue size: {}", depth);
                return Admission::Queued { depth };
            }
            // The drain task owns the way back to idle, so it must exist
            // before the relay below gets a chance to unwind.
            if !state.forwarding {
                let scheduler = Arc::clone(self);
                tokio::spawn(async move { scheduler.drain().await });
            }
            state.forwarding = true;
            state.last_forward = Some(now);
        }

        let delivered = self.sink.relay(&text).await;
        debug!("Immediate relay reached {} destination(s)", delivered);
        Admission::Forwarded
    }

    /// Pop and relay queued messages, one per `queue_delay`, until empty.
    async fn drain(&self) {
        debug!("Drain loop started");
        loop {
            tokio::time::sleep(self.queue_delay).await;

            let next = {
                let mut state = self.state.lock().await;
                let next = state.pending.pop_front();
                if next.is_none() {
                    state.forwarding = false;
                }
                next.map(|text| (text, state.pending.len()))
            };

            match next {
                Some((text, remaining)) => {
                    debug!("Relaying queued message ({} left in queue)", remaining);
                    let delivered = self.sink.relay(&text).await;
                    debug!("Queued relay reached {} destination(s)", delivered);
                }
                None => break,
            }
        }
        info!("Queue drained, forwarding episode finished");
    }

    #[cfg(test)]
    async fn is_forwarding(&self) -> bool {
        self.state.lock().await.forwarding
    }
}
