//! Process-wide request pacing.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Gate awaited before every outgoing request of one source kind.
#[async_trait]
pub trait RequestGate: Send + Sync {
    /// Wait until a request may be sent, then claim the slot.
    async fn wait(&self);
}

/// Enforces a minimum delay between any two requests passing the gate.
///
/// The lock is only held to read and claim the next slot; the sleep itself
/// happens outside it, so waiting callers queue up on distinct slots.
#[derive(Debug)]
pub struct MinIntervalGate {
    min_delay: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl MinIntervalGate {
    /// Create a gate with the given minimum delay.
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            next_slot: Mutex::new(None),
        }
    }

    /// A gate that never waits.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Configured minimum delay.
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }
}

#[async_trait]
impl RequestGate for MinIntervalGate {
    async fn wait(&self) {
        if self.min_delay.is_zero() {
            return;
        }

        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(next) if next > now => next,
                _ => now,
            };
            *next_slot = Some(slot + self.min_delay);
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}
