use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

use crate::config::DelayRange;

/// Global minimum-interval limiter shared by every enrichment worker.
///
/// Each request may start only after a randomized delay has elapsed since
/// both the previous start and the previous completion, so a sequential run
/// pauses between symbols and a parallel run never bursts.
#[derive(Clone)]
pub struct Throttle {
    next_slot: Arc<Mutex<Option<Instant>>>,
    delay: DelayRange,
}

impl Throttle {
    pub fn new(delay: DelayRange) -> Self {
        Self {
            next_slot: Arc::new(Mutex::new(None)),
            delay,
        }
    }

    /// Wait for the next free slot and reserve it.
    pub async fn acquire(&self) {
        // Lock is held across the sleep so waiters queue in arrival order.
        let mut slot = self.next_slot.lock().await;
        if let Some(at) = *slot {
            if at > Instant::now() {
                tracing::debug!("Throttle: waiting {:.2}s", (at - Instant::now()).as_secs_f64());
                sleep_until(at).await;
            }
        }
        *slot = Some(Instant::now() + self.delay.sample());
    }

    /// Push the next slot out to a full delay after this completion.
    pub async fn complete(&self) {
        let mut slot = self.next_slot.lock().await;
        let after_completion = Instant::now() + self.delay.sample();
        if slot.map_or(true, |at| after_completion > at) {
            *slot = Some(after_completion);
        }
    }

    pub async fn run<F, T>(&self, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        self.acquire().await;
        let output = fut.await;
        self.complete().await;
        output
    }
}
