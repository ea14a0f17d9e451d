use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Default)]
struct Counters {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Caps how many fetch tasks may run at once.
///
/// Slots are handed out by a counting semaphore: taking a slot waits until one is free and gives
/// it back when the returned [`Slot`] is dropped. The in-flight and peak counters are only
/// bookkeeping for logs and tests; admission is decided by the semaphore alone.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    max: usize,
    counters: Arc<Counters>,
}

#[derive(Debug)]
pub struct Slot {
    size: usize,
    counters: Arc<Counters>,
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    pub fn new(max: usize) -> Self {
        assert!(max >= 1, "concurrency limit must allow at least one task");
        ConcurrencyLimiter {
            semaphore: Arc::new(Semaphore::new(max)),
            max,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of slots held at the same time since the limiter was created.
    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    pub async fn acquire(&self) -> Result<Slot, AcquireError> {
        self.acquire_many(1).await
    }

    /// Waits until `count` slots are free and takes them together.
    ///
    /// # Panics
    ///
    /// Panics if `count` is larger than the limit, since such a request could never be granted.
    pub async fn acquire_many(&self, count: usize) -> Result<Slot, AcquireError> {
        let permits = match u32::try_from(count) {
            Ok(permits) if count <= self.max => permits,
            _ => panic!(
                "cannot admit {} tasks at once with a limit of {}",
                count, self.max
            ),
        };
        let permit = Arc::clone(&self.semaphore)
            .acquire_many_owned(permits)
            .await?;

        let now = self.counters.in_flight.fetch_add(count, Ordering::SeqCst) + count;
        self.counters.peak.fetch_max(now, Ordering::SeqCst);

        Ok(Slot {
            size: count,
            counters: Arc::clone(&self.counters),
            _permit: permit,
        })
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        // runs before the permit field is dropped, so the counter never overshoots the limit
        self.counters
            .in_flight
            .fetch_sub(self.size, Ordering::SeqCst);
    }
}
