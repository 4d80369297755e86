use parking_lot::Mutex;
use tokio::time::{sleep_until, Duration, Instant};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(600);

/// Paces the launch of per-ticker work to stay under a requests-per-second limit.
///
/// Unlike a semaphore this does not bound how many tasks run at once: callers
/// are only held back until their launch slot comes up. Slots are handed out
/// in call order, each at least `interval` after the previous one, so the
/// n-th launch never happens earlier than `(n - 1) * interval` after the first.
pub struct Throttle {
    /// Earliest instant the next slot may be granted
    next_slot: Mutex<Option<Instant>>,
    interval: Duration,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            next_slot: Mutex::new(None),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the next launch slot.
    ///
    /// The slot is reserved under the lock and the wait happens outside it,
    /// so concurrent callers queue up on distinct slots without blocking the
    /// runtime thread.
    pub async fn acquire(&self) -> Instant {
        let slot = {
            let mut next = self.next_slot.lock();
            let now = Instant::now();
            let slot = match *next {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next = Some(slot + self.interval);
            slot
        }; // Lock is dropped here

        sleep_until(slot).await;
        slot
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_acquire_is_immediate() {
        let throttle = Throttle::new(Duration::from_millis(200));

        let start = Instant::now();
        throttle.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(100), "First launch should be immediate");
    }

    #[tokio::test]
    async fn test_launches_are_spaced_by_interval() {
        let interval = Duration::from_millis(50);
        let throttle = Throttle::new(interval);

        let mut launches = Vec::new();
        for _ in 0..4 {
            throttle.acquire().await;
            launches.push(Instant::now());
        }

        let first = launches[0];
        let last = launches[3];
        assert!(last - first >= interval * 3, "4 launches should span at least 3 intervals");
        for pair in launches.windows(2) {
            assert!(pair[1] - pair[0] >= interval);
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_get_distinct_slots() {
        let throttle = Arc::new(Throttle::new(Duration::from_millis(40)));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let throttle = throttle.clone();
                tokio::spawn(async move { throttle.acquire().await })
            })
            .collect();

        let mut slots = Vec::new();
        for h in handles {
            slots.push(h.await.unwrap());
        }
        slots.sort();

        assert!(slots[1] - slots[0] >= Duration::from_millis(40));
        assert!(slots[2] - slots[1] >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_idle_throttle_does_not_accumulate_burst() {
        let interval = Duration::from_millis(30);
        let throttle = Throttle::new(interval);

        throttle.acquire().await;
        tokio::time::sleep(interval * 3).await;

        // After an idle gap the next slot is "now", and the one after is spaced again.
        let a = throttle.acquire().await;
        let b = throttle.acquire().await;
        assert!(b - a >= interval);
    }
}
