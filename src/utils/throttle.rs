use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces request starts at least `interval` apart across all workers.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits for the next free slot and reserves it.
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }

        let wait_until = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(slot) if slot > now => slot,
                _ => now,
            };
            *next_slot = Some(slot + self.interval);
            slot
        };

        tokio::time::sleep_until(wait_until).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_disabled_throttle_does_not_wait() {
        let throttle = Throttle::disabled();
        let start = std::time::Instant::now();
        for _ in 0..100 {
            throttle.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_throttle_spaces_concurrent_callers() {
        let throttle = Arc::new(Throttle::new(Duration::from_millis(20)));
        let start = std::time::Instant::now();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let throttle = Arc::clone(&throttle);
            handles.push(tokio::spawn(async move { throttle.acquire().await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // First slot is immediate, the remaining three are 20ms apart.
        assert!(start.elapsed() >= Duration::from_millis(60));
    }
}
