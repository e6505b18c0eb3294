use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::types::UserId;

/// Sliding-window limiter keyed by user.
///
/// Each user owns a queue of admission times. A check prunes entries older
/// than the window and admits only while fewer than `limit` remain. The
/// prune/compare/append sequence runs under the map's per-key lock, so two
/// calls for the same user are serialized while different users proceed
/// independently.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<UserId, VecDeque<Instant>>,
    limit: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window,
        }
    }

    pub fn allow(&self, user: UserId) -> bool {
        let now = Instant::now();
        let mut entry = self.windows.entry(user).or_default();
        let stamps = entry.value_mut();
        prune(stamps, now, self.window);

        if stamps.len() >= self.limit {
            debug!("user {} over limit ({} in window)", user, stamps.len());
            return false;
        }
        stamps.push_back(now);
        true
    }

    /// Time until the oldest admission leaves the window, if the user is
    /// currently at the limit.
    pub fn retry_after(&self, user: UserId) -> Option<Duration> {
        let now = Instant::now();
        let mut entry = self.windows.get_mut(&user)?;
        let stamps = entry.value_mut();
        prune(stamps, now, self.window);
        if stamps.len() < self.limit {
            return None;
        }
        let oldest = *stamps.front()?;
        Some(self.window.saturating_sub(now.saturating_duration_since(oldest)))
    }

    /// Users with at least one admission inside the current window.
    pub fn active_user_count(&self) -> usize {
        let now = Instant::now();
        self.windows
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .iter()
                    .any(|t| now.saturating_duration_since(*t) < self.window)
            })
            .count()
    }

    /// Drops users whose whole window has aged out. Returns how many were removed.
    pub fn prune_idle(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, stamps| {
            prune(stamps, now, self.window);
            !stamps.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }
}

fn prune(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(front) = stamps.front() {
        if now.saturating_duration_since(*front) >= window {
            stamps.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::advance;

    fn limiter() -> RateLimiter {
        RateLimiter::new(10, Duration::from_secs(60))
    }

    #[tokio::test(start_paused = true)]
    async fn test_eleventh_call_in_window_is_rejected() {
        let rl = limiter();
        for i in 0..10 {
            assert!(rl.allow(7), "call {} should be admitted", i + 1);
        }
        assert!(!rl.allow(7));
        // Rejections do not consume capacity.
        advance(Duration::from_secs(30)).await;
        assert!(!rl.allow(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_restored_one_slot_at_a_time() {
        let rl = limiter();
        assert!(rl.allow(1));
        advance(Duration::from_secs(10)).await;
        for _ in 0..9 {
            assert!(rl.allow(1));
        }
        assert!(!rl.allow(1));

        // 60s after the oldest admission exactly one slot frees up.
        advance(Duration::from_secs(50)).await;
        assert!(rl.allow(1));
        assert!(!rl.allow(1));

        // The remaining nine were admitted at t=10 and free up at t=70.
        advance(Duration::from_secs(10)).await;
        for _ in 0..9 {
            assert!(rl.allow(1));
        }
        assert!(!rl.allow(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_users_are_independent() {
        let rl = limiter();
        for _ in 0..10 {
            assert!(rl.allow(1));
        }
        assert!(!rl.allow(1));
        assert!(rl.allow(2));
        assert_eq!(rl.active_user_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_reports_time_to_next_slot() {
        let rl = limiter();
        assert_eq!(rl.retry_after(3), None);
        for _ in 0..10 {
            rl.allow(3);
        }
        advance(Duration::from_secs(45)).await;
        assert_eq!(rl.retry_after(3), Some(Duration::from_secs(15)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_users_are_pruned() {
        let rl = limiter();
        rl.allow(1);
        rl.allow(2);
        advance(Duration::from_secs(61)).await;
        rl.allow(2);
        assert_eq!(rl.active_user_count(), 1);
        assert_eq!(rl.prune_idle(), 1);
        assert_eq!(rl.windows.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_same_user_never_exceeds_limit() {
        let rl = Arc::new(limiter());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let rl = rl.clone();
            handles.push(tokio::spawn(async move { rl.allow(42) }));
        }
        let mut admitted = 0;
        for h in handles {
            if h.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 10);
    }
}
