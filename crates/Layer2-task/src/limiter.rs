//! Per-session creation rate limiting
//!
//! Sliding window over creation timestamps. Only consulted before a creation
//! call; poll loops never touch it.

use cadence_foundation::{LimitCheckResult, SessionLimits};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::time::Instant;

#[derive(Debug)]
pub struct RateLimiter {
    limits: SessionLimits,
    recent: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            limits,
            recent: Mutex::new(VecDeque::new()),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(SessionLimits::unlimited())
    }

    pub fn limits(&self) -> &SessionLimits {
        &self.limits
    }

    /// Check the window and, if allowed, count this creation
    pub fn try_acquire(&self) -> LimitCheckResult {
        let now = Instant::now();
        let mut recent = self.recent.lock();
        Self::evict(&mut recent, now, &self.limits);

        let result = self.limits.check_creations(recent.len() as u32);
        if result.is_ok() {
            recent.push_back(now);
        }
        result
    }

    /// Check the active-task ceiling for this session
    pub fn check_active(&self, active: usize) -> LimitCheckResult {
        self.limits.check_active_tasks(active)
    }

    /// Creations inside the current window
    pub fn recent(&self) -> usize {
        let mut recent = self.recent.lock();
        Self::evict(&mut recent, Instant::now(), &self.limits);
        recent.len()
    }

    fn evict(recent: &mut VecDeque<Instant>, now: Instant, limits: &SessionLimits) {
        let window = limits.window();
        while let Some(front) = recent.front() {
            if now.duration_since(*front) >= window {
                recent.pop_front();
            } else {
                break;
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(SessionLimits::default())
    }
}
