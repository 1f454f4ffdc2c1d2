// src/exec/progress.rs

use std::time::Duration;

use tokio::time::Instant;

/// Interval between progress lines of long transfers.
pub const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Lets at most one progress message through per interval.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    every: Duration,
    last: Option<Instant>,
}

impl ProgressThrottle {
    pub fn new(every: Duration) -> Self {
        Self { every, last: None }
    }

    /// `true` on the first call and whenever `every` has elapsed since the
    /// last `true`.
    pub fn ready(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.every => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(PROGRESS_LOG_INTERVAL)
    }
}
