use std::time::{Duration, Instant};

use crate::model::config::AutosaveConfig;

/// Debounce state for note auto-save.
///
/// Every edit pushes the deadline to `now + delay`; [`AutoSave::poll`]
/// reports true once the deadline has passed, then goes idle until the next
/// edit. Time is passed in so callers (and tests) own the clock.
#[derive(Debug, Clone)]
pub struct AutoSave {
    delay: Duration,
    deadline: Option<Instant>,
}

impl AutoSave {
    pub fn new(delay: Duration) -> Self {
        AutoSave {
            delay,
            deadline: None,
        }
    }

    pub fn from_config(config: &AutosaveConfig) -> Self {
        AutoSave::new(Duration::from_millis(config.debounce_ms))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record an edit at `now`
    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// True exactly once per quiet period, when `now` reaches the deadline
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Drop a pending save, e.g. after saving explicitly
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

impl Default for AutoSave {
    fn default() -> Self {
        AutoSave::from_config(&AutosaveConfig::default())
    }
}
