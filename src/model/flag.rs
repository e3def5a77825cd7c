use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::naming::flag_default_name;
use super::status::{Resolvable, Status};

/// A time-boxed task occupying one of the fixed flag slots
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Flag {
    pub name: String,
    /// Deadline (ISO-8601, empty when unset)
    pub target_time: String,
    /// Start of the time box (ISO-8601, empty when unset)
    pub start_time: String,
    pub content: String,
    pub status: Status,
    pub finished_at: String,
    pub discarded_at: String,
    /// Seconds from `start_time` to `target_time`, 0 when either is unset
    pub span_seconds: u64,
    pub running: bool,
    pub paused: bool,
    /// Seconds spent paused, not counting an open pause
    pub paused_duration: u64,
    /// When the open pause began
    pub pause_start_time: Option<String>,
    /// Keys this version does not know about, written back untouched
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl Flag {
    /// A blank flag for slot `index` (0-based)
    pub fn new(index: usize) -> Self {
        Flag {
            name: flag_default_name(index).to_string(),
            ..Default::default()
        }
    }
}

impl Resolvable for Flag {
    fn status(&self) -> Status {
        self.status
    }
    fn set_status(&mut self, status: Status) {
        self.status = status;
    }
    fn set_finished_at(&mut self, at: String) {
        self.finished_at = at;
    }
    fn set_discarded_at(&mut self, at: String) {
        self.discarded_at = at;
    }
}
