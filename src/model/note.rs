use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::naming::note_default_label;
use super::status::{Resolvable, Status};

/// A free-form note occupying one of the fixed note slots
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Note {
    /// Label shown in lists when the title is empty
    pub display_name: String,
    pub title: String,
    pub content: String,
    pub status: Status,
    pub created_at: String,
    pub updated_at: String,
    pub finished_at: String,
    pub discarded_at: String,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl Note {
    /// A blank note for slot `index`, stamped with `now`
    pub fn new(index: usize, now: &str) -> Self {
        Note {
            display_name: note_default_label(index),
            created_at: now.to_string(),
            updated_at: now.to_string(),
            ..Default::default()
        }
    }

    /// Name for list views: the title if set, else the display name
    pub fn list_label(&self) -> &str {
        if self.title.is_empty() {
            &self.display_name
        } else {
            &self.title
        }
    }
}

impl Resolvable for Note {
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
