use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state shared by flags and notes.
///
/// `Active` is the only non-terminal state; `Completed` and `Discarded`
/// never transition anywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Active,
    Completed,
    Discarded,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Active)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Completed => "completed",
            Status::Discarded => "discarded",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything carrying a [`Status`] and its two resolution stamps.
pub trait Resolvable {
    fn status(&self) -> Status;
    fn set_status(&mut self, status: Status);
    fn set_finished_at(&mut self, at: String);
    fn set_discarded_at(&mut self, at: String);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_lowercase_keywords() {
        assert_eq!(
            serde_json::to_string(&Status::Completed).unwrap(),
            "\"completed\""
        );
        let s: Status = serde_json::from_str("\"discarded\"").unwrap();
        assert_eq!(s, Status::Discarded);
    }

    #[test]
    fn unknown_keyword_is_rejected() {
        assert!(serde_json::from_str::<Status>("\"done\"").is_err());
    }

    #[test]
    fn only_active_is_open() {
        assert!(!Status::Active.is_terminal());
        assert!(Status::Completed.is_terminal());
        assert!(Status::Discarded.is_terminal());
    }
}
