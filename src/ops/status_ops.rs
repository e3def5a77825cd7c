use crate::model::flag::Flag;
use crate::model::note::Note;
use crate::model::status::{Resolvable, Status};
use crate::util::time::{parse_timestamp, seconds_between};

/// Error type for status transitions and edits
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StatusError {
    #[error("already {0}; only active items can be resolved")]
    NotActive(Status),
    #[error("{0} items are read-only")]
    ReadOnly(Status),
}

/// Active → completed, stamping `finished_at`
pub fn complete<T: Resolvable>(item: &mut T, now: &str) -> Result<(), StatusError> {
    require_active(item).map_err(StatusError::NotActive)?;
    item.set_status(Status::Completed);
    item.set_finished_at(now.to_string());
    Ok(())
}

/// Active → discarded, stamping `discarded_at`
pub fn discard<T: Resolvable>(item: &mut T, now: &str) -> Result<(), StatusError> {
    require_active(item).map_err(StatusError::NotActive)?;
    item.set_status(Status::Discarded);
    item.set_discarded_at(now.to_string());
    Ok(())
}

/// [`complete`] for a flag, which also stops its timer
pub fn complete_flag(flag: &mut Flag, now: &str) -> Result<(), StatusError> {
    complete(flag, now)?;
    stop_timer(flag, now);
    Ok(())
}

/// [`discard`] for a flag, which also stops its timer
pub fn discard_flag(flag: &mut Flag, now: &str) -> Result<(), StatusError> {
    discard(flag, now)?;
    stop_timer(flag, now);
    Ok(())
}

/// Fold an open pause into `paused_duration` and stop the flag.
fn stop_timer(flag: &mut Flag, now: &str) {
    if let Some(pause_start) = flag.pause_start_time.take()
        && let Some(now_dt) = parse_timestamp(now)
        && let Some(secs) = seconds_between(&pause_start, now_dt)
    {
        flag.paused_duration = flag.paused_duration.saturating_add(secs.max(0) as u64);
    }
    flag.running = false;
    flag.paused = false;
}

/// Replace a note's title and content, both trimmed. Stamps `updated_at`
/// and returns true only when something changed.
pub fn edit_note(note: &mut Note, title: &str, content: &str, now: &str) -> Result<bool, StatusError> {
    require_active(note).map_err(StatusError::ReadOnly)?;
    let title = title.trim();
    let content = content.trim();
    if note.title == title && note.content == content {
        return Ok(false);
    }
    note.title = title.to_string();
    note.content = content.to_string();
    note.updated_at = now.to_string();
    Ok(true)
}

/// Replace a flag's content (trimmed). Returns true when it changed.
pub fn edit_flag_content(flag: &mut Flag, content: &str) -> Result<bool, StatusError> {
    require_active(flag).map_err(StatusError::ReadOnly)?;
    let content = content.trim();
    if flag.content == content {
        return Ok(false);
    }
    flag.content = content.to_string();
    Ok(true)
}

fn require_active<T: Resolvable>(item: &T) -> Result<(), Status> {
    let status = item.status();
    if status.is_terminal() {
        Err(status)
    } else {
        Ok(())
    }
}
