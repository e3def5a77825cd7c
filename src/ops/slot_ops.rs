use crate::model::flag::Flag;
use crate::model::naming::is_legacy_placeholder;
use crate::model::note::Note;

/// Error type for positional slot operations
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("slot {} does not exist", .0 + 1)]
    OutOfRange(usize),
    #[error("already at the top")]
    AtTop,
    #[error("already at the bottom")]
    AtBottom,
    #[error("name cannot be empty")]
    EmptyName,
    #[error("\"{0}\" is reserved for unnamed slots")]
    ReservedName(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Swap slot `index` with its neighbour. Returns the slot's new index.
pub fn move_slot<T>(slots: &mut [T], index: usize, direction: Direction) -> Result<usize, SlotError> {
    if index >= slots.len() {
        return Err(SlotError::OutOfRange(index));
    }
    let target = match direction {
        Direction::Up => index.checked_sub(1).ok_or(SlotError::AtTop)?,
        Direction::Down if index + 1 < slots.len() => index + 1,
        Direction::Down => return Err(SlotError::AtBottom),
    };
    slots.swap(index, target);
    Ok(target)
}

/// Rename a flag. Names the loader would reset are refused.
pub fn rename_flag(flags: &mut [Flag], index: usize, name: &str) -> Result<(), SlotError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SlotError::EmptyName);
    }
    if is_legacy_placeholder(name, index) {
        return Err(SlotError::ReservedName(name.to_string()));
    }
    let flag = flags.get_mut(index).ok_or(SlotError::OutOfRange(index))?;
    flag.name = name.to_string();
    Ok(())
}

pub fn rename_note(notes: &mut [Note], index: usize, name: &str) -> Result<(), SlotError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SlotError::EmptyName);
    }
    let note = notes.get_mut(index).ok_or(SlotError::OutOfRange(index))?;
    note.display_name = name.to_string();
    Ok(())
}

/// Reset a flag slot to its default. Returns the previous flag.
pub fn clear_flag(flags: &mut [Flag], index: usize) -> Result<Flag, SlotError> {
    let flag = flags.get_mut(index).ok_or(SlotError::OutOfRange(index))?;
    Ok(std::mem::replace(flag, Flag::new(index)))
}

/// Reset a note slot to its default, stamped with `now`. Returns the
/// previous note.
pub fn clear_note(notes: &mut [Note], index: usize, now: &str) -> Result<Note, SlotError> {
    let note = notes.get_mut(index).ok_or(SlotError::OutOfRange(index))?;
    Ok(std::mem::replace(note, Note::new(index, now)))
}
