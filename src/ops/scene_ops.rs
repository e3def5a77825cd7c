use crate::model::naming::{MAX_SCENES, default_scene_fields, is_usable_scene_name};
use crate::model::scene::{Record, Scenes};
use crate::ops::slot_ops::Direction;

/// Error type for scene and record operations
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("scene not found: {0}")]
    NotFound(String),
    #[error("scene already exists: {0}")]
    Exists(String),
    #[error("at most 6 scenes")]
    CapacityReached,
    #[error("invalid scene name: {0:?}")]
    InvalidName(String),
    #[error("invalid field list: {0}")]
    InvalidFields(String),
    #[error("row {} does not exist", .0 + 1)]
    RowOutOfRange(usize),
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("already at the top")]
    AtTop,
    #[error("already at the bottom")]
    AtBottom,
}

fn validate_name(name: &str) -> Result<&str, SceneError> {
    if !is_usable_scene_name(name) {
        return Err(SceneError::InvalidName(name.to_string()));
    }
    Ok(name.trim())
}

fn validate_fields(fields: &[String]) -> Result<Vec<String>, SceneError> {
    if fields.is_empty() {
        return Err(SceneError::InvalidFields("a scene needs at least one field".into()));
    }
    let mut out: Vec<String> = Vec::with_capacity(fields.len());
    for field in fields {
        let field = field.trim();
        if field.is_empty() {
            return Err(SceneError::InvalidFields("field names cannot be empty".into()));
        }
        if out.iter().any(|f| f == field) {
            return Err(SceneError::InvalidFields(format!("duplicate field {}", field)));
        }
        out.push(field.to_string());
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Scenes
// ---------------------------------------------------------------------------

/// Append a scene with `fields`, or the one-field default schema when empty.
pub fn add_scene(scenes: &mut Scenes, name: &str, fields: &[String]) -> Result<(), SceneError> {
    let name = validate_name(name)?;
    if scenes.contains_key(name) {
        return Err(SceneError::Exists(name.to_string()));
    }
    if scenes.len() >= MAX_SCENES {
        return Err(SceneError::CapacityReached);
    }
    let fields = if fields.is_empty() {
        default_scene_fields()
    } else {
        validate_fields(fields)?
    };
    scenes.insert(name.to_string(), fields);
    Ok(())
}

/// Rename in place. The caller moves the scene's CSV.
pub fn rename_scene(scenes: &mut Scenes, old: &str, new: &str) -> Result<(), SceneError> {
    let new = validate_name(new)?;
    let index = scenes
        .get_index_of(old)
        .ok_or_else(|| SceneError::NotFound(old.to_string()))?;
    if old == new {
        return Ok(());
    }
    if scenes.contains_key(new) {
        return Err(SceneError::Exists(new.to_string()));
    }
    if let Some(fields) = scenes.shift_remove(old) {
        scenes.insert(new.to_string(), fields);
        let last = scenes.len() - 1;
        scenes.move_index(last, index);
    }
    Ok(())
}

/// Move a scene one position. Returns its new index.
pub fn move_scene(scenes: &mut Scenes, name: &str, direction: Direction) -> Result<usize, SceneError> {
    let index = scenes
        .get_index_of(name)
        .ok_or_else(|| SceneError::NotFound(name.to_string()))?;
    let target = match direction {
        Direction::Up => index.checked_sub(1).ok_or(SceneError::AtTop)?,
        Direction::Down if index + 1 < scenes.len() => index + 1,
        Direction::Down => return Err(SceneError::AtBottom),
    };
    scenes.swap_indices(index, target);
    Ok(target)
}

/// Reset a scene's schema to the default. The caller empties its rows.
pub fn clear_scene(scenes: &mut Scenes, name: &str) -> Result<Vec<String>, SceneError> {
    let fields = scenes
        .get_mut(name)
        .ok_or_else(|| SceneError::NotFound(name.to_string()))?;
    Ok(std::mem::replace(fields, default_scene_fields()))
}

pub fn set_fields(scenes: &mut Scenes, name: &str, fields: &[String]) -> Result<(), SceneError> {
    let fields = validate_fields(fields)?;
    let slot = scenes
        .get_mut(name)
        .ok_or_else(|| SceneError::NotFound(name.to_string()))?;
    *slot = fields;
    Ok(())
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Append a row built from `values`, in field order. Unknown keys are
/// refused; missing ones are left out and save as empty cells.
pub fn add_record(
    records: &mut Vec<Record>,
    fields: &[String],
    values: &[(String, String)],
) -> Result<usize, SceneError> {
    let mut record = Record::new();
    for field in fields {
        if let Some((_, v)) = values.iter().find(|(k, _)| k == field) {
            record.insert(field.clone(), v.clone());
        }
    }
    if let Some((k, _)) = values.iter().find(|(k, _)| !fields.contains(k)) {
        return Err(SceneError::UnknownField(k.clone()));
    }
    records.push(record);
    Ok(records.len() - 1)
}

pub fn update_record(
    records: &mut [Record],
    fields: &[String],
    row: usize,
    field: &str,
    value: &str,
) -> Result<(), SceneError> {
    if !fields.iter().any(|f| f == field) {
        return Err(SceneError::UnknownField(field.to_string()));
    }
    let record = records.get_mut(row).ok_or(SceneError::RowOutOfRange(row))?;
    record.insert(field.to_string(), value.to_string());
    Ok(())
}

pub fn delete_record(records: &mut Vec<Record>, row: usize) -> Result<Record, SceneError> {
    if row >= records.len() {
        return Err(SceneError::RowOutOfRange(row));
    }
    Ok(records.remove(row))
}
