//! Load-time reconciliation: raw stored data → canonical, capacity-bounded
//! collections.
//!
//! These functions are pure. File handling, warnings to the log, and the
//! recovery policy for unreadable files live in `io::store_io`.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::model::flag::Flag;
use crate::model::naming::{
    MAX_FLAGS, MAX_NOTES, MAX_SCENES, default_scene_fields, flag_default_name,
    is_legacy_placeholder, is_usable_scene_name, legacy_scene_key, note_default_label,
    scene_default_name,
};
use crate::model::note::Note;
use crate::model::scene::Scenes;

/// Keys of a flag object whose `null` is read as "absent"
const FLAG_NULLABLE_AS_ABSENT: &[&str] = &[
    "name",
    "target_time",
    "start_time",
    "content",
    "status",
    "finished_at",
    "discarded_at",
    "span_seconds",
    "running",
    "paused",
    "paused_duration",
];

const NOTE_NULLABLE_AS_ABSENT: &[&str] = &[
    "display_name",
    "title",
    "content",
    "status",
    "created_at",
    "updated_at",
    "finished_at",
    "discarded_at",
];

/// A reconciled collection plus a description of every entry that had to be
/// dropped or reset along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled<T> {
    pub value: T,
    pub issues: Vec<String>,
}

// ---------------------------------------------------------------------------
// Scenes
// ---------------------------------------------------------------------------

/// Reconcile the raw scenes object.
///
/// 1. Each default slot claims its canonical key, else its legacy key
///    (`未命名{i}`), moving the value under the canonical name.
/// 2. Unclaimed keys are extras, in their stored order.
/// 3. Unclaimed default slots are synthesized with the one-field schema,
///    in slot order, while there is room under the cap.
/// 4. Default-named slots come first, then extras; the result is cut to
///    `MAX_SCENES`, so extras past the cap are dropped.
pub fn reconcile_scenes(raw: IndexMap<String, Value>) -> Reconciled<Scenes> {
    let mut issues = Vec::new();

    let mut remaining: Scenes = IndexMap::new();
    for (name, value) in raw {
        if !is_usable_scene_name(&name) {
            issues.push(format!("scene \"{}\" dropped: not usable as a file name", name));
            continue;
        }
        match serde_json::from_value::<Vec<String>>(value) {
            Ok(fields) => {
                remaining.insert(name, fields);
            }
            Err(e) => issues.push(format!("scene \"{}\" dropped: {}", name, e)),
        }
    }

    let claimed: Vec<Option<Vec<String>>> = (0..MAX_SCENES)
        .map(|i| {
            remaining
                .shift_remove(scene_default_name(i))
                .or_else(|| remaining.shift_remove(&legacy_scene_key(i)))
        })
        .collect();

    // Defaults are only synthesized into free room: eight stored scenes keep
    // their first six rather than being displaced by default slots.
    let taken = claimed.iter().flatten().count() + remaining.len();
    let mut room = MAX_SCENES.saturating_sub(taken);

    let mut scenes = Scenes::new();
    for (i, slot) in claimed.into_iter().enumerate() {
        match slot {
            Some(fields) => {
                scenes.insert(scene_default_name(i).to_string(), fields);
            }
            None if room > 0 => {
                room -= 1;
                scenes.insert(scene_default_name(i).to_string(), default_scene_fields());
            }
            None => {}
        }
    }
    scenes.extend(remaining);

    if scenes.len() > MAX_SCENES {
        let dropped: Vec<&str> = scenes.keys().skip(MAX_SCENES).map(|k| k.as_str()).collect();
        issues.push(format!(
            "more than {} scenes; dropped {}",
            MAX_SCENES,
            dropped.join(", ")
        ));
        scenes.truncate(MAX_SCENES);
    }

    Reconciled {
        value: scenes,
        issues,
    }
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

/// Reconcile the raw flags array onto the fixed slots.
///
/// Slot `i` takes stored entry `i` (or nothing). A missing, non-string or
/// legacy-placeholder name becomes the slot's default name; every other
/// absent field takes its zero value. Entries past the last slot are ignored.
pub fn reconcile_flags(raw: Vec<Value>) -> Reconciled<[Flag; MAX_FLAGS]> {
    let mut issues = Vec::new();
    let surplus = raw.len().saturating_sub(MAX_FLAGS);
    let mut entries = raw.into_iter();

    let flags = std::array::from_fn(|i| reconcile_flag(i, entries.next(), &mut issues));

    if surplus > 0 {
        issues.push(format!("{} flag entries beyond slot {} ignored", surplus, MAX_FLAGS));
    }

    Reconciled {
        value: flags,
        issues,
    }
}

fn reconcile_flag(index: usize, entry: Option<Value>, issues: &mut Vec<String>) -> Flag {
    let mut map = entry_object("flag", index, entry, issues);
    drop_null_fields(&mut map, FLAG_NULLABLE_AS_ABSENT);

    let keep_name = matches!(
        map.get("name"),
        Some(Value::String(name)) if !is_legacy_placeholder(name, index)
    );
    if !keep_name {
        map.insert(
            "name".to_string(),
            Value::String(flag_default_name(index).to_string()),
        );
    }

    match serde_json::from_value::<Flag>(Value::Object(map)) {
        Ok(flag) => flag,
        Err(e) => {
            issues.push(format!("flag slot {} reset: {}", index + 1, e));
            Flag::new(index)
        }
    }
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

/// Reconcile the raw notes array onto the fixed slots.
///
/// Absent `created_at` / `updated_at` are stamped with `now`. This happens on
/// every load until the note is saved with real timestamps; present values
/// are never replaced.
pub fn reconcile_notes(raw: Vec<Value>, now: &str) -> Reconciled<[Note; MAX_NOTES]> {
    let mut issues = Vec::new();
    let surplus = raw.len().saturating_sub(MAX_NOTES);
    let mut entries = raw.into_iter();

    let notes = std::array::from_fn(|i| reconcile_note(i, entries.next(), now, &mut issues));

    if surplus > 0 {
        issues.push(format!("{} note entries beyond slot {} ignored", surplus, MAX_NOTES));
    }

    Reconciled {
        value: notes,
        issues,
    }
}

fn reconcile_note(index: usize, entry: Option<Value>, now: &str, issues: &mut Vec<String>) -> Note {
    let mut map = entry_object("note", index, entry, issues);
    drop_null_fields(&mut map, NOTE_NULLABLE_AS_ABSENT);

    map.entry("display_name")
        .or_insert_with(|| Value::String(note_default_label(index)));
    map.entry("created_at")
        .or_insert_with(|| Value::String(now.to_string()));
    map.entry("updated_at")
        .or_insert_with(|| Value::String(now.to_string()));

    match serde_json::from_value::<Note>(Value::Object(map)) {
        Ok(note) => note,
        Err(e) => {
            issues.push(format!("note slot {} reset: {}", index + 1, e));
            Note::new(index, now)
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn entry_object(
    kind: &str,
    index: usize,
    entry: Option<Value>,
    issues: &mut Vec<String>,
) -> Map<String, Value> {
    match entry {
        None => Map::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            issues.push(format!(
                "{} slot {}: expected an object, found {}",
                kind,
                index + 1,
                value_kind(&other)
            ));
            Map::new()
        }
    }
}

fn drop_null_fields(map: &mut Map<String, Value>, keys: &[&str]) {
    for key in keys {
        if map.get(*key).is_some_and(Value::is_null) {
            map.remove(*key);
        }
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::naming::{FLAG_DEFAULT_NAMES, SCENE_DEFAULT_NAMES};
    use crate::model::status::Status;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const NOW: &str = "2025-06-01T08:00:00";

    fn raw_scenes(value: Value) -> IndexMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    fn names(scenes: &Scenes) -> Vec<&str> {
        scenes.keys().map(|k| k.as_str()).collect()
    }

    // --- scenes ---

    #[test]
    fn empty_scenes_get_all_defaults() {
        let out = reconcile_scenes(IndexMap::new());
        assert_eq!(names(&out.value), SCENE_DEFAULT_NAMES.to_vec());
        for fields in out.value.values() {
            assert_eq!(fields, &vec!["标签1".to_string()]);
        }
        assert!(out.issues.is_empty());
    }

    #[test]
    fn legacy_key_moves_to_canonical_slot() {
        let out = reconcile_scenes(raw_scenes(json!({ "未命名2": ["日期", "金额"] })));
        assert_eq!(names(&out.value), SCENE_DEFAULT_NAMES.to_vec());
        assert_eq!(out.value["寅"], vec!["日期", "金额"]);
        assert!(!out.value.contains_key("未命名2"));
    }

    #[test]
    fn canonical_key_beats_legacy_key() {
        let out = reconcile_scenes(raw_scenes(json!({
            "未命名0": ["old"],
            "子": ["new"],
        })));
        assert_eq!(out.value["子"], vec!["new"]);
        // The unclaimed legacy entry is kept as an extra, displacing the last
        // synthesized default
        assert_eq!(
            names(&out.value),
            vec!["子", "丑", "寅", "卯", "辰", "未命名0"]
        );
    }

    #[test]
    fn defaults_first_then_extras_in_stored_order() {
        let out = reconcile_scenes(raw_scenes(json!({
            "工作": ["a"],
            "丑": ["b"],
            "生活": ["c"],
        })));
        assert_eq!(
            names(&out.value),
            vec!["子", "丑", "寅", "卯", "工作", "生活"]
        );
        assert_eq!(out.value["丑"], vec!["b"]);
    }

    #[test]
    fn eight_custom_scenes_keep_first_six() {
        let mut raw = IndexMap::new();
        for i in 0..8 {
            raw.insert(format!("scene{}", i), json!(["f"]));
        }
        let out = reconcile_scenes(raw);
        assert_eq!(
            names(&out.value),
            vec!["scene0", "scene1", "scene2", "scene3", "scene4", "scene5"]
        );
        assert_eq!(out.issues.len(), 1);
        assert!(out.issues[0].contains("scene6"));
    }

    #[test]
    fn claimed_defaults_push_extras_past_the_cap() {
        let mut raw = IndexMap::new();
        for name in SCENE_DEFAULT_NAMES {
            raw.insert(name.to_string(), json!(["x"]));
        }
        raw.insert("extra".to_string(), json!(["y"]));
        let out = reconcile_scenes(raw);
        assert_eq!(names(&out.value), SCENE_DEFAULT_NAMES.to_vec());
    }

    #[test]
    fn malformed_scene_value_is_dropped() {
        let out = reconcile_scenes(raw_scenes(json!({ "子": "not a list", "丑": ["ok"] })));
        assert_eq!(out.value["子"], vec!["标签1"]);
        assert_eq!(out.value["丑"], vec!["ok"]);
        assert_eq!(out.issues.len(), 1);
    }

    #[test]
    fn path_like_scene_keys_are_dropped() {
        let out = reconcile_scenes(raw_scenes(
            json!({ "../escape": ["a"], "a/b": ["b"], "..": ["c"], "书单": ["d"] }),
        ));
        assert!(out.value.keys().all(|k| is_usable_scene_name(k)));
        assert_eq!(out.value["书单"], vec!["d"]);
        assert_eq!(out.value.len(), MAX_SCENES);
        assert_eq!(out.issues.len(), 3);
        assert!(out.issues[0].contains("../escape"));
    }

    #[test]
    fn canonical_scenes_are_a_fixed_point() {
        let first = reconcile_scenes(raw_scenes(json!({ "未命名1": ["a"], "工作": ["b"] }))).value;
        let raw = serde_json::from_value(serde_json::to_value(&first).unwrap()).unwrap();
        let second = reconcile_scenes(raw).value;
        assert_eq!(first, second);
    }

    // --- flags ---

    #[test]
    fn two_flags_pad_to_six() {
        let out = reconcile_flags(vec![
            json!({ "name": "Write report", "content": "draft" }),
            json!({ "name": "Run" }),
        ]);
        let flags = out.value;
        assert_eq!(flags.len(), 6);
        assert_eq!(flags[0].name, "Write report");
        assert_eq!(flags[0].content, "draft");
        assert_eq!(flags[1].name, "Run");
        for (i, flag) in flags.iter().enumerate().skip(2) {
            assert_eq!(flag, &Flag::new(i));
            assert_eq!(flag.name, FLAG_DEFAULT_NAMES[i]);
        }
    }

    #[test]
    fn legacy_and_missing_names_take_defaults() {
        let out = reconcile_flags(vec![
            json!({ "name": "Flag1" }),
            json!({}),
            json!({ "name": 42 }),
            json!({ "name": "" }),
        ]);
        assert_eq!(out.value[0].name, "午");
        assert_eq!(out.value[1].name, "未");
        assert_eq!(out.value[2].name, "申");
        // Present-but-empty is a user choice, kept as is
        assert_eq!(out.value[3].name, "");
    }

    #[test]
    fn missing_fields_take_zero_values() {
        let out = reconcile_flags(vec![json!({ "name": "a", "span_seconds": 60 })]);
        let flag = &out.value[0];
        assert_eq!(flag.span_seconds, 60);
        assert_eq!(flag.status, Status::Active);
        assert_eq!(flag.target_time, "");
        assert_eq!(flag.paused_duration, 0);
        assert!(!flag.paused);
        assert!(flag.pause_start_time.is_none());
    }

    #[test]
    fn null_fields_read_as_absent() {
        let out = reconcile_flags(vec![json!({
            "name": "a",
            "finished_at": null,
            "pause_start_time": null,
        })]);
        assert_eq!(out.value[0].finished_at, "");
        assert!(out.issues.is_empty());
    }

    #[test]
    fn undecodable_flag_slot_resets_with_issue() {
        let out = reconcile_flags(vec![
            json!({ "name": "a", "status": "someday" }),
            json!("oops"),
        ]);
        assert_eq!(out.value[0], Flag::new(0));
        assert_eq!(out.value[1], Flag::new(1));
        assert_eq!(out.issues.len(), 2);
    }

    #[test]
    fn surplus_flags_ignored() {
        let raw = (0..8).map(|i| json!({ "name": format!("f{}", i) })).collect();
        let out = reconcile_flags(raw);
        assert_eq!(out.value[5].name, "f5");
        assert_eq!(out.issues.len(), 1);
    }

    // --- notes ---

    #[test]
    fn notes_pad_to_ten_with_labels() {
        let out = reconcile_notes(vec![json!({ "title": "t" })], NOW);
        assert_eq!(out.value.len(), 10);
        assert_eq!(out.value[0].title, "t");
        assert_eq!(out.value[0].display_name, "便签1");
        assert_eq!(out.value[9].display_name, "便签10");
        assert_eq!(out.value[9], Note::new(9, NOW));
    }

    #[test]
    fn absent_timestamps_stamped_with_load_time() {
        // Known quirk: stamped on every load until a save persists them
        let out = reconcile_notes(vec![json!({ "title": "t" })], NOW);
        assert_eq!(out.value[0].created_at, NOW);
        assert_eq!(out.value[0].updated_at, NOW);
        let later = reconcile_notes(vec![json!({ "title": "t" })], "2025-06-02T08:00:00");
        assert_eq!(later.value[0].created_at, "2025-06-02T08:00:00");
    }

    #[test]
    fn present_timestamps_untouched() {
        let out = reconcile_notes(
            vec![json!({
                "created_at": "2024-01-01T00:00:00",
                "updated_at": "2024-01-02T00:00:00",
            })],
            NOW,
        );
        assert_eq!(out.value[0].created_at, "2024-01-01T00:00:00");
        assert_eq!(out.value[0].updated_at, "2024-01-02T00:00:00");
    }

    #[test]
    fn note_extra_keys_preserved() {
        let out = reconcile_notes(vec![json!({ "pinned": true })], NOW);
        assert_eq!(out.value[0].extra["pinned"], json!(true));
    }
}
