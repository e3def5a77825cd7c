//! Slot capacities, default names and the legacy naming scheme.

pub const MAX_SCENES: usize = 6;
pub const MAX_FLAGS: usize = 6;
pub const MAX_NOTES: usize = 10;

/// Default scene names, one per slot (earthly branches 子..巳)
pub const SCENE_DEFAULT_NAMES: [&str; MAX_SCENES] = ["子", "丑", "寅", "卯", "辰", "巳"];

/// Default flag names, one per slot (earthly branches 午..亥)
pub const FLAG_DEFAULT_NAMES: [&str; MAX_FLAGS] = ["午", "未", "申", "酉", "戌", "亥"];

/// Field list given to a scene slot that has no stored schema
pub const DEFAULT_SCENE_FIELD: &str = "标签1";

/// Prefix of the old generated flag names ("Flag 1", "Flag2", ...)
pub const LEGACY_FLAG_PREFIX: &str = "Flag";

/// Prefix of the old generated scene keys ("未命名0" ..)
pub const LEGACY_SCENE_PREFIX: &str = "未命名";

/// Scene names double as CSV file names under `tables/`, so a name must
/// stay a single path component.
pub fn is_usable_scene_name(name: &str) -> bool {
    let trimmed = name.trim();
    !(trimmed.is_empty() || trimmed == "." || trimmed == ".." || trimmed.contains(['/', '\\']))
}

pub fn scene_default_name(index: usize) -> &'static str {
    SCENE_DEFAULT_NAMES[index]
}

pub fn flag_default_name(index: usize) -> &'static str {
    FLAG_DEFAULT_NAMES[index]
}

/// Placeholder label for note slot `index` (0-based): `便签1` .. `便签10`
pub fn note_default_label(index: usize) -> String {
    format!("便签{}", index + 1)
}

pub fn default_scene_fields() -> Vec<String> {
    vec![DEFAULT_SCENE_FIELD.to_string()]
}

/// The key scene slot `index` was stored under before default names existed.
/// Indices are 0-based: slot 2 was `未命名2`.
pub fn legacy_scene_key(index: usize) -> String {
    format!("{}{}", LEGACY_SCENE_PREFIX, index)
}

/// Whether a stored flag name is a historical generated label rather than
/// something the user chose.
///
/// Every name starting with `Flag` counts, whatever its number, so the slot
/// index does not change the outcome; it is taken so call sites read as a
/// per-slot decision.
pub fn is_legacy_placeholder(name: &str, _index: usize) -> bool {
    name.starts_with(LEGACY_FLAG_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_names_stay_inside_tables() {
        for name in SCENE_DEFAULT_NAMES {
            assert!(is_usable_scene_name(name));
        }
        assert!(is_usable_scene_name("书单"));
        for name in ["", "  ", ".", "..", "../x", "a/b", "a\\b"] {
            assert!(!is_usable_scene_name(name), "{:?}", name);
        }
    }

    #[test]
    fn legacy_scene_keys_are_zero_based() {
        assert_eq!(legacy_scene_key(0), "未命名0");
        assert_eq!(legacy_scene_key(2), "未命名2");
    }

    #[test]
    fn legacy_placeholder_matches_any_flag_prefix() {
        assert!(is_legacy_placeholder("Flag1", 0));
        assert!(is_legacy_placeholder("Flag 3", 4));
        assert!(is_legacy_placeholder("Flag", 5));
        // Plain prefix match: user names that happen to start with it go too
        assert!(is_legacy_placeholder("Flagship launch", 1));
    }

    #[test]
    fn legacy_placeholder_keeps_real_names() {
        assert!(!is_legacy_placeholder("", 0));
        assert!(!is_legacy_placeholder("午", 0));
        assert!(!is_legacy_placeholder("my flag", 2));
        assert!(!is_legacy_placeholder("flag1", 2));
    }

    #[test]
    fn note_labels_are_one_based() {
        assert_eq!(note_default_label(0), "便签1");
        assert_eq!(note_default_label(9), "便签10");
    }
}
