use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};
use crate::model::flag::Flag;
use crate::model::naming::{MAX_FLAGS, MAX_NOTES};
use crate::model::note::Note;
use crate::model::scene::{Record, Scenes};
use crate::ops::reconcile::{reconcile_flags, reconcile_notes, reconcile_scenes};
use crate::parse::{parse_records, serialize_records};
use crate::util::time::now_iso;

/// Error type for store writes. Loads never fail; see [`Loaded`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path} already exists")]
    TargetExists { path: PathBuf },
    #[error("could not encode {path}: {source}")]
    EncodeError {
        path: PathBuf,
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// The `data/` directory and everything stored under it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub const DIR_NAME: &'static str = "data";

    /// `base/data`
    pub fn new(base: &Path) -> Self {
        DataDir {
            root: base.join(Self::DIR_NAME),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scenes_file(&self) -> PathBuf {
        self.root.join("scenes.json")
    }

    pub fn flags_file(&self) -> PathBuf {
        self.root.join("flags.json")
    }

    pub fn notes_file(&self) -> PathBuf {
        self.root.join("notes.json")
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.root.join("tables")
    }

    pub fn table_file(&self, scene: &str) -> PathBuf {
        self.tables_dir().join(format!("{}.csv", scene))
    }

    /// Create `data/` and `data/tables/` if missing
    pub fn ensure(&self) -> std::io::Result<()> {
        fs::create_dir_all(self.tables_dir())
    }
}

// ---------------------------------------------------------------------------
// Load results
// ---------------------------------------------------------------------------

/// Something a load had to work around. The load still produced a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    pub path: PathBuf,
    pub kind: WarningKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// The file could not be read (permissions, invalid UTF-8, ...)
    Unreadable(String),
    /// The file was read but is not the expected JSON shape
    Malformed(String),
    /// One entry was dropped or reset; the rest of the file was used
    Entry(String),
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        match &self.kind {
            WarningKind::Unreadable(e) => write!(f, "{}: could not read, using defaults ({})", file, e),
            WarningKind::Malformed(e) => write!(f, "{}: malformed, using defaults ({})", file, e),
            WarningKind::Entry(e) => write!(f, "{}: {}", file, e),
        }
    }
}

/// A load result: always a usable value, plus whatever was recovered from.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub value: T,
    pub warnings: Vec<LoadWarning>,
}

impl<T> Loaded<T> {
    pub fn into_parts(self) -> (T, Vec<LoadWarning>) {
        (self.value, self.warnings)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// The record store: load/reconcile/save for scenes, flags, notes and
/// per-scene rows.
///
/// Every `load_*` is total: a missing, empty, unreadable or malformed file
/// yields the default-filled collection plus warnings. Every `save_*`
/// rewrites its whole file atomically and returns write failures.
#[derive(Debug, Clone)]
pub struct Store {
    dir: DataDir,
    recovery_log: bool,
}

impl Store {
    pub fn new(dir: DataDir) -> Self {
        Store {
            dir,
            recovery_log: true,
        }
    }

    /// Whether malformed files, failed saves and cleared slots are copied
    /// into the recovery log
    pub fn with_recovery_log(mut self, enabled: bool) -> Self {
        self.recovery_log = enabled;
        self
    }

    pub fn dir(&self) -> &DataDir {
        &self.dir
    }

    // --- scenes ---

    pub fn load_scenes(&self) -> Loaded<Scenes> {
        let path = self.dir.scenes_file();
        let mut warnings = Vec::new();
        let raw: IndexMap<String, serde_json::Value> =
            self.read_json(&path, &mut warnings).unwrap_or_default();
        let reconciled = reconcile_scenes(raw);
        push_entry_issues(&path, reconciled.issues, &mut warnings);
        Loaded {
            value: reconciled.value,
            warnings,
        }
    }

    pub fn save_scenes(&self, scenes: &Scenes) -> Result<(), StoreError> {
        self.write_json(&self.dir.scenes_file(), scenes)
    }

    // --- flags ---

    pub fn load_flags(&self) -> Loaded<[Flag; MAX_FLAGS]> {
        let path = self.dir.flags_file();
        let mut warnings = Vec::new();
        let raw: Vec<serde_json::Value> = self.read_json(&path, &mut warnings).unwrap_or_default();
        let reconciled = reconcile_flags(raw);
        push_entry_issues(&path, reconciled.issues, &mut warnings);
        Loaded {
            value: reconciled.value,
            warnings,
        }
    }

    pub fn save_flags(&self, flags: &[Flag; MAX_FLAGS]) -> Result<(), StoreError> {
        self.write_json(&self.dir.flags_file(), flags)
    }

    // --- notes ---

    pub fn load_notes(&self) -> Loaded<[Note; MAX_NOTES]> {
        self.load_notes_at(&now_iso())
    }

    /// [`Store::load_notes`] with an explicit "now" for absent timestamps
    pub fn load_notes_at(&self, now: &str) -> Loaded<[Note; MAX_NOTES]> {
        let path = self.dir.notes_file();
        let mut warnings = Vec::new();
        let raw: Vec<serde_json::Value> = self.read_json(&path, &mut warnings).unwrap_or_default();
        let reconciled = reconcile_notes(raw, now);
        push_entry_issues(&path, reconciled.issues, &mut warnings);
        Loaded {
            value: reconciled.value,
            warnings,
        }
    }

    pub fn save_notes(&self, notes: &[Note; MAX_NOTES]) -> Result<(), StoreError> {
        self.write_json(&self.dir.notes_file(), notes)
    }

    // --- per-scene rows ---

    /// Rows of `scene`'s CSV, keyed by its header. Keys are not checked
    /// against the scene's field list.
    pub fn load_records(&self, scene: &str) -> Loaded<Vec<Record>> {
        let path = self.dir.table_file(scene);
        let mut warnings = Vec::new();
        let records = match read_optional(&path) {
            Ok(Some(text)) => parse_records(&text),
            Ok(None) => Vec::new(),
            Err(e) => {
                push_warning(&mut warnings, &path, WarningKind::Unreadable(e.to_string()));
                Vec::new()
            }
        };
        Loaded {
            value: records,
            warnings,
        }
    }

    pub fn save_records(
        &self,
        scene: &str,
        fields: &[String],
        records: &[Record],
    ) -> Result<(), StoreError> {
        let path = self.dir.table_file(scene);
        self.write_text(&path, serialize_records(fields, records))
    }

    /// Move a scene's CSV along with a rename. A scene without rows has no
    /// file, which is fine. An existing file under the new name is never
    /// overwritten.
    pub fn rename_records(&self, old: &str, new: &str) -> Result<(), StoreError> {
        let to = self.dir.table_file(new);
        if to.exists() {
            return Err(StoreError::TargetExists { path: to });
        }
        let from = self.dir.table_file(old);
        if !from.exists() {
            return Ok(());
        }
        fs::rename(&from, &to).map_err(|e| StoreError::WriteError {
            path: from,
            source: e,
        })
    }

    /// Copy `body` into the recovery log as a cleared slot
    pub fn log_cleared(&self, what: &str, body: String) {
        if self.recovery_log {
            recovery::log_recovery(
                self.dir.root(),
                RecoveryEntry::new(RecoveryCategory::Clear, format!("{} cleared", what)).body(body),
            );
        }
    }

    // --- shared file helpers ---

    /// Read and decode a JSON file. `None` means "use the empty collection":
    /// the file is missing, blank, unreadable or malformed (the last two
    /// with a warning).
    fn read_json<T: DeserializeOwned>(
        &self,
        path: &Path,
        warnings: &mut Vec<LoadWarning>,
    ) -> Option<T> {
        let text = match read_optional(path) {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(e) => {
                push_warning(warnings, path, WarningKind::Unreadable(e.to_string()));
                return None;
            }
        };
        if text.trim().is_empty() {
            return None;
        }
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                if self.recovery_log {
                    recovery::log_recovery(
                        self.dir.root(),
                        RecoveryEntry::new(
                            RecoveryCategory::Parser,
                            format!("{} replaced by defaults", file_label(path)),
                        )
                        .field("File", path.display().to_string())
                        .field("Error", e.to_string())
                        .body(text),
                    );
                }
                push_warning(warnings, path, WarningKind::Malformed(e.to_string()));
                None
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(value).map_err(|e| StoreError::EncodeError {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.write_text(path, text)
    }

    fn write_text(&self, path: &Path, content: String) -> Result<(), StoreError> {
        let result = self
            .dir
            .ensure()
            .and_then(|_| recovery::atomic_write(path, content.as_bytes()));
        match result {
            Ok(()) => {
                log::debug!("saved {}", path.display());
                Ok(())
            }
            Err(e) => {
                if self.recovery_log {
                    recovery::log_recovery(
                        self.dir.root(),
                        RecoveryEntry::new(
                            RecoveryCategory::Write,
                            format!("{} save failed", file_label(path)),
                        )
                        .field("File", path.display().to_string())
                        .field("Error", e.to_string())
                        .body(content),
                    );
                }
                Err(StoreError::WriteError {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        }
    }
}

/// Read a UTF-8 file; `Ok(None)` when it does not exist
fn read_optional(path: &Path) -> std::io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn push_warning(warnings: &mut Vec<LoadWarning>, path: &Path, kind: WarningKind) {
    let warning = LoadWarning {
        path: path.to_path_buf(),
        kind,
    };
    log::warn!("{}", warning);
    warnings.push(warning);
}

fn push_entry_issues(path: &Path, issues: Vec<String>, warnings: &mut Vec<LoadWarning>) {
    for issue in issues {
        push_warning(warnings, path, WarningKind::Entry(issue));
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
