use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

/// Size above which appending also drops entries older than [`PRUNE_AGE_DAYS`].
const MAX_LOG_SIZE: u64 = 1_048_576;

/// Default age, in days, after which entries are prunable.
pub const PRUNE_AGE_DAYS: i64 = 30;

/// Fence around an entry body.
const BODY_FENCE: &str = "~~~";

const FILE_HEADER: &str = "\
# systema recovery log

Data that could not be kept in the normal files lands here: unreadable
stores replaced by defaults, saves that failed, and slots that were cleared.
List with `sy recovery`, prune with `sy recovery prune`.

";

/// Why an entry was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryCategory {
    /// A store file could not be parsed and was replaced by defaults
    Parser,
    /// A save failed; the body is what should have been written
    Write,
    /// A slot was reset; the body is its previous content
    Clear,
}

impl RecoveryCategory {
    const ALL: [RecoveryCategory; 3] = [
        RecoveryCategory::Parser,
        RecoveryCategory::Write,
        RecoveryCategory::Clear,
    ];

    /// Keyword written between brackets in an entry header
    pub fn as_str(self) -> &'static str {
        match self {
            RecoveryCategory::Parser => "parser",
            RecoveryCategory::Write => "write",
            RecoveryCategory::Clear => "clear",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for RecoveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in the recovery log.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryEntry {
    pub timestamp: DateTime<Utc>,
    pub category: RecoveryCategory,
    pub description: String,
    pub fields: Vec<(String, String)>,
    pub body: String,
}

impl RecoveryEntry {
    pub fn new(category: RecoveryCategory, description: impl Into<String>) -> Self {
        RecoveryEntry {
            timestamp: Utc::now(),
            category,
            description: description.into(),
            fields: Vec::new(),
            body: String::new(),
        }
    }

    pub fn field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.push((key.to_string(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// The entry as it appears in the log file
    pub fn to_markdown(&self) -> String {
        let mut out = format!(
            "## {} [{}] {}\n",
            self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            self.category,
            self.description,
        );
        for (key, value) in &self.fields {
            out.push_str(&format!("{}: {}\n", key, value));
        }
        if !self.body.is_empty() {
            out.push_str(BODY_FENCE);
            out.push('\n');
            out.push_str(&self.body);
            if !self.body.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(BODY_FENCE);
            out.push('\n');
        }
        out.push('\n');
        out
    }

    /// Serialize for `sy recovery --json`.
    pub fn to_json(&self) -> serde_json::Value {
        let fields: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();

        serde_json::json!({
            "timestamp": self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "category": self.category.to_string(),
            "description": self.description,
            "fields": fields,
            "body": self.body,
        })
    }
}

pub fn recovery_log_path(data_root: &Path) -> PathBuf {
    data_root.join(".recovery.log")
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// The instant `days` days before now. None for a negative count or one
/// past the range chrono can represent.
pub fn days_ago(days: i64) -> Option<DateTime<Utc>> {
    if days < 0 {
        return None;
    }
    chrono::TimeDelta::try_days(days).and_then(|delta| Utc::now().checked_sub_signed(delta))
}

// ---------------------------------------------------------------------------
// Appending
// ---------------------------------------------------------------------------

/// Append an entry. Failures are reported through the log facade and
/// otherwise swallowed: recovery logging never fails the caller.
pub fn log_recovery(data_root: &Path, entry: RecoveryEntry) {
    if let Err(e) = log_recovery_inner(data_root, &entry) {
        log::warn!(
            "could not write to recovery log ({}): {}",
            entry.description,
            e
        );
    }
}

fn log_recovery_inner(data_root: &Path, entry: &RecoveryEntry) -> io::Result<()> {
    std::fs::create_dir_all(data_root)?;
    let path = recovery_log_path(data_root);

    if let Ok(meta) = std::fs::metadata(&path)
        && meta.len() > MAX_LOG_SIZE
    {
        let cutoff = Utc::now() - chrono::Duration::days(PRUNE_AGE_DAYS);
        rewrite_keeping(&path, |e| e.timestamp >= cutoff)?;
    }

    let needs_header = std::fs::metadata(&path).map_or(true, |m| m.len() == 0);
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    if needs_header {
        file.write_all(FILE_HEADER.as_bytes())?;
    }
    file.write_all(entry.to_markdown().as_bytes())?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read entries, most recent first. `limit` keeps the newest N.
pub fn read_recovery_entries(
    data_root: &Path,
    limit: Option<usize>,
    since: Option<DateTime<Utc>>,
) -> Vec<RecoveryEntry> {
    let content = match std::fs::read_to_string(recovery_log_path(data_root)) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };

    let mut entries = parse_entries(&content);
    if let Some(since_dt) = since {
        entries.retain(|e| e.timestamp >= since_dt);
    }
    if let Some(n) = limit {
        let skip = entries.len().saturating_sub(n);
        entries.drain(..skip);
    }
    entries.reverse();
    entries
}

/// Number of entries in the log; 0 when there is no log.
pub fn count_entries(data_root: &Path) -> usize {
    std::fs::read_to_string(recovery_log_path(data_root))
        .map(|content| parse_entries(&content).len())
        .unwrap_or(0)
}

/// Parse every entry, oldest first. Text outside entries is ignored.
fn parse_entries(content: &str) -> Vec<RecoveryEntry> {
    let mut entries = Vec::new();
    let mut current: Option<RecoveryEntry> = None;
    let mut in_body = false;

    for line in content.lines() {
        if in_body {
            if line == BODY_FENCE {
                in_body = false;
            } else if let Some(entry) = current.as_mut() {
                if !entry.body.is_empty() {
                    entry.body.push('\n');
                }
                entry.body.push_str(line);
            }
            continue;
        }

        if let Some(header) = line.strip_prefix("## ") {
            entries.extend(current.take());
            current = parse_entry_header(header).map(|(timestamp, category, description)| {
                RecoveryEntry {
                    timestamp,
                    category,
                    description,
                    fields: Vec::new(),
                    body: String::new(),
                }
            });
            continue;
        }

        let Some(entry) = current.as_mut() else {
            continue;
        };
        if line == BODY_FENCE {
            in_body = true;
        } else if let Some((key, value)) = line.split_once(": ") {
            entry.fields.push((key.to_string(), value.to_string()));
        }
    }
    entries.extend(current);
    entries
}

/// Parse `<timestamp> [<category>] <description>`
fn parse_entry_header(header: &str) -> Option<(DateTime<Utc>, RecoveryCategory, String)> {
    let (timestamp_str, rest) = header.split_once(" [")?;
    let (category_str, description) = rest.split_once("] ")?;
    let timestamp = DateTime::parse_from_rfc3339(timestamp_str)
        .ok()?
        .with_timezone(&Utc);
    let category = RecoveryCategory::from_keyword(category_str)?;
    Some((timestamp, category, description.to_string()))
}

// ---------------------------------------------------------------------------
// Pruning
// ---------------------------------------------------------------------------

/// Drop entries older than `before` (default: [`PRUNE_AGE_DAYS`] ago), or
/// all of them. Returns how many were removed.
pub fn prune_recovery(
    data_root: &Path,
    before: Option<DateTime<Utc>>,
    all: bool,
) -> io::Result<usize> {
    let path = recovery_log_path(data_root);
    if !path.exists() {
        return Ok(0);
    }
    if all {
        return rewrite_keeping(&path, |_| false);
    }
    let cutoff = before.unwrap_or_else(|| Utc::now() - chrono::Duration::days(PRUNE_AGE_DAYS));
    rewrite_keeping(&path, |e| e.timestamp >= cutoff)
}

fn rewrite_keeping(path: &Path, keep: impl Fn(&RecoveryEntry) -> bool) -> io::Result<usize> {
    let content = std::fs::read_to_string(path)?;
    let entries = parse_entries(&content);
    let before = entries.len();

    let mut out = String::from(FILE_HEADER);
    let mut kept = 0;
    for entry in entries.iter().filter(|e| keep(*e)) {
        out.push_str(&entry.to_markdown());
        kept += 1;
    }
    atomic_write(path, out.as_bytes())?;
    Ok(before - kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use tempfile::TempDir;

    fn make_entry(category: RecoveryCategory, desc: &str, body: &str) -> RecoveryEntry {
        RecoveryEntry::new(category, desc)
            .field("File", "data/flags.json")
            .body(body)
    }

    #[test]
    fn entry_formatting() {
        let md = make_entry(RecoveryCategory::Parser, "flags.json unreadable", "[{").to_markdown();
        assert!(md.starts_with("## "));
        assert!(md.contains("[parser] flags.json unreadable"));
        assert!(md.contains("File: data/flags.json\n"));
        assert!(md.contains("~~~\n[{\n~~~\n"));
    }

    #[test]
    fn empty_body_has_no_fence() {
        let md = RecoveryEntry::new(RecoveryCategory::Clear, "note 3 cleared").to_markdown();
        assert!(!md.contains(BODY_FENCE));
    }

    #[test]
    fn log_and_read_most_recent_first() {
        let tmp = TempDir::new().unwrap();
        log_recovery(tmp.path(), make_entry(RecoveryCategory::Parser, "first", "a"));
        log_recovery(tmp.path(), make_entry(RecoveryCategory::Write, "second", "b"));

        let entries = read_recovery_entries(tmp.path(), None, None);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].description, "second");
        assert_eq!(entries[1].description, "first");
    }

    #[test]
    fn read_with_limit() {
        let tmp = TempDir::new().unwrap();
        for i in 0..5 {
            log_recovery(
                tmp.path(),
                make_entry(RecoveryCategory::Parser, &format!("entry{}", i), "x"),
            );
        }
        let entries = read_recovery_entries(tmp.path(), Some(2), None);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].description, "entry4");
        assert_eq!(entries[1].description, "entry3");
    }

    #[test]
    fn read_since_filter() {
        let tmp = TempDir::new().unwrap();
        let mut old = make_entry(RecoveryCategory::Parser, "older", "");
        old.timestamp = Utc::now() - chrono::Duration::days(10);
        log_recovery(tmp.path(), old);
        log_recovery(tmp.path(), make_entry(RecoveryCategory::Write, "newer", ""));

        let since = Utc::now() - chrono::Duration::days(5);
        let entries = read_recovery_entries(tmp.path(), None, Some(since));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "newer");
    }

    #[test]
    fn multiline_body_round_trips() {
        let tmp = TempDir::new().unwrap();
        let body = "[\n  {\"name\": \"午\",\n\n  oops\n]";
        log_recovery(
            tmp.path(),
            make_entry(RecoveryCategory::Parser, "flags.json unreadable", body)
                .field("Error", "expected value at line 4"),
        );

        let entries = read_recovery_entries(tmp.path(), None, None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, RecoveryCategory::Parser);
        assert_eq!(entries[0].body, body);
        assert_eq!(entries[0].fields.len(), 2);
        assert_eq!(entries[0].fields[1].1, "expected value at line 4");
    }

    #[test]
    fn header_written_once() {
        let tmp = TempDir::new().unwrap();
        log_recovery(tmp.path(), make_entry(RecoveryCategory::Clear, "a", ""));
        log_recovery(tmp.path(), make_entry(RecoveryCategory::Clear, "b", ""));
        let content = std::fs::read_to_string(recovery_log_path(tmp.path())).unwrap();
        assert!(content.starts_with("# systema recovery log"));
        assert_eq!(content.matches("# systema recovery log").count(), 1);
    }

    #[test]
    fn prune_all_keeps_header() {
        let tmp = TempDir::new().unwrap();
        log_recovery(tmp.path(), make_entry(RecoveryCategory::Parser, "x", "y"));

        assert_eq!(prune_recovery(tmp.path(), None, true).unwrap(), 1);
        assert!(read_recovery_entries(tmp.path(), None, None).is_empty());
        let content = std::fs::read_to_string(recovery_log_path(tmp.path())).unwrap();
        assert!(content.contains("systema recovery log"));
    }

    #[test]
    fn prune_before_cutoff() {
        let tmp = TempDir::new().unwrap();
        let mut old = make_entry(RecoveryCategory::Parser, "old entry", "old");
        old.timestamp = Utc::now() - chrono::Duration::days(60);
        log_recovery(tmp.path(), old);
        log_recovery(tmp.path(), make_entry(RecoveryCategory::Write, "new entry", "new"));

        let removed = prune_recovery(tmp.path(), None, false).unwrap();
        assert_eq!(removed, 1);
        let entries = read_recovery_entries(tmp.path(), None, None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "new entry");
        assert_eq!(entries[0].body, "new");
    }

    #[test]
    fn prune_without_log_is_noop() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(prune_recovery(tmp.path(), None, true).unwrap(), 0);
    }

    #[test]
    fn count_entries_without_and_with_log() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(count_entries(tmp.path()), 0);
        log_recovery(tmp.path(), make_entry(RecoveryCategory::Write, "w", ""));
        log_recovery(tmp.path(), make_entry(RecoveryCategory::Clear, "c", ""));
        assert_eq!(count_entries(tmp.path()), 2);
    }

    #[test]
    fn category_keywords() {
        for category in RecoveryCategory::ALL {
            assert_eq!(RecoveryCategory::from_keyword(category.as_str()), Some(category));
        }
        assert_eq!(RecoveryCategory::from_keyword("Parser"), None);
    }

    #[test]
    fn parse_header() {
        let (ts, cat, desc) =
            parse_entry_header("2026-02-10T14:32:05Z [write] notes.json save failed").unwrap();
        assert_eq!(ts.year(), 2026);
        assert_eq!(cat, RecoveryCategory::Write);
        assert_eq!(desc, "notes.json save failed");
        assert!(parse_entry_header("not a header").is_none());
        assert!(parse_entry_header("2026-02-10T14:32:05Z [bogus] x").is_none());
    }

    #[test]
    fn entry_to_json() {
        let json = make_entry(RecoveryCategory::Clear, "flag 2 cleared", "{}").to_json();
        assert_eq!(json["category"], "clear");
        assert_eq!(json["description"], "flag 2 cleared");
        assert_eq!(json["body"], "{}");
        assert_eq!(json["fields"]["File"], "data/flags.json");
    }

    #[test]
    fn days_ago_rejects_unrepresentable_counts() {
        let month = days_ago(30).unwrap();
        assert!(month < Utc::now());
        assert_eq!(days_ago(0).map(|d| d <= Utc::now()), Some(true));
        assert!(days_ago(-1).is_none());
        assert!(days_ago(9_999_999_999_999).is_none());
        assert!(days_ago(i64::MAX).is_none());
    }

    #[test]
    fn atomic_write_overwrites() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("t.json");
        atomic_write(&path, b"one").unwrap();
        atomic_write(&path, b"two").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");
    }
}
