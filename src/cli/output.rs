use serde::Serialize;

use crate::model::flag::Flag;
use crate::model::note::Note;
use crate::model::scene::{Record, SceneTable};
use crate::model::status::Status;
use crate::ops::flag_ops::Progress;
use crate::util::time::{format_datetime, format_span};
use crate::util::unicode::{display_width, pad_to_width, preview_line, truncate_to_width};

/// Widest a table column gets before cells are cut
const MAX_COLUMN_CELLS: usize = 24;

/// Width of list previews
const PREVIEW_CELLS: usize = 40;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct SceneJson<'a> {
    pub name: &'a str,
    pub fields: &'a [String],
    pub records: usize,
}

#[derive(Serialize)]
pub struct TableJson<'a> {
    pub name: &'a str,
    pub fields: &'a [String],
    pub records: &'a [Record],
}

#[derive(Serialize)]
pub struct FlagJson<'a> {
    pub slot: usize,
    #[serde(flatten)]
    pub flag: &'a Flag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressJson>,
}

#[derive(Serialize)]
pub struct ProgressJson {
    pub elapsed: u64,
    pub remaining: u64,
    pub percent: f64,
}

#[derive(Serialize)]
pub struct NoteJson<'a> {
    pub slot: usize,
    #[serde(flatten)]
    pub note: &'a Note,
}

pub fn progress_to_json(progress: &Progress) -> ProgressJson {
    ProgressJson {
        elapsed: progress.elapsed,
        remaining: progress.remaining,
        percent: (progress.percent * 10.0).round() / 10.0,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn status_mark(status: Status) -> char {
    match status {
        Status::Active => ' ',
        Status::Completed => 'x',
        Status::Discarded => '-',
    }
}

fn flag_mark(flag: &Flag) -> char {
    match flag.status {
        Status::Active if flag.paused => '~',
        Status::Active if flag.running => '>',
        other => status_mark(other),
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

/// `1. 子            标签1 (3 rows)`
pub fn format_scene_line(slot: usize, name: &str, fields: &[String], rows: usize) -> String {
    format!(
        "{}. {}  {} ({})",
        slot,
        pad_to_width(name, 12),
        fields.join(", "),
        plural(rows, "row")
    )
}

/// Rows as aligned columns, numbered from 1. Cells are cut to one line.
pub fn format_table(table: &SceneTable) -> Vec<String> {
    let flatten = |s: &str| s.replace("\r\n", " ").replace(['\n', '\r'], " ");

    let mut columns: Vec<Vec<String>> = Vec::with_capacity(table.fields.len() + 1);
    columns.push(
        std::iter::once("#".to_string())
            .chain((1..=table.records.len()).map(|n| n.to_string()))
            .collect(),
    );
    for field in &table.fields {
        columns.push(
            std::iter::once(field.clone())
                .chain((0..table.records.len()).map(|row| flatten(table.cell(row, field))))
                .collect(),
        );
    }

    let widths: Vec<usize> = columns
        .iter()
        .map(|col| {
            col.iter()
                .map(|c| display_width(c))
                .max()
                .unwrap_or(0)
                .min(MAX_COLUMN_CELLS)
        })
        .collect();

    let render_row = |row: usize| -> String {
        columns
            .iter()
            .zip(&widths)
            .map(|(col, &w)| pad_to_width(&col[row], w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render_row(0)];
    lines.push(
        widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    lines.extend((1..=table.records.len()).map(render_row));
    lines
}

/// `[>] 1. 午  2025-05-01 09:00 → 2025-05-01 11:00 (2h)  写周报`
pub fn format_flag_line(slot: usize, flag: &Flag) -> String {
    let mut line = format!("[{}] {}. {}", flag_mark(flag), slot, flag.name);
    if flag.span_seconds > 0 {
        line.push_str(&format!(
            "  {} → {} ({})",
            format_datetime(&flag.start_time),
            format_datetime(&flag.target_time),
            format_span(flag.span_seconds)
        ));
    }
    let preview = preview_line(&flag.content, PREVIEW_CELLS);
    if !preview.is_empty() {
        line.push_str("  ");
        line.push_str(&preview);
    }
    line
}

pub fn format_flag_detail(slot: usize, flag: &Flag, progress: Option<&Progress>) -> Vec<String> {
    let mut lines = vec![format!("[{}] {}. {}", flag_mark(flag), slot, flag.name)];
    lines.push(format!("status: {}", flag.status));
    lines.push(format!("start: {}", format_datetime(&flag.start_time)));
    lines.push(format!("target: {}", format_datetime(&flag.target_time)));
    lines.push(format!("span: {}", format_span(flag.span_seconds)));

    if let Some(p) = progress {
        lines.push(format!(
            "progress: {:.0}% ({} elapsed, {} left)",
            p.percent,
            format_span(p.elapsed),
            format_span(p.remaining)
        ));
    }
    if flag.paused_duration > 0 {
        lines.push(format!("paused: {}", format_span(flag.paused_duration)));
    }
    if !flag.finished_at.is_empty() {
        lines.push(format!("finished: {}", format_datetime(&flag.finished_at)));
    }
    if !flag.discarded_at.is_empty() {
        lines.push(format!("discarded: {}", format_datetime(&flag.discarded_at)));
    }
    if !flag.content.is_empty() {
        lines.push("content:".to_string());
        lines.extend(flag.content.lines().map(|l| format!("  {}", l)));
    }
    lines
}

/// `[ ]  3. 购物清单  牛奶`
pub fn format_note_line(slot: usize, note: &Note) -> String {
    let mut line = format!(
        "[{}] {:>2}. {}",
        status_mark(note.status),
        slot,
        truncate_to_width(note.list_label(), 24)
    );
    let preview = preview_line(&note.content, PREVIEW_CELLS);
    if !preview.is_empty() {
        line.push_str("  ");
        line.push_str(&preview);
    }
    line
}

pub fn format_note_detail(slot: usize, note: &Note) -> Vec<String> {
    let mut lines = vec![format!(
        "[{}] {}. {}",
        status_mark(note.status),
        slot,
        note.list_label()
    )];
    if !note.title.is_empty() {
        lines.push(format!("slot: {}", note.display_name));
    }
    lines.push(format!("status: {}", note.status));
    lines.push(format!("created: {}", format_datetime(&note.created_at)));
    lines.push(format!("updated: {}", format_datetime(&note.updated_at)));
    if !note.finished_at.is_empty() {
        lines.push(format!("finished: {}", format_datetime(&note.finished_at)));
    }
    if !note.discarded_at.is_empty() {
        lines.push(format!("discarded: {}", format_datetime(&note.discarded_at)));
    }
    if !note.content.is_empty() {
        lines.push(String::new());
        lines.extend(note.content.trim().lines().map(str::to_string));
    }
    lines
}
