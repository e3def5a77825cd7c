use std::error::Error;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, Utc};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::recovery;
use crate::io::store_io::DataDir;
use crate::model::naming::{MAX_FLAGS, MAX_NOTES};
use crate::ops::flag_ops::{self, TimerAction};
use crate::ops::slot_ops::{self, Direction};
use crate::ops::{scene_ops, status_ops};
use crate::session::{Mode, Session};
use crate::util::time::format_iso;

type CmdResult = Result<(), Box<dyn Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let base = resolve_base(cli.dir.as_deref())?;

    match cli.command {
        // Maintenance (no collections needed)
        Commands::Config(cmd) => cmd_config(&base, cmd),
        Commands::Recovery(cmd) => cmd_recovery(&base, cmd, json),

        // Tables
        Commands::Scenes => cmd_scenes(&mut Session::open(&base), json),
        Commands::Table(args) => cmd_table(&mut Session::open(&base), args, json),
        Commands::Scene(cmd) => cmd_scene(&mut Session::open(&base), cmd.action),

        // Flags
        Commands::Flags => cmd_flags(&Session::open(&base), json),
        Commands::Flag(cmd) => cmd_flag(&mut Session::open(&base), cmd, json),

        // Notes
        Commands::Notes => cmd_notes(&Session::open(&base), json),
        Commands::Note(cmd) => cmd_note(&mut Session::open(&base), cmd, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve_base(dir: Option<&str>) -> Result<PathBuf, Box<dyn Error>> {
    match dir {
        Some(dir) => std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e).into()),
        None => Ok(std::env::current_dir()?),
    }
}

/// 1-based slot number from the command line → 0-based index
fn slot_index(slot: usize, max: usize) -> Result<usize, Box<dyn Error>> {
    if (1..=max).contains(&slot) {
        Ok(slot - 1)
    } else {
        Err(format!("slot must be between 1 and {}", max).into())
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

fn parse_assignment(s: &str) -> Result<(String, String), Box<dyn Error>> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{}'", s))?;
    Ok((field.trim().to_string(), value.to_string()))
}

fn parse_utc(s: &str) -> Result<DateTime<Utc>, Box<dyn Error>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{}': {}", s, e).into())
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

fn cmd_scenes(session: &mut Session, json: bool) -> CmdResult {
    let names: Vec<String> = session.scenes.keys().cloned().collect();
    let mut rows = Vec::with_capacity(names.len());
    for name in &names {
        rows.push(session.table(name)?.records.len());
    }

    if json {
        let out: Vec<SceneJson> = session
            .scenes
            .iter()
            .zip(&rows)
            .map(|((name, fields), &records)| SceneJson {
                name,
                fields,
                records,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for (i, ((name, fields), &count)) in session.scenes.iter().zip(&rows).enumerate() {
            println!("{}", format_scene_line(i + 1, name, fields, count));
        }
    }
    Ok(())
}

fn cmd_table(session: &mut Session, args: TableArgs, json: bool) -> CmdResult {
    session.switch_mode(Mode::Table);
    if let Some(index) = session.scenes.get_index_of(&args.scene) {
        session.select(index);
    }

    if let Some(fields) = &args.fields {
        scene_ops::set_fields(&mut session.scenes, &args.scene, fields)?;
        session.save_scenes()?;
    }

    let mut table = session.table(&args.scene)?;
    let mut dirty = false;

    if let Some(pairs) = &args.add {
        let values = pairs
            .iter()
            .map(|p| parse_assignment(p))
            .collect::<Result<Vec<_>, _>>()?;
        scene_ops::add_record(&mut table.records, &table.fields, &values)?;
        dirty = true;
    }
    if let Some(set) = &args.set {
        let row: usize = set[0]
            .parse()
            .map_err(|_| format!("invalid row '{}'", set[0]))?;
        let row = row.checked_sub(1).ok_or("rows count from 1")?;
        scene_ops::update_record(&mut table.records, &table.fields, row, &set[1], &set[2])?;
        dirty = true;
    }
    if let Some(row) = args.delete {
        let row = row.checked_sub(1).ok_or("rows count from 1")?;
        scene_ops::delete_record(&mut table.records, row)?;
        dirty = true;
    }
    if dirty {
        session.save_table(&table)?;
    }

    if json {
        let out = TableJson {
            name: &table.name,
            fields: &table.fields,
            records: &table.records,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("== {} ==", table.name);
        print_lines(&format_table(&table));
    }
    Ok(())
}

fn cmd_scene(session: &mut Session, action: SceneAction) -> CmdResult {
    match action {
        SceneAction::Add { name, fields } => {
            scene_ops::add_scene(&mut session.scenes, &name, &fields)?;
            session.save_scenes()?;
            println!("added scene {}", name.trim());
        }
        SceneAction::Rename { old, new } => {
            session.rename_scene(&old, &new)?;
            println!("{} → {}", old, new.trim());
        }
        SceneAction::Clear { name } => {
            session.clear_scene(&name)?;
            println!("cleared scene {}", name);
        }
        SceneAction::Up { name } => {
            let at = scene_ops::move_scene(&mut session.scenes, &name, Direction::Up)?;
            session.save_scenes()?;
            println!("{} is now scene {}", name, at + 1);
        }
        SceneAction::Down { name } => {
            let at = scene_ops::move_scene(&mut session.scenes, &name, Direction::Down)?;
            session.save_scenes()?;
            println!("{} is now scene {}", name, at + 1);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

fn cmd_flags(session: &Session, json: bool) -> CmdResult {
    if json {
        let out: Vec<FlagJson> = session
            .flags
            .iter()
            .enumerate()
            .map(|(i, flag)| FlagJson {
                slot: i + 1,
                flag,
                progress: None,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for (i, flag) in session.flags.iter().enumerate() {
            println!("{}", format_flag_line(i + 1, flag));
        }
    }
    Ok(())
}

fn cmd_flag(session: &mut Session, cmd: FlagCmd, json: bool) -> CmdResult {
    let index = slot_index(cmd.slot, MAX_FLAGS)?;
    session.switch_mode(Mode::Flag);
    session.select(index);

    let Some(action) = cmd.action else {
        return show_flag(session, index, json);
    };

    let now = now();
    let stamp = format_iso(now);
    let mut shown = index;
    match action {
        FlagAction::StartAt { time } => flag_ops::set_start_time(session.current_flag_mut(), &time)?,
        FlagAction::TargetAt { time } => {
            flag_ops::set_target_time(session.current_flag_mut(), &time)?
        }
        FlagAction::Run => {
            let action = flag_ops::toggle_running(session.current_flag_mut(), now)?;
            if !json {
                let verb = match action {
                    TimerAction::Started => "started",
                    TimerAction::Paused => "paused",
                    TimerAction::Resumed => "resumed",
                };
                println!("{} {}", verb, session.current_flag().name);
            }
        }
        FlagAction::Content { text } => {
            status_ops::edit_flag_content(session.current_flag_mut(), &text)?;
        }
        FlagAction::Complete => status_ops::complete_flag(session.current_flag_mut(), &stamp)?,
        FlagAction::Discard => status_ops::discard_flag(session.current_flag_mut(), &stamp)?,
        FlagAction::Rename { name } => slot_ops::rename_flag(&mut session.flags, index, &name)?,
        FlagAction::Clear => {
            session.clear_flag(index)?;
            return show_flag(session, index, json);
        }
        FlagAction::Up => shown = slot_ops::move_slot(&mut session.flags, index, Direction::Up)?,
        FlagAction::Down => {
            shown = slot_ops::move_slot(&mut session.flags, index, Direction::Down)?
        }
    }

    session.save_flags()?;
    show_flag(session, shown, json)
}

fn show_flag(session: &Session, index: usize, json: bool) -> CmdResult {
    let flag = &session.flags[index];
    let progress = flag.running.then(|| flag_ops::progress(flag, now()));
    if json {
        let out = FlagJson {
            slot: index + 1,
            flag,
            progress: progress.as_ref().map(progress_to_json),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_lines(&format_flag_detail(index + 1, flag, progress.as_ref()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

fn cmd_notes(session: &Session, json: bool) -> CmdResult {
    if json {
        let out: Vec<NoteJson> = session
            .notes
            .iter()
            .enumerate()
            .map(|(i, note)| NoteJson { slot: i + 1, note })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for (i, note) in session.notes.iter().enumerate() {
            println!("{}", format_note_line(i + 1, note));
        }
    }
    Ok(())
}

fn cmd_note(session: &mut Session, cmd: NoteCmd, json: bool) -> CmdResult {
    let index = slot_index(cmd.slot, MAX_NOTES)?;
    session.switch_mode(Mode::Note);
    session.select(index);

    let Some(action) = cmd.action else {
        return show_note(session, index, json);
    };

    let stamp = format_iso(now());
    let mut shown = index;
    match action {
        NoteAction::Edit { title, content } => {
            let note = session.current_note_mut();
            let title = title.unwrap_or_else(|| note.title.clone());
            let content = content.unwrap_or_else(|| note.content.clone());
            if !status_ops::edit_note(note, &title, &content, &stamp)? {
                log::info!("note {} unchanged", index + 1);
            }
        }
        NoteAction::Complete => status_ops::complete(session.current_note_mut(), &stamp)?,
        NoteAction::Discard => status_ops::discard(session.current_note_mut(), &stamp)?,
        NoteAction::Rename { name } => slot_ops::rename_note(&mut session.notes, index, &name)?,
        NoteAction::Clear => {
            session.clear_note(index, &stamp)?;
            return show_note(session, index, json);
        }
        NoteAction::Up => shown = slot_ops::move_slot(&mut session.notes, index, Direction::Up)?,
        NoteAction::Down => {
            shown = slot_ops::move_slot(&mut session.notes, index, Direction::Down)?
        }
    }

    session.save_notes()?;
    show_note(session, shown, json)
}

fn show_note(session: &Session, index: usize, json: bool) -> CmdResult {
    let note = &session.notes[index];
    if json {
        let out = NoteJson {
            slot: index + 1,
            note,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_lines(&format_note_detail(index + 1, note));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn cmd_config(base: &Path, cmd: ConfigCmd) -> CmdResult {
    let dir = DataDir::new(base);
    match cmd.action {
        ConfigAction::Get { key } => {
            let config = config_io::read_config(dir.root())?;
            println!("{}", config_io::get_value(&config, &key)?);
        }
        ConfigAction::Set { key, value } => {
            let mut doc = config_io::read_config_document(dir.root())?;
            config_io::set_value(&mut doc, &key, &value)?;
            config_io::write_config_document(dir.root(), &doc)?;
            println!("{} = {}", key, value);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

fn cmd_recovery(base: &Path, cmd: RecoveryCmd, json: bool) -> CmdResult {
    let dir = DataDir::new(base);
    let root = dir.root();

    match cmd.action {
        Some(RecoveryAction::Path) => {
            println!("{}", recovery::recovery_log_path(root).display());
        }
        Some(RecoveryAction::Prune(args)) => {
            let before = match args.before.as_deref() {
                _ if args.all => None,
                Some(s) => Some(parse_utc(s)?),
                None => {
                    let days = config_io::read_config(root)
                        .map(|c| c.recovery.prune_days)
                        .unwrap_or(recovery::PRUNE_AGE_DAYS);
                    let cutoff = recovery::days_ago(days)
                        .ok_or_else(|| format!("recovery.prune_days out of range: {}", days))?;
                    Some(cutoff)
                }
            };
            let removed = recovery::prune_recovery(root, before, args.all)?;
            println!("pruned {} entries", removed);
        }
        None => {
            let since = cmd.since.as_deref().map(parse_utc).transpose()?;
            let entries = recovery::read_recovery_entries(root, Some(cmd.limit.unwrap_or(10)), since);
            if json {
                let out: Vec<serde_json::Value> = entries.iter().map(|e| e.to_json()).collect();
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else if entries.is_empty() {
                println!("no recovery entries");
            } else {
                for entry in &entries {
                    print!("{}", entry.to_markdown());
                }
                let total = recovery::count_entries(root);
                if total > entries.len() {
                    println!("({} of {} entries shown)", entries.len(), total);
                }
            }
        }
    }
    Ok(())
}
