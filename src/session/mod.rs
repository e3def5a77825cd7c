//! The working set behind any front end: the three loaded collections, the
//! current mode and per-mode selection, and the note auto-save timer.

pub mod autosave;

use std::path::Path;
use std::time::Instant;

pub use autosave::AutoSave;

use crate::io::config_io::{self, CONFIG_FILE};
use crate::io::store_io::{DataDir, LoadWarning, Store, StoreError, WarningKind};
use crate::model::config::StoreConfig;
use crate::model::flag::Flag;
use crate::model::naming::{MAX_FLAGS, MAX_NOTES};
use crate::model::note::Note;
use crate::model::scene::{SceneTable, Scenes};
use crate::ops::scene_ops::{self, SceneError};
use crate::ops::slot_ops::{self, SlotError};

/// Error type for session operations that touch both memory and disk
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Slot(#[from] SlotError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Table,
    Flag,
    Note,
}

pub struct Session {
    store: Store,
    config: StoreConfig,
    pub scenes: Scenes,
    pub flags: [Flag; MAX_FLAGS],
    pub notes: [Note; MAX_NOTES],
    warnings: Vec<LoadWarning>,
    mode: Mode,
    scene_index: usize,
    flag_index: usize,
    note_index: usize,
    autosave: AutoSave,
}

impl Session {
    /// Load everything under `base/data`. Never fails: problems end up in
    /// [`Session::warnings`].
    pub fn open(base: &Path) -> Session {
        let dir = DataDir::new(base);
        let mut warnings = Vec::new();

        let config = match config_io::read_config(dir.root()) {
            Ok(config) => config,
            Err(e) => {
                let warning = LoadWarning {
                    path: dir.root().join(CONFIG_FILE),
                    kind: WarningKind::Malformed(e.to_string()),
                };
                log::warn!("{}", warning);
                warnings.push(warning);
                StoreConfig::default()
            }
        };

        let store = Store::new(dir).with_recovery_log(config.recovery.enabled);
        let (scenes, w) = store.load_scenes().into_parts();
        warnings.extend(w);
        let (flags, w) = store.load_flags().into_parts();
        warnings.extend(w);
        let (notes, w) = store.load_notes().into_parts();
        warnings.extend(w);

        Session {
            autosave: AutoSave::from_config(&config.autosave),
            store,
            config,
            scenes,
            flags,
            notes,
            warnings,
            mode: Mode::Table,
            scene_index: 0,
            flag_index: 0,
            note_index: 0,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    // --- mode & selection ---

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn switch_mode(&mut self, mode: Mode) {
        self.mode = mode;
        let index = self.current_index();
        self.select(index);
    }

    fn mode_len(&self) -> usize {
        match self.mode {
            Mode::Table => self.scenes.len(),
            Mode::Flag => MAX_FLAGS,
            Mode::Note => MAX_NOTES,
        }
    }

    /// Select slot `index` in the current mode; out of range selects 0.
    /// Returns the selected index.
    pub fn select(&mut self, index: usize) -> usize {
        let index = if index < self.mode_len() { index } else { 0 };
        match self.mode {
            Mode::Table => self.scene_index = index,
            Mode::Flag => self.flag_index = index,
            Mode::Note => self.note_index = index,
        }
        index
    }

    pub fn current_index(&self) -> usize {
        match self.mode {
            Mode::Table => self.scene_index,
            Mode::Flag => self.flag_index,
            Mode::Note => self.note_index,
        }
    }

    /// Name and fields of the selected scene
    pub fn current_scene(&self) -> Option<(&str, &[String])> {
        self.scenes
            .get_index(self.scene_index)
            .map(|(name, fields)| (name.as_str(), fields.as_slice()))
    }

    pub fn current_flag(&self) -> &Flag {
        &self.flags[self.flag_index]
    }

    pub fn current_flag_mut(&mut self) -> &mut Flag {
        &mut self.flags[self.flag_index]
    }

    pub fn current_note(&self) -> &Note {
        &self.notes[self.note_index]
    }

    pub fn current_note_mut(&mut self) -> &mut Note {
        &mut self.notes[self.note_index]
    }

    // --- tables ---

    /// A scene with its rows. Read problems are added to the warnings.
    pub fn table(&mut self, name: &str) -> Result<SceneTable, SceneError> {
        let fields = self
            .scenes
            .get(name)
            .ok_or_else(|| SceneError::NotFound(name.to_string()))?
            .clone();
        let (records, w) = self.store.load_records(name).into_parts();
        self.warnings.extend(w);
        Ok(SceneTable {
            name: name.to_string(),
            fields,
            records,
        })
    }

    pub fn save_table(&self, table: &SceneTable) -> Result<(), StoreError> {
        self.store
            .save_records(&table.name, &table.fields, &table.records)
    }

    /// Rename a scene together with its CSV, then save the scene list.
    /// Nothing changes in memory unless the CSV could be moved.
    pub fn rename_scene(&mut self, old: &str, new: &str) -> Result<(), SessionError> {
        let mut renamed = self.scenes.clone();
        scene_ops::rename_scene(&mut renamed, old, new)?;
        let new = new.trim();
        if old == new {
            return Ok(());
        }
        self.store.rename_records(old, new)?;

        let previous = std::mem::replace(&mut self.scenes, renamed);
        if let Err(e) = self.save_scenes() {
            self.scenes = previous;
            if let Err(undo) = self.store.rename_records(new, old) {
                log::warn!("could not move {}.csv back after a failed rename: {}", new, undo);
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Reset a scene to the default schema and drop its rows
    pub fn clear_scene(&mut self, name: &str) -> Result<(), SessionError> {
        let table = self.table(name)?;
        scene_ops::clear_scene(&mut self.scenes, name)?;
        if !table.records.is_empty() {
            self.store.log_cleared(
                &format!("scene {}", name),
                crate::parse::serialize_records(&table.fields, &table.records),
            );
        }
        self.store
            .save_records(name, &self.scenes[name], &[])?;
        self.save_scenes()?;
        Ok(())
    }

    // --- slots ---

    pub fn clear_flag(&mut self, index: usize) -> Result<(), SessionError> {
        let previous = slot_ops::clear_flag(&mut self.flags, index)?;
        self.store
            .log_cleared(&format!("flag {}", index + 1), to_json_body(&previous));
        self.save_flags()?;
        Ok(())
    }

    pub fn clear_note(&mut self, index: usize, now: &str) -> Result<(), SessionError> {
        let previous = slot_ops::clear_note(&mut self.notes, index, now)?;
        self.store
            .log_cleared(&format!("note {}", index + 1), to_json_body(&previous));
        self.save_notes()?;
        Ok(())
    }

    // --- saving ---

    pub fn save_scenes(&self) -> Result<(), StoreError> {
        self.store.save_scenes(&self.scenes)
    }

    pub fn save_flags(&self) -> Result<(), StoreError> {
        self.store.save_flags(&self.flags)
    }

    /// Save notes now; a pending auto-save is dropped.
    pub fn save_notes(&mut self) -> Result<(), StoreError> {
        self.autosave.cancel();
        self.store.save_notes(&self.notes)
    }

    /// Note content changed at `now`: (re)arm the auto-save
    pub fn note_edited(&mut self, now: Instant) {
        self.autosave.touch(now);
    }

    /// Drive the auto-save. Returns true when notes were written. A failed
    /// save is returned and not retried until the next edit.
    pub fn tick(&mut self, now: Instant) -> Result<bool, StoreError> {
        if !self.autosave.poll(now) {
            return Ok(false);
        }
        self.store.save_notes(&self.notes)?;
        Ok(true)
    }

    pub fn autosave_pending(&self) -> bool {
        self.autosave.is_pending()
    }
}

fn to_json_body<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
