use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sy", about = concat!("systema v", env!("CARGO_PKG_VERSION"), " - tables, flags and notes in plain files"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different base directory (the one holding data/)
    #[arg(short = 'C', long = "dir", global = true)]
    pub dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List scenes with their field and row counts
    Scenes,
    /// Show a scene's rows, or change its fields and rows
    Table(TableArgs),
    /// Add, rename, clear or reorder scenes
    Scene(SceneCmd),
    /// List the flag slots
    Flags,
    /// Show or change one flag
    Flag(FlagCmd),
    /// List the note slots
    Notes,
    /// Show or change one note
    Note(NoteCmd),
    /// Read or write data/systema.toml
    Config(ConfigCmd),
    /// View or manage the recovery log
    Recovery(RecoveryCmd),
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TableArgs {
    /// Scene name
    pub scene: String,
    /// Replace the field list
    #[arg(long, num_args = 1..)]
    pub fields: Option<Vec<String>>,
    /// Append a row: --add field=value ...
    #[arg(long, num_args = 1.., value_name = "FIELD=VALUE")]
    pub add: Option<Vec<String>>,
    /// Set one cell: --set ROW FIELD VALUE (rows count from 1)
    #[arg(long, num_args = 3, value_names = ["ROW", "FIELD", "VALUE"])]
    pub set: Option<Vec<String>>,
    /// Delete a row (rows count from 1)
    #[arg(long, value_name = "ROW")]
    pub delete: Option<usize>,
}

#[derive(Args)]
pub struct SceneCmd {
    #[command(subcommand)]
    pub action: SceneAction,
}

#[derive(Subcommand)]
pub enum SceneAction {
    /// Add a scene (default field list: 标签1)
    Add {
        name: String,
        /// Field names
        fields: Vec<String>,
    },
    /// Rename a scene and its table file
    Rename { old: String, new: String },
    /// Reset a scene's fields and drop its rows
    Clear { name: String },
    /// Move a scene up
    Up { name: String },
    /// Move a scene down
    Down { name: String },
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct FlagCmd {
    /// Slot number (1-6)
    pub slot: usize,
    #[command(subcommand)]
    pub action: Option<FlagAction>,
}

#[derive(Subcommand)]
pub enum FlagAction {
    /// Set the start time ("" clears it)
    StartAt { time: String },
    /// Set the target time ("" clears it)
    TargetAt { time: String },
    /// Start, pause or resume the timer
    Run,
    /// Replace the content
    Content { text: String },
    /// Mark completed
    Complete,
    /// Mark discarded
    Discard,
    /// Rename the slot
    Rename { name: String },
    /// Reset the slot to its default
    Clear,
    /// Swap with the slot above
    Up,
    /// Swap with the slot below
    Down,
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct NoteCmd {
    /// Slot number (1-10)
    pub slot: usize,
    #[command(subcommand)]
    pub action: Option<NoteAction>,
}

#[derive(Subcommand)]
pub enum NoteAction {
    /// Change title and/or content
    Edit {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
    /// Mark completed
    Complete,
    /// Mark discarded
    Discard,
    /// Set the slot's display name
    Rename { name: String },
    /// Reset the slot to its default
    Clear,
    /// Swap with the slot above
    Up,
    /// Swap with the slot below
    Down,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective value of a key
    Get { key: String },
    /// Set a key, keeping the rest of the file as is
    Set { key: String, value: String },
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RecoveryCmd {
    #[command(subcommand)]
    pub action: Option<RecoveryAction>,
    /// Maximum number of entries to show (default: 10)
    #[arg(long)]
    pub limit: Option<usize>,
    /// Show entries after this timestamp (RFC 3339)
    #[arg(long)]
    pub since: Option<String>,
}

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Remove old entries
    Prune(RecoveryPruneArgs),
    /// Print the absolute path to the recovery log
    Path,
}

#[derive(Args)]
pub struct RecoveryPruneArgs {
    /// Remove entries older than this timestamp (default: prune_days ago)
    #[arg(long)]
    pub before: Option<String>,
    /// Remove all entries
    #[arg(long)]
    pub all: bool,
}
