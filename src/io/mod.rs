pub mod config_io;
pub mod recovery;
pub mod store_io;

pub use config_io::ConfigError;
pub use store_io::{DataDir, LoadWarning, Loaded, Store, StoreError, WarningKind};
