pub mod config;
pub mod flag;
pub mod naming;
pub mod note;
pub mod scene;
pub mod status;

pub use config::*;
pub use flag::*;
pub use naming::*;
pub use note::*;
pub use scene::*;
pub use status::*;
