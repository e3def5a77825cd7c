pub mod flag_ops;
pub mod reconcile;
pub mod scene_ops;
pub mod slot_ops;
pub mod status_ops;

pub use flag_ops::FlagError;
pub use scene_ops::SceneError;
pub use slot_ops::{Direction, SlotError};
pub use status_ops::StatusError;
