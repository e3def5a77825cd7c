pub mod time;
pub mod unicode;
