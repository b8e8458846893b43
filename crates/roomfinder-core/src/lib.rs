pub mod config;
pub mod error;
pub mod types;

pub use config::RoomfinderConfig;
pub use error::{Result, RoomfinderError};
pub use types::*;
