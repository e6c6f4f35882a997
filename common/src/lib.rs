#[macro_use]
extern crate tracing;

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod config;
pub mod error;
pub mod flush;
pub mod palette;
pub mod persist;
pub mod store;

pub use self::{
    config::{BoardConfig, BoardInfo},
    error::{Axis, CanvasError, ConfigError, PersistError, Result},
    flush::Flusher,
    palette::{Palette, Rgb},
    persist::Storage,
    store::{CanvasStore, Snapshot, replay},
};

/// One accepted write to the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub color: u8,
    /// Unix timestamp in milliseconds
    pub time: i64,
}

pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
