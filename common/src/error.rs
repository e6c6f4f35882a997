use std::{fmt, io, path::PathBuf};

pub type Result<T, E = CanvasError> = std::result::Result<T, E>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => f.write_str("x"),
            Self::Y => f.write_str("y"),
        }
    }
}

/// Per-call failures of the canvas store. None of them mutate the board.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CanvasError {
    #[error("color {color} out of range (palette has {palette_size} colors)")]
    InvalidColor { color: i64, palette_size: usize },

    #[error("{axis}-coordinate {value} out of range (0..{limit})")]
    OutOfBounds { axis: Axis, value: i64, limit: u32 },

    #[error("no placement at ({x}, {y})")]
    NotFound { x: i64, y: i64 },
}

/// Startup failures. The process must not serve anything after one of these.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("{key} is not a valid number: {value:?}")]
    NotANumber { key: &'static str, value: String },

    #[error("board dimensions must be positive, got {width}x{height}")]
    EmptyBoard { width: u32, height: u32 },

    #[error("invalid palette entry #{index} {entry:?}: {reason}")]
    PaletteEntry {
        index: usize,
        entry: String,
        reason: &'static str,
    },

    #[error("palette must hold between 1 and 256 colors, got {0}")]
    PaletteSize(usize),

    #[error("default color index {index} is outside the palette ({palette_size} colors)")]
    DefaultColor { index: i64, palette_size: usize },

    #[error("board size ({actual}) did not match expected size ({expected})")]
    SizeMismatch { actual: u64, expected: usize },

    #[error("placement #{position} in the log is invalid: {source}")]
    InconsistentLog {
        position: usize,
        source: CanvasError,
    },

    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Failures reading or writing the storage files.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("io error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("malformed placement log {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl PersistError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
