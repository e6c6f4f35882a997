use crate::{
    Placement,
    config::BoardConfig,
    error::{Axis, CanvasError, ConfigError, Result},
    now_millis,
};
use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// Grid, log and index live behind one lock so they can only change together.
struct Board {
    grid: Vec<u8>,
    log: Vec<Placement>,
    // (x, y) -> position in `log` of the last placement there
    latest: HashMap<(u32, u32), usize>,
}

impl Board {
    fn index_log(log: &[Placement]) -> HashMap<(u32, u32), usize> {
        log.iter()
            .enumerate()
            .map(|(position, placement)| ((placement.x, placement.y), position))
            .collect()
    }
}

/// Point-in-time copy of the board, consistent between grid and log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub grid: Vec<u8>,
    pub log: Vec<Placement>,
}

/// The shared canvas.
///
/// Reads take the shared side of the lock, [`CanvasStore::place`] the exclusive
/// side. The order in which writers are granted the lock is the order of the
/// log, and that order alone decides which placement at a coordinate is the
/// latest one. Timestamps are carried along but never compared.
pub struct CanvasStore {
    width: u32,
    height: u32,
    default_color: u8,
    palette_size: usize,
    board: RwLock<Board>,
}

fn check_axis(axis: Axis, value: i64, limit: u32) -> Result<u32> {
    u32::try_from(value)
        .ok()
        .filter(|value| *value < limit)
        .ok_or(CanvasError::OutOfBounds { axis, value, limit })
}

fn check_color(color: i64, palette_size: usize) -> Result<u8> {
    u8::try_from(color)
        .ok()
        .filter(|color| usize::from(*color) < palette_size)
        .ok_or(CanvasError::InvalidColor {
            color,
            palette_size,
        })
}

fn check_placement(config: &BoardConfig, placement: &Placement) -> Result<()> {
    check_color(placement.color.into(), config.palette.len())?;
    check_axis(Axis::X, placement.x.into(), config.width)?;
    check_axis(Axis::Y, placement.y.into(), config.height)?;
    Ok(())
}

fn validate_log(config: &BoardConfig, log: &[Placement]) -> Result<(), ConfigError> {
    for (position, placement) in log.iter().enumerate() {
        check_placement(config, placement)
            .map_err(|source| ConfigError::InconsistentLog { position, source })?;
    }
    Ok(())
}

/// Rebuild a grid by applying `log` in order on top of a default-filled board.
pub fn replay(config: &BoardConfig, log: &[Placement]) -> Result<Vec<u8>, ConfigError> {
    validate_log(config, log)?;

    let mut grid = vec![config.default_color; config.cell_count()];
    for placement in log {
        grid[placement.y as usize * config.width as usize + placement.x as usize] =
            placement.color;
    }

    Ok(grid)
}

impl CanvasStore {
    /// Board with every cell set to the default color and no history.
    pub fn new(config: &BoardConfig) -> Self {
        Self::with_board(
            config,
            Board {
                grid: vec![config.default_color; config.cell_count()],
                log: Vec::new(),
                latest: HashMap::new(),
            },
        )
    }

    /// Assemble a store from previously persisted state.
    pub fn from_parts(
        config: &BoardConfig,
        grid: Vec<u8>,
        log: Vec<Placement>,
    ) -> Result<Self, ConfigError> {
        if grid.len() != config.cell_count() {
            return Err(ConfigError::SizeMismatch {
                actual: grid.len() as u64,
                expected: config.cell_count(),
            });
        }
        validate_log(config, &log)?;

        let latest = Board::index_log(&log);
        Ok(Self::with_board(config, Board { grid, log, latest }))
    }

    fn with_board(config: &BoardConfig, board: Board) -> Self {
        Self {
            width: config.width,
            height: config.height,
            default_color: config.default_color,
            palette_size: config.palette.len(),
            board: RwLock::new(board),
        }
    }

    // Board is only mutated after validation, poisoning can't leave it half-written
    fn read(&self) -> RwLockReadGuard<'_, Board> {
        self.board.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Board> {
        self.board.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn default_color(&self) -> u8 {
        self.default_color
    }

    #[inline]
    pub fn palette_size(&self) -> usize {
        self.palette_size
    }

    /// Copy of the whole grid, row-major.
    pub fn read_all(&self) -> Vec<u8> {
        self.read().grid.clone()
    }

    pub fn read_cell(&self, x: i64, y: i64) -> Result<u8> {
        let x = check_axis(Axis::X, x, self.width)?;
        let y = check_axis(Axis::Y, y, self.height)?;
        let offset = self.offset(x, y);
        Ok(self.read().grid[offset])
    }

    /// Most recently accepted placement at `(x, y)`.
    pub fn find_latest(&self, x: i64, y: i64) -> Result<Placement> {
        let not_found = CanvasError::NotFound { x, y };
        let (Ok(cx), Ok(cy)) = (u32::try_from(x), u32::try_from(y)) else {
            return Err(not_found);
        };

        let board = self.read();
        board
            .latest
            .get(&(cx, cy))
            .map(|position| board.log[*position])
            .ok_or(not_found)
    }

    /// Validate and apply a single-cell write.
    ///
    /// The color is checked first, then `x`, then `y`. Nothing is touched
    /// unless all three pass; on success the grid cell and the log entry become
    /// visible together.
    pub fn place(&self, x: i64, y: i64, color: i64, now: i64) -> Result<Placement> {
        let color = check_color(color, self.palette_size)?;
        let x = check_axis(Axis::X, x, self.width)?;
        let y = check_axis(Axis::Y, y, self.height)?;

        let placement = Placement {
            x,
            y,
            color,
            time: now,
        };
        let offset = self.offset(x, y);

        let mut board = self.write();
        board.grid[offset] = color;
        let position = board.log.len();
        board.log.push(placement);
        board.latest.insert((x, y), position);
        drop(board);

        trace!(x, y, color, "placed pixel");

        Ok(placement)
    }

    /// [`CanvasStore::place`], stamped with the current wall clock time.
    pub fn place_now(&self, x: i64, y: i64, color: i64) -> Result<Placement> {
        self.place(x, y, color, now_millis())
    }

    pub fn log_len(&self) -> usize {
        self.read().log.len()
    }

    pub fn snapshot(&self) -> Snapshot {
        let board = self.read();
        Snapshot {
            grid: board.grid.clone(),
            log: board.log.clone(),
        }
    }
}
