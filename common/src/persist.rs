use crate::{
    Placement,
    config::BoardConfig,
    error::{ConfigError, PersistError},
    store::{CanvasStore, Snapshot, replay},
};
use std::{
    ffi::OsString,
    fs::{self, File},
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

pub const GRID_FILE: &str = "board.dat";
pub const LOG_FILE: &str = "data.json";

fn open_existing(path: &Path) -> Result<Option<File>, PersistError> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(PersistError::io(path)(error)),
    }
}

/// Read the raw grid, or a default-filled one if there is no file yet.
///
/// A file of any other size than `expected_size` is refused: padding or
/// truncating it would shift every cell after the first bad row.
pub fn load_grid(
    path: &Path,
    expected_size: usize,
    default_color: u8,
) -> Result<Vec<u8>, ConfigError> {
    let Some(mut file) = open_existing(path)? else {
        info!(path = %path.display(), "no board on disk, starting blank");
        return Ok(vec![default_color; expected_size]);
    };

    let actual = file.metadata().map_err(PersistError::io(path))?.len();
    if actual != expected_size as u64 {
        return Err(ConfigError::SizeMismatch {
            actual,
            expected: expected_size,
        });
    }

    let mut data = Vec::with_capacity(expected_size);
    file.read_to_end(&mut data).map_err(PersistError::io(path))?;
    // the file may have changed size since the metadata call
    if data.len() != expected_size {
        return Err(ConfigError::SizeMismatch {
            actual: data.len() as u64,
            expected: expected_size,
        });
    }

    Ok(data)
}

/// Read the placement history, or an empty one if there is no file yet.
pub fn load_log(path: &Path) -> Result<Vec<Placement>, PersistError> {
    let Some(file) = open_existing(path)? else {
        info!(path = %path.display(), "no placement log on disk, starting empty");
        return Ok(Vec::new());
    };

    // `null` is what an empty history looked like before the log was ever written to
    let log: Option<Vec<Placement>> = serde_json::from_reader(BufReader::new(file))
        .map_err(|source| {
            if source.is_io() {
                PersistError::io(path)(source.into())
            } else {
                PersistError::Malformed {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

    Ok(log.unwrap_or_default())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write into a sibling file and rename it over `path` once it is synced.
fn write_replace<F>(path: &Path, write: F) -> Result<(), PersistError>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let tmp_path = tmp_path(path);
    let result = (|| {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        write(&mut writer)?;
        let file = writer.into_inner().map_err(|error| error.into_error())?;
        file.sync_all()
    })();

    if let Err(error) = result {
        fs::remove_file(&tmp_path).ok();
        return Err(PersistError::io(&tmp_path)(error));
    }

    fs::rename(&tmp_path, path).map_err(PersistError::io(path))
}

pub fn save_grid(path: &Path, grid: &[u8]) -> Result<(), PersistError> {
    write_replace(path, |writer| writer.write_all(grid))
}

pub fn save_log(path: &Path, log: &[Placement]) -> Result<(), PersistError> {
    write_replace(path, |writer| {
        serde_json::to_writer(&mut *writer, log).map_err(io::Error::from)
    })
}

/// Where a board lives on disk.
#[derive(Clone, Debug)]
pub struct Storage {
    grid_path: PathBuf,
    log_path: PathBuf,
}

impl Storage {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            grid_path: dir.join(GRID_FILE),
            log_path: dir.join(LOG_FILE),
        }
    }

    /// Like [`Storage::in_dir`], creating the directory if needed.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, PersistError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(PersistError::io(dir))?;
        Ok(Self::in_dir(dir))
    }

    pub fn grid_path(&self) -> &Path {
        &self.grid_path
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn load_grid(&self, config: &BoardConfig) -> Result<Vec<u8>, ConfigError> {
        load_grid(&self.grid_path, config.cell_count(), config.default_color)
    }

    pub fn load_log(&self) -> Result<Vec<Placement>, PersistError> {
        load_log(&self.log_path)
    }

    /// Load grid and log and check that they fit `config`.
    ///
    /// The log is the authoritative history. A grid file that disagrees with a
    /// replay of the log is replaced by the replay.
    pub fn load(&self, config: &BoardConfig) -> Result<CanvasStore, ConfigError> {
        let mut grid = self.load_grid(config)?;
        let log = self.load_log()?;
        let placements = log.len();

        let replayed = replay(config, &log)?;
        if replayed != grid {
            let drifted = grid.iter().zip(&replayed).filter(|(a, b)| a != b).count();
            warn!(
                path = %self.grid_path.display(),
                drifted,
                "saved board disagrees with the placement log, rebuilding it from the log"
            );
            grid = replayed;
        }

        let store = CanvasStore::from_parts(config, grid, log)?;
        info!(
            width = config.width,
            height = config.height,
            placements,
            "loaded board"
        );

        Ok(store)
    }

    /// Write the log first: a grid left behind by a failed save is repaired
    /// from the log on the next [`Storage::load`].
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        save_log(&self.log_path, &snapshot.log)?;
        save_grid(&self.grid_path, &snapshot.grid)?;
        debug!(placements = snapshot.log.len(), "saved board");
        Ok(())
    }
}
