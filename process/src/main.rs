#[macro_use]
extern crate tracing;

use anyhow::{Context, bail};
use image::{ImageFormat, RgbaImage};
use itertools::{Itertools, iproduct};
use pxg_common::{BoardConfig, Placement, Storage, replay};
use std::path::PathBuf;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(argh::FromArgs)]
/// process the storage directory of a board: render it, audit it
struct Args {
    #[argh(option, default = "PathBuf::from(\"storage\")")]
    /// directory holding board.dat and data.json
    storage: PathBuf,

    #[argh(option)]
    /// write the board as a PNG to this path
    output: Option<PathBuf>,

    #[argh(switch)]
    /// replay the placement log and compare it against the saved board
    audit: bool,
}

/// Paint every cell through the palette, fully opaque.
fn render(config: &BoardConfig, grid: &[u8]) -> anyhow::Result<RgbaImage> {
    if grid.len() != config.cell_count() {
        bail!(
            "board has {} cells, expected {}",
            grid.len(),
            config.cell_count()
        );
    }

    let mut image = RgbaImage::new(config.width, config.height);
    for (y, x) in iproduct!(0..config.height, 0..config.width) {
        let index = grid[y as usize * config.width as usize + x as usize];
        let Some(rgb) = config.palette.get(index) else {
            bail!("cell ({x}, {y}) holds color {index}, which the palette doesn't have");
        };
        image.put_pixel(x, y, image::Rgba([rgb.r, rgb.g, rgb.b, 0xFF]));
    }

    Ok(image)
}

/// Offsets of every cell where `grid` disagrees with a replay of `log`.
fn audit(config: &BoardConfig, grid: &[u8], log: &[Placement]) -> anyhow::Result<Vec<usize>> {
    let replayed = replay(config, log)?;
    Ok(grid
        .iter()
        .zip(&replayed)
        .positions(|(saved, derived)| saved != derived)
        .collect())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args: Args = argh::from_env();

    let config = BoardConfig::from_env()?;
    let storage = Storage::in_dir(&args.storage);
    let grid = storage.load_grid(&config)?;

    if args.audit {
        let log = storage.load_log()?;
        let mismatches = audit(&config, &grid, &log)?;
        if !mismatches.is_empty() {
            for offset in mismatches.iter().take(16) {
                let (x, y) = (offset % config.width as usize, offset / config.width as usize);
                warn!(x, y, "saved cell disagrees with the placement log");
            }
            bail!("{} cells disagree with the placement log", mismatches.len());
        }
        info!(placements = log.len(), "board matches its placement log");
    }

    if let Some(output) = args.output {
        let image = render(&config, &grid)?;
        image
            .save_with_format(&output, ImageFormat::Png)
            .with_context(|| format!("failed to write {}", output.display()))?;
        info!(path = %output.display(), "rendered board");
    }

    Ok(())
}
