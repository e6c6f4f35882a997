#[macro_use]
extern crate tracing;

use anyhow::ensure;
use pxg_common::{
    BoardConfig, Flusher, Storage,
    config::{DEFAULT_COLOR_VAR, HEIGHT_VAR, PALETTE_VAR, WIDTH_VAR},
};
use std::{
    env,
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

mod command;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(argh::FromArgs)]
/// Shared pixel board, driven one command per line over stdin
struct Args {
    #[argh(option, default = "PathBuf::from(\"storage\")")]
    /// directory holding board.dat and data.json
    storage: PathBuf,

    #[argh(option, default = "10")]
    /// seconds between two saves of the board
    flush_interval_secs: u64,

    #[argh(option)]
    /// board width, overrides BOARD_WIDTH
    width: Option<u32>,

    #[argh(option)]
    /// board height, overrides BOARD_HEIGHT
    height: Option<u32>,

    #[argh(option)]
    /// default color index, overrides DEFAULT_COLOR_INDEX
    default_color: Option<u8>,

    #[argh(option)]
    /// comma separated RRGGBB colors, overrides PALETTE
    palette: Option<String>,
}

fn board_config(args: &Args) -> anyhow::Result<BoardConfig> {
    let config = BoardConfig::from_lookup(|key| {
        let flag = match key {
            WIDTH_VAR => args.width.map(|width| width.to_string()),
            HEIGHT_VAR => args.height.map(|height| height.to_string()),
            DEFAULT_COLOR_VAR => args.default_color.map(|color| color.to_string()),
            PALETTE_VAR => args.palette.clone(),
            _ => None,
        };
        flag.or_else(|| env::var(key).ok())
    })?;

    Ok(config)
}

fn main() -> anyhow::Result<()> {
    // stdout carries the responses
    tracing_subscriber::fmt().with_writer(io::stderr).init();
    let args: Args = argh::from_env();
    ensure!(args.flush_interval_secs > 0, "flush interval must be at least one second");

    info!("pxg v{}", env!("CARGO_PKG_VERSION"));

    let config = board_config(&args)?;
    let storage = Storage::create(&args.storage)?;
    let store = Arc::new(storage.load(&config)?);

    let flusher = Flusher::spawn(
        Arc::clone(&store),
        storage,
        Duration::from_secs(args.flush_interval_secs),
    )?;

    info!(
        width = config.width,
        height = config.height,
        colors = config.palette.len(),
        "board ready"
    );

    let mut stdout = io::stdout().lock();
    for line in io::stdin().lock().split(b'\n') {
        let line = line?;
        if let Some(response) = command::handle_bytes(&store, &config, &line) {
            writeln!(stdout, "{response}")?;
            stdout.flush()?;
        }
    }

    info!("input closed, saving and shutting down");
    flusher.shutdown();

    Ok(())
}
