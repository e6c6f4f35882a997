use anyhow::{Context, bail};
use pxg_common::{BoardConfig, CanvasStore};

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Ping,
    Size,
    Info,
    Read { x: i64, y: i64 },
    Place { x: i64, y: i64, color: i64 },
    Last { x: i64, y: i64 },
}

fn number(name: &str, word: Option<&str>) -> anyhow::Result<i64> {
    let word = word.with_context(|| format!("missing {name}"))?;
    word.parse()
        .with_context(|| format!("{name} is not a number"))
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let mut words = line.split_ascii_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };

        let command = match verb.to_ascii_uppercase().as_str() {
            "PING" => Self::Ping,
            "SIZE" => Self::Size,
            "INFO" => Self::Info,
            "PX" => {
                let x = number("x", words.next())?;
                let y = number("y", words.next())?;
                match words.next() {
                    Some(color) => Self::Place {
                        x,
                        y,
                        color: number("color", Some(color))?,
                    },
                    None => Self::Read { x, y },
                }
            }
            "LAST" => Self::Last {
                x: number("x", words.next())?,
                y: number("y", words.next())?,
            },
            other => bail!("unknown command {other:?}"),
        };

        if words.next().is_some() {
            bail!("trailing input after {verb}");
        }

        Ok(Some(command))
    }

    pub fn execute(self, store: &CanvasStore, config: &BoardConfig) -> anyhow::Result<String> {
        let response = match self {
            Self::Ping => "PONG".to_string(),
            Self::Size => {
                let (width, height) = store.dimensions();
                format!("SIZE {width} {height}")
            }
            Self::Info => serde_json::to_string(&config.info())?,
            Self::Read { x, y } => format!("PX {x} {y} {}", store.read_cell(x, y)?),
            Self::Place { x, y, color } => {
                let placement = store.place_now(x, y, color)?;
                format!("OK {}", placement.time)
            }
            Self::Last { x, y } => serde_json::to_string(&store.find_latest(x, y)?)?,
        };

        Ok(response)
    }
}

/// Turn one input line into one response line, errors included.
pub fn handle(store: &CanvasStore, config: &BoardConfig, line: &str) -> Option<String> {
    let result = Command::parse(line).and_then(|command| {
        command
            .map(|command| command.execute(store, config))
            .transpose()
    });

    match result {
        Ok(response) => response,
        Err(error) => {
            debug!(%error, line, "rejected command");
            Some(format!("ERR {error}"))
        }
    }
}

/// [`handle`] for a raw input line, which may not be UTF-8.
pub fn handle_bytes(store: &CanvasStore, config: &BoardConfig, line: &[u8]) -> Option<String> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    match std::str::from_utf8(line) {
        Ok(line) => handle(store, config, line),
        Err(error) => {
            debug!(%error, "rejected non-UTF-8 line");
            Some("ERR line is not valid UTF-8".to_string())
        }
    }
}
