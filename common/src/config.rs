use crate::{error::ConfigError, palette::Palette};
use serde::Serialize;
use std::env;

pub const WIDTH_VAR: &str = "BOARD_WIDTH";
pub const HEIGHT_VAR: &str = "BOARD_HEIGHT";
pub const DEFAULT_COLOR_VAR: &str = "DEFAULT_COLOR_INDEX";
pub const PALETTE_VAR: &str = "PALETTE";

/// Everything about the board that is fixed for the lifetime of the process.
#[derive(Clone, Debug)]
pub struct BoardConfig {
    pub width: u32,
    pub height: u32,
    pub default_color: u8,
    pub palette: Palette,
}

/// Wire shape of the board configuration, palette spelled as hex.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardInfo {
    pub width: u32,
    pub height: u32,
    pub default_color_index: u8,
    pub palette: Vec<String>,
}

fn number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::NotANumber {
        key,
        value: value.to_string(),
    })
}

impl BoardConfig {
    pub fn new(
        width: u32,
        height: u32,
        default_color: i64,
        palette: Palette,
    ) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyBoard { width, height });
        }

        let default_color = u8::try_from(default_color)
            .ok()
            .filter(|index| usize::from(*index) < palette.len())
            .ok_or(ConfigError::DefaultColor {
                index: default_color,
                palette_size: palette.len(),
            })?;

        Ok(Self {
            width,
            height,
            default_color,
            palette,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let required = |key| lookup(key).ok_or(ConfigError::Missing(key));

        let width = number(WIDTH_VAR, &required(WIDTH_VAR)?)?;
        let height = number(HEIGHT_VAR, &required(HEIGHT_VAR)?)?;
        let default_color = match lookup(DEFAULT_COLOR_VAR) {
            Some(value) if !value.trim().is_empty() => number(DEFAULT_COLOR_VAR, &value)?,
            _ => 0,
        };
        let palette = Palette::parse_list(&required(PALETTE_VAR)?)?;

        Self::new(width, height, default_color, palette)
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn info(&self) -> BoardInfo {
        BoardInfo {
            width: self.width,
            height: self.height,
            default_color_index: self.default_color,
            palette: self.palette.colors().iter().map(|rgb| rgb.to_hex()).collect(),
        }
    }
}
