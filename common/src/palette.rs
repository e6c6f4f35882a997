use crate::error::ConfigError;
use itertools::Itertools;
use std::ops::Index;

/// A cell stores its color as one byte, so that's the hard ceiling.
pub const MAX_COLORS: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parse `RRGGBB`, with or without a leading `#`.
    pub fn from_hex(hex: &str) -> Result<Self, &'static str> {
        let hex = hex.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 {
            return Err("expected six hex digits (RRGGBB)");
        }
        if !hex.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err("not a hex number");
        }

        let value = u32::from_str_radix(hex, 16).map_err(|_| "not a hex number")?;
        Ok(Self {
            r: (value >> 16) as u8,
            g: (value >> 8 & 0xFF) as u8,
            b: (value & 0xFF) as u8,
        })
    }

    #[inline]
    pub fn to_hex(self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Ordered colors, resolved once at startup and never touched again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    pub fn resolve<I, S>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let colors: Vec<Rgb> = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let entry = entry.as_ref();
                Rgb::from_hex(entry).map_err(|reason| ConfigError::PaletteEntry {
                    index,
                    entry: entry.to_string(),
                    reason,
                })
            })
            .try_collect()?;

        if colors.is_empty() || colors.len() > MAX_COLORS {
            return Err(ConfigError::PaletteSize(colors.len()));
        }

        Ok(Self { colors })
    }

    /// Comma separated list, as found in the `PALETTE` variable.
    pub fn parse_list(list: &str) -> Result<Self, ConfigError> {
        let list = list.trim();
        if list.is_empty() {
            return Err(ConfigError::PaletteSize(0));
        }
        Self::resolve(list.split(','))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    #[inline]
    pub fn get(&self, index: u8) -> Option<Rgb> {
        self.colors.get(usize::from(index)).copied()
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }
}

impl Index<u8> for Palette {
    type Output = Rgb;

    fn index(&self, index: u8) -> &Self::Output {
        &self.colors[usize::from(index)]
    }
}
