//! Block color tables
//!
//! A palette file is a TOML table keyed by block id:
//!
//! ```toml
//! [0]
//! r = 0
//! g = 0
//! b = 0
//!
//! [9]
//! r = 110
//! g = 110
//! b = 110
//! a = 255
//!
//! [10]
//! hex = "#8b4513"
//! ```
//!
//! An entry gives either `r`, `g`, `b` (and optionally `a`, default 255) or a
//! single `hex` string of the form `#RRGGBB` or `#RRGGBBAA`. Ids that are not
//! listed stay unset and render as the background.

use crate::codec::color::Rgba;
use crate::error::{ScarletError, ScarletResult};
use std::path::Path;

/// Ordered color table indexed by block id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgba>,
}

impl Palette {
    pub fn new(colors: Vec<Rgba>) -> Self {
        Self { colors }
    }

    /// Load and parse a palette file
    pub async fn load(path: &Path) -> ScarletResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ScarletError::io(format!("reading palette {}", path.display()), e))?;

        Self::parse(&content).map_err(|reason| ScarletError::PaletteInvalid {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse palette TOML, reporting the first offending entry
    pub fn parse(content: &str) -> Result<Self, String> {
        let table: toml::Table = toml::from_str(content).map_err(|e| e.to_string())?;

        let mut entries = Vec::with_capacity(table.len());
        for (key, value) in &table {
            let id: u16 = key
                .parse()
                .map_err(|_| format!("block id `{}` is not an integer in 0..=65535", key))?;
            let color = value
                .as_table()
                .ok_or_else(|| format!("entry `{}` must be a table", key))?;

            let channel = |name: &str, default: Option<u8>| -> Result<u8, String> {
                match color.get(name) {
                    Some(v) => v
                        .as_integer()
                        .and_then(|n| u8::try_from(n).ok())
                        .ok_or_else(|| format!("entry `{}`: `{}` must be an integer in 0..=255", key, name)),
                    None => default.ok_or_else(|| format!("entry `{}` is missing `{}`", key, name)),
                }
            };

            let rgba = match color.get("hex") {
                Some(hex) => hex
                    .as_str()
                    .and_then(Rgba::from_hex)
                    .ok_or_else(|| format!("entry `{}`: `hex` must look like #RRGGBB or #RRGGBBAA", key))?,
                None => Rgba::new(
                    channel("r", None)?,
                    channel("g", None)?,
                    channel("b", None)?,
                    channel("a", Some(u8::MAX))?,
                ),
            };
            entries.push((id, rgba));
        }

        let len = entries
            .iter()
            .map(|(id, _)| usize::from(*id) + 1)
            .max()
            .unwrap_or(0);
        let mut colors = vec![Rgba::UNSET; len];
        for (id, rgba) in entries {
            colors[usize::from(id)] = rgba;
        }

        Ok(Self { colors })
    }

    /// Replace the background (entry 0) with a fully opaque color
    pub fn set_background(&mut self, color: Rgba) {
        let color = color.with_alpha(u8::MAX);
        match self.colors.first_mut() {
            Some(first) => *first = color,
            None => self.colors.push(color),
        }
    }

    pub fn get(&self, id: u16) -> Option<Rgba> {
        self.colors.get(usize::from(id)).copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn as_slice(&self) -> &[Rgba] {
        &self.colors
    }

    pub fn into_colors(self) -> Vec<Rgba> {
        self.colors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_sparse_table() {
        let palette = Palette::parse(
            r#"
            [0]
            r = 1
            g = 2
            b = 3

            [3]
            r = 10
            g = 20
            b = 30
            a = 40
            "#,
        )
        .unwrap();

        assert_eq!(palette.len(), 4);
        assert_eq!(palette.get(0), Some(Rgba::opaque(1, 2, 3)));
        assert_eq!(palette.get(1), Some(Rgba::UNSET));
        assert_eq!(palette.get(3), Some(Rgba::new(10, 20, 30, 40)));
        assert_eq!(palette.get(4), None);
    }

    #[test]
    fn parses_hex_entries() {
        let palette = Palette::parse(
            r##"
            [1]
            hex = "#8b4513"

            [2]
            hex = "10203040"
            "##,
        )
        .unwrap();

        assert_eq!(palette.get(1), Some(Rgba::opaque(0x8b, 0x45, 0x13)));
        assert_eq!(palette.get(2), Some(Rgba::new(16, 32, 48, 64)));
        assert!(Palette::parse("[1]\nhex = \"#fff\"").unwrap_err().contains("hex"));
        assert!(Palette::parse("[1]\nhex = 7").is_err());
    }

    #[test]
    fn empty_file_is_empty_palette() {
        assert!(Palette::parse("").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_entries() {
        let non_integer_key = "[stone]\nr = 1\ng = 1\nb = 1\n";
        assert!(Palette::parse(non_integer_key).unwrap_err().contains("stone"));

        assert!(Palette::parse("1 = 5").unwrap_err().contains("must be a table"));
        assert!(Palette::parse("[1]\nr = 1\ng = 1").unwrap_err().contains("missing `b`"));
        assert!(Palette::parse("[1]\nr = 256\ng = 1\nb = 1").is_err());
    }

    #[test]
    fn background_overrides_first_entry_opaquely() {
        let mut palette = Palette::new(vec![Rgba::opaque(1, 1, 1), Rgba::opaque(2, 2, 2)]);
        palette.set_background(Rgba::from_argb(0x0011_2233));
        assert_eq!(palette.get(0), Some(Rgba::new(0x11, 0x22, 0x33, 255)));
        assert_eq!(palette.get(1), Some(Rgba::opaque(2, 2, 2)));

        let mut empty = Palette::default();
        empty.set_background(Rgba::opaque(9, 9, 9));
        assert_eq!(empty.len(), 1);
    }

    #[tokio::test]
    async fn load_reports_path_on_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("colors.toml");
        std::fs::write(&path, "[x]\nr = 1\ng = 1\nb = 1\n").unwrap();

        let err = Palette::load(&path).await.unwrap_err();
        assert!(matches!(err, ScarletError::PaletteInvalid { .. }));
        assert!(err.to_string().contains("colors.toml"));
    }
}
