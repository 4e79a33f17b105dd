//! RGBA color value

use std::fmt;

/// An 8-bit-per-channel RGBA color, stored in R, G, B, A byte order.
///
/// The all-zero color is reserved as the "unset" sentinel. It is never
/// rendered; the encoder substitutes the background color instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Size of one encoded color in bytes
    pub const SIZE: usize = 4;

    /// Reserved "unset" sentinel
    pub const UNSET: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from red, green and blue channels
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Decode a packed `0xAARRGGBB` value, as game back-ends report colors
    pub const fn from_argb(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }

    /// Whether this is the reserved sentinel
    pub const fn is_unset(&self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0 && self.a == 0
    }

    /// Same color with a different alpha
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Bytes in image order: R, G, B, A
    pub const fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2], bytes[3])
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional)
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::opaque(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.r, self.g, self.b, self.a
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argb_unpacks_channels() {
        let c = Rgba::from_argb(0xFF11_2233);
        assert_eq!(c, Rgba::new(0x11, 0x22, 0x33, 0xFF));
    }

    #[test]
    fn sentinel_is_distinct_from_transparent_black() {
        assert!(Rgba::UNSET.is_unset());
        assert!(!Rgba::new(0, 0, 0, 255).is_unset());
        assert!(!Rgba::new(0, 0, 1, 0).is_unset());
    }

    #[test]
    fn byte_order_is_rgba() {
        assert_eq!(Rgba::new(1, 2, 3, 4).to_bytes(), [1, 2, 3, 4]);
        assert_eq!(Rgba::from_bytes([9, 8, 7, 6]), Rgba::new(9, 8, 7, 6));
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(Rgba::from_hex("#ff0080"), Some(Rgba::opaque(255, 0, 128)));
        assert_eq!(Rgba::from_hex("10203040"), Some(Rgba::new(16, 32, 48, 64)));
        assert_eq!(Rgba::from_hex("#fff"), None);
        assert_eq!(Rgba::from_hex("#gg0000"), None);
        assert_eq!(Rgba::opaque(255, 0, 128).to_string(), "#ff0080ff");
    }
}
