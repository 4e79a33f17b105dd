//! Table-driven checksums used by the image format
//!
//! CRC-32 guards every PNG chunk; Adler-32 trails the zlib stream.

use std::sync::OnceLock;

/// Reflected CRC-32 polynomial used by PNG, zlib and Ethernet
pub const CRC32_IEEE: u32 = 0xEDB8_8320;

/// Reflected CRC-32C polynomial (iSCSI, RFC 3720)
pub const CRC32_CASTAGNOLI: u32 = 0x82F6_3B78;

/// A CRC-32 engine for one reflected polynomial.
#[derive(Debug, Clone)]
pub struct Crc32 {
    table: [u32; 256],
}

impl Crc32 {
    /// Build the 256-entry lookup table for `polynomial`
    pub fn new(polynomial: u32) -> Self {
        let mut table = [0u32; 256];
        for (n, slot) in table.iter_mut().enumerate() {
            let mut c = n as u32;
            for _ in 0..8 {
                c = if c & 1 == 1 {
                    polynomial ^ (c >> 1)
                } else {
                    c >> 1
                };
            }
            *slot = c;
        }
        Self { table }
    }

    /// Shared engine for the PNG polynomial
    pub fn png() -> &'static Crc32 {
        static PNG: OnceLock<Crc32> = OnceLock::new();
        PNG.get_or_init(|| Crc32::new(CRC32_IEEE))
    }

    /// Feed `data` into a running register. Start from `0xFFFF_FFFF` and
    /// invert the final register, or use [`Crc32::checksum`].
    pub fn update(&self, crc: u32, data: &[u8]) -> u32 {
        data.iter().fold(crc, |c, &byte| {
            self.table[((c ^ u32::from(byte)) & 0xFF) as usize] ^ (c >> 8)
        })
    }

    pub fn checksum(&self, data: &[u8]) -> u32 {
        self.update(0xFFFF_FFFF, data) ^ 0xFFFF_FFFF
    }
}

/// CRC-32 with the PNG polynomial
pub fn crc32(data: &[u8]) -> u32 {
    Crc32::png().checksum(data)
}

const ADLER_MOD: u32 = 65_521;
// Largest n such that 255n(n+1)/2 + (n+1)(MOD-1) fits in u32
const ADLER_NMAX: usize = 5_552;

/// Adler-32, the additive checksum closing a zlib stream
pub fn adler32(data: &[u8]) -> u32 {
    let (mut a, mut b) = (1u32, 0u32);
    for chunk in data.chunks(ADLER_NMAX) {
        for &byte in chunk {
            a += u32::from(byte);
            b += a;
        }
        a %= ADLER_MOD;
        b %= ADLER_MOD;
    }
    (b << 16) | a
}
