//! Interface and class identifiers
//!
//! A GUID is laid out exactly as the native `GUID` structure so a `&Guid` can be
//! handed to `QueryInterface` or `CoCreateInstance` as a `REFIID`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuidError {
    #[error("Invalid GUID length: {0:?}")]
    InvalidLength(String),

    #[error("Invalid GUID group layout: {0:?}")]
    InvalidLayout(String),

    #[error("Invalid hex digit in GUID: {0:?}")]
    InvalidHex(String),
}

/// 128-bit globally unique identifier (GUID/IID/CLSID)
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

/// IID of IUnknown: {00000000-0000-0000-C000-000000000046}
pub const IID_IUNKNOWN: Guid = Guid::new(
    0x0000_0000,
    0x0000,
    0x0000,
    [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46],
);

impl Guid {
    /// The nil GUID
    pub const ZERO: Guid = Guid::new(0, 0, 0, [0; 8]);

    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// Build from the 128-bit value as written, e.g.
    /// `Guid::from_u128(0x00000000_0000_0000_c000_000000000046)`
    pub const fn from_u128(value: u128) -> Self {
        Self::new(
            (value >> 96) as u32,
            (value >> 80) as u16,
            (value >> 64) as u16,
            (value as u64).to_be_bytes(),
        )
    }

    /// Parse the registry form `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}`.
    /// The surrounding braces are optional.
    pub fn parse(text: &str) -> Result<Self, GuidError> {
        let trimmed = text.trim();
        let inner = match (trimmed.starts_with('{'), trimmed.ends_with('}')) {
            (true, true) if trimmed.len() >= 2 => &trimmed[1..trimmed.len() - 1],
            (false, false) => trimmed,
            _ => return Err(GuidError::InvalidLayout(text.to_string())),
        };
        if inner.len() != 36 {
            return Err(GuidError::InvalidLength(text.to_string()));
        }

        let groups: Vec<&str> = inner.split('-').collect();
        let lengths = [8, 4, 4, 4, 12];
        if groups.len() != lengths.len()
            || groups.iter().zip(lengths).any(|(g, len)| g.len() != len)
        {
            return Err(GuidError::InvalidLayout(text.to_string()));
        }

        let hex_err = || GuidError::InvalidHex(text.to_string());
        // from_str_radix tolerates a leading sign
        if !groups.iter().all(|g| g.bytes().all(|b| b.is_ascii_hexdigit())) {
            return Err(hex_err());
        }
        let data1 = u32::from_str_radix(groups[0], 16).map_err(|_| hex_err())?;
        let data2 = u16::from_str_radix(groups[1], 16).map_err(|_| hex_err())?;
        let data3 = u16::from_str_radix(groups[2], 16).map_err(|_| hex_err())?;

        let tail = format!("{}{}", groups[3], groups[4]);
        let mut data4 = [0u8; 8];
        for (i, byte) in data4.iter_mut().enumerate() {
            let pair = tail.get(i * 2..i * 2 + 2).ok_or_else(hex_err)?;
            *byte = u8::from_str_radix(pair, 16).map_err(|_| hex_err())?;
        }

        Ok(Self::new(data1, data2, data3, data4))
    }

    pub fn is_nil(&self) -> bool {
        *self == Self::ZERO
    }

    /// Raw 16-byte little-endian form, as stored in memory
    pub fn to_bytes_le(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[0..4].copy_from_slice(&self.data1.to_le_bytes());
        out[4..6].copy_from_slice(&self.data2.to_le_bytes());
        out[6..8].copy_from_slice(&self.data3.to_le_bytes());
        out[8..16].copy_from_slice(&self.data4);
        out
    }

    pub fn from_bytes_le(bytes: [u8; 16]) -> Self {
        let mut data4 = [0u8; 8];
        data4.copy_from_slice(&bytes[8..16]);
        Self::new(
            u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            u16::from_le_bytes([bytes[4], bytes[5]]),
            u16::from_le_bytes([bytes[6], bytes[7]]),
            data4,
        )
    }
}

impl FromStr for Guid {
    type Err = GuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Guid::parse(s)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{{{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}}}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
