//! HRESULT status codes
//!
//! Negative values are failures. Everything else (including `S_FALSE`) is success.

use std::fmt;

#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hresult(pub i32);

impl Hresult {
    pub const S_OK: Hresult = Hresult(0);
    pub const S_FALSE: Hresult = Hresult(1);
    pub const E_NOTIMPL: Hresult = Hresult(0x80004001_u32 as i32);
    pub const E_NOINTERFACE: Hresult = Hresult(0x80004002_u32 as i32);
    pub const E_POINTER: Hresult = Hresult(0x80004003_u32 as i32);
    pub const E_FAIL: Hresult = Hresult(0x80004005_u32 as i32);
    pub const E_UNEXPECTED: Hresult = Hresult(0x8000FFFF_u32 as i32);
    pub const E_OUTOFMEMORY: Hresult = Hresult(0x8007000E_u32 as i32);
    pub const E_INVALIDARG: Hresult = Hresult(0x80070057_u32 as i32);
    pub const CLASS_E_NOAGGREGATION: Hresult = Hresult(0x80040110_u32 as i32);
    pub const REGDB_E_CLASSNOTREG: Hresult = Hresult(0x80040154_u32 as i32);
    pub const RPC_E_CHANGED_MODE: Hresult = Hresult(0x80010106_u32 as i32);

    pub const fn is_failure(self) -> bool {
        self.0 < 0
    }

    pub const fn is_success(self) -> bool {
        self.0 >= 0
    }

    /// Facility bits (16..=28)
    pub const fn facility(self) -> u32 {
        ((self.0 as u32) >> 16) & 0x1FFF
    }

    /// Low 16 bits
    pub const fn code(self) -> u32 {
        (self.0 as u32) & 0xFFFF
    }

    /// Short symbolic name for the well-known codes
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::S_OK => "S_OK",
            Self::S_FALSE => "S_FALSE",
            Self::E_NOTIMPL => "E_NOTIMPL",
            Self::E_NOINTERFACE => "E_NOINTERFACE",
            Self::E_POINTER => "E_POINTER",
            Self::E_FAIL => "E_FAIL",
            Self::E_UNEXPECTED => "E_UNEXPECTED",
            Self::E_OUTOFMEMORY => "E_OUTOFMEMORY",
            Self::E_INVALIDARG => "E_INVALIDARG",
            Self::CLASS_E_NOAGGREGATION => "CLASS_E_NOAGGREGATION",
            Self::REGDB_E_CLASSNOTREG => "REGDB_E_CLASSNOTREG",
            Self::RPC_E_CHANGED_MODE => "RPC_E_CHANGED_MODE",
            _ => return None,
        };
        Some(name)
    }
}

impl From<i32> for Hresult {
    fn from(value: i32) -> Self {
        Hresult(value)
    }
}

impl From<Hresult> for i32 {
    fn from(value: Hresult) -> Self {
        value.0
    }
}

/// Always the 8-digit hex form, e.g. `0x80004005`
impl fmt::Display for Hresult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0 as u32)
    }
}

impl fmt::Debug for Hresult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "Hresult({} {})", self, name),
            None => write!(f, "Hresult({})", self),
        }
    }
}
