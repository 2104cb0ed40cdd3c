//! Logical argument and result values

use std::ffi::c_void;
use std::fmt;

use dyncom_common::Guid;

use crate::descriptor::{InterfaceDesc, ParamKind, RecordDesc};
use crate::error::UsageError;
use crate::proxy::Proxy;

/// One logical argument of a call
pub enum Arg<'a> {
    I32(i32),
    I64(i64),
    Ptr(*mut c_void),
    Text(&'a str),
    Interface(&'a Proxy),
    Guid(&'a Guid),
    Record(Record),
    /// Interface contract, only accepted by the `queryInterface` pseudo-method
    Contract(&'static InterfaceDesc),
}

impl Arg<'_> {
    /// Whether this argument can be passed where `kind` is declared.
    /// A raw pointer is accepted for interface parameters (e.g. null).
    pub fn fits(&self, kind: ParamKind) -> bool {
        matches!(
            (self, kind),
            (Arg::I32(_), ParamKind::I32)
                | (Arg::I64(_), ParamKind::I64)
                | (Arg::Ptr(_), ParamKind::Ptr)
                | (Arg::Ptr(_), ParamKind::Interface)
                | (Arg::Text(_), ParamKind::Text)
                | (Arg::Interface(_), ParamKind::Interface)
                | (Arg::Guid(_), ParamKind::Guid)
                | (Arg::Record(_), ParamKind::Record)
        )
    }
}

impl fmt::Debug for Arg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::I32(v) => write!(f, "I32({v})"),
            Arg::I64(v) => write!(f, "I64({v})"),
            Arg::Ptr(p) => write!(f, "Ptr({p:p})"),
            Arg::Text(s) => write!(f, "Text({s:?})"),
            Arg::Interface(p) => write!(f, "Interface({p})"),
            Arg::Guid(g) => write!(f, "Guid({g})"),
            Arg::Record(r) => write!(f, "Record({})", r.desc().name),
            Arg::Contract(desc) => write!(f, "Contract({})", desc.name),
        }
    }
}

/// Result of a call
#[derive(Debug)]
pub enum Value {
    Void,
    I32(i32),
    I64(i64),
    Ptr(*mut c_void),
    Text(String),
    Interface(Proxy),
    Record(Record),
    /// Interface out-parameter left null by a successful call
    Null,
}

impl Value {
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_proxy(self) -> Option<Proxy> {
        match self {
            Value::Interface(p) => Some(p),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }
}

/// Default-constructed composite value: zeroed, 8-byte aligned storage
#[derive(Clone, PartialEq, Eq)]
pub struct Record {
    desc: &'static RecordDesc,
    words: Vec<u64>,
}

impl Record {
    pub fn new(desc: &'static RecordDesc) -> Result<Self, UsageError> {
        if !desc.is_default_constructible() {
            return Err(UsageError::NotDefaultConstructible(desc.name));
        }
        Ok(Self {
            desc,
            words: vec![0; desc.size.div_ceil(8)],
        })
    }

    pub fn desc(&self) -> &'static RecordDesc {
        self.desc
    }

    pub fn as_bytes(&self) -> &[u8] {
        // words holds at least desc.size bytes
        unsafe { std::slice::from_raw_parts(self.words.as_ptr() as *const u8, self.desc.size) }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe {
            std::slice::from_raw_parts_mut(self.words.as_mut_ptr() as *mut u8, self.desc.size)
        }
    }

    /// Pointer handed to native code; stable for the life of the record
    pub fn as_mut_ptr(&mut self) -> *mut c_void {
        self.words.as_mut_ptr() as *mut c_void
    }

    pub fn read_i32(&self, offset: usize) -> Option<i32> {
        let bytes = self.as_bytes().get(offset..offset.checked_add(4)?)?;
        Some(i32::from_ne_bytes(bytes.try_into().ok()?))
    }

    pub fn read_i64(&self, offset: usize) -> Option<i64> {
        let bytes = self.as_bytes().get(offset..offset.checked_add(8)?)?;
        Some(i64::from_ne_bytes(bytes.try_into().ok()?))
    }

    /// Returns false when the field does not fit
    pub fn write_i32(&mut self, offset: usize, value: i32) -> bool {
        let Some(end) = offset.checked_add(4) else {
            return false;
        };
        match self.as_bytes_mut().get_mut(offset..end) {
            Some(slot) => {
                slot.copy_from_slice(&value.to_ne_bytes());
                true
            }
            None => false,
        }
    }

    pub fn write_i64(&mut self, offset: usize, value: i64) -> bool {
        let Some(end) = offset.checked_add(8) else {
            return false;
        };
        match self.as_bytes_mut().get_mut(offset..end) {
            Some(slot) => {
                slot.copy_from_slice(&value.to_ne_bytes());
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("type", &self.desc.name)
            .field("bytes", &self.as_bytes())
            .finish()
    }
}
