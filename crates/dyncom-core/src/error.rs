//! Error types
//!
//! Native failures (negative HRESULT), usage errors (bad descriptors or arguments,
//! detected before any native call) and stale references are kept apart so callers
//! can tell "the object said no" from "the call was never made".

use dyncom_common::{Guid, GuidError, Hresult};
use thiserror::Error;

use crate::descriptor::ParamKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("\"{method}\" expects {expected} arguments, got {actual}")]
    ArityMismatch {
        method: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Argument {index} of \"{method}\" must be {expected:?}")]
    ArgumentKind {
        method: &'static str,
        index: usize,
        expected: ParamKind,
    },

    #[error("In/out index {index} of \"{method}\" does not name a matching argument")]
    InOutIndex { method: &'static str, index: usize },

    #[error("Return kind of \"{method}\" does not belong to the {category} category")]
    CategoryMismatch {
        method: &'static str,
        category: &'static str,
    },

    #[error("Argument to queryInterface must be an interface contract annotated with an interface ID")]
    NotAContract,

    #[error("Cannot default-construct an output value of type \"{0}\"")]
    NotDefaultConstructible(&'static str),

    #[error("No method \"{method}\" on {interfaces}")]
    UnknownMethod { method: String, interfaces: String },

    #[error("Invalid GUID: {0}")]
    InvalidGuid(#[from] GuidError),
}

#[derive(Error, Debug)]
pub enum ComError {
    #[error("Invocation of \"{method}\" failed, hresult={status}")]
    Call {
        method: &'static str,
        status: Hresult,
    },

    #[error("queryInterface for {interface} failed, hresult={status}")]
    QueryInterface {
        interface: &'static str,
        status: Hresult,
    },

    #[error("CoCreateInstance of {clsid} returned {status}")]
    Activation { clsid: Guid, status: Hresult },

    #[error("Usage error: {0}")]
    Usage(#[from] UsageError),

    #[error("\"{method}\" called on a disposed interface (null interface pointer)")]
    Disposed { method: &'static str },

    #[error("COM runtime error: {0}")]
    Runtime(String),
}

impl ComError {
    /// The native status carried by a native failure
    pub fn status(&self) -> Option<Hresult> {
        match self {
            ComError::Call { status, .. }
            | ComError::QueryInterface { status, .. }
            | ComError::Activation { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, ComError::Usage(_))
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self, ComError::Disposed { .. })
    }
}

pub type Result<T> = std::result::Result<T, ComError>;
