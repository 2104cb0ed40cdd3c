//! Interface descriptors
//!
//! Static tables standing in for per-interface stubs. Each [`InterfaceDesc`] carries
//! the IID and, for every method, the vtable slot, the parameter kinds as the host
//! passes them, the logical return kind and where the native return value travels.
//!
//! Descriptors are plain `static` items, usually declared with [`interface!`]:
//!
//! ```ignore
//! interface! {
//!     pub static ISHAPE: "IShape" {
//!         iid = IID_ISHAPE;
//!         3 => GetArea() -> I64;
//!         4 => Resize(I32, I32) -> I32 [inout 1];
//!         5 => GetBounds() -> Record(&RECT);
//!         6 => Clone() -> Interface(&ISHAPE);
//!     }
//! }
//! ```

use std::fmt;

use dyncom_common::{Guid, IID_IUNKNOWN};

/// Declare a static [`InterfaceDesc`].
///
/// Each method line is `slot => Name(ParamKind, ...) -> ReturnKind [inout N];`
/// where the trailing `[inout N]` is optional and names the logical argument that
/// doubles as the output slot.
#[macro_export]
macro_rules! interface {
    (@retval) => { $crate::RetVal::Trailing };
    (@retval $idx:literal) => { $crate::RetVal::InOut($idx) };
    (
        $(#[$attr:meta])*
        $vis:vis static $ident:ident : $name:literal {
            iid = $iid:expr;
            $(
                $slot:literal => $method:ident ( $($param:ident),* $(,)? )
                    -> $ret:ident $( ( $($retarg:tt)* ) )? $( [inout $idx:literal] )? ;
            )*
        }
    ) => {
        $(#[$attr])*
        $vis static $ident: $crate::InterfaceDesc = $crate::InterfaceDesc {
            name: $name,
            iid: $iid,
            methods: &[
                $(
                    $crate::MethodDesc {
                        name: stringify!($method),
                        slot: $slot,
                        params: &[$($crate::ParamKind::$param),*],
                        ret: $crate::ReturnKind::$ret $( ( $($retarg)* ) )?,
                        retval: $crate::interface!(@retval $($idx)?),
                    },
                )*
            ],
        };
    };
}

/// Kind of one logical argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    I32,
    I64,
    /// Raw pointer passed through unchanged
    Ptr,
    /// Host text, passed as a NUL-terminated UTF-16 pointer
    Text,
    /// Another proxy, passed as its native interface pointer
    Interface,
    /// Passed as a pointer to a 16-byte GUID (`REFIID`/`REFCLSID`)
    Guid,
    /// Composite value, passed by pointer
    Record,
}

/// Layout of a composite output value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordDesc {
    pub name: &'static str,
    /// Size in bytes; zero marks an opaque type that cannot be default-constructed
    pub size: usize,
}

impl RecordDesc {
    pub const fn new(name: &'static str, size: usize) -> Self {
        Self { name, size }
    }

    pub const fn is_default_constructible(&self) -> bool {
        self.size != 0
    }
}

/// Declared logical return type of a method
#[derive(Clone, Copy)]
pub enum ReturnKind {
    Void,
    I32,
    I64,
    Ptr,
    /// BSTR out-parameter, copied into a `String` and freed
    Text,
    /// Interface out-parameter, wrapped in a new proxy
    Interface(&'static InterfaceDesc),
    Record(&'static RecordDesc),
}

/// Dispatch category derived from the return kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCategory {
    None,
    Integer,
    WideInteger,
    ObjectOrOther,
}

impl ReturnCategory {
    pub const fn name(self) -> &'static str {
        match self {
            ReturnCategory::None => "none",
            ReturnCategory::Integer => "integer",
            ReturnCategory::WideInteger => "wide-integer",
            ReturnCategory::ObjectOrOther => "object",
        }
    }
}

impl ReturnKind {
    pub const fn category(&self) -> ReturnCategory {
        match self {
            ReturnKind::Void => ReturnCategory::None,
            ReturnKind::I32 => ReturnCategory::Integer,
            ReturnKind::I64 => ReturnCategory::WideInteger,
            ReturnKind::Ptr
            | ReturnKind::Text
            | ReturnKind::Interface(_)
            | ReturnKind::Record(_) => ReturnCategory::ObjectOrOther,
        }
    }
}

impl fmt::Debug for ReturnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnKind::Void => f.write_str("Void"),
            ReturnKind::I32 => f.write_str("I32"),
            ReturnKind::I64 => f.write_str("I64"),
            ReturnKind::Ptr => f.write_str("Ptr"),
            ReturnKind::Text => f.write_str("Text"),
            // Name only: interfaces routinely return themselves
            ReturnKind::Interface(desc) => write!(f, "Interface({})", desc.name),
            ReturnKind::Record(desc) => write!(f, "Record({})", desc.name),
        }
    }
}

/// Where the native return value travels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetVal {
    /// Implicit out-parameter appended after the logical arguments
    #[default]
    Trailing,
    /// Logical argument `n` supplies the input and receives the result.
    /// Its native position is `n + 1`, after the receiver.
    InOut(usize),
}

#[derive(Debug, Clone, Copy)]
pub struct MethodDesc {
    pub name: &'static str,
    pub slot: usize,
    pub params: &'static [ParamKind],
    pub ret: ReturnKind,
    pub retval: RetVal,
}

impl MethodDesc {
    pub const fn new(
        name: &'static str,
        slot: usize,
        params: &'static [ParamKind],
        ret: ReturnKind,
    ) -> Self {
        Self {
            name,
            slot,
            params,
            ret,
            retval: RetVal::Trailing,
        }
    }

    pub const fn in_out(mut self, index: usize) -> Self {
        self.retval = RetVal::InOut(index);
        self
    }

    pub const fn category(&self) -> ReturnCategory {
        self.ret.category()
    }
}

/// One logical interface contract
pub struct InterfaceDesc {
    pub name: &'static str,
    pub iid: Guid,
    pub methods: &'static [MethodDesc],
}

impl InterfaceDesc {
    /// Exact-name lookup; the first declaration wins
    pub fn method(&self, name: &str) -> Option<&MethodDesc> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Only descriptors carrying a real IID can be requested through QueryInterface
    pub fn is_contract(&self) -> bool {
        !self.iid.is_nil()
    }
}

impl fmt::Debug for InterfaceDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceDesc")
            .field("name", &self.name)
            .field("iid", &self.iid)
            .field("methods", &self.methods.len())
            .finish()
    }
}

interface! {
    /// IUnknown: only QueryInterface/AddRef/Release, handled by the proxy itself
    pub static IUNKNOWN: "IUnknown" {
        iid = IID_IUNKNOWN;
    }
}

/// Binds a host marker type to its descriptor, for [`Proxy::query`](crate::Proxy::query)
pub trait Interface {
    fn descriptor() -> &'static InterfaceDesc;
}

pub struct IUnknown;

impl Interface for IUnknown {
    fn descriptor() -> &'static InterfaceDesc {
        &IUNKNOWN
    }
}
