//! Dynamic COM dispatch
//!
//! Calls methods of binary COM interfaces without generated stubs. An interface is
//! described once as static data ([`InterfaceDesc`]: IID plus vtable slot, parameter
//! kinds and return kind per method) and every call is assembled at runtime:
//!
//! 1. [`Proxy::call`] resolves the method and classifies its return kind
//! 2. the [`Engine`] marshals arguments (receiver first, output slot last or in/out)
//! 3. the [`CallGateway`] jumps through the vtable slot
//! 4. the HRESULT is checked and the output converted into a [`Value`],
//!    wrapping returned interface pointers in new proxies
//!
//! ## Example
//! ```ignore
//! use dyncom_core::*;
//!
//! interface! {
//!     pub static ICOUNTER: "ICounter" {
//!         iid = Guid::from_u128(0x8f0c2a1e_55d1_4c1b_9a57_1e2f3a4b5c6d);
//!         3 => GetCount() -> I32;
//!         4 => GetName() -> Text;
//!     }
//! }
//!
//! let counter = unknown.query_interface(&ICOUNTER)?;
//! let count = counter.call("GetCount", vec![])?.as_i32();
//! ```
//!
//! ## Threading
//! A [`Proxy`] is neither `Send` nor `Sync`. The thread issuing calls must have
//! initialized COM (see [`ComRuntime`] and [`spawn_com_thread`]); the bridge does
//! not check this itself.

pub mod activation;
pub mod descriptor;
mod engine;
pub mod env;
pub mod error;
pub mod gateway;
mod marshal;
pub mod proxy;
mod result;
pub mod runtime;
pub mod status;
pub mod strings;
pub mod value;

pub use activation::{create_instance, Activator};
pub use descriptor::{
    IUnknown, Interface, InterfaceDesc, MethodDesc, ParamKind, RecordDesc, RetVal,
    ReturnCategory, ReturnKind, IUNKNOWN,
};
pub use engine::Engine;
pub use env::NativeEnv;
pub use error::{ComError, Result, UsageError};
pub use gateway::{CallGateway, DirectGateway, NativeArg};
pub use proxy::Proxy;
pub use runtime::{spawn_com_thread, ComRuntime, ThreadFlagRuntime};
pub use strings::{HeapStrings, NativeStrings};
pub use value::{Arg, Record, Value};

pub use dyncom_common::{Guid, Hresult, IID_IUNKNOWN};

#[cfg(windows)]
pub use activation::OleActivator;
#[cfg(windows)]
pub use runtime::OleRuntime;
#[cfg(windows)]
pub use strings::SysStrings;
