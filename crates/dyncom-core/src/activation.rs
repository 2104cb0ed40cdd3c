//! Object activation
//!
//! Creating a new object by CLSID and wrapping the resulting pointer in a proxy.

use std::ffi::c_void;

use dyncom_common::{Guid, Hresult, IID_IUNKNOWN};
use tracing::{info, warn};

use crate::descriptor::InterfaceDesc;
use crate::env::NativeEnv;
use crate::error::{ComError, Result, UsageError};
use crate::proxy::Proxy;
use crate::status;

pub const CLSCTX_INPROC_SERVER: u32 = 0x1;
pub const CLSCTX_INPROC_HANDLER: u32 = 0x2;
pub const CLSCTX_LOCAL_SERVER: u32 = 0x4;
pub const CLSCTX_INPROC_SERVER16: u32 = 0x8;
pub const CLSCTX_REMOTE_SERVER: u32 = 0x10;
/// Every 32-bit context; 16-bit servers are not included
pub const CLSCTX_ALL: u32 =
    CLSCTX_INPROC_SERVER | CLSCTX_INPROC_HANDLER | CLSCTX_LOCAL_SERVER | CLSCTX_REMOTE_SERVER;

/// Creates objects by class id
pub trait Activator {
    /// Returns an interface pointer for `iid` holding one reference together with the
    /// success status, or the failing status
    fn create(
        &self,
        clsid: &Guid,
        iid: &Guid,
        context: u32,
    ) -> std::result::Result<(*mut c_void, Hresult), Hresult>;
}

/// Activate `clsid` and expose it as `contract`
///
/// A contract with a nil IID is activated as `IUnknown`.
pub fn create_instance(
    activator: &dyn Activator,
    env: &NativeEnv,
    contract: &'static InterfaceDesc,
    clsid: &str,
    context: u32,
) -> Result<Proxy> {
    let clsid = Guid::parse(clsid).map_err(UsageError::from)?;
    let iid = if contract.iid.is_nil() {
        IID_IUNKNOWN
    } else {
        contract.iid
    };

    match activator.create(&clsid, &iid, context) {
        Ok((ptr, status)) if !ptr.is_null() => {
            status::record(status);
            info!("activated {} as {} at {:p}", clsid, contract.name, ptr);
            Ok(unsafe { Proxy::wrap_native(ptr, &[contract], env.clone()) })
        }
        Ok(_) => {
            status::record(Hresult::E_POINTER);
            warn!("activation of {} returned no object", clsid);
            Err(ComError::Activation {
                clsid,
                status: Hresult::E_POINTER,
            })
        }
        Err(status) => {
            status::record(status);
            warn!("activation of {} failed, hresult={}", clsid, status);
            Err(ComError::Activation { clsid, status })
        }
    }
}

#[cfg(windows)]
pub use ole::OleActivator;

#[cfg(windows)]
mod ole {
    use std::ffi::c_void;
    use std::ptr;

    use dyncom_common::{Guid, Hresult};
    use windows::core::{Interface, IUnknown, GUID};
    use windows::Win32::System::Com::{CoCreateInstance, CLSCTX};

    use super::Activator;

    fn to_guid(g: &Guid) -> GUID {
        GUID::from_values(g.data1, g.data2, g.data3, g.data4)
    }

    /// `CoCreateInstance`; the calling thread must have COM initialized
    #[derive(Debug, Default, Clone, Copy)]
    pub struct OleActivator;

    impl Activator for OleActivator {
        fn create(
            &self,
            clsid: &Guid,
            iid: &Guid,
            context: u32,
        ) -> std::result::Result<(*mut c_void, Hresult), Hresult> {
            let clsid = to_guid(clsid);
            let iid = to_guid(iid);
            let unknown: IUnknown = unsafe { CoCreateInstance(&clsid, None, CLSCTX(context)) }
                .map_err(|e| Hresult(e.code().0))?;

            let mut out: *mut c_void = ptr::null_mut();
            let status = Hresult(unsafe { unknown.query(&iid, &mut out) }.0);
            if status.is_failure() {
                return Err(status);
            }
            Ok((out, status))
        }
    }
}
