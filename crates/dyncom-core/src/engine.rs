//! Invocation engine
//!
//! Owns one native interface pointer and executes calls against it. The pointer is
//! released exactly once: by [`Engine::dispose`] or when the engine is dropped.

use std::cell::Cell;
use std::ffi::c_void;
use std::ptr;

use dyncom_common::{Guid, Hresult};
use tracing::{debug, trace, warn};

use crate::descriptor::{InterfaceDesc, MethodDesc, ReturnCategory};
use crate::env::NativeEnv;
use crate::error::{ComError, Result, UsageError};
use crate::gateway::{vtable_slot, NativeArg};
use crate::marshal::marshal;
use crate::result::{check, interpret};
use crate::status;
use crate::value::{Arg, Value};

/// IUnknown vtable layout
const SLOT_QUERY_INTERFACE: usize = 0;
const SLOT_ADD_REF: usize = 1;
const SLOT_RELEASE: usize = 2;

pub struct Engine {
    ptr: Cell<*mut c_void>,
    env: NativeEnv,
}

impl Engine {
    /// Take ownership of one reference on `ptr`
    ///
    /// # Safety
    /// `ptr` must be null or a live COM interface pointer whose reference the caller
    /// hands over.
    pub unsafe fn new(ptr: *mut c_void, env: NativeEnv) -> Self {
        Self {
            ptr: Cell::new(ptr),
            env,
        }
    }

    pub fn as_raw(&self) -> *mut c_void {
        self.ptr.get()
    }

    pub fn is_disposed(&self) -> bool {
        self.ptr.get().is_null()
    }

    pub fn env(&self) -> &NativeEnv {
        &self.env
    }

    fn live(&self, method: &'static str) -> Result<*mut c_void> {
        let p = self.ptr.get();
        if p.is_null() {
            return Err(ComError::Disposed { method });
        }
        Ok(p)
    }

    /// Execute one logical method call
    pub fn invoke(
        &self,
        method: &MethodDesc,
        category: ReturnCategory,
        args: Vec<Arg<'_>>,
    ) -> Result<Value> {
        let this = self.live(method.name)?;
        let frame = marshal(this, method, category, args)?;

        let status = unsafe {
            let func = vtable_slot(this, method.slot);
            Hresult(self.env.gateway().call(func, frame.args()))
        };
        status::record(status);
        debug!(
            "{} (slot {}, {}) -> {}",
            method.name,
            method.slot,
            category.name(),
            status
        );
        check(method.name, status)?;

        Ok(interpret(method, frame.into_out(), &self.env))
    }

    /// QueryInterface (slot 0) for `contract`; the returned pointer carries its own
    /// reference
    pub fn query_interface(&self, contract: &'static InterfaceDesc) -> Result<*mut c_void> {
        if !contract.is_contract() {
            return Err(UsageError::NotAContract.into());
        }
        let this = self.live("QueryInterface")?;
        let iid: Guid = contract.iid;
        let mut out: *mut c_void = ptr::null_mut();

        let status = unsafe {
            let func = vtable_slot(this, SLOT_QUERY_INTERFACE);
            Hresult(self.env.gateway().call(
                func,
                &[
                    NativeArg::Ptr(this),
                    NativeArg::Ptr(&iid as *const Guid as *mut c_void),
                    NativeArg::Ptr(&mut out as *mut *mut c_void as *mut c_void),
                ],
            ))
        };
        status::record(status);
        debug!("QueryInterface({} {}) -> {}", contract.name, iid, status);

        if status.is_failure() {
            warn!("queryInterface for {} failed, hresult={}", contract.name, status);
            return Err(ComError::QueryInterface {
                interface: contract.name,
                status,
            });
        }
        if out.is_null() {
            return Err(ComError::QueryInterface {
                interface: contract.name,
                status: Hresult::E_POINTER,
            });
        }
        Ok(out)
    }

    /// AddRef (slot 1); returns the running count, no status interpretation
    pub fn add_ref(&self) -> Result<u32> {
        let this = self.live("AddRef")?;
        let count = unsafe { self.raw_call(this, SLOT_ADD_REF) };
        trace!("AddRef({:p}) -> {}", this, count);
        Ok(count)
    }

    /// Release (slot 2); returns the running count
    pub fn release(&self) -> Result<u32> {
        let this = self.live("Release")?;
        let count = unsafe { self.raw_call(this, SLOT_RELEASE) };
        trace!("Release({:p}) -> {}", this, count);
        Ok(count)
    }

    unsafe fn raw_call(&self, this: *mut c_void, slot: usize) -> u32 {
        let func = vtable_slot(this, slot);
        self.env.gateway().call_raw(func, &[NativeArg::Ptr(this)])
    }

    /// Release the native reference once and clear the pointer. Returns whether a
    /// release happened; later calls are no-ops.
    pub fn dispose(&self) -> bool {
        if self.ptr.get().is_null() {
            return false;
        }
        if let Err(err) = self.release() {
            warn!("Release during dispose failed: {}", err);
        }
        self.ptr.set(ptr::null_mut());
        true
    }

    /// Give up the pointer without releasing it
    pub(crate) fn detach(&self) -> *mut c_void {
        self.ptr.replace(ptr::null_mut())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.dispose();
    }
}
