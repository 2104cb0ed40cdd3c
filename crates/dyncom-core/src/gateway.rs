//! Native call gateway
//!
//! The only place that actually jumps into native code. Arguments arrive as
//! [`NativeArg`]s, each mapped to its libffi type, and the call interface is built
//! per call, so the argument count is only limited by what the callee declares.
//!
//! COM methods use the `system` convention: stdcall on 32-bit x86 Windows, the
//! platform default everywhere else. Floating point arguments are not supported.

use std::ffi::c_void;

use libffi::middle::{arg, Arg as FfiArg, Cif, CodePtr, Type};

/// One argument in native form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeArg {
    Ptr(*mut c_void),
    I32(i32),
    I64(i64),
    /// NUL-terminated UTF-16 string
    Wide(*const u16),
}

impl NativeArg {
    fn ffi_type(&self) -> Type {
        match self {
            NativeArg::Ptr(_) | NativeArg::Wide(_) => Type::pointer(),
            NativeArg::I32(_) => Type::i32(),
            NativeArg::I64(_) => Type::i64(),
        }
    }

    fn ffi_arg(&self) -> FfiArg {
        match self {
            NativeArg::Ptr(p) => arg(p),
            NativeArg::Wide(p) => arg(p),
            NativeArg::I32(v) => arg(v),
            NativeArg::I64(v) => arg(v),
        }
    }
}

/// Read vtable slot `slot` of a COM object
///
/// # Safety
/// `this` must point to a live COM object whose vtable has more than `slot` entries.
pub unsafe fn vtable_slot(this: *mut c_void, slot: usize) -> *const c_void {
    // object -> vtable -> [fn ptr; n]
    let vtable = *(this as *const *const *const c_void);
    *vtable.add(slot)
}

/// Performs native calls
pub trait CallGateway: Send + Sync {
    /// Call a method returning an HRESULT
    ///
    /// # Safety
    /// `func` must be a function with the `system` calling convention whose
    /// parameters match `args`.
    unsafe fn call(&self, func: *const c_void, args: &[NativeArg]) -> i32;

    /// Call a method returning a raw 32-bit count (`AddRef`/`Release`)
    ///
    /// # Safety
    /// Same as [`CallGateway::call`].
    unsafe fn call_raw(&self, func: *const c_void, args: &[NativeArg]) -> u32;
}

/// Gateway calling through libffi
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectGateway;

fn system_cif(args: &[NativeArg], ret: Type) -> Cif {
    #[allow(unused_mut)]
    let mut cif = Cif::new(args.iter().map(NativeArg::ffi_type), ret);
    #[cfg(all(target_arch = "x86", windows))]
    cif.set_abi(libffi::raw::ffi_abi_FFI_STDCALL);
    cif
}

/// Integer results come back widened to a full `ffi_arg`, so the call always reads
/// a pointer-sized slot and narrows afterwards
unsafe fn call_word(func: *const c_void, args: &[NativeArg], ret: Type) -> isize {
    let cif = system_cif(args, ret);
    let values: Vec<FfiArg> = args.iter().map(NativeArg::ffi_arg).collect();
    cif.call::<isize>(CodePtr::from_ptr(func), &values)
}

impl CallGateway for DirectGateway {
    unsafe fn call(&self, func: *const c_void, args: &[NativeArg]) -> i32 {
        call_word(func, args, Type::i32()) as i32
    }

    unsafe fn call_raw(&self, func: *const c_void, args: &[NativeArg]) -> u32 {
        call_word(func, args, Type::u32()) as u32
    }
}
