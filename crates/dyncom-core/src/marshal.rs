//! Argument marshaling
//!
//! Turns logical arguments into the native argument list for one call:
//!
//! ```text
//! logical:  (a0, a1, ..., an)
//! trailing: (this, a0', a1', ..., an', &out)
//! in/out k: (this, a0', ..., &out, ..., an')     position k + 1, out seeded from ak
//! ```
//!
//! A [`Frame`] owns everything the native list points into (wide strings, GUID
//! copies, records, the output slot) so it must outlive the call.

use std::ffi::c_void;
use std::ptr;

use dyncom_common::Guid;

use crate::descriptor::{MethodDesc, ReturnCategory, ReturnKind, RetVal};
use crate::error::{ComError, Result, UsageError};
use crate::gateway::NativeArg;
use crate::strings::to_wide;
use crate::value::{Arg, Record};

/// Storage receiving the native return value
#[derive(Debug)]
pub(crate) enum OutSlot {
    None,
    I32(Box<i32>),
    I64(Box<i64>),
    Ptr(Box<*mut c_void>),
    Record(Record),
}

impl OutSlot {
    fn native(&mut self) -> Option<NativeArg> {
        let p = match self {
            OutSlot::None => return None,
            OutSlot::I32(v) => &mut **v as *mut i32 as *mut c_void,
            OutSlot::I64(v) => &mut **v as *mut i64 as *mut c_void,
            OutSlot::Ptr(v) => &mut **v as *mut *mut c_void as *mut c_void,
            OutSlot::Record(r) => r.as_mut_ptr(),
        };
        Some(NativeArg::Ptr(p))
    }
}

#[derive(Debug)]
pub(crate) struct Frame {
    args: Vec<NativeArg>,
    out: OutSlot,
    // Backing storage for pointers in `args`
    _wide: Vec<Vec<u16>>,
    _guids: Vec<Box<Guid>>,
    _records: Vec<Record>,
}

impl Frame {
    pub(crate) fn args(&self) -> &[NativeArg] {
        &self.args
    }

    pub(crate) fn into_out(self) -> OutSlot {
        self.out
    }
}

/// Build the native frame for `method` called on `this`.
/// Nothing native is touched; every failure here is a usage error or a stale
/// interface argument.
pub(crate) fn marshal(
    this: *mut c_void,
    method: &MethodDesc,
    category: ReturnCategory,
    mut args: Vec<Arg<'_>>,
) -> Result<Frame> {
    // The output slot is sized by the category
    if category != method.category() {
        return Err(UsageError::CategoryMismatch {
            method: method.name,
            category: category.name(),
        }
        .into());
    }
    if args.len() != method.params.len() {
        return Err(UsageError::ArityMismatch {
            method: method.name,
            expected: method.params.len(),
            actual: args.len(),
        }
        .into());
    }
    for (index, (arg, kind)) in args.iter().zip(method.params).enumerate() {
        if !arg.fits(*kind) {
            return Err(UsageError::ArgumentKind {
                method: method.name,
                index,
                expected: *kind,
            }
            .into());
        }
    }

    let in_out = match (method.retval, category) {
        (_, ReturnCategory::None) => None,
        (RetVal::Trailing, _) => None,
        (RetVal::InOut(index), _) if index < args.len() => Some(index),
        (RetVal::InOut(index), _) => {
            return Err(UsageError::InOutIndex {
                method: method.name,
                index,
            }
            .into())
        }
    };

    let seed = match in_out {
        Some(index) => args.get_mut(index),
        None => None,
    };
    let out = output_slot(method, category, seed)?;

    let mut frame = Frame {
        args: Vec::with_capacity(args.len() + 2),
        out,
        _wide: Vec::new(),
        _guids: Vec::new(),
        _records: Vec::new(),
    };
    frame.args.push(NativeArg::Ptr(this));

    for (index, arg) in args.into_iter().enumerate() {
        if in_out == Some(index) {
            let slot = frame.out.native().ok_or(UsageError::InOutIndex {
                method: method.name,
                index,
            })?;
            frame.args.push(slot);
            continue;
        }
        let native = match arg {
            Arg::I32(v) => NativeArg::I32(v),
            Arg::I64(v) => NativeArg::I64(v),
            Arg::Ptr(p) => NativeArg::Ptr(p),
            Arg::Text(s) => {
                let wide = to_wide(s);
                let p = wide.as_ptr();
                frame._wide.push(wide);
                NativeArg::Wide(p)
            }
            Arg::Interface(proxy) => {
                let p = proxy.as_raw();
                if p.is_null() {
                    return Err(ComError::Disposed {
                        method: method.name,
                    });
                }
                NativeArg::Ptr(p)
            }
            Arg::Guid(g) => {
                let mut copy = Box::new(*g);
                let p = &mut *copy as *mut Guid as *mut c_void;
                frame._guids.push(copy);
                NativeArg::Ptr(p)
            }
            Arg::Record(mut r) => {
                let p = r.as_mut_ptr();
                frame._records.push(r);
                NativeArg::Ptr(p)
            }
            Arg::Contract(_) => {
                return Err(UsageError::ArgumentKind {
                    method: method.name,
                    index,
                    expected: method.params[index],
                }
                .into())
            }
        };
        frame.args.push(native);
    }

    if in_out.is_none() {
        if let Some(slot) = frame.out.native() {
            frame.args.push(slot);
        }
    }

    Ok(frame)
}

/// Allocate the output slot, seeding it from the in/out argument when there is one
fn output_slot(
    method: &MethodDesc,
    category: ReturnCategory,
    in_out: Option<&mut Arg<'_>>,
) -> Result<OutSlot> {
    let mismatch = || -> ComError {
        match in_out_index(method) {
            Some(index) => UsageError::InOutIndex {
                method: method.name,
                index,
            }
            .into(),
            None => UsageError::CategoryMismatch {
                method: method.name,
                category: category.name(),
            }
            .into(),
        }
    };

    let slot = match category {
        ReturnCategory::None => OutSlot::None,
        ReturnCategory::Integer => match in_out {
            None => OutSlot::I32(Box::new(0)),
            Some(Arg::I32(v)) => OutSlot::I32(Box::new(*v)),
            Some(_) => return Err(mismatch()),
        },
        ReturnCategory::WideInteger => match in_out {
            None => OutSlot::I64(Box::new(0)),
            Some(Arg::I64(v)) => OutSlot::I64(Box::new(*v)),
            Some(_) => return Err(mismatch()),
        },
        ReturnCategory::ObjectOrOther => match (method.ret, in_out) {
            (ReturnKind::Interface(_) | ReturnKind::Text | ReturnKind::Ptr, None) => {
                OutSlot::Ptr(Box::new(ptr::null_mut()))
            }
            // A seeded interface reference passes to the callee, so proxies cannot seed
            (ReturnKind::Interface(_) | ReturnKind::Text | ReturnKind::Ptr, Some(Arg::Ptr(p))) => {
                OutSlot::Ptr(Box::new(*p))
            }
            (ReturnKind::Record(desc), None) => OutSlot::Record(Record::new(desc)?),
            (ReturnKind::Record(desc), Some(arg)) => match arg {
                Arg::Record(r) if r.desc() == desc => {
                    // Reuse the caller's storage as the output buffer
                    let placeholder = Record::new(desc)?;
                    OutSlot::Record(std::mem::replace(r, placeholder))
                }
                _ => return Err(mismatch()),
            },
            _ => return Err(mismatch()),
        },
    };
    Ok(slot)
}

fn in_out_index(method: &MethodDesc) -> Option<usize> {
    match method.retval {
        RetVal::InOut(index) => Some(index),
        RetVal::Trailing => None,
    }
}
