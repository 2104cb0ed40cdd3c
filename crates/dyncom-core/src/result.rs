//! Result interpretation

use dyncom_common::Hresult;
use tracing::warn;

use crate::descriptor::{MethodDesc, ReturnKind};
use crate::env::NativeEnv;
use crate::error::{ComError, Result};
use crate::marshal::OutSlot;
use crate::proxy::Proxy;
use crate::strings::from_wide_ptr;
use crate::value::Value;

/// Negative status is a failure carrying the method name and the status
pub(crate) fn check(method: &'static str, status: Hresult) -> Result<()> {
    if status.is_failure() {
        warn!("Invocation of \"{}\" failed, hresult={}", method, status);
        return Err(ComError::Call { method, status });
    }
    Ok(())
}

/// Convert the output slot of a successful call into a logical value
pub(crate) fn interpret(method: &MethodDesc, out: OutSlot, env: &NativeEnv) -> Value {
    match out {
        OutSlot::None => Value::Void,
        OutSlot::I32(v) => Value::I32(*v),
        OutSlot::I64(v) => Value::I64(*v),
        OutSlot::Record(r) => Value::Record(r),
        OutSlot::Ptr(p) => {
            let p = *p;
            match method.ret {
                ReturnKind::Interface(desc) => {
                    if p.is_null() {
                        Value::Null
                    } else {
                        // The callee AddRef'd the returned pointer; the proxy owns that reference
                        Value::Interface(unsafe { Proxy::wrap_native(p, &[desc], env.clone()) })
                    }
                }
                ReturnKind::Text => {
                    if p.is_null() {
                        return Value::Text(String::new());
                    }
                    let text = unsafe { from_wide_ptr(p as *const u16) };
                    unsafe { env.strings().free(p as *mut u16) };
                    Value::Text(text)
                }
                _ => Value::Ptr(p),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ParamKind, IUNKNOWN};
    use crate::strings::{heap_alloc_string, NativeStrings};
    use std::ffi::c_void;
    use std::ptr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl NativeStrings for Counting {
        unsafe fn free(&self, s: *mut u16) {
            self.0.fetch_add(1, Ordering::SeqCst);
            crate::HeapStrings.free(s);
        }
    }

    fn env_with(strings: Arc<Counting>) -> NativeEnv {
        NativeEnv::new(Arc::new(crate::DirectGateway), strings)
    }

    #[test]
    fn test_check() {
        assert!(check("Ok", Hresult::S_FALSE).is_ok());
        let err = check("Fail", Hresult::E_FAIL).unwrap_err();
        assert_eq!(err.status(), Some(Hresult::E_FAIL));
    }

    #[test]
    fn test_text_is_copied_and_freed_once() {
        let strings = Arc::new(Counting::default());
        let env = env_with(strings.clone());
        let method = MethodDesc::new("GetName", 3, &[], ReturnKind::Text);
        let raw = heap_alloc_string("desktop");
        let value = interpret(&method, OutSlot::Ptr(Box::new(raw as *mut c_void)), &env);
        assert_eq!(value.as_text(), Some("desktop"));
        assert_eq!(strings.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_null_text_is_empty() {
        let strings = Arc::new(Counting::default());
        let env = env_with(strings.clone());
        let method = MethodDesc::new("GetName", 3, &[], ReturnKind::Text);
        let value = interpret(&method, OutSlot::Ptr(Box::new(ptr::null_mut())), &env);
        assert_eq!(value.as_text(), Some(""));
        assert_eq!(strings.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_null_interface_is_null_value() {
        let env = env_with(Arc::new(Counting::default()));
        let method = MethodDesc::new("GetChild", 3, &[ParamKind::I32], ReturnKind::Interface(&IUNKNOWN));
        let value = interpret(&method, OutSlot::Ptr(Box::new(ptr::null_mut())), &env);
        assert!(matches!(value, Value::Null));
    }

    #[test]
    fn test_integer_slots() {
        let env = env_with(Arc::new(Counting::default()));
        let method = MethodDesc::new("Get", 3, &[], ReturnKind::I64);
        let value = interpret(&method, OutSlot::I64(Box::new(-5)), &env);
        assert_eq!(value.as_i64(), Some(-5));
    }
}
