//! Proxy factory and dispatch point
//!
//! A [`Proxy`] is one engine plus the interface contracts it exposes. Method calls
//! are resolved by name against those contracts; a handful of names are handled by
//! the proxy itself instead of being forwarded:
//!
//! | name | handled as |
//! |---|---|
//! | `queryInterface` | [`Proxy::query_interface`], argument must be [`Arg::Contract`] |
//! | `dispose` | [`Proxy::dispose`] |
//! | `toString` | the `Display` rendering, as [`Value::Text`] |
//! | `addRef` / `release` | [`Proxy::add_ref`] / [`Proxy::release`], count as [`Value::I32`] |

use std::ffi::c_void;
use std::fmt;

use tracing::debug;

use crate::descriptor::{Interface, InterfaceDesc, MethodDesc};
use crate::engine::Engine;
use crate::env::NativeEnv;
use crate::error::{Result, UsageError};
use crate::value::{Arg, Value};

pub struct Proxy {
    engine: Engine,
    contracts: Vec<&'static InterfaceDesc>,
}

impl Proxy {
    /// Wrap a native interface pointer, taking over one reference on it
    ///
    /// # Safety
    /// `ptr` must be a live COM interface pointer implementing every contract in
    /// `contracts`, and the caller must own the reference being handed over.
    pub unsafe fn wrap_native(
        ptr: *mut c_void,
        contracts: &[&'static InterfaceDesc],
        env: NativeEnv,
    ) -> Proxy {
        Proxy {
            engine: Engine::new(ptr, env),
            contracts: contracts.to_vec(),
        }
    }

    /// A second proxy on the same native pointer, exposing the same contracts
    ///
    /// No AddRef is issued: the copy is a view, yet it still releases once when
    /// disposed or dropped, exactly like the source. Disposing only one of the two
    /// leaves the object alive through the other.
    ///
    /// # Safety
    /// Both proxies will release. Unless the caller issues a matching
    /// [`Proxy::add_ref`] (or detaches one side with [`Proxy::into_raw`]), the object
    /// is released one time too many.
    pub unsafe fn copy(source: &Proxy) -> Proxy {
        Proxy::wrap_native(source.as_raw(), &source.contracts, source.env().clone())
    }

    pub fn as_raw(&self) -> *mut c_void {
        self.engine.as_raw()
    }

    /// Hand the pointer (and its reference) back to the caller without releasing
    pub fn into_raw(self) -> *mut c_void {
        self.engine.detach()
    }

    pub fn contracts(&self) -> &[&'static InterfaceDesc] {
        &self.contracts
    }

    pub fn implements(&self, contract: &InterfaceDesc) -> bool {
        self.contracts.iter().any(|c| c.iid == contract.iid)
    }

    pub fn is_disposed(&self) -> bool {
        self.engine.is_disposed()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn env(&self) -> &NativeEnv {
        self.engine.env()
    }

    /// Dynamic dispatch point
    pub fn call(&self, name: &str, args: Vec<Arg<'_>>) -> Result<Value> {
        match name {
            "queryInterface" | "QueryInterface" => match args.as_slice() {
                [Arg::Contract(contract)] => {
                    Ok(Value::Interface(self.query_interface(*contract)?))
                }
                _ => Err(UsageError::NotAContract.into()),
            },
            "dispose" => {
                self.dispose();
                Ok(Value::Void)
            }
            "toString" => Ok(Value::Text(self.to_string())),
            "addRef" | "AddRef" => Ok(Value::I32(self.add_ref()? as i32)),
            "release" | "Release" => Ok(Value::I32(self.release()? as i32)),
            _ => {
                let method = self.find_method(name).ok_or_else(|| UsageError::UnknownMethod {
                    method: name.to_string(),
                    interfaces: self.contract_names(),
                })?;
                self.invoke(method, args)
            }
        }
    }

    /// Call a method descriptor directly, classified by its return kind
    pub fn invoke(&self, method: &MethodDesc, args: Vec<Arg<'_>>) -> Result<Value> {
        self.engine.invoke(method, method.category(), args)
    }

    fn find_method(&self, name: &str) -> Option<&'static MethodDesc> {
        self.contracts
            .iter()
            .find_map(|contract| contract.methods.iter().find(|m| m.name == name))
    }

    /// New proxy exposing exactly `contract`, holding its own reference
    pub fn query_interface(&self, contract: &'static InterfaceDesc) -> Result<Proxy> {
        let ptr = self.engine.query_interface(contract)?;
        debug!("{} -> {} at {:p}", self, contract.name, ptr);
        Ok(unsafe { Proxy::wrap_native(ptr, &[contract], self.env().clone()) })
    }

    pub fn query<I: Interface>(&self) -> Result<Proxy> {
        self.query_interface(I::descriptor())
    }

    pub fn add_ref(&self) -> Result<u32> {
        self.engine.add_ref()
    }

    pub fn release(&self) -> Result<u32> {
        self.engine.release()
    }

    /// Release the native reference; safe to call repeatedly
    pub fn dispose(&self) {
        self.engine.dispose();
    }

    fn contract_names(&self) -> String {
        self.contracts
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// `native@<pointer> [IFoo, IBar]`
impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "native@{:p} [{}]", self.as_raw(), self.contract_names())
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("ptr", &self.as_raw())
            .field("contracts", &self.contract_names())
            .finish()
    }
}
