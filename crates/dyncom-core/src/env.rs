//! Native collaborators shared by an engine and every proxy it produces

use std::fmt;
use std::sync::Arc;

use crate::gateway::{CallGateway, DirectGateway};
use crate::strings::{system_strings, NativeStrings};

#[derive(Clone)]
pub struct NativeEnv {
    gateway: Arc<dyn CallGateway>,
    strings: Arc<dyn NativeStrings>,
}

impl NativeEnv {
    pub fn new(gateway: Arc<dyn CallGateway>, strings: Arc<dyn NativeStrings>) -> Self {
        Self { gateway, strings }
    }

    /// Direct calls plus the platform string allocator
    pub fn system() -> Self {
        Self::new(Arc::new(DirectGateway), system_strings())
    }

    pub fn gateway(&self) -> &dyn CallGateway {
        self.gateway.as_ref()
    }

    pub fn strings(&self) -> &dyn NativeStrings {
        self.strings.as_ref()
    }
}

impl Default for NativeEnv {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for NativeEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeEnv").finish_non_exhaustive()
    }
}
