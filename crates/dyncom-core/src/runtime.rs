//! COM runtime initialization per thread

use std::cell::Cell;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::error::Result;

/// Per-thread COM runtime state
///
/// Initialization is tracked per thread: `is_initialized` answers for the calling
/// thread only.
pub trait ComRuntime: Send + Sync {
    fn initialize(&self) -> Result<()>;
    fn is_initialized(&self) -> bool;
    fn uninitialize(&self);
}

thread_local! {
    static FLAGGED: Cell<bool> = const { Cell::new(false) };
}

/// Portable runtime that only records initialization. Used off Windows and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadFlagRuntime;

impl ComRuntime for ThreadFlagRuntime {
    fn initialize(&self) -> Result<()> {
        FLAGGED.with(|f| f.set(true));
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        FLAGGED.with(|f| f.get())
    }

    fn uninitialize(&self) {
        FLAGGED.with(|f| f.set(false));
    }
}

/// Run `body` on a fresh thread with COM initialized for its whole duration
///
/// The runtime is uninitialized after `body` returns, whether or not it succeeded.
/// A failed initialization is returned without running `body`.
pub fn spawn_com_thread<R, T, F>(runtime: Arc<R>, body: F) -> io::Result<JoinHandle<Result<T>>>
where
    R: ComRuntime + ?Sized + 'static,
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    thread::Builder::new()
        .name("com-worker".to_string())
        .spawn(move || {
            if let Err(err) = runtime.initialize() {
                warn!("COM initialization failed: {}", err);
                return Err(err);
            }
            info!("COM initialized on {:?}", thread::current().id());
            let result = body();
            runtime.uninitialize();
            result
        })
}

#[cfg(windows)]
pub use ole::OleRuntime;

#[cfg(windows)]
mod ole {
    use std::cell::Cell;

    use dyncom_common::{ApartmentModel, Hresult};
    use tracing::{info, trace};
    use windows::Win32::System::Com::{
        CoInitializeEx, CoUninitialize, COINIT, COINIT_APARTMENTTHREADED, COINIT_MULTITHREADED,
    };

    use super::ComRuntime;
    use crate::error::{ComError, Result};

    thread_local! {
        static ENTERED: Cell<u32> = const { Cell::new(0) };
    }

    /// `CoInitializeEx` / `CoUninitialize` with a fixed apartment model
    #[derive(Debug, Default, Clone, Copy)]
    pub struct OleRuntime {
        apartment: ApartmentModel,
    }

    impl OleRuntime {
        pub fn new(apartment: ApartmentModel) -> Self {
            Self { apartment }
        }

        pub fn apartment(&self) -> ApartmentModel {
            self.apartment
        }

        fn coinit(&self) -> COINIT {
            match self.apartment {
                ApartmentModel::Sta => COINIT_APARTMENTTHREADED,
                ApartmentModel::Mta => COINIT_MULTITHREADED,
            }
        }
    }

    impl ComRuntime for OleRuntime {
        fn initialize(&self) -> Result<()> {
            let status = Hresult(unsafe { CoInitializeEx(None, self.coinit()) }.0);
            // S_FALSE: already initialized on this thread, still needs a matching uninitialize
            if status.is_failure() {
                return Err(ComError::Runtime(format!(
                    "CoInitializeEx({:?}) failed, hresult={}",
                    self.apartment, status
                )));
            }
            ENTERED.with(|n| n.set(n.get() + 1));
            info!("CoInitializeEx({:?}) -> {}", self.apartment, status);
            Ok(())
        }

        fn is_initialized(&self) -> bool {
            ENTERED.with(|n| n.get() > 0)
        }

        fn uninitialize(&self) {
            let entered = ENTERED.with(|n| n.get());
            if entered == 0 {
                return;
            }
            unsafe { CoUninitialize() };
            ENTERED.with(|n| n.set(entered - 1));
            trace!("CoUninitialize, {} left", entered - 1);
        }
    }
}
