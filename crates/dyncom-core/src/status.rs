//! Last native status, per thread
//!
//! Updated after every native HRESULT call made on the current thread (method
//! invocations, QueryInterface, activation), success or failure. Calls made on other
//! threads never affect it. Errors carry their own status as well, so this is only a
//! convenience for callers that want the success code (e.g. `S_FALSE`).

use std::cell::Cell;

use dyncom_common::Hresult;

thread_local! {
    static LAST_STATUS: Cell<Hresult> = const { Cell::new(Hresult::S_OK) };
}

/// Status of the most recent native call on this thread
pub fn last() -> Hresult {
    LAST_STATUS.with(|s| s.get())
}

pub(crate) fn record(status: Hresult) {
    LAST_STATUS.with(|s| s.set(status));
}
