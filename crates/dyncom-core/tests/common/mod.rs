//! A COM object implemented in Rust, with a real `extern "system"` vtable
//!
//! Release never frees: the test owns the object and inspects its counters after
//! the proxies are gone. Children handed out by `GetChild` are leaked.

#![allow(dead_code)]

use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use dyncom_core::strings::heap_alloc_string;
use dyncom_core::{
    interface, DirectGateway, Guid, HeapStrings, NativeEnv, NativeStrings, Proxy, RecordDesc,
    IID_IUNKNOWN,
};

pub const IID_ICOUNTER: Guid = Guid::from_u128(0x5a1e_c0de_0000_4000_8000_00000000c0de);
pub const IID_IMISSING: Guid = Guid::from_u128(0x0bad_0bad_0000_4000_8000_000000000bad);

const S_OK: i32 = 0;
const E_FAIL: i32 = 0x8000_4005_u32 as i32;
const E_NOINTERFACE: i32 = 0x8000_4002_u32 as i32;
const E_POINTER: i32 = 0x8000_4003_u32 as i32;

pub static RECT: RecordDesc = RecordDesc::new("RECT", 16);

interface! {
    pub static ICOUNTER: "ICounter" {
        iid = IID_ICOUNTER;
        3 => GetCount() -> I32;
        4 => Fail() -> Void;
        5 => GetName() -> Text;
        6 => Add(I32, I32) -> I32;
        7 => GetTotal() -> I64;
        8 => Scale(I32, I32) -> I32 [inout 1];
        9 => GetChild() -> Interface(&ICOUNTER);
        10 => GetBounds() -> Record(&RECT);
        11 => Measure(Text) -> I32;
        12 => SameObject(Interface) -> I32;
        13 => Grow(Record) -> Record(&RECT) [inout 0];
        14 => GetNullChild() -> Interface(&ICOUNTER);
        15 => Keep(Interface) -> Interface(&ICOUNTER) [inout 0];
        16 => Offset(I64) -> I64 [inout 0];
    }
}

interface! {
    pub static IMISSING: "IMissing" {
        iid = IID_IMISSING;
        3 => Nothing() -> Void;
    }
}

#[repr(C)]
pub struct MockObject {
    vtable: *const MockVtbl,
    pub refs: AtomicU32,
    pub destroyed: AtomicBool,
    /// Non-IUnknown methods entered
    pub calls: AtomicU32,
}

impl MockObject {
    /// Starts with one reference, owned by whoever wraps the pointer
    pub fn new() -> Box<Self> {
        Box::new(Self {
            vtable: &VTABLE,
            refs: AtomicU32::new(1),
            destroyed: AtomicBool::new(false),
            calls: AtomicU32::new(0),
        })
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self as *const Self as *mut c_void
    }

    pub fn refs(&self) -> u32 {
        self.refs.load(Ordering::SeqCst)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[repr(C)]
struct MockVtbl {
    query_interface: unsafe extern "system" fn(*mut MockObject, *const Guid, *mut *mut c_void) -> i32,
    add_ref: unsafe extern "system" fn(*mut MockObject) -> u32,
    release: unsafe extern "system" fn(*mut MockObject) -> u32,
    get_count: unsafe extern "system" fn(*mut MockObject, *mut i32) -> i32,
    fail: unsafe extern "system" fn(*mut MockObject) -> i32,
    get_name: unsafe extern "system" fn(*mut MockObject, *mut *mut u16) -> i32,
    add: unsafe extern "system" fn(*mut MockObject, i32, i32, *mut i32) -> i32,
    get_total: unsafe extern "system" fn(*mut MockObject, *mut i64) -> i32,
    scale: unsafe extern "system" fn(*mut MockObject, i32, *mut i32) -> i32,
    get_child: unsafe extern "system" fn(*mut MockObject, *mut *mut c_void) -> i32,
    get_bounds: unsafe extern "system" fn(*mut MockObject, *mut [i32; 4]) -> i32,
    measure: unsafe extern "system" fn(*mut MockObject, *const u16, *mut i32) -> i32,
    same_object: unsafe extern "system" fn(*mut MockObject, *mut c_void, *mut i32) -> i32,
    grow: unsafe extern "system" fn(*mut MockObject, *mut [i32; 4]) -> i32,
    get_null_child: unsafe extern "system" fn(*mut MockObject, *mut *mut c_void) -> i32,
    keep: unsafe extern "system" fn(*mut MockObject, *mut *mut c_void) -> i32,
    offset: unsafe extern "system" fn(*mut MockObject, *mut i64) -> i32,
}

static VTABLE: MockVtbl = MockVtbl {
    query_interface,
    add_ref,
    release,
    get_count,
    fail,
    get_name,
    add,
    get_total,
    scale,
    get_child,
    get_bounds,
    measure,
    same_object,
    grow,
    get_null_child,
    keep,
    offset,
};

unsafe extern "system" fn query_interface(
    this: *mut MockObject,
    riid: *const Guid,
    out: *mut *mut c_void,
) -> i32 {
    if riid.is_null() || out.is_null() {
        return E_POINTER;
    }
    if *riid == IID_IUNKNOWN || *riid == IID_ICOUNTER {
        add_ref(this);
        *out = this as *mut c_void;
        S_OK
    } else {
        *out = ptr::null_mut();
        E_NOINTERFACE
    }
}

unsafe extern "system" fn add_ref(this: *mut MockObject) -> u32 {
    (*this).refs.fetch_add(1, Ordering::SeqCst) + 1
}

unsafe extern "system" fn release(this: *mut MockObject) -> u32 {
    // Atomic subtraction wraps, so an over-release shows up as a huge count
    let left = (*this).refs.fetch_sub(1, Ordering::SeqCst).wrapping_sub(1);
    if left == 0 {
        (*this).destroyed.store(true, Ordering::SeqCst);
    }
    left
}

unsafe fn enter(this: *mut MockObject) {
    (*this).calls.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "system" fn get_count(this: *mut MockObject, out: *mut i32) -> i32 {
    enter(this);
    *out = 42;
    S_OK
}

unsafe extern "system" fn fail(this: *mut MockObject) -> i32 {
    enter(this);
    E_FAIL
}

unsafe extern "system" fn get_name(this: *mut MockObject, out: *mut *mut u16) -> i32 {
    enter(this);
    *out = heap_alloc_string("mock counter");
    S_OK
}

unsafe extern "system" fn add(this: *mut MockObject, a: i32, b: i32, out: *mut i32) -> i32 {
    enter(this);
    *out = a + b;
    S_OK
}

unsafe extern "system" fn get_total(this: *mut MockObject, out: *mut i64) -> i32 {
    enter(this);
    *out = 1 << 40;
    S_OK
}

unsafe extern "system" fn scale(this: *mut MockObject, factor: i32, value: *mut i32) -> i32 {
    enter(this);
    *value *= factor;
    S_OK
}

unsafe extern "system" fn get_child(this: *mut MockObject, out: *mut *mut c_void) -> i32 {
    enter(this);
    *out = Box::leak(MockObject::new()).as_ptr();
    S_OK
}

unsafe extern "system" fn get_bounds(this: *mut MockObject, out: *mut [i32; 4]) -> i32 {
    enter(this);
    *out = [1, 2, 3, 4];
    S_OK
}

unsafe extern "system" fn measure(this: *mut MockObject, text: *const u16, out: *mut i32) -> i32 {
    enter(this);
    if text.is_null() {
        return E_POINTER;
    }
    let mut len = 0;
    while *text.add(len) != 0 {
        len += 1;
    }
    *out = len as i32;
    S_OK
}

unsafe extern "system" fn same_object(
    this: *mut MockObject,
    other: *mut c_void,
    out: *mut i32,
) -> i32 {
    enter(this);
    *out = (other == this as *mut c_void) as i32;
    S_OK
}

unsafe extern "system" fn grow(this: *mut MockObject, rect: *mut [i32; 4]) -> i32 {
    enter(this);
    for field in (*rect).iter_mut() {
        *field += 1;
    }
    S_OK
}

unsafe extern "system" fn get_null_child(this: *mut MockObject, out: *mut *mut c_void) -> i32 {
    enter(this);
    *out = ptr::null_mut();
    S_OK
}

/// Leaves the in/out interface untouched, so its reference comes straight back
unsafe extern "system" fn keep(this: *mut MockObject, slot: *mut *mut c_void) -> i32 {
    enter(this);
    if slot.is_null() {
        return E_POINTER;
    }
    S_OK
}

unsafe extern "system" fn offset(this: *mut MockObject, value: *mut i64) -> i32 {
    enter(this);
    *value += 1 << 33;
    S_OK
}

/// Heap string allocator that counts frees
#[derive(Default)]
pub struct CountingStrings {
    frees: AtomicUsize,
}

impl CountingStrings {
    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }
}

impl NativeStrings for CountingStrings {
    unsafe fn free(&self, s: *mut u16) {
        self.frees.fetch_add(1, Ordering::SeqCst);
        HeapStrings.free(s);
    }
}

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

pub fn env_with(strings: Arc<CountingStrings>) -> NativeEnv {
    NativeEnv::new(Arc::new(DirectGateway), strings)
}

/// Proxy exposing ICounter on `mock`, taking over its initial reference
pub fn counter(mock: &MockObject, env: &NativeEnv) -> Proxy {
    init_logging();
    unsafe { Proxy::wrap_native(mock.as_ptr(), &[&ICOUNTER], env.clone()) }
}
