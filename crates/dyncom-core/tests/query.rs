//! QueryInterface and activation against the mock object

mod common;

use std::ffi::c_void;
use std::sync::Arc;

use common::{counter, env_with, CountingStrings, MockObject, ICOUNTER, IID_ICOUNTER, IMISSING};
use dyncom_core::activation::CLSCTX_INPROC_SERVER;
use dyncom_core::{
    create_instance, spawn_com_thread, status, Activator, Arg, ComError, Guid, Hresult,
    IUnknown, InterfaceDesc, ThreadFlagRuntime, UsageError, Value, IID_IUNKNOWN,
};

#[test]
fn query_for_own_interface_yields_usable_proxy() {
    let mock = MockObject::new();
    let env = env_with(Arc::new(CountingStrings::default()));
    let unknown = counter(&mock, &env);

    let queried = unknown.query_interface(&ICOUNTER).unwrap();
    assert_eq!(queried.as_raw(), mock.as_ptr());
    assert_eq!(mock.refs(), 2);
    assert_eq!(queried.call("GetCount", vec![]).unwrap().as_i32(), Some(42));

    drop(queried);
    assert_eq!(mock.refs(), 1);
}

#[test]
fn queried_proxy_exposes_exactly_the_requested_contract() {
    let mock = MockObject::new();
    let env = env_with(Arc::new(CountingStrings::default()));
    let proxy = counter(&mock, &env);

    let unknown = proxy.query::<IUnknown>().unwrap();
    assert_eq!(unknown.contracts().len(), 1);
    assert_eq!(unknown.contracts()[0].iid, IID_IUNKNOWN);
    assert!(!unknown.implements(&ICOUNTER));

    let err = unknown.call("GetCount", vec![]).unwrap_err();
    assert!(err.is_usage());
}

#[test]
fn unsupported_interface_fails_without_a_proxy() {
    let mock = MockObject::new();
    let env = env_with(Arc::new(CountingStrings::default()));
    let proxy = counter(&mock, &env);

    let err = proxy.query_interface(&IMISSING).unwrap_err();
    match &err {
        ComError::QueryInterface { interface, status } => {
            assert_eq!(*interface, "IMissing");
            assert_eq!(*status, Hresult::E_NOINTERFACE);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.to_string().contains("80004002"));
    assert_eq!(status::last(), Hresult::E_NOINTERFACE);
    assert_eq!(mock.refs(), 1);
}

#[test]
fn query_pseudo_method_needs_a_contract() {
    let mock = MockObject::new();
    let env = env_with(Arc::new(CountingStrings::default()));
    let proxy = counter(&mock, &env);

    let value = proxy
        .call("queryInterface", vec![Arg::Contract(&ICOUNTER)])
        .unwrap();
    let queried = value.into_proxy().unwrap();
    assert!(queried.implements(&ICOUNTER));

    let err = proxy.call("queryInterface", vec![Arg::I32(3)]).unwrap_err();
    assert!(matches!(err, ComError::Usage(UsageError::NotAContract)));
}

static ANONYMOUS: InterfaceDesc = InterfaceDesc {
    name: "Anonymous",
    iid: Guid::ZERO,
    methods: &[],
};

#[test]
fn descriptor_without_iid_is_not_a_contract() {
    let mock = MockObject::new();
    let env = env_with(Arc::new(CountingStrings::default()));
    let proxy = counter(&mock, &env);

    let err = proxy.query_interface(&ANONYMOUS).unwrap_err();
    assert!(matches!(err, ComError::Usage(UsageError::NotAContract)));
    assert_eq!(mock.refs(), 1);
}

/// Hands out fresh mock objects for ICounter or IUnknown
struct MockActivator;

impl Activator for MockActivator {
    fn create(
        &self,
        _clsid: &Guid,
        iid: &Guid,
        _context: u32,
    ) -> Result<(*mut c_void, Hresult), Hresult> {
        // IUnknown activations report S_FALSE so the recorded status can be told apart
        if *iid == IID_ICOUNTER {
            Ok((Box::leak(MockObject::new()).as_ptr(), Hresult::S_OK))
        } else if *iid == IID_IUNKNOWN {
            Ok((Box::leak(MockObject::new()).as_ptr(), Hresult::S_FALSE))
        } else {
            Err(Hresult::E_NOINTERFACE)
        }
    }
}

const CLSID_MOCK: &str = "{6B29FC40-CA47-1067-B31D-00DD010662DA}";

#[test]
fn activation_on_a_com_thread() {
    let handle = spawn_com_thread(Arc::new(ThreadFlagRuntime), || {
        let env = env_with(Arc::new(CountingStrings::default()));
        let proxy = create_instance(&MockActivator, &env, &ICOUNTER, CLSID_MOCK, CLSCTX_INPROC_SERVER)?;
        assert_eq!(status::last(), Hresult::S_OK);
        match proxy.call("GetCount", vec![])? {
            Value::I32(count) => Ok(count),
            other => panic!("unexpected value {other:?}"),
        }
    })
    .unwrap();
    assert_eq!(handle.join().unwrap().unwrap(), 42);
}

#[test]
fn activation_failure_reports_clsid() {
    let env = env_with(Arc::new(CountingStrings::default()));
    let err = create_instance(&MockActivator, &env, &IMISSING, CLSID_MOCK, CLSCTX_INPROC_SERVER)
        .unwrap_err();
    match err {
        ComError::Activation { clsid, status } => {
            assert_eq!(clsid, Guid::parse(CLSID_MOCK).unwrap());
            assert_eq!(status, Hresult::E_NOINTERFACE);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn activation_records_the_success_status() {
    let env = env_with(Arc::new(CountingStrings::default()));
    let unknown = create_instance(
        &MockActivator,
        &env,
        &dyncom_core::IUNKNOWN,
        CLSID_MOCK,
        CLSCTX_INPROC_SERVER,
    )
    .unwrap();
    assert_eq!(status::last(), Hresult::S_FALSE);

    let counter = create_instance(&MockActivator, &env, &ICOUNTER, CLSID_MOCK, CLSCTX_INPROC_SERVER)
        .unwrap();
    assert_eq!(status::last(), Hresult::S_OK);
    assert!(!unknown.is_disposed());
    assert!(!counter.is_disposed());
}
