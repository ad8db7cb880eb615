//! Activation Tests
//!
//! - Service moniker parsing and activation
//! - Class factory aggregation rules
//! - Server lock counting from many threads
//! - Instance teardown releasing every native handle

mod common;

use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;

use com_bridge::activation::{ClassFactory, MonikerKeyword, ServiceMoniker};
use com_bridge::proxy::HandleKind;
use com_bridge::trace::{ActivationFailure, TraceRecordCodec};
use com_bridge::{hresult, iid, BridgeConfig, BridgeError, Guid, InterfaceId, NativeHandle};

use common::*;

/// Test: moniker keywords round-trip into activation
#[test]
fn test_moniker_activation() {
    init_logging();
    let (bridge, _) = echo_bridge(BridgeConfig::default());
    let contract = InterfaceId(Guid::generate());
    let display = format!(
        "SERVICE4: Address = {ECHO_ADDRESS} , Binding=netTcpBinding, contract = {{{contract}}}, spnIdentity=\"host/a,b\""
    );

    let moniker: ServiceMoniker = display.parse().unwrap();
    assert_eq!(moniker.len(), 4);
    assert_eq!(moniker.address(), Some(ECHO_ADDRESS));
    assert_eq!(moniker.get(MonikerKeyword::SpnIdentity), Some("host/a,b"));
    assert_eq!(moniker.contract_id(), Some(contract));

    let instance = bridge.activate(&display).unwrap();
    assert_eq!(instance.proxy().interface_id(), contract);
    assert!(instance.proxy().dispatch_handle().is_some());
}

/// Test: malformed monikers carry MK_E_SYNTAX and never reach the factory
#[test]
fn test_moniker_syntax_errors() {
    let (bridge, builder) = echo_bridge(BridgeConfig::default());
    let inputs = [
        "service:address",
        "service:address=a,address=b",
        "service:endpoint=a",
        "service:address=\"unterminated",
        "service:address=\"a\"b",
        "service:=a",
        "service:address=a,",
    ];
    for input in inputs {
        let err = bridge.activate(input).unwrap_err();
        assert!(matches!(err, BridgeError::MonikerSyntax(_)), "{input}: {err}");
        assert_eq!(err.hresult(), hresult::MK_E_SYNTAX);
    }
    assert!(bridge.handles().is_empty());
    assert_eq!(builder.builds.load(std::sync::atomic::Ordering::SeqCst), 0);
}

/// Test: a moniker naming another endpoint is refused before activation
#[test]
fn test_moniker_address_must_match_endpoint() {
    init_logging();
    let (bridge, builder) = echo_bridge(BridgeConfig::default());

    let err = bridge
        .activate("service:address=http://some-other-host/elsewhere,contract={00000000-0000-0000-C000-000000000046}")
        .unwrap_err();
    assert!(matches!(err, BridgeError::InvalidArgument(_)));
    assert_eq!(err.hresult(), hresult::E_INVALIDARG);
    assert!(bridge.handles().is_empty());
    assert_eq!(bridge.type_cache().synthesis_count(), 0);

    // The configured endpoint still activates over the same factory
    let instance = bridge.activate(&echo_moniker(&iid::IUNKNOWN)).unwrap();
    assert_eq!(instance.proxy().interface_id(), iid::IUNKNOWN);
    assert_eq!(builder.builds.load(std::sync::atomic::Ordering::SeqCst), 1);
}

/// Test: aggregation only for IUnknown and only when enabled
#[test]
fn test_aggregation() {
    init_logging();
    let outer = NativeHandle(0x4000);

    let (bridge, _) = echo_bridge(BridgeConfig::default());
    let err = bridge
        .class_factory()
        .create_instance(Some(outer), &iid::IUNKNOWN)
        .unwrap_err();
    assert_eq!(err.hresult(), hresult::CLASS_E_NOAGGREGATION);

    let config = BridgeConfig {
        allow_aggregation: true,
        ..BridgeConfig::default()
    };
    let (bridge, _) = echo_bridge(config);
    let factory = bridge.class_factory();

    let err = factory.create_instance(Some(outer), &iid::IDISPATCH).unwrap_err();
    assert!(matches!(err, BridgeError::ClassActivation { iid, .. } if iid == iid::IDISPATCH));

    let instance = factory.create_instance(Some(outer), &iid::IUNKNOWN).unwrap();
    let entry = bridge.handles().get(instance.handle()).unwrap();
    assert!(matches!(entry.kind, HandleKind::Instance { outer: Some(h), .. } if h == outer));
    assert_eq!(entry.context, bridge.context());
}

/// Test: lock/unlock pairs from many tasks leave the count at zero
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lock_server() {
    const NUM_TASKS: usize = 16;
    const ROUNDS: usize = 100;

    let (bridge, _) = echo_bridge(BridgeConfig::default());
    let bridge = Arc::new(bridge);

    let tasks = (0..NUM_TASKS).map(|_| {
        let bridge = bridge.clone();
        tokio::task::spawn_blocking(move || {
            for _ in 0..ROUNDS {
                bridge.class_factory().lock_server(true);
            }
            for _ in 0..ROUNDS {
                bridge.class_factory().lock_server(false);
            }
        })
    });
    for joined in join_all(tasks).await {
        joined.unwrap();
    }
    assert_eq!(bridge.server_lock().count(), 0);

    // Extra unlocks saturate
    bridge.class_factory().lock_server(false);
    assert_eq!(bridge.server_lock().count(), 0);
    bridge.class_factory().lock_server(true);
    assert!(bridge.server_lock().is_locked());
}

/// Test: activations from many tasks each get distinct handles; teardown
/// releases all of them
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_activation_teardown() {
    const NUM_TASKS: usize = 12;

    let (bridge, _) = echo_bridge(BridgeConfig::default());
    let bridge = Arc::new(bridge);
    let contract = InterfaceId(Guid::generate());

    let tasks = (0..NUM_TASKS).map(|_| {
        let bridge = bridge.clone();
        tokio::task::spawn_blocking(move || bridge.activate(&echo_moniker(&contract)))
    });
    let instances: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(bridge.handles().len(), NUM_TASKS * 3);
    assert_eq!(bridge.type_cache().synthesis_count(), 1);
    let first = instances[0].proxy().descriptor().id();
    assert!(instances.iter().all(|i| i.proxy().descriptor().id() == first));

    let mut handles: Vec<NativeHandle> = instances.iter().map(|i| i.handle()).collect();
    handles.sort_by_key(|h| h.raw());
    handles.dedup();
    assert_eq!(handles.len(), NUM_TASKS);

    for instance in &instances {
        let reply = instance.proxy().invoke(bridge.context(), 1, Bytes::from_static(b"x")).unwrap();
        assert_eq!(&reply[4..], b"x");
    }

    drop(instances);
    assert!(bridge.handles().is_empty());
}

/// Test: failure records render with their error and status
#[test]
fn test_activation_failure_record() {
    let err = BridgeError::ClassActivation {
        iid: iid::IDISPATCH,
        hresult: hresult::CLASS_E_NOAGGREGATION,
    };
    let record = ActivationFailure::new(iid::IDISPATCH, true, &err);
    let text = TraceRecordCodec::to_string(Some(&record));

    assert!(text.starts_with("<ActivationFailure"));
    assert!(text.contains("<aggregated>true</aggregated>"));
    assert!(text.contains(&format!("<hresult>{}</hresult>", hresult::CLASS_E_NOAGGREGATION.code())));

    let nil = TraceRecordCodec::to_string::<ActivationFailure>(None);
    assert!(nil.contains("i:nil=\"true\""));
}
