//! Proxy Tests
//!
//! - Outer then dispatch construction over the shared service channel
//! - Disposal exactly once, including under contention
//! - Cross-context calls gated by the security perimeter
//! - Endpoint behaviors validated when the channel factory freezes

mod common;

use std::any::Any;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Barrier};

use bytes::Bytes;
use futures::future::join_all;

use com_bridge::activation::ClassFactory;
use com_bridge::channel::{Behaviors, ChannelBuilderSettings, EndpointBehavior, ProvideChannelBuilderSettings};
use com_bridge::proxy::{HandleKind, ProxyCapabilities};
use com_bridge::security::{ContextId, SecurityPerimeter};
use com_bridge::typecache::{DescriptorOrigin, InterfaceKind};
use com_bridge::{hresult, iid, BridgeConfig, BridgeError, ComBridge, Guid, InterfaceId, Result};

use common::*;

/// Test: a synthesized contract gets both proxies and a working channel
#[test]
fn test_synthesized_contract_round_trip() {
    init_logging();
    let (bridge, builder) = echo_bridge(BridgeConfig::default());
    let contract = InterfaceId(Guid::generate());

    let instance = bridge.activate(&echo_moniker(&contract)).unwrap();
    let proxy = instance.proxy();
    assert_eq!(proxy.interface_id(), contract);
    assert_eq!(proxy.descriptor().origin(), DescriptorOrigin::Synthesized);
    assert_eq!(proxy.descriptor().kind(), InterfaceKind::Dual);

    let dispatch = proxy.dispatch_handle().unwrap();
    let entry = bridge.handles().get(dispatch).unwrap();
    assert_eq!(entry.parent, Some(proxy.handle()));
    assert!(matches!(entry.kind, HandleKind::DispatchProxy { outer, .. } if outer == proxy.handle()));

    let reply = proxy.invoke(bridge.context(), 2, Bytes::from_static(b"abc")).unwrap();
    assert_eq!(&reply[..], &[2, 0, 0, 0, b'c', b'b', b'a']);
    assert_eq!(builder.target.calls.load(Ordering::SeqCst), 1);
}

/// Test: every proxy shares one channel factory and one service channel
#[test]
fn test_service_channel_shared() {
    let (bridge, builder) = echo_bridge(BridgeConfig::default());

    let a = bridge.activate(&echo_moniker(&iid::IDISPATCH)).unwrap();
    let b = bridge.activate(&echo_moniker(&InterfaceId(Guid::generate()))).unwrap();
    a.proxy().invoke(bridge.context(), 1, Bytes::new()).unwrap();
    b.proxy().invoke(bridge.context(), 1, Bytes::new()).unwrap();

    assert_eq!(builder.builds.load(Ordering::SeqCst), 1);
    assert_eq!(builder.target.calls.load(Ordering::SeqCst), 2);

    // The factory is frozen once a channel is open
    let err = bridge.settings().channel_factory_read_write().err().unwrap();
    assert!(matches!(err, BridgeError::ChannelFactoryFrozen));
}

/// Test: unresolvable interface fails with no handles left behind
#[test]
fn test_unresolvable_interface() {
    init_logging();
    let (bridge, builder) = echo_bridge(BridgeConfig::new(true));
    let contract = InterfaceId(Guid::generate());

    let err = bridge.class_factory().create_instance(None, &contract).unwrap_err();
    assert!(matches!(err, BridgeError::ProxyCreation { hresult: hr, .. } if hr == hresult::E_NOINTERFACE));
    assert!(bridge.handles().is_empty());
    // The dispatch side was never reached, so no channel was built
    assert_eq!(builder.builds.load(Ordering::SeqCst), 0);
}

/// Test: disposal runs once even when raced
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispose_exactly_once() {
    init_logging();

    const NUM_DISPOSERS: usize = 16;

    let (bridge, _) = echo_bridge(BridgeConfig::default());
    let instance = Arc::new(bridge.activate(&echo_moniker(&iid::IDISPATCH)).unwrap());
    assert_eq!(bridge.handles().len(), 3);

    let barrier = Arc::new(Barrier::new(NUM_DISPOSERS));
    let tasks = (0..NUM_DISPOSERS).map(|_| {
        let instance = instance.clone();
        let barrier = barrier.clone();
        tokio::task::spawn_blocking(move || {
            barrier.wait();
            instance.proxy().dispose()
        })
    });
    let disposed = join_all(tasks)
        .await
        .into_iter()
        .filter(|joined| *joined.as_ref().unwrap())
        .count();

    assert_eq!(disposed, 1);
    assert!(instance.proxy().is_disposed());
    // Only the instance handle remains
    assert_eq!(bridge.handles().len(), 1);

    let err = instance.proxy().invoke(bridge.context(), 1, Bytes::new()).unwrap_err();
    assert!(matches!(err, BridgeError::ProxyDisposed(_)));

    drop(instance);
    assert!(bridge.handles().is_empty());
}

/// Test: many callers share one proxy
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_invoke() {
    const NUM_CALLERS: usize = 8;
    const CALLS_PER_CALLER: usize = 50;

    let (bridge, builder) = echo_bridge(BridgeConfig::default());
    let bridge = Arc::new(bridge);
    let instance = Arc::new(bridge.activate(&echo_moniker(&iid::IDISPATCH)).unwrap());
    let stats = Arc::new(ConcurrentStats::new());

    let tasks = (0..NUM_CALLERS).map(|caller| {
        let bridge = bridge.clone();
        let instance = instance.clone();
        let stats = stats.clone();
        tokio::task::spawn_blocking(move || {
            for call in 0..CALLS_PER_CALLER {
                let payload = Bytes::from(format!("caller_{caller}_call_{call}"));
                match instance.proxy().invoke(bridge.context(), 1, payload.clone()) {
                    Ok(reply) if reply[4..] == payload[..] => stats.record_success(),
                    Ok(_) => stats.record_failure(format!("caller {caller} call {call}: data mismatch")),
                    Err(e) => stats.record_failure(e),
                }
            }
        })
    });
    for joined in join_all(tasks).await {
        joined.unwrap();
    }

    assert_eq!(stats.failures(), 0, "errors: {:?}", stats.errors());
    assert_eq!(stats.successes(), (NUM_CALLERS * CALLS_PER_CALLER) as u64);
    assert_eq!(
        builder.target.calls.load(Ordering::SeqCst),
        NUM_CALLERS * CALLS_PER_CALLER
    );
}

/// Test: calls from foreign contexts need that context's perimeter flag
#[test]
fn test_cross_context_perimeter() {
    init_logging();
    let (bridge, _) = echo_bridge(BridgeConfig::default());
    let instance = bridge.activate(&echo_moniker(&iid::IDISPATCH)).unwrap();
    let foreign = ContextId::generate();

    let err = instance.proxy().invoke(foreign, 1, Bytes::new()).unwrap_err();
    assert_eq!(err.hresult(), hresult::E_ACCESSDENIED);

    let perimeter = bridge.perimeters().perimeter(foreign);
    perimeter.set_perimeter_flag(true);
    assert!(perimeter.get_perimeter_flag());
    assert!(instance.proxy().invoke(foreign, 1, Bytes::new()).is_ok());

    perimeter.set_perimeter_flag(false);
    assert!(instance.proxy().invoke(foreign, 1, Bytes::new()).is_err());

    // The home context never needs a flag
    assert!(instance.proxy().invoke(bridge.context(), 1, Bytes::new()).is_ok());
}

/// Test: with dispatch disabled only the outer proxy is built
#[test]
fn test_dispatch_capability_disabled() {
    let config = BridgeConfig {
        capabilities: ProxyCapabilities {
            dispatch: false,
            ..ProxyCapabilities::default()
        },
        ..BridgeConfig::default()
    };
    let (bridge, builder) = echo_bridge(config);
    let creator = bridge.proxy_creator();
    assert!(!creator.supports_dispatch());

    let instance = bridge.class_factory().create_instance(None, &iid::IDISPATCH).unwrap();
    assert!(instance.proxy().dispatch_handle().is_none());
    assert_eq!(bridge.handles().len(), 2);
    assert_eq!(builder.builds.load(Ordering::SeqCst), 0);

    let err = instance.proxy().invoke(bridge.context(), 1, Bytes::new()).unwrap_err();
    assert!(matches!(err, BridgeError::NotDispatchable(_)));
}

/// Behavior accepting only one URI scheme
struct RequireScheme(&'static str);

impl EndpointBehavior for RequireScheme {
    fn validate(&self, address: &str) -> Result<()> {
        if address.starts_with(self.0) {
            Ok(())
        } else {
            Err(BridgeError::Channel(format!("{address} does not use {}", self.0)))
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Test: behaviors are checked when the factory freezes for use
#[test]
fn test_behavior_validation_on_freeze() {
    init_logging();
    let mut behaviors = Behaviors::new();
    behaviors.add(RequireScheme("https:")).unwrap();
    assert!(matches!(
        behaviors.add(RequireScheme("net.tcp:")),
        Err(BridgeError::DuplicateBehavior(_))
    ));

    let builder = Arc::new(EchoBuilder::new());
    let settings = Arc::new(ChannelBuilderSettings::new(builder.clone(), behaviors));
    let bridge = ComBridge::new(BridgeConfig::default(), settings.clone());

    assert_eq!(bridge.settings().behaviors().find::<RequireScheme>().map(|b| b.0), Some("https:"));

    // Activation freezes the factory before resolving anything
    let err = bridge.activate(&echo_moniker(&iid::IDISPATCH)).unwrap_err();
    assert!(matches!(err, BridgeError::Channel(_)));
    assert!(err.to_string().contains("does not use https:"));
    assert!(!settings.is_frozen());
    assert!(bridge.handles().is_empty());

    // Vtable-only interfaces never touch the channel
    let instance = bridge.class_factory().create_instance(None, &iid::IUNKNOWN).unwrap();
    assert!(instance.proxy().dispatch_handle().is_none());
}
