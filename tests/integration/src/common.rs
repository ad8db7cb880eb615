//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use com_bridge::channel::{Behaviors, ChannelBuilderSettings, ChannelFactory, ChannelFactoryBuilder};
use com_bridge::proxy::DispatchTarget;
use com_bridge::typecache::{DispId, SyntheticTypeGenerator, TypeGenerator, TypeRequest, TypeShape};
use com_bridge::{BridgeConfig, ComBridge, InterfaceId, Result};

pub const ECHO_ADDRESS: &str = "net.tcp://localhost:8000/echo";

static INIT: Once = Once::new();

/// Install a test subscriber once; honours RUST_LOG
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Dispatch target replying with the dispid followed by the arguments
pub struct EchoTarget {
    pub calls: AtomicUsize,
}

impl DispatchTarget for EchoTarget {
    fn get_id_of_name(&self, name: &str) -> Option<DispId> {
        match name {
            "Echo" => Some(1),
            "Reverse" => Some(2),
            _ => None,
        }
    }

    fn invoke(&self, _iid: &InterfaceId, dispid: DispId, args: Bytes) -> Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut reply = dispid.to_le_bytes().to_vec();
        if dispid == 2 {
            reply.extend(args.iter().rev());
        } else {
            reply.extend_from_slice(&args);
        }
        Ok(Bytes::from(reply))
    }
}

pub struct EchoFactory {
    target: Arc<EchoTarget>,
}

impl ChannelFactory for EchoFactory {
    fn address(&self) -> &str {
        ECHO_ADDRESS
    }

    fn create_channel(&self) -> Result<Arc<dyn DispatchTarget>> {
        Ok(self.target.clone())
    }
}

/// Builder handing out one shared echo target; counts builds
pub struct EchoBuilder {
    pub target: Arc<EchoTarget>,
    pub builds: AtomicUsize,
}

impl EchoBuilder {
    pub fn new() -> Self {
        Self {
            target: Arc::new(EchoTarget {
                calls: AtomicUsize::new(0),
            }),
            builds: AtomicUsize::new(0),
        }
    }
}

impl ChannelFactoryBuilder for EchoBuilder {
    fn build(&self, _behaviors: &Behaviors) -> Result<Arc<dyn ChannelFactory>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(EchoFactory {
            target: self.target.clone(),
        }))
    }
}

/// Bridge over an echo channel
pub fn echo_bridge(config: BridgeConfig) -> (ComBridge, Arc<EchoBuilder>) {
    let builder = Arc::new(EchoBuilder::new());
    let settings = Arc::new(ChannelBuilderSettings::new(builder.clone(), Behaviors::new()));
    (ComBridge::new(config, settings), builder)
}

/// Moniker for `iid` at the echo address
pub fn echo_moniker(iid: &InterfaceId) -> String {
    format!("service:address={ECHO_ADDRESS},contract={{{iid}}}")
}

/// Synthesizing generator that counts calls and sleeps to widen race windows
pub struct CountingGenerator {
    pub calls: AtomicU64,
    pub delay: Duration,
}

impl CountingGenerator {
    pub fn new(delay: Duration) -> Self {
        Self {
            calls: AtomicU64::new(0),
            delay,
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TypeGenerator for CountingGenerator {
    fn generate(&self, request: &TypeRequest) -> Result<TypeShape> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        SyntheticTypeGenerator.generate(request)
    }
}

/// Success/failure counts gathered across concurrent workers
pub struct ConcurrentStats {
    successes: AtomicU64,
    failures: AtomicU64,
    errors: Mutex<Vec<String>>,
}

impl ConcurrentStats {
    pub fn new() -> Self {
        Self {
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, error: impl ToString) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.errors.lock().push(error.to_string());
    }

    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

/// Per-category results collected by the harness binary
#[derive(Debug, Default)]
pub struct TestSuiteResults {
    pub results: Vec<(&'static str, bool, Duration, String)>,
}

impl TestSuiteResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: &'static str, success: bool, duration: Duration, summary: String) {
        self.results.push((name, success, duration, summary));
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|(_, s, _, _)| *s).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    pub fn total_duration(&self) -> Duration {
        self.results.iter().map(|(_, _, d, _)| *d).sum()
    }
}
