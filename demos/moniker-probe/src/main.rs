//! Moniker Probe
//!
//! Parses a service moniker, activates it through the COM bridge against an
//! in-process echo channel, and invokes one member on the resulting proxy.
//!
//! Run with:
//! cargo run --bin moniker-probe -- "service:address=net.tcp://localhost/echo" --payload hello

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use com_bridge::activation::{MonikerKeyword, ServiceMoniker};
use com_bridge::channel::{Behaviors, ChannelBuilderSettings, ChannelFactory, ChannelFactoryBuilder};
use com_bridge::proxy::DispatchTarget;
use com_bridge::typecache::DispId;
use com_bridge::{BridgeConfig, ComBridge, InterfaceId, Result};

#[derive(Parser)]
#[command(name = "moniker-probe")]
#[command(about = "Activate a service moniker through the COM bridge")]
struct Args {
    /// Service moniker display name
    moniker: String,

    /// JSON bridge configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fail on unknown contracts instead of synthesizing descriptors
    #[arg(long)]
    no_generation: bool,

    /// Dispatch id to invoke
    #[arg(short, long, default_value = "1")]
    dispid: DispId,

    /// Payload sent with the call
    #[arg(short, long, default_value = "ping")]
    payload: String,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

/// Channel that answers every call with its own arguments
struct Echo {
    address: String,
}

impl DispatchTarget for Echo {
    fn invoke(&self, iid: &InterfaceId, dispid: DispId, args: Bytes) -> Result<Bytes> {
        info!(address = %self.address, %iid, dispid, len = args.len(), "echo");
        Ok(args)
    }
}

struct EchoFactory {
    address: String,
}

impl ChannelFactory for EchoFactory {
    fn address(&self) -> &str {
        &self.address
    }

    fn create_channel(&self) -> Result<Arc<dyn DispatchTarget>> {
        Ok(Arc::new(Echo {
            address: self.address.clone(),
        }))
    }
}

struct EchoBuilder {
    address: String,
}

impl ChannelFactoryBuilder for EchoBuilder {
    fn build(&self, _behaviors: &Behaviors) -> Result<Arc<dyn ChannelFactory>> {
        Ok(Arc::new(EchoFactory {
            address: self.address.clone(),
        }))
    }
}

fn load_config(args: &Args) -> std::result::Result<BridgeConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => BridgeConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => BridgeConfig::default(),
    };
    if args.no_generation {
        config.no_assembly_generation = true;
    }
    Ok(config)
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let moniker = match ServiceMoniker::parse(&args.moniker) {
        Ok(moniker) => moniker,
        Err(e) => {
            eprintln!("{} (HRESULT {})", e, e.hresult());
            std::process::exit(1);
        }
    };
    for (keyword, value) in moniker.iter() {
        println!("  {:<24} {}", keyword, value);
    }

    let config = load_config(&args)?;
    let address = moniker.get(MonikerKeyword::Address).unwrap_or_default().to_string();
    let settings = Arc::new(ChannelBuilderSettings::new(
        Arc::new(EchoBuilder { address }),
        Behaviors::new(),
    ));
    let bridge = ComBridge::new(config, settings);

    let instance = match bridge.activate(&args.moniker) {
        Ok(instance) => instance,
        Err(e) => {
            eprintln!("Activation failed: {} (HRESULT {})", e, e.hresult());
            std::process::exit(1);
        }
    };

    let proxy = instance.proxy();
    let descriptor = proxy.descriptor();
    println!("Activated {} as {} ({:?})", proxy.interface_id(), descriptor.name(), descriptor.origin());

    match proxy.invoke(bridge.context(), args.dispid, Bytes::from(args.payload.clone())) {
        Ok(reply) => println!("Reply: {}", String::from_utf8_lossy(&reply)),
        Err(e) => println!("Invoke failed: {} (HRESULT {})", e, e.hresult()),
    }

    drop(instance);
    info!(live_handles = bridge.handles().len(), "done");
    Ok(())
}
