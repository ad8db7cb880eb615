//! COM proxy and type-cache bridge
//!
//! Exposes managed service endpoints to COM clients as native proxies.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                  ComBridge                    │
//! │  ┌──────────────┐        ┌─────────────────┐  │
//! │  │ ClassFactory │───────▶│  ProxyCreator   │  │
//! │  └──────────────┘        └────────┬────────┘  │
//! │          │              ┌─────────┴────────┐  │
//! │          ▼              ▼                  ▼  │
//! │  ┌──────────────┐ ┌────────────┐ ┌──────────┐ │
//! │  │ HandleTable  │ │ TypeCache  │ │ Channel  │ │
//! │  └──────────────┘ └────────────┘ └──────────┘ │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! - [`typecache`]: interface and type-library identities to descriptors
//! - [`proxy`]: outer and dispatch proxies over native handles
//! - [`activation`]: class factory, server lock, service monikers
//! - [`channel`]: channel factory settings and endpoint behaviors
//! - [`security`]: per-context security perimeter
//! - [`trace`]: failure records rendered for diagnostics

pub mod activation;
pub mod bridge;
pub mod channel;
pub mod config;
pub mod proxy;
pub mod security;
pub mod trace;
pub mod typecache;
pub mod types;

pub use bridge::ComBridge;
pub use config::BridgeConfig;
pub use types::{hresult, iid, BridgeError, Guid, HResult, InterfaceId, NativeHandle, Result};
