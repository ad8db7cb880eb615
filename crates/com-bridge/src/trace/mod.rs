//! Diagnostic trace records
//!
//! Failure records are rendered with [`TraceRecordCodec`] and logged through
//! `tracing` under the `com_bridge::trace` target.

mod codec;

pub use codec::*;

use serde::Serialize;

use crate::types::{AssemblyId, BridgeError, HResult, InterfaceId, NativeHandle};

/// A type or type-library resolution failed
#[derive(Clone, Debug, Serialize)]
pub struct TypeResolutionFailure {
    pub key: String,
    pub is_server: bool,
    pub no_assembly_generation: bool,
    pub error: String,
    pub hresult: HResult,
}

/// An assembly could not be loaded
#[derive(Clone, Debug, Serialize)]
pub struct AssemblyLoadFailure {
    pub assembly: AssemblyId,
    pub error: String,
    pub hresult: HResult,
}

/// Proxy construction failed
#[derive(Clone, Debug, Serialize)]
pub struct ProxyCreationFailure {
    pub iid: InterfaceId,
    pub owner: NativeHandle,
    pub error: String,
    pub hresult: HResult,
}

/// Class activation failed
#[derive(Clone, Debug, Serialize)]
pub struct ActivationFailure {
    pub iid: InterfaceId,
    pub aggregated: bool,
    pub error: String,
    pub hresult: HResult,
}

impl ActivationFailure {
    pub fn new(iid: InterfaceId, aggregated: bool, error: &BridgeError) -> Self {
        Self {
            iid,
            aggregated,
            error: error.to_string(),
            hresult: error.hresult(),
        }
    }
}

/// Render a failure record and log it at WARN
pub fn emit<T: Serialize>(record: &T) {
    if !tracing::enabled!(target: "com_bridge::trace", tracing::Level::WARN) {
        return;
    }
    let rendered = TraceRecordCodec::to_string(Some(record));
    tracing::warn!(target: "com_bridge::trace", record = %rendered, "trace record");
}
