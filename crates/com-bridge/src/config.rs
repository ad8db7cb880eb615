//! Bridge configuration

use serde::{Deserialize, Serialize};

use crate::proxy::ProxyCapabilities;

/// Bridge configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Fail on cache misses instead of synthesizing descriptors
    pub no_assembly_generation: bool,
    /// Install the built-in descriptor generator
    pub synthesize_types: bool,
    /// Let the class factory accept an outer unknown for IUnknown requests
    pub allow_aggregation: bool,
    /// Capabilities reported by the proxy creator
    pub capabilities: ProxyCapabilities,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            no_assembly_generation: false,
            synthesize_types: true,
            allow_aggregation: false,
            capabilities: ProxyCapabilities::default(),
        }
    }
}

impl BridgeConfig {
    /// Create a new configuration
    pub fn new(no_assembly_generation: bool) -> Self {
        Self {
            no_assembly_generation,
            ..Self::default()
        }
    }

    /// Parse a JSON configuration; missing fields take their defaults
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
