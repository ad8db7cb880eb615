//! Bridge error types

use thiserror::Error;

use super::identifiers::{AssemblyId, InterfaceId};
use super::status::{hresult, HResult, NativeHandle};

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Bridge errors
///
/// Raised to the immediate caller; the two native proxy-construction calls
/// return [`HResult`] codes instead.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Lookup miss with generation disabled (or no generator installed)
    #[error("type not found: {0}")]
    TypeNotFound(String),

    /// The type generator failed to synthesize a descriptor
    #[error("type generation failed for {key}: {reason}")]
    TypeGeneration { key: String, reason: String },

    /// Unknown assembly identifier
    #[error("assembly not found: {0}")]
    AssemblyNotFound(AssemblyId),

    /// Invalid owner handle or unresolved interface
    #[error("proxy creation failed for IID {iid} ({hresult}): {reason}")]
    ProxyCreation {
        iid: InterfaceId,
        hresult: HResult,
        reason: String,
    },

    /// Aggregation is not supported for the requested interface
    #[error("class activation failed for IID {iid} ({hresult})")]
    ClassActivation { iid: InterfaceId, hresult: HResult },

    /// Malformed activation string
    #[error(transparent)]
    MonikerSyntax(#[from] MonikerSyntaxError),

    /// Call on a proxy whose native handle was released
    #[error("proxy {0} is disposed")]
    ProxyDisposed(NativeHandle),

    /// Late-bound call on an interface without an IDispatch side
    #[error("interface {0} does not support late-bound dispatch")]
    NotDispatchable(InterfaceId),

    /// Cross-context call rejected by the security perimeter
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A behavior of this concrete type is already present
    #[error("duplicate endpoint behavior: {0}")]
    DuplicateBehavior(&'static str),

    /// Read-write access requested after the channel factory was frozen
    #[error("channel factory is frozen for read-only use")]
    ChannelFactoryFrozen,

    /// Channel collaborator failure
    #[error("channel error: {0}")]
    Channel(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn type_generation(key: impl ToString, reason: impl Into<String>) -> Self {
        Self::TypeGeneration {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn proxy_creation(iid: InterfaceId, hresult: HResult, reason: impl Into<String>) -> Self {
        Self::ProxyCreation {
            iid,
            hresult,
            reason: reason.into(),
        }
    }

    /// Native status code for this error
    pub fn hresult(&self) -> HResult {
        match self {
            Self::TypeNotFound(_) => hresult::TYPE_E_ELEMENTNOTFOUND,
            Self::TypeGeneration { .. } => hresult::E_FAIL,
            Self::AssemblyNotFound(_) => hresult::E_FILENOTFOUND,
            Self::ProxyCreation { hresult, .. } => *hresult,
            Self::ClassActivation { hresult, .. } => *hresult,
            Self::MonikerSyntax(e) => e.hresult(),
            Self::ProxyDisposed(_) => hresult::CO_E_OBJNOTCONNECTED,
            Self::NotDispatchable(_) => hresult::E_NOINTERFACE,
            Self::AccessDenied(_) => hresult::E_ACCESSDENIED,
            Self::InvalidArgument(_) => hresult::E_INVALIDARG,
            Self::DuplicateBehavior(_) => hresult::E_INVALIDARG,
            Self::ChannelFactoryFrozen => hresult::E_FAIL,
            Self::Channel(_) => hresult::CO_E_OBJNOTCONNECTED,
            Self::Io(_) => hresult::E_FAIL,
        }
    }
}

/// A textual moniker failed to parse
///
/// Always carries `MK_E_SYNTAX`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid moniker syntax at position {position}: {message}")]
pub struct MonikerSyntaxError {
    message: String,
    position: usize,
}

impl MonikerSyntaxError {
    /// Native status code carried by every moniker syntax error
    pub const HRESULT: HResult = hresult::MK_E_SYNTAX;

    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Byte offset into the display name where parsing stopped
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn hresult(&self) -> HResult {
        Self::HRESULT
    }
}
