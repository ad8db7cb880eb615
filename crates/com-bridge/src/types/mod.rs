//! Core bridge types
//!
//! - Identifiers: GUID, IID, type library identity, assembly id
//! - Native boundary values: HRESULT codes and opaque handles
//! - Errors: the bridge error taxonomy and the moniker syntax error

mod error;
mod identifiers;
mod status;

pub use error::*;
pub use identifiers::*;
pub use status::{hresult, HResult, NativeHandle};

/// Well-known interface identifiers
pub mod iid {
    use super::{Guid, InterfaceId};

    /// IUnknown
    pub const IUNKNOWN: InterfaceId =
        InterfaceId(Guid::from_u128(0x00000000_0000_0000_c000_000000000046));
    /// IClassFactory
    pub const ICLASSFACTORY: InterfaceId =
        InterfaceId(Guid::from_u128(0x00000001_0000_0000_c000_000000000046));
    /// IDispatch
    pub const IDISPATCH: InterfaceId =
        InterfaceId(Guid::from_u128(0x00020400_0000_0000_c000_000000000046));
    /// ISupportErrorInfo
    pub const ISUPPORTERRORINFO: InterfaceId =
        InterfaceId(Guid::from_u128(0xdf0b3d60_548f_101b_8e65_08002b2bd119));
    /// IChannelOptions (marker interface on service proxies)
    pub const ICHANNELOPTIONS: InterfaceId =
        InterfaceId(Guid::from_u128(0xb90a2e8c_dd3e_4f34_bc5a_3c2a3a8b0b5f));
}
