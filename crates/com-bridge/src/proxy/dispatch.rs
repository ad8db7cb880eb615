//! Dispatch target behind the inner proxy

use bytes::Bytes;

use crate::typecache::DispId;
use crate::types::{InterfaceId, Result};

/// Receiver of late-bound calls forwarded by the dispatch proxy
pub trait DispatchTarget: Send + Sync {
    /// Map a member name to its dispatch id
    fn get_id_of_name(&self, _name: &str) -> Option<DispId> {
        None
    }

    /// Invoke a member with marshaled arguments
    fn invoke(&self, iid: &InterfaceId, dispid: DispId, args: Bytes) -> Result<Bytes>;
}
