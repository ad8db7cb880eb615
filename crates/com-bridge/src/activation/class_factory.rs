//! Class factory activation

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::proxy::{ComProxy, HandleKind, HandleTable, ProxyCreator};
use crate::security::ContextId;
use crate::trace::{self as diag, ActivationFailure};
use crate::types::{hresult, iid, BridgeError, InterfaceId, NativeHandle, Result};

/// Server-wide keep-alive count
///
/// Advisory only: nothing in the bridge refuses work based on it.
#[derive(Debug, Default)]
pub struct ServerLock {
    count: AtomicU32,
}

impl ServerLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the count, returning the new value
    pub fn lock(&self) -> u32 {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Decrement the count, returning the new value; saturates at zero
    pub fn unlock(&self) -> u32 {
        match self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(previous) => previous - 1,
            Err(_) => {
                warn!("server unlocked more often than locked");
                0
            }
        }
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn is_locked(&self) -> bool {
        self.count() > 0
    }
}

/// An activated instance and its proxy
///
/// Dropping the instance disposes the proxy and releases the instance
/// handle.
pub struct ComInstance {
    handle: NativeHandle,
    proxy: ComProxy,
    handles: Arc<HandleTable>,
}

impl ComInstance {
    /// Instance (owner) handle
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    pub fn proxy(&self) -> &ComProxy {
        &self.proxy
    }
}

impl Drop for ComInstance {
    fn drop(&mut self) {
        self.proxy.dispose();
        self.handles.release(self.handle);
    }
}

impl std::fmt::Debug for ComInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComInstance")
            .field("handle", &self.handle)
            .field("proxy", &self.proxy)
            .finish()
    }
}

/// Classic activation entry point
pub trait ClassFactory: Send + Sync {
    /// Create an instance exposing `iid`, optionally aggregated by `outer`
    fn create_instance(&self, outer: Option<NativeHandle>, iid: &InterfaceId) -> Result<ComInstance>;

    /// Adjust the server keep-alive count
    fn lock_server(&self, lock: bool);
}

/// Class factory producing service proxies
pub struct ProxyClassFactory {
    creator: Arc<dyn ProxyCreator>,
    handles: Arc<HandleTable>,
    server_lock: Arc<ServerLock>,
    context: ContextId,
    allow_aggregation: bool,
}

impl ProxyClassFactory {
    pub fn new(
        creator: Arc<dyn ProxyCreator>,
        handles: Arc<HandleTable>,
        server_lock: Arc<ServerLock>,
        context: ContextId,
    ) -> Self {
        Self {
            creator,
            handles,
            server_lock,
            context,
            allow_aggregation: false,
        }
    }

    /// Permit aggregation (for IUnknown requests only)
    pub fn with_aggregation(mut self, allow: bool) -> Self {
        self.allow_aggregation = allow;
        self
    }

    /// Context new instances are created in
    pub fn context(&self) -> ContextId {
        self.context
    }

    fn activate(&self, outer: Option<NativeHandle>, iid: &InterfaceId) -> Result<ComInstance> {
        let outer = outer.filter(|h| !h.is_null());
        if outer.is_some() && (!self.allow_aggregation || *iid != iid::IUNKNOWN) {
            return Err(BridgeError::ClassActivation {
                iid: *iid,
                hresult: hresult::CLASS_E_NOAGGREGATION,
            });
        }

        let handle = self
            .handles
            .allocate(HandleKind::Instance { iid: *iid, outer }, None, self.context);
        let proxy = match self.creator.create_proxy(handle, iid) {
            Ok(proxy) => proxy,
            Err(e) => {
                self.handles.release(handle);
                return Err(e);
            }
        };

        info!(%iid, %handle, context = %self.context, aggregated = outer.is_some(), "instance created");
        Ok(ComInstance {
            handle,
            proxy,
            handles: self.handles.clone(),
        })
    }
}

impl ClassFactory for ProxyClassFactory {
    fn create_instance(&self, outer: Option<NativeHandle>, iid: &InterfaceId) -> Result<ComInstance> {
        self.activate(outer, iid).map_err(|err| {
            let aggregated = outer.map_or(false, |h| !h.is_null());
            diag::emit(&ActivationFailure::new(*iid, aggregated, &err));
            err
        })
    }

    fn lock_server(&self, lock: bool) {
        let count = if lock {
            self.server_lock.lock()
        } else {
            self.server_lock.unlock()
        };
        debug!(lock, count, "lock server");
    }
}
