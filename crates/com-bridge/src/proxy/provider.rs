//! Physical proxy construction at the native boundary
//!
//! Both calls return a status code plus a handle, never an error: the
//! handle is `NULL` unless the status is `S_OK`. For one activation the
//! outer proxy is built first and its handle is passed to the dispatch call.

use std::sync::Arc;

use tracing::debug;

use crate::security::ContextId;
use crate::typecache::{TypeCacheManager, TypeDescriptor};
use crate::types::{hresult, BridgeError, HResult, InterfaceId, NativeHandle};
use super::dispatch::DispatchTarget;
use super::handle::{HandleKind, HandleTable};

/// Owner side of an outer proxy
pub trait ProxyManager: Send + Sync {
    /// Resolve the interface the proxy will expose
    fn find_interface(&self, iid: &InterfaceId) -> Result<Arc<TypeDescriptor>, HResult>;

    /// Instance handle that owns the proxy
    fn owner(&self) -> NativeHandle;

    /// Context the proxy lives in
    fn context(&self) -> ContextId;
}

/// Manager resolving interfaces through the type cache
pub struct CacheProxyManager {
    cache: Arc<TypeCacheManager>,
    no_assembly_generation: bool,
    owner: NativeHandle,
    context: ContextId,
}

impl CacheProxyManager {
    pub fn new(
        cache: Arc<TypeCacheManager>,
        no_assembly_generation: bool,
        owner: NativeHandle,
        context: ContextId,
    ) -> Self {
        Self {
            cache,
            no_assembly_generation,
            owner,
            context,
        }
    }
}

impl ProxyManager for CacheProxyManager {
    fn find_interface(&self, iid: &InterfaceId) -> Result<Arc<TypeDescriptor>, HResult> {
        self.cache
            .resolve(iid, self.no_assembly_generation, false)
            .map_err(|err| match err {
                BridgeError::TypeNotFound(_) => hresult::E_NOINTERFACE,
                other => other.hresult(),
            })
    }

    fn owner(&self) -> NativeHandle {
        self.owner
    }

    fn context(&self) -> ContextId {
        self.context
    }
}

/// Factory for the two physical proxy shapes
pub trait ProxyProvider: Send + Sync {
    /// Build the outer COM-visible wrapper
    fn create_outer_proxy_instance(&self, manager: &dyn ProxyManager, iid: &InterfaceId) -> (HResult, NativeHandle);

    /// Build the inner object forwarding calls to `target`
    fn create_dispatch_proxy_instance(
        &self,
        outer: NativeHandle,
        target: Arc<dyn DispatchTarget>,
    ) -> (HResult, NativeHandle);
}

/// Provider allocating proxies in a [`HandleTable`]
pub struct HandleProxyProvider {
    handles: Arc<HandleTable>,
}

impl HandleProxyProvider {
    pub fn new(handles: Arc<HandleTable>) -> Self {
        Self { handles }
    }
}

impl ProxyProvider for HandleProxyProvider {
    fn create_outer_proxy_instance(&self, manager: &dyn ProxyManager, iid: &InterfaceId) -> (HResult, NativeHandle) {
        let descriptor = match manager.find_interface(iid) {
            Ok(descriptor) => descriptor,
            Err(hr) => {
                debug!(%iid, %hr, "outer proxy: interface not resolved");
                return (hr, NativeHandle::NULL);
            }
        };

        let owner = manager.owner();
        let parent = if owner.is_null() {
            None
        } else if self.handles.contains(owner) {
            Some(owner)
        } else {
            debug!(%iid, %owner, "outer proxy: owner handle is not live");
            return (hresult::E_INVALIDARG, NativeHandle::NULL);
        };
        let handle = self.handles.allocate(
            HandleKind::OuterProxy {
                iid: *iid,
                descriptor,
            },
            parent,
            manager.context(),
        );
        debug!(%iid, %handle, %owner, "outer proxy created");
        (hresult::S_OK, handle)
    }

    fn create_dispatch_proxy_instance(
        &self,
        outer: NativeHandle,
        target: Arc<dyn DispatchTarget>,
    ) -> (HResult, NativeHandle) {
        if outer.is_null() {
            return (hresult::E_POINTER, NativeHandle::NULL);
        }
        let entry = match self.handles.get(outer) {
            Some(entry) => entry,
            None => return (hresult::E_INVALIDARG, NativeHandle::NULL),
        };
        match &entry.kind {
            HandleKind::OuterProxy { descriptor, .. } if descriptor.kind().is_dispatchable() => {}
            HandleKind::OuterProxy { .. } => return (hresult::E_NOINTERFACE, NativeHandle::NULL),
            _ => return (hresult::E_INVALIDARG, NativeHandle::NULL),
        }

        let handle = self.handles.allocate(
            HandleKind::DispatchProxy { outer, target },
            Some(outer),
            entry.context,
        );
        debug!(%outer, %handle, "dispatch proxy created");
        (hresult::S_OK, handle)
    }
}
