//! Proxy creation
//!
//! A [`ProxyCreator`] turns an owner handle and an interface id into a
//! [`ComProxy`]: it resolves the interface through the type cache, builds
//! the outer proxy and, for dispatchable interfaces, the dispatch proxy
//! bound to the service channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::channel::ProvideChannelBuilderSettings;
use crate::security::{ContextId, PerimeterRegistry};
use crate::trace::{self as diag, ProxyCreationFailure};
use crate::typecache::{DispId, TypeCacheManager, TypeDescriptor, TypeKey};
use crate::types::{hresult, BridgeError, InterfaceId, NativeHandle, Result};
use super::handle::{HandleKind, HandleTable};
use super::provider::{CacheProxyManager, ProxyManager, ProxyProvider};

/// Capability facts reported by a proxy creator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyCapabilities {
    /// Rich error information (ISupportErrorInfo)
    pub error_info: bool,
    /// Late-bound calls through IDispatch
    pub dispatch: bool,
    /// Fast-path intrinsic interfaces (IChannelOptions)
    pub intrinsics: bool,
}

impl Default for ProxyCapabilities {
    fn default() -> Self {
        Self {
            error_info: true,
            dispatch: true,
            intrinsics: true,
        }
    }
}

/// Proxy creation contract
pub trait ProxyCreator: Send + Sync {
    /// Build a proxy bound to `owner` exposing `iid`
    fn create_proxy(&self, owner: NativeHandle, iid: &InterfaceId) -> Result<ComProxy>;

    /// Whether `iid` reports rich error information
    fn supports_error_info(&self, iid: &InterfaceId) -> bool;

    fn supports_dispatch(&self) -> bool;

    fn supports_intrinsics(&self) -> bool;
}

/// Proxy creator for service-channel proxies
pub struct ServiceProxyCreator {
    cache: Arc<TypeCacheManager>,
    handles: Arc<HandleTable>,
    provider: Arc<dyn ProxyProvider>,
    settings: Arc<dyn ProvideChannelBuilderSettings>,
    perimeters: Arc<PerimeterRegistry>,
    capabilities: ProxyCapabilities,
    no_assembly_generation: bool,
}

impl ServiceProxyCreator {
    pub fn new(
        cache: Arc<TypeCacheManager>,
        handles: Arc<HandleTable>,
        provider: Arc<dyn ProxyProvider>,
        settings: Arc<dyn ProvideChannelBuilderSettings>,
        perimeters: Arc<PerimeterRegistry>,
    ) -> Self {
        Self {
            cache,
            handles,
            provider,
            settings,
            perimeters,
            capabilities: ProxyCapabilities::default(),
            no_assembly_generation: false,
        }
    }

    pub fn with_capabilities(mut self, capabilities: ProxyCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_no_assembly_generation(mut self, no_assembly_generation: bool) -> Self {
        self.no_assembly_generation = no_assembly_generation;
        self
    }

    pub fn capabilities(&self) -> ProxyCapabilities {
        self.capabilities
    }

    fn build(&self, owner: NativeHandle, iid: &InterfaceId) -> Result<ComProxy> {
        if owner.is_null() {
            return Err(BridgeError::proxy_creation(*iid, hresult::E_POINTER, "null owner handle"));
        }
        let context = match self.handles.get(owner) {
            Some(entry) if matches!(entry.kind, HandleKind::Instance { .. }) => entry.context,
            _ => {
                return Err(BridgeError::proxy_creation(
                    *iid,
                    hresult::E_INVALIDARG,
                    "owner handle is not a live instance",
                ))
            }
        };

        let manager = CacheProxyManager::new(self.cache.clone(), self.no_assembly_generation, owner, context);
        let (hr, outer) = self.provider.create_outer_proxy_instance(&manager, iid);
        if hr.is_failure() {
            return Err(BridgeError::proxy_creation(*iid, hr, "outer proxy construction failed"));
        }

        // Already cached by the outer call
        let descriptor = match manager.find_interface(iid) {
            Ok(descriptor) => descriptor,
            Err(hr) => {
                self.handles.release(outer);
                return Err(BridgeError::proxy_creation(*iid, hr, "interface not resolved"));
            }
        };

        let mut proxy = ComProxy {
            outer,
            dispatch: None,
            iid: *iid,
            descriptor,
            context,
            handles: self.handles.clone(),
            perimeters: self.perimeters.clone(),
            disposed: AtomicBool::new(false),
        };

        // On any failure below, dropping `proxy` releases the outer handle
        if self.capabilities.dispatch && proxy.descriptor.kind().is_dispatchable() {
            let target = self
                .settings
                .service_channel()
                .map_err(|e| BridgeError::proxy_creation(*iid, e.hresult(), e.to_string()))?;
            let (hr, inner) = self.provider.create_dispatch_proxy_instance(outer, target);
            if hr.is_failure() {
                return Err(BridgeError::proxy_creation(*iid, hr, "dispatch proxy construction failed"));
            }
            proxy.dispatch = Some(inner);
        }

        debug!(%iid, %owner, %outer, dispatch = ?proxy.dispatch, "proxy created");
        Ok(proxy)
    }
}

impl ProxyCreator for ServiceProxyCreator {
    fn create_proxy(&self, owner: NativeHandle, iid: &InterfaceId) -> Result<ComProxy> {
        self.build(owner, iid).map_err(|err| {
            diag::emit(&ProxyCreationFailure {
                iid: *iid,
                owner,
                error: err.to_string(),
                hresult: err.hresult(),
            });
            err
        })
    }

    fn supports_error_info(&self, iid: &InterfaceId) -> bool {
        if !self.capabilities.error_info {
            return false;
        }
        match self.cache.peek(&TypeKey::Interface(*iid)) {
            Some(descriptor) => descriptor.supports_error_info(),
            None => self
                .cache
                .table()
                .interface(iid)
                .map(|shape| shape.supports_error_info)
                .unwrap_or(false),
        }
    }

    fn supports_dispatch(&self) -> bool {
        self.capabilities.dispatch
    }

    fn supports_intrinsics(&self) -> bool {
        self.capabilities.intrinsics
    }
}

/// Proxy bound to an owner instance and one interface
///
/// Owns the outer native handle; the dispatch handle is its child and goes
/// with it. [`dispose`](Self::dispose) releases the handle exactly once and
/// is a no-op afterwards; dropping the proxy disposes it.
pub struct ComProxy {
    outer: NativeHandle,
    dispatch: Option<NativeHandle>,
    iid: InterfaceId,
    descriptor: Arc<TypeDescriptor>,
    context: ContextId,
    handles: Arc<HandleTable>,
    perimeters: Arc<PerimeterRegistry>,
    disposed: AtomicBool,
}

impl ComProxy {
    /// Outer native handle
    pub fn handle(&self) -> NativeHandle {
        self.outer
    }

    /// Dispatch proxy handle, when the interface is dispatchable
    pub fn dispatch_handle(&self) -> Option<NativeHandle> {
        self.dispatch
    }

    pub fn interface_id(&self) -> InterfaceId {
        self.iid
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// Context the proxy lives in
    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Release the native handle; returns false if already released
    pub fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return false;
        }
        let removed = self.handles.release(self.outer);
        debug!(handle = %self.outer, removed, "proxy disposed");
        true
    }

    /// Forward a late-bound call through the dispatch proxy
    ///
    /// Calls from another context need that context's perimeter flag set.
    pub fn invoke(&self, caller: ContextId, dispid: DispId, args: Bytes) -> Result<Bytes> {
        if self.is_disposed() {
            return Err(BridgeError::ProxyDisposed(self.outer));
        }
        if caller != self.context && !self.perimeters.is_permitted(caller) {
            warn!(%caller, home = %self.context, iid = %self.iid, "cross-context call outside perimeter");
            return Err(BridgeError::AccessDenied(format!(
                "context {caller} is outside the security perimeter of context {}",
                self.context
            )));
        }

        let dispatch = self.dispatch.ok_or(BridgeError::NotDispatchable(self.iid))?;
        let target = match self.handles.get(dispatch).map(|e| e.kind) {
            Some(HandleKind::DispatchProxy { target, .. }) => target,
            _ => return Err(BridgeError::ProxyDisposed(self.outer)),
        };
        target.invoke(&self.iid, dispid, args)
    }
}

impl Drop for ComProxy {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for ComProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComProxy")
            .field("outer", &self.outer)
            .field("dispatch", &self.dispatch)
            .field("iid", &self.iid)
            .field("context", &self.context)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
