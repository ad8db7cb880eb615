//! Native handle table
//!
//! Tracks every object the bridge hands across the native boundary. Entries
//! form a tree (instance → outer proxy → dispatch proxy); releasing a handle
//! releases its descendants.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::security::ContextId;
use crate::typecache::TypeDescriptor;
use crate::types::{InterfaceId, NativeHandle};
use super::dispatch::DispatchTarget;

/// Handles are spaced like aligned pointers
const HANDLE_STRIDE: usize = 0x10;

/// What a handle refers to
#[derive(Clone)]
pub enum HandleKind {
    /// An activated instance (the owner of its proxies)
    Instance {
        iid: InterfaceId,
        /// Controlling outer object when aggregated
        outer: Option<NativeHandle>,
    },
    /// Outer COM-visible proxy
    OuterProxy {
        iid: InterfaceId,
        descriptor: Arc<TypeDescriptor>,
    },
    /// Inner object forwarding late-bound calls
    DispatchProxy {
        outer: NativeHandle,
        target: Arc<dyn DispatchTarget>,
    },
}

impl HandleKind {
    fn label(&self) -> &'static str {
        match self {
            Self::Instance { .. } => "instance",
            Self::OuterProxy { .. } => "outer-proxy",
            Self::DispatchProxy { .. } => "dispatch-proxy",
        }
    }
}

/// Entry in the handle table
#[derive(Clone)]
pub struct HandleEntry {
    pub handle: NativeHandle,
    pub kind: HandleKind,
    /// Handle this entry is released with
    pub parent: Option<NativeHandle>,
    /// Context the object lives in
    pub context: ContextId,
}

/// Thread-safe table of live native handles
pub struct HandleTable {
    entries: RwLock<HashMap<NativeHandle, HandleEntry>>,
    next: AtomicUsize,
}

impl HandleTable {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next: AtomicUsize::new(1),
        }
    }

    /// Allocate a handle for a new object
    pub fn allocate(&self, kind: HandleKind, parent: Option<NativeHandle>, context: ContextId) -> NativeHandle {
        let handle = NativeHandle(self.next.fetch_add(1, Ordering::SeqCst) * HANDLE_STRIDE);
        trace!(%handle, kind = kind.label(), ?parent, "handle allocated");
        let entry = HandleEntry {
            handle,
            kind,
            parent,
            context,
        };
        self.entries.write().insert(handle, entry);
        handle
    }

    /// Look up a live handle
    pub fn get(&self, handle: NativeHandle) -> Option<HandleEntry> {
        self.entries.read().get(&handle).cloned()
    }

    pub fn contains(&self, handle: NativeHandle) -> bool {
        self.entries.read().contains_key(&handle)
    }

    /// Live handles whose parent is `handle`
    pub fn children(&self, handle: NativeHandle) -> Vec<NativeHandle> {
        self.entries
            .read()
            .values()
            .filter(|e| e.parent == Some(handle))
            .map(|e| e.handle)
            .collect()
    }

    /// Release a handle and all of its descendants
    ///
    /// Returns the number of entries removed; zero when the handle was
    /// already released.
    pub fn release(&self, handle: NativeHandle) -> usize {
        let mut entries = self.entries.write();
        let mut pending = vec![handle];
        let mut removed = 0;

        while let Some(current) = pending.pop() {
            if entries.remove(&current).is_none() {
                continue;
            }
            removed += 1;
            pending.extend(
                entries
                    .values()
                    .filter(|e| e.parent == Some(current))
                    .map(|e| e.handle),
            );
        }

        if removed > 0 {
            trace!(%handle, removed, "handle released");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}
