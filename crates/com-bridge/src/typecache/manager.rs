//! Type cache manager
//!
//! Resolves interface and type-library identities to descriptors. Entries
//! are created on first resolution and live as long as the manager.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::trace::{self as diag, AssemblyLoadFailure, TypeResolutionFailure};
use crate::types::{
    AssemblyId, BridgeError, Guid, InterfaceId, Result, ServerTypeId, TypeLibVersion, TypeLibraryId,
};
use super::descriptor::{DescriptorOrigin, TypeDescriptor, TypeKey, TypeRequest};
use super::generator::{Module, ModuleLoader, ModuleTable, TypeGenerator};
use super::table::StaticTypeTable;

/// One cache entry. Resolvers of the same key serialize on the slot mutex,
/// so at most one synthesis runs per key.
type Slot = Mutex<Option<Arc<TypeDescriptor>>>;

/// Process-lifetime type cache
///
/// Constructed once at bridge startup and shared by `Arc` with every
/// consumer.
pub struct TypeCacheManager {
    table: StaticTypeTable,
    generator: Option<Arc<dyn TypeGenerator>>,
    loader: Arc<dyn ModuleLoader>,
    slots: Mutex<HashMap<TypeKey, Arc<Slot>>>,
    modules: RwLock<HashMap<AssemblyId, Arc<Module>>>,
    next_id: AtomicU64,
    syntheses: AtomicU64,
}

impl TypeCacheManager {
    /// Create a manager with lookups only (no generator, no modules)
    pub fn new(table: StaticTypeTable) -> Self {
        Self {
            table,
            generator: None,
            loader: Arc::new(ModuleTable::new()),
            slots: Mutex::new(HashMap::new()),
            modules: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            syntheses: AtomicU64::new(0),
        }
    }

    /// Install the generator used on cache misses
    pub fn with_generator(mut self, generator: Arc<dyn TypeGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Install the module loader used by [`resolve_assembly`](Self::resolve_assembly)
    pub fn with_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Table of known shapes
    pub fn table(&self) -> &StaticTypeTable {
        &self.table
    }

    /// Resolve an interface identifier
    pub fn resolve(
        &self,
        iid: &InterfaceId,
        no_assembly_generation: bool,
        is_server: bool,
    ) -> Result<Arc<TypeDescriptor>> {
        let request = TypeRequest::new(TypeKey::Interface(*iid), is_server);
        self.resolve_request(request, no_assembly_generation)
    }

    /// Resolve an interface identifier scoped to one server implementation type
    pub fn resolve_for_server(
        &self,
        server: &ServerTypeId,
        iid: &InterfaceId,
        no_assembly_generation: bool,
        is_server: bool,
    ) -> Result<Arc<TypeDescriptor>> {
        let key = TypeKey::ServerScoped {
            server: server.clone(),
            iid: *iid,
        };
        self.resolve_request(TypeRequest::new(key, is_server), no_assembly_generation)
    }

    /// Resolve a user-defined type from a type library
    ///
    /// `version` is the registered `major.minor` string.
    pub fn resolve_type_library(
        &self,
        lib_id: &Guid,
        version: &str,
        typedef_id: &Guid,
        no_assembly_generation: bool,
    ) -> Result<Arc<TypeDescriptor>> {
        let version: TypeLibVersion = version.parse()?;
        let key = TypeKey::TypeLibrary(TypeLibraryId::new(*lib_id, version, *typedef_id));
        self.resolve_request(TypeRequest::new(key, false), no_assembly_generation)
    }

    /// Resolve an assembly identifier to a loaded module
    ///
    /// The loader runs without the module lock held. Concurrent first
    /// resolutions may each load; the first module stored wins.
    pub fn resolve_assembly(&self, id: &AssemblyId) -> Result<Arc<Module>> {
        if let Some(module) = self.modules.read().get(id) {
            return Ok(module.clone());
        }

        match self.loader.load(id) {
            Some(module) => {
                let module = self
                    .modules
                    .write()
                    .entry(*id)
                    .or_insert_with(|| Arc::new(module))
                    .clone();
                debug!(assembly = %id, name = %module.name, "loaded module");
                Ok(module)
            }
            None => {
                let err = BridgeError::AssemblyNotFound(*id);
                diag::emit(&AssemblyLoadFailure {
                    assembly: *id,
                    error: err.to_string(),
                    hresult: err.hresult(),
                });
                Err(err)
            }
        }
    }

    /// Cached descriptor for a key, without resolving
    pub fn peek(&self, key: &TypeKey) -> Option<Arc<TypeDescriptor>> {
        let slot = self.slots.lock().get(key).cloned()?;
        let entry = slot.lock();
        entry.clone()
    }

    /// Number of cached descriptors
    pub fn len(&self) -> usize {
        let slots: Vec<Arc<Slot>> = self.slots.lock().values().cloned().collect();
        slots.iter().filter(|slot| slot.lock().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of descriptors produced by the generator so far
    pub fn synthesis_count(&self) -> u64 {
        self.syntheses.load(Ordering::SeqCst)
    }

    fn resolve_request(
        &self,
        request: TypeRequest,
        no_assembly_generation: bool,
    ) -> Result<Arc<TypeDescriptor>> {
        loop {
            let slot = {
                let mut slots = self.slots.lock();
                slots.entry(request.key.clone()).or_default().clone()
            };

            let mut entry = slot.lock();
            if let Some(descriptor) = entry.as_ref() {
                trace!(key = %request.key, id = descriptor.id(), "type cache hit");
                return Ok(descriptor.clone());
            }
            // A failed resolver unlinked the slot while we waited on it
            if !self.is_linked(&request.key, &slot) {
                continue;
            }

            return match self.build(&request, no_assembly_generation) {
                Ok(descriptor) => {
                    *entry = Some(descriptor.clone());
                    Ok(descriptor)
                }
                Err(err) => {
                    self.unlink(&request.key, &slot);
                    Err(err)
                }
            };
        }
    }

    fn is_linked(&self, key: &TypeKey, slot: &Arc<Slot>) -> bool {
        self.slots
            .lock()
            .get(key)
            .map_or(false, |current| Arc::ptr_eq(current, slot))
    }

    /// Drop an empty slot so failed lookups leave nothing behind
    fn unlink(&self, key: &TypeKey, slot: &Arc<Slot>) {
        let mut slots = self.slots.lock();
        if slots.get(key).map_or(false, |current| Arc::ptr_eq(current, slot)) {
            slots.remove(key);
        }
    }

    fn build(&self, request: &TypeRequest, no_assembly_generation: bool) -> Result<Arc<TypeDescriptor>> {
        let (shape, origin) = match self.table.lookup(request) {
            Some(shape) => (shape, DescriptorOrigin::Table),
            None => match self.generator.as_ref().filter(|_| !no_assembly_generation) {
                Some(generator) => match generator.generate(request) {
                    Ok(shape) => {
                        self.syntheses.fetch_add(1, Ordering::SeqCst);
                        (shape, DescriptorOrigin::Synthesized)
                    }
                    Err(e) => return Err(self.failure(request, no_assembly_generation, e)),
                },
                None => {
                    let err = BridgeError::TypeNotFound(request.key.to_string());
                    return Err(self.failure(request, no_assembly_generation, err));
                }
            },
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        debug!(key = %request.key, id, name = %shape.name, ?origin, "type cached");
        Ok(Arc::new(TypeDescriptor::new(id, request.clone(), shape, origin)))
    }

    fn failure(&self, request: &TypeRequest, no_assembly_generation: bool, err: BridgeError) -> BridgeError {
        diag::emit(&TypeResolutionFailure {
            key: request.key.to_string(),
            is_server: request.is_server,
            no_assembly_generation,
            error: err.to_string(),
            hresult: err.hresult(),
        });
        err
    }
}

impl Default for TypeCacheManager {
    fn default() -> Self {
        Self::new(StaticTypeTable::with_well_known())
    }
}
