//! Static table of known interface shapes

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::{iid, InterfaceId, TypeLibraryId};
use super::descriptor::{InterfaceKind, TypeKey, TypeRequest, TypeShape};

/// Known interface and type-library shapes
///
/// Lookup-only: a miss here is what `no_assembly_generation` turns into
/// `TypeNotFound`. Server-scoped requests fall back to the plain interface
/// shape.
pub struct StaticTypeTable {
    interfaces: RwLock<HashMap<InterfaceId, TypeShape>>,
    type_libraries: RwLock<HashMap<TypeLibraryId, TypeShape>>,
}

impl StaticTypeTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            interfaces: RwLock::new(HashMap::new()),
            type_libraries: RwLock::new(HashMap::new()),
        }
    }

    /// Create a table seeded with the standard COM interfaces
    pub fn with_well_known() -> Self {
        let table = Self::new();
        table.register_interface(
            iid::IUNKNOWN,
            TypeShape::new("IUnknown", InterfaceKind::Unknown)
                .with_method("QueryInterface", 0, 2)
                .with_method("AddRef", 1, 0)
                .with_method("Release", 2, 0),
        );
        table.register_interface(
            iid::IDISPATCH,
            TypeShape::new("IDispatch", InterfaceKind::Dispatch)
                .with_method("GetTypeInfoCount", 3, 1)
                .with_method("GetTypeInfo", 4, 3)
                .with_method("GetIDsOfNames", 5, 5)
                .with_method("Invoke", 6, 8),
        );
        table.register_interface(
            iid::ICLASSFACTORY,
            TypeShape::new("IClassFactory", InterfaceKind::Unknown)
                .with_method("CreateInstance", 3, 3)
                .with_method("LockServer", 4, 1),
        );
        table.register_interface(
            iid::ISUPPORTERRORINFO,
            TypeShape::new("ISupportErrorInfo", InterfaceKind::Unknown)
                .with_method("InterfaceSupportsErrorInfo", 3, 1),
        );
        table.register_interface(
            iid::ICHANNELOPTIONS,
            TypeShape::new("IChannelOptions", InterfaceKind::Dual).with_error_info(true),
        );
        table
    }

    /// Register (or replace) an interface shape
    pub fn register_interface(&self, iid: InterfaceId, shape: TypeShape) {
        self.interfaces.write().insert(iid, shape);
    }

    /// Register (or replace) a type-library shape
    pub fn register_type_library(&self, id: TypeLibraryId, shape: TypeShape) {
        self.type_libraries.write().insert(id, shape);
    }

    /// Look up the shape of an interface
    pub fn interface(&self, iid: &InterfaceId) -> Option<TypeShape> {
        self.interfaces.read().get(iid).cloned()
    }

    pub fn contains(&self, iid: &InterfaceId) -> bool {
        self.interfaces.read().contains_key(iid)
    }

    /// Look up the shape for a resolution request
    pub fn lookup(&self, request: &TypeRequest) -> Option<TypeShape> {
        match &request.key {
            TypeKey::Interface(iid) | TypeKey::ServerScoped { iid, .. } => self.interface(iid),
            TypeKey::TypeLibrary(id) => self.type_libraries.read().get(id).cloned(),
        }
    }

    /// Number of registered shapes
    pub fn len(&self) -> usize {
        self.interfaces.read().len() + self.type_libraries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StaticTypeTable {
    fn default() -> Self {
        Self::with_well_known()
    }
}
