//! Pluggable type synthesis and module loading

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;

use crate::types::{AssemblyId, InterfaceId, Result};
use super::descriptor::{InterfaceKind, TypeKey, TypeRequest, TypeShape};

/// Strategy for synthesizing a type shape on a cache miss
pub trait TypeGenerator: Send + Sync {
    /// Produce a shape satisfying the requested interface contract
    fn generate(&self, request: &TypeRequest) -> Result<TypeShape>;
}

/// Default generator
///
/// Synthesizes a late-bound dual interface with no known methods; every call
/// goes through IDispatch on the channel side.
#[derive(Clone, Debug, Default)]
pub struct SyntheticTypeGenerator;

impl TypeGenerator for SyntheticTypeGenerator {
    fn generate(&self, request: &TypeRequest) -> Result<TypeShape> {
        let role = if request.is_server { "Server" } else { "Client" };
        let name = match &request.key {
            TypeKey::Interface(iid) => format!("{role}Proxy_{}", simple(iid)),
            TypeKey::ServerScoped { server, iid } => format!("{role}Proxy_{server}_{}", simple(iid)),
            TypeKey::TypeLibrary(id) => format!("UserType_{}_{}", id.typedef_id.time_low, id.version),
        };
        Ok(TypeShape::new(name, InterfaceKind::Dual).with_error_info(true))
    }
}

fn simple(iid: &InterfaceId) -> String {
    iid.to_string().replace('-', "")
}

/// A loaded module
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Module {
    pub id: AssemblyId,
    pub name: String,
    /// Interfaces the module exports
    pub interfaces: Vec<InterfaceId>,
}

impl Module {
    pub fn new(id: AssemblyId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            interfaces: Vec::new(),
        }
    }

    pub fn with_interface(mut self, iid: InterfaceId) -> Self {
        self.interfaces.push(iid);
        self
    }

    pub fn exports(&self, iid: &InterfaceId) -> bool {
        self.interfaces.contains(iid)
    }
}

/// Native module loader collaborator
pub trait ModuleLoader: Send + Sync {
    /// Load the module with the given id, or `None` if it is unknown
    fn load(&self, id: &AssemblyId) -> Option<Module>;
}

/// Loader backed by an in-memory registration table
#[derive(Default)]
pub struct ModuleTable {
    modules: RwLock<HashMap<AssemblyId, Module>>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, module: Module) {
        self.modules.write().insert(module.id, module);
    }
}

impl ModuleLoader for ModuleTable {
    fn load(&self, id: &AssemblyId) -> Option<Module> {
        self.modules.read().get(id).cloned()
    }
}
