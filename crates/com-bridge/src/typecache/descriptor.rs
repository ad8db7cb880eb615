//! Type descriptors and cache keys

use std::fmt;

use serde::Serialize;

use crate::types::{InterfaceId, ServerTypeId, TypeLibraryId};

/// Dispatch identifier of a method
pub type DispId = i32;

/// Key under which a descriptor is cached
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TypeKey {
    /// Plain interface resolution
    Interface(InterfaceId),
    /// Resolution scoped to one server implementation type
    ServerScoped {
        server: ServerTypeId,
        iid: InterfaceId,
    },
    /// User-defined type from a type library
    TypeLibrary(TypeLibraryId),
}

impl TypeKey {
    /// Interface identifier, if this key names an interface
    pub fn interface_id(&self) -> Option<InterfaceId> {
        match self {
            Self::Interface(iid) | Self::ServerScoped { iid, .. } => Some(*iid),
            Self::TypeLibrary(_) => None,
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interface(iid) => write!(f, "IID {iid}"),
            Self::ServerScoped { server, iid } => write!(f, "IID {iid} on {server}"),
            Self::TypeLibrary(id) => write!(f, "typedef {id}"),
        }
    }
}

/// A resolution request handed to tables and generators
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeRequest {
    pub key: TypeKey,
    pub is_server: bool,
}

impl TypeRequest {
    pub fn new(key: TypeKey, is_server: bool) -> Self {
        Self { key, is_server }
    }
}

/// Calling convention of an interface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum InterfaceKind {
    /// IUnknown-derived, vtable only
    Unknown,
    /// Vtable plus IDispatch
    Dual,
    /// IDispatch only (dispinterface)
    Dispatch,
}

impl InterfaceKind {
    /// Whether calls can be late-bound through IDispatch
    pub fn is_dispatchable(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Where a cached descriptor came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DescriptorOrigin {
    /// Adopted from the static table of known shapes
    Table,
    /// Produced by the type generator
    Synthesized,
}

/// One method slot
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MethodDescriptor {
    pub name: String,
    pub dispid: DispId,
    pub param_count: u16,
}

/// Shape of an interface type, as produced by a table or generator
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TypeShape {
    pub name: String,
    pub kind: InterfaceKind,
    pub methods: Vec<MethodDescriptor>,
    pub supports_error_info: bool,
}

impl TypeShape {
    pub fn new(name: impl Into<String>, kind: InterfaceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            methods: Vec::new(),
            supports_error_info: false,
        }
    }

    pub fn with_method(mut self, name: impl Into<String>, dispid: DispId, param_count: u16) -> Self {
        self.methods.push(MethodDescriptor {
            name: name.into(),
            dispid,
            param_count,
        });
        self
    }

    pub fn with_error_info(mut self, supported: bool) -> Self {
        self.supports_error_info = supported;
        self
    }
}

/// Resolved runtime type
///
/// Created once per cache key and shared as `Arc<TypeDescriptor>` for the
/// lifetime of the cache. `id` is unique within one cache.
#[derive(Debug, Serialize)]
pub struct TypeDescriptor {
    id: u64,
    key: TypeKey,
    shape: TypeShape,
    origin: DescriptorOrigin,
    is_server: bool,
}

impl TypeDescriptor {
    pub(crate) fn new(id: u64, request: TypeRequest, shape: TypeShape, origin: DescriptorOrigin) -> Self {
        Self {
            id,
            key: request.key,
            shape,
            origin,
            is_server: request.is_server,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.shape.name
    }

    pub fn kind(&self) -> InterfaceKind {
        self.shape.kind
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.shape.methods
    }

    /// Look up a method by dispatch id
    pub fn method(&self, dispid: DispId) -> Option<&MethodDescriptor> {
        self.shape.methods.iter().find(|m| m.dispid == dispid)
    }

    pub fn supports_error_info(&self) -> bool {
        self.shape.supports_error_info
    }

    pub fn origin(&self) -> DescriptorOrigin {
        self.origin
    }

    /// Whether the first resolution of this key came from the server side
    pub fn is_server(&self) -> bool {
        self.is_server
    }
}
