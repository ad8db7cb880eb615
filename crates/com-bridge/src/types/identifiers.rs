//! Identifier types used as cache keys and activation targets
//!
//! - GUID: 128-bit value in the DCE field layout
//! - IID: interface identifier
//! - Type library identity: (library id, version, typedef id)
//! - Assembly id and server implementation type names

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::error::{BridgeError, Result};

/// 128-bit globally unique identifier
///
/// Stored in the DCE field layout so the little-endian wire form and the
/// canonical text form both fall out of the fields directly.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Guid {
    pub time_low: u32,
    pub time_mid: u16,
    pub time_hi_and_version: u16,
    pub clock_seq_hi_and_reserved: u8,
    pub clock_seq_low: u8,
    pub node: [u8; 6],
}

impl Guid {
    /// Size of a GUID in bytes
    pub const SIZE: usize = 16;

    /// Nil GUID (all zeros)
    pub const NIL: Self = Self::from_u128(0);

    /// Build a GUID from its big-endian 128-bit value, e.g.
    /// `0x00000000_0000_0000_c000_000000000046` for IUnknown.
    pub const fn from_u128(v: u128) -> Self {
        Self {
            time_low: (v >> 96) as u32,
            time_mid: (v >> 80) as u16,
            time_hi_and_version: (v >> 64) as u16,
            clock_seq_hi_and_reserved: (v >> 56) as u8,
            clock_seq_low: (v >> 48) as u8,
            node: [
                (v >> 40) as u8,
                (v >> 32) as u8,
                (v >> 24) as u8,
                (v >> 16) as u8,
                (v >> 8) as u8,
                v as u8,
            ],
        }
    }

    /// Generate a random v4 GUID
    pub fn generate() -> Self {
        Self::from_u128(uuid::Uuid::new_v4().as_u128())
    }

    /// Parse from `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`, optionally in braces
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let s = match (s.strip_prefix('{'), s.ends_with('}')) {
            (Some(inner), true) => &inner[..inner.len() - 1],
            (None, false) => s,
            _ => return None,
        };
        if s.len() != 36 {
            return None;
        }
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 5
            || parts[0].len() != 8
            || parts[1].len() != 4
            || parts[2].len() != 4
            || parts[3].len() != 4
            || parts[4].len() != 12
        {
            return None;
        }
        if !s.chars().all(|c| c == '-' || c.is_ascii_hexdigit()) {
            return None;
        }

        let time_low = u32::from_str_radix(parts[0], 16).ok()?;
        let time_mid = u16::from_str_radix(parts[1], 16).ok()?;
        let time_hi_and_version = u16::from_str_radix(parts[2], 16).ok()?;
        let clock = u16::from_str_radix(parts[3], 16).ok()?;

        let mut node = [0u8; 6];
        for (i, byte) in node.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&parts[4][i * 2..i * 2 + 2], 16).ok()?;
        }

        Some(Self {
            time_low,
            time_mid,
            time_hi_and_version,
            clock_seq_hi_and_reserved: (clock >> 8) as u8,
            clock_seq_low: clock as u8,
            node,
        })
    }

    /// Check if this is the nil GUID
    pub fn is_nil(&self) -> bool {
        *self == Self::NIL
    }

    /// Encode to 16 bytes in the little-endian (native COM) layout
    pub fn to_bytes_le(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[0..4].copy_from_slice(&self.time_low.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.time_mid.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.time_hi_and_version.to_le_bytes());
        bytes[8] = self.clock_seq_hi_and_reserved;
        bytes[9] = self.clock_seq_low;
        bytes[10..16].copy_from_slice(&self.node);
        bytes
    }

    /// Decode from 16 bytes in the little-endian layout
    pub fn from_bytes_le(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            time_low: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            time_mid: u16::from_le_bytes([bytes[4], bytes[5]]),
            time_hi_and_version: u16::from_le_bytes([bytes[6], bytes[7]]),
            clock_seq_hi_and_reserved: bytes[8],
            clock_seq_low: bytes[9],
            node: [bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]],
        })
    }
}

impl FromStr for Guid {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| BridgeError::InvalidArgument(format!("malformed GUID: {s:?}")))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.time_low,
            self.time_mid,
            self.time_hi_and_version,
            self.clock_seq_hi_and_reserved,
            self.clock_seq_low,
            self.node[0],
            self.node[1],
            self.node[2],
            self.node[3],
            self.node[4],
            self.node[5]
        )
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GUID({self})")
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Interface identifier (IID)
///
/// Names a COM interface. Immutable; the primary type-cache key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct InterfaceId(pub Guid);

impl InterfaceId {
    /// Create an IID from a GUID
    pub const fn new(guid: Guid) -> Self {
        Self(guid)
    }

    /// Get the underlying GUID
    pub fn guid(&self) -> &Guid {
        &self.0
    }
}

impl FromStr for InterfaceId {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        s.parse().map(Self)
    }
}

impl fmt::Debug for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IID({})", self.0)
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Assembly (loadable module) identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct AssemblyId(pub Guid);

impl fmt::Debug for AssemblyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ASSEMBLY({})", self.0)
    }
}

impl fmt::Display for AssemblyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type library version (`major.minor`, hex digits as registered)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct TypeLibVersion {
    pub major: u16,
    pub minor: u16,
}

impl TypeLibVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl FromStr for TypeLibVersion {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || BridgeError::InvalidArgument(format!("malformed type library version: {s:?}"));
        let s = s.trim();
        let (major, minor) = match s.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (s, "0"),
        };
        let major = u16::from_str_radix(major, 16).map_err(|_| invalid())?;
        let minor = u16::from_str_radix(minor, 16).map_err(|_| invalid())?;
        Ok(Self { major, minor })
    }
}

impl fmt::Display for TypeLibVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}.{:x}", self.major, self.minor)
    }
}

/// Type library identity of a user-defined type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TypeLibraryId {
    /// LIBID of the type library
    pub lib_id: Guid,
    /// Registered library version
    pub version: TypeLibVersion,
    /// GUID of the type definition inside the library
    pub typedef_id: Guid,
}

impl TypeLibraryId {
    pub fn new(lib_id: Guid, version: TypeLibVersion, typedef_id: Guid) -> Self {
        Self {
            lib_id,
            version,
            typedef_id,
        }
    }
}

impl fmt::Display for TypeLibraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.lib_id, self.version, self.typedef_id)
    }
}

/// Name of a server-side implementation type
///
/// Scopes a resolution when several servers implement the same interface.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ServerTypeId(pub String);

impl ServerTypeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
