//! Native boundary values: HRESULT status codes and opaque handles

use std::fmt;

use serde::Serialize;

/// 32-bit native status code
///
/// Zero is success; every other value is a failure and is passed through
/// to callers unchanged.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct HResult(pub u32);

impl HResult {
    /// Check for success (exactly zero)
    pub fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Check for failure (any non-zero value)
    pub fn is_failure(self) -> bool {
        !self.is_success()
    }

    /// Raw code
    pub fn code(self) -> u32 {
        self.0
    }
}

impl From<u32> for HResult {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

impl fmt::Debug for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HRESULT(0x{:08x})", self.0)
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// HRESULT codes used at the activation boundary
pub mod hresult {
    use super::HResult;

    /// Operation successful
    pub const S_OK: HResult = HResult(0x00000000);
    /// Operation successful, returning false
    pub const S_FALSE: HResult = HResult(0x00000001);
    /// Unspecified error
    pub const E_FAIL: HResult = HResult(0x80004005);
    /// Invalid pointer
    pub const E_POINTER: HResult = HResult(0x80004003);
    /// No such interface supported
    pub const E_NOINTERFACE: HResult = HResult(0x80004002);
    /// Out of memory
    pub const E_OUTOFMEMORY: HResult = HResult(0x8007000E);
    /// Invalid argument
    pub const E_INVALIDARG: HResult = HResult(0x80070057);
    /// Access denied
    pub const E_ACCESSDENIED: HResult = HResult(0x80070005);
    /// The system cannot find the file specified
    pub const E_FILENOTFOUND: HResult = HResult(0x80070002);
    /// Class does not support aggregation
    pub const CLASS_E_NOAGGREGATION: HResult = HResult(0x80040110);
    /// Class not registered
    pub const REGDB_E_CLASSNOTREG: HResult = HResult(0x80040154);
    /// Invalid moniker syntax
    pub const MK_E_SYNTAX: HResult = HResult(0x800401E4);
    /// Element not found in type library
    pub const TYPE_E_ELEMENTNOTFOUND: HResult = HResult(0x8002802B);
    /// Object is not connected to a server
    pub const CO_E_OBJNOTCONNECTED: HResult = HResult(0x800401FD);
}

/// Opaque native handle
///
/// Handles are non-zero tokens allocated by the handle table; `NULL` is
/// never valid and is what failing native calls hand back.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct NativeHandle(pub usize);

impl NativeHandle {
    /// The invalid handle
    pub const NULL: Self = Self(0);

    /// Check if this is the null handle
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Raw handle value
    pub fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HANDLE({:#x})", self.0)
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
