//! Type cache
//!
//! Maps interface identifiers (and type-library identities) to runtime type
//! descriptors:
//! - Static table of known shapes, consulted first
//! - Pluggable generator for misses when generation is allowed
//! - Per-key single synthesis under concurrency
//! - Assembly id to loaded module resolution

mod descriptor;
mod generator;
mod manager;
mod table;

pub use descriptor::*;
pub use generator::*;
pub use manager::*;
pub use table::*;
