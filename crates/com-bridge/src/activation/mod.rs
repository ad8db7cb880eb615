//! Activation
//!
//! - Class factory creating proxy-backed instances
//! - Server lock count
//! - Service moniker parsing

mod class_factory;
mod moniker;

pub use class_factory::*;
pub use moniker::*;
