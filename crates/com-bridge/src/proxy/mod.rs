//! Proxy construction
//!
//! - Handle table: live native handles and their ownership tree
//! - Provider: builds the outer and dispatch proxies, status-code convention
//! - Creator: resolves the interface, drives the provider, returns a
//!   disposable [`ComProxy`]

mod creator;
mod dispatch;
mod handle;
mod provider;

pub use creator::*;
pub use dispatch::*;
pub use handle::*;
pub use provider::*;
