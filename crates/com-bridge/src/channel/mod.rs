//! Channel builder settings
//!
//! Read access to the channel factory and endpoint behaviors for proxy
//! construction. Channel factories themselves are external collaborators.

mod behaviors;
mod settings;

pub use behaviors::*;
pub use settings::*;
