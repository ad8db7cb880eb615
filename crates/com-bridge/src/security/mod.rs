//! Security perimeter
//!
//! One boolean per calling context gating cross-context dispatch.

mod perimeter;

pub use perimeter::*;
