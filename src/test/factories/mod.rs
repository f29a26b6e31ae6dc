//! Factories for layouts, host types and dispatch components.

mod dispatch;
mod layout;

pub use dispatch::*;
pub use layout::*;
