//! Expands a cluster spec into roles, slot ownership and the formation commands.
mod plan;
mod slots;
pub use plan::*;
pub use slots::*;
