//! Port assignment for cluster nodes.
mod allocator;
pub use allocator::*;
