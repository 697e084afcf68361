//! Minimal RESP2 client for the cluster formation and inspection commands.
mod control;
mod resp;
pub use control::*;
pub use resp::*;
