//! Reads back what the cluster says about itself and compares it with the
//! formation plan.
mod node_table;
mod topology_verifier;
pub use node_table::*;
pub use topology_verifier::*;
