//! Fixtures and mocks shared by the unit tests
mod common;
mod mock;

pub use common::*;
pub use mock::*;
