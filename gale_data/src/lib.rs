//! Shared static data model for Gale regions.

pub mod defs;
pub mod validate;

pub use defs::*;
pub use validate::{ValidationError, validate_region};
