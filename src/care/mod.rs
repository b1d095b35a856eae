//! Caregiver/patient relationship management and the cascading deletes that
//! keep links and dependent records consistent.

pub mod access;
pub mod audit;
pub mod error;
pub mod ids;
pub mod input;
#[cfg(test)]
pub mod memory;
pub mod model;
pub mod pg;
pub mod service;
pub mod store;

pub use error::{CareError, Entity};
pub use store::CareStore;
