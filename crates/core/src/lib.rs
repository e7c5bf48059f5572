//! Domain types shared by the flux-serve crates.
//!
//! Nothing in here touches I/O: job records and their state machine,
//! generation parameters with request validation, and the error taxonomy.

pub mod error;
pub mod generation;
pub mod job;
pub mod types;
