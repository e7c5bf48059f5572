//! Job lifecycle management for the generation service.
//!
//! Submission goes through [`manager::JobManager`], which records the job in
//! the [`status_table::StatusTable`] and hands its id to the
//! [`queue`]. A single [`worker::GenerationWorker`] drains the queue in FIFO
//! order, calling the generator through the mutex-guarded
//! [`resource::GenerationResource`] and persisting output via an
//! [`artifacts::ArtifactStore`].

pub mod artifacts;
pub mod manager;
pub mod queue;
pub mod resource;
pub mod status_table;
pub mod worker;

pub use manager::JobManager;
