pub mod docs;
pub mod generation;
