//! Render pipelines, one per material kind.
//!
//! Every pipeline shares the camera bind group at slot 0 and keeps its own
//! material data at slot 1.

pub mod basic;
pub mod fireflies;
pub mod flat;
pub mod portal;
