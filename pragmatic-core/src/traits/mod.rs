//! Core traits for the pipeline engine.
//!
//! Stages wrap external collaborators through a single [`Component`] trait;
//! the [`StageRole`] a component declares fixes its port schema.

pub mod component;
pub mod role;

pub use component::*;
pub use role::*;
