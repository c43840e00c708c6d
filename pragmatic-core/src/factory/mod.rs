//! Factories that supply the collaborators wrapped by pipeline stages.
//!
//! Topology recipes never construct collaborators themselves; they ask a
//! [`ComponentRegistry`] for the component registered in a [`ComponentSlot`].

pub mod component;

pub use component::*;
