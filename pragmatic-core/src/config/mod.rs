//! Configuration for pipeline topologies.
//!
//! [`Settings`] is an immutable base configuration; per-invocation changes are
//! expressed as a [`SettingsOverlay`] and applied once to produce a new value.

pub mod settings;

pub use settings::*;
