//! Document transformers applied between conversion and embedding.

pub mod cleaner;
pub mod splitter;

pub use cleaner::DocumentCleaner;
pub use splitter::{SimpleSplitter, SplitBy};
