//! Data types exchanged between pipeline stages.

pub mod answer;
pub mod document;
pub mod value;

pub use answer::*;
pub use document::*;
pub use value::*;
