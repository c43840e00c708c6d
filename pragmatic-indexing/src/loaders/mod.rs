//! Converters turning raw sources into documents.

pub mod text_file;

pub use text_file::TextFileConverter;
