//! Domain models and folder-naming logic: the vocabulary every other module builds on.

pub mod models;
pub mod parser;
pub mod structure;

pub use models::*;
pub use parser::FolderParser;
pub use structure::StructureDetector;
