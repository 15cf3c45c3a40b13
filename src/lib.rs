//! band-archivist: indexes a local music collection by folder convention,
//! tracks per-band metadata, and migrates folder layouts between naming
//! conventions.

pub mod cli;
pub mod core;
pub mod domain;
pub mod migration;
pub mod query;
pub mod scanner;
pub mod storage;

pub use core::config::LibraryConfig;
pub use core::errors::{LibraryError, OperationOutcome, OperationStatus};
pub use domain::models::{
    Album, AlbumAnalysis, AlbumType, BandAnalysis, BandIndexEntry, BandMetadata, CollectionIndex,
    CollectionInsight, CollectionStats, FolderStructure, StructureConsistency, StructureType,
};
pub use domain::parser::FolderParser;
pub use domain::structure::StructureDetector;
pub use migration::{MigrationEngine, MigrationRequest, MigrationType};
pub use query::{QueryEngine, QueryRequest, QueryResponse};
pub use scanner::Scanner;
pub use storage::{AtomicStore, BandMetadataStore, CollectionIndexStore};
