//! Locked, atomic, backed-up JSON persistence for per-band metadata and the
//! collection index.

pub mod atomic;
pub mod band_metadata;
pub mod collection_index;

pub use atomic::AtomicStore;
pub use band_metadata::{BandMetadataStore, SaveMetadataSummary};
pub use collection_index::CollectionIndexStore;
