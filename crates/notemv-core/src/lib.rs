//! Reference-preserving rename engine for corpora of cross-referencing
//! markdown documents.
//!
//! The crate is sans-IO at its core: documents live behind the
//! [`store::DocumentStore`] trait, the [`index::CorpusIndex`] keeps an
//! eventually consistent view of who references whom, and the
//! [`engine::RenameEngine`] drives renames through a serialized queue so
//! reference rewrites never race each other.

pub mod docpath;
pub mod engine;
pub mod index;
pub mod matcher;
pub mod metadata;
pub mod reference;
pub mod rewrite;
pub mod sanitize;
pub mod settings;
pub mod snapshot;
pub mod store;
pub mod validate;

pub use engine::{RenameEngine, RenameError, RenameJob, RenameReport, RenameWorker};
pub use index::CorpusIndex;
pub use settings::Settings;
pub use store::{DocumentStore, MemoryStore, StoreError};
