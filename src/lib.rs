//! Flattened, inheritance-aware repository of DTDL interface models.
//!
//! The crate turns a folder of interface documents into a queryable snapshot:
//! for each interface id, every declared and inherited Property, Telemetry,
//! and Relationship, with diamond-inherited members collapsed to one. The
//! pipeline is `DocumentSource` -> `ModelGraph` -> `resolver` ->
//! `ModelRepository`, run once via `ModelRepository::load_dir` or repeatedly by
//! `RepositorySync`, which republishes a fresh snapshot whenever the folder
//! changes. Readers only ever see whole snapshots.

use std::io;
use tracing_subscriber::EnvFilter;

pub mod attributes;
pub mod error;
pub mod graph;
pub mod model;
pub mod repository;
pub mod resolver;
pub mod schema;
pub mod settings;
pub mod source;
pub mod sync;

pub use attributes::{AttributeDescriptor, AttributeKind, attribute_descriptors, model_selector};
pub use error::{ModelError, SyncError};
pub use graph::{ModelGraph, SourceDocument};
pub use model::{
    Member, MemberId, MemberKind, MemberSchema, ModelId, RawDocument, ResolvedModel,
};
pub use repository::{ModelRepository, RepositoryHandle};
pub use resolver::{Resolution, resolve, resolve_all};
pub use schema::DefaultValue;
pub use settings::Settings;
pub use source::{DocumentSource, FsDocumentSource, SourceEntry};
pub use sync::{
    ListingDiff, RepositoryChanged, RepositorySync, SyncConfig, SyncHandle, SyncState,
    TickOutcome,
};

const DEFAULT_LOG_FILTER: &str = "info";

/// Install the stderr log subscriber used by the helper binaries.
///
/// `RUST_LOG` overrides the default `info` filter. Calling this twice is
/// harmless; the second call leaves the first subscriber in place.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
