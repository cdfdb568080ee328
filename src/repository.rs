//! Published, queryable snapshots of resolved models.
//!
//! A `ModelRepository` is immutable once built. Every load cycle builds a new
//! one and `RepositoryHandle::publish` swaps it in with a single atomic store,
//! so readers holding the previous snapshot keep a complete, consistent view
//! until they drop it.

use crate::error::{ModelError, SyncError};
use crate::graph::ModelGraph;
use crate::model::{ModelId, ResolvedModel};
use crate::resolver::{self, Resolution};
use crate::source::{self, DocumentSource};
use arc_swap::ArcSwap;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Default)]
/// Immutable mapping from interface id to resolved model.
pub struct ModelRepository {
    generation: u64,
    models: BTreeMap<ModelId, ResolvedModel>,
    failures: BTreeMap<ModelId, ModelError>,
}

impl ModelRepository {
    /// Wrap one cycle's resolution as a snapshot.
    pub fn from_resolution(generation: u64, resolution: Resolution) -> Self {
        Self {
            generation,
            models: resolution.models,
            failures: resolution.failures,
        }
    }

    /// Load, resolve, and wrap every document under `root` in one pass.
    ///
    /// This is the one-shot startup path; the sync engine uses the same steps
    /// on every reload.
    pub fn load_dir(
        source: &dyn DocumentSource,
        root: &Path,
        extension: Option<&str>,
    ) -> Result<Self, SyncError> {
        let listing = source::list_documents(source, root, extension)?;
        let documents = source::read_documents(source, root, &listing)?;
        let graph = ModelGraph::build(&documents);
        Ok(Self::from_resolution(1, resolver::resolve_all(&graph)))
    }

    /// Publish counter of this snapshot; the empty startup snapshot is 0.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, id: &ModelId) -> Option<&ResolvedModel> {
        self.models.get(id)
    }

    /// Known model ids, in stable order.
    pub fn identifiers(&self) -> BTreeSet<ModelId> {
        self.models.keys().cloned().collect()
    }

    /// Allowed values for a model selector: the empty selection, then every id.
    pub fn allowed_values(&self) -> Vec<String> {
        std::iter::once(String::new())
            .chain(self.models.keys().map(|id| id.0.clone()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModelId, &ResolvedModel)> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Models that failed to resolve in the cycle that built this snapshot.
    pub fn failures(&self) -> &BTreeMap<ModelId, ModelError> {
        &self.failures
    }
}

#[derive(Clone)]
/// Shared pointer to the current snapshot.
///
/// Clones share the same cell. Reads never block; the sync engine is the
/// only writer.
pub struct RepositoryHandle {
    current: Arc<ArcSwap<ModelRepository>>,
}

impl RepositoryHandle {
    /// Start with an empty generation-0 snapshot.
    pub fn new() -> Self {
        Self::with_snapshot(ModelRepository::default())
    }

    pub fn with_snapshot(repository: ModelRepository) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(repository)),
        }
    }

    /// Pin the current snapshot.
    pub fn current(&self) -> Arc<ModelRepository> {
        self.current.load_full()
    }

    /// Replace the current snapshot in one atomic store.
    pub fn publish(&self, repository: ModelRepository) -> Arc<ModelRepository> {
        let repository = Arc::new(repository);
        self.current.store(Arc::clone(&repository));
        repository
    }
}

impl Default for RepositoryHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.current.load();
        f.debug_struct("RepositoryHandle")
            .field("generation", &current.generation)
            .field("models", &current.models.len())
            .finish()
    }
}
