//! Load stage: raw document bytes into a keyed interface graph.
//!
//! Each blob may hold a single JSON record or an array of records. Records
//! that do not carry the interface tag set are dropped silently because the
//! models folder may contain unrelated JSON. Blobs that are not JSON at all,
//! and interfaces with malformed fields, are recorded as `DocumentParse`
//! errors and skipped.

use crate::error::ModelError;
use crate::model::{ModelId, RawDocument};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Clone, Debug)]
/// One document's bytes plus the path it was read from.
pub struct SourceDocument {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
/// Interface documents of one load cycle, keyed by `@id`.
pub struct ModelGraph {
    documents: BTreeMap<ModelId, RawDocument>,
    rejected: Vec<ModelError>,
}

impl ModelGraph {
    /// Parse every blob and key the qualifying interfaces by id.
    ///
    /// Duplicate ids resolve last-wins in input order, so callers should pass
    /// documents in listing order.
    pub fn build(documents: &[SourceDocument]) -> Self {
        let mut graph = ModelGraph::default();
        for document in documents {
            let label = document.path.display().to_string();
            let value: Value = match serde_json::from_slice(&document.bytes) {
                Ok(value) => value,
                Err(err) => {
                    graph.reject(ModelError::DocumentParse {
                        document: label,
                        reason: format!("invalid JSON: {err}"),
                    });
                    continue;
                }
            };
            match value {
                Value::Array(candidates) => {
                    for candidate in candidates {
                        graph.admit(&label, candidate);
                    }
                }
                candidate => graph.admit(&label, candidate),
            }
        }
        graph
    }

    /// Build a graph from already-parsed candidates (used by tests and tools).
    pub fn from_values(candidates: impl IntoIterator<Item = Value>) -> Self {
        let mut graph = ModelGraph::default();
        for candidate in candidates {
            graph.admit("<inline>", candidate);
        }
        graph
    }

    pub fn get(&self, id: &ModelId) -> Option<&RawDocument> {
        self.documents.get(id)
    }

    pub fn contains(&self, id: &ModelId) -> bool {
        self.documents.contains_key(id)
    }

    /// Iterates interface ids in stable order.
    pub fn ids(&self) -> impl Iterator<Item = &ModelId> {
        self.documents.keys()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents and candidates skipped while building.
    pub fn rejected(&self) -> &[ModelError] {
        &self.rejected
    }

    fn admit(&mut self, label: &str, candidate: Value) {
        if !RawDocument::qualifies(&candidate) {
            debug!(document = label, "skipping non-interface record");
            return;
        }
        match RawDocument::from_candidate(candidate) {
            Ok(document) => {
                if let Some(previous) = self.documents.insert(document.id.clone(), document) {
                    debug!(document = label, id = %previous.id, "replacing earlier interface with same id");
                }
            }
            Err(reason) => self.reject(ModelError::DocumentParse {
                document: label.to_string(),
                reason,
            }),
        }
    }

    fn reject(&mut self, err: ModelError) {
        warn!(error = %err, "skipping document");
        self.rejected.push(err);
    }
}
