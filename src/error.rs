//! Error taxonomy for loading, resolving, and synchronizing models.
//!
//! Every variant here is recoverable at some granularity: a document, a single
//! model, a single member, or one reload cycle. Nothing in this crate lets one
//! bad document abort a whole load.

use crate::model::{MemberKind, ModelId};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure tied to one document, model, or member during a load cycle.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// Bytes were not JSON, or a qualifying candidate had malformed fields.
    #[error("{document}: {reason}")]
    DocumentParse { document: String, reason: String },

    /// Resolution was requested for an id that is not in the graph.
    #[error("model {0} is not present in the document set")]
    UnknownModel(ModelId),

    #[error("model {model} extends {base}, which is not present in the document set")]
    UnresolvedBase { model: ModelId, base: ModelId },

    /// `extends` edges loop back onto the traversal path.
    #[error("model {model} has cyclic inheritance: {}", display_chain(.chain))]
    CyclicInheritance { model: ModelId, chain: Vec<ModelId> },

    #[error("{kind} entry #{index} in {owner} is missing '{field}'")]
    MemberField {
        owner: ModelId,
        kind: MemberKind,
        index: usize,
        field: &'static str,
    },
}

/// Failure of a whole reload cycle. The published snapshot stays untouched.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unable to list documents under {}", location.display())]
    SourceUnavailable {
        location: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to read document {}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn display_chain(chain: &[ModelId]) -> String {
    chain
        .iter()
        .map(ModelId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
