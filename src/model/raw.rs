//! As-loaded interface documents.
//!
//! A `RawDocument` keeps the original JSON next to the handful of fields the
//! resolver needs. Content entries stay untyped here; they are classified and
//! validated per entry during resolution so one bad entry never costs the
//! whole document.

use crate::model::identity::ModelId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `@type` value that marks a candidate as an interface document.
pub const INTERFACE_MARKER: &str = "Interface";

const CONTEXT_FIELD: &str = "@context";
const ID_FIELD: &str = "@id";
const TYPE_FIELD: &str = "@type";

#[derive(Clone, Debug, PartialEq, Serialize)]
/// One interface definition as it was read from the document source.
pub struct RawDocument {
    pub id: ModelId,
    /// Direct bases in declaration order.
    pub extends: Vec<ModelId>,
    /// Untyped content records in declaration order.
    pub contents: Vec<Value>,
    /// The original document record.
    pub source: Value,
}

#[derive(Deserialize)]
struct InterfaceFields {
    #[serde(rename = "@id")]
    id: ModelId,
    #[serde(default)]
    extends: Option<Extends>,
    #[serde(default)]
    contents: Option<Contents>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Extends {
    One(ModelId),
    Many(Vec<ModelId>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Contents {
    Many(Vec<Value>),
    One(Value),
}

impl RawDocument {
    /// Returns true when a candidate carries the required interface tag set.
    pub fn qualifies(candidate: &Value) -> bool {
        candidate.get(CONTEXT_FIELD).is_some()
            && candidate.get(ID_FIELD).is_some()
            && candidate.get(TYPE_FIELD).and_then(Value::as_str) == Some(INTERFACE_MARKER)
    }

    /// Build a document from a qualifying candidate.
    ///
    /// Callers are expected to check `qualifies` first; the error string
    /// describes which interface field was malformed.
    pub fn from_candidate(candidate: Value) -> Result<Self, String> {
        let fields: InterfaceFields = serde_json::from_value(candidate.clone())
            .map_err(|err| format!("malformed interface: {err}"))?;

        let extends = match fields.extends {
            None => Vec::new(),
            Some(Extends::One(base)) => vec![base],
            Some(Extends::Many(bases)) => bases,
        };
        let contents = match fields.contents {
            None => Vec::new(),
            Some(Contents::Many(entries)) => entries,
            Some(Contents::One(entry)) => vec![entry],
        };

        Ok(Self {
            id: fields.id,
            extends,
            contents,
            source: candidate,
        })
    }
}
