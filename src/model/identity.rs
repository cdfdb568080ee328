use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Versioned interface identifier (e.g., `dtmi:com:example:Thermostat;1`).
///
/// Used as the repository key; ordering is lexical so snapshots iterate in a
/// stable order.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(pub String);

/// Identifier of a resolved member, unique within one resolved model.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl ModelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl MemberId {
    /// Derive a member id from its owning interface and member name.
    ///
    /// Two interfaces declaring the same member name get distinct ids, so only
    /// explicit `@id` collisions shadow each other.
    pub fn derived(owner: &ModelId, name: &str) -> Self {
        MemberId(format!("{}#{}", owner.0, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModelId {
    fn from(value: &str) -> Self {
        ModelId(value.to_string())
    }
}

impl From<&str> for MemberId {
    fn from(value: &str) -> Self {
        MemberId(value.to_string())
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of content entry that survives flattening.
///
/// Components and any other content kinds are not members; `classify` returns
/// `None` for them.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum MemberKind {
    Property,
    Telemetry,
    Relationship,
}

impl MemberKind {
    // Classification priority when a co-typed tag names several kinds.
    const ALL: [MemberKind; 3] = [
        MemberKind::Property,
        MemberKind::Telemetry,
        MemberKind::Relationship,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemberKind::Property => "Property",
            MemberKind::Telemetry => "Telemetry",
            MemberKind::Relationship => "Relationship",
        }
    }

    /// Whether entries of this kind must declare a `schema`.
    pub fn requires_schema(&self) -> bool {
        !matches!(self, MemberKind::Relationship)
    }

    /// Classify a raw content `@type` value.
    ///
    /// A string tag matches when it contains the kind marker; a list of tags
    /// matches when any element equals it. This tolerates co-typed content
    /// such as `["Property", "Temperature"]`.
    pub fn classify(tag: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;
        Self::ALL.into_iter().find(|kind| match tag {
            Value::String(value) => value.contains(kind.as_str()),
            Value::Array(values) => values
                .iter()
                .filter_map(Value::as_str)
                .any(|value| value == kind.as_str()),
            _ => false,
        })
    }

    fn from_str(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MemberKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MemberKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::from_str(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown member kind '{value}'")))
    }
}
