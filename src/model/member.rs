//! Resolved content entries.
//!
//! Members are built from untyped content records one at a time. An entry that
//! is not a Property, Telemetry, or Relationship is ignored; an entry missing a
//! required field is rejected on its own with `ModelError::MemberField`.

use crate::error::ModelError;
use crate::model::identity::{MemberId, MemberKind, ModelId};
use crate::schema::{self, DefaultValue};
use serde::Serialize;
use serde_json::{Map, Value};

const PREFERRED_LOCALE: &str = "en";

#[derive(Clone, Debug, PartialEq, Serialize)]
/// Translated schema of a Property or Telemetry member.
pub struct MemberSchema {
    /// Source tag, or the lower-cased `@type` of a complex schema.
    pub source_tag: String,
    pub target_type: String,
    pub default: DefaultValue,
    /// Raw schema value, kept so complex shapes pass through untouched.
    pub raw: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: MemberKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<MemberSchema>,
}

impl MemberSchema {
    fn from_raw(raw: &Value) -> Option<Self> {
        let source_tag = schema::schema_tag(raw)?;
        Some(Self {
            target_type: schema::target_type(&source_tag).to_string(),
            default: schema::default_value(&source_tag),
            source_tag,
            raw: raw.clone(),
        })
    }
}

impl Member {
    /// Build a member from the `index`-th content entry of `owner`.
    ///
    /// Returns `Ok(None)` for entries that are not members (components,
    /// commands, records without a recognizable `@type`).
    pub fn from_entry(
        owner: &ModelId,
        index: usize,
        entry: &Value,
    ) -> Result<Option<Self>, ModelError> {
        let Some(kind) = entry.get("@type").and_then(MemberKind::classify) else {
            return Ok(None);
        };
        let missing = |field: &'static str| ModelError::MemberField {
            owner: owner.clone(),
            kind,
            index,
            field,
        };

        let name = entry
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| missing("name"))?;

        let schema = if kind.requires_schema() {
            let raw = entry.get("schema").ok_or_else(|| missing("schema"))?;
            Some(MemberSchema::from_raw(raw).ok_or_else(|| missing("schema"))?)
        } else {
            None
        };

        let id = entry
            .get("@id")
            .and_then(Value::as_str)
            .map(MemberId::from)
            .unwrap_or_else(|| MemberId::derived(owner, name));

        Ok(Some(Self {
            id,
            name: name.to_string(),
            display_name: entry
                .get("displayName")
                .and_then(localized)
                .unwrap_or_else(|| name.to_string()),
            description: entry.get("description").and_then(localized),
            kind,
            schema,
        }))
    }
}

/// Resolve a possibly-localized string.
///
/// Plain strings are returned as-is. Locale maps prefer `"en"`, then the
/// smallest locale key holding a string.
pub fn localized(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Object(locales) => preferred_locale(locales).map(str::to_string),
        _ => None,
    }
}

fn preferred_locale(locales: &Map<String, Value>) -> Option<&str> {
    if let Some(text) = locales.get(PREFERRED_LOCALE).and_then(Value::as_str) {
        return Some(text);
    }
    let mut candidates: Vec<(&String, &str)> = locales
        .iter()
        .filter_map(|(locale, text)| text.as_str().map(|text| (locale, text)))
        .collect();
    candidates.sort_by(|a, b| a.0.cmp(b.0));
    candidates.first().map(|(_, text)| *text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn owner() -> ModelId {
        ModelId::from("dtmi:x:owner;1")
    }

    #[test]
    fn property_gets_translated_schema_and_derived_id() {
        let entry = json!({"@type": "Property", "name": "speed", "schema": "double"});
        let member = Member::from_entry(&owner(), 0, &entry).unwrap().unwrap();
        assert_eq!(member.id.as_str(), "dtmi:x:owner;1#speed");
        assert_eq!(member.display_name, "speed");
        assert_eq!(member.description, None);
        let schema = member.schema.unwrap();
        assert_eq!(schema.target_type, "double");
        assert_eq!(schema.default, DefaultValue::Double(0.0));
    }

    #[test]
    fn explicit_id_wins_over_derived() {
        let entry = json!({
            "@id": "dtmi:x:shared:speed;1",
            "@type": "Telemetry",
            "name": "speed",
            "schema": "float"
        });
        let member = Member::from_entry(&owner(), 0, &entry).unwrap().unwrap();
        assert_eq!(member.id.as_str(), "dtmi:x:shared:speed;1");
        assert_eq!(member.kind, MemberKind::Telemetry);
    }

    #[test]
    fn display_name_and_description_prefer_english() {
        let entry = json!({
            "@type": "Relationship",
            "name": "parent",
            "displayName": {"de": "Eltern", "en": "Parent"},
            "description": {"fr": "Parent direct", "de": "Direkter Elternteil"}
        });
        let member = Member::from_entry(&owner(), 0, &entry).unwrap().unwrap();
        assert_eq!(member.display_name, "Parent");
        assert_eq!(member.description.as_deref(), Some("Direkter Elternteil"));
        assert!(member.schema.is_none());
    }

    #[test]
    fn locale_map_without_strings_falls_back_to_name() {
        let entry = json!({
            "@type": "Relationship",
            "name": "parent",
            "displayName": {"en": 3}
        });
        let member = Member::from_entry(&owner(), 0, &entry).unwrap().unwrap();
        assert_eq!(member.display_name, "parent");
    }

    #[test]
    fn missing_fields_are_member_errors() {
        let no_name = json!({"@type": "Property", "schema": "double"});
        assert_eq!(
            Member::from_entry(&owner(), 3, &no_name).unwrap_err(),
            ModelError::MemberField {
                owner: owner(),
                kind: MemberKind::Property,
                index: 3,
                field: "name",
            }
        );
        let no_schema = json!({"@type": "Telemetry", "name": "t"});
        assert!(matches!(
            Member::from_entry(&owner(), 0, &no_schema),
            Err(ModelError::MemberField { field: "schema", .. })
        ));
    }

    #[test]
    fn non_members_are_ignored() {
        let component = json!({"@type": "Component", "name": "c", "schema": "dtmi:x:c;1"});
        assert_eq!(Member::from_entry(&owner(), 0, &component).unwrap(), None);
        assert_eq!(Member::from_entry(&owner(), 0, &json!("Property")).unwrap(), None);
    }

    #[test]
    fn complex_schema_passes_through() {
        let raw = json!({"@type": "Enum", "valueSchema": "integer", "enumValues": []});
        let entry = json!({"@type": "Property", "name": "mode", "schema": raw.clone()});
        let schema = Member::from_entry(&owner(), 0, &entry)
            .unwrap()
            .unwrap()
            .schema
            .unwrap();
        assert_eq!(schema.target_type, "enum");
        assert_eq!(schema.default, DefaultValue::String(String::new()));
        assert_eq!(schema.raw, raw);
    }
}
