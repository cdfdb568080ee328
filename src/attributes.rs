//! Host-facing attribute descriptors for resolved models.
//!
//! A host that binds models to scene objects needs one attribute per member
//! plus a model selector whose allowed values track the repository. This
//! module only describes those attributes; creating or updating them is the
//! host's job.

use crate::model::{Member, MemberKind, ResolvedModel};
use crate::repository::ModelRepository;
use crate::schema::DefaultValue;
use serde::Serialize;
use std::collections::BTreeSet;

/// Attribute that stores the model id bound to a host object.
pub const MODEL_ID_ATTR_NAME: &str = "dtdl:modelId";

const ATTR_PREFIX: &str = "dtdl:";
const SELECTOR_TYPE: &str = "token";
const SELECTOR_GROUP: &str = "Model";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AttributeKind {
    Attribute,
    Relationship,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttributeDescriptor {
    pub attr_name: String,
    pub group: &'static str,
    pub display_name: String,
    pub kind: AttributeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
}

impl AttributeDescriptor {
    pub fn for_member(member: &Member) -> Self {
        let group = match member.kind {
            MemberKind::Property => "Properties",
            MemberKind::Telemetry => "Telemetry",
            MemberKind::Relationship => "Relationships",
        };
        let kind = match member.kind {
            MemberKind::Relationship => AttributeKind::Relationship,
            _ => AttributeKind::Attribute,
        };
        Self {
            attr_name: format!("{ATTR_PREFIX}{}", member.name),
            group,
            display_name: member.display_name.clone(),
            kind,
            type_name: member.schema.as_ref().map(|s| s.target_type.clone()),
            documentation: member.description.clone(),
            default: member.schema.as_ref().map(|s| s.default.clone()),
            allowed_values: Vec::new(),
        }
    }
}

/// One descriptor per attribute name: properties, then telemetry, then
/// relationships, each in resolution order.
///
/// Attribute names carry only the member name, so a member redeclared by a
/// base collapses onto the first one seen (the model's own member wins).
pub fn attribute_descriptors(model: &ResolvedModel) -> Vec<AttributeDescriptor> {
    let mut seen = BTreeSet::new();
    [
        MemberKind::Property,
        MemberKind::Telemetry,
        MemberKind::Relationship,
    ]
    .into_iter()
    .flat_map(|kind| model.members(kind))
    .map(AttributeDescriptor::for_member)
    .filter(|descriptor| seen.insert(descriptor.attr_name.clone()))
    .collect()
}

/// Model selector whose allowed values are the snapshot's model ids.
pub fn model_selector(repository: &ModelRepository) -> AttributeDescriptor {
    AttributeDescriptor {
        attr_name: MODEL_ID_ATTR_NAME.to_string(),
        group: SELECTOR_GROUP,
        display_name: SELECTOR_GROUP.to_string(),
        kind: AttributeKind::Attribute,
        type_name: Some(SELECTOR_TYPE.to_string()),
        documentation: None,
        default: Some(DefaultValue::String(String::new())),
        allowed_values: repository.allowed_values(),
    }
}
