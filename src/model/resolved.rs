use crate::error::ModelError;
use crate::model::identity::{MemberId, MemberKind, ModelId};
use crate::model::member::Member;
use crate::model::raw::RawDocument;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Serialize)]
/// Fully flattened interface: own and inherited members, deduplicated by id.
pub struct ResolvedModel {
    pub document: RawDocument,
    /// Direct and transitive bases in discovery order.
    pub bases: Vec<ModelId>,
    pub properties: Vec<Member>,
    pub telemetries: Vec<Member>,
    pub relationships: Vec<Member>,
    /// Content entries skipped during resolution.
    #[serde(skip)]
    pub skipped: Vec<ModelError>,
}

impl ResolvedModel {
    pub fn id(&self) -> &ModelId {
        &self.document.id
    }

    /// Members of one kind, in resolution order.
    pub fn members(&self, kind: MemberKind) -> &[Member] {
        match kind {
            MemberKind::Property => &self.properties,
            MemberKind::Telemetry => &self.telemetries,
            MemberKind::Relationship => &self.relationships,
        }
    }

    pub fn member(&self, id: &MemberId) -> Option<&Member> {
        self.properties
            .iter()
            .chain(&self.telemetries)
            .chain(&self.relationships)
            .find(|member| &member.id == id)
    }

    pub fn extends(&self, base: &ModelId) -> bool {
        self.bases.contains(base)
    }
}

/// Keep the first member for each id, preserving order.
pub(crate) fn dedup_first_wins(members: Vec<Member>) -> Vec<Member> {
    let mut seen: BTreeSet<MemberId> = BTreeSet::new();
    members
        .into_iter()
        .filter(|member| seen.insert(member.id.clone()))
        .collect()
}
