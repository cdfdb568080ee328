//! Flattens interfaces over their `extends` graph.
//!
//! Traversal is depth-first and pre-order: a model's own contents are
//! collected before any base, and bases are visited in declaration order.
//! A base reached a second time (diamond inheritance) is not traversed again,
//! so its members are collected once, on the path that found it first. After
//! the walk each member list is deduplicated by id, first occurrence wins.
//!
//! Failures are scoped: an unknown base or an inheritance cycle fails only the
//! model being resolved, and a malformed content entry is skipped on its own.

use crate::error::ModelError;
use crate::graph::ModelGraph;
use crate::model::resolved::dedup_first_wins;
use crate::model::{Member, MemberKind, ModelId, RawDocument, ResolvedModel};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Default)]
/// Outcome of resolving every interface in a graph.
pub struct Resolution {
    pub models: BTreeMap<ModelId, ResolvedModel>,
    pub failures: BTreeMap<ModelId, ModelError>,
}

/// Resolve one interface against the graph.
pub fn resolve(root: &ModelId, graph: &ModelGraph) -> Result<ResolvedModel, ModelError> {
    let document = graph
        .get(root)
        .ok_or_else(|| ModelError::UnknownModel(root.clone()))?;

    let mut walk = Walk {
        root,
        graph,
        bases: Vec::new(),
        path: vec![root.clone()],
        properties: Vec::new(),
        telemetries: Vec::new(),
        relationships: Vec::new(),
        skipped: Vec::new(),
    };
    walk.visit(document)?;

    let Walk {
        bases,
        properties,
        telemetries,
        relationships,
        skipped,
        ..
    } = walk;
    Ok(ResolvedModel {
        document: document.clone(),
        bases,
        properties: dedup_first_wins(properties),
        telemetries: dedup_first_wins(telemetries),
        relationships: dedup_first_wins(relationships),
        skipped,
    })
}

/// Resolve every interface in the graph as its own root.
///
/// A failing model is recorded in `failures` and never aborts the others.
pub fn resolve_all(graph: &ModelGraph) -> Resolution {
    let mut resolution = Resolution::default();
    for id in graph.ids() {
        match resolve(id, graph) {
            Ok(model) => {
                for skipped in &model.skipped {
                    warn!(model = %id, error = %skipped, "skipping content entry");
                }
                resolution.models.insert(id.clone(), model);
            }
            Err(err) => {
                warn!(model = %id, error = %err, "model failed to resolve");
                resolution.failures.insert(id.clone(), err);
            }
        }
    }
    resolution
}

struct Walk<'a> {
    root: &'a ModelId,
    graph: &'a ModelGraph,
    bases: Vec<ModelId>,
    /// Interfaces on the current descent, root first.
    path: Vec<ModelId>,
    properties: Vec<Member>,
    telemetries: Vec<Member>,
    relationships: Vec<Member>,
    skipped: Vec<ModelError>,
}

impl<'a> Walk<'a> {
    fn visit(&mut self, document: &'a RawDocument) -> Result<(), ModelError> {
        self.collect_contents(document);

        for base in &document.extends {
            if self.path.contains(base) {
                let mut chain = self.path.clone();
                chain.push(base.clone());
                return Err(ModelError::CyclicInheritance {
                    model: self.root.clone(),
                    chain,
                });
            }
            if self.bases.contains(base) {
                continue;
            }
            let base_document =
                self.graph
                    .get(base)
                    .ok_or_else(|| ModelError::UnresolvedBase {
                        model: self.root.clone(),
                        base: base.clone(),
                    })?;
            self.bases.push(base.clone());
            self.path.push(base.clone());
            self.visit(base_document)?;
            self.path.pop();
        }
        Ok(())
    }

    fn collect_contents(&mut self, document: &RawDocument) {
        for (index, entry) in document.contents.iter().enumerate() {
            match Member::from_entry(&document.id, index, entry) {
                Ok(Some(member)) => match member.kind {
                    MemberKind::Property => self.properties.push(member),
                    MemberKind::Telemetry => self.telemetries.push(member),
                    MemberKind::Relationship => self.relationships.push(member),
                },
                Ok(None) => {}
                Err(err) => self.skipped.push(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MemberId;
    use crate::schema::DefaultValue;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn interface(id: &str, extends: Value, contents: Value) -> Value {
        json!({
            "@context": "dtmi:dtdl:context;2",
            "@id": id,
            "@type": "Interface",
            "extends": extends,
            "contents": contents
        })
    }

    fn property(name: &str, schema: &str) -> Value {
        json!({"@type": "Property", "name": name, "schema": schema})
    }

    fn names(members: &[Member]) -> Vec<&str> {
        members.iter().map(|m| m.name.as_str()).collect()
    }

    fn ids(values: &[ModelId]) -> Vec<&str> {
        values.iter().map(ModelId::as_str).collect()
    }

    #[test]
    fn single_inheritance_collects_own_members_first() {
        let graph = ModelGraph::from_values([
            interface("A;1", json!([]), json!([property("speed", "double")])),
            interface("B;1", json!("A;1"), json!([property("label", "string")])),
        ]);
        let resolved = resolve(&ModelId::from("B;1"), &graph).unwrap();
        assert_eq!(ids(&resolved.bases), vec!["A;1"]);
        assert_eq!(names(&resolved.properties), vec!["label", "speed"]);
        let speed = resolved
            .member(&MemberId::from("A;1#speed"))
            .and_then(|m| m.schema.as_ref())
            .unwrap();
        assert_eq!(speed.target_type, "double");
        assert_eq!(speed.default, DefaultValue::Double(0.0));
    }

    #[test]
    fn diamond_base_is_visited_once() {
        let graph = ModelGraph::from_values([
            interface("C;1", json!([]), json!([property("shared", "integer")])),
            interface("A;1", json!("C;1"), json!([property("a", "boolean")])),
            interface("B;1", json!(["C;1"]), json!([property("b", "long")])),
            interface("R;1", json!(["A;1", "B;1"]), json!([])),
        ]);
        let resolved = resolve(&ModelId::from("R;1"), &graph).unwrap();
        assert_eq!(ids(&resolved.bases), vec!["A;1", "C;1", "B;1"]);
        assert_eq!(names(&resolved.properties), vec!["a", "shared", "b"]);
    }

    #[test]
    fn own_member_shadows_inherited_member_with_same_id() {
        let graph = ModelGraph::from_values([
            interface(
                "Base;1",
                json!([]),
                json!([{"@id": "dtmi:m:speed;1", "@type": "Property", "name": "speedBase", "schema": "float"}]),
            ),
            interface(
                "Root;1",
                json!("Base;1"),
                json!([{"@id": "dtmi:m:speed;1", "@type": "Property", "name": "speedRoot", "schema": "double"}]),
            ),
        ]);
        let resolved = resolve(&ModelId::from("Root;1"), &graph).unwrap();
        assert_eq!(names(&resolved.properties), vec!["speedRoot"]);
    }

    #[test]
    fn earlier_base_wins_over_later_base() {
        let shared = |name: &str| {
            json!([{"@id": "dtmi:m:shared;1", "@type": "Telemetry", "name": name, "schema": "double"}])
        };
        let graph = ModelGraph::from_values([
            interface("First;1", json!([]), shared("fromFirst")),
            interface("Second;1", json!([]), shared("fromSecond")),
            interface("Root;1", json!(["First;1", "Second;1"]), json!([])),
        ]);
        let resolved = resolve(&ModelId::from("Root;1"), &graph).unwrap();
        assert_eq!(names(&resolved.telemetries), vec!["fromFirst"]);
    }

    #[test]
    fn members_are_split_by_kind() {
        let graph = ModelGraph::from_values([interface(
            "M;1",
            json!([]),
            json!([
                {"@type": ["Telemetry", "Temperature"], "name": "temp", "schema": "double", "unit": "degreeCelsius"},
                {"@type": "Relationship", "name": "parent"},
                {"@type": "Component", "name": "c", "schema": "X;1"},
                property("p", "string")
            ]),
        )]);
        let resolved = resolve(&ModelId::from("M;1"), &graph).unwrap();
        assert_eq!(names(&resolved.properties), vec!["p"]);
        assert_eq!(names(&resolved.telemetries), vec!["temp"]);
        assert_eq!(names(&resolved.relationships), vec!["parent"]);
    }

    #[test]
    fn unknown_root_and_missing_base_fail_one_model() {
        let graph = ModelGraph::from_values([
            interface("Ok;1", json!([]), json!([])),
            interface("Broken;1", json!("Missing;1"), json!([])),
            interface("Child;1", json!("Broken;1"), json!([])),
        ]);
        assert_eq!(
            resolve(&ModelId::from("Nope;1"), &graph).unwrap_err(),
            ModelError::UnknownModel(ModelId::from("Nope;1"))
        );

        let resolution = resolve_all(&graph);
        assert_eq!(
            resolution.models.keys().map(ModelId::as_str).collect::<Vec<_>>(),
            vec!["Ok;1"]
        );
        assert_eq!(
            resolution.failures.get(&ModelId::from("Child;1")),
            Some(&ModelError::UnresolvedBase {
                model: ModelId::from("Child;1"),
                base: ModelId::from("Missing;1"),
            })
        );
        assert!(resolution.failures.contains_key(&ModelId::from("Broken;1")));
    }

    #[test]
    fn cycles_fail_closed() {
        let graph = ModelGraph::from_values([
            interface("A;1", json!("B;1"), json!([])),
            interface("B;1", json!("A;1"), json!([])),
            interface("Self;1", json!("Self;1"), json!([])),
        ]);
        let err = resolve(&ModelId::from("A;1"), &graph).unwrap_err();
        assert_eq!(
            err,
            ModelError::CyclicInheritance {
                model: ModelId::from("A;1"),
                chain: vec![ModelId::from("A;1"), ModelId::from("B;1"), ModelId::from("A;1")],
            }
        );
        assert!(matches!(
            resolve(&ModelId::from("Self;1"), &graph),
            Err(ModelError::CyclicInheritance { .. })
        ));
    }

    #[test]
    fn malformed_entries_are_skipped_not_fatal() {
        let graph = ModelGraph::from_values([interface(
            "M;1",
            json!([]),
            json!([
                {"@type": "Property", "schema": "double"},
                property("ok", "double")
            ]),
        )]);
        let resolved = resolve(&ModelId::from("M;1"), &graph).unwrap();
        assert_eq!(names(&resolved.properties), vec!["ok"]);
        assert_eq!(resolved.skipped.len(), 1);
    }
}
