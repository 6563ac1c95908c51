//! Merge structurally identical definitions.
//!
//! Objects and enums with identical bodies in the same namespace collapse
//! into the one with the smallest identifier; references to the others are
//! rewritten. Merging can make further bodies identical (two objects that
//! differed only in which duplicate they referenced), so rounds repeat
//! until nothing changes. Each round removes at least one definition.
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::StageError;
use crate::graph::TypeGraph;
use crate::ident::Identifier;
use crate::ir::{Type, TypeDefinition};
use crate::stage::{ItemPolicy, RunContext, Stage, transform_definitions};
use crate::visitor::TypeVisitor;

pub const ID: &str = "deduplicateTypes";

#[derive(Debug, Clone, Default)]
pub struct DeduplicateTypes {
    dependencies: Vec<String>,
}

impl DeduplicateTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requires(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }
}

type Renames = BTreeMap<Identifier, Identifier>;

/// Duplicate → survivor, for one round.
fn find_duplicates(graph: &TypeGraph) -> anyhow::Result<Renames> {
    // Canonical JSON preserves property order, so equal keys mean equal bodies.
    let mut survivors: BTreeMap<(String, String), Identifier> = BTreeMap::new();
    let mut renames = Renames::new();
    for def in graph.iter().filter(|d| mergeable(d)) {
        let key = (def.name.namespace().to_string(), serde_json::to_string(&def.ty)?);
        match survivors.get(&key) {
            Some(survivor) => {
                renames.insert(def.name.clone(), survivor.clone());
            }
            None => {
                survivors.insert(key, def.name.clone());
            }
        }
    }
    Ok(renames)
}

fn mergeable(def: &TypeDefinition) -> bool {
    matches!(def.ty, Type::Object(_) | Type::Enum(_))
}

fn rename_visitor(renames: Arc<Renames>) -> TypeVisitor<Identifier> {
    TypeVisitor::<Identifier>::new().on_reference(move |_, id, _| {
        Ok(Type::Reference(renames.get(id).cloned().unwrap_or_else(|| id.clone())))
    })
}

impl Stage for DeduplicateTypes {
    fn id(&self) -> &str {
        ID
    }
    fn description(&self) -> &str {
        "Merge structurally identical object and enum definitions"
    }
    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
    fn run(&self, ctx: &RunContext, graph: TypeGraph) -> Result<TypeGraph, StageError> {
        let mut current = graph;
        loop {
            ctx.check()?;
            let renames = find_duplicates(&current)?;
            if renames.is_empty() {
                return Ok(current);
            }
            tracing::debug!(merged = renames.len(), "merging duplicate definitions");

            let mut survivors = TypeGraph::new();
            for def in current.into_iter().filter(|d| !renames.contains_key(&d.name)) {
                survivors.add(def).map_err(anyhow::Error::from)?;
            }
            let visitor = rename_visitor(Arc::new(renames));
            current = transform_definitions(ctx, survivors, ItemPolicy::FailClosed, |def| {
                visitor.visit_definition(def, &def.name)
            })?;
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::ir::{ObjectType, Property};

    fn holder(name: &str, target: &str) -> TypeDefinition {
        fixtures::def(
            name,
            Type::Object(ObjectType::new().with_property("value", Property::new(Type::reference(fixtures::id(target))))),
        )
    }

    #[test]
    fn identical_objects_merge_and_references_follow() {
        let g = fixtures::person_graph()
            .with_definition(fixtures::def("ZipAddress", Type::Object(fixtures::address())))
            .with_definition(holder("UsesZip", "ZipAddress"));
        let out = DeduplicateTypes::new().run(&RunContext::new(), g).unwrap();
        assert!(!out.contains(&fixtures::id("ZipAddress")));
        assert!(out.validate().is_ok());
        let refs = out.get(&fixtures::id("UsesZip")).unwrap().ty.references();
        assert!(refs.contains(&fixtures::id("Address")));
    }

    #[test]
    fn merging_cascades() {
        // A1 == A2; B1 -> A1 and B2 -> A2 only become equal after the first round.
        let leaf = || Type::Object(ObjectType::new().with_property("n", Property::new(Type::int())));
        let g = TypeGraph::from_definitions([
            fixtures::def("A1", leaf()),
            fixtures::def("A2", leaf()),
            holder("B1", "A1"),
            holder("B2", "A2"),
            holder("C", "B2"),
        ])
        .unwrap();
        let out = DeduplicateTypes::new().run(&RunContext::new(), g).unwrap();
        let names: Vec<&str> = out.identifiers().map(|i| i.name()).collect();
        assert_eq!(names, vec!["A1", "B1", "C"]);
        assert!(out.get(&fixtures::id("C")).unwrap().ty.references().contains(&fixtures::id("B1")));
    }

    #[test]
    fn namespaces_and_resources_are_not_merged() {
        let other = TypeDefinition::new(Identifier::new("test/v2", "Address").unwrap(), Type::Object(fixtures::address()));
        let g = fixtures::person_graph().with_definition(other.clone());
        let resource = g.get(&fixtures::id("PersonResource")).unwrap().clone();
        let g = g.with_definition(resource.with_name(fixtures::id("PersonResourceCopy")));
        let out = DeduplicateTypes::new().run(&RunContext::new(), g.clone()).unwrap();
        assert_eq!(out, g);
    }

    #[test]
    fn self_referential_duplicates_terminate() {
        let g = fixtures::cyclic_graph();
        let out = DeduplicateTypes::new().run(&RunContext::new(), g.clone()).unwrap();
        assert_eq!(out, g);
    }
}
