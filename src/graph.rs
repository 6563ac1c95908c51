//! The type graph: identifier → definition.
//!
//! Keys are unique and iteration is always in identifier order, so anything
//! derived from a walk over the graph is deterministic. A graph handed to a
//! stage is consumed or borrowed immutably; stages build a new one.
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::ident::Identifier;
use crate::ir::{Type, TypeDefinition};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TypeDefinition>", into = "Vec<TypeDefinition>")]
pub struct TypeGraph {
    definitions: BTreeMap<Identifier, TypeDefinition>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails on the first identifier seen twice.
    pub fn from_definitions<I>(definitions: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = TypeDefinition>,
    {
        let mut graph = Self::new();
        for def in definitions {
            graph.add(def)?;
        }
        Ok(graph)
    }

    /// Adds a definition to a graph under construction.
    pub fn add(&mut self, def: TypeDefinition) -> Result<(), GraphError> {
        if self.definitions.contains_key(&def.name) {
            return Err(GraphError::DuplicateDefinition(def.name));
        }
        self.definitions.insert(def.name.clone(), def);
        Ok(())
    }

    /// New graph with `def` added or replaced.
    pub fn with_definition(&self, def: TypeDefinition) -> Self {
        let mut definitions = self.definitions.clone();
        definitions.insert(def.name.clone(), def);
        Self { definitions }
    }

    /// New graph without `name`.
    pub fn without(&self, name: &Identifier) -> Self {
        let mut definitions = self.definitions.clone();
        definitions.remove(name);
        Self { definitions }
    }

    /// Union of two graphs with disjoint identifiers.
    pub fn merge(mut self, other: TypeGraph) -> Result<Self, GraphError> {
        for def in other {
            self.add(def)?;
        }
        Ok(self)
    }

    pub fn get(&self, name: &Identifier) -> Option<&TypeDefinition> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &Identifier) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.definitions.values()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &Identifier> {
        self.definitions.keys()
    }

    /// `(from, to)` for every reference whose target is missing.
    pub fn dangling_references(&self) -> Vec<(Identifier, Identifier)> {
        let mut out = Vec::new();
        for def in self.iter() {
            for target in def.ty.references() {
                if !self.contains(&target) {
                    out.push((def.name.clone(), target));
                }
            }
        }
        out
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        let dangling = self.dangling_references();
        if dangling.is_empty() { Ok(()) } else { Err(GraphError::DanglingReferences(dangling)) }
    }

    /// Every identifier reachable from `roots` by following references.
    /// Missing targets are ignored; cycles are visited once.
    pub fn reachable_from<'a, I>(&self, roots: I) -> BTreeSet<Identifier>
    where
        I: IntoIterator<Item = &'a Identifier>,
    {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<Identifier> = roots.into_iter().cloned().collect();
        while let Some(id) = queue.pop_front() {
            let Some(def) = self.get(&id) else { continue };
            if !seen.insert(id) {
                continue;
            }
            queue.extend(def.ty.references().into_iter().filter(|r| !seen.contains(r)));
        }
        seen
    }

    /// Identifiers of every resource definition.
    pub fn resources(&self) -> impl Iterator<Item = &Identifier> {
        self.iter().filter(|d| matches!(d.ty, Type::Resource(_))).map(|d| &d.name)
    }
}

impl IntoIterator for TypeGraph {
    type Item = TypeDefinition;
    type IntoIter = std::collections::btree_map::IntoValues<Identifier, TypeDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.definitions.into_values()
    }
}

impl TryFrom<Vec<TypeDefinition>> for TypeGraph {
    type Error = GraphError;
    fn try_from(value: Vec<TypeDefinition>) -> Result<Self, Self::Error> {
        Self::from_definitions(value)
    }
}

impl From<TypeGraph> for Vec<TypeDefinition> {
    fn from(value: TypeGraph) -> Self {
        value.into_iter().collect()
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn duplicate_identifiers_are_rejected() {
        let a = TypeDefinition::new(fixtures::id("A"), Type::string());
        let err = TypeGraph::from_definitions([a.clone(), a]).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateDefinition(name) if name == fixtures::id("A")));
    }

    #[test]
    fn copy_on_write_leaves_original_untouched() {
        let g = fixtures::person_graph();
        let before = g.clone();
        let replaced = g.with_definition(TypeDefinition::new(fixtures::id("Person"), Type::string()));
        let removed = g.without(&fixtures::id("Address"));
        assert_eq!(g, before);
        assert_ne!(replaced, g);
        assert_eq!(removed.len(), g.len() - 1);
    }

    #[test]
    fn iteration_is_sorted_by_identifier() {
        let g = fixtures::person_graph();
        let names: Vec<&str> = g.identifiers().map(|i| i.name()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn dangling_references_are_reported() {
        let g = fixtures::person_graph().without(&fixtures::id("Address"));
        let dangling = g.dangling_references();
        assert_eq!(dangling, vec![(fixtures::id("Person"), fixtures::id("Address"))]);
        assert!(matches!(g.validate(), Err(GraphError::DanglingReferences(_))));
        assert!(fixtures::person_graph().validate().is_ok());
    }

    #[test]
    fn reachability_terminates_on_cycles() {
        let g = fixtures::cyclic_graph();
        let reached = g.reachable_from([&fixtures::id("Node")]);
        assert_eq!(reached.len(), 2);
        assert!(reached.contains(&fixtures::id("Edge")));
    }

    #[test]
    fn serializes_as_sorted_list() {
        let g = fixtures::person_graph();
        let json = serde_json::to_value(&g).unwrap();
        let names: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["test/v1/Address", "test/v1/Person", "test/v1/PersonResource", "test/v1/Role"]);
        let back: TypeGraph = serde_json::from_value(json).unwrap();
        assert_eq!(back, g);
    }

    #[test]
    fn duplicate_entries_fail_deserialization() {
        let json = serde_json::json!([
            { "name": "test/v1/A", "type": { "primitive": "string" } },
            { "name": "test/v1/A", "type": { "primitive": "int" } }
        ]);
        assert!(serde_json::from_value::<TypeGraph>(json).is_err());
    }
}
