//! Attach a JSON round-trip test case to every object and resource.
//!
//! Only definitions whose own type is an object or a resource are eligible;
//! everything else, including objects nested under wrappers, passes through
//! untouched. Each definition is handled on its own. The stage is fail-closed: if the
//! naming policy rejects any definition, no graph is produced and every
//! rejection is reported. A partially covered run is worse than a loud one.
use std::sync::Arc;

use anyhow::Context;

use crate::error::StageError;
use crate::graph::TypeGraph;
use crate::ident::{Identifier, IdentifierFactory};
use crate::ir::Type;
use crate::stage::{ItemPolicy, RunContext, Stage, transform_definitions};
use crate::test_case::{JsonSerializationTestCase, TestCase};
use crate::visitor::TypeVisitor;

pub const ID: &str = "jsonTestCases";

pub struct InjectJsonSerializationTests {
    dependencies: Vec<String>,
    visitor: TypeVisitor<Identifier>,
}

impl InjectJsonSerializationTests {
    pub fn new(factory: IdentifierFactory) -> Self {
        Self { dependencies: Vec::new(), visitor: test_case_visitor(Arc::new(factory)) }
    }

    pub fn requires(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }
}

/// The context is the name of the definition being visited; test names
/// derive from it, not from where an object happens to sit.
fn test_case_visitor(factory: Arc<IdentifierFactory>) -> TypeVisitor<Identifier> {
    let for_resources = factory.clone();
    TypeVisitor::<Identifier>::new()
        .on_resource(move |_, resource, name| {
            let tc = JsonSerializationTestCase::for_resource(name, resource, &for_resources)
                .context("naming JSON serialization test")?;
            Ok(Type::Resource(resource.clone().with_test_case(TestCase::JsonSerialization(tc))))
        })
        .on_object(move |_, object, name| {
            let tc = JsonSerializationTestCase::for_object(name, object, &factory)
                .context("naming JSON serialization test")?;
            Ok(Type::Object(object.clone().with_test_case(TestCase::JsonSerialization(tc))))
        })
}

impl Stage for InjectJsonSerializationTests {
    fn id(&self) -> &str {
        ID
    }
    fn description(&self) -> &str {
        "Add test cases to verify JSON serialization"
    }
    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
    fn item_policy(&self) -> ItemPolicy {
        ItemPolicy::FailClosed
    }
    fn run(&self, ctx: &RunContext, graph: TypeGraph) -> Result<TypeGraph, StageError> {
        transform_definitions(ctx, graph, self.item_policy(), |def| match def.ty {
            Type::Object(_) | Type::Resource(_) => self.visitor.visit_definition(def, &def.name),
            _ => Ok(def.clone()),
        })
    }
}

// ------------------------------- Tests ------------------------------------ //
