//! Concrete stages and the default pipeline.
//!
//! ```text
//! flattenWrappers ──┐
//!                   ├─> deduplicateTypes ─> removeUnreferencedTypes ─> jsonTestCases
//! ```
pub mod dedup;
pub mod flatten;
pub mod json_test_cases;
pub mod prune;

pub use dedup::DeduplicateTypes;
pub use flatten::FlattenWrappers;
pub use json_test_cases::InjectJsonSerializationTests;
pub use prune::RemoveUnreferencedTypes;

use crate::error::PipelineError;
use crate::ident::IdentifierFactory;
use crate::pipeline::Pipeline;
use crate::stage::Stage;

pub fn default_stages(factory: IdentifierFactory) -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(FlattenWrappers::new()),
        Box::new(DeduplicateTypes::new().requires(flatten::ID)),
        Box::new(RemoveUnreferencedTypes::new().requires(dedup::ID)),
        Box::new(
            InjectJsonSerializationTests::new(factory)
                .requires(flatten::ID)
                .requires(dedup::ID)
                .requires(prune::ID),
        ),
    ]
}

pub fn default_pipeline(factory: IdentifierFactory) -> Result<Pipeline, PipelineError> {
    Pipeline::new(default_stages(factory))
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::graph::TypeGraph;
    use crate::ir::{ObjectType, Property, Type};
    use crate::stage::RunContext;

    fn sample() -> TypeGraph {
        let g = fixtures::person_graph().merge(fixtures::wrapper_graph()).unwrap();
        // A structural copy of Address, referenced from Person.
        let home = fixtures::def("HomeAddress", Type::Object(fixtures::address()));
        let person = g.get(&fixtures::id("Person")).unwrap();
        let Type::Object(obj) = &person.ty else { unreachable!() };
        let obj: ObjectType = obj.clone().with_property(
            "home",
            Property::new(Type::optional(Type::optional(Type::reference(fixtures::id("HomeAddress"))))),
        );
        g.with_definition(home).with_definition(person.with_type(Type::Object(obj)))
    }

    /// `9Lives` cannot be named, and the resource status keeps it reachable
    /// so pruning does not hide the failure.
    fn unnameable() -> TypeGraph {
        let bad = fixtures::def("9Lives", Type::Object(ObjectType::new()));
        let resource = fixtures::person_graph().get(&fixtures::id("PersonResource")).unwrap().clone();
        let Type::Resource(r) = &resource.ty else { unreachable!() };
        let r = r.clone().with_status(Some(Type::reference(bad.name.clone())));
        fixtures::person_graph().with_definition(bad).with_definition(resource.with_type(Type::Resource(r)))
    }

    #[test]
    fn default_order_is_fixed() {
        let p = default_pipeline(IdentifierFactory::new()).unwrap();
        assert_eq!(p.order(), vec!["flattenWrappers", "deduplicateTypes", "removeUnreferencedTypes", "jsonTestCases"]);
    }

    #[test]
    fn default_pipeline_end_to_end() {
        let p = default_pipeline(IdentifierFactory::new()).unwrap();
        let out = p.run(&RunContext::new(), sample()).unwrap();
        let g = out.graph;

        assert!(g.validate().is_ok());
        assert!(!g.contains(&fixtures::id("HomeAddress")), "merged into Address");
        assert!(!g.contains(&fixtures::id("Role")), "unreferenced");
        assert!(!g.contains(&fixtures::id("Holder")), "unreferenced");

        let Type::Object(person) = &g.get(&fixtures::id("Person")).unwrap().ty else { panic!() };
        assert_eq!(person.properties["home"].ty, Type::optional(Type::reference(fixtures::id("Address"))));
        assert_eq!(person.test_cases.len(), 1);
        let Type::Resource(res) = &g.get(&fixtures::id("PersonResource")).unwrap().ty else { panic!() };
        assert_eq!(res.test_cases.len(), 1);
    }

    #[test]
    fn runs_are_deterministic() {
        let p = default_pipeline(IdentifierFactory::new()).unwrap();
        let first = p.run(&RunContext::new(), sample()).unwrap().graph;
        let second = p.run(&RunContext::new(), sample()).unwrap().graph;
        assert_eq!(serde_json::to_string(&first).unwrap(), serde_json::to_string(&second).unwrap());
    }

    #[test]
    fn failing_test_case_synthesis_reports_once() {
        let err = default_pipeline(IdentifierFactory::new()).unwrap().run(&RunContext::new(), unnameable()).err().unwrap();
        let PipelineError::Failed(report) = err else { panic!("expected failure") };
        assert_eq!(report.failed_ids(), vec!["jsonTestCases"]);
        assert_eq!(report.executed.len(), 4);
        assert!(report.skipped.is_empty());
        let text = report.to_string();
        // The resource fails too: its status generator is named after `9Lives`.
        assert!(text.contains("2 declaration(s) failed"), "{text}");
        assert!(text.contains("test/v1/9Lives"), "{text}");
        assert!(text.contains("test/v1/PersonResource"), "{text}");
    }

    #[test]
    fn failure_reports_are_deterministic() {
        let p = default_pipeline(IdentifierFactory::new()).unwrap();
        let report = || match p.run(&RunContext::new(), unnameable()) {
            Err(PipelineError::Failed(report)) => report.to_string(),
            other => panic!("expected failure, got {other:?}"),
        };
        let first = report();
        assert_eq!(first, report());
        assert!(first.contains("2 declaration(s) failed"), "{first}");
    }
}
