//! Stages: named, dependency-aware graph → graph transformations.
//!
//! A stage sees the whole graph and returns a new one. Most stages are
//! per-definition rewrites; [`transform_definitions`] fans that work out
//! over the rayon pool and merges the results in identifier order.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::error::{AggregateError, ItemError, StageError};
use crate::graph::TypeGraph;
use crate::ir::TypeDefinition;

// ————————————————————————————————————————————————————————————————————————————
// RUN CONTEXT
// ————————————————————————————————————————————————————————————————————————————

/// Shared flag; cloning hands out another handle to the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug, Default)]
pub struct RunContext {
    cancellation: CancellationToken,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
    pub fn check(&self) -> Result<(), StageError> {
        if self.is_cancelled() { Err(StageError::Cancelled) } else { Ok(()) }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// STAGE
// ————————————————————————————————————————————————————————————————————————————

/// What a per-definition stage does with the definitions it failed on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ItemPolicy {
    /// Any failure discards the whole output; the stage reports every failure.
    #[default]
    FailClosed,
    /// Failed definitions pass through unchanged and are logged.
    PartialSuccess,
}

pub trait Stage: Send + Sync {
    /// Unique within a pipeline.
    fn id(&self) -> &str;
    fn description(&self) -> &str;
    /// Ids of stages that must complete first.
    fn dependencies(&self) -> &[String] {
        &[]
    }
    fn item_policy(&self) -> ItemPolicy {
        ItemPolicy::FailClosed
    }
    fn run(&self, ctx: &RunContext, graph: TypeGraph) -> Result<TypeGraph, StageError>;
}

type StageAction = dyn Fn(&RunContext, TypeGraph) -> Result<TypeGraph, StageError> + Send + Sync;

/// A stage built from a closure.
pub struct FnStage {
    id: String,
    description: String,
    dependencies: Vec<String>,
    policy: ItemPolicy,
    action: Box<StageAction>,
}

impl FnStage {
    pub fn new<F>(id: impl Into<String>, description: impl Into<String>, action: F) -> Self
    where
        F: Fn(&RunContext, TypeGraph) -> Result<TypeGraph, StageError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            description: description.into(),
            dependencies: Vec::new(),
            policy: ItemPolicy::default(),
            action: Box::new(action),
        }
    }

    pub fn requires(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn with_policy(mut self, policy: ItemPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Stage for FnStage {
    fn id(&self) -> &str {
        &self.id
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
    fn item_policy(&self) -> ItemPolicy {
        self.policy
    }
    fn run(&self, ctx: &RunContext, graph: TypeGraph) -> Result<TypeGraph, StageError> {
        (self.action)(ctx, graph)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PER-DEFINITION DRIVER
// ————————————————————————————————————————————————————————————————————————————

enum Outcome {
    Done(TypeDefinition),
    Failed(ItemError),
    Cancelled,
}

/// Apply `f` to every definition independently, in parallel.
///
/// Every definition is attempted regardless of earlier failures. The output
/// graph is assembled single-threaded in identifier order; under
/// [`ItemPolicy::FailClosed`] no graph is returned if anything failed.
/// Cancellation is checked before each definition and wins over failures.
pub fn transform_definitions<F>(
    ctx: &RunContext,
    graph: TypeGraph,
    policy: ItemPolicy,
    f: F,
) -> Result<TypeGraph, StageError>
where
    F: Fn(&TypeDefinition) -> anyhow::Result<TypeDefinition> + Sync,
{
    let definitions: Vec<TypeDefinition> = graph.into_iter().collect();
    let outcomes: Vec<Outcome> = definitions
        .par_iter()
        .map(|def| {
            if ctx.is_cancelled() {
                return Outcome::Cancelled;
            }
            match f(def) {
                Ok(updated) => Outcome::Done(updated),
                Err(cause) => Outcome::Failed(ItemError::new(def.name.clone(), cause)),
            }
        })
        .collect();

    if ctx.is_cancelled() || outcomes.iter().any(|o| matches!(o, Outcome::Cancelled)) {
        return Err(StageError::Cancelled);
    }

    let mut out = TypeGraph::new();
    let mut errors = Vec::new();
    for (original, outcome) in definitions.into_iter().zip(outcomes) {
        let keep = match outcome {
            Outcome::Done(updated) => updated,
            Outcome::Failed(err) => match policy {
                ItemPolicy::FailClosed => {
                    errors.push(err);
                    continue;
                }
                ItemPolicy::PartialSuccess => {
                    tracing::warn!(definition = %err.name, "kept unchanged: {:#}", err.cause);
                    original
                }
            },
            Outcome::Cancelled => return Err(StageError::Cancelled),
        };
        out.add(keep).map_err(anyhow::Error::from)?;
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(AggregateError { errors }.into())
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::ir::Type;
    use anyhow::bail;

    fn fail_on(names: &'static [&'static str]) -> impl Fn(&TypeDefinition) -> anyhow::Result<TypeDefinition> + Sync {
        move |def: &TypeDefinition| {
            if names.contains(&def.name.name()) {
                bail!("refusing {}", def.name.name());
            }
            Ok(def.with_type(Type::string()))
        }
    }

    #[test]
    fn all_items_succeed() {
        let g = fixtures::person_graph();
        let out = transform_definitions(&RunContext::new(), g.clone(), ItemPolicy::FailClosed, fail_on(&[])).unwrap();
        assert_eq!(out.len(), g.len());
        assert!(out.iter().all(|d| d.ty == Type::string()));
    }

    #[test]
    fn fail_closed_reports_every_failure_and_no_graph() {
        let g = fixtures::person_graph();
        let err = transform_definitions(&RunContext::new(), g, ItemPolicy::FailClosed, fail_on(&["Person", "Role"]))
            .unwrap_err();
        let agg = match err {
            StageError::Aggregate(agg) => agg,
            other => panic!("expected aggregate, got {other:?}"),
        };
        let names: Vec<&str> = agg.errors.iter().map(|e| e.name.name()).collect();
        assert_eq!(names, vec!["Person", "Role"]);
    }

    #[test]
    fn partial_success_keeps_failed_items_unchanged() {
        let g = fixtures::person_graph();
        let out =
            transform_definitions(&RunContext::new(), g.clone(), ItemPolicy::PartialSuccess, fail_on(&["Role"])).unwrap();
        assert_eq!(out.get(&fixtures::id("Role")), g.get(&fixtures::id("Role")));
        assert_eq!(out.get(&fixtures::id("Person")).unwrap().ty, Type::string());
    }

    #[test]
    fn cancelled_context_yields_no_graph() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = RunContext::with_cancellation(token);
        let err = transform_definitions(&ctx, fixtures::person_graph(), ItemPolicy::FailClosed, fail_on(&["Role"]))
            .unwrap_err();
        assert!(matches!(err, StageError::Cancelled));
    }

    #[test]
    fn renaming_into_a_collision_fails_the_stage() {
        let g = fixtures::person_graph();
        let err = transform_definitions(&RunContext::new(), g, ItemPolicy::FailClosed, |def| {
            Ok(def.with_name(fixtures::id("Same")))
        })
        .unwrap_err();
        assert!(matches!(err, StageError::Failed(_)));
    }

    #[test]
    fn fn_stage_exposes_its_declaration() {
        let stage = FnStage::new("noop", "does nothing", |_, g| Ok(g))
            .requires("other")
            .with_policy(ItemPolicy::PartialSuccess);
        assert_eq!(stage.id(), "noop");
        assert_eq!(stage.description(), "does nothing");
        assert_eq!(stage.dependencies(), ["other".to_string()]);
        assert_eq!(stage.item_policy(), ItemPolicy::PartialSuccess);
        let g = fixtures::cyclic_graph();
        assert_eq!(stage.run(&RunContext::new(), g.clone()).unwrap(), g);
    }
}
