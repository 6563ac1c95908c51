//! Error taxonomy for graph construction, stages and pipeline runs.
use thiserror::Error;

use crate::ident::Identifier;

/// One declaration failed one stage.
#[derive(Debug, Error)]
#[error("{name}: {cause:#}")]
pub struct ItemError {
    pub name: Identifier,
    pub cause: anyhow::Error,
}

impl ItemError {
    pub fn new(name: Identifier, cause: impl Into<anyhow::Error>) -> Self {
        Self { name, cause: cause.into() }
    }
}

/// Every per-item failure of a stage, in identifier order.
#[derive(Debug, Error)]
#[error("{} declaration(s) failed{}", .errors.len(), format_items(.errors))]
pub struct AggregateError {
    pub errors: Vec<ItemError>,
}

fn format_items(errors: &[ItemError]) -> String {
    errors.iter().map(|err| format!("\n  - {err}")).collect()
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error("cancelled")]
    Cancelled,
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate definition for {0}")]
    DuplicateDefinition(Identifier),
    #[error("{} dangling reference(s): {}", .0.len(), format_dangling(.0))]
    DanglingReferences(Vec<(Identifier, Identifier)>),
}

fn format_dangling(pairs: &[(Identifier, Identifier)]) -> String {
    pairs
        .iter()
        .map(|(from, to)| format!("{from} -> {to}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Construction-time and run-time pipeline failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("stage {0:?} registered more than once")]
    DuplicateStage(String),
    #[error("stage {stage:?} depends on unknown stage {dependency:?}")]
    UnknownDependency { stage: String, dependency: String },
    #[error("stage dependencies form a cycle: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),
    #[error("{0}")]
    Failed(crate::pipeline::PipelineReport),
    #[error("run cancelled after {} stage(s)", .executed.len())]
    Cancelled { executed: Vec<String> },
}

// ------------------------------- Tests ------------------------------------ //
