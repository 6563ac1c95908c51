//! Orders stages by their declared dependencies and runs them over one
//! evolving graph.
//!
//! Construction validates the stage set (unique ids, known dependencies, no
//! cycles) and fixes the execution order: Kahn's algorithm, with ready
//! stages taken in registration order. A run never stops at the first
//! failure; stages that do not depend on a failed stage still run, stages
//! that do are skipped, and the report lists all of it.
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::error::{PipelineError, StageError};
use crate::graph::TypeGraph;
use crate::stage::{RunContext, Stage};

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    /// Indices into `stages`, dependencies first.
    order: Vec<usize>,
}

#[derive(Debug, Default)]
pub struct PipelineReport {
    /// Stages that ran, successfully or not, in execution order.
    pub executed: Vec<String>,
    pub failed: Vec<StageFailure>,
    pub skipped: Vec<SkippedStage>,
}

#[derive(Debug)]
pub struct StageFailure {
    pub stage: String,
    pub error: StageError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedStage {
    pub stage: String,
    /// The failed or skipped dependency that blocked it.
    pub blocked_by: String,
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub graph: TypeGraph,
    pub report: PipelineReport,
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTION
// ————————————————————————————————————————————————————————————————————————————

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Result<Self, PipelineError> {
        let order = execution_order(&stages)?;
        debug!(order = ?order.iter().map(|&i| stages[i].id()).collect::<Vec<_>>(), "pipeline order");
        Ok(Self { stages, order })
    }

    /// Rebuild without the named stages. Removing a stage something else
    /// depends on is an unknown-dependency error.
    pub fn without_stages<S: AsRef<str>>(self, ids: &[S]) -> Result<Self, PipelineError> {
        let drop: HashSet<&str> = ids.iter().map(AsRef::as_ref).collect();
        let stages = self.stages.into_iter().filter(|s| !drop.contains(s.id())).collect();
        Self::new(stages)
    }

    /// Stage ids in execution order.
    pub fn order(&self) -> Vec<&str> {
        self.order.iter().map(|&i| self.stages[i].id()).collect()
    }

    /// Stages in execution order.
    pub fn stages(&self) -> impl Iterator<Item = &dyn Stage> {
        self.order.iter().map(|&i| self.stages[i].as_ref())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

fn execution_order(stages: &[Box<dyn Stage>]) -> Result<Vec<usize>, PipelineError> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, stage) in stages.iter().enumerate() {
        if index.insert(stage.id(), i).is_some() {
            return Err(PipelineError::DuplicateStage(stage.id().to_string()));
        }
    }

    let n = stages.len();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut in_degree = vec![0usize; n];
    for (i, stage) in stages.iter().enumerate() {
        let deps: BTreeSet<&str> = stage.dependencies().iter().map(String::as_str).collect();
        for dep in deps {
            let Some(&j) = index.get(dep) else {
                return Err(PipelineError::UnknownDependency {
                    stage: stage.id().to_string(),
                    dependency: dep.to_string(),
                });
            };
            dependents[j].push(i);
            in_degree[i] += 1;
        }
    }

    // Kahn; the ready set is ordered by registration index.
    let mut remaining = in_degree.clone();
    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| remaining[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &d in &dependents[i] {
            remaining[d] -= 1;
            if remaining[d] == 0 {
                ready.insert(d);
            }
        }
    }
    if order.len() == n {
        return Ok(order);
    }

    // The residual holds the cycles plus everything downstream of them,
    // including stages wedged between two cycles. Report only stages that
    // lead back to themselves.
    let residual: BTreeSet<usize> = (0..n).filter(|&i| remaining[i] > 0).collect();
    let members = residual
        .iter()
        .copied()
        .filter(|&i| returns_to(&dependents, &residual, i))
        .map(|i| stages[i].id().to_string())
        .collect();
    Err(PipelineError::DependencyCycle(members))
}

/// Whether `start` is reachable from itself in one or more steps inside `within`.
fn returns_to(dependents: &[Vec<usize>], within: &BTreeSet<usize>, start: usize) -> bool {
    let mut seen = HashSet::new();
    let mut stack = dependents[start].clone();
    while let Some(i) = stack.pop() {
        if i == start {
            return true;
        }
        if within.contains(&i) && seen.insert(i) {
            stack.extend(&dependents[i]);
        }
    }
    false
}

// ————————————————————————————————————————————————————————————————————————————
// EXECUTION
// ————————————————————————————————————————————————————————————————————————————

impl Pipeline {
    /// Run every stage in order. Returns the final graph only if every stage
    /// succeeded; cancellation is reported as [`PipelineError::Cancelled`]
    /// and never yields a graph.
    pub fn run(&self, ctx: &RunContext, graph: TypeGraph) -> Result<PipelineOutput, PipelineError> {
        let mut current = graph;
        let mut report = PipelineReport::default();
        let mut blocked: HashSet<&str> = HashSet::new();

        for stage in self.stages() {
            if ctx.is_cancelled() {
                return Err(PipelineError::Cancelled { executed: report.executed });
            }
            let id = stage.id();

            if let Some(dep) = stage.dependencies().iter().find(|d| blocked.contains(d.as_str())) {
                warn!(stage = id, blocked_by = %dep, "skipped");
                report.skipped.push(SkippedStage { stage: id.to_string(), blocked_by: dep.clone() });
                blocked.insert(id);
                continue;
            }

            info!(stage = id, definitions = current.len(), "{}", stage.description());
            let started = Instant::now();
            let result = stage.run(ctx, current.clone());
            report.executed.push(id.to_string());
            match result {
                Ok(next) => {
                    debug!(stage = id, definitions = next.len(), elapsed = ?started.elapsed(), "done");
                    current = next;
                }
                Err(StageError::Cancelled) => {
                    return Err(PipelineError::Cancelled { executed: report.executed });
                }
                Err(err) => {
                    error!(stage = id, elapsed = ?started.elapsed(), "failed: {err}");
                    report.failed.push(StageFailure { stage: id.to_string(), error: err });
                    blocked.insert(id);
                }
            }
        }

        if report.failed.is_empty() {
            Ok(PipelineOutput { graph: current, report })
        } else {
            Err(PipelineError::Failed(report))
        }
    }
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn skipped_ids(&self) -> Vec<&str> {
        self.skipped.iter().map(|s| s.stage.as_str()).collect()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.stage.as_str()).collect()
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stage(s) ran, {} failed, {} skipped",
            self.executed.len(),
            self.failed.len(),
            self.skipped.len()
        )?;
        for failure in &self.failed {
            write!(f, "\nstage {:?} failed: {}", failure.stage, failure.error)?;
        }
        for skipped in &self.skipped {
            write!(f, "\nstage {:?} skipped: depends on {:?}", skipped.stage, skipped.blocked_by)?;
        }
        Ok(())
    }
}

// ------------------------------- Tests ------------------------------------ //
