//! Drop definitions no resource can reach.
use crate::error::StageError;
use crate::graph::TypeGraph;
use crate::stage::{RunContext, Stage};

pub const ID: &str = "removeUnreferencedTypes";

#[derive(Debug, Clone, Default)]
pub struct RemoveUnreferencedTypes {
    dependencies: Vec<String>,
}

impl RemoveUnreferencedTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requires(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }
}

impl Stage for RemoveUnreferencedTypes {
    fn id(&self) -> &str {
        ID
    }
    fn description(&self) -> &str {
        "Remove types not reachable from any resource"
    }
    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
    fn run(&self, ctx: &RunContext, graph: TypeGraph) -> Result<TypeGraph, StageError> {
        ctx.check()?;
        let roots: Vec<_> = graph.resources().cloned().collect();
        // A graph without resources is a library of shapes; keep it whole.
        if roots.is_empty() {
            return Ok(graph);
        }
        let keep = graph.reachable_from(&roots);
        let removed = graph.len() - keep.len();
        if removed > 0 {
            tracing::debug!(removed, "removing unreferenced definitions");
        }
        let kept = graph.into_iter().filter(|d| keep.contains(&d.name));
        TypeGraph::from_definitions(kept).map_err(|e| StageError::Failed(e.into()))
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn keeps_everything_reachable_from_resources() {
        let g = fixtures::person_graph().merge(fixtures::cyclic_graph()).unwrap();
        let out = RemoveUnreferencedTypes::new().run(&RunContext::new(), g).unwrap();
        let names: Vec<&str> = out.identifiers().map(|i| i.name()).collect();
        assert_eq!(names, vec!["Address", "Person", "PersonResource"]);
        assert!(out.validate().is_ok());
    }

    #[test]
    fn graphs_without_resources_are_kept() {
        let g = fixtures::cyclic_graph();
        let out = RemoveUnreferencedTypes::new().run(&RunContext::new(), g.clone()).unwrap();
        assert_eq!(out, g);
    }
}
