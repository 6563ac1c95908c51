//! Collapse wrappers that add nothing: `Optional(Optional(T))` and a flag
//! applied twice in a row.
use crate::error::StageError;
use crate::graph::TypeGraph;
use crate::ident::Identifier;
use crate::ir::Type;
use crate::stage::{ItemPolicy, RunContext, Stage, transform_definitions};
use crate::visitor::{TypeVisitor, walk_flagged, walk_optional};

pub const ID: &str = "flattenWrappers";

#[derive(Debug, Clone, Default)]
pub struct FlattenWrappers {
    dependencies: Vec<String>,
}

impl FlattenWrappers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requires(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }
}

fn visitor() -> TypeVisitor<Identifier> {
    TypeVisitor::<Identifier>::new()
        .on_optional(|v, inner, ctx| match inner {
            Type::Optional(_) => v.visit(inner, ctx),
            _ => walk_optional(v, inner, ctx),
        })
        .on_flagged(|v, flagged, ctx| match flagged.inner.as_ref() {
            Type::Flagged(nested) if nested.flag == flagged.flag => v.visit(&flagged.inner, ctx),
            _ => walk_flagged(v, flagged, ctx),
        })
}

impl Stage for FlattenWrappers {
    fn id(&self) -> &str {
        ID
    }
    fn description(&self) -> &str {
        "Collapse nested optionals and repeated flags"
    }
    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
    fn item_policy(&self) -> ItemPolicy {
        ItemPolicy::PartialSuccess
    }
    fn run(&self, ctx: &RunContext, graph: TypeGraph) -> Result<TypeGraph, StageError> {
        let visitor = visitor();
        transform_definitions(ctx, graph, self.item_policy(), |def| visitor.visit_definition(def, &def.name))
    }
}

// ------------------------------- Tests ------------------------------------ //
