//! Type-graph transformation core of a resource definition generator.
//!
//! Vendor API schemas are ingested elsewhere into a [`TypeGraph`]: a map from
//! [`Identifier`] to [`TypeDefinition`] over a closed set of type shapes.
//! A [`Pipeline`] of named, dependency-ordered [`Stage`]s rewrites that graph
//! (flattening, deduplication, pruning, test-case synthesis) before it is
//! handed to emission.
//!
//! ```text
//! ingestion ─> TypeGraph ─> Pipeline [ Stage ─> Stage ─> … ] ─> TypeGraph ─> emission
//!                               │
//!                               └─ per-definition work: TypeVisitor over rayon
//! ```
//!
//! # Example
//!
//! ```
//! use rmgen::{Identifier, IdentifierFactory, RunContext, TypeGraph, stages};
//! use rmgen::ir::{ObjectType, Property, Type, TypeDefinition};
//!
//! let name = Identifier::new("microsoft.test/v1", "Widget").unwrap();
//! let widget = ObjectType::new().with_property("size", Property::new(Type::int()).required());
//! let graph = TypeGraph::from_definitions([TypeDefinition::new(name.clone(), Type::Object(widget))]).unwrap();
//!
//! let pipeline = stages::default_pipeline(IdentifierFactory::new()).unwrap();
//! let output = pipeline.run(&RunContext::new(), graph).unwrap();
//!
//! let Type::Object(widget) = &output.graph.get(&name).unwrap().ty else { unreachable!() };
//! assert_eq!(widget.test_cases[0].name(), "Widget_WhenSerializedToJson_DeserializesAsEqual");
//! ```
pub mod cli;
pub mod error;
pub mod graph;
pub mod ident;
pub mod ir;
pub mod path_de;
pub mod pipeline;
pub mod stage;
pub mod stages;
pub mod test_case;
pub mod visitor;

#[cfg(test)]
pub(crate) mod fixtures;

pub use error::{AggregateError, GraphError, ItemError, PipelineError, StageError};
pub use graph::TypeGraph;
pub use ident::{Identifier, IdentifierError, IdentifierFactory};
pub use ir::{Type, TypeDefinition};
pub use pipeline::{Pipeline, PipelineOutput, PipelineReport};
pub use stage::{CancellationToken, FnStage, ItemPolicy, RunContext, Stage};
pub use visitor::TypeVisitor;
