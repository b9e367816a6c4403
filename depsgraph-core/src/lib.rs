//! Depsgraph Core
//!
//! This crate builds the dependency graph of a scene: which pieces of
//! evaluation work (operations) must finish before which others.
//!
//! It implements:
//!
//! - An arena-backed graph of entities, components and operations
//! - Value-typed keys resolved on demand to graph nodes
//! - The relation builder, one build procedure per kind of data block
//! - A topological scheduler used to validate and order the result
//!
//! # Architecture
//!
//! - `scene`: the read-only scene database the builder walks
//! - `graph`: nodes, keys, relations and the scheduler
//! - `rna`: resolution of property paths to the components computing them
//! - `builder`: the relation builder and its diagnostics
//!
//! # Example
//!
//! ```rust
//! use depsgraph_core::builder::RelationBuilder;
//! use depsgraph_core::graph::UpdateScheduler;
//! use depsgraph_core::scene::{Main, Object, ObjectType, Scene};
//!
//! let mut main = Main::new();
//! let cube = main.add("Cube", Object::new(ObjectType::Empty));
//! let scene = main.add("Scene", Scene { objects: vec![cube], ..Default::default() });
//!
//! let mut builder = RelationBuilder::new(&main);
//! builder.build_scene(scene);
//! let graph = builder.finish();
//!
//! let order = UpdateScheduler::new(&graph).evaluation_order().unwrap();
//! assert_eq!(order.len(), graph.operation_count());
//! ```

pub mod builder;
pub mod error;
pub mod graph;
pub mod rna;
pub mod scene;

pub use builder::{BuildContext, BuilderConfig, RelationBuilder};
pub use error::{GraphError, ResolveError};
pub use graph::{Depsgraph, Key};
