//! Dependency Graph
//!
//! This module implements the graph the relation builder produces.
//!
//! # Overview
//!
//! The graph is a three-level ownership tree with relations on the leaves:
//!
//! - Entity nodes, one per data block
//! - Component nodes, one per aspect of an entity (transform, geometry, a
//!   bone, ...)
//! - Operation nodes, the atomic units of work
//!
//! Relations are directed "must complete before" edges between operations.
//! Time source nodes stand for the current frame; relations from them mean
//! "re-run when time changes".
//!
//! # Design Decisions
//!
//! 1. All nodes live in flat arenas and refer to each other by index, so
//!    back-references (operation -> component -> entity) need no shared
//!    ownership.
//!
//! 2. Keys are plain values. They are resolved on demand and never hold a
//!    reference into the graph.
//!
//! 3. Relation insertion is idempotent: the same operation pair is only
//!    ever linked once.

mod depsgraph;
mod keys;
mod node;
mod scheduler;
mod types;

pub use depsgraph::Depsgraph;
pub use keys::{ComponentKey, Key, OperationKey, PathKey, TimeSourceKey, NO_TAG};
pub use node::{
    ComponentIndex, ComponentNode, EntityIndex, EntityNode, NodeRef, OperationIdentity,
    OperationIndex, OperationNode, Relation, RelationIndex, TimeRelation, TimeSourceIndex,
    TimeSourceNode,
};
pub use scheduler::UpdateScheduler;
pub use types::{NodeType, OpCode};
