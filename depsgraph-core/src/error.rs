//! Error types.
//!
//! Resolution failures are never fatal for a build pass. They surface as
//! [`ResolveError`] values internally and are turned into diagnostics by
//! the relation builder.

use thiserror::Error;

use crate::scene::EntityId;

/// Why a key could not be resolved to a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("entity {0} is not part of the graph")]
    UnknownEntity(EntityId),

    #[error("component {component} has no operations")]
    NoOperations { component: String },

    #[error("operation {operation} does not exist")]
    OperationNotFound { operation: String },

    #[error("property path '{path}' on {id} does not resolve")]
    UnresolvedPath { id: EntityId, path: String },

    #[error("the time source is not an operation")]
    TimeSourceNotOperation,
}

/// Errors reported by graph validation and configuration loading.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("dependency cycle: {remaining} operations could not be ordered")]
    Cycle { remaining: usize },

    #[error("invalid builder config: {0}")]
    Config(#[from] serde_json::Error),
}
