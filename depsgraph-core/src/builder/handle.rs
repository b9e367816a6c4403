//! Node handles.
//!
//! A [`NodeHandle`] names one operation that is being built. A
//! [`HandleScope`] lends a producer (a modifier's dependency callback, for
//! instance) the ability to add relations ending at that operation, and
//! nothing else.

use super::{BuildContext, RelationBuilder};
use crate::graph::{ComponentKey, Key, NodeType, OperationIndex, TimeSourceKey};
use crate::scene::{EffectorWeights, EntityId, Main};

/// An operation bound as the target of relations, plus a default
/// description for relations that do not bring their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHandle {
    node: OperationIndex,
    default_name: String,
}

impl NodeHandle {
    pub(crate) fn new(node: OperationIndex, default_name: &str) -> Self {
        Self {
            node,
            default_name: default_name.to_string(),
        }
    }

    pub fn node(&self) -> OperationIndex {
        self.node
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }
}

/// Narrow builder capability: add dependencies of one bound operation.
pub struct HandleScope<'b, 'a> {
    builder: &'b mut RelationBuilder<'a>,
    ctx: BuildContext<'a>,
    handle: NodeHandle,
}

impl<'b, 'a> HandleScope<'b, 'a> {
    pub(crate) fn new(
        builder: &'b mut RelationBuilder<'a>,
        ctx: BuildContext<'a>,
        handle: NodeHandle,
    ) -> Self {
        Self {
            builder,
            ctx,
            handle,
        }
    }

    /// Read access to the scene database.
    pub fn main(&self) -> &'a Main {
        self.builder.main()
    }

    pub fn handle(&self) -> &NodeHandle {
        &self.handle
    }

    /// Make the bound operation depend on whatever `from` names.
    pub fn add_relation(&mut self, from: impl Into<Key>, description: &str) -> bool {
        self.builder
            .add_node_handle_relation(from, &self.handle, description)
    }

    /// Depend on one component of another object.
    pub fn add_object_relation(
        &mut self,
        object: EntityId,
        component: NodeType,
        description: &str,
    ) -> bool {
        self.add_relation(ComponentKey::new(object, component), description)
    }

    /// Depend on a single bone of an armature object.
    pub fn add_bone_relation(&mut self, object: EntityId, bone: &str, description: &str) -> bool {
        self.add_relation(ComponentKey::named(object, NodeType::Bone, bone), description)
    }

    /// Re-evaluate the bound operation on every time change.
    pub fn add_time_relation(&mut self, description: &str) -> bool {
        self.add_relation(TimeSourceKey::new(), description)
    }

    /// Depend on every collider of the current scene, or of `group`.
    ///
    /// The colliders must already be built; a scope never builds.
    pub fn add_collision_relations(
        &mut self,
        object: EntityId,
        group: Option<EntityId>,
        description: &str,
    ) {
        for key in self.builder.collision_keys(self.ctx, object, group) {
            self.add_relation(key, description);
        }
    }

    /// Depend on every force field affecting `object`.
    pub fn add_forcefield_relations(
        &mut self,
        object: EntityId,
        weights: &EffectorWeights,
        add_absorption: bool,
        description: &str,
    ) {
        for key in self
            .builder
            .forcefield_keys(self.ctx, object, weights, add_absorption)
        {
            self.add_relation(key, description);
        }
    }
}
