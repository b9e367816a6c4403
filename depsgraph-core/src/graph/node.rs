//! Graph Nodes
//!
//! This module defines the node types that live in the dependency graph
//! arena. Nodes never point at each other directly: ownership
//! (operation -> component -> entity) and relations are all expressed as
//! indices into the arena owned by [`Depsgraph`](super::Depsgraph).

use std::fmt;

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::types::{NodeType, OpCode};
use crate::scene::EntityId;

macro_rules! arena_index {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub(crate) fn new(index: usize) -> Self {
                Self(index as u32)
            }

            /// Get the position of the node in its arena.
            pub fn index(&self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

arena_index!(
    /// Index of an [`EntityNode`].
    EntityIndex
);
arena_index!(
    /// Index of a [`ComponentNode`].
    ComponentIndex
);
arena_index!(
    /// Index of an [`OperationNode`].
    OperationIndex
);
arena_index!(
    /// Index of a [`TimeSourceNode`].
    TimeSourceIndex
);
arena_index!(
    /// Index of a [`Relation`].
    RelationIndex
);

/// Result of resolving a key: any addressable node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    TimeSource(TimeSourceIndex),
    Component(ComponentIndex),
    Operation(OperationIndex),
}

/// How an operation is told apart from its siblings in a component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationIdentity {
    pub opcode: OpCode,
    pub name: String,
    pub tag: i32,
}

/// The atomic unit of work.
#[derive(Debug)]
pub struct OperationNode {
    owner: ComponentIndex,
    identity: OperationIdentity,
    /// Relations ending at this operation.
    pub(crate) inlinks: SmallVec<[RelationIndex; 4]>,
    /// Relations starting at this operation.
    pub(crate) outlinks: SmallVec<[RelationIndex; 4]>,
    /// Number of time source relations ending here.
    pub(crate) time_inlinks: usize,
}

impl OperationNode {
    pub(crate) fn new(owner: ComponentIndex, identity: OperationIdentity) -> Self {
        Self {
            owner,
            identity,
            inlinks: SmallVec::new(),
            outlinks: SmallVec::new(),
            time_inlinks: 0,
        }
    }

    /// Get the owning component.
    pub fn owner(&self) -> ComponentIndex {
        self.owner
    }

    pub fn opcode(&self) -> OpCode {
        self.identity.opcode
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn name_tag(&self) -> i32 {
        self.identity.tag
    }

    pub fn identity(&self) -> &OperationIdentity {
        &self.identity
    }

    /// Get all relations ending at this operation.
    pub fn inlinks(&self) -> &[RelationIndex] {
        &self.inlinks
    }

    /// Get all relations starting at this operation.
    pub fn outlinks(&self) -> &[RelationIndex] {
        &self.outlinks
    }

    /// Check whether the time source drives this operation directly.
    pub fn is_time_dependent(&self) -> bool {
        self.time_inlinks > 0
    }
}

/// A logical grouping of operations on one entity.
#[derive(Debug)]
pub struct ComponentNode {
    owner: EntityIndex,
    kind: NodeType,
    name: String,
    pub(crate) operations: IndexMap<OperationIdentity, OperationIndex>,
    pub(crate) entry: Option<OperationIndex>,
    pub(crate) exit: Option<OperationIndex>,
}

impl ComponentNode {
    pub(crate) fn new(owner: EntityIndex, kind: NodeType, name: String) -> Self {
        Self {
            owner,
            kind,
            name,
            operations: IndexMap::new(),
            entry: None,
            exit: None,
        }
    }

    /// Get the owning entity.
    pub fn owner(&self) -> EntityIndex {
        self.owner
    }

    pub fn kind(&self) -> NodeType {
        self.kind
    }

    /// Instance name (bone name), empty for single-instance components.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get all operations, including synthesized entry/exit, in creation order.
    pub fn operations(&self) -> impl Iterator<Item = OperationIndex> + '_ {
        self.operations.values().copied()
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Entry operation, if one has been declared or synthesized.
    pub fn entry(&self) -> Option<OperationIndex> {
        self.entry
    }

    /// Exit operation, if one has been declared or synthesized.
    pub fn exit(&self) -> Option<OperationIndex> {
        self.exit
    }
}

/// One node per entity.
#[derive(Debug)]
pub struct EntityNode {
    id: EntityId,
    name: String,
    pub(crate) components: IndexMap<(NodeType, String), ComponentIndex>,
    pub(crate) time_source: Option<TimeSourceIndex>,
}

impl EntityNode {
    pub(crate) fn new(id: EntityId, name: String) -> Self {
        Self {
            id,
            name,
            components: IndexMap::new(),
            time_source: None,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get all components in creation order.
    pub fn components(&self) -> impl Iterator<Item = ComponentIndex> + '_ {
        self.components.values().copied()
    }

    /// Get a component by kind and instance name.
    pub fn component(&self, kind: NodeType, name: &str) -> Option<ComponentIndex> {
        self.components.get(&(kind, name.to_string())).copied()
    }
}

/// A "depends on time" edge. The time source is not an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRelation {
    pub to: OperationIndex,
    pub description: String,
}

/// Virtual node standing for the current evaluation time.
#[derive(Debug, Default)]
pub struct TimeSourceNode {
    owner: Option<EntityIndex>,
    pub(crate) outlinks: Vec<TimeRelation>,
}

impl TimeSourceNode {
    pub(crate) fn new(owner: Option<EntityIndex>) -> Self {
        Self {
            owner,
            outlinks: Vec::new(),
        }
    }

    /// The entity this time source is scoped to. `None` for the global one.
    pub fn owner(&self) -> Option<EntityIndex> {
        self.owner
    }

    /// Get all operations driven by this time source.
    pub fn outlinks(&self) -> &[TimeRelation] {
        &self.outlinks
    }
}

/// Directed "must complete before" edge between two operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub from: OperationIndex,
    pub to: OperationIndex,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_operation_has_no_links() {
        let op = OperationNode::new(
            ComponentIndex::new(0),
            OperationIdentity {
                opcode: OpCode::BoneDone,
                name: String::new(),
                tag: -1,
            },
        );
        assert_eq!(op.opcode(), OpCode::BoneDone);
        assert!(op.inlinks().is_empty());
        assert!(op.outlinks().is_empty());
        assert!(!op.is_time_dependent());
    }

    #[test]
    fn entity_component_lookup_uses_kind_and_name() {
        let mut entity = EntityNode::new(EntityId::from(1), "OBArmature".into());
        entity
            .components
            .insert((NodeType::Bone, "Hand".into()), ComponentIndex::new(3));

        assert_eq!(entity.component(NodeType::Bone, "Hand"), Some(ComponentIndex::new(3)));
        assert_eq!(entity.component(NodeType::Bone, "Foot"), None);
        assert_eq!(entity.component(NodeType::Transform, ""), None);
    }
}
