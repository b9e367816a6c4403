//! Cycle-avoidance heuristics.

use super::RelationBuilder;
use crate::graph::{Depsgraph, Key, NodeRef, NodeType, OpCode, OperationIndex};

/// Check whether `from -> to` reads a bone's final transform into the same
/// bone's local transform.
///
/// Rigs commonly drive a bone from its own transform. Taken literally that
/// is a cycle (`BONE_LOCAL` leads to `BONE_DONE` of the same bone), so such
/// relations are skipped. No other same-entity pattern is covered.
pub fn is_same_bone_relation(graph: &Depsgraph, from: OperationIndex, to: OperationIndex) -> bool {
    let op_from = graph.operation(from);
    let op_to = graph.operation(to);
    if op_from.opcode() != OpCode::BoneDone || op_to.opcode() != OpCode::BoneLocal {
        return false;
    }
    let comp_from = graph.component(op_from.owner());
    let comp_to = graph.component(op_to.owner());
    comp_from.kind() == NodeType::Bone
        && comp_to.kind() == NodeType::Bone
        && comp_from.owner() == comp_to.owner()
        && comp_from.name() == comp_to.name()
}

impl RelationBuilder<'_> {
    /// Resolve both keys and apply [`is_same_bone_relation`].
    ///
    /// Keys that do not resolve, and components without a declared
    /// entry/exit, are never the same bone. Nothing is reported and no
    /// operation is synthesized.
    pub fn is_same_bone_dependency(&mut self, from: &Key, to: &Key) -> bool {
        let (Ok(node_from), Ok(node_to)) = (self.get_node(from), self.get_node(to)) else {
            return false;
        };
        let op_from = match node_from {
            NodeRef::Operation(op) => Some(op),
            NodeRef::Component(component) => self.graph.component(component).exit(),
            NodeRef::TimeSource(_) => None,
        };
        let op_to = match node_to {
            NodeRef::Operation(op) => Some(op),
            NodeRef::Component(component) => self.graph.component(component).entry(),
            NodeRef::TimeSource(_) => None,
        };
        match (op_from, op_to) {
            (Some(from), Some(to)) => is_same_bone_relation(&self.graph, from, to),
            _ => false,
        }
    }
}
