//! Node Store
//!
//! The [`Depsgraph`] owns every node of a build pass in flat arenas and
//! answers key lookups.
//!
//! # Resolution
//!
//! - Entities must have been added explicitly. A key naming an unknown
//!   entity never resolves.
//! - Components are created on demand for known entities.
//! - Operations are only ever created by [`Depsgraph::add_operation`] and
//!   [`Depsgraph::ensure_operation`]. Resolution never creates them.
//!
//! # Entry and exit
//!
//! Relations that target a whole component attach to its entry operation,
//! relations leaving a component start at its exit operation. Components may
//! declare both explicitly; otherwise a no-op entry/exit is synthesized on
//! first request and wired to the component's operations by
//! [`Depsgraph::finalize`].

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::trace;

use super::keys::{ComponentKey, Key, OperationKey, TimeSourceKey, NO_TAG};
use super::node::{
    ComponentIndex, ComponentNode, EntityIndex, EntityNode, NodeRef, OperationIdentity,
    OperationIndex, OperationNode, Relation, RelationIndex, TimeRelation, TimeSourceIndex,
    TimeSourceNode,
};
use super::types::{NodeType, OpCode};
use crate::error::ResolveError;
use crate::scene::EntityId;

const GLOBAL_TIME_SOURCE: TimeSourceIndex = TimeSourceIndex(0);

/// The dependency graph produced by one build pass.
#[derive(Debug)]
pub struct Depsgraph {
    entities: Vec<EntityNode>,
    entity_index: IndexMap<EntityId, EntityIndex>,
    components: Vec<ComponentNode>,
    operations: Vec<OperationNode>,
    relations: Vec<Relation>,
    relation_lookup: HashMap<(OperationIndex, OperationIndex), RelationIndex>,
    time_sources: Vec<TimeSourceNode>,
}

impl Depsgraph {
    /// Create an empty graph holding only the global time source.
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            entity_index: IndexMap::new(),
            components: Vec::new(),
            operations: Vec::new(),
            relations: Vec::new(),
            relation_lookup: HashMap::new(),
            time_sources: vec![TimeSourceNode::new(None)],
        }
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Add the node for an entity. Adding the same entity twice is a no-op.
    pub fn add_entity(&mut self, id: EntityId, name: &str) -> EntityIndex {
        if let Some(&index) = self.entity_index.get(&id) {
            return index;
        }
        let index = EntityIndex::new(self.entities.len());
        self.entities.push(EntityNode::new(id, name.to_string()));
        self.entity_index.insert(id, index);
        index
    }

    /// Get the node index of an entity, if it is part of the graph.
    pub fn find_entity(&self, id: EntityId) -> Option<EntityIndex> {
        self.entity_index.get(&id).copied()
    }

    /// Find or create a component of an entity.
    pub fn ensure_component(
        &mut self,
        entity: EntityIndex,
        kind: NodeType,
        name: &str,
    ) -> ComponentIndex {
        if let Some(component) = self.entities[entity.index()].component(kind, name) {
            return component;
        }
        let component = ComponentIndex::new(self.components.len());
        self.components
            .push(ComponentNode::new(entity, kind, name.to_string()));
        self.entities[entity.index()]
            .components
            .insert((kind, name.to_string()), component);
        component
    }

    /// Find or create an operation inside a component.
    pub fn add_operation(
        &mut self,
        component: ComponentIndex,
        opcode: OpCode,
        name: &str,
        tag: i32,
    ) -> OperationIndex {
        let identity = OperationIdentity {
            opcode,
            name: name.to_string(),
            tag,
        };
        if let Some(&op) = self.components[component.index()].operations.get(&identity) {
            return op;
        }
        let op = OperationIndex::new(self.operations.len());
        self.operations
            .push(OperationNode::new(component, identity.clone()));
        self.components[component.index()]
            .operations
            .insert(identity, op);
        op
    }

    /// Find or create the operation a key names. The entity must be known.
    pub fn ensure_operation(&mut self, key: &OperationKey) -> Result<OperationIndex, ResolveError> {
        let entity = self
            .find_entity(key.id)
            .ok_or(ResolveError::UnknownEntity(key.id))?;
        let component = self.ensure_component(entity, key.component, &key.component_name);
        Ok(self.add_operation(component, key.opcode, &key.name, key.name_tag))
    }

    /// Declare the operation as its component's entry point.
    pub fn set_entry_operation(&mut self, op: OperationIndex) {
        let component = self.operations[op.index()].owner();
        self.components[component.index()].entry = Some(op);
    }

    /// Declare the operation as its component's exit point.
    pub fn set_exit_operation(&mut self, op: OperationIndex) {
        let component = self.operations[op.index()].owner();
        self.components[component.index()].exit = Some(op);
    }

    // ------------------------------------------------------------------
    // Lookup without side effects
    // ------------------------------------------------------------------

    fn lookup_operation(
        &self,
        component: ComponentIndex,
        opcode: OpCode,
        name: &str,
        tag: i32,
    ) -> Option<OperationIndex> {
        let comp = &self.components[component.index()];
        let identity = OperationIdentity {
            opcode,
            name: name.to_string(),
            tag,
        };
        if let Some(&op) = comp.operations.get(&identity) {
            return Some(op);
        }
        // An opcode-only key still matches when exactly one operation
        // carries that opcode.
        if name.is_empty() && tag == NO_TAG {
            let mut candidates = comp
                .operations
                .iter()
                .filter(|(ident, _)| ident.opcode == opcode);
            let (_, &first) = candidates.next()?;
            if candidates.next().is_none() {
                return Some(first);
            }
        }
        None
    }

    /// Find the operation a key names without creating anything.
    pub fn find_node(&self, key: &OperationKey) -> Option<OperationIndex> {
        let entity = self.find_entity(key.id)?;
        let component = self.entities[entity.index()].component(key.component, &key.component_name)?;
        self.lookup_operation(component, key.opcode, &key.name, key.name_tag)
    }

    /// Check whether the operation a key names exists.
    pub fn has_node(&self, key: &OperationKey) -> bool {
        self.find_node(key).is_some()
    }

    /// Find a component without creating it.
    pub fn find_component(&self, key: &ComponentKey) -> Option<ComponentIndex> {
        let entity = self.find_entity(key.id)?;
        self.entities[entity.index()].component(key.kind, &key.name)
    }

    // ------------------------------------------------------------------
    // Key resolution
    // ------------------------------------------------------------------

    /// Resolve a time source key. Entity-scoped sources are created lazily.
    pub fn resolve_time_source(&mut self, key: &TimeSourceKey) -> Result<TimeSourceIndex, ResolveError> {
        let Some(id) = key.id else {
            return Ok(GLOBAL_TIME_SOURCE);
        };
        let entity = self.find_entity(id).ok_or(ResolveError::UnknownEntity(id))?;
        if let Some(source) = self.entities[entity.index()].time_source {
            return Ok(source);
        }
        let source = TimeSourceIndex::new(self.time_sources.len());
        self.time_sources.push(TimeSourceNode::new(Some(entity)));
        self.entities[entity.index()].time_source = Some(source);
        Ok(source)
    }

    /// Resolve a component key, creating the component for a known entity.
    pub fn resolve_component(&mut self, key: &ComponentKey) -> Result<ComponentIndex, ResolveError> {
        let entity = self
            .find_entity(key.id)
            .ok_or(ResolveError::UnknownEntity(key.id))?;
        Ok(self.ensure_component(entity, key.kind, &key.name))
    }

    /// Resolve an operation key. Never creates the operation.
    pub fn resolve_operation(&mut self, key: &OperationKey) -> Result<OperationIndex, ResolveError> {
        let entity = self
            .find_entity(key.id)
            .ok_or(ResolveError::UnknownEntity(key.id))?;
        let component = self.ensure_component(entity, key.component, &key.component_name);
        self.lookup_operation(component, key.opcode, &key.name, key.name_tag)
            .ok_or_else(|| ResolveError::OperationNotFound {
                operation: key.identifier(),
            })
    }

    /// Resolve any key that does not need the property resolver.
    pub fn resolve(&mut self, key: &Key) -> Result<NodeRef, ResolveError> {
        match key {
            Key::TimeSource(key) => self.resolve_time_source(key).map(NodeRef::TimeSource),
            Key::Component(key) => self.resolve_component(key).map(NodeRef::Component),
            Key::Operation(key) => self.resolve_operation(key).map(NodeRef::Operation),
            Key::Path(key) => Err(ResolveError::UnresolvedPath {
                id: key.id,
                path: key.path.clone(),
            }),
        }
    }

    /// Get the operation relations into `node` must end at.
    pub fn entry_operation(&mut self, node: NodeRef) -> Result<OperationIndex, ResolveError> {
        match node {
            NodeRef::Operation(op) => Ok(op),
            NodeRef::Component(component) => self.component_aggregate(component, OpCode::ComponentEntry),
            NodeRef::TimeSource(_) => Err(ResolveError::TimeSourceNotOperation),
        }
    }

    /// Get the operation relations out of `node` must start at.
    pub fn exit_operation(&mut self, node: NodeRef) -> Result<OperationIndex, ResolveError> {
        match node {
            NodeRef::Operation(op) => Ok(op),
            NodeRef::Component(component) => self.component_aggregate(component, OpCode::ComponentExit),
            NodeRef::TimeSource(_) => Err(ResolveError::TimeSourceNotOperation),
        }
    }

    /// Check that relations can attach to `node` without creating anything.
    ///
    /// A component without operations has nothing to synthesize an entry or
    /// exit from.
    pub fn check_attachable(&self, node: NodeRef) -> Result<(), ResolveError> {
        match node {
            NodeRef::Component(component) => {
                let comp = &self.components[component.index()];
                if comp.entry.is_none() && comp.exit.is_none() && comp.operations.is_empty() {
                    Err(ResolveError::NoOperations {
                        component: self.component_identifier(component),
                    })
                } else {
                    Ok(())
                }
            }
            NodeRef::Operation(_) | NodeRef::TimeSource(_) => Ok(()),
        }
    }

    fn component_aggregate(
        &mut self,
        component: ComponentIndex,
        opcode: OpCode,
    ) -> Result<OperationIndex, ResolveError> {
        let comp = &self.components[component.index()];
        let declared = if opcode == OpCode::ComponentEntry {
            comp.entry
        } else {
            comp.exit
        };
        if let Some(op) = declared {
            return Ok(op);
        }
        if comp.operations.is_empty() {
            return Err(ResolveError::NoOperations {
                component: self.component_identifier(component),
            });
        }
        let op = self.add_operation(component, opcode, "", NO_TAG);
        let comp = &mut self.components[component.index()];
        if opcode == OpCode::ComponentEntry {
            comp.entry = Some(op);
        } else {
            comp.exit = Some(op);
        }
        Ok(op)
    }

    // ------------------------------------------------------------------
    // Relations
    // ------------------------------------------------------------------

    /// Insert a relation between two operations.
    ///
    /// Inserting the same pair twice returns the existing relation.
    pub fn add_operation_relation(
        &mut self,
        from: OperationIndex,
        to: OperationIndex,
        description: &str,
    ) -> RelationIndex {
        if let Some(&existing) = self.relation_lookup.get(&(from, to)) {
            trace!(description, "relation already present");
            return existing;
        }
        let relation = RelationIndex::new(self.relations.len());
        self.relations.push(Relation {
            from,
            to,
            description: description.to_string(),
        });
        self.relation_lookup.insert((from, to), relation);
        self.operations[from.index()].outlinks.push(relation);
        self.operations[to.index()].inlinks.push(relation);
        trace!(
            from = %self.operation_identifier(from),
            to = %self.operation_identifier(to),
            description,
            "added relation"
        );
        relation
    }

    /// Make an operation depend on a time source.
    ///
    /// Returns `false` if the relation already existed.
    pub fn add_time_relation(
        &mut self,
        source: TimeSourceIndex,
        to: OperationIndex,
        description: &str,
    ) -> bool {
        let node = &mut self.time_sources[source.index()];
        if node.outlinks.iter().any(|relation| relation.to == to) {
            return false;
        }
        node.outlinks.push(TimeRelation {
            to,
            description: description.to_string(),
        });
        self.operations[to.index()].time_inlinks += 1;
        true
    }

    /// Wire synthesized entry/exit operations to their component members.
    ///
    /// Every member without a predecessor inside the component follows the
    /// entry; every member without a successor inside the component precedes
    /// the exit. Safe to call more than once.
    pub fn finalize(&mut self) {
        for index in 0..self.components.len() {
            let component = ComponentIndex::new(index);
            let comp = &self.components[index];
            let entry = comp
                .entry
                .filter(|op| self.operations[op.index()].opcode() == OpCode::ComponentEntry);
            let exit = comp
                .exit
                .filter(|op| self.operations[op.index()].opcode() == OpCode::ComponentExit);
            if entry.is_none() && exit.is_none() {
                continue;
            }
            let members: Vec<OperationIndex> = comp
                .operations()
                .filter(|op| !self.operations[op.index()].opcode().is_aggregation())
                .collect();

            for op in members {
                if let Some(entry) = entry {
                    let has_internal_predecessor = self.operations[op.index()]
                        .inlinks
                        .iter()
                        .map(|r| self.relations[r.index()].from)
                        .any(|from| from != entry && self.operations[from.index()].owner() == component);
                    if !has_internal_predecessor {
                        self.add_operation_relation(entry, op, "Component Entry");
                    }
                }
                if let Some(exit) = exit {
                    let has_internal_successor = self.operations[op.index()]
                        .outlinks
                        .iter()
                        .map(|r| self.relations[r.index()].to)
                        .any(|to| to != exit && self.operations[to.index()].owner() == component);
                    if !has_internal_successor {
                        self.add_operation_relation(op, exit, "Component Exit");
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Read interface
    // ------------------------------------------------------------------

    /// Iterate over all entity nodes.
    pub fn entities(&self) -> impl Iterator<Item = (EntityIndex, &EntityNode)> + '_ {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, node)| (EntityIndex::new(i), node))
    }

    pub fn entity(&self, index: EntityIndex) -> &EntityNode {
        &self.entities[index.index()]
    }

    pub fn component(&self, index: ComponentIndex) -> &ComponentNode {
        &self.components[index.index()]
    }

    pub fn operation(&self, index: OperationIndex) -> &OperationNode {
        &self.operations[index.index()]
    }

    pub fn relation(&self, index: RelationIndex) -> &Relation {
        &self.relations[index.index()]
    }

    /// Get all relations in insertion order.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Iterate over every operation index.
    pub fn operation_indices(&self) -> impl Iterator<Item = OperationIndex> {
        (0..self.operations.len()).map(OperationIndex::new)
    }

    /// Get the operations of a component.
    pub fn component_operations(&self, component: ComponentIndex) -> impl Iterator<Item = OperationIndex> + '_ {
        self.components[component.index()].operations()
    }

    /// Get relations leaving an operation.
    pub fn outgoing(&self, op: OperationIndex) -> impl Iterator<Item = &Relation> + '_ {
        self.operations[op.index()]
            .outlinks
            .iter()
            .map(|r| &self.relations[r.index()])
    }

    /// Get relations arriving at an operation.
    pub fn incoming(&self, op: OperationIndex) -> impl Iterator<Item = &Relation> + '_ {
        self.operations[op.index()]
            .inlinks
            .iter()
            .map(|r| &self.relations[r.index()])
    }

    /// Check whether a relation `from -> to` exists.
    pub fn has_relation(&self, from: OperationIndex, to: OperationIndex) -> bool {
        self.relation_lookup.contains_key(&(from, to))
    }

    /// Get the relation `from -> to`, if any.
    pub fn find_relation(&self, from: OperationIndex, to: OperationIndex) -> Option<&Relation> {
        self.relation_lookup
            .get(&(from, to))
            .map(|r| &self.relations[r.index()])
    }

    /// Get the global time source.
    pub fn global_time_source(&self) -> TimeSourceIndex {
        GLOBAL_TIME_SOURCE
    }

    pub fn time_source(&self, index: TimeSourceIndex) -> &TimeSourceNode {
        &self.time_sources[index.index()]
    }

    /// Iterate over all time sources, global first.
    pub fn time_sources(&self) -> impl Iterator<Item = (TimeSourceIndex, &TimeSourceNode)> + '_ {
        self.time_sources
            .iter()
            .enumerate()
            .map(|(i, node)| (TimeSourceIndex::new(i), node))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    /// Human-readable name of a component, e.g. `OBArm/Bone 'Hand'`.
    pub fn component_identifier(&self, index: ComponentIndex) -> String {
        let comp = &self.components[index.index()];
        let entity = &self.entities[comp.owner().index()];
        if comp.name().is_empty() {
            format!("{}/{}", entity.name(), comp.kind())
        } else {
            format!("{}/{} '{}'", entity.name(), comp.kind(), comp.name())
        }
    }

    /// Human-readable name of an operation, e.g. `OBArm/Bone 'Hand'/BONE_DONE`.
    pub fn operation_identifier(&self, index: OperationIndex) -> String {
        let op = &self.operations[index.index()];
        let mut out = format!("{}/{}", self.component_identifier(op.owner()), op.opcode());
        if !op.name().is_empty() {
            out.push_str(&format!("({})", op.name()));
        }
        if op.name_tag() != NO_TAG {
            out.push_str(&format!("[{}]", op.name_tag()));
        }
        out
    }
}

impl Default for Depsgraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_entity() -> (Depsgraph, EntityId) {
        let mut graph = Depsgraph::new();
        let id = EntityId::from(1);
        graph.add_entity(id, "OBCube");
        (graph, id)
    }

    #[test]
    fn unknown_entity_never_resolves() {
        let mut graph = Depsgraph::new();
        let key = ComponentKey::new(EntityId::from(9), NodeType::Transform);
        assert_eq!(
            graph.resolve_component(&key),
            Err(ResolveError::UnknownEntity(EntityId::from(9)))
        );
        assert_eq!(graph.entity_count(), 0);
    }

    #[test]
    fn resolution_creates_components_but_not_operations() {
        let (mut graph, id) = graph_with_entity();
        let key = OperationKey::new(id, NodeType::Transform, OpCode::TransformLocal);

        assert!(matches!(
            graph.resolve_operation(&key),
            Err(ResolveError::OperationNotFound { .. })
        ));
        assert_eq!(graph.component_count(), 1);
        assert_eq!(graph.operation_count(), 0);
    }

    #[test]
    fn operation_resolution_is_deterministic() {
        let (mut graph, id) = graph_with_entity();
        let key = OperationKey::new(id, NodeType::Transform, OpCode::TransformLocal);
        let created = graph.ensure_operation(&key).unwrap();

        assert_eq!(graph.resolve_operation(&key).unwrap(), created);
        assert_eq!(graph.resolve_operation(&key).unwrap(), created);
        assert_eq!(graph.ensure_operation(&key).unwrap(), created);
        assert_eq!(graph.operation_count(), 1);
    }

    #[test]
    fn tags_disambiguate_shared_opcodes() {
        let (mut graph, id) = graph_with_entity();
        let x = OperationKey::tagged(id, NodeType::Animation, OpCode::Driver, "location", 0);
        let y = OperationKey::tagged(id, NodeType::Animation, OpCode::Driver, "location", 1);
        let op_x = graph.ensure_operation(&x).unwrap();
        let op_y = graph.ensure_operation(&y).unwrap();
        assert_ne!(op_x, op_y);

        // Ambiguous opcode-only lookup does not pick one arbitrarily.
        let bare = OperationKey::new(id, NodeType::Animation, OpCode::Driver);
        assert!(graph.find_node(&bare).is_none());
    }

    #[test]
    fn opcode_only_key_matches_unique_operation() {
        let (mut graph, id) = graph_with_entity();
        let named = OperationKey::tagged(id, NodeType::EvalPose, OpCode::PoseIkSolver, "Root", NO_TAG);
        let op = graph.ensure_operation(&named).unwrap();
        let bare = OperationKey::new(id, NodeType::EvalPose, OpCode::PoseIkSolver);
        assert_eq!(graph.find_node(&bare), Some(op));
    }

    #[test]
    fn duplicate_relations_are_collapsed() {
        let (mut graph, id) = graph_with_entity();
        let a = graph
            .ensure_operation(&OperationKey::new(id, NodeType::Transform, OpCode::TransformLocal))
            .unwrap();
        let b = graph
            .ensure_operation(&OperationKey::new(id, NodeType::Transform, OpCode::TransformFinal))
            .unwrap();

        let first = graph.add_operation_relation(a, b, "Local -> Final");
        let second = graph.add_operation_relation(a, b, "Local -> Final");
        assert_eq!(first, second);
        assert_eq!(graph.relation_count(), 1);
        assert_eq!(graph.operation(a).outlinks().len(), 1);
        assert_eq!(graph.operation(b).inlinks().len(), 1);
    }

    #[test]
    fn empty_component_has_no_entry() {
        let (mut graph, id) = graph_with_entity();
        let component = graph
            .resolve_component(&ComponentKey::new(id, NodeType::Geometry))
            .unwrap();
        assert!(matches!(
            graph.entry_operation(NodeRef::Component(component)),
            Err(ResolveError::NoOperations { .. })
        ));
    }

    #[test]
    fn declared_entry_and_exit_win() {
        let (mut graph, id) = graph_with_entity();
        let local = graph
            .ensure_operation(&OperationKey::in_component(id, NodeType::Bone, "Hand", OpCode::BoneLocal))
            .unwrap();
        let done = graph
            .ensure_operation(&OperationKey::in_component(id, NodeType::Bone, "Hand", OpCode::BoneDone))
            .unwrap();
        graph.set_entry_operation(local);
        graph.set_exit_operation(done);

        let bone = graph
            .resolve_component(&ComponentKey::named(id, NodeType::Bone, "Hand"))
            .unwrap();
        assert_eq!(graph.entry_operation(NodeRef::Component(bone)).unwrap(), local);
        assert_eq!(graph.exit_operation(NodeRef::Component(bone)).unwrap(), done);
    }

    #[test]
    fn finalize_wires_synthesized_aggregates() {
        let (mut graph, id) = graph_with_entity();
        let local = graph
            .ensure_operation(&OperationKey::new(id, NodeType::Transform, OpCode::TransformLocal))
            .unwrap();
        let last = graph
            .ensure_operation(&OperationKey::new(id, NodeType::Transform, OpCode::TransformFinal))
            .unwrap();
        graph.add_operation_relation(local, last, "Local -> Final");

        let transform = graph
            .resolve_component(&ComponentKey::new(id, NodeType::Transform))
            .unwrap();
        let entry = graph.entry_operation(NodeRef::Component(transform)).unwrap();
        let exit = graph.exit_operation(NodeRef::Component(transform)).unwrap();
        graph.finalize();

        assert!(graph.has_relation(entry, local));
        assert!(!graph.has_relation(entry, last));
        assert!(graph.has_relation(last, exit));
        assert!(!graph.has_relation(local, exit));

        let count = graph.relation_count();
        graph.finalize();
        assert_eq!(graph.relation_count(), count);
    }

    #[test]
    fn entity_time_source_is_lazy_and_stable() {
        let (mut graph, id) = graph_with_entity();
        let global = graph.resolve_time_source(&TimeSourceKey::new()).unwrap();
        let scoped = graph.resolve_time_source(&TimeSourceKey::for_entity(id)).unwrap();
        assert_eq!(global, graph.global_time_source());
        assert_ne!(global, scoped);
        assert_eq!(graph.resolve_time_source(&TimeSourceKey::for_entity(id)).unwrap(), scoped);
        assert!(graph
            .resolve_time_source(&TimeSourceKey::for_entity(EntityId::from(42)))
            .is_err());
    }

    #[test]
    fn time_relations_are_deduplicated() {
        let (mut graph, id) = graph_with_entity();
        let op = graph
            .ensure_operation(&OperationKey::new(id, NodeType::Animation, OpCode::Animation))
            .unwrap();
        let source = graph.global_time_source();
        assert!(graph.add_time_relation(source, op, "TimeSrc -> Animation"));
        assert!(!graph.add_time_relation(source, op, "TimeSrc -> Animation"));
        assert_eq!(graph.time_source(source).outlinks().len(), 1);
        assert!(graph.operation(op).is_time_dependent());
    }
}
