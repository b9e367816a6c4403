//! Relation Builder
//!
//! Walks the scene once and turns every dependency it finds into a relation
//! between operations of the [`Depsgraph`].
//!
//! # Build order
//!
//! Building an entity happens in two steps:
//!
//! 1. Create every operation node the entity owns (find-or-create, so
//!    repeated calls are harmless).
//! 2. Add relations, recursing into referenced entities first so that their
//!    nodes exist by the time a key names them.
//!
//! A visited set makes sure each entity goes through both steps at most once
//! per pass. Entities that reference each other are fine: the second one to
//! be visited finds the first one's nodes already in place.
//!
//! # Failures
//!
//! Keys that do not resolve never abort a build. The relation is dropped and
//! a [`RelationFailure`] is written to the [`DiagnosticSink`] for each side
//! that failed.

mod animation;
mod config;
mod constraints;
mod diagnostics;
mod handle;
mod heuristics;
mod modifiers;
mod nodes;
mod object;
mod physics;
mod rig;
mod root_map;
mod scene;
mod shading;

pub use config::BuilderConfig;
pub use diagnostics::{CollectingSink, DiagnosticSink, LogSink, RelationFailure, RelationSide};
pub use handle::{HandleScope, NodeHandle};
pub use root_map::RootPChanMap;

use std::collections::HashSet;

use tracing::{debug, debug_span};

use crate::error::ResolveError;
use crate::graph::{
    Depsgraph, Key, NodeRef, NodeType, OpCode, OperationIndex, OperationKey, NO_TAG,
};
use crate::rna::{PropertyResolver, RnaPathResolver};
use crate::scene::{DatablockData, EntityId, Main, Scene};

/// State threaded explicitly through the build procedures.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildContext<'a> {
    /// The scene currently being built, if any. Physics lookups (colliders,
    /// effectors) are scoped to it.
    pub scene: Option<(EntityId, &'a Scene)>,
}

impl<'a> BuildContext<'a> {
    /// A context not bound to any scene.
    pub fn detached() -> Self {
        Self { scene: None }
    }

    pub fn for_scene(id: EntityId, scene: &'a Scene) -> Self {
        Self {
            scene: Some((id, scene)),
        }
    }
}

/// Builds the relations of a [`Depsgraph`] from a [`Main`] database.
pub struct RelationBuilder<'a> {
    main: &'a Main,
    graph: Depsgraph,
    resolver: Box<dyn PropertyResolver + 'a>,
    sink: Box<dyn DiagnosticSink + 'a>,
    config: BuilderConfig,
    visited: HashSet<EntityId>,
}

impl<'a> RelationBuilder<'a> {
    /// Create a builder with the default resolver, sink and configuration.
    pub fn new(main: &'a Main) -> Self {
        Self {
            main,
            graph: Depsgraph::new(),
            resolver: Box::new(RnaPathResolver),
            sink: Box::new(LogSink),
            config: BuilderConfig::default(),
            visited: HashSet::new(),
        }
    }

    pub fn with_config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the property resolver used for path keys.
    pub fn with_resolver(mut self, resolver: impl PropertyResolver + 'a) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Replace the diagnostics sink.
    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'a) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn main(&self) -> &'a Main {
        self.main
    }

    /// The graph built so far.
    pub fn graph(&self) -> &Depsgraph {
        &self.graph
    }

    /// Finish the pass: wire synthesized entry/exit operations and hand out
    /// the graph.
    pub fn finish(mut self) -> Depsgraph {
        self.graph.finalize();
        debug!(
            entities = self.graph.entity_count(),
            operations = self.graph.operation_count(),
            relations = self.graph.relation_count(),
            "relation build finished"
        );
        self.graph
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    /// Build a scene and everything reachable from it.
    pub fn build_scene(&mut self, scene: EntityId) {
        self.build_id(BuildContext::detached(), scene);
    }

    /// Build any entity, dispatching on its kind.
    ///
    /// Unknown entities are ignored; relations naming them will report
    /// diagnostics instead. Already built entities are skipped.
    pub fn build_id(&mut self, ctx: BuildContext<'a>, id: EntityId) {
        let main = self.main;
        let Some(datablock) = main.get(id) else {
            debug!(%id, "skipping unknown entity");
            return;
        };
        if !self.visited.insert(id) {
            return;
        }
        let _span = debug_span!("build_id", %id, kind = datablock.kind().code()).entered();

        self.build_nodes(datablock);

        match &datablock.data {
            DatablockData::Scene(scene) => self.build_scene_data(id, scene),
            DatablockData::Object(object) => self.build_object(ctx, id, object),
            DatablockData::Group(group) => self.build_group(ctx, group),
            DatablockData::Geometry(geometry) => self.build_geometry_data(ctx, id, geometry),
            DatablockData::Armature(_) => self.build_animdata(ctx, id),
            DatablockData::Camera(camera) => self.build_camera(ctx, id, camera),
            DatablockData::Lamp(lamp) => self.build_lamp(ctx, id, lamp),
            DatablockData::ShapeKey(key) => self.build_shapekeys(ctx, id, key),
            DatablockData::Material(material) => self.build_material(ctx, id, material),
            DatablockData::Texture(texture) => self.build_texture(ctx, id, texture),
            DatablockData::NodeTree(tree) => self.build_nodetree(ctx, id, tree),
            DatablockData::World(world) => self.build_world(ctx, id, world),
            DatablockData::ParticleSettings(settings) => {
                self.build_particle_settings(ctx, id, settings)
            }
            DatablockData::GreasePencil(gpd) => self.build_gpencil(ctx, id, gpd),
            DatablockData::CacheFile(cache_file) => self.build_cachefile(ctx, id, cache_file),
            DatablockData::Mask(mask) => self.build_mask(ctx, id, mask),
            DatablockData::MovieClip(_) => self.build_movieclip(ctx, id),
            DatablockData::Action(_) => {}
        }
    }

    // ------------------------------------------------------------------
    // Node lookup
    // ------------------------------------------------------------------

    /// Resolve any key, asking the property resolver for path keys.
    pub fn get_node(&mut self, key: &Key) -> Result<NodeRef, ResolveError> {
        match key {
            Key::Path(path) => {
                let target = self
                    .resolver
                    .resolve(self.main, path.id, &path.path)
                    .ok_or_else(|| ResolveError::UnresolvedPath {
                        id: path.id,
                        path: path.path.clone(),
                    })?;
                self.graph.resolve(&target.to_key())
            }
            other => self.graph.resolve(other),
        }
    }

    /// Get the operation relations out of the node a key names start at.
    pub fn find_operation_node(&mut self, key: &Key) -> Option<OperationIndex> {
        let node = self.get_node(key).ok()?;
        self.graph.exit_operation(node).ok()
    }

    /// Look up an operation without creating anything.
    pub fn find_node(&self, key: &OperationKey) -> Option<OperationIndex> {
        self.graph.find_node(key)
    }

    pub fn has_node(&self, key: &OperationKey) -> bool {
        self.graph.has_node(key)
    }

    /// Check whether an entity carries animation worth an animation node.
    pub fn needs_animdata_node(&self, id: EntityId) -> bool {
        self.main
            .anim_data(id)
            .is_some_and(|adt| adt.is_animated())
    }

    // ------------------------------------------------------------------
    // Relations
    // ------------------------------------------------------------------

    /// Add a relation from the exit of `from` to the entry of `to`.
    ///
    /// A time source on the `from` side records a time relation instead.
    /// Returns `false` when either side failed to resolve; the failure has
    /// been reported to the diagnostics sink by then.
    pub fn add_relation(
        &mut self,
        from: impl Into<Key>,
        to: impl Into<Key>,
        description: &str,
    ) -> bool {
        let from = from.into();
        let to = to.into();

        // Both sides are checked before any entry or exit is synthesized, so
        // a dropped relation leaves the graph untouched.
        let from_node = self
            .get_node(&from)
            .and_then(|node| self.graph.check_attachable(node).map(|()| node));
        let to_node = self.get_node(&to).and_then(|node| match node {
            NodeRef::TimeSource(_) => Err(ResolveError::TimeSourceNotOperation),
            node => self.graph.check_attachable(node).map(|()| node),
        });
        let (from_node, to_node) = match (from_node, to_node) {
            (Ok(from_node), Ok(to_node)) => (from_node, to_node),
            (from_node, to_node) => {
                if let Err(reason) = from_node {
                    self.report(description, &from, RelationSide::From, reason);
                }
                if let Err(reason) = to_node {
                    self.report(description, &to, RelationSide::To, reason);
                }
                return false;
            }
        };

        let to_op = match self.graph.entry_operation(to_node) {
            Ok(op) => op,
            Err(reason) => {
                self.report(description, &to, RelationSide::To, reason);
                return false;
            }
        };
        if let NodeRef::TimeSource(source) = from_node {
            self.graph.add_time_relation(source, to_op, description);
            return true;
        }
        match self.graph.exit_operation(from_node) {
            Ok(from_op) => {
                self.graph.add_operation_relation(from_op, to_op, description);
                true
            }
            Err(reason) => {
                self.report(description, &from, RelationSide::From, reason);
                false
            }
        }
    }

    /// Create a handle bound to the operation a key names.
    ///
    /// Returns `None` (and reports) if the key does not resolve.
    pub fn create_node_handle(
        &mut self,
        key: impl Into<Key>,
        default_name: &str,
    ) -> Option<NodeHandle> {
        let key = key.into();
        match self
            .get_node(&key)
            .and_then(|node| self.graph.entry_operation(node))
        {
            Ok(node) => Some(NodeHandle::new(node, default_name)),
            Err(reason) => {
                self.report(default_name, &key, RelationSide::To, reason);
                None
            }
        }
    }

    /// Add a relation ending at the operation a handle is bound to.
    pub fn add_node_handle_relation(
        &mut self,
        from: impl Into<Key>,
        handle: &NodeHandle,
        description: &str,
    ) -> bool {
        let from = from.into();
        let description = if description.is_empty() {
            handle.default_name()
        } else {
            description
        };
        match self.get_node(&from) {
            Ok(NodeRef::TimeSource(source)) => {
                self.graph.add_time_relation(source, handle.node(), description);
                true
            }
            Ok(node) => match self.graph.exit_operation(node) {
                Ok(op) => {
                    self.graph.add_operation_relation(op, handle.node(), description);
                    true
                }
                Err(reason) => {
                    self.report(description, &from, RelationSide::From, reason);
                    false
                }
            },
            Err(reason) => {
                self.report(description, &from, RelationSide::From, reason);
                false
            }
        }
    }

    /// Give a decoupled producer the narrow "depend on me" capability of a
    /// handle.
    pub fn handle_scope(&mut self, ctx: BuildContext<'a>, handle: NodeHandle) -> HandleScope<'_, 'a> {
        HandleScope::new(self, ctx, handle)
    }

    fn report(&mut self, description: &str, key: &Key, side: RelationSide, reason: ResolveError) {
        if !self.config.report_unresolved {
            return;
        }
        self.sink.report(RelationFailure {
            description: description.to_string(),
            key: key.identifier(),
            side,
            reason,
        });
    }

    // ------------------------------------------------------------------
    // Shared keys
    // ------------------------------------------------------------------

    /// Key of the operation evaluating an entity's action.
    fn animation_key(id: EntityId) -> OperationKey {
        OperationKey::new(id, NodeType::Animation, OpCode::Animation)
    }

    fn parameters_key(id: EntityId) -> OperationKey {
        OperationKey::new(id, NodeType::Parameters, OpCode::ParametersEval)
    }

    fn placeholder_key(id: EntityId, component: NodeType, name: &str) -> OperationKey {
        OperationKey::tagged(id, component, OpCode::Placeholder, name, NO_TAG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ComponentKey, PathKey, TimeSourceKey};
    use crate::scene::{Object, ObjectType};

    fn two_objects() -> (Main, EntityId, EntityId) {
        let mut main = Main::new();
        let a = main.add("OBA", Object::new(ObjectType::Empty));
        let b = main.add("OBB", Object::new(ObjectType::Empty));
        (main, a, b)
    }

    #[test]
    fn relation_between_components_uses_exit_and_entry() {
        let (main, a, b) = two_objects();
        let mut builder = RelationBuilder::new(&main);
        builder.build_id(BuildContext::detached(), a);
        builder.build_id(BuildContext::detached(), b);

        assert!(builder.add_relation(
            ComponentKey::new(a, NodeType::Transform),
            ComponentKey::new(b, NodeType::Transform),
            "A -> B",
        ));
        let graph = builder.finish();
        let exit = graph
            .component(graph.find_component(&ComponentKey::new(a, NodeType::Transform)).unwrap())
            .exit()
            .unwrap();
        let entry = graph
            .component(graph.find_component(&ComponentKey::new(b, NodeType::Transform)).unwrap())
            .entry()
            .unwrap();
        assert!(graph.has_relation(exit, entry));
    }

    #[test]
    fn dangling_key_reports_once() {
        let (main, a, _) = two_objects();
        let sink = CollectingSink::new();
        let mut builder = RelationBuilder::new(&main).with_sink(sink.clone());
        builder.build_id(BuildContext::detached(), a);
        let before = builder.graph().relation_count();

        let ok = builder.add_relation(
            ComponentKey::new(EntityId::from(99), NodeType::Transform),
            OperationKey::new(a, NodeType::Transform, OpCode::TransformLocal),
            "Ghost -> A",
        );

        assert!(!ok);
        assert_eq!(builder.graph().relation_count(), before);
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].side, RelationSide::From);
        assert_eq!(records[0].description, "Ghost -> A");
    }

    #[test]
    fn dropped_relation_leaves_finished_graph_unchanged() {
        let (main, a, _) = two_objects();
        let counts = |graph: &Depsgraph| (graph.operation_count(), graph.relation_count());

        let mut clean = RelationBuilder::new(&main);
        clean.build_id(BuildContext::detached(), a);
        let clean = clean.finish();

        let sink = CollectingSink::new();
        let mut builder = RelationBuilder::new(&main).with_sink(sink.clone());
        builder.build_id(BuildContext::detached(), a);
        assert!(!builder.add_relation(
            ComponentKey::new(a, NodeType::Transform),
            ComponentKey::new(EntityId::from(999), NodeType::Transform),
            "A -> Ghost",
        ));
        assert!(!builder.add_relation(
            ComponentKey::new(EntityId::from(999), NodeType::Transform),
            ComponentKey::new(a, NodeType::Transform),
            "Ghost -> A",
        ));
        let dangling = builder.finish();

        assert_eq!(sink.records().len(), 2);
        assert_eq!(counts(&dangling), counts(&clean));
        let transform = dangling
            .find_component(&ComponentKey::new(a, NodeType::Transform))
            .unwrap();
        assert_eq!(dangling.component(transform).entry(), None);
        assert_eq!(dangling.component(transform).exit(), None);
    }

    #[test]
    fn reporting_can_be_disabled() {
        let (main, a, _) = two_objects();
        let sink = CollectingSink::new();
        let config = BuilderConfig {
            report_unresolved: false,
            ..BuilderConfig::default()
        };
        let mut builder = RelationBuilder::new(&main)
            .with_config(config)
            .with_sink(sink.clone());
        builder.build_id(BuildContext::detached(), a);
        builder.add_relation(
            PathKey::new(a, "pose.bones[\"Nope\"]"),
            ComponentKey::new(a, NodeType::Transform),
            "Missing Bone",
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn time_source_relation_is_not_an_operation_relation() {
        let (main, a, _) = two_objects();
        let mut builder = RelationBuilder::new(&main);
        builder.build_id(BuildContext::detached(), a);
        let before = builder.graph().relation_count();

        assert!(builder.add_relation(
            TimeSourceKey::new(),
            OperationKey::new(a, NodeType::Transform, OpCode::TransformLocal),
            "TimeSrc -> Local",
        ));
        let graph = builder.graph();
        assert_eq!(graph.relation_count(), before);
        assert_eq!(graph.time_source(graph.global_time_source()).outlinks().len(), 1);
    }

    #[test]
    fn node_handle_relations_end_at_the_bound_operation() {
        let (main, a, b) = two_objects();
        let mut builder = RelationBuilder::new(&main);
        builder.build_id(BuildContext::detached(), a);
        builder.build_id(BuildContext::detached(), b);

        let key = OperationKey::new(b, NodeType::Transform, OpCode::TransformLocal);
        let handle = builder.create_node_handle(&key, "Handle").unwrap();
        assert!(builder.add_node_handle_relation(
            OperationKey::new(a, NodeType::Transform, OpCode::TransformFinal),
            &handle,
            "",
        ));

        let from = builder
            .find_node(&OperationKey::new(a, NodeType::Transform, OpCode::TransformFinal))
            .unwrap();
        let relation = builder.graph().find_relation(from, handle.node()).unwrap();
        assert_eq!(relation.description, "Handle");
    }

    #[test]
    fn rebuilding_an_entity_adds_nothing() {
        let (main, a, _) = two_objects();
        let mut builder = RelationBuilder::new(&main);
        builder.build_id(BuildContext::detached(), a);
        let counts = (
            builder.graph().operation_count(),
            builder.graph().relation_count(),
        );

        builder.visited.clear();
        builder.build_id(BuildContext::detached(), a);
        assert_eq!(
            counts,
            (
                builder.graph().operation_count(),
                builder.graph().relation_count()
            )
        );
    }
}
