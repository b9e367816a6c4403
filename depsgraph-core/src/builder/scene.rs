//! Scenes and the scene-level data blocks hanging off them.

use super::{BuildContext, RelationBuilder};
use crate::graph::{ComponentKey, NodeType, OpCode, OperationKey, TimeSourceKey};
use crate::scene::{CacheFile, EntityId, GreasePencil, IdKind, Mask, Scene};

impl<'a> RelationBuilder<'a> {
    pub(super) fn build_scene_data(&mut self, id: EntityId, scene: &'a Scene) {
        // Background sets are scenes of their own.
        if let Some(set) = scene.set {
            self.build_id(BuildContext::detached(), set);
        }

        let ctx = BuildContext::for_scene(id, scene);
        for &object in &scene.objects {
            self.build_id(ctx, object);
        }
        if let Some(camera) = scene.camera {
            self.build_id(ctx, camera);
        }
        if let Some(rbw) = &scene.rigidbody_world {
            self.build_rigidbody(ctx, id, rbw);
        }

        self.build_animdata(ctx, id);
        if self.needs_animdata_node(id) {
            self.add_relation(Self::animation_key(id), Self::parameters_key(id), "Scene Animation");
        }

        if let Some(world) = scene.world {
            self.build_id(ctx, world);
        }
        if let Some(compositor) = scene.compositor {
            self.build_compositor(ctx, id, compositor);
        }
        if let Some(gpd) = scene.grease_pencil {
            self.build_id(ctx, gpd);
        }

        // Masks, clips and cache files are evaluated whether or not
        // something in the scene uses them.
        let main = self.main;
        for kind in [IdKind::Mask, IdKind::MovieClip, IdKind::CacheFile] {
            for datablock in main.iter_kind(kind) {
                self.build_id(ctx, datablock.id());
            }
        }
    }

    /// The compositing node tree is evaluated as part of the scene's
    /// parameters.
    fn build_compositor(&mut self, ctx: BuildContext<'a>, id: EntityId, ntree: EntityId) {
        self.build_id(ctx, ntree);
        self.add_relation(Self::parameters_key(ntree), Self::parameters_key(id), "Compositor");
    }

    pub(super) fn build_gpencil(&mut self, ctx: BuildContext<'a>, id: EntityId, gpd: &'a GreasePencil) {
        self.build_animdata(ctx, id);
        if self.needs_animdata_node(id) {
            self.add_relation(Self::animation_key(id), Self::parameters_key(id), "GPencil Animation");
        }
        for layer in &gpd.layers {
            let Some(parent) = layer.parent else {
                continue;
            };
            self.build_id(ctx, parent);
            self.add_relation(
                ComponentKey::new(parent, NodeType::Transform),
                Self::parameters_key(id),
                "GPencil Layer Parent",
            );
        }
    }

    pub(super) fn build_cachefile(
        &mut self,
        ctx: BuildContext<'a>,
        id: EntityId,
        cache_file: &'a CacheFile,
    ) {
        let update = OperationKey::new(id, NodeType::Cache, OpCode::CacheFileUpdate);
        self.build_animdata(ctx, id);
        if cache_file.is_sequence {
            self.add_relation(TimeSourceKey::new(), &update, "TimeSrc -> Cache File");
        }
        if self.needs_animdata_node(id) {
            self.add_relation(Self::animation_key(id), &update, "Cache File Animation");
        }
    }

    pub(super) fn build_mask(&mut self, ctx: BuildContext<'a>, id: EntityId, mask: &'a Mask) {
        let animation = OperationKey::new(id, NodeType::Animation, OpCode::MaskAnimation);
        let evaluate = OperationKey::new(id, NodeType::Parameters, OpCode::MaskEval);

        self.build_animdata(ctx, id);
        self.add_relation(TimeSourceKey::new(), &animation, "TimeSrc -> Mask Animation");
        if self.needs_animdata_node(id) {
            self.add_relation(Self::animation_key(id), &animation, "Mask Animation");
        }
        self.add_relation(&animation, &evaluate, "Mask Animation -> Mask Eval");

        for layer in &mask.layers {
            for &clip in &layer.parents {
                self.build_id(ctx, clip);
                self.add_relation(
                    ComponentKey::new(clip, NodeType::Parameters),
                    &evaluate,
                    "Mask Parent",
                );
            }
        }
    }

    pub(super) fn build_movieclip(&mut self, ctx: BuildContext<'a>, id: EntityId) {
        self.build_animdata(ctx, id);
        if self.needs_animdata_node(id) {
            self.add_relation(
                Self::animation_key(id),
                OperationKey::new(id, NodeType::Parameters, OpCode::MovieClipEval),
                "Movie Clip Animation",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CollectingSink;
    use crate::graph::{Depsgraph, UpdateScheduler};
    use crate::scene::{
        GpLayer, Main, MaskLayer, MovieClip, NodeTree, Object, ObjectType, World,
    };

    fn linked(graph: &Depsgraph, from: &OperationKey, to: &OperationKey) -> bool {
        match (graph.find_node(from), graph.find_node(to)) {
            (Some(from), Some(to)) => graph.has_relation(from, to),
            _ => false,
        }
    }

    fn linked_from_component(graph: &Depsgraph, from: &ComponentKey, to: &OperationKey) -> bool {
        let exit = graph
            .find_component(from)
            .and_then(|component| graph.component(component).exit());
        match (exit, graph.find_node(to)) {
            (Some(from), Some(to)) => graph.has_relation(from, to),
            _ => false,
        }
    }

    fn time_feeds(graph: &Depsgraph, to: &OperationKey) -> bool {
        let Some(op) = graph.find_node(to) else {
            return false;
        };
        graph
            .time_source(graph.global_time_source())
            .outlinks()
            .iter()
            .any(|relation| relation.to == op)
    }

    #[test]
    fn scene_builds_objects_world_and_compositor() {
        let mut main = Main::new();
        let cube = main.add("Cube", Object::new(ObjectType::Empty));
        let world = main.add("World", World::default());
        let compositor = main.add("Compositing", NodeTree::default());
        let scene = main.add(
            "Scene",
            Scene {
                objects: vec![cube],
                world: Some(world),
                compositor: Some(compositor),
                ..Default::default()
            },
        );

        let sink = CollectingSink::new();
        let mut builder = RelationBuilder::new(&main).with_sink(sink.clone());
        builder.build_scene(scene);
        let graph = builder.finish();

        assert!(graph
            .find_node(&OperationKey::new(cube, NodeType::Transform, OpCode::TransformFinal))
            .is_some());
        assert!(graph
            .find_node(&OperationKey::new(world, NodeType::Shading, OpCode::WorldUpdate))
            .is_some());
        assert!(linked(
            &graph,
            &RelationBuilder::parameters_key(compositor),
            &RelationBuilder::parameters_key(scene),
        ));
        assert!(sink.is_empty(), "{:?}", sink.records());
    }

    #[test]
    fn set_scene_objects_are_built_too() {
        let mut main = Main::new();
        let background = main.add("Background", Object::new(ObjectType::Empty));
        let set = main.add(
            "Set",
            Scene {
                objects: vec![background],
                ..Default::default()
            },
        );
        let scene = main.add(
            "Scene",
            Scene {
                set: Some(set),
                ..Default::default()
            },
        );

        let mut builder = RelationBuilder::new(&main);
        builder.build_scene(scene);
        let graph = builder.finish();
        assert!(graph
            .find_node(&OperationKey::new(background, NodeType::Transform, OpCode::TransformLocal))
            .is_some());
    }

    #[test]
    fn grease_pencil_layers_follow_their_parents() {
        let mut main = Main::new();
        let parent = main.add("Empty", Object::new(ObjectType::Empty));
        let gpd = main.add(
            "Strokes",
            GreasePencil {
                layers: vec![GpLayer {
                    name: "Lines".into(),
                    parent: Some(parent),
                }],
            },
        );
        let scene = main.add(
            "Scene",
            Scene {
                grease_pencil: Some(gpd),
                ..Default::default()
            },
        );

        let mut builder = RelationBuilder::new(&main);
        builder.build_scene(scene);
        let graph = builder.finish();
        assert!(linked_from_component(
            &graph,
            &ComponentKey::new(parent, NodeType::Transform),
            &RelationBuilder::parameters_key(gpd),
        ));
    }

    #[test]
    fn cache_file_sequences_depend_on_time() {
        let mut main = Main::new();
        let sequence = main.add("Sequence", CacheFile { is_sequence: true });
        let single = main.add("Single", CacheFile { is_sequence: false });
        let scene = main.add("Scene", Scene::default());

        let mut builder = RelationBuilder::new(&main);
        builder.build_scene(scene);
        let graph = builder.finish();
        assert!(time_feeds(
            &graph,
            &OperationKey::new(sequence, NodeType::Cache, OpCode::CacheFileUpdate)
        ));
        assert!(!time_feeds(
            &graph,
            &OperationKey::new(single, NodeType::Cache, OpCode::CacheFileUpdate)
        ));
    }

    #[test]
    fn masks_read_time_and_parent_clips() {
        let mut main = Main::new();
        let clip = main.add("Footage", MovieClip::default());
        let mask = main.add(
            "Matte",
            Mask {
                layers: vec![MaskLayer {
                    name: "Layer".into(),
                    parents: vec![clip],
                }],
            },
        );
        let scene = main.add("Scene", Scene::default());

        let sink = CollectingSink::new();
        let mut builder = RelationBuilder::new(&main).with_sink(sink.clone());
        builder.build_scene(scene);
        let graph = builder.finish();

        let animation = OperationKey::new(mask, NodeType::Animation, OpCode::MaskAnimation);
        let evaluate = OperationKey::new(mask, NodeType::Parameters, OpCode::MaskEval);
        assert!(time_feeds(&graph, &animation));
        assert!(linked(&graph, &animation, &evaluate));
        assert!(linked_from_component(
            &graph,
            &ComponentKey::new(clip, NodeType::Parameters),
            &evaluate,
        ));
        assert!(UpdateScheduler::new(&graph).evaluation_order().is_ok());
        assert!(sink.is_empty(), "{:?}", sink.records());
    }
}
