//! Constraint stacks of objects and bones.

use super::{BuildContext, RelationBuilder, RootPChanMap};
use crate::graph::{ComponentKey, Key, NodeType, OpCode, OperationKey, TimeSourceKey};
use crate::scene::{Constraint, ConstraintKind, ConstraintTarget, EntityId, ObjectType};

impl<'a> RelationBuilder<'a> {
    /// Add the dependencies of every constraint in a stack.
    ///
    /// `component` is [`NodeType::Bone`] (named after the bone) for pose
    /// constraints and [`NodeType::Transform`] for object constraints.
    /// `root_map` is only known for bone stacks.
    pub(super) fn build_constraints(
        &mut self,
        ctx: BuildContext<'a>,
        id: EntityId,
        component: NodeType,
        component_name: &str,
        constraints: &'a [Constraint],
        root_map: Option<&RootPChanMap>,
    ) {
        let opcode = if component == NodeType::Bone {
            OpCode::BoneConstraints
        } else {
            OpCode::TransformConstraints
        };
        let constraint_key = OperationKey::in_component(id, component, component_name, opcode);
        let on_bone = component == NodeType::Bone;

        for con in constraints {
            match &con.kind {
                ConstraintKind::MotionTracking { clip } => {
                    if let Some(clip) = *clip {
                        self.build_id(ctx, clip);
                        self.add_relation(
                            ComponentKey::new(clip, NodeType::Parameters),
                            &constraint_key,
                            &con.name,
                        );
                    }
                    if let Some(camera) = ctx.scene.and_then(|(_, scene)| scene.camera) {
                        if camera != id {
                            self.add_relation(
                                ComponentKey::new(camera, NodeType::Transform),
                                &constraint_key,
                                &con.name,
                            );
                        }
                    }
                    self.add_relation(TimeSourceKey::new(), &constraint_key, "[TimeSrc -> Animation]");
                }
                ConstraintKind::TransformCache { cache_file } => {
                    self.add_relation(TimeSourceKey::new(), &constraint_key, "[TimeSrc -> Animation]");
                    if let Some(cache_file) = *cache_file {
                        self.build_id(ctx, cache_file);
                        self.add_relation(
                            ComponentKey::new(cache_file, NodeType::Cache),
                            &constraint_key,
                            &con.name,
                        );
                    }
                }
                // Pose-level solvers own these.
                ConstraintKind::Ik { .. } | ConstraintKind::SplineIk { .. } if on_bone => {}
                ConstraintKind::Ik { chain_length, .. } => {
                    for target in &con.targets {
                        self.build_id(ctx, target.object);
                        for from in self.ik_target_sources(id, target, *chain_length) {
                            self.add_relation(from, &constraint_key, &con.name);
                        }
                    }
                }
                ConstraintKind::SplineIk { .. } => {
                    for target in con.targets.iter().filter(|target| target.object != id) {
                        self.build_id(ctx, target.object);
                        self.add_relation(
                            ComponentKey::new(target.object, NodeType::Geometry),
                            &constraint_key,
                            &con.name,
                        );
                        self.add_relation(
                            ComponentKey::new(target.object, NodeType::Transform),
                            &constraint_key,
                            &con.name,
                        );
                    }
                }
                ConstraintKind::Generic => {
                    for target in &con.targets {
                        self.build_id(ctx, target.object);
                        let from = self.constraint_target_key(
                            id,
                            on_bone,
                            component_name,
                            target,
                            root_map,
                        );
                        self.add_relation(from, &constraint_key, &con.name);
                    }
                }
            }
        }
    }

    /// What an object-level IK constraint reads from its target.
    ///
    /// Aiming at a bone of another armature makes the object wait for every
    /// bone of that bone's chain, since the solver may move any of them.
    /// Nothing flows back into the target rig.
    fn ik_target_sources(
        &self,
        id: EntityId,
        target: &ConstraintTarget,
        chain_length: usize,
    ) -> Vec<Key> {
        if target.object == id {
            return Vec::new();
        }
        let Some(object) = self.main.object(target.object) else {
            return vec![Self::final_transform(target.object).into()];
        };
        match (&object.pose, target.subtarget.as_deref()) {
            (Some(pose), Some(bone)) if object.object_type == ObjectType::Armature => pose
                .chain(bone, chain_length, self.config.max_ik_chain_length)
                .into_iter()
                .map(|pchan| {
                    OperationKey::in_component(
                        target.object,
                        NodeType::Bone,
                        pchan.name.as_str(),
                        OpCode::BoneDone,
                    )
                    .into()
                })
                .collect(),
            _ => vec![Self::final_transform(target.object).into()],
        }
    }

    fn constraint_target_key(
        &self,
        id: EntityId,
        on_bone: bool,
        component_name: &str,
        target: &ConstraintTarget,
        root_map: Option<&RootPChanMap>,
    ) -> Key {
        let target_type = self.main.object(target.object).map(|ob| ob.object_type);
        match (target_type, target.subtarget.as_deref()) {
            (Some(ObjectType::Armature), Some(bone)) => {
                let shares_chain = target.object == id
                    && on_bone
                    && root_map.is_some_and(|map| map.has_common_root(component_name, bone));
                let opcode = if shares_chain {
                    OpCode::BoneReady
                } else {
                    OpCode::BoneDone
                };
                OperationKey::in_component(target.object, NodeType::Bone, bone, opcode).into()
            }
            (Some(ObjectType::Mesh | ObjectType::Lattice), Some(_)) => {
                ComponentKey::new(target.object, NodeType::Geometry).into()
            }
            (target_type, _) if target.object == id => {
                // Bones of a rig may read the rig's object transform. Anything
                // else reading itself only sees its pre-constraint state.
                if target_type == Some(ObjectType::Armature) && on_bone {
                    Self::final_transform(id).into()
                } else {
                    OperationKey::new(id, NodeType::Transform, OpCode::TransformLocal).into()
                }
            }
            _ => Self::final_transform(target.object).into(),
        }
    }

    fn final_transform(id: EntityId) -> OperationKey {
        OperationKey::new(id, NodeType::Transform, OpCode::TransformFinal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CollectingSink;
    use crate::graph::Depsgraph;
    use crate::scene::{CacheFile, DatablockData, Main, Object, Pose, PoseChannel};

    fn constrained(main: &mut Main, con: Constraint) -> EntityId {
        let mut ob = Object::new(ObjectType::Empty);
        ob.constraints.push(con);
        main.add("Owner", ob)
    }

    fn constraints_op(id: EntityId) -> OperationKey {
        OperationKey::new(id, NodeType::Transform, OpCode::TransformConstraints)
    }

    fn linked(graph: &Depsgraph, from: &OperationKey, to: &OperationKey) -> bool {
        match (graph.find_node(from), graph.find_node(to)) {
            (Some(from), Some(to)) => graph.has_relation(from, to),
            _ => false,
        }
    }

    #[test]
    fn object_target_reads_final_transform() {
        let mut main = Main::new();
        let target = main.add("Target", Object::new(ObjectType::Empty));
        let owner = constrained(
            &mut main,
            Constraint::new("Copy Location", ConstraintKind::Generic)
                .with_target(ConstraintTarget::object(target)),
        );

        let mut builder = RelationBuilder::new(&main);
        builder.build_id(BuildContext::detached(), owner);
        let graph = builder.finish();
        assert!(linked(&graph, &RelationBuilder::final_transform(target), &constraints_op(owner)));
    }

    #[test]
    fn self_target_reads_local_transform() {
        let mut main = Main::new();
        let owner = main.add("Owner", Object::new(ObjectType::Empty));
        if let Some(DatablockData::Object(ob)) =
            main.get_mut(owner).map(|d| &mut d.data)
        {
            ob.constraints.push(
                Constraint::new("Limit", ConstraintKind::Generic)
                    .with_target(ConstraintTarget::object(owner)),
            );
        }

        let mut builder = RelationBuilder::new(&main);
        builder.build_id(BuildContext::detached(), owner);
        let graph = builder.finish();
        let local = OperationKey::new(owner, NodeType::Transform, OpCode::TransformLocal);
        assert!(linked(&graph, &local, &constraints_op(owner)));
    }

    #[test]
    fn bone_target_of_other_armature_reads_bone_done() {
        let mut main = Main::new();
        let mut rig = Object::new(ObjectType::Armature);
        rig.pose = Some(Pose {
            channels: vec![PoseChannel::new("Head", None)],
        });
        let rig = main.add("Rig", rig);
        let owner = constrained(
            &mut main,
            Constraint::new("Child Of", ConstraintKind::Generic)
                .with_target(ConstraintTarget::bone(rig, "Head")),
        );

        let mut builder = RelationBuilder::new(&main);
        builder.build_id(BuildContext::detached(), owner);
        let graph = builder.finish();
        let done = OperationKey::in_component(rig, NodeType::Bone, "Head", OpCode::BoneDone);
        assert!(linked(&graph, &done, &constraints_op(owner)));
    }

    #[test]
    fn transform_cache_depends_on_time_and_cache() {
        let mut main = Main::new();
        let cache = main.add("Cache", CacheFile::default());
        let owner = constrained(
            &mut main,
            Constraint::new(
                "Transform Cache",
                ConstraintKind::TransformCache {
                    cache_file: Some(cache),
                },
            ),
        );

        let sink = CollectingSink::new();
        let mut builder = RelationBuilder::new(&main).with_sink(sink.clone());
        builder.build_id(BuildContext::detached(), owner);
        let graph = builder.finish();

        let constraints = graph.find_node(&constraints_op(owner)).unwrap();
        let cache_exit = graph
            .component(graph.find_component(&ComponentKey::new(cache, NodeType::Cache)).unwrap())
            .exit()
            .unwrap();
        assert!(graph.has_relation(cache_exit, constraints));
        assert!(graph
            .time_source(graph.global_time_source())
            .outlinks()
            .iter()
            .any(|relation| relation.to == constraints));
        assert!(sink.is_empty());
    }
}
