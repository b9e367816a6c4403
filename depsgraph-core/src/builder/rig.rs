//! Armature pose evaluation: bone chains, IK solvers and proxies.

use super::{BuildContext, RelationBuilder, RootPChanMap};
use crate::graph::{ComponentKey, NodeType, OpCode, OperationKey, NO_TAG};
use crate::scene::{
    Constraint, ConstraintKind, ConstraintTarget, EntityId, Main, Object, ObjectType, Pose,
    PoseChannel,
};

/// Pose a rig evaluates. Proxies without a pose of their own mirror the
/// pose of the object they proxy.
pub(super) fn rig_pose<'m>(main: &'m Main, object: &'m Object) -> Option<&'m Pose> {
    object.pose.as_ref().or_else(|| {
        let source = main.object(object.proxy_from?)?;
        source.pose.as_ref()
    })
}

/// Solver operation an IK-type constraint runs in, if any.
pub(super) fn solver_opcode(kind: &ConstraintKind) -> Option<OpCode> {
    match kind {
        ConstraintKind::Ik { .. } => Some(OpCode::PoseIkSolver),
        ConstraintKind::SplineIk { .. } => Some(OpCode::PoseSplineIkSolver),
        _ => None,
    }
}

/// Bones solved by an IK-type constraint on `tip`, tip first.
///
/// Regular IK without `use_tail` leaves the tip itself out of the chain and
/// starts at its parent. The last element is the chain root, which names
/// the solver operation.
pub(super) fn ik_chain<'p>(
    pose: &'p Pose,
    tip: &'p PoseChannel,
    kind: &ConstraintKind,
    max_length: usize,
) -> Vec<&'p PoseChannel> {
    match kind {
        ConstraintKind::Ik {
            chain_length,
            use_tail: true,
            ..
        }
        | ConstraintKind::SplineIk { chain_length } => {
            pose.chain(&tip.name, *chain_length, max_length)
        }
        ConstraintKind::Ik {
            chain_length,
            use_tail: false,
            ..
        } => match tip.parent.as_deref() {
            Some(parent) => pose.chain(parent, *chain_length, max_length),
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn bone_key(id: EntityId, bone: &str, opcode: OpCode) -> OperationKey {
    OperationKey::in_component(id, NodeType::Bone, bone, opcode)
}

fn pose_key(id: EntityId, opcode: OpCode) -> OperationKey {
    OperationKey::new(id, NodeType::EvalPose, opcode)
}

impl<'a> RelationBuilder<'a> {
    pub(super) fn build_rig(&mut self, ctx: BuildContext<'a>, id: EntityId, object: &'a Object) {
        let Some(pose) = object.pose.as_ref() else {
            return;
        };
        let init = pose_key(id, OpCode::PoseInit);
        let init_ik = pose_key(id, OpCode::PoseInitIk);
        let flush = pose_key(id, OpCode::PoseDone);

        self.add_relation(&init, &init_ik, "Pose Init -> Pose Init IK");
        self.add_relation(&init_ik, &flush, "Pose Init IK -> Pose Cleanup");

        if let Some(armature) = object.data {
            self.add_relation(
                Self::placeholder_key(armature, NodeType::Parameters, "Armature Eval"),
                &init,
                "Data dependency",
            );
        }
        if self.needs_animdata_node(id) {
            self.add_relation(Self::animation_key(id), &init, "Rig Animation");
        }

        // Solver relations come first: linking bones inside a chain needs to
        // know which chains they share.
        let mut root_map = RootPChanMap::new();
        let mut reads_local_transform = false;
        for pchan in &pose.channels {
            for con in &pchan.constraints {
                match con.kind {
                    ConstraintKind::Ik { .. } => {
                        self.build_ik_pose(ctx, id, pose, pchan, con, &mut root_map);
                        reads_local_transform = true;
                    }
                    ConstraintKind::SplineIk { .. } => {
                        self.build_splineik_pose(ctx, id, pose, pchan, con, &mut root_map);
                        reads_local_transform = true;
                    }
                    _ => {}
                }
            }
        }
        if reads_local_transform {
            self.add_relation(
                ComponentKey::new(id, NodeType::Transform),
                ComponentKey::new(id, NodeType::EvalPose),
                "Local Transforms",
            );
        }

        for pchan in &pose.channels {
            let local = bone_key(id, &pchan.name, OpCode::BoneLocal);
            let pose_parent = bone_key(id, &pchan.name, OpCode::BonePoseParent);
            let ready = bone_key(id, &pchan.name, OpCode::BoneReady);
            let done = bone_key(id, &pchan.name, OpCode::BoneDone);

            self.add_relation(&init, &local, "PoseEval Source-Bone Link");
            self.add_relation(&local, &pose_parent, "Bone Local - PoseSpace Link");

            if let Some(parent) = pose.parent_of(&pchan.name) {
                let opcode = if root_map.has_common_root(&pchan.name, &parent.name) {
                    OpCode::BoneReady
                } else {
                    OpCode::BoneDone
                };
                self.add_relation(
                    bone_key(id, &parent.name, opcode),
                    &pose_parent,
                    "[Parent Bone -> Child Bone]",
                );
            }

            if pchan.constraints.is_empty() {
                self.add_relation(&pose_parent, &ready, "Pose -> Ready");
            } else {
                self.build_constraints(
                    ctx,
                    id,
                    NodeType::Bone,
                    &pchan.name,
                    &pchan.constraints,
                    Some(&root_map),
                );
                let constraints = bone_key(id, &pchan.name, OpCode::BoneConstraints);
                self.add_relation(&pose_parent, &constraints, "Constraints Stack");
                self.add_relation(&constraints, &ready, "Constraints -> Ready");
            }

            self.add_relation(&ready, &done, "Ready -> Done");
            self.add_relation(&done, &flush, "PoseEval Result-Bone Link");
        }
    }

    /// Type of the object a constraint target points at.
    fn target_type(&self, target: &ConstraintTarget) -> Option<ObjectType> {
        self.main.object(target.object).map(|ob| ob.object_type)
    }

    fn build_ik_pose(
        &mut self,
        ctx: BuildContext<'a>,
        id: EntityId,
        pose: &'a Pose,
        pchan: &'a PoseChannel,
        con: &'a Constraint,
        root_map: &mut RootPChanMap,
    ) {
        let ConstraintKind::Ik { use_tail, pole, .. } = &con.kind else {
            return;
        };
        let chain = ik_chain(pose, pchan, &con.kind, self.config.max_ik_chain_length);
        let Some(root) = chain.last() else {
            return;
        };
        let solver = OperationKey::tagged(
            id,
            NodeType::EvalPose,
            OpCode::PoseIkSolver,
            root.name.as_str(),
            NO_TAG,
        );
        let whole_pose = ComponentKey::new(id, NodeType::EvalPose);

        self.add_relation(pose_key(id, OpCode::PoseInitIk), &solver, "Init IK -> IK Solver");

        if let Some(target) = con.targets.first() {
            self.build_id(ctx, target.object);
            match (self.target_type(target), target.subtarget.as_deref()) {
                (Some(ObjectType::Armature), Some(bone)) if target.object != id => {
                    self.add_relation(
                        ComponentKey::named(target.object, NodeType::Bone, bone),
                        &whole_pose,
                        &con.name,
                    );
                }
                (Some(ObjectType::Armature), Some(bone)) => {
                    self.add_relation(bone_key(id, bone, OpCode::BoneDone), &solver, &con.name);
                }
                (Some(ObjectType::Mesh | ObjectType::Lattice), Some(_)) => {
                    self.add_relation(
                        ComponentKey::new(target.object, NodeType::Geometry),
                        &solver,
                        &con.name,
                    );
                }
                _ => {
                    self.add_relation(
                        ComponentKey::new(target.object, NodeType::Transform),
                        &whole_pose,
                        &con.name,
                    );
                }
            }
            if target.object == id {
                if let Some(bone) = target.subtarget.as_deref() {
                    root_map.add_bone(bone, &root.name);
                }
            }
        }

        if let Some(pole) = pole {
            self.build_id(ctx, pole.object);
            let from = match (self.target_type(pole), pole.subtarget.as_deref()) {
                (Some(ObjectType::Armature), Some(bone)) => {
                    ComponentKey::named(pole.object, NodeType::Bone, bone)
                }
                (Some(ObjectType::Mesh | ObjectType::Lattice), Some(_)) => {
                    ComponentKey::new(pole.object, NodeType::Geometry)
                }
                _ => ComponentKey::new(pole.object, NodeType::Transform),
            };
            self.add_relation(from, &solver, &con.name);
        }

        if !use_tail {
            self.add_relation(
                &solver,
                bone_key(id, &pchan.name, OpCode::BoneLocal),
                "IK Solver Result",
            );
        }

        for (position, bone) in chain.iter().enumerate() {
            let ready = bone_key(id, &bone.name, OpCode::BoneReady);
            let done = bone_key(id, &bone.name, OpCode::BoneDone);
            if position == 0 {
                self.add_relation(&ready, &solver, "IK Solver Owner");
            } else {
                self.add_relation(&ready, &solver, "IK Chain Parent");
            }
            let description = if bone.name == pchan.name {
                "IK Solver Result"
            } else {
                "IK Chain Result"
            };
            self.add_relation(&solver, &done, description);
            root_map.add_bone(&bone.name, &root.name);
        }

        self.add_relation(&solver, pose_key(id, OpCode::PoseDone), "PoseEval Result-Bone Link");
    }

    fn build_splineik_pose(
        &mut self,
        ctx: BuildContext<'a>,
        id: EntityId,
        pose: &'a Pose,
        pchan: &'a PoseChannel,
        con: &'a Constraint,
        root_map: &mut RootPChanMap,
    ) {
        let chain = ik_chain(pose, pchan, &con.kind, self.config.max_ik_chain_length);
        let Some(root) = chain.last() else {
            return;
        };
        let solver = OperationKey::tagged(
            id,
            NodeType::EvalPose,
            OpCode::PoseSplineIkSolver,
            root.name.as_str(),
            NO_TAG,
        );

        self.add_relation(pose_key(id, OpCode::PoseInitIk), &solver, "Init IK -> Spline IK Solver");
        self.add_relation(
            bone_key(id, &pchan.name, OpCode::BoneReady),
            &solver,
            "Spline IK Solver Owner",
        );

        if let Some(target) = con.targets.first() {
            self.build_id(ctx, target.object);
            self.add_relation(
                ComponentKey::new(target.object, NodeType::Geometry),
                ComponentKey::new(id, NodeType::EvalPose),
                "[Curve.Path -> Spline IK] DepsRel",
            );
        }

        for bone in &chain {
            if bone.name != pchan.name {
                self.add_relation(
                    bone_key(id, &bone.name, OpCode::BoneReady),
                    &solver,
                    "Spline IK Solver Update",
                );
            }
            self.add_relation(
                &solver,
                bone_key(id, &bone.name, OpCode::BoneDone),
                "Spline IK Solver Result",
            );
            root_map.add_bone(&bone.name, &root.name);
        }

        self.add_relation(&solver, pose_key(id, OpCode::PoseDone), "PoseEval Result-Bone Link");
    }

    /// A proxy copies its bones from the proxied rig and runs no solvers.
    pub(super) fn build_proxy_rig(&mut self, id: EntityId, object: &'a Object, source: EntityId) {
        let Some(pose) = rig_pose(self.main, object) else {
            return;
        };
        let init = pose_key(id, OpCode::PoseInit);
        let flush = pose_key(id, OpCode::PoseDone);

        for pchan in &pose.channels {
            let local = bone_key(id, &pchan.name, OpCode::BoneLocal);
            let ready = bone_key(id, &pchan.name, OpCode::BoneReady);
            let done = bone_key(id, &pchan.name, OpCode::BoneDone);

            self.add_relation(&init, &local, "Pose Init -> Bone Local");
            self.add_relation(&local, &ready, "Local -> Ready");
            self.add_relation(&ready, &done, "Ready -> Done");
            self.add_relation(&done, &flush, "Bone Done -> Pose Done");
            self.add_relation(
                bone_key(source, &pchan.name, OpCode::BoneDone),
                &ready,
                "Proxy Bone",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Depsgraph, UpdateScheduler};

    fn arm() -> Pose {
        Pose {
            channels: vec![
                PoseChannel::new("Upper", None),
                PoseChannel::new("Lower", Some("Upper")),
                PoseChannel::new("Hand", Some("Lower")),
            ],
        }
    }

    fn ik(use_tail: bool) -> ConstraintKind {
        ConstraintKind::Ik {
            chain_length: 2,
            use_tail,
            pole: None,
        }
    }

    fn names(chain: &[&PoseChannel]) -> Vec<String> {
        chain.iter().map(|pchan| pchan.name.clone()).collect()
    }

    #[test]
    fn ik_chain_includes_tip_only_with_tail() {
        let pose = arm();
        let hand = pose.channel("Hand").unwrap();
        assert_eq!(names(&ik_chain(&pose, hand, &ik(true), 255)), ["Hand", "Lower"]);
        assert_eq!(names(&ik_chain(&pose, hand, &ik(false), 255)), ["Lower", "Upper"]);
    }

    #[test]
    fn non_ik_constraints_have_no_chain() {
        let pose = arm();
        let hand = pose.channel("Hand").unwrap();
        assert!(ik_chain(&pose, hand, &ConstraintKind::Generic, 255).is_empty());
        assert_eq!(solver_opcode(&ConstraintKind::Generic), None);
    }

    fn ik_rig() -> (Main, EntityId) {
        let mut main = Main::new();
        let target = main.add("Target", Object::new(ObjectType::Empty));
        let mut pose = arm();
        pose.channels[2].constraints.push(
            Constraint::new("IK", ik(true)).with_target(ConstraintTarget::object(target)),
        );
        let mut ob = Object::new(ObjectType::Armature);
        ob.pose = Some(pose);
        let rig = main.add("Rig", ob);
        (main, rig)
    }

    fn op(graph: &Depsgraph, key: &OperationKey) -> crate::graph::OperationIndex {
        graph.find_node(key).unwrap()
    }

    #[test]
    fn chain_bones_feed_the_solver_and_wait_for_it() {
        let (main, rig) = ik_rig();
        let mut builder = RelationBuilder::new(&main);
        builder.build_id(BuildContext::detached(), rig);
        let graph = builder.finish();

        let solver = op(
            &graph,
            &OperationKey::tagged(rig, NodeType::EvalPose, OpCode::PoseIkSolver, "Lower", NO_TAG),
        );
        for bone in ["Hand", "Lower"] {
            let ready = op(&graph, &bone_key(rig, bone, OpCode::BoneReady));
            let done = op(&graph, &bone_key(rig, bone, OpCode::BoneDone));
            assert!(graph.has_relation(ready, solver), "{bone} ready -> solver");
            assert!(graph.has_relation(solver, done), "{bone} solver -> done");
        }
        let upper_done = op(&graph, &bone_key(rig, "Upper", OpCode::BoneDone));
        assert!(!graph.has_relation(solver, upper_done));
    }

    #[test]
    fn bones_in_one_chain_link_through_ready() {
        let (main, rig) = ik_rig();
        let mut builder = RelationBuilder::new(&main);
        builder.build_id(BuildContext::detached(), rig);
        let graph = builder.finish();

        let hand_parent = op(&graph, &bone_key(rig, "Hand", OpCode::BonePoseParent));
        let lower_ready = op(&graph, &bone_key(rig, "Lower", OpCode::BoneReady));
        let lower_parent = op(&graph, &bone_key(rig, "Lower", OpCode::BonePoseParent));
        let upper_done = op(&graph, &bone_key(rig, "Upper", OpCode::BoneDone));

        assert!(graph.has_relation(lower_ready, hand_parent));
        assert!(graph.has_relation(upper_done, lower_parent));
        assert!(UpdateScheduler::new(&graph).evaluation_order().is_ok());
    }

    #[test]
    fn proxy_bones_follow_their_source() {
        let mut main = Main::new();
        let mut source = Object::new(ObjectType::Armature);
        source.pose = Some(arm());
        let source = main.add("Rig", source);
        let mut proxy = Object::new(ObjectType::Armature);
        proxy.proxy_from = Some(source);
        let proxy = main.add("Rig_proxy", proxy);

        let mut builder = RelationBuilder::new(&main);
        builder.build_id(BuildContext::detached(), proxy);
        let graph = builder.finish();

        let from = op(&graph, &bone_key(source, "Hand", OpCode::BoneDone));
        let to = op(&graph, &bone_key(proxy, "Hand", OpCode::BoneReady));
        assert!(graph.has_relation(from, to));
    }
}
