//! Operation nodes owned by each kind of entity.
//!
//! This is the first of the two build steps. Everything here is
//! find-or-create, so running it twice for an entity changes nothing.

use super::rig::{ik_chain, rig_pose, solver_opcode};
use super::RelationBuilder;
use crate::graph::{Depsgraph, EntityIndex, NodeType, OpCode, OperationIndex, NO_TAG};
use crate::scene::{Datablock, DatablockData, Main, ModifierKind, Object, ObjectType, Pose};

struct EntityNodes<'g> {
    graph: &'g mut Depsgraph,
    entity: EntityIndex,
}

impl EntityNodes<'_> {
    fn op(&mut self, kind: NodeType, opcode: OpCode) -> OperationIndex {
        self.named(kind, "", opcode, "", NO_TAG)
    }

    fn placeholder(&mut self, kind: NodeType, name: &str) -> OperationIndex {
        self.named(kind, "", OpCode::Placeholder, name, NO_TAG)
    }

    fn named(
        &mut self,
        kind: NodeType,
        component_name: &str,
        opcode: OpCode,
        name: &str,
        tag: i32,
    ) -> OperationIndex {
        let component = self.graph.ensure_component(self.entity, kind, component_name);
        self.graph.add_operation(component, opcode, name, tag)
    }

    fn bone(&mut self, bone: &str, opcode: OpCode) -> OperationIndex {
        self.named(NodeType::Bone, bone, opcode, "", NO_TAG)
    }
}

impl<'a> RelationBuilder<'a> {
    pub(super) fn build_nodes(&mut self, datablock: &'a Datablock) {
        let main = self.main;
        let max_chain = self.config.max_ik_chain_length;
        let entity = self.graph.add_entity(datablock.id(), datablock.name());
        let mut nodes = EntityNodes {
            graph: &mut self.graph,
            entity,
        };

        nodes.op(NodeType::Parameters, OpCode::ParametersEval);

        if let Some(adt) = datablock.anim_data.as_ref().filter(|adt| adt.is_animated()) {
            nodes.op(NodeType::Animation, OpCode::Animation);
            for fcurve in adt.drivers.iter().filter(|fcurve| fcurve.driver.is_some()) {
                nodes.named(
                    NodeType::Animation,
                    "",
                    OpCode::Driver,
                    &fcurve.rna_path,
                    fcurve.array_index,
                );
            }
        }

        match &datablock.data {
            DatablockData::Scene(scene) => {
                nodes.placeholder(NodeType::Sequencer, "Sequencer");
                if scene.rigidbody_world.is_some() {
                    nodes.op(NodeType::Transform, OpCode::RigidBodyRebuild);
                    nodes.op(NodeType::Transform, OpCode::RigidBodySim);
                }
            }
            DatablockData::Object(object) => object_nodes(&mut nodes, main, object, max_chain),
            DatablockData::Geometry(_) => {
                nodes.placeholder(NodeType::Geometry, "Geometry Eval");
                nodes.placeholder(NodeType::Geometry, "Eval Done");
            }
            DatablockData::Armature(_) => {
                nodes.placeholder(NodeType::Parameters, "Armature Eval");
            }
            DatablockData::ShapeKey(_) => {
                nodes.op(NodeType::Geometry, OpCode::GeometryShapekey);
            }
            DatablockData::Material(_) => {
                nodes.op(NodeType::Shading, OpCode::MaterialUpdate);
            }
            DatablockData::World(_) => {
                nodes.op(NodeType::Shading, OpCode::WorldUpdate);
            }
            DatablockData::ParticleSettings(_) => {
                nodes.op(NodeType::Parameters, OpCode::ParticleSettingsEval);
            }
            DatablockData::CacheFile(_) => {
                nodes.op(NodeType::Cache, OpCode::CacheFileUpdate);
            }
            DatablockData::Mask(_) => {
                nodes.op(NodeType::Animation, OpCode::MaskAnimation);
                nodes.op(NodeType::Parameters, OpCode::MaskEval);
            }
            DatablockData::MovieClip(_) => {
                nodes.op(NodeType::Parameters, OpCode::MovieClipEval);
            }
            DatablockData::Group(_)
            | DatablockData::Camera(_)
            | DatablockData::Lamp(_)
            | DatablockData::Texture(_)
            | DatablockData::NodeTree(_)
            | DatablockData::GreasePencil(_)
            | DatablockData::Action(_) => {}
        }
    }
}

fn object_nodes(nodes: &mut EntityNodes<'_>, main: &Main, object: &Object, max_chain: usize) {
    nodes.op(NodeType::Transform, OpCode::TransformLocal);
    if object.parent.is_some() {
        nodes.op(NodeType::Transform, OpCode::TransformParent);
    }
    if !object.constraints.is_empty() {
        nodes.op(NodeType::Transform, OpCode::TransformConstraints);
    }
    nodes.op(NodeType::Transform, OpCode::ObjectUberEval);
    nodes.op(NodeType::Transform, OpCode::TransformFinal);
    if object.rigidbody.is_some() {
        nodes.op(NodeType::Transform, OpCode::RigidBodyTransformCopy);
    }

    if object.object_type.has_geometry() {
        nodes.placeholder(NodeType::Geometry, "Eval Init");
        nodes.op(NodeType::Geometry, OpCode::GeometryUberEval);
        if !super::object::object_materials(main, object).is_empty() {
            nodes.placeholder(NodeType::Shading, "Shading");
        }
    }
    if object
        .modifiers
        .iter()
        .any(|md| matches!(md.kind, ModifierKind::Cloth { .. }))
    {
        nodes.op(NodeType::Cache, OpCode::GeometryClothModifier);
    }

    if !object.particle_systems.is_empty() {
        nodes.op(NodeType::EvalParticles, OpCode::ParticleSystemEvalInit);
        for psys in &object.particle_systems {
            nodes.named(
                NodeType::EvalParticles,
                "",
                OpCode::ParticleSystemEval,
                &psys.name,
                NO_TAG,
            );
        }
    }

    if object.object_type == ObjectType::Armature {
        if let Some(pose) = rig_pose(main, object) {
            if object.proxy_from.is_some() {
                proxy_rig_nodes(nodes, pose);
            } else {
                rig_nodes(nodes, pose, max_chain);
            }
        }
    }
}

fn rig_nodes(nodes: &mut EntityNodes<'_>, pose: &Pose, max_chain: usize) {
    nodes.op(NodeType::EvalPose, OpCode::PoseInit);
    nodes.op(NodeType::EvalPose, OpCode::PoseInitIk);
    nodes.op(NodeType::EvalPose, OpCode::PoseDone);

    for pchan in &pose.channels {
        let local = nodes.bone(&pchan.name, OpCode::BoneLocal);
        nodes.bone(&pchan.name, OpCode::BonePoseParent);
        if !pchan.constraints.is_empty() {
            nodes.bone(&pchan.name, OpCode::BoneConstraints);
        }
        nodes.bone(&pchan.name, OpCode::BoneReady);
        let done = nodes.bone(&pchan.name, OpCode::BoneDone);
        nodes.graph.set_entry_operation(local);
        nodes.graph.set_exit_operation(done);

        for con in &pchan.constraints {
            let Some(opcode) = solver_opcode(&con.kind) else {
                continue;
            };
            if let Some(root) = ik_chain(pose, pchan, &con.kind, max_chain).last() {
                nodes.named(NodeType::EvalPose, "", opcode, &root.name, NO_TAG);
            }
        }
    }
}

fn proxy_rig_nodes(nodes: &mut EntityNodes<'_>, pose: &Pose) {
    nodes.op(NodeType::EvalPose, OpCode::PoseInit);
    nodes.op(NodeType::EvalPose, OpCode::PoseDone);

    for pchan in &pose.channels {
        let local = nodes.bone(&pchan.name, OpCode::BoneLocal);
        nodes.bone(&pchan.name, OpCode::BoneReady);
        let done = nodes.bone(&pchan.name, OpCode::BoneDone);
        nodes.graph.set_entry_operation(local);
        nodes.graph.set_exit_operation(done);
    }
}
