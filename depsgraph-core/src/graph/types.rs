//! Component kinds and operation codes.

use std::fmt;

/// Kind of a component node: one logical aspect of an entity's evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeType {
    /// Generic, non-animatable-as-a-whole properties.
    Parameters,
    /// Action evaluation and drivers.
    Animation,
    /// Object transform stages.
    Transform,
    /// Geometry evaluation (modifier stack, shape keys, cloth, ...).
    Geometry,
    Sequencer,
    /// Whole-pose evaluation of an armature, including IK solvers.
    EvalPose,
    /// A single bone. Named after the bone.
    Bone,
    EvalParticles,
    Shading,
    Cache,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Parameters => "Parameters",
            NodeType::Animation => "Animation",
            NodeType::Transform => "Transform",
            NodeType::Geometry => "Geometry",
            NodeType::Sequencer => "Sequencer",
            NodeType::EvalPose => "Eval Pose",
            NodeType::Bone => "Bone",
            NodeType::EvalParticles => "Eval Particles",
            NodeType::Shading => "Shading",
            NodeType::Cache => "Cache",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation code: what an operation node computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpCode {
    /// Generic operation, identified by name only.
    Operation,

    ParametersEval,
    /// Stand-in for work done by an external system.
    Placeholder,

    Animation,
    Driver,

    TransformLocal,
    TransformParent,
    TransformConstraints,
    TransformFinal,
    ObjectUberEval,

    RigidBodyRebuild,
    RigidBodySim,
    RigidBodyTransformCopy,

    GeometryUberEval,
    GeometryClothModifier,
    GeometryShapekey,

    PoseInit,
    PoseInitIk,
    PoseDone,
    PoseIkSolver,
    PoseSplineIkSolver,

    BoneLocal,
    BonePoseParent,
    BoneConstraints,
    BoneReady,
    BoneDone,

    ParticleSystemEvalInit,
    ParticleSystemEval,
    ParticleSettingsEval,

    MaterialUpdate,
    WorldUpdate,
    MaskAnimation,
    MaskEval,
    MovieClipEval,
    CacheFileUpdate,

    /// Synthesized aggregation point in front of a component.
    ComponentEntry,
    /// Synthesized aggregation point behind a component.
    ComponentExit,
}

impl OpCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpCode::Operation => "OPERATION",
            OpCode::ParametersEval => "PARAMETERS_EVAL",
            OpCode::Placeholder => "PLACEHOLDER",
            OpCode::Animation => "ANIMATION",
            OpCode::Driver => "DRIVER",
            OpCode::TransformLocal => "TRANSFORM_LOCAL",
            OpCode::TransformParent => "TRANSFORM_PARENT",
            OpCode::TransformConstraints => "TRANSFORM_CONSTRAINTS",
            OpCode::TransformFinal => "TRANSFORM_FINAL",
            OpCode::ObjectUberEval => "OBJECT_UBEREVAL",
            OpCode::RigidBodyRebuild => "RIGIDBODY_REBUILD",
            OpCode::RigidBodySim => "RIGIDBODY_SIM",
            OpCode::RigidBodyTransformCopy => "RIGIDBODY_TRANSFORM_COPY",
            OpCode::GeometryUberEval => "GEOMETRY_UBEREVAL",
            OpCode::GeometryClothModifier => "GEOMETRY_CLOTH_MODIFIER",
            OpCode::GeometryShapekey => "GEOMETRY_SHAPEKEY",
            OpCode::PoseInit => "POSE_INIT",
            OpCode::PoseInitIk => "POSE_INIT_IK",
            OpCode::PoseDone => "POSE_DONE",
            OpCode::PoseIkSolver => "POSE_IK_SOLVER",
            OpCode::PoseSplineIkSolver => "POSE_SPLINE_IK_SOLVER",
            OpCode::BoneLocal => "BONE_LOCAL",
            OpCode::BonePoseParent => "BONE_POSE_PARENT",
            OpCode::BoneConstraints => "BONE_CONSTRAINTS",
            OpCode::BoneReady => "BONE_READY",
            OpCode::BoneDone => "BONE_DONE",
            OpCode::ParticleSystemEvalInit => "PARTICLE_SYSTEM_EVAL_INIT",
            OpCode::ParticleSystemEval => "PARTICLE_SYSTEM_EVAL",
            OpCode::ParticleSettingsEval => "PARTICLE_SETTINGS_EVAL",
            OpCode::MaterialUpdate => "MATERIAL_UPDATE",
            OpCode::WorldUpdate => "WORLD_UPDATE",
            OpCode::MaskAnimation => "MASK_ANIMATION",
            OpCode::MaskEval => "MASK_EVAL",
            OpCode::MovieClipEval => "MOVIECLIP_EVAL",
            OpCode::CacheFileUpdate => "CACHE_FILE_UPDATE",
            OpCode::ComponentEntry => "COMPONENT_ENTRY",
            OpCode::ComponentExit => "COMPONENT_EXIT",
        }
    }

    /// Check whether this code marks a synthesized entry or exit.
    pub fn is_aggregation(&self) -> bool {
        matches!(self, OpCode::ComponentEntry | OpCode::ComponentExit)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
