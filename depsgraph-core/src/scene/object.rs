//! Objects and their sub-data: parenting, constraints, modifiers, poses,
//! particle systems and physics settings.

use super::EntityId;

/// What kind of data an object carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectType {
    #[default]
    Empty,
    Mesh,
    Curve,
    Surface,
    Font,
    MetaBall,
    Lattice,
    Armature,
    Camera,
    Lamp,
}

impl ObjectType {
    /// Check whether objects of this type evaluate geometry.
    pub fn has_geometry(&self) -> bool {
        matches!(
            self,
            ObjectType::Mesh
                | ObjectType::Curve
                | ObjectType::Surface
                | ObjectType::Font
                | ObjectType::MetaBall
                | ObjectType::Lattice
        )
    }
}

/// How an object is attached to its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentKind {
    /// Plain object parenting.
    Object,
    /// Parented to a single bone of an armature.
    Bone(String),
    /// Parented to one or three vertices of the parent's geometry.
    Vertex,
    /// Deformed by the parent armature.
    Armature,
    /// Follows the parent curve's path.
    CurvePath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parent {
    pub object: EntityId,
    pub kind: ParentKind,
}

/// A constraint target: an object and an optional bone or vertex group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintTarget {
    pub object: EntityId,
    pub subtarget: Option<String>,
}

impl ConstraintTarget {
    pub fn object(object: EntityId) -> Self {
        Self {
            object,
            subtarget: None,
        }
    }

    pub fn bone(object: EntityId, bone: impl Into<String>) -> Self {
        Self {
            object,
            subtarget: Some(bone.into()),
        }
    }
}

/// Constraint behaviour, as far as dependencies are concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Any constraint that simply reads its targets' transforms.
    Generic,
    /// Inverse kinematics.
    ///
    /// `chain_length` of zero means "up to the root of the hierarchy".
    Ik {
        chain_length: usize,
        use_tail: bool,
        pole: Option<ConstraintTarget>,
    },
    /// Spline IK along the first target's curve.
    SplineIk { chain_length: usize },
    /// Motion tracking constraints reading a movie clip.
    MotionTracking { clip: Option<EntityId> },
    /// Reads transforms from an Alembic-like cache file.
    TransformCache { cache_file: Option<EntityId> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub name: String,
    pub kind: ConstraintKind,
    pub targets: Vec<ConstraintTarget>,
}

impl Constraint {
    pub fn new(name: impl Into<String>, kind: ConstraintKind) -> Self {
        Self {
            name: name.into(),
            kind,
            targets: Vec::new(),
        }
    }

    /// Builder-style helper used when assembling scenes.
    pub fn with_target(mut self, target: ConstraintTarget) -> Self {
        self.targets.push(target);
        self
    }

    /// Check whether this is an IK or spline IK constraint.
    pub fn is_ik(&self) -> bool {
        matches!(
            self.kind,
            ConstraintKind::Ik { .. } | ConstraintKind::SplineIk { .. }
        )
    }
}

/// Which objects take part in effector evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectorWeights {
    /// Limit effectors to this group. `None` means every object in the scene.
    pub group: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModifierKind {
    Armature { object: Option<EntityId> },
    Hook {
        object: Option<EntityId>,
        subtarget: Option<String>,
    },
    Curve { object: Option<EntityId> },
    Lattice { object: Option<EntityId> },
    Displace {
        texture: Option<EntityId>,
        map_object: Option<EntityId>,
    },
    Boolean { object: Option<EntityId> },
    Cloth {
        collision_group: Option<EntityId>,
        effector_weights: EffectorWeights,
    },
    Softbody { effector_weights: EffectorWeights },
    Collision,
    ParticleSystem,
    /// A modifier with no external dependencies.
    Generic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modifier {
    pub name: String,
    pub kind: ModifierKind,
}

impl Modifier {
    pub fn new(name: impl Into<String>, kind: ModifierKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Check whether the modifier result changes with the current frame.
    pub fn depends_on_time(&self) -> bool {
        matches!(
            self.kind,
            ModifierKind::Cloth { .. }
                | ModifierKind::Softbody { .. }
                | ModifierKind::Collision
                | ModifierKind::ParticleSystem
        )
    }

    /// Data blocks this modifier reads from.
    pub fn referenced_ids(&self) -> Vec<EntityId> {
        match &self.kind {
            ModifierKind::Armature { object }
            | ModifierKind::Hook { object, .. }
            | ModifierKind::Curve { object }
            | ModifierKind::Lattice { object }
            | ModifierKind::Boolean { object } => object.iter().copied().collect(),
            ModifierKind::Displace {
                texture,
                map_object,
            } => texture.iter().chain(map_object.iter()).copied().collect(),
            ModifierKind::Cloth { .. }
            | ModifierKind::Softbody { .. }
            | ModifierKind::Collision
            | ModifierKind::ParticleSystem
            | ModifierKind::Generic => Vec::new(),
        }
    }
}

/// A single bone's pose data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoseChannel {
    pub name: String,
    pub parent: Option<String>,
    pub constraints: Vec<Constraint>,
}

impl PoseChannel {
    pub fn new(name: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(str::to_owned),
            constraints: Vec::new(),
        }
    }
}

/// The pose of an armature object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pose {
    pub channels: Vec<PoseChannel>,
}

impl Pose {
    /// Find a channel by bone name.
    pub fn channel(&self, name: &str) -> Option<&PoseChannel> {
        self.channels.iter().find(|pchan| pchan.name == name)
    }

    /// Get the parent channel of the named bone.
    pub fn parent_of(&self, name: &str) -> Option<&PoseChannel> {
        let parent = self.channel(name)?.parent.as_deref()?;
        self.channel(parent)
    }

    /// Walk from `tip` towards the root, collecting at most `length` bones.
    ///
    /// A `length` of zero walks all the way to the root. The walk never
    /// visits more than `max_length` bones, which also guards against
    /// malformed parent loops.
    pub fn chain(&self, tip: &str, length: usize, max_length: usize) -> Vec<&PoseChannel> {
        let limit = if length == 0 {
            max_length
        } else {
            length.min(max_length)
        };
        let mut chain = Vec::new();
        let mut current = self.channel(tip);
        while let Some(pchan) = current {
            if chain.len() >= limit {
                break;
            }
            chain.push(pchan);
            current = pchan
                .parent
                .as_deref()
                .and_then(|parent| self.channel(parent));
        }
        chain
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParticleKind {
    #[default]
    Emitter,
    Hair,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoidRule {
    pub name: String,
    pub object: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParticlePhysics {
    None,
    #[default]
    Newton,
    Keyed,
    Boids(Vec<BoidRule>),
    Fluid,
}

/// Shared settings of one or more particle systems.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParticleSettings {
    pub kind: ParticleKind,
    pub physics: ParticlePhysics,
    /// Object instanced at every particle.
    pub dup_object: Option<EntityId>,
    /// Group instanced at every particle.
    pub dup_group: Option<EntityId>,
    pub collision_group: Option<EntityId>,
    pub effector_weights: EffectorWeights,
}

/// Target of a keyed particle system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticleTarget {
    /// `None` targets a system on the same object.
    pub object: Option<EntityId>,
    pub system: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticleSystem {
    pub name: String,
    pub settings: EntityId,
    pub targets: Vec<ParticleTarget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Force,
    Wind,
    Vortex,
    Magnetic,
    Harmonic,
    Turbulence,
    Drag,
    /// Curve guide: reads the effector's curve path.
    Guide,
    /// Texture field: reads the effector's geometry.
    Texture,
}

impl FieldKind {
    /// Check whether the field shape depends on the effector's geometry.
    pub fn uses_geometry(&self) -> bool {
        matches!(self, FieldKind::Guide | FieldKind::Texture)
    }
}

/// Force field settings on an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForceField {
    pub kind: FieldKind,
    /// Force is absorbed by colliders between effector and affected point.
    pub absorption: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigidBodyObject {
    Active,
    Passive,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RigidBodyConstraint {
    pub object1: Option<EntityId>,
    pub object2: Option<EntityId>,
}

/// A scene object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Object {
    pub object_type: ObjectType,
    /// Object data: mesh, curve, armature, camera, lamp, ...
    pub data: Option<EntityId>,
    pub parent: Option<Parent>,
    pub constraints: Vec<Constraint>,
    pub modifiers: Vec<Modifier>,
    pub pose: Option<Pose>,
    pub particle_systems: Vec<ParticleSystem>,
    /// Library object this object is a local proxy of.
    pub proxy_from: Option<EntityId>,
    pub proxy_group: Option<EntityId>,
    /// Group instanced by this object.
    pub dup_group: Option<EntityId>,
    /// Object-level material slots.
    pub materials: Vec<EntityId>,
    pub rigidbody: Option<RigidBodyObject>,
    pub rigidbody_constraint: Option<RigidBodyConstraint>,
    pub field: Option<ForceField>,
    /// Other physics simulations collide with this object.
    pub collision: bool,
}

impl Object {
    pub fn new(object_type: ObjectType) -> Self {
        Self {
            object_type,
            ..Default::default()
        }
    }

    /// Check whether this object participates in collisions.
    pub fn is_collider(&self) -> bool {
        self.collision
            || self
                .modifiers
                .iter()
                .any(|md| md.kind == ModifierKind::Collision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arm_pose() -> Pose {
        Pose {
            channels: vec![
                PoseChannel::new("Root", None),
                PoseChannel::new("Upper", Some("Root")),
                PoseChannel::new("Lower", Some("Upper")),
                PoseChannel::new("Hand", Some("Lower")),
            ],
        }
    }

    fn names<'a>(chain: &[&'a PoseChannel]) -> Vec<&'a str> {
        chain.iter().map(|pchan| pchan.name.as_str()).collect()
    }

    #[test]
    fn chain_respects_length() {
        let pose = arm_pose();
        assert_eq!(names(&pose.chain("Hand", 2, 255)), vec!["Hand", "Lower"]);
    }

    #[test]
    fn zero_length_chain_walks_to_root() {
        let pose = arm_pose();
        assert_eq!(
            names(&pose.chain("Hand", 0, 255)),
            vec!["Hand", "Lower", "Upper", "Root"]
        );
    }

    #[test]
    fn chain_is_bounded_on_parent_loops() {
        let pose = Pose {
            channels: vec![
                PoseChannel::new("A", Some("B")),
                PoseChannel::new("B", Some("A")),
            ],
        };
        assert_eq!(pose.chain("A", 0, 5).len(), 5);
    }

    #[test]
    fn collision_modifier_marks_collider() {
        let mut ob = Object::new(ObjectType::Mesh);
        assert!(!ob.is_collider());
        ob.modifiers
            .push(Modifier::new("Collision", ModifierKind::Collision));
        assert!(ob.is_collider());
    }
}
