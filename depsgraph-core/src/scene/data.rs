//! Non-object data blocks.

use super::{EffectorWeights, EntityId};

/// Rigid body simulation settings of a scene.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RigidBodyWorld {
    /// Group of simulated objects.
    pub group: Option<EntityId>,
    /// Group of objects carrying rigid body constraints.
    pub constraints: Option<EntityId>,
    pub effector_weights: EffectorWeights,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scene {
    /// Objects linked into the scene.
    pub objects: Vec<EntityId>,
    pub camera: Option<EntityId>,
    pub world: Option<EntityId>,
    pub rigidbody_world: Option<RigidBodyWorld>,
    /// Compositing node tree.
    pub compositor: Option<EntityId>,
    pub grease_pencil: Option<EntityId>,
    /// Background scene whose objects are evaluated too.
    pub set: Option<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    pub objects: Vec<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometryKind {
    #[default]
    Mesh,
    Curve,
    Surface,
    Font,
    MetaBall,
    Lattice,
}

/// Object data carrying evaluated geometry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeometryData {
    pub kind: GeometryKind,
    pub materials: Vec<EntityId>,
    pub shape_key: Option<EntityId>,
    /// Curve bevel object.
    pub bevel_object: Option<EntityId>,
    /// Curve taper object.
    pub taper_object: Option<EntityId>,
    /// Text-on-curve object for fonts.
    pub text_on_curve: Option<EntityId>,
}

impl GeometryData {
    pub fn new(kind: GeometryKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Armature {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Camera {
    /// Object used as depth-of-field focus.
    pub dof_object: Option<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lamp {
    pub node_tree: Option<EntityId>,
    pub textures: Vec<EntityId>,
}

/// Shape key block of a geometry data block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeKey {
    /// Geometry data block owning the key.
    pub owner: Option<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Material {
    pub node_tree: Option<EntityId>,
    /// Texture stack, in slot order.
    pub textures: Vec<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Texture {
    pub node_tree: Option<EntityId>,
}

/// A node inside a node tree. Only the referenced data block matters here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub id: Option<EntityId>,
}

impl Node {
    pub fn new(name: impl Into<String>, id: Option<EntityId>) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeTree {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct World {
    pub node_tree: Option<EntityId>,
    pub textures: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpLayer {
    pub name: String,
    pub parent: Option<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GreasePencil {
    pub layers: Vec<GpLayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheFile {
    /// Frames come from an image-sequence-like series of files.
    pub is_sequence: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskLayer {
    pub name: String,
    /// Movie clips the layer's spline points are parented to.
    pub parents: Vec<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mask {
    pub layers: Vec<MaskLayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieClip {}
