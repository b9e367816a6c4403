//! Scene Data
//!
//! This module defines the read-only scene data model the relation builder
//! walks. Every independently identified data block (object, material,
//! node tree, scene, ...) lives in a [`Main`] database and is addressed by a
//! stable [`EntityId`].
//!
//! The builder never mutates anything in here. Data blocks reference each
//! other by `EntityId` only, so the model may freely contain cycles
//! (objects targeting each other, node groups, proxies).

mod anim;
mod data;
mod object;

pub use anim::{Action, AnimData, Driver, DriverTarget, DriverVariable, FCurve, VariableKind};
pub use data::{
    Armature, CacheFile, Camera, GeometryData, GeometryKind, GpLayer, GreasePencil, Group, Lamp,
    Mask, MaskLayer, Material, MovieClip, Node, NodeTree, RigidBodyWorld, Scene, ShapeKey,
    Texture, World,
};
pub use object::{
    BoidRule, Constraint, ConstraintKind, ConstraintTarget, EffectorWeights, FieldKind,
    ForceField, Modifier, ModifierKind, Object, ObjectType, Parent, ParentKind,
    ParticleKind, ParticlePhysics, ParticleSettings, ParticleSystem, ParticleTarget, Pose,
    PoseChannel, RigidBodyConstraint, RigidBodyObject,
};

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Stable identity of a data block.
///
/// Identity is never duplicated: two data blocks with the same name still
/// get distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of a data block, used for dispatch and for identifier strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Scene,
    Object,
    Group,
    Mesh,
    Curve,
    MetaBall,
    Lattice,
    Armature,
    Camera,
    Lamp,
    ShapeKey,
    Material,
    Texture,
    NodeTree,
    World,
    ParticleSettings,
    GreasePencil,
    CacheFile,
    Mask,
    MovieClip,
    Action,
}

impl IdKind {
    /// Two-letter code prefixed to data block names in diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            IdKind::Scene => "SC",
            IdKind::Object => "OB",
            IdKind::Group => "GR",
            IdKind::Mesh => "ME",
            IdKind::Curve => "CU",
            IdKind::MetaBall => "MB",
            IdKind::Lattice => "LT",
            IdKind::Armature => "AR",
            IdKind::Camera => "CA",
            IdKind::Lamp => "LA",
            IdKind::ShapeKey => "KE",
            IdKind::Material => "MA",
            IdKind::Texture => "TE",
            IdKind::NodeTree => "NT",
            IdKind::World => "WO",
            IdKind::ParticleSettings => "PA",
            IdKind::GreasePencil => "GD",
            IdKind::CacheFile => "CF",
            IdKind::Mask => "MS",
            IdKind::MovieClip => "MC",
            IdKind::Action => "AC",
        }
    }
}

/// Type-specific payload of a data block.
#[derive(Debug, Clone)]
pub enum DatablockData {
    Scene(Scene),
    Object(Object),
    Group(Group),
    Geometry(GeometryData),
    Armature(Armature),
    Camera(Camera),
    Lamp(Lamp),
    ShapeKey(ShapeKey),
    Material(Material),
    Texture(Texture),
    NodeTree(NodeTree),
    World(World),
    ParticleSettings(ParticleSettings),
    GreasePencil(GreasePencil),
    CacheFile(CacheFile),
    Mask(Mask),
    MovieClip(MovieClip),
    Action(Action),
}

impl DatablockData {
    /// Get the kind of this payload.
    pub fn kind(&self) -> IdKind {
        match self {
            DatablockData::Scene(_) => IdKind::Scene,
            DatablockData::Object(_) => IdKind::Object,
            DatablockData::Group(_) => IdKind::Group,
            DatablockData::Geometry(geom) => match geom.kind {
                GeometryKind::Mesh => IdKind::Mesh,
                GeometryKind::Curve | GeometryKind::Surface | GeometryKind::Font => IdKind::Curve,
                GeometryKind::MetaBall => IdKind::MetaBall,
                GeometryKind::Lattice => IdKind::Lattice,
            },
            DatablockData::Armature(_) => IdKind::Armature,
            DatablockData::Camera(_) => IdKind::Camera,
            DatablockData::Lamp(_) => IdKind::Lamp,
            DatablockData::ShapeKey(_) => IdKind::ShapeKey,
            DatablockData::Material(_) => IdKind::Material,
            DatablockData::Texture(_) => IdKind::Texture,
            DatablockData::NodeTree(_) => IdKind::NodeTree,
            DatablockData::World(_) => IdKind::World,
            DatablockData::ParticleSettings(_) => IdKind::ParticleSettings,
            DatablockData::GreasePencil(_) => IdKind::GreasePencil,
            DatablockData::CacheFile(_) => IdKind::CacheFile,
            DatablockData::Mask(_) => IdKind::Mask,
            DatablockData::MovieClip(_) => IdKind::MovieClip,
            DatablockData::Action(_) => IdKind::Action,
        }
    }
}

/// An independently identified scene data block.
#[derive(Debug, Clone)]
pub struct Datablock {
    id: EntityId,
    name: String,
    /// Animation and drivers attached to this data block.
    pub anim_data: Option<AnimData>,
    /// Type-specific payload.
    pub data: DatablockData,
}

impl Datablock {
    /// Get the data block's identity.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Get the data block's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the data block's kind.
    pub fn kind(&self) -> IdKind {
        self.data.kind()
    }
}

/// The database of all data blocks known to a build pass.
#[derive(Debug, Clone, Default)]
pub struct Main {
    datablocks: IndexMap<EntityId, Datablock>,
    next_id: u32,
}

macro_rules! typed_accessor {
    ($fn_name:ident, $variant:ident, $ty:ty) => {
        /// Get the data block payload if it exists and has the expected type.
        pub fn $fn_name(&self, id: EntityId) -> Option<&$ty> {
            match &self.datablocks.get(&id)?.data {
                DatablockData::$variant(value) => Some(value),
                _ => None,
            }
        }
    };
}

impl Main {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a data block and return its freshly allocated identity.
    pub fn add(&mut self, name: impl Into<String>, data: impl Into<DatablockData>) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.datablocks.insert(
            id,
            Datablock {
                id,
                name: name.into(),
                anim_data: None,
                data: data.into(),
            },
        );
        id
    }

    /// Attach animation data to an existing data block.
    ///
    /// Returns `false` if the data block does not exist.
    pub fn set_anim_data(&mut self, id: EntityId, anim_data: AnimData) -> bool {
        match self.datablocks.get_mut(&id) {
            Some(datablock) => {
                datablock.anim_data = Some(anim_data);
                true
            }
            None => false,
        }
    }

    /// Get mutable access to a data block while the scene is being assembled.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Datablock> {
        self.datablocks.get_mut(&id)
    }

    /// Get a data block by identity.
    pub fn get(&self, id: EntityId) -> Option<&Datablock> {
        self.datablocks.get(&id)
    }

    /// Get a data block's name, or an empty string for unknown ids.
    pub fn name(&self, id: EntityId) -> &str {
        self.datablocks.get(&id).map(|d| d.name.as_str()).unwrap_or("")
    }

    /// Get a data block's animation data.
    pub fn anim_data(&self, id: EntityId) -> Option<&AnimData> {
        self.datablocks.get(&id)?.anim_data.as_ref()
    }

    /// Iterate over all data blocks of the given kind in insertion order.
    pub fn iter_kind(&self, kind: IdKind) -> impl Iterator<Item = &Datablock> + '_ {
        self.datablocks.values().filter(move |d| d.kind() == kind)
    }

    /// Iterate over all data blocks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Datablock> + '_ {
        self.datablocks.values()
    }

    /// Get the number of data blocks.
    pub fn len(&self) -> usize {
        self.datablocks.len()
    }

    /// Check whether the database is empty.
    pub fn is_empty(&self) -> bool {
        self.datablocks.is_empty()
    }

    typed_accessor!(scene, Scene, Scene);
    typed_accessor!(object, Object, Object);
    typed_accessor!(group, Group, Group);
    typed_accessor!(geometry, Geometry, GeometryData);
    typed_accessor!(camera, Camera, Camera);
    typed_accessor!(lamp, Lamp, Lamp);
    typed_accessor!(shape_key, ShapeKey, ShapeKey);
    typed_accessor!(material, Material, Material);
    typed_accessor!(texture, Texture, Texture);
    typed_accessor!(node_tree, NodeTree, NodeTree);
    typed_accessor!(world, World, World);
    typed_accessor!(particle_settings, ParticleSettings, ParticleSettings);
    typed_accessor!(grease_pencil, GreasePencil, GreasePencil);
    typed_accessor!(mask, Mask, Mask);
    typed_accessor!(action, Action, Action);
}

macro_rules! impl_into_data {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for DatablockData {
                fn from(value: $ty) -> Self {
                    DatablockData::$variant(value)
                }
            }
        )*
    };
}

impl_into_data! {
    Scene => Scene,
    Object => Object,
    Group => Group,
    Geometry => GeometryData,
    Armature => Armature,
    Camera => Camera,
    Lamp => Lamp,
    ShapeKey => ShapeKey,
    Material => Material,
    Texture => Texture,
    NodeTree => NodeTree,
    World => World,
    ParticleSettings => ParticleSettings,
    GreasePencil => GreasePencil,
    CacheFile => CacheFile,
    Mask => Mask,
    MovieClip => MovieClip,
    Action => Action,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_even_for_equal_names() {
        let mut main = Main::new();
        let a = main.add("Cube", Object::new(ObjectType::Mesh));
        let b = main.add("Cube", Object::new(ObjectType::Mesh));
        assert_ne!(a, b);
        assert_eq!(main.len(), 2);
    }

    #[test]
    fn typed_accessors_check_kind() {
        let mut main = Main::new();
        let ob = main.add("Cube", Object::new(ObjectType::Mesh));
        let ma = main.add("Red", Material::default());

        assert!(main.object(ob).is_some());
        assert!(main.material(ob).is_none());
        assert!(main.material(ma).is_some());
        assert_eq!(main.get(ma).map(|d| d.kind()), Some(IdKind::Material));
    }

    #[test]
    fn iter_kind_keeps_insertion_order() {
        let mut main = Main::new();
        let first = main.add("A", MovieClip::default());
        main.add("Cube", Object::new(ObjectType::Mesh));
        let second = main.add("B", MovieClip::default());

        let clips: Vec<_> = main.iter_kind(IdKind::MovieClip).map(|d| d.id()).collect();
        assert_eq!(clips, vec![first, second]);
    }
}
