//! Property Paths
//!
//! The builder does not understand property paths itself. It asks a
//! [`PropertyResolver`] which entity owns the property at a path and which
//! component (and possibly which operation) produces its value.
//!
//! [`RnaPathResolver`] is the resolver for the data model in
//! [`crate::scene`]. Hosts with a richer reflection system can supply
//! their own.

use crate::graph::{ComponentKey, Key, NodeType, OpCode, OperationKey};
use crate::scene::{DatablockData, EntityId, IdKind, Main};

/// Where the value of a property is computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyTarget {
    /// The entity actually owning the property. May differ from the entity
    /// the path started at (`data.lens` on a camera object).
    pub owner: EntityId,
    pub component: NodeType,
    pub component_name: String,
    /// Specific operation, when the property maps to one.
    pub opcode: Option<OpCode>,
}

impl PropertyTarget {
    pub fn component(owner: EntityId, component: NodeType) -> Self {
        Self {
            owner,
            component,
            component_name: String::new(),
            opcode: None,
        }
    }

    /// Turn the target into a key the graph can resolve.
    pub fn to_key(&self) -> Key {
        match self.opcode {
            Some(opcode) => OperationKey::in_component(
                self.owner,
                self.component,
                self.component_name.clone(),
                opcode,
            )
            .into(),
            None => ComponentKey::named(self.owner, self.component, self.component_name.clone())
                .into(),
        }
    }
}

/// The property-reflection collaborator.
pub trait PropertyResolver {
    /// Resolve `path` on entity `id`. `None` means the path is invalid.
    fn resolve(&self, main: &Main, id: EntityId, path: &str) -> Option<PropertyTarget>;
}

/// Property resolver for the built-in scene model.
#[derive(Debug, Clone, Copy, Default)]
pub struct RnaPathResolver;

const TRANSFORM_PROPERTIES: &[&str] = &[
    "location",
    "rotation_euler",
    "rotation_quaternion",
    "rotation_axis_angle",
    "rotation_mode",
    "scale",
    "delta_location",
    "delta_rotation_euler",
    "delta_rotation_quaternion",
    "delta_scale",
];

/// Extract `NAME` from a path starting with `prefix["NAME"]`, and return the
/// remainder after the closing bracket.
pub(crate) fn quoted_subscript<'p>(path: &'p str, prefix: &str) -> Option<(&'p str, &'p str)> {
    let rest = path.strip_prefix(prefix)?.strip_prefix("[\"")?;
    let end = rest.find("\"]")?;
    Some((&rest[..end], &rest[end + 2..]))
}

fn first_segment(path: &str) -> &str {
    let end = path.find(['.', '[']).unwrap_or(path.len());
    &path[..end]
}

impl PropertyResolver for RnaPathResolver {
    fn resolve(&self, main: &Main, id: EntityId, path: &str) -> Option<PropertyTarget> {
        let datablock = main.get(id)?;

        if let DatablockData::Object(object) = &datablock.data {
            if let Some((bone, _)) = quoted_subscript(path, "pose.bones") {
                object.pose.as_ref()?.channel(bone)?;
                return Some(PropertyTarget {
                    owner: id,
                    component: NodeType::Bone,
                    component_name: bone.to_string(),
                    opcode: None,
                });
            }
            if let Some(rest) = path.strip_prefix("data.") {
                return self.resolve(main, object.data?, rest);
            }
            let head = first_segment(path);
            if TRANSFORM_PROPERTIES.contains(&head) {
                return Some(PropertyTarget {
                    opcode: Some(OpCode::TransformLocal),
                    ..PropertyTarget::component(id, NodeType::Transform)
                });
            }
            if head == "constraints" {
                return Some(PropertyTarget::component(id, NodeType::Transform));
            }
            if head == "modifiers" {
                return Some(PropertyTarget::component(id, NodeType::Geometry));
            }
        }

        let head = first_segment(path);
        let component = match datablock.kind() {
            IdKind::ShapeKey if head == "key_blocks" => NodeType::Geometry,
            IdKind::Scene if head == "sequence_editor" => NodeType::Sequencer,
            _ => NodeType::Parameters,
        };
        Some(PropertyTarget::component(id, component))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Camera, Object, ObjectType, Pose, PoseChannel, ShapeKey};

    fn rig(main: &mut Main) -> EntityId {
        let mut ob = Object::new(ObjectType::Armature);
        ob.pose = Some(Pose {
            channels: vec![PoseChannel::new("Hand", None)],
        });
        main.add("Rig", ob)
    }

    #[test]
    fn pose_bone_paths_resolve_to_bone_component() {
        let mut main = Main::new();
        let ob = rig(&mut main);
        let target = RnaPathResolver
            .resolve(&main, ob, "pose.bones[\"Hand\"].location")
            .unwrap();
        assert_eq!(target.component, NodeType::Bone);
        assert_eq!(target.component_name, "Hand");
        assert_eq!(target.opcode, None);
    }

    #[test]
    fn missing_bone_does_not_resolve() {
        let mut main = Main::new();
        let ob = rig(&mut main);
        assert!(RnaPathResolver
            .resolve(&main, ob, "pose.bones[\"Foot\"].location")
            .is_none());
    }

    #[test]
    fn transform_channels_map_to_local_transform() {
        let mut main = Main::new();
        let ob = main.add("Cube", Object::new(ObjectType::Mesh));
        let target = RnaPathResolver.resolve(&main, ob, "rotation_euler").unwrap();
        assert_eq!(target.component, NodeType::Transform);
        assert_eq!(target.opcode, Some(OpCode::TransformLocal));
    }

    #[test]
    fn data_paths_forward_to_object_data() {
        let mut main = Main::new();
        let cam = main.add("Camera", Camera::default());
        let mut ob = Object::new(ObjectType::Camera);
        ob.data = Some(cam);
        let ob = main.add("CameraObject", ob);

        let target = RnaPathResolver.resolve(&main, ob, "data.lens").unwrap();
        assert_eq!(target.owner, cam);
        assert_eq!(target.component, NodeType::Parameters);
    }

    #[test]
    fn shape_key_blocks_are_geometry() {
        let mut main = Main::new();
        let key = main.add("Key", ShapeKey::default());
        let target = RnaPathResolver
            .resolve(&main, key, "key_blocks[\"Smile\"].value")
            .unwrap();
        assert_eq!(target.component, NodeType::Geometry);
    }

    #[test]
    fn quoted_subscript_splits_name_and_rest() {
        assert_eq!(
            quoted_subscript("pose.bones[\"Arm.L\"].scale", "pose.bones"),
            Some(("Arm.L", ".scale"))
        );
        assert_eq!(quoted_subscript("location", "pose.bones"), None);
    }
}
