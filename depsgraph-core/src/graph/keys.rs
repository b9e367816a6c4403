//! Node Keys
//!
//! Keys name a node indirectly: by entity identity, component kind and
//! operation code or name. They carry no reference into the graph, can be
//! freely cloned and compared, and are resolved on demand.
//!
//! Resolution rules live in [`Depsgraph`](super::Depsgraph); property path
//! keys additionally need the property resolver and are handled by the
//! relation builder.

use std::fmt;

use super::types::{NodeType, OpCode};
use crate::scene::EntityId;

/// Sentinel name tag meaning "no disambiguation tag".
pub const NO_TAG: i32 = -1;

/// Names the time source: the global one, or one scoped to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimeSourceKey {
    pub id: Option<EntityId>,
}

impl TimeSourceKey {
    /// The global time source.
    pub fn new() -> Self {
        Self { id: None }
    }

    /// A time source scoped to one entity.
    pub fn for_entity(id: EntityId) -> Self {
        Self { id: Some(id) }
    }

    pub fn identifier(&self) -> String {
        match self.id {
            Some(id) => format!("TimeSourceKey(id: {id})"),
            None => "TimeSourceKey".to_string(),
        }
    }
}

/// Names a component of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentKey {
    pub id: EntityId,
    pub kind: NodeType,
    /// Instance name for multi-instance components (bones). Empty otherwise.
    pub name: String,
}

impl ComponentKey {
    pub fn new(id: EntityId, kind: NodeType) -> Self {
        Self {
            id,
            kind,
            name: String::new(),
        }
    }

    pub fn named(id: EntityId, kind: NodeType, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
        }
    }

    pub fn identifier(&self) -> String {
        if self.name.is_empty() {
            format!("ComponentKey({}, {})", self.id, self.kind)
        } else {
            format!("ComponentKey({}, {} '{}')", self.id, self.kind, self.name)
        }
    }
}

/// Names one operation inside a component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationKey {
    pub id: EntityId,
    pub component: NodeType,
    pub component_name: String,
    pub opcode: OpCode,
    /// Disambiguates operations sharing an opcode (e.g. one driver per path).
    pub name: String,
    pub name_tag: i32,
}

impl OperationKey {
    /// Key an operation by its opcode alone.
    pub fn new(id: EntityId, component: NodeType, opcode: OpCode) -> Self {
        Self {
            id,
            component,
            component_name: String::new(),
            opcode,
            name: String::new(),
            name_tag: NO_TAG,
        }
    }

    /// Key an operation inside a named component (e.g. a bone).
    pub fn in_component(
        id: EntityId,
        component: NodeType,
        component_name: impl Into<String>,
        opcode: OpCode,
    ) -> Self {
        Self {
            component_name: component_name.into(),
            ..Self::new(id, component, opcode)
        }
    }

    /// Key an operation disambiguated by name and tag.
    pub fn tagged(
        id: EntityId,
        component: NodeType,
        opcode: OpCode,
        name: impl Into<String>,
        name_tag: i32,
    ) -> Self {
        Self {
            name: name.into(),
            name_tag,
            ..Self::new(id, component, opcode)
        }
    }

    /// Key an operation that is only identified by name.
    pub fn named(id: EntityId, component: NodeType, name: impl Into<String>) -> Self {
        Self::tagged(id, component, OpCode::Operation, name, NO_TAG)
    }

    /// The key of the component holding this operation.
    pub fn component_key(&self) -> ComponentKey {
        ComponentKey::named(self.id, self.component, self.component_name.clone())
    }

    pub fn identifier(&self) -> String {
        let mut out = format!("OperationKey(id: {}, component: {}", self.id, self.component);
        if !self.component_name.is_empty() {
            out.push_str(&format!(" '{}'", self.component_name));
        }
        out.push_str(&format!(", opcode: {}", self.opcode));
        if !self.name.is_empty() {
            out.push_str(&format!(", name: '{}'", self.name));
        }
        if self.name_tag != NO_TAG {
            out.push_str(&format!(", tag: {}", self.name_tag));
        }
        out.push(')');
        out
    }
}

/// Names whatever node owns the property at `path` on entity `id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathKey {
    pub id: EntityId,
    pub path: String,
}

impl PathKey {
    pub fn new(id: EntityId, path: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }

    pub fn identifier(&self) -> String {
        format!("PathKey(id: {}, path: '{}')", self.id, self.path)
    }
}

/// Any of the four key kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    TimeSource(TimeSourceKey),
    Component(ComponentKey),
    Operation(OperationKey),
    Path(PathKey),
}

impl Key {
    pub fn identifier(&self) -> String {
        match self {
            Key::TimeSource(key) => key.identifier(),
            Key::Component(key) => key.identifier(),
            Key::Operation(key) => key.identifier(),
            Key::Path(key) => key.identifier(),
        }
    }

    /// The entity this key refers to, if any.
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Key::TimeSource(key) => key.id,
            Key::Component(key) => Some(key.id),
            Key::Operation(key) => Some(key.id),
            Key::Path(key) => Some(key.id),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

impl From<TimeSourceKey> for Key {
    fn from(key: TimeSourceKey) -> Self {
        Key::TimeSource(key)
    }
}

impl From<ComponentKey> for Key {
    fn from(key: ComponentKey) -> Self {
        Key::Component(key)
    }
}

impl From<OperationKey> for Key {
    fn from(key: OperationKey) -> Self {
        Key::Operation(key)
    }
}

impl From<PathKey> for Key {
    fn from(key: PathKey) -> Self {
        Key::Path(key)
    }
}

impl From<&OperationKey> for Key {
    fn from(key: &OperationKey) -> Self {
        Key::Operation(key.clone())
    }
}

impl From<&ComponentKey> for Key {
    fn from(key: &ComponentKey) -> Self {
        Key::Component(key.clone())
    }
}

impl From<&PathKey> for Key {
    fn from(key: &PathKey) -> Self {
        Key::Path(key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_compare_by_value() {
        let id = EntityId::from(3);
        let a = OperationKey::in_component(id, NodeType::Bone, "Hand", OpCode::BoneDone);
        let b = OperationKey::in_component(id, NodeType::Bone, "Hand", OpCode::BoneDone);
        let c = OperationKey::in_component(id, NodeType::Bone, "Foot", OpCode::BoneDone);

        let set: HashSet<Key> = [a.into(), b.into(), c.into()].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn identifier_mentions_all_parts() {
        let key = OperationKey::tagged(
            EntityId::from(1),
            NodeType::Animation,
            OpCode::Driver,
            "location",
            2,
        );
        let ident = key.identifier();
        assert!(ident.contains("#1"));
        assert!(ident.contains("DRIVER"));
        assert!(ident.contains("'location'"));
        assert!(ident.contains("tag: 2"));
    }

    #[test]
    fn operation_key_knows_its_component() {
        let key = OperationKey::in_component(
            EntityId::from(4),
            NodeType::Bone,
            "Spine",
            OpCode::BoneLocal,
        );
        assert_eq!(
            key.component_key(),
            ComponentKey::named(EntityId::from(4), NodeType::Bone, "Spine")
        );
    }
}
