//! Which IK chains each pose channel belongs to.

use std::collections::{HashMap, HashSet};

/// Maps a pose channel name to the roots of every IK chain it is part of.
///
/// Filled while IK and spline IK chains are built, then queried when
/// linking bones of the same armature: bones sharing a chain root must link
/// through `BONE_READY` rather than `BONE_DONE`, or the solver would close a
/// cycle.
#[derive(Debug, Default, Clone)]
pub struct RootPChanMap {
    roots: HashMap<String, HashSet<String>>,
}

impl RootPChanMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `bone` is part of the chain rooted at `root`.
    pub fn add_bone(&mut self, bone: &str, root: &str) {
        self.roots
            .entry(bone.to_string())
            .or_default()
            .insert(root.to_string());
    }

    /// Check whether two bones belong to at least one common IK chain.
    pub fn has_common_root(&self, bone1: &str, bone2: &str) -> bool {
        match (self.roots.get(bone1), self.roots.get(bone2)) {
            (Some(a), Some(b)) => !a.is_disjoint(b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_root_requires_shared_chain() {
        let mut map = RootPChanMap::new();
        map.add_bone("Hand", "Upper");
        map.add_bone("Lower", "Upper");
        map.add_bone("Foot", "Thigh");

        assert!(map.has_common_root("Hand", "Lower"));
        assert!(!map.has_common_root("Hand", "Foot"));
        assert!(!map.has_common_root("Hand", "Spine"));
    }
}
