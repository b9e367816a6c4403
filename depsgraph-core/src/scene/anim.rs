//! Animation data: actions, F-Curves and drivers.

use super::EntityId;

/// Animation attached to a data block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimData {
    pub action: Option<EntityId>,
    /// Driver F-Curves, evaluated in list order.
    pub drivers: Vec<FCurve>,
}

impl AnimData {
    /// Check whether any animation evaluation is needed at all.
    pub fn is_animated(&self) -> bool {
        self.action.is_some() || !self.drivers.is_empty()
    }
}

/// A set of keyframed F-Curves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Action {
    pub fcurves: Vec<FCurve>,
}

/// An animation curve writing to one property path (and array element).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FCurve {
    pub rna_path: String,
    pub array_index: i32,
    pub driver: Option<Driver>,
}

impl FCurve {
    /// Create a keyframed curve.
    pub fn new(rna_path: impl Into<String>, array_index: i32) -> Self {
        Self {
            rna_path: rna_path.into(),
            array_index,
            driver: None,
        }
    }

    /// Create a driver curve.
    pub fn driver(rna_path: impl Into<String>, array_index: i32, driver: Driver) -> Self {
        Self {
            rna_path: rna_path.into(),
            array_index,
            driver: Some(driver),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Driver {
    pub expression: Option<String>,
    pub variables: Vec<DriverVariable>,
    /// Explicitly flagged as time dependent.
    pub uses_time: bool,
}

impl Driver {
    /// Check whether the driver must be re-evaluated on every frame change.
    pub fn depends_on_time(&self) -> bool {
        self.uses_time
            || self
                .expression
                .as_deref()
                .is_some_and(|expr| expr.contains("frame"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// Reads a single property.
    SingleProp,
    /// Reads an object or bone transform channel.
    Transforms,
    /// Rotational difference between two bones/objects.
    RotationDifference,
    /// Distance between two bones/objects.
    LocationDifference,
}

impl VariableKind {
    /// Number of targets this kind of variable reads.
    pub fn target_count(&self) -> usize {
        match self {
            VariableKind::SingleProp | VariableKind::Transforms => 1,
            VariableKind::RotationDifference | VariableKind::LocationDifference => 2,
        }
    }
}

/// One data source of a driver variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverTarget {
    pub id: Option<EntityId>,
    pub rna_path: Option<String>,
    /// Bone name for transform-channel targets on armatures.
    pub bone: Option<String>,
}

impl DriverTarget {
    pub fn property(id: EntityId, rna_path: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            rna_path: Some(rna_path.into()),
            bone: None,
        }
    }

    pub fn transform(id: EntityId, bone: Option<&str>) -> Self {
        Self {
            id: Some(id),
            rna_path: None,
            bone: bone.map(str::to_owned),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverVariable {
    pub name: String,
    pub kind: VariableKind,
    pub targets: Vec<DriverTarget>,
}

impl DriverVariable {
    pub fn new(name: impl Into<String>, kind: VariableKind, targets: Vec<DriverTarget>) -> Self {
        Self {
            name: name.into(),
            kind,
            targets,
        }
    }

    /// Targets actually read by this variable kind.
    pub fn used_targets(&self) -> impl Iterator<Item = &DriverTarget> + '_ {
        self.targets.iter().take(self.kind.target_count())
    }
}
