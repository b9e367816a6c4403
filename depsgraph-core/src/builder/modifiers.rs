//! Modifier stacks.
//!
//! Every modifier gets a [`HandleScope`] bound to the geometry evaluation
//! of its object and reports its own dependencies through it.

use super::{BuildContext, HandleScope, RelationBuilder};
use crate::graph::{ComponentKey, NodeType, OpCode, OperationKey, TimeSourceKey};
use crate::scene::{EffectorWeights, EntityId, Modifier, ModifierKind, Object};

/// Dependency callback of a modifier.
fn update_depsgraph(md: &Modifier, object: EntityId, scope: &mut HandleScope<'_, '_>) {
    match &md.kind {
        ModifierKind::Armature { object: armature } => {
            if let Some(armature) = *armature {
                scope.add_object_relation(armature, NodeType::EvalPose, "Armature Modifier");
                scope.add_object_relation(armature, NodeType::Transform, "Armature Modifier");
            }
            scope.add_object_relation(object, NodeType::Transform, "Armature Modifier");
        }
        ModifierKind::Hook {
            object: target,
            subtarget,
        } => {
            if let Some(target) = *target {
                if let Some(bone) = subtarget {
                    scope.add_bone_relation(target, bone, "Hook Modifier");
                }
                scope.add_object_relation(target, NodeType::Transform, "Hook Modifier");
            }
            scope.add_object_relation(object, NodeType::Transform, "Hook Modifier");
        }
        ModifierKind::Curve { object: target } => {
            deform_by_object(scope, object, *target, "Curve Modifier");
        }
        ModifierKind::Lattice { object: target } => {
            deform_by_object(scope, object, *target, "Lattice Modifier");
        }
        ModifierKind::Boolean { object: target } => {
            deform_by_object(scope, object, *target, "Boolean Modifier");
        }
        ModifierKind::Displace {
            texture,
            map_object,
        } => {
            if let Some(texture) = *texture {
                scope.add_relation(
                    ComponentKey::new(texture, NodeType::Parameters),
                    "Displace Modifier",
                );
            }
            if let Some(map_object) = *map_object {
                scope.add_object_relation(map_object, NodeType::Transform, "Displace Modifier");
                scope.add_object_relation(object, NodeType::Transform, "Displace Modifier");
            }
        }
        ModifierKind::Cloth {
            collision_group,
            effector_weights,
        } => {
            scope.add_collision_relations(object, *collision_group, "Cloth Collision");
            scope.add_forcefield_relations(object, effector_weights, true, "Cloth Field");
        }
        ModifierKind::Softbody { effector_weights } => {
            softbody_relations(scope, object, effector_weights);
        }
        ModifierKind::Collision | ModifierKind::ParticleSystem | ModifierKind::Generic => {}
    }
}

/// Geometry and placement of another object, plus our own placement.
fn deform_by_object(
    scope: &mut HandleScope<'_, '_>,
    object: EntityId,
    target: Option<EntityId>,
    description: &str,
) {
    if let Some(target) = target {
        scope.add_object_relation(target, NodeType::Geometry, description);
        scope.add_object_relation(target, NodeType::Transform, description);
    }
    scope.add_object_relation(object, NodeType::Transform, description);
}

fn softbody_relations(
    scope: &mut HandleScope<'_, '_>,
    object: EntityId,
    effector_weights: &EffectorWeights,
) {
    scope.add_collision_relations(object, None, "Softbody Collision");
    scope.add_forcefield_relations(object, effector_weights, true, "Softbody Field");
}

impl<'a> RelationBuilder<'a> {
    pub(super) fn build_modifiers(&mut self, ctx: BuildContext<'a>, id: EntityId, object: &'a Object) {
        let uber = OperationKey::new(id, NodeType::Geometry, OpCode::GeometryUberEval);

        for md in &object.modifiers {
            for referenced in md.referenced_ids() {
                self.build_id(ctx, referenced);
            }
            self.build_simulation_inputs(ctx, md);
            if let Some(handle) = self.create_node_handle(&uber, &md.name) {
                let mut scope = self.handle_scope(ctx, handle);
                update_depsgraph(md, id, &mut scope);
            }
            if md.depends_on_time() {
                self.add_relation(TimeSourceKey::new(), &uber, "Time Source");
            }
            if matches!(md.kind, ModifierKind::Cloth { .. }) {
                self.build_cloth(id);
            }
        }
    }

    /// Colliders and force fields a simulation modifier reads are built
    /// before its scope is handed out.
    fn build_simulation_inputs(&mut self, ctx: BuildContext<'a>, md: &Modifier) {
        let (collision_group, effector_weights) = match &md.kind {
            ModifierKind::Cloth {
                collision_group,
                effector_weights,
            } => (*collision_group, effector_weights),
            ModifierKind::Softbody { effector_weights } => (None, effector_weights),
            _ => return,
        };
        self.build_physics_candidates(ctx, collision_group);
        self.build_physics_candidates(ctx, effector_weights.group);
        // Absorbing fields pull in the scene's colliders.
        self.build_physics_candidates(ctx, None);
    }

    fn build_cloth(&mut self, id: EntityId) {
        self.add_relation(
            OperationKey::new(id, NodeType::Cache, OpCode::GeometryClothModifier),
            OperationKey::new(id, NodeType::Geometry, OpCode::GeometryUberEval),
            "Cloth Cache -> Cloth",
        );
    }
}
