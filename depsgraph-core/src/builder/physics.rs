//! Physics: colliders, force fields, particle systems and rigid bodies.

use super::{BuildContext, RelationBuilder};
use crate::graph::{ComponentKey, Key, NodeType, OpCode, OperationKey, TimeSourceKey, NO_TAG};
use crate::scene::{
    EffectorWeights, EntityId, Object, ParticleKind, ParticlePhysics, ParticleSettings,
    RigidBodyWorld,
};

fn transform(id: EntityId) -> ComponentKey {
    ComponentKey::new(id, NodeType::Transform)
}

impl<'a> RelationBuilder<'a> {
    /// Objects physics lookups consider: a group if one is given, the
    /// current scene otherwise.
    fn physics_candidates(&self, ctx: BuildContext<'a>, group: Option<EntityId>) -> &'a [EntityId] {
        let main = self.main;
        match group {
            Some(group) => main
                .group(group)
                .map(|group| group.objects.as_slice())
                .unwrap_or_default(),
            None => ctx
                .scene
                .map(|(_, scene)| scene.objects.as_slice())
                .unwrap_or_default(),
        }
    }

    /// Build `group` and every collider or force field among the
    /// candidates it selects.
    pub(super) fn build_physics_candidates(&mut self, ctx: BuildContext<'a>, group: Option<EntityId>) {
        let main = self.main;
        if let Some(group) = group {
            self.build_id(ctx, group);
        }
        for &candidate in self.physics_candidates(ctx, group) {
            if main
                .object(candidate)
                .is_some_and(|ob| ob.is_collider() || ob.field.is_some())
            {
                self.build_id(ctx, candidate);
            }
        }
    }

    /// Results of every collider `object` may collide with. Nothing is
    /// built here.
    pub(super) fn collision_keys(
        &self,
        ctx: BuildContext<'a>,
        object: EntityId,
        group: Option<EntityId>,
    ) -> Vec<Key> {
        let main = self.main;
        self.physics_candidates(ctx, group)
            .iter()
            .copied()
            .filter(|&candidate| {
                candidate != object && main.object(candidate).is_some_and(Object::is_collider)
            })
            .flat_map(|candidate| self.object_result_keys(candidate, true))
            .collect()
    }

    /// Results of every force field acting on `object`. Nothing is built
    /// here.
    ///
    /// With `add_absorption`, fields absorbed by colliders also make
    /// `object` depend on those colliders.
    pub(super) fn forcefield_keys(
        &self,
        ctx: BuildContext<'a>,
        object: EntityId,
        weights: &EffectorWeights,
        add_absorption: bool,
    ) -> Vec<Key> {
        let main = self.main;
        let mut keys = Vec::new();
        for &candidate in self.physics_candidates(ctx, weights.group) {
            if candidate == object {
                continue;
            }
            let Some(field) = main.object(candidate).and_then(|ob| ob.field.as_ref()) else {
                continue;
            };
            keys.extend(self.object_result_keys(candidate, field.kind.uses_geometry()));
            if add_absorption && field.absorption {
                keys.extend(self.collision_keys(ctx, object, None));
            }
        }
        keys
    }

    pub(super) fn collision_sources(
        &mut self,
        ctx: BuildContext<'a>,
        object: EntityId,
        group: Option<EntityId>,
    ) -> Vec<Key> {
        self.build_physics_candidates(ctx, group);
        self.collision_keys(ctx, object, group)
    }

    pub(super) fn forcefield_sources(
        &mut self,
        ctx: BuildContext<'a>,
        object: EntityId,
        weights: &EffectorWeights,
        add_absorption: bool,
    ) -> Vec<Key> {
        self.build_physics_candidates(ctx, weights.group);
        if add_absorption {
            self.build_physics_candidates(ctx, None);
        }
        self.forcefield_keys(ctx, object, weights, add_absorption)
    }

    pub(super) fn build_particles(&mut self, ctx: BuildContext<'a>, id: EntityId, object: &'a Object) {
        let main = self.main;
        let init = OperationKey::new(id, NodeType::EvalParticles, OpCode::ParticleSystemEvalInit);
        let uber = OperationKey::new(id, NodeType::Geometry, OpCode::GeometryUberEval);
        let has_geometry = object.object_type.has_geometry();

        for psys in &object.particle_systems {
            let psys_key = OperationKey::tagged(
                id,
                NodeType::EvalParticles,
                OpCode::ParticleSystemEval,
                psys.name.as_str(),
                NO_TAG,
            );

            self.build_id(ctx, psys.settings);
            self.add_relation(
                OperationKey::new(psys.settings, NodeType::Parameters, OpCode::ParticleSettingsEval),
                &init,
                "Particle Settings Change",
            );
            self.add_relation(&init, &psys_key, "Init -> PSys");
            self.add_relation(TimeSourceKey::new(), &psys_key, "TimeSrc -> PSys");
            if has_geometry {
                self.add_relation(&psys_key, &uber, "PSys -> UberEval");
            }

            let Some(settings) = main.particle_settings(psys.settings) else {
                continue;
            };

            if settings.kind == ParticleKind::Emitter {
                for key in self.collision_sources(ctx, id, settings.collision_group) {
                    self.add_relation(key, &psys_key, "Particle Collision");
                }
            }
            let is_hair = settings.kind == ParticleKind::Hair;
            for key in self.forcefield_sources(ctx, id, &settings.effector_weights, is_hair) {
                self.add_relation(key, &psys_key, "Particle Field");
            }

            match &settings.physics {
                ParticlePhysics::Boids(rules) => {
                    for rule_object in rules.iter().filter_map(|rule| rule.object) {
                        self.build_id(ctx, rule_object);
                        self.add_relation(transform(rule_object), &psys_key, "Boid Rule");
                    }
                }
                ParticlePhysics::Keyed => {
                    let targets = psys
                        .targets
                        .iter()
                        .filter_map(|target| target.object)
                        .filter(|&target| target != id);
                    for target in targets {
                        self.build_id(ctx, target);
                        self.add_relation(
                            ComponentKey::new(target, NodeType::Geometry),
                            &psys_key,
                            "Keyed Target",
                        );
                    }
                }
                ParticlePhysics::None | ParticlePhysics::Newton | ParticlePhysics::Fluid => {}
            }

            if let Some(dup) = settings.dup_object.filter(|&dup| dup != id) {
                self.add_relation(transform(dup), &psys_key, "Particle Object Visualization");
            }
            if let Some(group) = settings.dup_group.and_then(|group| main.group(group)) {
                for &member in group.objects.iter().filter(|&&member| member != id) {
                    self.add_relation(transform(member), &psys_key, "Particle Group Visualization");
                }
            }
        }

        if has_geometry {
            self.add_relation(transform(id), &uber, "Particle Eval");
        }
    }

    pub(super) fn build_particle_settings(
        &mut self,
        ctx: BuildContext<'a>,
        id: EntityId,
        settings: &'a ParticleSettings,
    ) {
        self.build_animdata(ctx, id);
        if self.needs_animdata_node(id) {
            self.add_relation(
                Self::animation_key(id),
                OperationKey::new(id, NodeType::Parameters, OpCode::ParticleSettingsEval),
                "Particle Settings Animation",
            );
        }
        if let Some(dup) = settings.dup_object {
            self.build_id(ctx, dup);
        }
        if let Some(group) = settings.dup_group {
            self.build_id(ctx, group);
        }
    }

    pub(super) fn build_rigidbody(
        &mut self,
        ctx: BuildContext<'a>,
        scene_id: EntityId,
        world: &'a RigidBodyWorld,
    ) {
        let main = self.main;
        let init = OperationKey::new(scene_id, NodeType::Transform, OpCode::RigidBodyRebuild);
        let sim = OperationKey::new(scene_id, NodeType::Transform, OpCode::RigidBodySim);

        self.add_relation(&init, &sim, "Rigidbody [Init -> SimStep]");
        self.add_relation(
            TimeSourceKey::new(),
            &init,
            "TimeSrc -> Rigidbody Reset/Rebuild (Optional)",
        );
        for key in self.forcefield_sources(ctx, scene_id, &world.effector_weights, true) {
            self.add_relation(key, &init, "Rigidbody Field");
        }

        if let Some(group) = world.group {
            self.build_id(ctx, group);
            let members = main
                .group(group)
                .map(|group| group.objects.as_slice())
                .unwrap_or_default();
            for &member in members {
                let Some(object) = main.object(member).filter(|ob| ob.rigidbody.is_some()) else {
                    continue;
                };
                let copy = OperationKey::new(member, NodeType::Transform, OpCode::RigidBodyTransformCopy);
                let base = if object.parent.is_some() {
                    OpCode::TransformParent
                } else {
                    OpCode::TransformLocal
                };

                self.add_relation(&sim, &copy, "Rigidbody Sim Eval -> RBO Sync");
                if object.constraints.is_empty() {
                    self.add_relation(
                        &copy,
                        OperationKey::new(member, NodeType::Transform, OpCode::ObjectUberEval),
                        "RBO Sync -> Uber (Temp)",
                    );
                } else {
                    self.add_relation(
                        &copy,
                        OperationKey::new(member, NodeType::Transform, OpCode::TransformConstraints),
                        "RBO Sync -> Ob Constraints",
                    );
                }
                self.add_relation(
                    OperationKey::new(member, NodeType::Transform, base),
                    &sim,
                    "Base Ob Transform -> Rigidbody Sim Eval",
                );
            }
        }

        if let Some(constraints) = world.constraints {
            self.build_id(ctx, constraints);
            let members = main
                .group(constraints)
                .map(|group| group.objects.as_slice())
                .unwrap_or_default();
            for &member in members {
                let Some(rbc) = main
                    .object(member)
                    .and_then(|ob| ob.rigidbody_constraint.as_ref())
                else {
                    continue;
                };
                let constrained = [
                    (rbc.object1, "RigidBodyConstraint -> RBC.Object_1"),
                    (rbc.object2, "RigidBodyConstraint -> RBC.Object_2"),
                ];
                for (object, description) in constrained {
                    if let Some(object) = object {
                        self.add_relation(
                            transform(member),
                            OperationKey::new(object, NodeType::Transform, OpCode::RigidBodyTransformCopy),
                            description,
                        );
                    }
                }
                self.add_relation(
                    transform(member),
                    &sim,
                    "RigidBodyConstraint Transform -> RB Simulation",
                );
            }
        }
    }
}
