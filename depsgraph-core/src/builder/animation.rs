//! Animation data: actions and drivers.
//!
//! Drivers are operations of the animation component, one per driven
//! property channel. Their variables reach the driver through a
//! [`NodeHandle`](super::NodeHandle) bound to the driver operation.

use tracing::debug;

use super::{BuildContext, RelationBuilder};
use crate::graph::{Key, NodeType, OpCode, OperationKey, PathKey, TimeSourceKey};
use crate::scene::{Driver, DriverTarget, EntityId, FCurve, VariableKind};

impl<'a> RelationBuilder<'a> {
    /// Key of the operation evaluating one driver.
    pub fn driver_key(id: EntityId, fcurve: &FCurve) -> OperationKey {
        OperationKey::tagged(
            id,
            NodeType::Animation,
            OpCode::Driver,
            fcurve.rna_path.as_str(),
            fcurve.array_index,
        )
    }

    pub(super) fn build_animdata(&mut self, ctx: BuildContext<'a>, id: EntityId) {
        let main = self.main;
        let Some(adt) = main.anim_data(id) else {
            return;
        };
        let animation = Self::animation_key(id);

        if let Some(action) = adt.action {
            self.add_relation(TimeSourceKey::new(), &animation, "TimeSrc -> Animation");
            self.build_animdata_curves_targets(id, action);
        }

        for fcurve in &adt.drivers {
            let Some(driver) = &fcurve.driver else {
                continue;
            };
            let driver_key = Self::driver_key(id, fcurve);
            self.build_driver(ctx, id, fcurve, driver);

            // The whole array is written back at once, so channels of one
            // array property are evaluated in index order.
            if fcurve.array_index > 0 {
                let previous = adt
                    .drivers
                    .iter()
                    .filter(|candidate| {
                        candidate.driver.is_some()
                            && candidate.rna_path == fcurve.rna_path
                            && candidate.array_index < fcurve.array_index
                    })
                    .max_by_key(|candidate| candidate.array_index);
                if let Some(previous) = previous {
                    self.add_relation(Self::driver_key(id, previous), &driver_key, "Driver Order");
                }
            }

            if adt.action.is_some() {
                self.add_relation(&animation, &driver_key, "AnimData Before Drivers");
            }
        }
    }

    /// Make every property an action animates wait for the action.
    ///
    /// Curves whose path does not resolve are ignored; actions are shared
    /// between data blocks and routinely carry curves for properties the
    /// current user does not have.
    fn build_animdata_curves_targets(&mut self, id: EntityId, action: EntityId) {
        let main = self.main;
        let Some(action) = main.action(action) else {
            return;
        };
        let animation = Self::animation_key(id);
        for fcurve in &action.fcurves {
            if self.resolver.resolve(main, id, &fcurve.rna_path).is_none() {
                debug!(%id, path = %fcurve.rna_path, "skipping unresolved animation curve");
                continue;
            }
            self.add_relation(
                &animation,
                PathKey::new(id, fcurve.rna_path.as_str()),
                "Animation -> Prop",
            );
        }
    }

    fn build_driver(&mut self, ctx: BuildContext<'a>, id: EntityId, fcurve: &'a FCurve, driver: &'a Driver) {
        let driver_key = Self::driver_key(id, fcurve);
        let driven: Key = PathKey::new(id, fcurve.rna_path.as_str()).into();

        self.add_relation(&driver_key, driven.clone(), "Driver -> Driven Property");
        if driver.depends_on_time() {
            self.add_relation(TimeSourceKey::new(), &driver_key, "TimeSrc -> Driver");
        }

        let Some(handle) = self.create_node_handle(&driver_key, "Driver Variable") else {
            return;
        };
        for variable in &driver.variables {
            for target in variable.used_targets() {
                let Some(target_id) = target.id else {
                    continue;
                };
                self.build_id(ctx, target_id);
                let Some((from, description)) = self.driver_target_key(id, variable.kind, target) else {
                    continue;
                };
                if self.config.same_bone_heuristic && self.is_same_bone_dependency(&from, &driven) {
                    debug!(
                        %id,
                        path = %fcurve.rna_path,
                        variable = %variable.name,
                        "skipping same-bone driver variable"
                    );
                    continue;
                }
                self.add_node_handle_relation(from, &handle, description);
            }
        }
    }

    /// What a driver variable target reads, or `None` when it reads nothing
    /// the graph tracks.
    fn driver_target_key(
        &self,
        id: EntityId,
        kind: VariableKind,
        target: &DriverTarget,
    ) -> Option<(Key, &'static str)> {
        let target_id = target.id?;
        match (kind, target.bone.as_deref()) {
            (VariableKind::SingleProp, _) => {
                let path = target.rna_path.as_deref().unwrap_or("");
                Some((PathKey::new(target_id, path).into(), "RNA Target -> Driver"))
            }
            (_, Some(bone)) => {
                let has_channel = self
                    .main
                    .object(target_id)
                    .and_then(|object| object.pose.as_ref())
                    .is_some_and(|pose| pose.channel(bone).is_some());
                if !has_channel {
                    debug!(target = %target_id, bone, "driver target bone not found");
                    return None;
                }
                let key = OperationKey::in_component(target_id, NodeType::Bone, bone, OpCode::BoneDone);
                Some((key.into(), "Bone Target -> Driver"))
            }
            // An entity driving itself from its own transform would only
            // see its own output.
            (_, None) if target_id == id => None,
            (_, None) => {
                let key = OperationKey::new(target_id, NodeType::Transform, OpCode::TransformFinal);
                Some((key.into(), "Target -> Driver"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuilderConfig, CollectingSink, RelationFailure, RelationSide};
    use crate::error::ResolveError;
    use crate::graph::{Depsgraph, UpdateScheduler};
    use crate::scene::{
        Action, AnimData, DriverVariable, Main, Object, ObjectType, Pose, PoseChannel,
    };

    fn linked(graph: &Depsgraph, from: &OperationKey, to: &OperationKey) -> bool {
        match (graph.find_node(from), graph.find_node(to)) {
            (Some(from), Some(to)) => graph.has_relation(from, to),
            _ => false,
        }
    }

    fn bone_op(id: EntityId, bone: &str, opcode: OpCode) -> OperationKey {
        OperationKey::in_component(id, NodeType::Bone, bone, opcode)
    }

    fn driven_rig(main: &mut Main, reads: &[&str]) -> (EntityId, FCurve) {
        let mut ob = Object::new(ObjectType::Armature);
        ob.pose = Some(Pose {
            channels: vec![
                PoseChannel::new("Root", None),
                PoseChannel::new("Tip", Some("Root")),
            ],
        });
        let rig = main.add("Rig", ob);
        let variables = reads
            .iter()
            .map(|bone| {
                DriverVariable::new(
                    *bone,
                    VariableKind::Transforms,
                    vec![DriverTarget::transform(rig, Some(*bone))],
                )
            })
            .collect();
        let fcurve = FCurve::driver(
            "pose.bones[\"Tip\"].rotation_euler",
            0,
            Driver {
                variables,
                ..Default::default()
            },
        );
        main.set_anim_data(
            rig,
            AnimData {
                action: None,
                drivers: vec![fcurve.clone()],
            },
        );
        (rig, fcurve)
    }

    #[test]
    fn driver_on_bone_ignores_its_own_result() {
        let mut main = Main::new();
        let (rig, fcurve) = driven_rig(&mut main, &["Tip", "Root"]);

        let sink = CollectingSink::new();
        let mut builder = RelationBuilder::new(&main).with_sink(sink.clone());
        builder.build_id(BuildContext::detached(), rig);
        let graph = builder.finish();

        let driver = RelationBuilder::driver_key(rig, &fcurve);
        assert!(!linked(&graph, &bone_op(rig, "Tip", OpCode::BoneDone), &driver));
        assert!(linked(&graph, &bone_op(rig, "Root", OpCode::BoneDone), &driver));
        assert!(linked(&graph, &driver, &bone_op(rig, "Tip", OpCode::BoneLocal)));
        assert!(UpdateScheduler::new(&graph).evaluation_order().is_ok());
        assert!(sink.is_empty(), "{:?}", sink.records());
    }

    /// Build a rig carrying one driver and collect the diagnostics.
    fn driver_failures(driven_path: &str, variable: Option<&str>) -> Vec<RelationFailure> {
        let mut main = Main::new();
        let mut ob = Object::new(ObjectType::Armature);
        ob.pose = Some(Pose {
            channels: vec![PoseChannel::new("Root", None)],
        });
        let rig = main.add("Rig", ob);
        let variables = variable
            .map(|path| {
                vec![DriverVariable::new(
                    "prop",
                    VariableKind::SingleProp,
                    vec![DriverTarget::property(rig, path)],
                )]
            })
            .unwrap_or_default();
        main.set_anim_data(
            rig,
            AnimData {
                action: None,
                drivers: vec![FCurve::driver(
                    driven_path,
                    0,
                    Driver {
                        variables,
                        ..Default::default()
                    },
                )],
            },
        );

        let sink = CollectingSink::new();
        let mut builder = RelationBuilder::new(&main).with_sink(sink.clone());
        builder.build_id(BuildContext::detached(), rig);
        sink.records()
    }

    #[test]
    fn missing_driven_bone_is_reported() {
        let records = driver_failures("pose.bones[\"Missing\"].location", None);
        assert_eq!(records.len(), 1, "{records:?}");
        assert_eq!(records[0].side, RelationSide::To);
        assert_eq!(records[0].description, "Driver -> Driven Property");
        assert!(records[0].key.contains("PathKey("));
        assert!(matches!(records[0].reason, ResolveError::UnresolvedPath { .. }));
    }

    #[test]
    fn missing_variable_bone_is_reported() {
        let records = driver_failures(
            "pose.bones[\"Root\"].location",
            Some("pose.bones[\"Gone\"].scale"),
        );
        assert_eq!(records.len(), 1, "{records:?}");
        assert_eq!(records[0].side, RelationSide::From);
        assert_eq!(records[0].description, "RNA Target -> Driver");
        assert!(records[0].key.contains("PathKey("));
        assert!(matches!(records[0].reason, ResolveError::UnresolvedPath { .. }));
    }

    #[test]
    fn disabling_the_heuristic_keeps_the_cycle() {
        let mut main = Main::new();
        let (rig, fcurve) = driven_rig(&mut main, &["Tip"]);
        let config = BuilderConfig {
            same_bone_heuristic: false,
            ..BuilderConfig::default()
        };

        let mut builder = RelationBuilder::new(&main).with_config(config);
        builder.build_id(BuildContext::detached(), rig);
        let graph = builder.finish();

        let driver = RelationBuilder::driver_key(rig, &fcurve);
        assert!(linked(&graph, &bone_op(rig, "Tip", OpCode::BoneDone), &driver));
        assert!(UpdateScheduler::new(&graph).evaluation_order().is_err());
    }

    #[test]
    fn array_drivers_run_in_index_order() {
        let mut main = Main::new();
        let ob = main.add("Cube", Object::new(ObjectType::Empty));
        let curves: Vec<FCurve> = (0..3)
            .map(|index| FCurve::driver("location", index, Driver::default()))
            .collect();
        main.set_anim_data(
            ob,
            AnimData {
                action: None,
                drivers: curves.clone(),
            },
        );

        let mut builder = RelationBuilder::new(&main);
        builder.build_id(BuildContext::detached(), ob);
        let graph = builder.finish();

        let keys: Vec<OperationKey> = curves
            .iter()
            .map(|fcurve| RelationBuilder::driver_key(ob, fcurve))
            .collect();
        assert!(linked(&graph, &keys[0], &keys[1]));
        assert!(linked(&graph, &keys[1], &keys[2]));
        assert!(!linked(&graph, &keys[0], &keys[2]));
    }

    #[test]
    fn action_animates_resolvable_properties_only() {
        let mut main = Main::new();
        let action = main.add(
            "Action",
            Action {
                fcurves: vec![
                    FCurve::new("location", 0),
                    FCurve::new("pose.bones[\"Missing\"].location", 0),
                ],
            },
        );
        let ob = main.add("Cube", Object::new(ObjectType::Empty));
        main.set_anim_data(
            ob,
            AnimData {
                action: Some(action),
                drivers: Vec::new(),
            },
        );

        let sink = CollectingSink::new();
        let mut builder = RelationBuilder::new(&main).with_sink(sink.clone());
        builder.build_id(BuildContext::detached(), ob);
        let graph = builder.finish();

        let animation = OperationKey::new(ob, NodeType::Animation, OpCode::Animation);
        let local = OperationKey::new(ob, NodeType::Transform, OpCode::TransformLocal);
        let relation = graph
            .find_relation(
                graph.find_node(&animation).unwrap(),
                graph.find_node(&local).unwrap(),
            )
            .unwrap();
        assert!(!relation.description.is_empty());
        assert!(graph.operation(graph.find_node(&animation).unwrap()).is_time_dependent());
        assert!(sink.is_empty(), "{:?}", sink.records());
    }

    #[test]
    fn drivers_read_other_objects_and_time() {
        let mut main = Main::new();
        let target = main.add("Target", Object::new(ObjectType::Empty));
        let fcurve = FCurve::driver(
            "scale",
            1,
            Driver {
                expression: Some("frame * var".into()),
                variables: vec![DriverVariable::new(
                    "var",
                    VariableKind::LocationDifference,
                    vec![
                        DriverTarget::transform(target, None),
                        DriverTarget::property(target, "location"),
                    ],
                )],
                uses_time: false,
            },
        );
        let ob = main.add("Cube", Object::new(ObjectType::Empty));
        main.set_anim_data(
            ob,
            AnimData {
                action: None,
                drivers: vec![fcurve.clone()],
            },
        );

        let mut builder = RelationBuilder::new(&main);
        builder.build_id(BuildContext::detached(), ob);
        let graph = builder.finish();

        let driver = RelationBuilder::driver_key(ob, &fcurve);
        let final_op = OperationKey::new(target, NodeType::Transform, OpCode::TransformFinal);
        assert!(linked(&graph, &final_op, &driver));
        assert!(graph.operation(graph.find_node(&driver).unwrap()).is_time_dependent());
    }
}
