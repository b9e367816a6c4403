//! Objects, their parenting and their data blocks.

use super::{BuildContext, RelationBuilder};
use crate::graph::{ComponentKey, Key, NodeType, OpCode, OperationKey};
use crate::scene::{
    Camera, EntityId, GeometryData, GeometryKind, Group, Lamp, Main, Object, ObjectType,
    ParentKind, ShapeKey,
};

/// Material slots of an object and of its data, without duplicates.
pub(super) fn object_materials(main: &Main, object: &Object) -> Vec<EntityId> {
    let data_materials = object
        .data
        .and_then(|data| main.geometry(data))
        .map(|geom| geom.materials.as_slice())
        .unwrap_or_default();
    let mut materials: Vec<EntityId> = Vec::new();
    for &material in object.materials.iter().chain(data_materials) {
        if !materials.contains(&material) {
            materials.push(material);
        }
    }
    materials
}

fn transform_op(id: EntityId, opcode: OpCode) -> OperationKey {
    OperationKey::new(id, NodeType::Transform, opcode)
}

impl<'a> RelationBuilder<'a> {
    pub(super) fn build_object(&mut self, ctx: BuildContext<'a>, id: EntityId, object: &'a Object) {
        let local = transform_op(id, OpCode::TransformLocal);
        let parent_op = transform_op(id, OpCode::TransformParent);
        let uber = transform_op(id, OpCode::ObjectUberEval);
        let final_op = transform_op(id, OpCode::TransformFinal);

        // Proxy rigs read bones of their source, so it goes first.
        if let Some(source) = object.proxy_from {
            self.build_id(ctx, source);
        }

        let base = if let Some(parent) = &object.parent {
            self.build_id(ctx, parent.object);
            self.build_object_parent(id, object);
            self.add_relation(&local, &parent_op, "ObLocal -> ObParent");
            &parent_op
        } else {
            &local
        };

        if object.constraints.is_empty() {
            self.add_relation(base, &uber, "Temp Ubereval");
        } else {
            self.build_constraints(ctx, id, NodeType::Transform, "", &object.constraints, None);
            let constraints = transform_op(id, OpCode::TransformConstraints);
            self.add_relation(base, &constraints, "ObBase-> Constraint Stack");
            self.add_relation(&constraints, &uber, "ObConstraints -> Done");
        }
        self.add_relation(&uber, &final_op, "Temp Ubereval");

        self.build_animdata(ctx, id);
        if self.needs_animdata_node(id) {
            self.add_relation(Self::animation_key(id), &local, "Object Animation");
        }

        self.build_object_data(ctx, id, object);

        if !object.particle_systems.is_empty() {
            self.build_particles(ctx, id, object);
        }

        if let Some(source) = object.proxy_from {
            self.add_relation(
                ComponentKey::new(source, NodeType::Transform),
                ComponentKey::new(id, NodeType::Transform),
                "Proxy Transform",
            );
        }
        if let Some(proxy_group) = object.proxy_group {
            self.build_id(ctx, proxy_group);
            self.add_relation(
                ComponentKey::new(proxy_group, NodeType::Transform),
                ComponentKey::new(id, NodeType::Transform),
                "Proxy Group Transform",
            );
        }

        if let Some(group) = object.dup_group {
            self.build_id(ctx, group);
            let main = self.main;
            let members = main
                .group(group)
                .map(|group| group.objects.as_slice())
                .unwrap_or_default();
            for &member in members.iter().filter(|&&member| member != id) {
                self.add_relation(
                    ComponentKey::new(member, NodeType::Transform),
                    &local,
                    "Dupligroup",
                );
            }
        }
    }

    fn build_object_parent(&mut self, id: EntityId, object: &'a Object) {
        let Some(parent) = &object.parent else {
            return;
        };
        let to = transform_op(id, OpCode::TransformParent);
        let parent_transform = ComponentKey::new(parent.object, NodeType::Transform);
        let parent_geometry = ComponentKey::new(parent.object, NodeType::Geometry);

        match &parent.kind {
            ParentKind::Armature => {
                self.add_relation(parent_transform, &to, "Armature Deform Parent");
            }
            ParentKind::Vertex => {
                self.add_relation(parent_geometry, &to, "Vertex Parent");
                self.add_relation(parent_transform, &to, "Vertex Parent TFM");
            }
            ParentKind::Bone(bone) => {
                self.add_relation(
                    ComponentKey::named(parent.object, NodeType::Bone, bone.as_str()),
                    &to,
                    "Bone Parent",
                );
                self.add_relation(
                    transform_op(parent.object, OpCode::TransformFinal),
                    &to,
                    "Armature Parent",
                );
            }
            ParentKind::CurvePath => {
                self.add_relation(parent_geometry, &to, "Curve Follow Parent");
                self.add_relation(parent_transform, &to, "Curve Follow TFM");
            }
            ParentKind::Object => {
                let parent_type = self.main.object(parent.object).map(|ob| ob.object_type);
                if parent_type == Some(ObjectType::Lattice) {
                    self.add_relation(parent_transform, &to, "Lattice Deform Parent");
                    self.add_relation(parent_geometry, &to, "Lattice Deform Parent Geom");
                } else {
                    self.add_relation(parent_transform, &to, "Parent");
                }
            }
        }
    }

    fn build_object_data(&mut self, ctx: BuildContext<'a>, id: EntityId, object: &'a Object) {
        if let Some(data) = object.data {
            self.build_id(ctx, data);
        }
        match object.object_type {
            ObjectType::Armature => match object.proxy_from {
                Some(source) => self.build_proxy_rig(id, object, source),
                None => self.build_rig(ctx, id, object),
            },
            ObjectType::Lamp => {
                if let Some(data) = object.data {
                    self.add_relation(
                        Self::parameters_key(data),
                        Self::parameters_key(id),
                        "Lamp -> Object",
                    );
                }
            }
            ObjectType::Camera => {
                if let Some(data) = object.data {
                    self.add_relation(
                        Self::parameters_key(data),
                        Self::parameters_key(id),
                        "Camera -> Object",
                    );
                }
            }
            kind if kind.has_geometry() => self.build_obdata_geom(ctx, id, object),
            _ => {}
        }
    }

    /// Object-level geometry: modifier stack, materials and curve helpers.
    fn build_obdata_geom(&mut self, ctx: BuildContext<'a>, id: EntityId, object: &'a Object) {
        let main = self.main;
        let geometry = ComponentKey::new(id, NodeType::Geometry);

        if let Some(data) = object.data {
            self.add_relation(
                ComponentKey::new(data, NodeType::Geometry),
                &geometry,
                "Object Geometry Base Data",
            );
        }

        self.build_modifiers(ctx, id, object);

        let shading = Self::placeholder_key(id, NodeType::Shading, "Shading");
        for material in object_materials(main, object) {
            self.build_id(ctx, material);
            self.add_relation(
                OperationKey::new(material, NodeType::Shading, OpCode::MaterialUpdate),
                &shading,
                "Material Update",
            );
        }

        self.add_relation(
            Self::placeholder_key(id, NodeType::Geometry, "Eval Init"),
            OperationKey::new(id, NodeType::Geometry, OpCode::GeometryUberEval),
            "Object Geometry UberEval",
        );

        let Some(data) = object.data.and_then(|data| main.geometry(data)) else {
            return;
        };
        if matches!(data.kind, GeometryKind::Curve | GeometryKind::Font) {
            let mut helpers = vec![
                (data.bevel_object, "Curve Bevel"),
                (data.taper_object, "Curve Taper"),
            ];
            if data.kind == GeometryKind::Font {
                helpers.push((data.text_on_curve, "Text on Curve"));
            }
            for (helper, description) in helpers {
                let Some(helper) = helper else {
                    continue;
                };
                self.build_id(ctx, helper);
                self.add_relation(
                    ComponentKey::new(helper, NodeType::Geometry),
                    &geometry,
                    description,
                );
            }
        }
    }

    /// Data-level geometry evaluation shared by every user of the data.
    pub(super) fn build_geometry_data(
        &mut self,
        ctx: BuildContext<'a>,
        id: EntityId,
        geometry: &'a GeometryData,
    ) {
        let eval = Self::placeholder_key(id, NodeType::Geometry, "Geometry Eval");
        let done = Self::placeholder_key(id, NodeType::Geometry, "Eval Done");

        self.build_animdata(ctx, id);
        self.add_relation(&eval, &done, "ObData Geom Eval Done");

        if self.needs_animdata_node(id) {
            self.add_relation(
                Self::animation_key(id),
                ComponentKey::new(id, NodeType::Parameters),
                "Geom Parameters",
            );
            self.add_relation(Self::animation_key(id), &eval, "Animation");
        }

        if let Some(key) = geometry.shape_key {
            self.build_id(ctx, key);
            self.add_relation(
                ComponentKey::new(key, NodeType::Geometry),
                ComponentKey::new(id, NodeType::Geometry),
                "Shapekeys",
            );
        }
    }

    pub(super) fn build_shapekeys(&mut self, ctx: BuildContext<'a>, id: EntityId, key: &'a ShapeKey) {
        self.build_animdata(ctx, id);
        let has_action = self
            .main
            .anim_data(id)
            .is_some_and(|adt| adt.action.is_some());
        if let (true, Some(owner)) = (has_action, key.owner) {
            self.add_relation(
                Self::animation_key(id),
                ComponentKey::new(owner, NodeType::Geometry),
                "Animation",
            );
        }
    }

    pub(super) fn build_camera(&mut self, ctx: BuildContext<'a>, id: EntityId, camera: &'a Camera) {
        self.build_animdata(ctx, id);
        if self.needs_animdata_node(id) {
            self.add_relation(
                Self::animation_key(id),
                Self::parameters_key(id),
                "Camera Parameters",
            );
        }
        if let Some(dof) = camera.dof_object {
            self.build_id(ctx, dof);
            self.add_relation(
                ComponentKey::new(dof, NodeType::Transform),
                Self::parameters_key(id),
                "Camera DOF",
            );
        }
    }

    pub(super) fn build_lamp(&mut self, ctx: BuildContext<'a>, id: EntityId, lamp: &'a Lamp) {
        let parameters = Self::parameters_key(id);
        self.build_animdata(ctx, id);
        if self.needs_animdata_node(id) {
            self.add_relation(Self::animation_key(id), &parameters, "Lamp Parameters");
        }
        if let Some(ntree) = lamp.node_tree {
            self.build_id(ctx, ntree);
            self.add_relation(
                Self::parameters_key(ntree),
                &parameters,
                "NTree->Lamp Parameters",
            );
        }
        self.build_texture_stack(ctx, &lamp.textures, &parameters);
    }

    pub(super) fn build_group(&mut self, ctx: BuildContext<'a>, group: &'a Group) {
        for &object in &group.objects {
            self.build_id(ctx, object);
        }
    }

    /// Keys of an object's transform result and, for objects evaluating
    /// geometry, its geometry result.
    pub(super) fn object_result_keys(&self, id: EntityId, with_geometry: bool) -> Vec<Key> {
        let mut keys = vec![ComponentKey::new(id, NodeType::Transform).into()];
        let has_geometry = self
            .main
            .object(id)
            .is_some_and(|ob| ob.object_type.has_geometry());
        if with_geometry && has_geometry {
            keys.push(ComponentKey::new(id, NodeType::Geometry).into());
        }
        keys
    }
}
