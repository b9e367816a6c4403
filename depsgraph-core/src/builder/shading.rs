//! Shading data: worlds, materials, textures and node trees.

use super::{BuildContext, RelationBuilder};
use crate::graph::{ComponentKey, Key, NodeType, OpCode, OperationKey};
use crate::scene::{EntityId, IdKind, Material, NodeTree, Texture, World};

impl<'a> RelationBuilder<'a> {
    pub(super) fn build_world(&mut self, ctx: BuildContext<'a>, id: EntityId, world: &'a World) {
        let update = OperationKey::new(id, NodeType::Shading, OpCode::WorldUpdate);
        self.build_animdata(ctx, id);
        if self.needs_animdata_node(id) {
            self.add_relation(Self::animation_key(id), Self::parameters_key(id), "World Parameters");
        }
        self.build_texture_stack(ctx, &world.textures, &update);
        if let Some(ntree) = world.node_tree {
            self.build_id(ctx, ntree);
            self.add_relation(
                ComponentKey::new(ntree, NodeType::Parameters),
                ComponentKey::new(id, NodeType::Shading),
                "NTree->World Shading Update",
            );
        }
    }

    pub(super) fn build_material(
        &mut self,
        ctx: BuildContext<'a>,
        id: EntityId,
        material: &'a Material,
    ) {
        let update = OperationKey::new(id, NodeType::Shading, OpCode::MaterialUpdate);
        self.build_animdata(ctx, id);
        if self.needs_animdata_node(id) {
            self.add_relation(Self::animation_key(id), &update, "Material Animation");
        }
        self.build_texture_stack(ctx, &material.textures, &update);
        if let Some(ntree) = material.node_tree {
            self.build_id(ctx, ntree);
            self.add_relation(Self::parameters_key(ntree), &update, "Material's NTree");
        }
    }

    pub(super) fn build_texture(&mut self, ctx: BuildContext<'a>, id: EntityId, texture: &'a Texture) {
        self.build_animdata(ctx, id);
        if self.needs_animdata_node(id) {
            self.add_relation(
                Self::animation_key(id),
                Self::parameters_key(id),
                "Texture Parameters",
            );
        }
        if let Some(ntree) = texture.node_tree {
            self.build_id(ctx, ntree);
            self.add_relation(
                Self::parameters_key(ntree),
                Self::parameters_key(id),
                "Texture's NTree",
            );
        }
    }

    /// Make `target` depend on every texture of a texture stack.
    pub(super) fn build_texture_stack(
        &mut self,
        ctx: BuildContext<'a>,
        textures: &'a [EntityId],
        target: &OperationKey,
    ) {
        for &texture in textures {
            self.build_id(ctx, texture);
            self.add_relation(
                ComponentKey::new(texture, NodeType::Parameters),
                target,
                "Texture Stack",
            );
        }
    }

    pub(super) fn build_nodetree(&mut self, ctx: BuildContext<'a>, id: EntityId, ntree: &'a NodeTree) {
        let main = self.main;
        let parameters = Self::parameters_key(id);
        self.build_animdata(ctx, id);

        for node in &ntree.nodes {
            let Some(node_id) = node.id else {
                continue;
            };
            let Some(kind) = main.get(node_id).map(|datablock| datablock.kind()) else {
                continue;
            };
            let (from, description): (Key, _) = match kind {
                IdKind::Material => {
                    self.build_id(ctx, node_id);
                    continue;
                }
                // Scene nodes read render results, which are not part of
                // the graph.
                IdKind::Scene => continue,
                IdKind::Texture => (Self::parameters_key(node_id).into(), "Texture -> Node"),
                IdKind::NodeTree => (Self::parameters_key(node_id).into(), "Group Node"),
                IdKind::Object => (
                    ComponentKey::new(node_id, NodeType::Transform).into(),
                    "Object -> Node",
                ),
                IdKind::Mask => (
                    ComponentKey::new(node_id, NodeType::Parameters).into(),
                    "Mask -> Node",
                ),
                IdKind::MovieClip => (
                    ComponentKey::new(node_id, NodeType::Parameters).into(),
                    "Clip -> Node",
                ),
                _ => continue,
            };
            self.build_id(ctx, node_id);
            self.add_relation(from, &parameters, description);
        }

        if self.needs_animdata_node(id) {
            self.add_relation(
                Self::animation_key(id),
                &parameters,
                "NTree Shading Parameters",
            );
        }
    }
}
