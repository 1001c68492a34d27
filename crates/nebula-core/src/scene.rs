//! Retained scene node store
//!
//! Effects attach their meshes and sprites here at construction time and
//! mutate transforms, materials and visibility each frame. A renderer reads
//! the store back, either node by node or as packed [`SpriteInstance`]s.

use crate::material::Material;
use crate::types::Transform;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Stable index of a node inside its [`Scene`]. Handles are never reused.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct NodeHandle(pub u32);

impl NodeHandle {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// What a node draws
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeKind {
    /// Transform-only anchor
    Group,
    /// Box or plane with the given local extents
    Mesh { extents: Vec3 },
    /// Camera-facing quad, sized by the transform scale
    Sprite,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub visible: bool,
    pub material: Material,
    pub render_order: i32,
    pub parent: Option<NodeHandle>,
}

impl Node {
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn mesh(name: impl Into<String>, extents: Vec3, material: Material) -> Self {
        Self {
            material,
            ..Self::new(name, NodeKind::Mesh { extents })
        }
    }

    pub fn sprite(name: impl Into<String>, material: Material) -> Self {
        Self {
            material,
            ..Self::new(name, NodeKind::Sprite)
        }
    }

    fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            transform: Transform::IDENTITY,
            visible: true,
            material: Material::default(),
            render_order: 0,
            parent: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_parent(mut self, parent: NodeHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_render_order(mut self, order: i32) -> Self {
        self.render_order = order;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// GPU instance data for one visible node.
/// 48 bytes (3 rows of vec4).
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SpriteInstance {
    pub pos_size: [f32; 4],    // xyz = world position, w = uniform scale
    pub color: [f32; 4],       // rgb, a = material opacity
    pub orientation: [f32; 4], // world rotation quaternion xyzw
}

/// Flat arena of nodes. Parents must be added before their children.
#[derive(Default)]
pub struct Scene {
    nodes: Vec<Node>,
}

impl Scene {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn add(&mut self, node: Node) -> NodeHandle {
        debug_assert!(
            node.parent.map_or(true, |p| p.index() < self.nodes.len()),
            "parent must exist before child"
        );
        let handle = NodeHandle(self.nodes.len() as u32);
        self.nodes.push(node);
        handle
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle.index())
    }

    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle.index())
    }

    /// Set visibility if the node exists
    pub fn set_visible(&mut self, handle: NodeHandle, visible: bool) {
        if let Some(node) = self.node_mut(handle) {
            node.visible = visible;
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeHandle, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeHandle(i as u32), n))
    }

    /// Whether the node and every ancestor is visible
    pub fn is_effectively_visible(&self, handle: NodeHandle) -> bool {
        let mut current = Some(handle);
        while let Some(h) = current {
            match self.node(h) {
                Some(node) if node.visible => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    /// Number of nodes that would be drawn (excludes groups)
    pub fn visible_count(&self) -> usize {
        self.iter()
            .filter(|(h, n)| n.kind != NodeKind::Group && self.is_effectively_visible(*h))
            .count()
    }

    /// Product of the parent chain's local matrices
    pub fn world_matrix(&self, handle: NodeHandle) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(handle);
        while let Some(h) = current {
            let Some(node) = self.node(h) else {
                break;
            };
            matrix = node.transform.to_matrix() * matrix;
            current = node.parent;
        }
        matrix
    }

    /// Pack every drawable, effectively visible node into `out`.
    /// The buffer is cleared first so it can be reused across frames.
    pub fn pack_instances(&self, out: &mut Vec<SpriteInstance>) {
        out.clear();
        for (handle, node) in self.iter() {
            if node.kind == NodeKind::Group || !self.is_effectively_visible(handle) {
                continue;
            }
            let (scale, rotation, position) = self.world_matrix(handle).to_scale_rotation_translation();
            let c = node.material.color;
            out.push(SpriteInstance {
                pos_size: [position.x, position.y, position.z, scale.max_element()],
                color: [c.r, c.g, c.b, node.material.opacity],
                orientation: rotation.to_array(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Color;

    #[test]
    fn add_and_lookup() {
        let mut scene = Scene::new();
        let a = scene.add(Node::group("root"));
        let b = scene.add(Node::sprite("dot", Material::solid(Color::WHITE)).with_parent(a));
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.node(b).unwrap().parent, Some(a));
        assert!(scene.node(NodeHandle(7)).is_none());
    }

    #[test]
    fn hidden_parent_hides_children() {
        let mut scene = Scene::new();
        let root = scene.add(Node::group("root"));
        let child = scene.add(Node::sprite("dot", Material::default()).with_parent(root));
        assert_eq!(scene.visible_count(), 1);
        scene.set_visible(root, false);
        assert!(!scene.is_effectively_visible(child));
        assert_eq!(scene.visible_count(), 0);
    }

    #[test]
    fn world_matrix_composes_parent_offset() {
        let mut scene = Scene::new();
        let root = scene.add(
            Node::group("root").with_transform(Transform::from_position(Vec3::new(1.0, 2.0, 0.0))),
        );
        let child = scene.add(
            Node::sprite("dot", Material::default())
                .with_parent(root)
                .with_transform(Transform::from_position(Vec3::new(0.5, 0.0, -1.0))),
        );
        let p = scene.world_matrix(child).transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(1.5, 2.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn pack_skips_groups_and_hidden() {
        let mut scene = Scene::new();
        scene.add(Node::group("root"));
        scene.add(Node::sprite("a", Material::default()));
        scene.add(Node::sprite("b", Material::default()).hidden());
        let mut out = Vec::new();
        scene.pack_instances(&mut out);
        assert_eq!(out.len(), 1);
        assert!((out[0].color[3] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn sprite_instance_layout() {
        assert_eq!(std::mem::size_of::<SpriteInstance>(), 48);
        assert_eq!(std::mem::align_of::<SpriteInstance>(), 4);
    }
}
