//! Scene graph for models being captured.
//!
//! A [`SceneObject`] is an owned tree of [`Node`]s. Geometry is shared behind
//! `Arc` because it is never mutated after import; materials live in
//! per-mesh [`MaterialSlot`]s so style passes can swap them without editing
//! the imported data.

mod geometry;
mod material;
pub mod normalize;

use glam::{Mat4, Quat, Vec3};
use std::sync::Arc;

pub use geometry::{Geometry, GeometryGroup};
pub use material::{GradientMap, Material, MaterialSlot, Shading, Side, Texture};

/// Local transform applied as translation * rotation * scale
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Bitwise equality, so `-0.0` and `NaN` payloads count as changes
    pub fn bits_eq(&self, other: &Transform) -> bool {
        let bits = |t: &Transform| -> [u32; 10] {
            [
                t.position.x.to_bits(),
                t.position.y.to_bits(),
                t.position.z.to_bits(),
                t.rotation.x.to_bits(),
                t.rotation.y.to_bits(),
                t.rotation.z.to_bits(),
                t.rotation.w.to_bits(),
                t.scale.x.to_bits(),
                t.scale.y.to_bits(),
                t.scale.z.to_bits(),
            ]
        };
        bits(self) == bits(other)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// What a node is for
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum NodeRole {
    /// Imported model content
    #[default]
    Model,
    /// Back-face duplicate added by the outline pass
    Outline,
    /// Stand-in added when a model has no usable geometry
    Placeholder,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub geometry: Arc<Geometry>,
    pub materials: Vec<MaterialSlot>,
}

impl Mesh {
    pub fn new(geometry: Geometry, material: Material) -> Self {
        Self {
            geometry: Arc::new(geometry),
            materials: vec![MaterialSlot::new(material)],
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.geometry.vertex_count()
    }

    /// Active material for a geometry group, clamped to the last slot
    pub fn material_for(&self, material_index: usize) -> Option<&Material> {
        self.materials
            .get(material_index)
            .or_else(|| self.materials.last())
            .map(MaterialSlot::active)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub role: NodeRole,
    pub visible: bool,
    pub mesh: Option<Mesh>,
    pub children: Vec<Node>,
}

/// Root of a model's node tree
pub type SceneObject = Node;

impl Default for Node {
    fn default() -> Self {
        Self {
            name: String::new(),
            transform: Transform::IDENTITY,
            role: NodeRole::Model,
            visible: true,
            mesh: None,
            children: Vec::new(),
        }
    }
}

impl Node {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn mesh(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            mesh: Some(mesh),
            ..Self::group(name)
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_role(mut self, role: NodeRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Mesh node imported with at least one vertex
    pub fn is_real_mesh(&self) -> bool {
        self.role == NodeRole::Model
            && self.mesh.as_ref().is_some_and(|mesh| mesh.vertex_count() > 0)
    }

    /// Depth-first visit with the accumulated world matrix of each node
    pub fn traverse<'a, F: FnMut(&'a Node, &Mat4)>(&'a self, parent: &Mat4, f: &mut F) {
        let world = *parent * self.transform.matrix();
        f(self, &world);
        for child in &self.children {
            child.traverse(&world, f);
        }
    }

    /// Depth-first visit of every node, mutable
    pub fn traverse_mut<F: FnMut(&mut Node)>(&mut self, f: &mut F) {
        f(self);
        for child in &mut self.children {
            child.traverse_mut(f);
        }
    }

    /// Every mesh node in the tree, world matrices included
    pub fn meshes(&self) -> Vec<(&Node, Mat4)> {
        let mut found = Vec::new();
        self.traverse(&Mat4::IDENTITY, &mut |node, world| {
            if node.mesh.is_some() {
                found.push((node, *world));
            }
        });
        found
    }

    pub fn count_where(&self, mut predicate: impl FnMut(&Node) -> bool) -> usize {
        let mut count = 0;
        self.traverse(&Mat4::IDENTITY, &mut |node, _| {
            if predicate(node) {
                count += 1;
            }
        });
        count
    }

    /// Independent copy of the whole subtree.
    ///
    /// Transforms, roles and material slots are copied by value. Geometry
    /// buffers stay shared since nothing mutates them after import.
    pub fn structural_clone(&self) -> Node {
        Node {
            name: self.name.clone(),
            transform: self.transform,
            role: self.role,
            visible: self.visible,
            mesh: self.mesh.as_ref().map(|mesh| Mesh {
                geometry: Arc::clone(&mesh.geometry),
                materials: mesh.materials.clone(),
            }),
            children: self.children.iter().map(Node::structural_clone).collect(),
        }
    }
}

/// Unit cube model, used when no model file is given
pub fn cube_model() -> SceneObject {
    Node::group("cube").with_child(Node::mesh(
        "cube_mesh",
        Mesh::new(
            Geometry::cuboid(1.0, 1.0, 1.0),
            Material::standard(crate::math::Rgb::new(0.8, 0.8, 0.8)),
        ),
    ))
}
