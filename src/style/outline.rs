use std::sync::Arc;

use crate::math::Rgb;
use crate::scene::{Material, MaterialSlot, Mesh, Node, NodeRole, SceneObject, Side, Transform};

/// Scale added to an outline duplicate per unit of thickness
pub const OUTLINE_SCALE_PER_THICKNESS: f32 = 0.05;

/// Add an inflated back-face duplicate next to every real mesh.
///
/// Existing outline duplicates are removed first, so applying the same
/// settings twice leaves the same tree as applying them once.
pub fn apply_outline(object: &mut SceneObject, thickness: f32, color: Rgb) {
    remove_outline(object);

    let factor = 1.0 + thickness * OUTLINE_SCALE_PER_THICKNESS;
    let material = Material::basic(color).with_side(Side::Back);

    add_outlines(object, factor, &material);

    // A mesh at the root has no parent to hold a sibling
    if object.is_real_mesh() {
        let scaled = Transform {
            scale: glam::Vec3::splat(factor),
            ..Transform::IDENTITY
        };
        if let Some(outline) = outline_for(object, scaled, &material) {
            object.add_child(outline);
        }
    }
}

/// Drop every outline duplicate in the tree
pub fn remove_outline(object: &mut SceneObject) {
    object.children.retain(|child| child.role != NodeRole::Outline);
    for child in &mut object.children {
        remove_outline(child);
    }
}

pub fn outline_count(object: &SceneObject) -> usize {
    object.count_where(|node| node.role == NodeRole::Outline)
}

fn add_outlines(node: &mut Node, factor: f32, material: &Material) {
    let mut children = Vec::with_capacity(node.children.len());
    for mut child in node.children.drain(..) {
        add_outlines(&mut child, factor, material);
        let outline = if child.is_real_mesh() {
            let transform = Transform {
                scale: child.transform.scale * factor,
                ..child.transform
            };
            outline_for(&child, transform, material)
        } else {
            None
        };
        children.push(child);
        children.extend(outline);
    }
    node.children = children;
}

fn outline_for(source: &Node, transform: Transform, material: &Material) -> Option<Node> {
    let mesh = source.mesh.as_ref()?;
    Some(
        Node::mesh(
            format!("{}_outline", source.name),
            Mesh {
                geometry: Arc::clone(&mesh.geometry),
                materials: vec![MaterialSlot::new(material.clone())],
            },
        )
        .with_transform(transform)
        .with_role(NodeRole::Outline),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Geometry, Shading};
    use glam::Vec3;

    fn model() -> SceneObject {
        let cube = || Mesh::new(Geometry::cuboid(1.0, 1.0, 1.0), Material::standard(Rgb::RED));
        Node::group("root")
            .with_child(Node::mesh("a", cube()))
            .with_child(
                Node::group("inner")
                    .with_child(Node::mesh("b", cube()))
                    .with_child(Node::mesh("empty", Mesh::new(Geometry::default(), Material::default()))),
            )
    }

    #[test]
    fn test_outline_added_per_real_mesh() {
        let mut object = model();
        apply_outline(&mut object, 2.0, Rgb::BLACK);
        assert_eq!(outline_count(&object), 2);
        assert_eq!(object.children.len(), 3);
        assert_eq!(object.children[1].role, NodeRole::Outline);
    }

    #[test]
    fn test_outline_scale_and_material() {
        let mut object = model();
        apply_outline(&mut object, 2.0, Rgb::BLACK);
        let outline = &object.children[1];
        assert!((outline.transform.scale.x - 1.1).abs() < 1e-6);
        let material = outline.mesh.as_ref().unwrap().materials[0].active();
        assert_eq!(material.side, Side::Back);
        assert_eq!(material.shading, Shading::Basic);
        assert_eq!(material.color, Rgb::BLACK);
    }

    #[test]
    fn test_outline_keeps_source_position() {
        let mut object = Node::group("root").with_child(
            Node::mesh("a", Mesh::new(Geometry::cuboid(1.0, 1.0, 1.0), Material::default()))
                .with_transform(Transform::from_position(Vec3::new(4.0, 0.0, 0.0))),
        );
        apply_outline(&mut object, 1.0, Rgb::BLACK);
        assert_eq!(object.children[1].transform.position, Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn test_outline_idempotent() {
        let mut once = model();
        apply_outline(&mut once, 1.5, Rgb::BLACK);
        let mut twice = once.clone();
        apply_outline(&mut twice, 1.5, Rgb::BLACK);
        assert_eq!(outline_count(&once), outline_count(&twice));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_remove_outline_restores_tree() {
        let original = model();
        let mut object = original.clone();
        apply_outline(&mut object, 1.0, Rgb::BLACK);
        remove_outline(&mut object);
        assert_eq!(object, original);
    }

    #[test]
    fn test_outline_on_root_mesh() {
        let mut object = Node::mesh(
            "solo",
            Mesh::new(Geometry::cuboid(1.0, 1.0, 1.0), Material::default()),
        );
        apply_outline(&mut object, 1.0, Rgb::BLACK);
        assert_eq!(outline_count(&object), 1);
        assert!((object.children[0].transform.scale.y - 1.05).abs() < 1e-6);
    }
}
