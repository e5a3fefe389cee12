//! World-space extent of a model.

use glam::Mat4;
use log::warn;

use crate::math::BoundingBox;
use crate::scene::SceneObject;

/// Union of mesh vertices in world space, without degenerate substitution.
///
/// Real meshes are used when any contribute; otherwise every mesh in the tree
/// (placeholders and outline duplicates included) is considered. Returns
/// `None` when the result is empty, non-finite or a single point.
pub fn try_compute_bounds(object: &SceneObject) -> Option<BoundingBox> {
    let real = accumulate(object, true);
    let bbox = if real.is_empty() {
        accumulate(object, false)
    } else {
        real
    };

    if bbox.is_degenerate() {
        None
    } else {
        Some(bbox)
    }
}

/// World-space bounds of `object`, never degenerate.
///
/// Falls back to [`BoundingBox::UNIT`] when nothing usable is found.
pub fn compute_bounds(object: &SceneObject) -> BoundingBox {
    try_compute_bounds(object).unwrap_or_else(|| {
        warn!(
            "Model '{}' has an empty or invalid bounding box, using unit box",
            object.name
        );
        BoundingBox::UNIT
    })
}

fn accumulate(object: &SceneObject, real_only: bool) -> BoundingBox {
    let mut bbox = BoundingBox::EMPTY;
    object.traverse(&Mat4::IDENTITY, &mut |node, world| {
        let Some(mesh) = node.mesh.as_ref() else {
            return;
        };
        if real_only && !node.is_real_mesh() {
            return;
        }
        for &p in &mesh.geometry.positions {
            bbox = bbox.expand_by_point(world.transform_point3(p));
        }
    });
    bbox
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Rgb;
    use crate::scene::{Geometry, Material, Mesh, Node, NodeRole, Transform};
    use glam::Vec3;

    fn mesh_node(geometry: Geometry) -> Node {
        Node::mesh("mesh", Mesh::new(geometry, Material::standard(Rgb::WHITE)))
    }

    #[test]
    fn test_bounds_include_node_transform() {
        let object = Node::group("root").with_child(
            mesh_node(Geometry::cuboid(2.0, 2.0, 2.0))
                .with_transform(Transform::from_position(Vec3::new(10.0, 0.0, 0.0))),
        );
        let bbox = compute_bounds(&object);
        assert_eq!(bbox.min, Vec3::new(9.0, -1.0, -1.0));
        assert_eq!(bbox.max, Vec3::new(11.0, 1.0, 1.0));
    }

    #[test]
    fn test_placeholder_ignored_when_real_mesh_exists() {
        let object = Node::group("root")
            .with_child(mesh_node(Geometry::cuboid(2.0, 2.0, 2.0)))
            .with_child(
                mesh_node(Geometry::cuboid(50.0, 50.0, 50.0)).with_role(NodeRole::Placeholder),
            );
        assert_eq!(compute_bounds(&object).max, Vec3::ONE);
    }

    #[test]
    fn test_placeholder_used_as_fallback() {
        let object = Node::group("root")
            .with_child(mesh_node(Geometry::default()))
            .with_child(mesh_node(Geometry::uv_sphere(3.0, 8, 8)).with_role(NodeRole::Placeholder));
        let bbox = compute_bounds(&object);
        assert!((bbox.max.y - 3.0).abs() < 1e-4);
        assert!((bbox.min.y + 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_no_meshes_gives_unit_box() {
        assert_eq!(compute_bounds(&Node::group("empty")), BoundingBox::UNIT);
        assert!(try_compute_bounds(&Node::group("empty")).is_none());
    }

    #[test]
    fn test_single_point_gives_unit_box() {
        let object = mesh_node(Geometry::new(vec![Vec3::new(4.0, 4.0, 4.0); 3], None));
        assert_eq!(compute_bounds(&object), BoundingBox::UNIT);
    }

    #[test]
    fn test_non_finite_vertex_gives_unit_box() {
        let object = mesh_node(Geometry::new(
            vec![Vec3::ZERO, Vec3::new(f32::INFINITY, 1.0, 1.0), Vec3::ONE],
            None,
        ));
        assert_eq!(compute_bounds(&object), BoundingBox::UNIT);
    }
}
