use glam::{Quat, Vec3};
use spritegen::math::BoundingBox;
use spritegen::scene::{Geometry, Material, Mesh, Node, NodeRole, Transform};
use spritegen::{compute_bounds, try_compute_bounds};

#[cfg(test)]
mod bounds_tests {
    use super::*;

    fn mesh(name: &str, geometry: Geometry) -> Node {
        Node::mesh(name, Mesh::new(geometry, Material::default()))
    }

    #[test]
    fn test_bounds_are_finite_and_ordered() {
        let model = Node::group("model")
            .with_transform(Transform {
                rotation: Quat::from_rotation_y(0.7),
                scale: Vec3::splat(2.5),
                ..Transform::IDENTITY
            })
            .with_child(mesh("a", Geometry::cuboid(1.0, 2.0, 3.0)))
            .with_child(
                mesh("b", Geometry::uv_sphere(0.5, 12, 8))
                    .with_transform(Transform::from_position(Vec3::new(4.0, -1.0, 0.0))),
            );

        let bounds = compute_bounds(&model);
        assert!(bounds.is_finite());
        assert!(bounds.min.cmple(bounds.max).all());
        assert!(bounds.max_dimension() > 5.0);
    }

    #[test]
    fn test_bounds_follow_nested_transforms() {
        let model = Node::group("outer")
            .with_transform(Transform::from_position(Vec3::new(10.0, 0.0, 0.0)))
            .with_child(
                Node::group("inner")
                    .with_transform(Transform {
                        scale: Vec3::splat(2.0),
                        ..Transform::IDENTITY
                    })
                    .with_child(mesh("cube", Geometry::cuboid(1.0, 1.0, 1.0))),
            );
        let bounds = compute_bounds(&model);
        assert_eq!(bounds.min, Vec3::new(9.0, -1.0, -1.0));
        assert_eq!(bounds.max, Vec3::new(11.0, 1.0, 1.0));
    }

    #[test]
    fn test_empty_model_gets_unit_box() {
        let model = Node::group("empty").with_child(mesh("nothing", Geometry::default()));
        assert_eq!(try_compute_bounds(&model), None);
        assert_eq!(compute_bounds(&model), BoundingBox::UNIT);
    }

    #[test]
    fn test_single_point_gets_unit_box() {
        let model = mesh("point", Geometry::new(vec![Vec3::new(3.0, 3.0, 3.0)], None));
        assert_eq!(compute_bounds(&model), BoundingBox::UNIT);
    }

    #[test]
    fn test_non_finite_vertices_get_unit_box() {
        let model = mesh(
            "broken",
            Geometry::new(vec![Vec3::ZERO, Vec3::new(f32::NAN, 1.0, f32::INFINITY)], None),
        );
        assert_eq!(compute_bounds(&model), BoundingBox::UNIT);
    }

    #[test]
    fn test_outline_duplicates_ignored_when_real_meshes_exist() {
        let model = Node::group("model")
            .with_child(mesh("real", Geometry::cuboid(1.0, 1.0, 1.0)))
            .with_child(mesh("outline", Geometry::cuboid(10.0, 10.0, 10.0)).with_role(NodeRole::Outline));
        assert_eq!(compute_bounds(&model).max, Vec3::splat(0.5));
    }

    #[test]
    fn test_placeholder_used_without_real_meshes() {
        let model = Node::group("model").with_child(
            mesh("placeholder", Geometry::cuboid(4.0, 4.0, 4.0)).with_role(NodeRole::Placeholder),
        );
        assert_eq!(compute_bounds(&model).max, Vec3::splat(2.0));
    }
}
