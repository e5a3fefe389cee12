use glam::{Vec2, Vec3};
use std::f32::consts::PI;

use crate::math::BoundingBox;

/// Range of indices drawn with one material slot
#[derive(Clone, Debug, PartialEq)]
pub struct GeometryGroup {
    pub start: usize,
    pub count: usize,
    pub material_index: usize,
}

/// Vertex buffers for one mesh, shared between clones
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub uvs: Option<Vec<Vec2>>,
    pub indices: Option<Vec<u32>>,
    pub groups: Vec<GeometryGroup>,
}

impl Geometry {
    pub fn new(positions: Vec<Vec3>, indices: Option<Vec<u32>>) -> Self {
        Self {
            positions,
            indices,
            ..Default::default()
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of indices drawn (explicit or implicit)
    pub fn index_count(&self) -> usize {
        self.indices
            .as_ref()
            .map_or(self.positions.len(), |indices| indices.len())
    }

    pub fn index(&self, i: usize) -> usize {
        match &self.indices {
            Some(indices) => indices[i] as usize,
            None => i,
        }
    }

    /// Local-space extent of the vertex positions
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.positions.iter().copied())
    }

    /// Draw ranges, falling back to a single range on slot 0
    pub fn draw_groups(&self) -> Vec<GeometryGroup> {
        if self.groups.is_empty() {
            vec![GeometryGroup {
                start: 0,
                count: self.index_count(),
                material_index: 0,
            }]
        } else {
            self.groups.clone()
        }
    }

    /// Axis-aligned box centered on the origin with per-face normals
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let h = Vec3::new(width, height, depth) * 0.5;
        // (normal, u axis, v axis) per face, wound counter-clockwise seen from outside
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut uvs = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, u, v) in faces {
            let base = positions.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                positions.push((normal + u * su + v * sv) * h);
                normals.push(normal);
                uvs.push(Vec2::new((su + 1.0) * 0.5, (sv + 1.0) * 0.5));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new(positions, Some(indices))
            .with_normals(normals)
            .with_uvs(uvs)
    }

    /// Latitude/longitude sphere
    pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);

        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut uvs = Vec::new();

        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;
            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;
                let normal = Vec3::new(
                    -(u * 2.0 * PI).cos() * (v * PI).sin(),
                    (v * PI).cos(),
                    (u * 2.0 * PI).sin() * (v * PI).sin(),
                );
                positions.push(normal * radius);
                normals.push(normal);
                uvs.push(Vec2::new(u, 1.0 - v));
            }
        }

        let row = width_segments + 1;
        let mut indices = Vec::new();
        for iy in 0..height_segments {
            for ix in 0..width_segments {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self::new(positions, Some(indices))
            .with_normals(normals)
            .with_uvs(uvs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_counts() {
        let cube = Geometry::cuboid(2.0, 2.0, 2.0);
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.index_count(), 36);
    }

    #[test]
    fn test_cuboid_bounds() {
        let bbox = Geometry::cuboid(2.0, 4.0, 6.0).bounding_box();
        assert_eq!(bbox.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(bbox.max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_cuboid_winding_faces_outward() {
        let cube = Geometry::cuboid(2.0, 2.0, 2.0);
        let indices = cube.indices.as_ref().unwrap();
        let normals = cube.normals.as_ref().unwrap();
        for tri in indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| cube.positions[i as usize]);
            let face_normal = (b - a).cross(c - a).normalize();
            assert!(face_normal.dot(normals[tri[0] as usize]) > 0.99);
        }
    }

    #[test]
    fn test_uv_sphere_radius() {
        let sphere = Geometry::uv_sphere(1.0, 16, 16);
        for p in &sphere.positions {
            assert!((p.length() - 1.0).abs() < 1e-4);
        }
        assert_eq!(sphere.index_count() % 3, 0);
    }

    #[test]
    fn test_draw_groups_default_single_range() {
        let geometry = Geometry::new(vec![Vec3::ZERO; 6], None);
        let groups = geometry.draw_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count, 6);
        assert_eq!(groups[0].material_index, 0);
    }

    #[test]
    fn test_empty_geometry_bounds_are_empty() {
        assert!(Geometry::default().bounding_box().is_empty());
    }
}
