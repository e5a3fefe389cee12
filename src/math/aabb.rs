use glam::{Mat4, Vec3};

/// Axis-aligned bounding box in world space
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Box used whenever a computed extent is unusable
    pub const UNIT: BoundingBox = BoundingBox {
        min: Vec3::splat(-1.0),
        max: Vec3::splat(1.0),
    };

    /// Inverted box that grows to fit the first point added to it
    pub const EMPTY: BoundingBox = BoundingBox {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        points
            .into_iter()
            .fold(Self::EMPTY, |bbox, p| bbox.expand_by_point(p))
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn expand_by_point(&self, point: Vec3) -> BoundingBox {
        BoundingBox {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn max_dimension(&self) -> f32 {
        self.size().max_element()
    }

    /// True when no point has been added (any min component exceeds max)
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Empty, non-finite or collapsed to a single point
    pub fn is_degenerate(&self) -> bool {
        self.is_empty() || !self.is_finite() || self.max_dimension() <= 0.0
    }

    /// Box enclosing the eight transformed corners
    pub fn transformed(&self, matrix: &Mat4) -> BoundingBox {
        if self.is_empty() {
            return *self;
        }
        let corners = (0..8).map(|i| {
            Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        });
        Self::from_points(corners.map(|c| matrix.transform_point3(c)))
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_new() {
        let min = Vec3::new(0.0, 0.0, 0.0);
        let max = Vec3::new(1.0, 1.0, 1.0);
        let bbox = BoundingBox::new(min, max);
        assert_eq!(bbox.min, min);
        assert_eq!(bbox.max, max);
    }

    #[test]
    fn test_bounding_box_center() {
        let bbox = BoundingBox::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(bbox.center(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_bounding_box_center_negative() {
        let bbox = BoundingBox::new(Vec3::new(-2.0, -4.0, -6.0), Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(bbox.center(), Vec3::ZERO);
    }

    #[test]
    fn test_bounding_box_size_and_max_dimension() {
        let bbox = BoundingBox::new(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(1.0, 5.0, 3.0));
        assert_eq!(bbox.size(), Vec3::new(2.0, 5.0, 1.0));
        assert_eq!(bbox.max_dimension(), 5.0);
    }

    #[test]
    fn test_empty_box_is_degenerate() {
        assert!(BoundingBox::EMPTY.is_empty());
        assert!(BoundingBox::EMPTY.is_degenerate());
        assert!(!BoundingBox::UNIT.is_degenerate());
    }

    #[test]
    fn test_single_point_is_degenerate() {
        let bbox = BoundingBox::from_points([Vec3::new(3.0, 3.0, 3.0)]);
        assert!(!bbox.is_empty());
        assert!(bbox.is_degenerate());
    }

    #[test]
    fn test_flat_box_is_not_degenerate() {
        let bbox = BoundingBox::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.0, 1.0));
        assert!(!bbox.is_degenerate());
    }

    #[test]
    fn test_non_finite_box_is_degenerate() {
        let bbox = BoundingBox::new(Vec3::new(f32::NAN, 0.0, 0.0), Vec3::ONE);
        assert!(bbox.is_degenerate());
    }

    #[test]
    fn test_bounding_box_union_non_overlapping() {
        let a = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let b = BoundingBox::new(Vec3::splat(2.0), Vec3::splat(3.0));
        let union = a.union(&b);
        assert_eq!(union.min, Vec3::ZERO);
        assert_eq!(union.max, Vec3::splat(3.0));
    }

    #[test]
    fn test_union_with_empty_is_identity() {
        let a = BoundingBox::new(Vec3::splat(-2.0), Vec3::splat(4.0));
        assert_eq!(BoundingBox::EMPTY.union(&a), a);
    }

    #[test]
    fn test_transformed_by_translation_and_scale() {
        let bbox = BoundingBox::UNIT;
        let matrix = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)) * Mat4::from_scale(Vec3::splat(2.0));
        let moved = bbox.transformed(&matrix);
        assert_eq!(moved.min, Vec3::new(8.0, -2.0, -2.0));
        assert_eq!(moved.max, Vec3::new(12.0, 2.0, 2.0));
    }
}
