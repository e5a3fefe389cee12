mod aabb;
mod color;

pub use aabb::BoundingBox;
pub use color::Rgb;
