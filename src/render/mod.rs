//! Offscreen rendering of capture scenes.
//!
//! The capture sequencer only talks to the [`Rasterizer`] trait. A scene is
//! flattened into world-space [`DrawItem`]s once per run so rasterizers never
//! walk the node tree themselves.

mod camera;
pub mod gpu;
mod gpu_context;
pub mod software;

use futures::future::LocalBoxFuture;
use glam::{Mat3, Mat4, Vec2, Vec3};

pub use camera::{orbit_position, PerspectiveCamera};
pub use gpu::GpuRasterizer;
pub use gpu_context::GpuContext;
pub use software::SoftwareRasterizer;

use crate::error::RenderError;
use crate::math::Rgb;
use crate::scene::{Material, Node, SceneObject, Shading};

/// Scene light
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Light {
    Ambient { color: Rgb, intensity: f32 },
    /// Light shining from `position` towards the origin
    Directional { color: Rgb, intensity: f32, position: Vec3 },
}

impl Light {
    /// Unit vector pointing from a surface towards the light
    pub fn direction(&self) -> Option<Vec3> {
        match self {
            Light::Ambient { .. } => None,
            Light::Directional { position, .. } => Some(position.normalize_or_zero()),
        }
    }
}

/// Lights placed in every capture scene.
///
/// Every light is pure white (`0xffffff`, not the cyan `0xffff`) so frames
/// keep the model's own colors.
pub fn lighting_rig(bright: bool) -> Vec<Light> {
    let ambient = |intensity| Light::Ambient {
        color: Rgb::WHITE,
        intensity,
    };
    let directional = |intensity, position| Light::Directional {
        color: Rgb::WHITE,
        intensity,
        position,
    };

    if bright {
        vec![
            ambient(1.5),
            directional(1.5, Vec3::new(1.0, 1.0, 1.0)),
            directional(1.2, Vec3::new(-1.0, 0.5, -1.0)),
            directional(1.0, Vec3::new(0.0, -1.0, 0.0)),
        ]
    } else {
        vec![
            ambient(1.0),
            directional(1.0, Vec3::new(1.0, 1.0, 1.0)),
            directional(0.8, Vec3::new(-1.0, 0.5, -1.0)),
        ]
    }
}

/// Light arriving at a surface with normal `normal`, before albedo
pub fn irradiance(shading: &Shading, normal: Vec3, lights: &[Light]) -> Rgb {
    if *shading == Shading::Basic {
        return Rgb::WHITE;
    }

    lights.iter().fold(Rgb::BLACK, |acc, light| {
        let contribution = match (light, shading) {
            (Light::Ambient { color, intensity }, _) => color.scale(*intensity),
            (Light::Directional { color, intensity, .. }, Shading::Toon(gradient)) => {
                let ndotl = normal.dot(light.direction().unwrap_or(Vec3::Y));
                color.scale(intensity * gradient.lookup(ndotl * 0.5 + 0.5))
            }
            (Light::Directional { color, intensity, .. }, _) => {
                let ndotl = normal.dot(light.direction().unwrap_or(Vec3::Y)).max(0.0);
                color.scale(intensity * ndotl)
            }
        };
        Rgb::new(acc.r + contribution.r, acc.g + contribution.g, acc.b + contribution.b)
    })
}

/// One material's worth of world-space triangles
#[derive(Clone, Debug)]
pub struct DrawItem {
    pub positions: Vec<Vec3>,
    /// Unit normals, one per position
    pub normals: Vec<Vec3>,
    pub uvs: Option<Vec<Vec2>>,
    /// Triangle list into `positions`
    pub indices: Vec<u32>,
    pub material: Material,
}

impl DrawItem {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Everything a rasterizer needs for one frame besides the camera
#[derive(Clone, Debug, Default)]
pub struct RenderScene {
    pub lights: Vec<Light>,
    pub items: Vec<DrawItem>,
}

impl RenderScene {
    /// Flatten the visible meshes of `object` into world-space draw items
    pub fn build(object: &SceneObject, lights: Vec<Light>) -> Self {
        let mut items = Vec::new();
        collect(object, &Mat4::IDENTITY, &mut items);
        Self { lights, items }
    }

    pub fn triangle_count(&self) -> usize {
        self.items.iter().map(DrawItem::triangle_count).sum()
    }
}

fn collect(node: &Node, parent: &Mat4, items: &mut Vec<DrawItem>) {
    if !node.visible {
        return;
    }
    let world = *parent * node.transform.matrix();

    if let Some(mesh) = node.mesh.as_ref().filter(|mesh| mesh.vertex_count() > 0) {
        let geometry = &mesh.geometry;
        let normal_matrix = Mat3::from_mat4(world).inverse().transpose();
        let mirrored = world.determinant() < 0.0;

        for group in geometry.draw_groups() {
            let Some(material) = mesh.material_for(group.material_index) else {
                continue;
            };
            let end = (group.start + group.count).min(geometry.index_count());
            let mut triangles: Vec<[usize; 3]> = (group.start..end)
                .step_by(3)
                .filter(|&i| i + 2 < end)
                .map(|i| [geometry.index(i), geometry.index(i + 1), geometry.index(i + 2)])
                .filter(|tri| tri.iter().all(|&v| v < geometry.vertex_count()))
                .collect();
            if mirrored {
                triangles.iter_mut().for_each(|tri| tri.swap(1, 2));
            }
            if triangles.is_empty() {
                continue;
            }

            let item = match geometry.normals.as_ref() {
                Some(normals) if normals.len() == geometry.vertex_count() => DrawItem {
                    positions: geometry
                        .positions
                        .iter()
                        .map(|&p| world.transform_point3(p))
                        .collect(),
                    normals: normals
                        .iter()
                        .map(|&n| (normal_matrix * n).normalize_or_zero())
                        .collect(),
                    uvs: geometry.uvs.clone(),
                    indices: triangles.iter().flatten().map(|&i| i as u32).collect(),
                    material: material.clone(),
                },
                _ => flat_shaded(geometry, &world, &triangles, material),
            };
            items.push(item);
        }
    }

    for child in &node.children {
        collect(child, &world, items);
    }
}

/// Unindexed copy with one face normal per triangle, for geometry without normals
fn flat_shaded(
    geometry: &crate::scene::Geometry,
    world: &Mat4,
    triangles: &[[usize; 3]],
    material: &Material,
) -> DrawItem {
    let mut positions = Vec::with_capacity(triangles.len() * 3);
    let mut normals = Vec::with_capacity(triangles.len() * 3);
    let mut uvs = geometry.uvs.as_ref().map(|_| Vec::with_capacity(triangles.len() * 3));

    for tri in triangles {
        let [a, b, c] = tri.map(|i| world.transform_point3(geometry.positions[i]));
        let normal = (b - a).cross(c - a).normalize_or_zero();
        positions.extend_from_slice(&[a, b, c]);
        normals.extend_from_slice(&[normal; 3]);
        if let (Some(out), Some(source)) = (uvs.as_mut(), geometry.uvs.as_ref()) {
            out.extend(tri.iter().map(|&i| source.get(i).copied().unwrap_or(Vec2::ZERO)));
        }
    }

    DrawItem {
        indices: (0..positions.len() as u32).collect(),
        positions,
        normals,
        uvs,
        material: material.clone(),
    }
}

/// Raw RGBA8 pixels read back from a render surface
#[derive(Clone, Debug, PartialEq)]
pub struct RasterOutput {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Offscreen render surface driven by the capture sequencer.
///
/// `prepare` allocates a square transparent surface, `render` draws one frame
/// and resolves once its pixels have been read back, and `release` frees the
/// surface. A rasterizer is only ever asked for one frame at a time.
pub trait Rasterizer {
    fn prepare(&mut self, resolution: u32) -> Result<(), RenderError>;

    fn render<'a>(
        &'a mut self,
        scene: &'a RenderScene,
        camera: &'a PerspectiveCamera,
    ) -> LocalBoxFuture<'a, Result<RasterOutput, RenderError>>;

    fn release(&mut self);
}
