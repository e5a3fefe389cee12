use futures::future::{FutureExt, LocalBoxFuture};
use glam::{Vec2, Vec3, Vec4};
use log::debug;

use super::{irradiance, DrawItem, Light, PerspectiveCamera, RasterOutput, Rasterizer, RenderScene};
use crate::error::RenderError;
use crate::scene::{Material, Side};

/// Slack on barycentric weights so pixels on a shared edge are never dropped
const COVERAGE_EPSILON: f32 = 1e-5;

/// CPU z-buffer rasterizer.
///
/// Produces the same framing and lighting as the GPU path and needs no
/// graphics device, so it backs tests and headless machines.
#[derive(Debug, Default)]
pub struct SoftwareRasterizer {
    resolution: u32,
    color: Vec<[f32; 4]>,
    depth: Vec<f32>,
}

/// Vertex in clip space with the attributes interpolated across a triangle
#[derive(Copy, Clone, Debug)]
struct ClipVertex {
    clip: Vec4,
    normal: Vec3,
    uv: Vec2,
}

impl ClipVertex {
    fn lerp(self, other: ClipVertex, t: f32) -> ClipVertex {
        ClipVertex {
            clip: self.clip.lerp(other.clip, t),
            normal: self.normal.lerp(other.normal, t),
            uv: self.uv.lerp(other.uv, t),
        }
    }

    /// Signed distance to the near plane, z = 0 in clip space
    fn near_distance(&self) -> f32 {
        self.clip.z
    }
}

/// Vertex after projection, in pixel coordinates
#[derive(Copy, Clone, Debug)]
struct ScreenVertex {
    x: f32,
    y: f32,
    /// Depth in 0..1
    z: f32,
    inv_w: f32,
    normal: Vec3,
    uv: Vec2,
}

/// Cut a triangle against the near plane, leaving a polygon of 0, 3 or 4 vertices
fn clip_near(triangle: [ClipVertex; 3]) -> Vec<ClipVertex> {
    let mut out = Vec::with_capacity(4);
    for i in 0..3 {
        let current = triangle[i];
        let next = triangle[(i + 1) % 3];
        let (dc, dn) = (current.near_distance(), next.near_distance());
        if dc >= 0.0 {
            out.push(current);
        }
        if (dc >= 0.0) != (dn >= 0.0) {
            out.push(current.lerp(next, dc / (dc - dn)));
        }
    }
    out
}

/// Cut a segment against the near plane
fn clip_segment(from: ClipVertex, to: ClipVertex) -> Option<(ClipVertex, ClipVertex)> {
    let (df, dt) = (from.near_distance(), to.near_distance());
    match (df >= 0.0, dt >= 0.0) {
        (true, true) => Some((from, to)),
        (false, false) => None,
        (true, false) => Some((from, from.lerp(to, df / (df - dt)))),
        (false, true) => Some((from.lerp(to, df / (df - dt)), to)),
    }
}

impl SoftwareRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_prepared(&self) -> bool {
        self.resolution > 0
    }

    fn clear(&mut self) {
        self.color.iter_mut().for_each(|px| *px = [0.0; 4]);
        self.depth.iter_mut().for_each(|d| *d = 1.0);
    }

    fn project(&self, vertex: ClipVertex) -> ScreenVertex {
        let inv_w = 1.0 / vertex.clip.w.max(f32::EPSILON);
        let ndc = vertex.clip.truncate() * inv_w;
        let res = self.resolution as f32;
        ScreenVertex {
            x: (ndc.x * 0.5 + 0.5) * res,
            y: (0.5 - ndc.y * 0.5) * res,
            z: ndc.z,
            inv_w,
            normal: vertex.normal,
            uv: vertex.uv,
        }
    }

    fn draw_scene(&mut self, scene: &RenderScene, camera: &PerspectiveCamera) -> RasterOutput {
        self.clear();
        let view_proj = camera.view_projection();

        // Opaque geometry first so blended surfaces land on top of it
        let (transparent, opaque): (Vec<&DrawItem>, Vec<&DrawItem>) = scene
            .items
            .iter()
            .partition(|item| item.material.effective_opacity() < 1.0);

        let mut drawn = 0usize;
        for item in opaque.into_iter().chain(transparent) {
            let vertices: Vec<ClipVertex> = item
                .positions
                .iter()
                .enumerate()
                .map(|(i, p)| ClipVertex {
                    clip: view_proj * p.extend(1.0),
                    normal: item.normals.get(i).copied().unwrap_or(Vec3::Y),
                    uv: item
                        .uvs
                        .as_ref()
                        .and_then(|uvs| uvs.get(i).copied())
                        .unwrap_or(Vec2::ZERO),
                })
                .collect();

            for tri in item.indices.chunks_exact(3) {
                let (Some(&a), Some(&b), Some(&c)) = (
                    vertices.get(tri[0] as usize),
                    vertices.get(tri[1] as usize),
                    vertices.get(tri[2] as usize),
                ) else {
                    continue;
                };
                let triangle = [a, b, c];

                if item.material.wireframe {
                    self.draw_wire_triangle(&item.material, triangle, &scene.lights);
                } else {
                    let polygon: Vec<ScreenVertex> =
                        clip_near(triangle).into_iter().map(|v| self.project(v)).collect();
                    for k in 1..polygon.len().saturating_sub(1) {
                        self.fill_triangle(
                            &item.material,
                            [polygon[0], polygon[k], polygon[k + 1]],
                            &scene.lights,
                        );
                    }
                }
                drawn += 1;
            }
        }
        debug!("Software raster drew {} triangles", drawn);

        RasterOutput {
            width: self.resolution,
            height: self.resolution,
            pixels: self
                .color
                .iter()
                .flat_map(|px| px.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
                .collect(),
        }
    }

    fn fill_triangle(&mut self, material: &Material, verts: [ScreenVertex; 3], lights: &[Light]) {
        let [a, b, c] = verts;
        // Screen y points down, so counter-clockwise triangles have negative area here
        let area = edge(a, b, c.x, c.y);
        if area.abs() < f32::EPSILON {
            return;
        }
        let front = area < 0.0;
        let visible = match material.side {
            Side::Front => front,
            Side::Back => !front,
            Side::Double => true,
        };
        if !visible {
            return;
        }

        let res = self.resolution as i64;
        let min_x = (a.x.min(b.x).min(c.x).floor() as i64).max(0);
        let max_x = (a.x.max(b.x).max(c.x).ceil() as i64).min(res - 1);
        let min_y = (a.y.min(b.y).min(c.y).floor() as i64).max(0);
        let max_y = (a.y.max(b.y).max(c.y).ceil() as i64).min(res - 1);

        for py in min_y..=max_y {
            for px in min_x..=max_x {
                let (sx, sy) = (px as f32 + 0.5, py as f32 + 0.5);
                let w = [
                    edge(b, c, sx, sy) / area,
                    edge(c, a, sx, sy) / area,
                    edge(a, b, sx, sy) / area,
                ];
                if w.iter().any(|&wi| wi < -COVERAGE_EPSILON) {
                    continue;
                }
                let z = w[0] * a.z + w[1] * b.z + w[2] * c.z;
                let idx = (py * res + px) as usize;
                if !(0.0..=1.0).contains(&z) || z >= self.depth[idx] {
                    continue;
                }

                // Perspective-correct weights
                let pw = [w[0] * a.inv_w, w[1] * b.inv_w, w[2] * c.inv_w];
                let sum = pw[0] + pw[1] + pw[2];
                let pw = pw.map(|x| x / sum);

                let mut normal =
                    (a.normal * pw[0] + b.normal * pw[1] + c.normal * pw[2]).normalize_or_zero();
                if !front {
                    normal = -normal;
                }
                let uv = a.uv * pw[0] + b.uv * pw[1] + c.uv * pw[2];

                let rgba = shade_fragment(material, normal, uv, lights);
                self.blend(idx, rgba, z);
            }
        }
    }

    fn draw_wire_triangle(&mut self, material: &Material, verts: [ClipVertex; 3], lights: &[Light]) {
        let normal = (verts[0].normal + verts[1].normal + verts[2].normal).normalize_or_zero();
        let rgba = shade_fragment(material, normal, Vec2::ZERO, lights);
        for (from, to) in [(verts[0], verts[1]), (verts[1], verts[2]), (verts[2], verts[0])] {
            if let Some((from, to)) = clip_segment(from, to) {
                self.draw_line(self.project(from), self.project(to), rgba);
            }
        }
    }

    fn draw_line(&mut self, from: ScreenVertex, to: ScreenVertex, rgba: [f32; 4]) {
        let res = self.resolution as i64;
        let span = (to.x - from.x).abs().max((to.y - from.y).abs());
        // Clipped lines can still reach far outside the surface
        let steps = span.min((4 * self.resolution) as f32).ceil().max(1.0) as i64;
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            let x = (from.x + (to.x - from.x) * t).floor() as i64;
            let y = (from.y + (to.y - from.y) * t).floor() as i64;
            if x < 0 || y < 0 || x >= res || y >= res {
                continue;
            }
            let z = from.z + (to.z - from.z) * t;
            let idx = (y * res + x) as usize;
            if (0.0..=1.0).contains(&z) && z <= self.depth[idx] {
                self.blend(idx, rgba, z);
            }
        }
    }

    /// Source-over blend matching `wgpu::BlendState::ALPHA_BLENDING`
    fn blend(&mut self, idx: usize, src: [f32; 4], z: f32) {
        let alpha = src[3];
        if alpha <= 0.0 {
            return;
        }
        let dst = self.color[idx];
        self.color[idx] = [
            src[0] * alpha + dst[0] * (1.0 - alpha),
            src[1] * alpha + dst[1] * (1.0 - alpha),
            src[2] * alpha + dst[2] * (1.0 - alpha),
            alpha + dst[3] * (1.0 - alpha),
        ];
        self.depth[idx] = z;
    }
}

/// Signed doubled area of (a, b, p)
fn edge(a: ScreenVertex, b: ScreenVertex, px: f32, py: f32) -> f32 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

fn shade_fragment(material: &Material, normal: Vec3, uv: Vec2, lights: &[Light]) -> [f32; 4] {
    let mut albedo = material.color.to_array();
    let mut alpha = material.effective_opacity();
    if let Some(texture) = material.map.as_ref() {
        let texel = texture.sample(uv.x, uv.y);
        albedo = [albedo[0] * texel[0], albedo[1] * texel[1], albedo[2] * texel[2]];
        if material.transparent {
            alpha *= texel[3];
        }
    }
    let light = irradiance(&material.shading, normal, lights);
    [
        (albedo[0] * light.r).min(1.0),
        (albedo[1] * light.g).min(1.0),
        (albedo[2] * light.b).min(1.0),
        alpha,
    ]
}

impl Rasterizer for SoftwareRasterizer {
    fn prepare(&mut self, resolution: u32) -> Result<(), RenderError> {
        if resolution == 0 {
            return Err(RenderError::Render("surface resolution must be positive".into()));
        }
        let len = (resolution as usize) * (resolution as usize);
        self.resolution = resolution;
        self.color = vec![[0.0; 4]; len];
        self.depth = vec![1.0; len];
        debug!("Prepared {}x{} software surface", resolution, resolution);
        Ok(())
    }

    fn render<'a>(
        &'a mut self,
        scene: &'a RenderScene,
        camera: &'a PerspectiveCamera,
    ) -> LocalBoxFuture<'a, Result<RasterOutput, RenderError>> {
        async move {
            if !self.is_prepared() {
                return Err(RenderError::Render("render surface was not prepared".into()));
            }
            Ok(self.draw_scene(scene, camera))
        }
        .boxed_local()
    }

    fn release(&mut self) {
        self.resolution = 0;
        self.color = Vec::new();
        self.depth = Vec::new();
    }
}
