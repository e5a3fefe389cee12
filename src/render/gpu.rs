use bytemuck::{Pod, Zeroable};
use futures::future::{FutureExt, LocalBoxFuture};
use log::{debug, info};
use wgpu::util::DeviceExt;
use wgpu::{BindGroupLayout, Buffer, Device, RenderPipeline, Sampler, Texture, TextureView};

use super::{DrawItem, Light, PerspectiveCamera, RasterOutput, Rasterizer, RenderScene};
use crate::error::RenderError;
use crate::scene::{Material, Shading, Side};

use super::gpu_context::GpuContext;

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const MAX_LIGHTS: usize = 4;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Per-draw uniform block, mirrors `DrawUniform` in sprite.wgsl
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct DrawUniform {
    view_proj: [[f32; 4]; 4],
    color: [f32; 4],
    params: [f32; 4],
    flags: [f32; 4],
    ambient: [f32; 4],
    light_dirs: [[f32; 4]; MAX_LIGHTS],
    light_colors: [[f32; 4]; MAX_LIGHTS],
}

impl DrawUniform {
    fn new(view_proj: glam::Mat4, material: &Material, lights: &[Light]) -> Self {
        let mut uniform = Self::zeroed();
        uniform.view_proj = view_proj.to_cols_array_2d();
        let [r, g, b] = material.color.to_array();
        uniform.color = [r, g, b, material.effective_opacity()];

        let (mode, levels) = match &material.shading {
            Shading::Standard => (0.0, 0.0),
            Shading::Basic => (1.0, 0.0),
            Shading::Toon(gradient) => (2.0, gradient.levels() as f32),
        };

        let mut count = 0;
        for light in lights {
            match light {
                Light::Ambient { color, intensity } => {
                    let c = color.scale(*intensity);
                    uniform.ambient[0] += c.r;
                    uniform.ambient[1] += c.g;
                    uniform.ambient[2] += c.b;
                }
                Light::Directional { color, intensity, .. } if count < MAX_LIGHTS => {
                    let dir = light.direction().unwrap_or(glam::Vec3::Y);
                    let c = color.scale(*intensity);
                    uniform.light_dirs[count] = [dir.x, dir.y, dir.z, 0.0];
                    uniform.light_colors[count] = [c.r, c.g, c.b, 0.0];
                    count += 1;
                }
                Light::Directional { .. } => {}
            }
        }

        let has_map = material.map.is_some();
        uniform.params = [mode, levels, count as f32, if has_map { 1.0 } else { 0.0 }];
        uniform.flags = [if material.transparent { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0];
        uniform
    }
}

/// Render target and readback buffer for one resolution
struct Surface {
    resolution: u32,
    color: Texture,
    color_view: TextureView,
    depth_view: TextureView,
    readback: Buffer,
    padded_bytes_per_row: u32,
}

impl Surface {
    fn new(device: &Device, resolution: u32) -> Self {
        let size = wgpu::Extent3d {
            width: resolution,
            height: resolution,
            depth_or_array_layers: 1,
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Capture Color Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Capture Depth Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        let unpadded = 4 * resolution;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded.div_ceil(align) * align;
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Capture Readback Buffer"),
            size: (padded_bytes_per_row * resolution) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            resolution,
            color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
            color,
            readback,
            padded_bytes_per_row,
        }
    }

    /// Drop the row padding wgpu requires for texture copies
    fn unpad(&self, padded: &[u8]) -> Vec<u8> {
        let row_len = (4 * self.resolution) as usize;
        padded
            .chunks(self.padded_bytes_per_row as usize)
            .take(self.resolution as usize)
            .flat_map(|row| &row[..row_len.min(row.len())])
            .copied()
            .collect()
    }
}

struct Pipelines {
    front: RenderPipeline,
    back: RenderPipeline,
    double: RenderPipeline,
    wire: RenderPipeline,
}

impl Pipelines {
    fn for_material(&self, material: &Material) -> &RenderPipeline {
        if material.wireframe {
            return &self.wire;
        }
        match material.side {
            Side::Front => &self.front,
            Side::Back => &self.back,
            Side::Double => &self.double,
        }
    }
}

/// Draw item uploaded for one frame
struct GpuDraw {
    vertices: Buffer,
    indices: Buffer,
    index_count: u32,
    bind_group: wgpu::BindGroup,
    material: Material,
}

/// Offscreen wgpu rasterizer.
///
/// Renders into an RGBA8 texture with a 32-bit depth buffer, then copies the
/// texture into a mappable buffer and waits for the mapping before returning.
pub struct GpuRasterizer {
    gpu: GpuContext,
    bind_group_layout: BindGroupLayout,
    pipelines: Pipelines,
    sampler: Sampler,
    blank_texture: TextureView,
    surface: Option<Surface>,
}

impl GpuRasterizer {
    pub fn new(gpu: GpuContext) -> Self {
        let device = gpu.device();
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sprite Draw Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipelines = Self::create_pipelines(device, &bind_group_layout);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Sprite Texture Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let blank_texture = upload_texture(&gpu, 1, 1, &[255, 255, 255, 255]);

        Self {
            gpu,
            bind_group_layout,
            pipelines,
            sampler,
            blank_texture,
            surface: None,
        }
    }

    /// Create a rasterizer on a fresh headless device
    pub async fn create() -> Result<Self, RenderError> {
        Ok(Self::new(GpuContext::new().await?))
    }

    fn create_pipelines(device: &Device, layout: &BindGroupLayout) -> Pipelines {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sprite Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("sprite.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sprite Pipeline Layout"),
            bind_group_layouts: &[layout],
            push_constant_ranges: &[],
        });

        let create = |label: &str, topology, cull_mode| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: COLOR_FORMAT,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        use wgpu::PrimitiveTopology::{LineList, TriangleList};
        Pipelines {
            front: create("Sprite Front Pipeline", TriangleList, Some(wgpu::Face::Back)),
            back: create("Sprite Back Pipeline", TriangleList, Some(wgpu::Face::Front)),
            double: create("Sprite Double Pipeline", TriangleList, None),
            wire: create("Sprite Wireframe Pipeline", LineList, None),
        }
    }

    fn upload(&self, item: &DrawItem, view_proj: glam::Mat4, lights: &[Light]) -> GpuDraw {
        let device = self.gpu.device();
        let vertices: Vec<Vertex> = item
            .positions
            .iter()
            .enumerate()
            .map(|(i, p)| Vertex {
                position: p.to_array(),
                normal: item.normals.get(i).map_or([0.0, 1.0, 0.0], |n| n.to_array()),
                uv: item
                    .uvs
                    .as_ref()
                    .and_then(|uvs| uvs.get(i))
                    .map_or([0.0, 0.0], |uv| uv.to_array()),
            })
            .collect();

        let indices: Vec<u32> = if item.material.wireframe {
            item.indices
                .chunks_exact(3)
                .flat_map(|t| [t[0], t[1], t[1], t[2], t[2], t[0]])
                .collect()
        } else {
            item.indices.clone()
        };

        let uniform = DrawUniform::new(view_proj, &item.material, lights);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sprite Draw Uniform"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let texture_view = item
            .material
            .map
            .as_ref()
            .filter(|map| map.width > 0 && map.height > 0)
            .map(|map| upload_texture(&self.gpu, map.width, map.height, &map.data));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sprite Draw Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(
                        texture_view.as_ref().unwrap_or(&self.blank_texture),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        GpuDraw {
            vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Sprite Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            indices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Sprite Index Buffer"),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count: indices.len() as u32,
            bind_group,
            material: item.material.clone(),
        }
    }

    async fn draw(
        &self,
        scene: &RenderScene,
        camera: &PerspectiveCamera,
    ) -> Result<RasterOutput, RenderError> {
        let surface = self
            .surface
            .as_ref()
            .ok_or_else(|| RenderError::Render("render surface was not prepared".into()))?;
        let view_proj = camera.view_projection();

        // Opaque geometry first so blended surfaces land on top of it
        let (transparent, opaque): (Vec<&DrawItem>, Vec<&DrawItem>) = scene
            .items
            .iter()
            .filter(|item| !item.indices.is_empty())
            .partition(|item| item.material.effective_opacity() < 1.0);
        let draws: Vec<GpuDraw> = opaque
            .into_iter()
            .chain(transparent)
            .map(|item| self.upload(item, view_proj, &scene.lights))
            .collect();

        let device = self.gpu.device();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Sprite Capture Encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Sprite Capture Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &surface.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for draw in &draws {
                pass.set_pipeline(self.pipelines.for_material(&draw.material));
                pass.set_bind_group(0, &draw.bind_group, &[]);
                pass.set_vertex_buffer(0, draw.vertices.slice(..));
                pass.set_index_buffer(draw.indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }

        encoder.copy_texture_to_buffer(
            surface.color.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &surface.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(surface.padded_bytes_per_row),
                    rows_per_image: Some(surface.resolution),
                },
            },
            wgpu::Extent3d {
                width: surface.resolution,
                height: surface.resolution,
                depth_or_array_layers: 1,
            },
        );

        self.gpu.queue().submit(Some(encoder.finish()));
        debug!("Submitted {} GPU draws", draws.len());

        let padded = self.gpu.read_buffer(&surface.readback).await?;
        Ok(RasterOutput {
            width: surface.resolution,
            height: surface.resolution,
            pixels: surface.unpad(&padded),
        })
    }
}

fn upload_texture(gpu: &GpuContext, width: u32, height: u32, data: &[u8]) -> TextureView {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("Sprite Material Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let expected = (width * height * 4) as usize;
    let mut pixels = data[..expected.min(data.len())].to_vec();
    pixels.resize(expected, 255);

    gpu.queue().write_texture(
        texture.as_image_copy(),
        &pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

impl Rasterizer for GpuRasterizer {
    fn prepare(&mut self, resolution: u32) -> Result<(), RenderError> {
        let max = self.gpu.device().limits().max_texture_dimension_2d;
        if resolution == 0 || resolution > max {
            return Err(RenderError::Render(format!(
                "surface resolution {} outside 1..={}",
                resolution, max
            )));
        }
        if self.surface.as_ref().map(|s| s.resolution) != Some(resolution) {
            self.surface = Some(Surface::new(self.gpu.device(), resolution));
            info!("Prepared {}x{} GPU surface", resolution, resolution);
        }
        Ok(())
    }

    fn render<'a>(
        &'a mut self,
        scene: &'a RenderScene,
        camera: &'a PerspectiveCamera,
    ) -> LocalBoxFuture<'a, Result<RasterOutput, RenderError>> {
        self.draw(scene, camera).boxed_local()
    }

    fn release(&mut self) {
        self.surface = None;
    }
}
