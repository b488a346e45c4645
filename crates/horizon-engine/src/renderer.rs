//! Offscreen GPU renderer for the terrain.
//!
//! Draws the queued terrain meshes of a [`WgpuBackend`] into an offscreen
//! colour/depth target. No window or surface is involved.

use std::sync::Arc;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use horizon_terrain::{TerrainVertex, WgpuBackend};
use tracing::info;

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const TERRAIN_SHADER: &str = r"
struct Uniforms {
    view_proj: mat4x4<f32>,
    light_dir: vec4<f32>,
};

@group(0) @binding(0) var<uniform> uniforms: Uniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec3<f32>,
    @location(3) tex_coord: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * vec4<f32>(in.position, 1.0);
    out.color = in.color;
    out.normal = in.normal;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let diffuse = max(dot(normalize(in.normal), normalize(uniforms.light_dir.xyz)), 0.0);
    return vec4<f32>(in.color * (0.3 + 0.7 * diffuse), 1.0);
}
";

/// Per-frame shader uniforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct TerrainUniforms {
    view_proj: [[f32; 4]; 4],
    light_dir: [f32; 4],
}

/// Renders terrain draws into an offscreen target.
pub struct OffscreenRenderer {
    device: Arc<wgpu::Device>,
    queue: wgpu::Queue,
    fill_pipeline: wgpu::RenderPipeline,
    line_pipeline: Option<wgpu::RenderPipeline>,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    frame_count: u64,
}

impl OffscreenRenderer {
    /// Creates a headless device and the terrain pipelines.
    pub async fn new(width: u32, height: u32) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            dx12_shader_compiler: wgpu::Dx12Compiler::Fxc,
            flags: wgpu::InstanceFlags::default(),
            gles_minor_version: wgpu::Gles3MinorVersion::Automatic,
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("Failed to find a suitable GPU adapter")?;

        info!("Using GPU adapter: {:?}", adapter.get_info().name);

        // Wireframe needs line rasterisation, which is optional.
        let line_mode = adapter
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE);
        let required_features = if line_mode {
            wgpu::Features::POLYGON_MODE_LINE
        } else {
            wgpu::Features::empty()
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Horizon Device"),
                    required_features,
                    required_limits: wgpu::Limits::downlevel_defaults(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .context("Failed to create GPU device")?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("terrain_shader"),
            source: wgpu::ShaderSource::Wgsl(TERRAIN_SHADER.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("terrain_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("terrain_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let fill_pipeline =
            create_pipeline(&device, &pipeline_layout, &shader, wgpu::PolygonMode::Fill);
        let line_pipeline = line_mode
            .then(|| create_pipeline(&device, &pipeline_layout, &shader, wgpu::PolygonMode::Line));

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("terrain_uniforms"),
            size: std::mem::size_of::<TerrainUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("terrain_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let color_view = create_target(&device, width, height, COLOR_FORMAT, "terrain_color");
        let depth_view = create_target(&device, width, height, DEPTH_FORMAT, "terrain_depth");

        info!(
            "Offscreen renderer initialized: {}x{}, wireframe {}",
            width,
            height,
            if line_mode { "supported" } else { "unsupported" }
        );

        Ok(Self {
            device: Arc::new(device),
            queue,
            fill_pipeline,
            line_pipeline,
            uniform_buffer,
            bind_group,
            color_view,
            depth_view,
            frame_count: 0,
        })
    }

    /// Device shared with the terrain backend.
    pub fn device(&self) -> Arc<wgpu::Device> {
        Arc::clone(&self.device)
    }

    /// Frames submitted so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Records and submits the backend's queued draws.
    ///
    /// Returns the number of draw calls recorded.
    pub fn render(&mut self, backend: &mut WgpuBackend, view_proj: Mat4) -> usize {
        let uniforms = TerrainUniforms {
            view_proj: view_proj.to_cols_array_2d(),
            light_dir: Vec3::new(0.4, 1.0, 0.3).normalize().extend(0.0).to_array(),
        };
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Terrain Encoder"),
            });

        let recorded = {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Terrain Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.5,
                            g: 0.7,
                            b: 0.9,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(0, &self.bind_group, &[]);
            let line = self.line_pipeline.as_ref().unwrap_or(&self.fill_pipeline);
            backend.record(&mut render_pass, &self.fill_pipeline, line)
        };

        self.queue.submit(std::iter::once(encoder.finish()));
        self.frame_count += 1;
        recorded
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    polygon_mode: wgpu::PolygonMode,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(match polygon_mode {
            wgpu::PolygonMode::Line => "terrain_line_pipeline",
            _ => "terrain_fill_pipeline",
        }),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[TerrainVertex::layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: COLOR_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            polygon_mode,
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
}

fn create_target(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    label: &str,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_terrain::{build_grid_mesh, PolygonMode, RenderBackend};

    #[test]
    fn test_offscreen_render_replays_queued_draws() {
        // Machines without any adapter skip this test.
        let Ok(mut renderer) = pollster::block_on(OffscreenRenderer::new(64, 64)) else {
            return;
        };
        let mut backend = WgpuBackend::new(renderer.device());
        let mesh = build_grid_mesh(0, 0, 5, 65, 1.0, 1.0, Vec3::ZERO, Vec3::ONE, |_, _| 0.0);

        let gpu = backend.upload(&mesh);
        assert_eq!(gpu.index_count(), 4 * 4 * 6);
        backend.draw(&gpu);
        backend.set_polygon_mode(PolygonMode::Line);
        backend.draw(&gpu);
        backend.set_polygon_mode(PolygonMode::Fill);
        assert_eq!(backend.queued().len(), 2);
        assert_eq!(backend.queued()[1].mode(), PolygonMode::Line);

        let view_proj = Mat4::perspective_rh(1.0, 1.0, 0.1, 500.0)
            * Mat4::look_at_rh(Vec3::new(32.0, 40.0, -40.0), Vec3::new(32.0, 0.0, 32.0), Vec3::Y);
        assert_eq!(renderer.render(&mut backend, view_proj), 2);
        assert!(backend.queued().is_empty());
        assert_eq!(renderer.frame_count(), 1);

        // Empty geometry uploads without buffers and is never queued.
        let empty = backend.upload(&horizon_terrain::MeshData::default());
        backend.draw(&empty);
        assert!(backend.queued().is_empty());
        assert_eq!(backend.uploads(), 2);
    }
}
