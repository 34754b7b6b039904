//! Opaque geometry pass and its offscreen targets.
//!
//! The G-buffer holds two independent color targets at surface resolution:
//! shaded opaque color (surface format) and linearized view depth
//! (`R32Float`, cleared to the far plane), plus a `Depth32Float` attachment
//! for opaque-vs-opaque occlusion. The linear depth target is what the
//! transparency pass samples for manual early rejection; the color target
//! is what the combine pass composites over.

use crate::config::RendererConfig;
use crate::draw::{DrawCall, DrawData, DrawUniforms};
use crate::gpu::GpuContext;
use crate::mesh::Vertex;
use crate::scene::Globals;

/// Offscreen targets produced by the opaque pass.
pub struct GBuffer {
    pub(crate) color_view: wgpu::TextureView,
    pub(crate) depth_view: wgpu::TextureView,
    depth_attachment_view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl GBuffer {
    /// Linear view-depth target format.
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;
    /// Depth-test attachment format.
    pub const DEPTH_ATTACHMENT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub fn new(gpu: &GpuContext) -> Self {
        let make = |label: &str, format: wgpu::TextureFormat, usage| {
            gpu.device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some(label),
                    size: wgpu::Extent3d {
                        width: gpu.width(),
                        height: gpu.height(),
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        };

        let sampled = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;

        Self {
            color_view: make("G-Buffer Color", gpu.config.format, sampled),
            depth_view: make("G-Buffer Linear Depth", Self::DEPTH_FORMAT, sampled),
            depth_attachment_view: make(
                "G-Buffer Depth Attachment",
                Self::DEPTH_ATTACHMENT_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            ),
            width: gpu.width(),
            height: gpu.height(),
        }
    }

    /// Recreates the targets if the surface size changed.
    pub fn ensure_size(&mut self, gpu: &GpuContext) {
        if self.width != gpu.width() || self.height != gpu.height() {
            *self = Self::new(gpu);
        }
    }
}

/// Renders opaque geometry into the G-buffer.
pub struct OpaquePass {
    pipeline: wgpu::RenderPipeline,
    draws: DrawUniforms,
    clear_depth: f32,
}

impl OpaquePass {
    pub fn new(gpu: &GpuContext, config: &RendererConfig, globals: &Globals) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Opaque Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/opaque.wgsl").into()),
        });

        let draws = DrawUniforms::new(gpu, "Opaque Draw Uniforms", 4);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Opaque Pipeline Layout"),
            bind_group_layouts: &[&globals.layout, &draws.layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Opaque Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[Vertex::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[
                    Some(wgpu::ColorTargetState {
                        format: gpu.config.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    }),
                    Some(wgpu::ColorTargetState {
                        format: GBuffer::DEPTH_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    }),
                ],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: GBuffer::DEPTH_ATTACHMENT_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            draws,
            clear_depth: config.z_far,
        }
    }

    /// Records the opaque pass: clears both targets and the depth
    /// attachment, then draws with depth testing and back-face culling.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &GBuffer,
        globals: &Globals,
        draws: &[DrawCall],
    ) {
        self.draws.ensure_capacity(gpu, draws.len() as u32);
        for (i, call) in draws.iter().enumerate() {
            self.draws
                .write(gpu, i as u32, DrawData::new(call.transform, 1.0));
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Opaque Pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: &gbuffer.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: &gbuffer.depth_view,
                    resolve_target: None,
                    // Uncovered pixels keep the far plane so they never
                    // occlude transparency.
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: self.clear_depth as f64,
                            g: 0.0,
                            b: 0.0,
                            a: 0.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                }),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &gbuffer.depth_attachment_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &globals.bind_group, &[]);

        for (i, call) in draws.iter().enumerate() {
            pass.set_bind_group(1, &self.draws.bind_group, &[self.draws.offset(i as u32)]);
            pass.set_vertex_buffer(0, call.mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(call.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..call.mesh.index_count, 0, 0..1);
        }
    }
}
