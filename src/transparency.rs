//! Transparency accumulation pass.
//!
//! Rasterizes transparent geometry with no depth attachment and no color
//! output; each surviving fragment is appended to its pixel's linked list
//! in the [`ABuffer`](crate::abuffer::ABuffer) instead. Fragments at or
//! behind the opaque linear depth are rejected in the shader, so hidden
//! transparency never costs pool slots.

use crate::abuffer::ABuffer;
use crate::draw::{DrawData, DrawUniforms, TransparentDraw};
use crate::gbuffer::GBuffer;
use crate::gpu::GpuContext;
use crate::mesh::Vertex;
use crate::scene::Globals;

pub struct TransparencyPass {
    pipeline: wgpu::RenderPipeline,
    draws: DrawUniforms,
    depth_layout: wgpu::BindGroupLayout,
}

impl TransparencyPass {
    pub fn new(gpu: &GpuContext, globals: &Globals, abuffer: &ABuffer) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Transparency Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/transparent.wgsl").into()),
        });

        let draws = DrawUniforms::new(gpu, "Transparent Draw Uniforms", 4);

        // R32Float is not filterable by default, so the shader reads the
        // opaque depth with textureLoad and no sampler is bound.
        let depth_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Opaque Depth Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Transparency Pipeline Layout"),
            bind_group_layouts: &[&globals.layout, &draws.layout, &abuffer.write_layout, &depth_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Transparency Pipeline"),
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
                // A color attachment is required, but every channel is
                // masked off; the pass writes only through the A-buffer.
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::empty(),
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // Both faces of transparent geometry contribute.
                cull_mode: None,
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            draws,
            depth_layout,
        }
    }

    /// Records the accumulation pass into `target`. The A-buffer must have
    /// been reset earlier in the same encoder.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        gbuffer: &GBuffer,
        globals: &Globals,
        abuffer: &ABuffer,
        draws: &[TransparentDraw],
    ) {
        self.draws.ensure_capacity(gpu, draws.len() as u32);
        for (i, call) in draws.iter().enumerate() {
            self.draws
                .write(gpu, i as u32, DrawData::new(call.transform, call.alpha));
        }

        let depth_bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Opaque Depth Bind Group"),
            layout: &self.depth_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&gbuffer.depth_view),
            }],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Transparency Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &globals.bind_group, &[]);
        pass.set_bind_group(2, &abuffer.write_bind_group, &[]);
        pass.set_bind_group(3, &depth_bind_group, &[]);

        for (i, call) in draws.iter().enumerate() {
            pass.set_bind_group(1, &self.draws.bind_group, &[self.draws.offset(i as u32)]);
            pass.set_vertex_buffer(0, call.mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(call.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..call.mesh.index_count, 0, 0..1);
        }
    }
}
