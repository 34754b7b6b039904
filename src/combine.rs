//! Combine pass: resolves per-pixel fragment lists over the opaque color.
//!
//! A fullscreen triangle walks each pixel's linked list, sorts the
//! collected fragments by view depth, and alpha-blends them back to front
//! over the opaque G-buffer color (or over black when the background is
//! suppressed). The walk and blend logic also exists here as plain
//! functions so the resolve order can be tested without a GPU.

use bytemuck::{Pod, Zeroable};

use crate::abuffer::ABuffer;
use crate::config::RendererConfig;
use crate::gbuffer::GBuffer;
use crate::gpu::GpuContext;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct CombineParams {
    width: u32,
    height: u32,
    show_background: u32,
    _pad: u32,
}

pub struct CombinePass {
    pipeline: wgpu::RenderPipeline,
    params: wgpu::Buffer,
    input_layout: wgpu::BindGroupLayout,
    show_background: bool,
}

impl CombinePass {
    pub fn new(gpu: &GpuContext, config: &RendererConfig, abuffer: &ABuffer) -> Self {
        let device = &gpu.device;

        // The walk buffer is a fixed-size array in the shader, so the
        // per-pixel depth limit has to be spliced into the source.
        let source = include_str!("shaders/combine.wgsl").replace(
            "const MAX_DEPTH: u32 = 8u;",
            &format!("const MAX_DEPTH: u32 = {}u;", config.max_fragments_per_pixel),
        );
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Combine Shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Combine Params"),
            size: std::mem::size_of::<CombineParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let input_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Combine Input Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<CombineParams>() as u64,
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Combine Pipeline Layout"),
            bind_group_layouts: &[&input_layout, &abuffer.read_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Combine Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            params,
            input_layout,
            show_background: config.show_background,
        }
    }

    /// Resolves the fragment lists into `target`. Must be recorded after
    /// the accumulation pass has ended so its list writes are visible.
    pub fn render(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        gbuffer: &GBuffer,
        abuffer: &ABuffer,
    ) {
        gpu.queue.write_buffer(
            &self.params,
            0,
            bytemuck::bytes_of(&CombineParams {
                width: gpu.width(),
                height: gpu.height(),
                show_background: self.show_background as u32,
                _pad: 0,
            }),
        );

        let input_bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Combine Input Bind Group"),
            layout: &self.input_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.color_view),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Combine Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &input_bind_group, &[]);
        pass.set_bind_group(1, &abuffer.read_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    /// One fragment as it comes off a pixel's list walk.
    #[derive(Debug, Clone, Copy, PartialEq)]
    struct BlendFragment {
        color: [f32; 3],
        alpha: f32,
        depth: f32,
    }

    /// Reference for the shader's ordering: the walk yields newest first,
    /// so reversing restores submission order, and the stable sort then
    /// breaks depth ties by that order.
    fn sort_fragments(walked: &[BlendFragment], max_depth: usize) -> Vec<BlendFragment> {
        let mut taken: Vec<BlendFragment> = walked.iter().take(max_depth).copied().collect();
        taken.reverse();
        // Insertion sort, same as the shader's in-register version.
        for i in 1..taken.len() {
            let mut j = i;
            while j > 0 && taken[j - 1].depth > taken[j].depth {
                taken.swap(j - 1, j);
                j -= 1;
            }
        }
        taken
    }

    /// Reference for the shader's composite: blend walked fragments back
    /// to front over the background color.
    fn resolve_pixel(
        walked: &[BlendFragment],
        background: [f32; 3],
        max_depth: usize,
    ) -> [f32; 3] {
        let sorted = sort_fragments(walked, max_depth);
        let mut out = background;
        for frag in sorted.iter().rev() {
            for c in 0..3 {
                out[c] = frag.color[c] * frag.alpha + out[c] * (1.0 - frag.alpha);
            }
        }
        out
    }

    fn frag(color: [f32; 3], alpha: f32, depth: f32) -> BlendFragment {
        BlendFragment {
            color,
            alpha,
            depth,
        }
    }

    fn close(a: [f32; 3], b: [f32; 3]) {
        for c in 0..3 {
            assert!((a[c] - b[c]).abs() < 1e-6, "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn empty_list_passes_background_through() {
        let bg = [0.2, 0.4, 0.6];
        assert_eq!(resolve_pixel(&[], bg, 8), bg);
    }

    #[test]
    fn opaque_fragment_replaces_background() {
        let out = resolve_pixel(&[frag([1.0, 0.0, 0.5], 1.0, 3.0)], [0.2, 0.2, 0.2], 8);
        close(out, [1.0, 0.0, 0.5]);
    }

    #[test]
    fn two_layers_blend_back_to_front() {
        let near = frag([1.0, 0.0, 0.0], 0.5, 1.0);
        let far = frag([0.0, 1.0, 0.0], 0.25, 2.0);
        let bg = [0.0, 0.0, 1.0];

        // far over bg, then near over that.
        let behind = [0.0, 0.25, 0.75];
        let expected = [
            0.5 + behind[0] * 0.5,
            behind[1] * 0.5,
            behind[2] * 0.5,
        ];

        close(resolve_pixel(&[near, far], bg, 8), expected);
        // The lock-free push makes walk order arrival-dependent; the
        // sort must erase that.
        close(resolve_pixel(&[far, near], bg, 8), expected);
    }

    #[test]
    fn depth_ties_keep_submission_order() {
        let first = frag([1.0, 0.0, 0.0], 0.5, 2.0);
        let second = frag([0.0, 1.0, 0.0], 0.5, 2.0);
        // Walk order is newest first, so [second, first] means `first`
        // was submitted first and must land behind.
        let out = resolve_pixel(&[second, first], [0.0; 3], 8);
        close(out, [0.5, 0.25, 0.0]);
    }

    #[test]
    fn walk_stops_at_max_depth() {
        // Newest two fragments fit the budget; the oldest is dropped.
        let walked = [
            frag([0.0, 0.0, 1.0], 1.0, 3.0),
            frag([0.0, 1.0, 0.0], 1.0, 2.0),
            frag([1.0, 0.0, 0.0], 1.0, 1.0),
        ];
        let out = resolve_pixel(&walked, [0.0; 3], 2);
        // Only the depths 3.0 and 2.0 survive; 2.0 is nearer and opaque.
        close(out, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn sorted_output_is_ascending_by_depth() {
        let walked = [
            frag([0.0; 3], 0.5, 5.0),
            frag([0.0; 3], 0.5, 1.0),
            frag([0.0; 3], 0.5, 3.0),
        ];
        let sorted = sort_fragments(&walked, 8);
        let depths: Vec<f32> = sorted.iter().map(|f| f.depth).collect();
        assert_eq!(depths, vec![1.0, 3.0, 5.0]);
    }
}
