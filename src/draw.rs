//! Draw calls and per-draw uniform plumbing.
//!
//! Each pass receives a slice of draw calls per frame. Their transforms (and
//! alpha, for transparent draws) are uploaded into one uniform buffer with a
//! 256-byte-aligned slot per draw, bound with a dynamic offset. All slots
//! are written before the render pass is recorded, so every draw in a
//! submission observes its own transform.

use crate::gpu::GpuContext;
use crate::mesh::Mesh;
use glam::Mat4;

/// An opaque draw: a mesh and its model transform.
pub struct DrawCall<'a> {
    pub mesh: &'a Mesh,
    pub transform: Mat4,
}

/// A transparent draw: a mesh, its model transform, and an alpha in [0, 1].
pub struct TransparentDraw<'a> {
    pub mesh: &'a Mesh,
    pub transform: Mat4,
    pub alpha: f32,
}

/// Per-draw uniform data, matching the WGSL `Draw` struct.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct DrawData {
    pub model: [[f32; 4]; 4],
    pub alpha: f32,
    pub _pad: [f32; 3],
}

impl DrawData {
    pub fn new(transform: Mat4, alpha: f32) -> Self {
        Self {
            model: transform.to_cols_array_2d(),
            alpha,
            _pad: [0.0; 3],
        }
    }
}

/// Rounds a slot size up to the device's dynamic-offset alignment.
pub(crate) fn aligned_stride(size: u32, alignment: u32) -> u32 {
    size.div_ceil(alignment) * alignment
}

/// A dynamic-offset uniform buffer with one slot per draw call.
pub(crate) struct DrawUniforms {
    buffer: wgpu::Buffer,
    pub layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
    stride: u32,
    capacity: u32,
    label: &'static str,
}

impl DrawUniforms {
    pub fn new(gpu: &GpuContext, label: &'static str, capacity: u32) -> Self {
        let device = &gpu.device;
        let stride = aligned_stride(
            std::mem::size_of::<DrawData>() as u32,
            device.limits().min_uniform_buffer_offset_alignment,
        );

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<DrawData>() as u64),
                },
                count: None,
            }],
        });

        let (buffer, bind_group) = Self::allocate(gpu, &layout, label, stride, capacity);

        Self {
            buffer,
            layout,
            bind_group,
            stride,
            capacity,
            label,
        }
    }

    fn allocate(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        stride: u32,
        capacity: u32,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: stride as u64 * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<DrawData>() as u64),
                }),
            }],
        });

        (buffer, bind_group)
    }

    /// Grows the buffer when a frame has more draws than ever before.
    pub fn ensure_capacity(&mut self, gpu: &GpuContext, count: u32) {
        if count > self.capacity {
            let capacity = count.next_power_of_two();
            let (buffer, bind_group) =
                Self::allocate(gpu, &self.layout, self.label, self.stride, capacity);
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
        }
    }

    /// Writes one draw's data into its slot. Must happen before the render
    /// pass that uses it is submitted.
    pub fn write(&self, gpu: &GpuContext, index: u32, data: DrawData) {
        gpu.queue.write_buffer(
            &self.buffer,
            index as u64 * self.stride as u64,
            bytemuck::cast_slice(&[data]),
        );
    }

    /// Dynamic offset for the given draw index.
    pub fn offset(&self, index: u32) -> u32 {
        index * self.stride
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_data_layout() {
        // mat4 + alpha + padding.
        assert_eq!(std::mem::size_of::<DrawData>(), 80);
    }

    #[test]
    fn stride_rounds_up_to_alignment() {
        assert_eq!(aligned_stride(80, 256), 256);
        assert_eq!(aligned_stride(256, 256), 256);
        assert_eq!(aligned_stride(257, 256), 512);
        assert_eq!(aligned_stride(80, 64), 128);
    }
}
