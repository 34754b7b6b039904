//! Session-wide scene state: projection and lights.
//!
//! Both are computed once at startup and uploaded into a single uniform
//! buffer shared by the opaque and transparency passes (bind group 0 in
//! both pipelines). Nothing here changes per frame.

use crate::config::RendererConfig;
use crate::gpu::GpuContext;
use glam::{Mat4, Vec3};

/// Maximum number of lights uploaded to the GPU.
pub const MAX_LIGHTS: usize = 4;

/// A point light.
#[derive(Debug, Clone, Copy)]
pub struct Light {
    /// World-space position.
    pub position: Vec3,
    /// Light color.
    pub color: Vec3,
    /// Intensity; falls off with the square of the distance.
    pub strength: f32,
    /// Ambient contribution factor.
    pub ambience: f32,
}

/// GPU layout of one light, matching the WGSL `Light` struct.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct LightUniform {
    position: [f32; 3],
    strength: f32,
    color: [f32; 3],
    ambience: f32,
}

/// Session uniforms shared by the geometry passes.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct GlobalsUniforms {
    proj: [[f32; 4]; 4],
    lights: [LightUniform; MAX_LIGHTS],
    light_count: u32,
    _pad: [u32; 3],
}

/// Builds the shared projection matrix.
///
/// Right-handed with depth mapped to [0, 1], pairing with wgpu's NDC and a
/// `Depth32Float` attachment.
pub fn projection(config: &RendererConfig) -> Mat4 {
    Mat4::perspective_rh(
        config.fov_y_degrees.to_radians(),
        config.aspect(),
        config.z_near,
        config.z_far,
    )
}

/// Owns the shared globals uniform buffer and its bind group.
pub struct Globals {
    buffer: wgpu::Buffer,
    pub(crate) layout: wgpu::BindGroupLayout,
    pub(crate) bind_group: wgpu::BindGroup,
}

impl Globals {
    /// Creates the globals buffer and uploads projection and lights once.
    ///
    /// Lights beyond [`MAX_LIGHTS`] are ignored.
    pub fn new(gpu: &GpuContext, config: &RendererConfig, lights: &[Light]) -> Self {
        let device = &gpu.device;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Globals Uniforms"),
            size: std::mem::size_of::<GlobalsUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        let globals = Self {
            buffer,
            layout,
            bind_group,
        };
        globals.upload(gpu, projection(config), lights);
        globals
    }

    /// Re-uploads the globals, e.g. after a resize changes the aspect ratio.
    pub fn upload(&self, gpu: &GpuContext, proj: Mat4, lights: &[Light]) {
        let mut uniforms = GlobalsUniforms {
            proj: proj.to_cols_array_2d(),
            lights: [LightUniform {
                position: [0.0; 3],
                strength: 0.0,
                color: [0.0; 3],
                ambience: 0.0,
            }; MAX_LIGHTS],
            light_count: lights.len().min(MAX_LIGHTS) as u32,
            _pad: [0; 3],
        };

        for (slot, light) in uniforms.lights.iter_mut().zip(lights.iter()) {
            *slot = LightUniform {
                position: light.position.to_array(),
                strength: light.strength,
                color: light.color.to_array(),
                ambience: light.ambience,
            };
        }

        gpu.queue
            .write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[uniforms]));
    }
}

/// The demo's light rig: one white point light off to the right.
pub fn demo_lights() -> Vec<Light> {
    vec![Light {
        position: Vec3::new(5.0, 0.0, 0.0),
        color: Vec3::ONE,
        strength: 30.0,
        ambience: 0.4,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_matches_wgpu_depth_convention() {
        let config = RendererConfig::default();
        let proj = projection(&config);

        let half_fov = config.fov_y_degrees.to_radians() / 2.0;
        let q = 1.0 / half_fov.tan();
        assert!((proj.x_axis.x - q / config.aspect()).abs() < 1e-5);
        assert!((proj.y_axis.y - q).abs() < 1e-5);
        // Perspective divide term.
        assert_eq!(proj.z_axis.w, -1.0);
        // Depth maps to [0, 1]: a point on the near plane projects to z = 0,
        // one on the far plane to z = 1.
        let near = proj.project_point3(Vec3::new(0.0, 0.0, -config.z_near));
        let far = proj.project_point3(Vec3::new(0.0, 0.0, -config.z_far));
        assert!(near.z.abs() < 1e-5);
        assert!((far.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn globals_uniforms_layout() {
        // mat4 (64) + 4 lights (4 * 32) + count + padding (16).
        assert_eq!(std::mem::size_of::<GlobalsUniforms>(), 64 + 128 + 16);
        assert_eq!(std::mem::size_of::<LightUniform>(), 32);
    }

    #[test]
    fn light_count_is_capped() {
        let lights: Vec<Light> = (0..6)
            .map(|_| Light {
                position: Vec3::ZERO,
                color: Vec3::ONE,
                strength: 1.0,
                ambience: 0.1,
            })
            .collect();
        assert_eq!(lights.len().min(MAX_LIGHTS), 4);
    }
}
