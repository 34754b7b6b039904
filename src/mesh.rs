//! GPU-resident mesh geometry.
//!
//! [`Vertex`] is the interleaved vertex format shared by every pipeline in
//! the renderer: a surface normal followed by a model-space position, 24
//! bytes per vertex, no texture coordinates. [`Mesh`] owns the vertex and
//! index buffers and is immutable after creation.
//!
//! The procedural primitives ([`Mesh::sphere`], [`Mesh::torus`]) exist so
//! the demo runs without model files on disk; OBJ files load through
//! [`crate::geometry`].

use crate::gpu::GpuContext;

/// A vertex with an interleaved (normal, position) layout.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Surface normal (should be normalized for correct lighting).
    pub normal: [f32; 3],
    /// Model-space position.
    pub position: [f32; 3],
}

impl Vertex {
    /// The wgpu vertex buffer layout: 24-byte stride, normal at shader
    /// location 0, position at location 1.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // normal
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // position
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    };

    pub fn new(normal: [f32; 3], position: [f32; 3]) -> Self {
        Self { normal, position }
    }
}

/// GPU-resident triangle geometry with vertex and index buffers.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) index_count: u32,
}

impl Mesh {
    /// Uploads vertex and index data to the GPU. The mesh is ready to
    /// render immediately.
    pub fn new(gpu: &GpuContext, vertices: &[Vertex], indices: &[u32]) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }

    /// Creates a UV sphere of the given radius centered at the origin.
    ///
    /// Counter-clockwise winding for front faces, smooth normals.
    pub fn sphere(gpu: &GpuContext, radius: f32, segments: u32, rings: u32) -> Self {
        let (vertices, indices) = sphere_geometry(radius, segments, rings);
        Self::new(gpu, &vertices, &indices)
    }

    /// Creates a torus in the XY plane centered at the origin.
    ///
    /// `major_radius` is the distance from the center to the tube center,
    /// `minor_radius` the tube thickness.
    pub fn torus(
        gpu: &GpuContext,
        major_radius: f32,
        minor_radius: f32,
        major_segments: u32,
        minor_segments: u32,
    ) -> Self {
        let (vertices, indices) =
            torus_geometry(major_radius, minor_radius, major_segments, minor_segments);
        Self::new(gpu, &vertices, &indices)
    }
}

/// CPU-side UV sphere geometry, shared by [`Mesh::sphere`].
pub fn sphere_geometry(radius: f32, segments: u32, rings: u32) -> (Vec<Vertex>, Vec<u32>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for ring in 0..=rings {
        let phi = std::f32::consts::PI * ring as f32 / rings as f32;
        let y = phi.cos();
        let ring_radius = phi.sin();

        for seg in 0..=segments {
            let theta = 2.0 * std::f32::consts::PI * seg as f32 / segments as f32;
            let x = ring_radius * theta.cos();
            let z = ring_radius * theta.sin();

            vertices.push(Vertex::new([x, y, z], [x * radius, y * radius, z * radius]));
        }
    }

    for ring in 0..rings {
        for seg in 0..segments {
            let a = ring * (segments + 1) + seg;
            let b = a + segments + 1;
            indices.extend_from_slice(&[a, a + 1, b, b, a + 1, b + 1]);
        }
    }

    (vertices, indices)
}

/// CPU-side torus geometry, shared by [`Mesh::torus`].
pub fn torus_geometry(
    major_radius: f32,
    minor_radius: f32,
    major_segments: u32,
    minor_segments: u32,
) -> (Vec<Vertex>, Vec<u32>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for i in 0..=major_segments {
        let u = 2.0 * std::f32::consts::PI * i as f32 / major_segments as f32;
        let (sin_u, cos_u) = u.sin_cos();

        for j in 0..=minor_segments {
            let v = 2.0 * std::f32::consts::PI * j as f32 / minor_segments as f32;
            let (sin_v, cos_v) = v.sin_cos();

            let position = [
                (major_radius + minor_radius * cos_v) * cos_u,
                (major_radius + minor_radius * cos_v) * sin_u,
                minor_radius * sin_v,
            ];
            let normal = [cos_v * cos_u, cos_v * sin_u, sin_v];
            vertices.push(Vertex::new(normal, position));
        }
    }

    for i in 0..major_segments {
        for j in 0..minor_segments {
            let a = i * (minor_segments + 1) + j;
            let b = a + minor_segments + 1;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }

    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_struct() {
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
        assert_eq!(Vertex::LAYOUT.array_stride, 24);
        assert_eq!(Vertex::LAYOUT.attributes[1].offset, 12);
    }

    #[test]
    fn sphere_geometry_counts() {
        let (vertices, indices) = sphere_geometry(0.5, 8, 4);
        assert_eq!(vertices.len(), 9 * 5);
        assert_eq!(indices.len(), (8 * 4 * 2 * 3) as usize);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }

    #[test]
    fn sphere_positions_lie_on_radius() {
        let (vertices, _) = sphere_geometry(2.0, 12, 6);
        for v in &vertices {
            let r = (v.position[0].powi(2) + v.position[1].powi(2) + v.position[2].powi(2)).sqrt();
            assert!((r - 2.0).abs() < 1e-4, "position off the sphere: {r}");
        }
    }

    #[test]
    fn torus_normals_are_unit_length() {
        let (vertices, indices) = torus_geometry(1.0, 0.25, 16, 8);
        assert_eq!(vertices.len(), 17 * 9);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
        for v in &vertices {
            let n = (v.normal[0].powi(2) + v.normal[1].powi(2) + v.normal[2].powi(2)).sqrt();
            assert!((n - 1.0).abs() < 1e-4);
        }
    }
}
