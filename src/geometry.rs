//! Wavefront OBJ loading for the demo scenes.
//!
//! The loader understands the subset of OBJ the renderer needs: `v` position
//! lines, `vn` normal lines, and `f` faces whose vertices reference both
//! (`v//vn` or `v/vt/vn`; texture coordinates are ignored). Faces are
//! trusted to be triangulated — a polygon face is passed through untouched
//! and will render garbage, it is not validated away.
//!
//! Each unique face token becomes one interleaved (normal, position) vertex
//! and is reused through the index buffer when a later face references it
//! again.

use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Vertex};
use std::collections::HashMap;
use std::path::Path;

/// Errors that can occur when loading geometry.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// File could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The OBJ data was invalid.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// 1-based source line.
        line: usize,
        message: String,
    },
}

fn parse_err(line: usize, message: impl Into<String>) -> GeometryError {
    GeometryError::Parse {
        line,
        message: message.into(),
    }
}

/// Geometry data before GPU upload.
#[derive(Clone, Debug)]
pub struct RawGeometry {
    /// Interleaved (normal, position) vertices.
    pub vertices: Vec<Vertex>,
    /// Triangle indices.
    pub indices: Vec<u32>,
}

impl RawGeometry {
    /// Creates raw geometry from vertices and indices.
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Uploads this geometry to the GPU as a [`Mesh`].
    pub fn upload(&self, gpu: &GpuContext) -> Mesh {
        Mesh::new(gpu, &self.vertices, &self.indices)
    }
}

/// Loads an OBJ file from disk.
pub fn load_obj(path: impl AsRef<Path>) -> Result<RawGeometry, GeometryError> {
    let text = std::fs::read_to_string(path)?;
    parse_obj(&text)
}

/// Parses OBJ text into raw geometry.
pub fn parse_obj(text: &str) -> Result<RawGeometry, GeometryError> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    // Full face token ("17//4") -> emitted vertex index.
    let mut seen: HashMap<String, u32> = HashMap::new();

    let mut vertices: Vec<Vertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();

        if let Some(rest) = line.strip_prefix("v ") {
            positions.push(parse_vec3(rest, line_no)?);
        } else if let Some(rest) = line.strip_prefix("vn ") {
            normals.push(parse_vec3(rest, line_no)?);
        } else if let Some(rest) = line.strip_prefix("f ") {
            for token in rest.split_whitespace() {
                if let Some(&index) = seen.get(token) {
                    indices.push(index);
                    continue;
                }

                let mut parts = token.split('/');
                let pos_field = parts.next().unwrap_or("");
                let _tex_field = parts.next();
                let norm_field = parts.next().ok_or_else(|| {
                    parse_err(line_no, format!("face vertex '{token}' has no normal index"))
                })?;

                let pos_index = parse_index(pos_field, positions.len(), line_no)?;
                let norm_index = parse_index(norm_field, normals.len(), line_no)?;

                let index = vertices.len() as u32;
                vertices.push(Vertex {
                    normal: normals[norm_index],
                    position: positions[pos_index],
                });
                seen.insert(token.to_string(), index);
                indices.push(index);
            }
        }
    }

    Ok(RawGeometry::new(vertices, indices))
}

fn parse_vec3(rest: &str, line: usize) -> Result<[f32; 3], GeometryError> {
    let mut out = [0.0f32; 3];
    let mut fields = rest.split_whitespace();
    for slot in &mut out {
        let field = fields
            .next()
            .ok_or_else(|| parse_err(line, "expected three components"))?;
        *slot = field
            .parse()
            .map_err(|_| parse_err(line, format!("invalid float '{field}'")))?;
    }
    Ok(out)
}

/// Parses a 1-based OBJ index and bounds-checks it against `len`.
fn parse_index(field: &str, len: usize, line: usize) -> Result<usize, GeometryError> {
    let value: usize = field
        .parse()
        .map_err(|_| parse_err(line, format!("invalid index '{field}'")))?;
    if value == 0 || value > len {
        return Err(parse_err(
            line,
            format!("index {value} out of range (1..={len})"),
        ));
    }
    Ok(value - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vn 0.0 0.0 1.0
f 1//1 2//1 3//1
";

    #[test]
    fn parses_a_triangle() {
        let geom = parse_obj(TRIANGLE).unwrap();
        assert_eq!(geom.vertices.len(), 3);
        assert_eq!(geom.indices, vec![0, 1, 2]);
        assert_eq!(geom.vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(geom.vertices[1].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn reuses_vertices_across_faces() {
        let text = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
v 1.0 1.0 0.0
vn 0.0 0.0 1.0
f 1//1 2//1 3//1
f 2//1 4//1 3//1
";
        let geom = parse_obj(text).unwrap();
        // Four unique face tokens, six indices.
        assert_eq!(geom.vertices.len(), 4);
        assert_eq!(geom.indices, vec![0, 1, 2, 1, 3, 2]);
    }

    #[test]
    fn distinct_normals_split_vertices() {
        let text = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vn 0.0 0.0 1.0
vn 0.0 1.0 0.0
f 1//1 2//1 3//1
f 1//2 2//2 3//2
";
        let geom = parse_obj(text).unwrap();
        // Same positions with a different normal produce new vertices.
        assert_eq!(geom.vertices.len(), 6);
        assert_eq!(geom.vertices[3].normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn accepts_texture_coordinate_field() {
        let text = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vn 0.0 0.0 1.0
f 1/9/1 2/9/1 3/9/1
";
        let geom = parse_obj(text).unwrap();
        assert_eq!(geom.vertices.len(), 3);
    }

    #[test]
    fn rejects_missing_normal_index() {
        let text = "v 0 0 0\nf 1 1 1\n";
        let err = parse_obj(text).unwrap_err();
        assert!(matches!(err, GeometryError::Parse { line: 2, .. }));
    }

    #[test]
    fn rejects_out_of_range_index() {
        let text = "v 0 0 0\nvn 0 0 1\nf 1//1 2//1 1//1\n";
        let err = parse_obj(text).unwrap_err();
        assert!(matches!(err, GeometryError::Parse { line: 3, .. }));
    }

    #[test]
    fn rejects_bad_float() {
        let err = parse_obj("v 0.0 nope 0.0\n").unwrap_err();
        assert!(matches!(err, GeometryError::Parse { line: 1, .. }));
    }
}
