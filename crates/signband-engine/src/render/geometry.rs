//! Base meshes for the band.
//!
//! The sign is a slightly folded unit quad (two corners pushed to `z = 0.05`),
//! the arrow a flat triangle in the x/z plane. Both carry per-face normals.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use signband_model::{GridConfig, MAX_GRID_LINES};

// ── lit mesh vertex ───────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3, // normal
        2 => Float32x2  // uv
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

const SIGN_POSITIONS: [[f32; 3]; 6] = [
    [-1.0, 1.0, 0.0],
    [1.0, 1.0, 0.05],
    [1.0, -1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, -1.0, 0.05],
    [-1.0, 1.0, 0.0],
];

const ARROW_POSITIONS: [[f32; 3]; 3] = [
    [-0.2, 0.0, -0.2],
    [0.0, 0.0, 0.2],
    [0.2, 0.0, -0.2],
];

/// Two triangles, uv `(0, 0)` at the top-left corner.
pub fn sign_mesh() -> Vec<MeshVertex> {
    lit_triangles(&SIGN_POSITIONS, |p| [(p[0] + 1.0) * 0.5, (1.0 - p[1]) * 0.5])
}

pub fn arrow_mesh() -> Vec<MeshVertex> {
    lit_triangles(&ARROW_POSITIONS, |p| [(p[0] + 0.2) / 0.4, (p[2] + 0.2) / 0.4])
}

fn lit_triangles(positions: &[[f32; 3]], uv: impl Fn([f32; 3]) -> [f32; 2]) -> Vec<MeshVertex> {
    positions
        .chunks_exact(3)
        .flat_map(|tri| {
            let normal = face_normal(tri).to_array();
            tri.iter().map(move |&p| (p, normal))
        })
        .map(|(position, normal)| MeshVertex {
            position,
            normal,
            uv: uv(position),
        })
        .collect()
}

fn face_normal(tri: &[[f32; 3]]) -> Vec3 {
    let a = Vec3::from_array(tri[0]);
    let b = Vec3::from_array(tri[1]);
    let c = Vec3::from_array(tri[2]);
    (b - a).cross(c - a).normalize_or_zero()
}

// ── unlit decor vertex ────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct DecorVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl DecorVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x4  // color
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<DecorVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Line-list vertices for the floor grid.
///
/// Lines run along z at every `spacing_x` step across the x span, then along x
/// at every `spacing_z` step across the z span. Both ends are inclusive.
pub fn grid_lines(grid: &GridConfig) -> Vec<DecorVertex> {
    let xs = steps(grid.x_span.min, grid.x_span.max, grid.spacing_x);
    let zs = steps(grid.z_span.min, grid.z_span.max, grid.spacing_z);

    let vertex = |x: f32, z: f32| DecorVertex {
        position: [x, grid.y, z],
        color: grid.color,
    };

    let mut out = Vec::with_capacity((xs.len() + zs.len()) * 2);
    for &x in &xs {
        out.push(vertex(x, grid.z_span.min));
        out.push(vertex(x, grid.z_span.max));
    }
    for &z in &zs {
        out.push(vertex(grid.x_span.min, z));
        out.push(vertex(grid.x_span.max, z));
    }
    out
}

/// `min, min + step, ...` up to and including `max`, stepped by index so
/// rounding does not accumulate.
fn steps(min: f32, max: f32, step: f32) -> Vec<f32> {
    if step.is_nan() || step <= 0.0 || max < min {
        return Vec::new();
    }
    let count = (((max - min) / step).floor() as usize).saturating_add(1).min(MAX_GRID_LINES);
    (0..count).map(|i| min + i as f32 * step).collect()
}

const TARGET_POSITIONS: [[f32; 3]; 6] = [
    [-0.3, 0.3, 0.0],
    [0.0, -0.6, 0.0],
    [0.3, 0.3, 0.0],
    [0.0, 0.3, -0.3],
    [0.0, -0.6, 0.0],
    [0.0, 0.3, 0.3],
];

/// Hover marker: two crossed triangles pointing down -Y, colored by face
/// normal (`n * 0.5 + 0.5`).
pub fn target_marker() -> Vec<DecorVertex> {
    TARGET_POSITIONS
        .chunks_exact(3)
        .flat_map(|tri| {
            let n = face_normal(tri) * 0.5 + Vec3::splat(0.5);
            let color = [n.x, n.y, n.z, 1.0];
            tri.iter().map(move |&position| DecorVertex { position, color })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_strides_match_shader_inputs() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 32);
        assert_eq!(std::mem::size_of::<DecorVertex>(), 28);
    }

    #[test]
    fn sign_is_two_lit_triangles() {
        let mesh = sign_mesh();
        assert_eq!(mesh.len(), 6);
        for v in &mesh {
            let n = Vec3::from_array(v.normal);
            assert!((n.length() - 1.0).abs() < 1e-5);
            // Folded corners tilt the faces only slightly off +Z/-Z.
            assert!(n.z.abs() > 0.99);
            assert!((0.0..=1.0).contains(&v.uv[0]) && (0.0..=1.0).contains(&v.uv[1]));
        }
        assert_eq!(mesh[0].uv, [0.0, 0.0]);
        assert_eq!(mesh[2].uv, [1.0, 1.0]);
    }

    #[test]
    fn arrow_faces_up() {
        let mesh = arrow_mesh();
        assert_eq!(mesh.len(), 3);
        for v in &mesh {
            assert!((Vec3::from_array(v.normal) - Vec3::Y).length() < 1e-6);
        }
    }

    #[test]
    fn grid_covers_span_inclusively() {
        let grid = GridConfig::default();
        let lines = grid_lines(&grid);
        // 400 / 3 and 800 / 6 both give 133 whole steps plus the starting line.
        assert_eq!(lines.len(), (134 + 134) * 2);
        assert!(lines.iter().all(|v| v.position[1] == grid.y));
        assert_eq!(lines[0].position, [-200.0, -320.0, -400.0]);
        assert_eq!(lines[1].position, [-200.0, -320.0, 400.0]);
    }

    #[test]
    fn grid_spacing_that_divides_exactly_reaches_the_far_edge() {
        let grid = GridConfig {
            x_span: signband_model::Span::new(0.0, 10.0),
            z_span: signband_model::Span::new(0.0, 10.0),
            spacing_x: 5.0,
            spacing_z: 10.0,
            ..GridConfig::default()
        };
        let lines = grid_lines(&grid);
        assert_eq!(lines.len(), (3 + 2) * 2);
        assert_eq!(lines[4].position[0], 10.0);
    }

    #[test]
    fn unvalidated_fine_spacing_is_capped() {
        let grid = GridConfig {
            spacing_x: 1e-6,
            ..GridConfig::default()
        };
        let lines = grid_lines(&grid);
        assert_eq!(lines.len(), (MAX_GRID_LINES + 134) * 2);
    }

    #[test]
    fn marker_is_colored_by_normal() {
        let marker = target_marker();
        assert_eq!(marker.len(), 6);
        let close = |c: [f32; 4], want: [f32; 4]| {
            c.iter().zip(want).all(|(a, b)| (a - b).abs() < 1e-6)
        };
        assert!(close(marker[0].color, [0.5, 0.5, 1.0, 1.0]));
        assert!(close(marker[3].color, [0.0, 0.5, 0.5, 1.0]));
    }
}
