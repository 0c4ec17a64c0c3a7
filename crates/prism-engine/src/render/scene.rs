//! The one triangle and the data the shaders read.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::rhi::{VertexAttribute, VertexBufferLayout, VertexFormat};

/// Interleaved vertex: position then color.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    pub const STRIDE: u64 = std::mem::size_of::<Vertex>() as u64;

    pub const ATTRIBUTES: [VertexAttribute; 2] = [
        VertexAttribute {
            location: 0,
            offset: 0,
            format: VertexFormat::Float32x3,
        },
        VertexAttribute {
            location: 1,
            offset: 12,
            format: VertexFormat::Float32x3,
        },
    ];

    pub fn layout() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            stride: Self::STRIDE,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

pub const TRIANGLE_VERTICES: [Vertex; 3] = [
    Vertex {
        position: [1.0, -1.0, 0.0],
        color: [1.0, 0.0, 0.0],
    },
    Vertex {
        position: [-1.0, -1.0, 0.0],
        color: [0.0, 1.0, 0.0],
    },
    Vertex {
        position: [0.0, 1.0, 0.0],
        color: [0.0, 0.0, 1.0],
    },
];

pub const TRIANGLE_INDICES: [u32; 3] = [0, 1, 2];

/// Uniform block at bind set 0, binding 0.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ShaderData {
    pub projection: Mat4,
    pub model: Mat4,
    pub view: Mat4,
}

impl ShaderData {
    pub const SIZE: u64 = std::mem::size_of::<ShaderData>() as u64;

    pub fn new(projection: Mat4, view: Mat4) -> Self {
        Self {
            projection,
            model: Mat4::IDENTITY,
            view,
        }
    }
}

/// Perspective projection with a [0, 1] depth range.
///
/// Passing `near > far` yields reverse-Z: near geometry maps towards depth 1.
pub fn projection(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect, near, far)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec3, Vec4};

    #[test]
    fn vertex_layout_is_packed() {
        assert_eq!(Vertex::STRIDE, 24);
        assert_eq!(std::mem::size_of_val(&TRIANGLE_VERTICES), 72);
        assert_eq!(std::mem::size_of_val(&TRIANGLE_INDICES), 12);
        let [pos, color] = Vertex::ATTRIBUTES;
        assert_eq!((pos.location, pos.offset), (0, 0));
        assert_eq!((color.location, color.offset), (1, 12));
    }

    #[test]
    fn vertex_bytes_interleave_position_and_color() {
        let bytes: &[u8] = bytemuck::cast_slice(&TRIANGLE_VERTICES);
        let floats: &[f32] = bytemuck::cast_slice(bytes);
        assert_eq!(&floats[..6], &[1.0, -1.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn shader_data_is_three_matrices() {
        assert_eq!(ShaderData::SIZE, 192);
        let data = ShaderData::new(Mat4::from_scale(Vec3::splat(2.0)), Mat4::IDENTITY);
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&data));
        assert_eq!(floats[0], 2.0);
        assert_eq!(&floats[16..32], Mat4::IDENTITY.to_cols_array().as_slice());
    }

    #[test]
    fn swapped_planes_give_reverse_z() {
        let proj = projection(70.0, 1024.0 / 768.0, 10000.0, 0.1);
        let depth = |z: f32| {
            let clip = proj * Vec4::new(0.0, 0.0, z, 1.0);
            clip.z / clip.w
        };
        assert!((depth(-0.1) - 1.0).abs() < 1e-4);
        assert!(depth(-10000.0).abs() < 1e-4);
        assert!(depth(-1.0) > depth(-100.0));
    }
}
