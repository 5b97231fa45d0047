/// Vertex and uniform wire layouts
///
/// Both structs are uploaded byte-for-byte and must match the shaders:
/// one vertex binding with attributes 0/1/2, and a uniform block of three
/// consecutive column-major 4x4 matrices.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::graphics_device::{Format, VertexAttribute};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

    pub fn new(pos: [f32; 3], color: [f32; 4], uv: [f32; 2]) -> Self {
        Self { pos, color, uv }
    }

    /// Attribute 0 = position, 1 = color, 2 = texture coordinate
    pub fn attributes() -> Vec<VertexAttribute> {
        vec![
            VertexAttribute {
                location: 0,
                format: Format::R32G32B32_SFLOAT,
                offset: std::mem::offset_of!(Vertex, pos) as u32,
            },
            VertexAttribute {
                location: 1,
                format: Format::R32G32B32A32_SFLOAT,
                offset: std::mem::offset_of!(Vertex, color) as u32,
            },
            VertexAttribute {
                location: 2,
                format: Format::R32G32_SFLOAT,
                offset: std::mem::offset_of!(Vertex, uv) as u32,
            },
        ]
    }
}

/// Binding 0: model, view, projection
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UniformBufferObject {
    pub model: Mat4,
    pub view: Mat4,
    pub proj: Mat4,
}

impl UniformBufferObject {
    pub const SIZE: u64 = std::mem::size_of::<UniformBufferObject>() as u64;
}

#[cfg(test)]
#[path = "vertex_tests.rs"]
mod tests;
