use bytemuck::{Pod, Zeroable};

use crate::canvas::Rect;
use crate::viewport::Viewport;

/// Vertices emitted per rectangle (two triangles, no index buffer).
pub(crate) const VERTICES_PER_RECT: usize = 6;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub(crate) struct QuadVertex {
    pub position: [f32; 3],
    pub tex_coord: [f32; 2],
}

const QUAD_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

impl QuadVertex {
    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &QUAD_ATTRIBUTES,
        }
    }
}

/// Expands `rect` into two triangles.
///
/// Positions are the corners normalized to the canvas (y down, z = 0), the
/// unit-square convention WebGL sketch vertex shaders expand with
/// `position.xy * 2.0 - 1.0`. Texture coordinates run 0..1 across the rect.
pub(crate) fn rect_vertices(rect: Rect, canvas: Viewport) -> [QuadVertex; VERTICES_PER_RECT] {
    let width = canvas.width as f32;
    let height = canvas.height as f32;
    let left = rect.x / width;
    let right = (rect.x + rect.width) / width;
    let top = rect.y / height;
    let bottom = (rect.y + rect.height) / height;

    let corner = |x: f32, y: f32, u: f32, v: f32| QuadVertex {
        position: [x, y, 0.0],
        tex_coord: [u, v],
    };
    let top_left = corner(left, top, 0.0, 0.0);
    let bottom_left = corner(left, bottom, 0.0, 1.0);
    let top_right = corner(right, top, 1.0, 0.0);
    let bottom_right = corner(right, bottom, 1.0, 1.0);

    [
        top_left,
        bottom_left,
        top_right,
        top_right,
        bottom_left,
        bottom_right,
    ]
}
