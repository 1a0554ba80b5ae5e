//! Buffers handed to the rendering collaborator.
//!
//! The renderer reads mesh columns directly as image-shaped arrays. A
//! [`BufferDescriptor`] states how each flat buffer is padded; the
//! [`PullBuffer`] lists one `[edge, vertex, material]` triple per face corner
//! so a shader can pull everything else by index.

use serde::{Deserialize, Serialize};

use crate::mesh_error::MeshError;
use crate::slab::{Column, RectDims, compute_rect_dimensions};
use crate::topology::edge::EdgeProvider;
use crate::topology::handle::{EdgeHandle, FaceId};
use crate::topology::mesh::TriMesh;

/// Padding of one flat buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferDescriptor {
    /// Rows per image line.
    pub row_width: usize,
    /// Image lines.
    pub row_count: usize,
    /// Elements per row.
    pub stride: usize,
    /// Live rows; everything past them is padding.
    pub len: usize,
}

impl BufferDescriptor {
    fn new(dims: RectDims, stride: usize, len: usize) -> Self {
        BufferDescriptor {
            row_width: dims.row_width,
            row_count: dims.row_count,
            stride,
            len,
        }
    }

    /// Describe `column` as it is currently allocated.
    pub fn of<T: bytemuck::Pod>(column: &Column<T>, max_row_width: usize) -> Result<Self, MeshError> {
        let dims = compute_rect_dimensions(column.capacity(), column.stride(), max_row_width)?;
        Ok(Self::new(dims, column.stride(), column.len()))
    }

    /// Elements in the padded buffer.
    pub fn padded_len(&self) -> usize {
        self.row_width * self.row_count * self.stride
    }
}

/// Descriptors of every buffer a renderer reads from one mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderBuffers {
    pub position: BufferDescriptor,
    pub normal: BufferDescriptor,
    pub material: BufferDescriptor,
    pub pull: BufferDescriptor,
}

/// Per-corner index triples, padded to a rectangle with `-1`.
#[derive(Debug, Clone, PartialEq)]
pub struct PullBuffer {
    data: Vec<i32>,
    descriptor: BufferDescriptor,
}

impl PullBuffer {
    pub const STRIDE: usize = 3;

    pub fn from_mesh(mesh: &TriMesh) -> Result<Self, MeshError> {
        let edges = mesh.edge_tables();
        let corners = edges.directed_len();
        let dims = compute_rect_dimensions(corners, Self::STRIDE, mesh.config().max_row_width)?;
        let descriptor = BufferDescriptor::new(dims, Self::STRIDE, corners);
        let mut data = Vec::with_capacity(descriptor.padded_len());
        for d in 0..corners as u32 {
            let e = EdgeHandle::Directed(d);
            let material = mesh.face_table().material(FaceId(d / 3));
            data.extend_from_slice(&[d as i32, edges.origin(e).0 as i32, material.0 as i32]);
        }
        data.resize(descriptor.padded_len(), -1);
        Ok(PullBuffer { data, descriptor })
    }

    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// `[edge, vertex, material]` of corner `i`.
    pub fn triple(&self, i: usize) -> Option<[i32; 3]> {
        (i < self.descriptor.len).then(|| {
            let s = &self.data[i * Self::STRIDE..(i + 1) * Self::STRIDE];
            [s[0], s[1], s[2]]
        })
    }

    /// Padded buffer, ready for upload.
    pub fn as_slice(&self) -> &[i32] {
        &self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

impl TriMesh {
    /// Padding of the position, normal, material and pull buffers.
    pub fn render_buffers(&self) -> Result<RenderBuffers, MeshError> {
        let max = self.config().max_row_width;
        let vertices = self.vertex_table().slab.columns();
        let pull_dims = compute_rect_dimensions(self.edge_tables().directed_len(), PullBuffer::STRIDE, max)?;
        Ok(RenderBuffers {
            position: BufferDescriptor::of(&vertices.position, max)?,
            normal: BufferDescriptor::of(&vertices.normal, max)?,
            material: BufferDescriptor::of(&self.face_table().slab.columns().material, max)?,
            pull: BufferDescriptor::new(pull_dims, PullBuffer::STRIDE, self.edge_tables().directed_len()),
        })
    }
}
