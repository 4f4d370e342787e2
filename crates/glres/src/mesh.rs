use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use tracing::debug;

use crate::context::GpuContext;
use crate::device::Device;
use crate::error::{GpuError, Result};
use crate::program::Program;
use crate::types::{BufferTarget, IndexType};

/// Uniform every mesh draw writes its model-view matrix into.
pub const MODEL_VIEW_UNIFORM: &str = "uMVMatrix";

pub const VERTEX_STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;
pub const POSITION_OFFSET: u32 = 0;
pub const UV_OFFSET: u32 = 12;
pub const NORMAL_OFFSET: u32 = 20;

/// Interleaved vertex as laid out in the vertex buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex {
    pub const fn new(position: [f32; 3], uv: [f32; 2], normal: [f32; 3]) -> Self {
        Self {
            position,
            uv,
            normal,
        }
    }
}

/// CPU-side triangle list ready to be uploaded as a [`Mesh`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Axis-aligned box centred on the origin.
    ///
    /// Each face has its own four vertices so normals and texture seams stay
    /// per face; faces come in the order front, back, right, left, top,
    /// bottom.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let (w, h, d) = (width / 2.0, height / 2.0, depth / 2.0);
        let face = |normal: [f32; 3], corners: [([f32; 3], [f32; 2]); 4]| {
            corners.map(|(position, uv)| Vertex::new(position, uv, normal))
        };

        let faces = [
            face(
                [0.0, 0.0, 1.0],
                [
                    ([-w, -h, d], [0.0, 0.0]),
                    ([w, -h, d], [1.0, 0.0]),
                    ([w, h, d], [1.0, 1.0]),
                    ([-w, h, d], [0.0, 1.0]),
                ],
            ),
            face(
                [0.0, 0.0, -1.0],
                [
                    ([w, -h, -d], [0.0, 0.0]),
                    ([-w, -h, -d], [1.0, 0.0]),
                    ([-w, h, -d], [1.0, 1.0]),
                    ([w, h, -d], [0.0, 1.0]),
                ],
            ),
            face(
                [1.0, 0.0, 0.0],
                [
                    ([w, -h, d], [0.0, 0.0]),
                    ([w, -h, -d], [1.0, 0.0]),
                    ([w, h, -d], [1.0, 1.0]),
                    ([w, h, d], [0.0, 1.0]),
                ],
            ),
            face(
                [-1.0, 0.0, 0.0],
                [
                    ([-w, -h, d], [1.0, 0.0]),
                    ([-w, -h, -d], [0.0, 0.0]),
                    ([-w, h, -d], [0.0, 1.0]),
                    ([-w, h, d], [1.0, 1.0]),
                ],
            ),
            face(
                [0.0, 1.0, 0.0],
                [
                    ([-w, h, d], [0.0, 0.0]),
                    ([w, h, d], [1.0, 0.0]),
                    ([w, h, -d], [1.0, 1.0]),
                    ([-w, h, -d], [0.0, 1.0]),
                ],
            ),
            face(
                [0.0, -1.0, 0.0],
                [
                    ([w, -h, -d], [0.0, 0.0]),
                    ([-w, -h, -d], [1.0, 0.0]),
                    ([-w, -h, d], [1.0, 1.0]),
                    ([w, -h, d], [0.0, 1.0]),
                ],
            ),
        ];

        Self {
            vertices: faces.into_iter().flatten().collect(),
            indices: CUBOID_INDICES.iter().map(|&index| u32::from(index)).collect(),
        }
    }

    /// Smallest and largest corner of the vertex positions.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut positions = self.vertices.iter().map(|vertex| Vec3::from(vertex.position));
        let first = positions.next()?;
        Some(positions.fold((first, first), |(min, max), position| {
            (min.min(position), max.max(position))
        }))
    }

    fn check(&self) -> std::result::Result<(), String> {
        if self.indices.is_empty() {
            return Err("geometry has no indices".to_string());
        }
        if self.indices.len() % 3 != 0 {
            return Err(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            ));
        }
        let vertex_count = self.vertices.len();
        if let Some(index) = self
            .indices
            .iter()
            .find(|&&index| index as usize >= vertex_count)
        {
            return Err(format!(
                "index {index} out of range for {vertex_count} vertices"
            ));
        }
        Ok(())
    }
}

#[rustfmt::skip]
const CUBOID_INDICES: [u8; 36] = [
    0, 1, 2, 0, 2, 3,
    6, 7, 4, 4, 5, 6,
    8, 9, 10, 8, 10, 11,
    12, 15, 14, 14, 13, 12,
    19, 16, 17, 18, 19, 17,
    20, 23, 22, 22, 21, 20,
];

/// Static vertex and index buffers plus a model transform.
pub struct Mesh<D: Device> {
    vertex_buffer: D::Buffer,
    index_buffer: D::Buffer,
    index_count: u32,
    index_type: IndexType,
    dimensions: Vec3,
    /// Object-to-world transform; applied on the left of the view matrix.
    pub transform: Mat4,
}

impl<D: Device> Mesh<D> {
    /// Uploads a `width` x `height` x `depth` box.
    pub fn new_box(ctx: &mut GpuContext<D>, width: f32, height: f32, depth: f32) -> Result<Self> {
        Self::from_geometry(ctx, &Geometry::cuboid(width, height, depth))
    }

    /// Uploads `geometry` once into two static buffers.
    ///
    /// Indices are narrowed to the smallest type that can address every
    /// vertex. Both buffer bindings are reset to null afterwards.
    pub fn from_geometry(ctx: &mut GpuContext<D>, geometry: &Geometry) -> Result<Self> {
        if let Err(reason) = geometry.check() {
            return Err(ctx.fail(GpuError::InvalidArguments(reason)));
        }
        let max_index = geometry.indices.iter().copied().max().unwrap_or(0);
        let index_type = IndexType::smallest_for(max_index);
        let index_bytes = encode_indices(&geometry.indices, index_type);

        let vertex_buffer = match ctx.device_mut().create_buffer() {
            Ok(buffer) => buffer,
            Err(reason) => {
                return Err(ctx.fail(GpuError::Allocation {
                    kind: "vertex buffer",
                    reason,
                }))
            }
        };
        ctx.bind_buffer(BufferTarget::Array, Some(vertex_buffer));
        ctx.device_mut()
            .buffer_data(BufferTarget::Array, bytemuck::cast_slice(&geometry.vertices));
        ctx.bind_buffer(BufferTarget::Array, None);

        let index_buffer = match ctx.device_mut().create_buffer() {
            Ok(buffer) => buffer,
            Err(reason) => {
                ctx.delete_buffer(vertex_buffer);
                return Err(ctx.fail(GpuError::Allocation {
                    kind: "index buffer",
                    reason,
                }));
            }
        };
        ctx.bind_buffer(BufferTarget::ElementArray, Some(index_buffer));
        ctx.device_mut()
            .buffer_data(BufferTarget::ElementArray, &index_bytes);
        ctx.bind_buffer(BufferTarget::ElementArray, None);

        let dimensions = geometry
            .bounds()
            .map(|(min, max)| max - min)
            .unwrap_or(Vec3::ZERO);
        debug!(
            vertices = geometry.vertices.len(),
            indices = geometry.indices.len(),
            index_type = ?index_type,
            "mesh uploaded"
        );

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: geometry.indices.len() as u32,
            index_type,
            dimensions,
            transform: Mat4::IDENTITY,
        })
    }

    /// Draws every index with `program`, which must already be in use.
    ///
    /// The model-view matrix `transform * view` goes into
    /// [`MODEL_VIEW_UNIFORM`]. A program without that uniform is reported
    /// and returned as [`GpuError::NotFound`] and nothing is drawn. Buffer
    /// and attribute bindings are left in place for the caller.
    pub fn draw(&self, ctx: &mut GpuContext<D>, view: &Mat4, program: &Program<D>) -> Result<()> {
        let model_view = self.transform * *view;
        program.set_mat4(ctx, MODEL_VIEW_UNIFORM, &model_view)?;

        ctx.bind_buffer(BufferTarget::Array, Some(self.vertex_buffer));
        ctx.bind_buffer(BufferTarget::ElementArray, Some(self.index_buffer));

        let device = ctx.device_mut();
        for (index, size, offset) in [(0, 3, POSITION_OFFSET), (1, 2, UV_OFFSET), (2, 3, NORMAL_OFFSET)] {
            device.enable_vertex_attrib_array(index);
            device.vertex_attrib_pointer_f32(index, size, VERTEX_STRIDE, offset);
        }
        device.draw_elements(self.index_count, self.index_type, 0);
        Ok(())
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    /// Extent of the geometry along each axis.
    pub fn dimensions(&self) -> Vec3 {
        self.dimensions
    }

    pub fn vertex_buffer(&self) -> D::Buffer {
        self.vertex_buffer
    }

    pub fn index_buffer(&self) -> D::Buffer {
        self.index_buffer
    }

    pub fn delete(self, ctx: &mut GpuContext<D>) {
        ctx.delete_buffer(self.vertex_buffer);
        ctx.delete_buffer(self.index_buffer);
    }
}

impl<D: Device> std::fmt::Debug for Mesh<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("vertex_buffer", &self.vertex_buffer)
            .field("index_buffer", &self.index_buffer)
            .field("index_count", &self.index_count)
            .field("index_type", &self.index_type)
            .field("dimensions", &self.dimensions)
            .field("transform", &self.transform)
            .finish()
    }
}

fn encode_indices(indices: &[u32], index_type: IndexType) -> Vec<u8> {
    match index_type {
        IndexType::U8 => indices.iter().map(|&index| index as u8).collect(),
        IndexType::U16 => {
            let narrowed: Vec<u16> = indices.iter().map(|&index| index as u16).collect();
            bytemuck::cast_slice(&narrowed).to_vec()
        }
        IndexType::U32 => bytemuck::cast_slice(indices).to_vec(),
    }
}
