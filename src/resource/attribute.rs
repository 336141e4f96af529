//! Vertex attribute streams.

use crate::context::{BufferHandle, BufferTarget, BufferUsage, DataType};

/// The typed content of an attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeData {
    F32(Vec<f32>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl AttributeData {
    /// Number of scalar elements.
    pub fn len(&self) -> usize {
        match self {
            AttributeData::F32(v) => v.len(),
            AttributeData::U8(v) => v.len(),
            AttributeData::U16(v) => v.len(),
            AttributeData::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The GL component type of the elements.
    pub fn data_type(&self) -> DataType {
        match self {
            AttributeData::F32(_) => DataType::Float,
            AttributeData::U8(_) => DataType::UnsignedByte,
            AttributeData::U16(_) => DataType::UnsignedShort,
            AttributeData::U32(_) => DataType::UnsignedInt,
        }
    }

    /// Size of one element, in bytes.
    #[inline]
    pub fn bytes_per_element(&self) -> usize {
        self.data_type().byte_size()
    }

    /// The raw bytes uploaded to the GPU.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            AttributeData::F32(v) => bytemuck::cast_slice(v),
            AttributeData::U8(v) => v,
            AttributeData::U16(v) => bytemuck::cast_slice(v),
            AttributeData::U32(v) => bytemuck::cast_slice(v),
        }
    }

    /// Total size, in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.len() * self.bytes_per_element()
    }

    /// The element at `i`, converted to `f32`.
    pub fn get_f32(&self, i: usize) -> Option<f32> {
        match self {
            AttributeData::F32(v) => v.get(i).copied(),
            AttributeData::U8(v) => v.get(i).map(|e| *e as f32),
            AttributeData::U16(v) => v.get(i).map(|e| *e as f32),
            AttributeData::U32(v) => v.get(i).map(|e| *e as f32),
        }
    }
}

impl From<Vec<f32>> for AttributeData {
    fn from(v: Vec<f32>) -> Self {
        AttributeData::F32(v)
    }
}

impl From<Vec<u8>> for AttributeData {
    fn from(v: Vec<u8>) -> Self {
        AttributeData::U8(v)
    }
}

impl From<Vec<u16>> for AttributeData {
    fn from(v: Vec<u16>) -> Self {
        AttributeData::U16(v)
    }
}

impl From<Vec<u32>> for AttributeData {
    fn from(v: Vec<u32>) -> Self {
        AttributeData::U32(v)
    }
}

/// A named data stream of a [`Geometry`](super::Geometry).
///
/// The fields are filled in by [`Geometry::add_attribute`](super::Geometry::add_attribute):
/// the element count, the buffer handle, the binding target and the divisor.
#[derive(Clone, Debug)]
pub struct Attribute {
    pub(crate) data: AttributeData,
    pub(crate) size: u32,
    pub(crate) normalized: bool,
    pub(crate) stride: u32,
    pub(crate) offset: u32,
    pub(crate) instanced: u32,
    pub(crate) divisor: u32,
    pub(crate) usage: BufferUsage,
    pub(crate) target: BufferTarget,
    pub(crate) count: u32,
    pub(crate) buffer: Option<BufferHandle>,
    pub(crate) needs_update: bool,
}

impl Attribute {
    /// An attribute with `size` components per vertex.
    pub fn new(size: u32, data: impl Into<AttributeData>) -> Attribute {
        Attribute {
            data: data.into(),
            size: size.max(1),
            normalized: false,
            stride: 0,
            offset: 0,
            instanced: 0,
            divisor: 0,
            usage: BufferUsage::StaticDraw,
            target: BufferTarget::Array,
            count: 0,
            buffer: None,
            needs_update: false,
        }
    }

    /// An index attribute.
    pub fn index(data: impl Into<AttributeData>) -> Attribute {
        Attribute::new(1, data)
    }

    /// Whether integer data is normalized to `[0, 1]` when read by the shader.
    pub fn normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }

    /// Byte distance between consecutive vertices.
    pub fn stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    /// Byte offset of the first vertex.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Makes this attribute per-instance, advancing once every `divisor` instances.
    pub fn instanced(mut self, divisor: u32) -> Self {
        self.instanced = divisor;
        self
    }

    pub fn usage(mut self, usage: BufferUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Reuses an already uploaded buffer instead of creating one.
    pub fn with_buffer(mut self, buffer: BufferHandle) -> Self {
        self.buffer = Some(buffer);
        self
    }

    #[inline]
    pub fn data(&self) -> &AttributeData {
        &self.data
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of vertices (or instances, or indices) in this attribute.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub fn divisor(&self) -> u32 {
        self.divisor
    }

    #[inline]
    pub fn buffer(&self) -> Option<BufferHandle> {
        self.buffer
    }

    #[inline]
    pub fn target(&self) -> BufferTarget {
        self.target
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    /// Whether the data changed since the last upload.
    #[inline]
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    pub(crate) fn compute_count(&self) -> u32 {
        if self.stride > 0 {
            (self.data.byte_len() / self.stride as usize) as u32
        } else {
            (self.data.len() / self.size as usize) as u32
        }
    }
}
