//! Vertex data and draw calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use glamx::Vec3;
use thiserror::Error;

use crate::context::{BufferHandle, BufferTarget, DrawMode, VertexArrayHandle};
use crate::math::{BoundingBox, Sphere};
use crate::procedural;
use crate::renderer::Renderer;
use crate::resource::{Attribute, AttributeData, Program};

static NEXT_GEOMETRY_ID: AtomicU64 = AtomicU64::new(1);

/// Errors raised while building or editing a [`Geometry`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("failed to create a GPU buffer: {0}")]
    BufferCreation(String),
    #[error("geometry has no attribute named `{0}`")]
    UnknownAttribute(String),
    #[error("attribute `{name}` holds {expected} elements, got {actual}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// The vertex range drawn by [`Geometry::draw`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DrawRange {
    /// First vertex (or index) drawn.
    pub start: u32,
    /// Number of vertices (or indices) drawn.
    pub count: u32,
}

/// Bounds of the `position` attribute, in local space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    pub bbox: BoundingBox,
    pub sphere: Sphere,
}

/// A set of named attribute buffers drawn together.
///
/// An attribute named `index` is uploaded as the element buffer and makes the
/// geometry indexed. Attributes with a divisor make it instanced.
pub struct Geometry {
    id: u64,
    attributes: HashMap<String, Attribute>,
    vertex_arrays: HashMap<String, VertexArrayHandle>,
    draw_range: DrawRange,
    instanced_count: u32,
    is_instanced: bool,
    bounds: Option<Bounds>,
}

impl Geometry {
    /// Creates a geometry and uploads its attributes, in order.
    pub fn new(
        renderer: &mut Renderer,
        attributes: impl IntoIterator<Item = (String, Attribute)>,
    ) -> Result<Geometry, GeometryError> {
        let mut geometry = Geometry {
            id: NEXT_GEOMETRY_ID.fetch_add(1, Ordering::Relaxed),
            attributes: HashMap::new(),
            vertex_arrays: HashMap::new(),
            draw_range: DrawRange::default(),
            instanced_count: 0,
            is_instanced: false,
            bounds: None,
        };

        for (name, attribute) in attributes {
            geometry.add_attribute(renderer, name, attribute)?;
        }

        Ok(geometry)
    }

    /// A centered plane in the XY plane, facing +Z.
    ///
    /// See [`procedural::plane`].
    pub fn plane(
        renderer: &mut Renderer,
        width: f32,
        height: f32,
        width_segments: u32,
        height_segments: u32,
    ) -> Result<Geometry, GeometryError> {
        Geometry::new(
            renderer,
            procedural::plane(width, height, width_segments, height_segments),
        )
    }

    /// Unique identifier of this geometry.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Adds (or replaces) an attribute and uploads it if it has no buffer yet.
    ///
    /// Updates the draw range: the `index` attribute sets the drawn count, other
    /// non-instanced attributes raise it when the geometry is not indexed.
    /// Instanced attributes of different lengths clamp the instance count to the
    /// smallest one.
    pub fn add_attribute(
        &mut self,
        renderer: &mut Renderer,
        name: impl Into<String>,
        mut attribute: Attribute,
    ) -> Result<(), GeometryError> {
        let name = name.into();

        attribute.target = if name == "index" {
            BufferTarget::ElementArray
        } else {
            BufferTarget::Array
        };
        attribute.count = attribute.compute_count();
        attribute.divisor = attribute.instanced;
        attribute.needs_update = false;

        if attribute.buffer.is_none() {
            if attribute.target == BufferTarget::ElementArray {
                // Keep the element binding of whatever vertex array is bound intact.
                renderer.gl().bind_vertex_array(None);
                renderer.state_mut().current_geometry = None;
            }
            upload(renderer, &mut attribute)?;
        }

        if attribute.divisor > 0 {
            self.is_instanced = true;
            let instances = attribute.count * attribute.divisor;
            if self.instanced_count > 0 && self.instanced_count != instances {
                log::warn!("geometry has multiple instanced buffers of different length");
                self.instanced_count = self.instanced_count.min(instances);
            } else {
                self.instanced_count = instances;
            }
        } else if name == "index" {
            self.draw_range.count = attribute.count;
        } else if !self.attributes.contains_key("index") {
            self.draw_range.count = self.draw_range.count.max(attribute.count);
        }

        if name == "position" {
            self.bounds = None;
        }

        let buffer = attribute.buffer;
        if let Some(old) = self.attributes.insert(name, attribute) {
            if let Some(old_buffer) = old.buffer.filter(|b| Some(*b) != buffer) {
                // Cached vertex arrays still point at the replaced buffer.
                self.release_vertex_arrays(renderer);
                delete_buffer(renderer, old_buffer);
            }
        }
        Ok(())
    }

    /// Sets the index attribute.
    pub fn set_index(
        &mut self,
        renderer: &mut Renderer,
        index: impl Into<AttributeData>,
    ) -> Result<(), GeometryError> {
        self.add_attribute(renderer, "index", Attribute::index(index))
    }

    /// Uploads the data of an attribute.
    ///
    /// Attributes without a buffer get a fresh allocation, others are rewritten in
    /// place.
    pub fn update_attribute(
        &mut self,
        renderer: &mut Renderer,
        name: &str,
    ) -> Result<(), GeometryError> {
        let attribute = self
            .attributes
            .get_mut(name)
            .ok_or_else(|| GeometryError::UnknownAttribute(name.to_string()))?;
        upload(renderer, attribute)
    }

    /// Replaces the data of an attribute. The upload happens on the next draw.
    ///
    /// # Errors
    /// The new data must hold as many elements as the current one.
    pub fn update_attribute_data(
        &mut self,
        name: &str,
        data: impl Into<AttributeData>,
    ) -> Result<(), GeometryError> {
        let data = data.into();
        let attribute = self
            .attributes
            .get_mut(name)
            .ok_or_else(|| GeometryError::UnknownAttribute(name.to_string()))?;

        if attribute.data.len() != data.len() {
            return Err(GeometryError::LengthMismatch {
                name: name.to_string(),
                expected: attribute.data.len(),
                actual: data.len(),
            });
        }

        attribute.data = data;
        attribute.needs_update = true;
        if name == "position" {
            self.bounds = None;
        }
        Ok(())
    }

    /// Restricts drawing to `count` vertices (or indices) starting at `start`.
    pub fn set_draw_range(&mut self, start: u32, count: u32) {
        self.draw_range = DrawRange { start, count };
    }

    #[inline]
    pub fn draw_range(&self) -> DrawRange {
        self.draw_range
    }

    /// Overrides the number of instances drawn.
    pub fn set_instanced_count(&mut self, count: u32) {
        self.instanced_count = count;
    }

    #[inline]
    pub fn instanced_count(&self) -> u32 {
        self.instanced_count
    }

    #[inline]
    pub fn is_instanced(&self) -> bool {
        self.is_instanced
    }

    #[inline]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    #[inline]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Binds the buffers of every attribute `program` reads to the current
    /// vertex array.
    ///
    /// Attributes the program reads but this geometry lacks are reported and left
    /// unbound.
    pub fn bind_attributes(&self, renderer: &mut Renderer, program: &Program) {
        for active in program.attribute_locations() {
            let Some(attribute) = self.attributes.get(&active.name) else {
                let _ = renderer
                    .warnings()
                    .warn(format_args!("active attribute {} not being supplied", active.name));
                continue;
            };

            renderer.gl().bind_buffer(attribute.target, attribute.buffer);
            renderer.state_mut().bound_buffer = attribute.buffer;

            // Matrix attributes span one location per column.
            let slots = active.kind.attribute_slots();
            let size = attribute.size / slots;
            let bytes = attribute.data.bytes_per_element() as u32;
            let (stride, offset) = if slots == 1 {
                (0, 0)
            } else {
                (slots * slots * bytes, slots * bytes)
            };

            for i in 0..slots {
                let location = active.location + i;
                renderer.gl().vertex_attrib_pointer(
                    location,
                    size as i32,
                    attribute.data.data_type(),
                    attribute.normalized,
                    (attribute.stride + stride) as i32,
                    (attribute.offset + i * offset) as i32,
                );
                renderer.gl().enable_vertex_attrib_array(location);
                renderer.gl().vertex_attrib_divisor(location, attribute.divisor);
            }
        }

        if let Some(index) = self.attributes.get("index") {
            renderer
                .gl()
                .bind_buffer(BufferTarget::ElementArray, index.buffer);
        }
    }

    /// Draws this geometry with `program`, which must be in use.
    ///
    /// Vertex arrays are cached per attribute layout, so a geometry shared by
    /// several programs with the same attributes is only configured once.
    pub fn draw(&mut self, renderer: &mut Renderer, program: &Program, mode: DrawMode) {
        let key = format!("{}_{}", self.id, program.attribute_order());

        if renderer.state().current_geometry.as_deref() != Some(key.as_str()) {
            let cached = self.vertex_arrays.get(program.attribute_order()).copied();
            let vertex_array = match cached {
                Some(vertex_array) => vertex_array,
                None => match renderer.gl().create_vertex_array() {
                    Ok(vertex_array) => {
                        renderer.gl().bind_vertex_array(Some(vertex_array));
                        self.bind_attributes(renderer, program);
                        let _ = self
                            .vertex_arrays
                            .insert(program.attribute_order().to_string(), vertex_array);
                        vertex_array
                    }
                    Err(e) => {
                        log::error!("Failed to create a vertex array: {e}");
                        return;
                    }
                },
            };
            renderer.gl().bind_vertex_array(Some(vertex_array));
            renderer.state_mut().current_geometry = Some(key);
        }

        for attribute in self.attributes.values_mut() {
            if attribute.needs_update {
                if let Err(e) = upload(renderer, attribute) {
                    log::error!("{e}");
                }
            }
        }

        let DrawRange { start, count } = self.draw_range;
        match self.attributes.get("index") {
            Some(index) => {
                let element_type = index.data.data_type();
                let offset = index.offset + start * element_type.byte_size() as u32;
                if self.is_instanced {
                    renderer.gl().draw_elements_instanced(
                        mode,
                        count as i32,
                        element_type,
                        offset as i32,
                        self.instanced_count as i32,
                    );
                } else {
                    renderer
                        .gl()
                        .draw_elements(mode, count as i32, element_type, offset as i32);
                }
            }
            None => {
                if self.is_instanced {
                    renderer.gl().draw_arrays_instanced(
                        mode,
                        start as i32,
                        count as i32,
                        self.instanced_count as i32,
                    );
                } else {
                    renderer.gl().draw_arrays(mode, start as i32, count as i32);
                }
            }
        }
    }

    /// Computes the bounds of an attribute and caches them.
    ///
    /// # Returns
    /// `None` if the attribute does not exist or is empty.
    pub fn compute_bounds(&mut self, name: &str) -> Option<&Bounds> {
        let attribute = self.attributes.get(name)?;
        let bbox = compute_bounding_box(attribute)?;
        let sphere = compute_bounding_sphere(attribute, &bbox);
        self.bounds = Some(Bounds { bbox, sphere });
        self.bounds.as_ref()
    }

    /// The bounds of the `position` attribute, computed on first use.
    pub fn bounds(&mut self) -> Option<&Bounds> {
        if self.bounds.is_none() {
            let _ = self.compute_bounds("position");
        }
        self.bounds.as_ref()
    }

    /// Deletes the vertex arrays and buffers of this geometry.
    pub fn destroy(&mut self, renderer: &mut Renderer) {
        self.release_vertex_arrays(renderer);

        for attribute in self.attributes.values_mut() {
            if let Some(buffer) = attribute.buffer.take() {
                delete_buffer(renderer, buffer);
            }
        }
    }

    fn release_vertex_arrays(&mut self, renderer: &mut Renderer) {
        for (_, vertex_array) in self.vertex_arrays.drain() {
            renderer.gl().delete_vertex_array(vertex_array);
        }

        let prefix = format!("{}_", self.id);
        if renderer
            .state()
            .current_geometry
            .as_deref()
            .is_some_and(|key| key.starts_with(&prefix))
        {
            renderer.gl().bind_vertex_array(None);
            renderer.state_mut().current_geometry = None;
        }
    }
}

fn delete_buffer(renderer: &mut Renderer, buffer: BufferHandle) {
    if renderer.state().bound_buffer == Some(buffer) {
        renderer.state_mut().bound_buffer = None;
    }
    renderer.gl().delete_buffer(buffer);
}

fn upload(renderer: &mut Renderer, attribute: &mut Attribute) -> Result<(), GeometryError> {
    let (buffer, is_new) = match attribute.buffer {
        Some(buffer) => (buffer, false),
        None => {
            let buffer = renderer
                .gl()
                .create_buffer()
                .map_err(GeometryError::BufferCreation)?;
            attribute.buffer = Some(buffer);
            (buffer, true)
        }
    };

    renderer.bind_buffer(attribute.target, Some(buffer));
    if is_new {
        renderer
            .gl()
            .buffer_data(attribute.target, attribute.data.as_bytes(), attribute.usage);
    } else {
        renderer
            .gl()
            .buffer_sub_data(attribute.target, 0, attribute.data.as_bytes());
    }
    attribute.needs_update = false;
    Ok(())
}

/// Iterates over the first three components of every vertex of `attribute`.
fn vertices(attribute: &Attribute) -> impl Iterator<Item = Vec3> + '_ {
    let bytes = attribute.data.bytes_per_element() as u32;
    let step = if attribute.stride > 0 {
        (attribute.stride / bytes).max(1)
    } else {
        attribute.size
    } as usize;
    let first = (attribute.offset / bytes) as usize;
    let components = attribute.size.min(3) as usize;
    let data = &attribute.data;

    (first..data.len()).step_by(step).map(move |i| {
        let c = |k: usize| {
            if k < components {
                data.get_f32(i + k).unwrap_or(0.0)
            } else {
                0.0
            }
        };
        Vec3::new(c(0), c(1), c(2))
    })
}

fn compute_bounding_box(attribute: &Attribute) -> Option<BoundingBox> {
    vertices(attribute).fold(None, |bbox: Option<BoundingBox>, v| {
        Some(match bbox {
            Some(b) => BoundingBox {
                min: b.min.min(v),
                max: b.max.max(v),
            },
            None => BoundingBox { min: v, max: v },
        })
    })
}

fn compute_bounding_sphere(attribute: &Attribute, bbox: &BoundingBox) -> Sphere {
    let center = bbox.center();
    let max_sq = vertices(attribute)
        .map(|v| center.distance_squared(v))
        .fold(0.0f32, f32::max);

    Sphere {
        center,
        radius: max_sq.sqrt(),
    }
}
