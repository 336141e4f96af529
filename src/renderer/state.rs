use std::collections::HashMap;

use crate::context::{
    BlendEquation, BlendFactor, BufferHandle, Capability, DepthFunc, Face, FramebufferHandle,
    FrontFace, ProgramHandle, UniformLocation,
};

/// Source and destination blend factors, with optional separate alpha factors.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlendFunc {
    pub src: BlendFactor,
    pub dst: BlendFactor,
    pub src_alpha: Option<BlendFactor>,
    pub dst_alpha: Option<BlendFactor>,
}

impl BlendFunc {
    /// Blend factors shared by the color and alpha channels.
    pub fn new(src: BlendFactor, dst: BlendFactor) -> Self {
        BlendFunc {
            src,
            dst,
            src_alpha: None,
            dst_alpha: None,
        }
    }

    /// Blend factors with distinct alpha factors.
    pub fn separate(
        src: BlendFactor,
        dst: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) -> Self {
        BlendFunc {
            src,
            dst,
            src_alpha: Some(src_alpha),
            dst_alpha: Some(dst_alpha),
        }
    }
}

impl Default for BlendFunc {
    fn default() -> Self {
        BlendFunc::new(BlendFactor::One, BlendFactor::Zero)
    }
}

/// Color and alpha blend equations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlendEquationState {
    pub mode_rgb: BlendEquation,
    pub mode_alpha: Option<BlendEquation>,
}

/// Last value written to a uniform location.
#[derive(Clone, Debug, PartialEq)]
pub enum UniformCacheEntry {
    Floats(Vec<f32>),
    Ints(Vec<i32>),
}

/// The pipeline state last applied to the context.
///
/// Every cached setter of the [`Renderer`](super::Renderer) compares against this
/// record before touching the context. It must only ever be updated together with
/// the matching context call.
#[derive(Clone, Debug)]
pub struct RenderState {
    pub blend_func: BlendFunc,
    pub blend_equation: BlendEquationState,
    pub cull_face: Option<Face>,
    pub front_face: FrontFace,
    pub depth_mask: bool,
    pub depth_func: DepthFunc,
    pub unpack_alignment: i32,
    pub framebuffer: Option<FramebufferHandle>,
    pub viewport: (u32, u32),
    /// Id of the [`Texture`](crate::resource::Texture) bound to each texture unit.
    pub texture_units: Vec<Option<u64>>,
    pub active_texture_unit: u32,
    pub bound_buffer: Option<BufferHandle>,
    pub current_program: Option<ProgramHandle>,
    /// `"{geometry id}_{attribute order}"` of the last bound vertex array.
    pub current_geometry: Option<String>,
    pub enabled: HashMap<Capability, bool>,
    pub uniforms: HashMap<UniformLocation, UniformCacheEntry>,
}

impl Default for RenderState {
    fn default() -> Self {
        RenderState {
            blend_func: BlendFunc::default(),
            blend_equation: BlendEquationState::default(),
            cull_face: None,
            front_face: FrontFace::Ccw,
            depth_mask: true,
            depth_func: DepthFunc::Less,
            unpack_alignment: 4,
            framebuffer: None,
            viewport: (0, 0),
            texture_units: Vec::new(),
            active_texture_unit: 0,
            bound_buffer: None,
            current_program: None,
            current_geometry: None,
            enabled: HashMap::new(),
            uniforms: HashMap::new(),
        }
    }
}

impl RenderState {
    /// Whether `capability` is currently enabled.
    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.enabled.get(&capability).copied().unwrap_or(false)
    }

    /// Id of the texture bound to `unit`, if any.
    pub fn texture_at(&self, unit: u32) -> Option<u64> {
        self.texture_units.get(unit as usize).copied().flatten()
    }

    pub(crate) fn set_texture_at(&mut self, unit: u32, texture: Option<u64>) {
        let unit = unit as usize;
        if self.texture_units.len() <= unit {
            self.texture_units.resize(unit + 1, None);
        }
        self.texture_units[unit] = texture;
    }
}
