//! GPU textures fed from decoded images.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;

use crate::context::{
    DataType, PixelFormat, TexParameter, TextureFilter, TextureHandle, TextureTarget, TextureWrap,
};
use crate::renderer::{Renderer, RendererError};

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// A texture shared between uniforms.
pub type TextureRef = Rc<RefCell<Texture>>;

/// Creation options of a [`Texture`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TextureOptions {
    pub target: TextureTarget,
    pub format: PixelFormat,
    pub internal_format: PixelFormat,
    pub data_type: DataType,
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
    pub generate_mipmaps: bool,
    /// Defaults to `NearestMipmapLinear` with mipmaps, `Linear` without.
    pub min_filter: Option<TextureFilter>,
    pub mag_filter: TextureFilter,
    /// Multiplies color channels by alpha before upload.
    pub premultiply_alpha: bool,
    /// Flips rows before upload, so that uv (0, 0) is the bottom-left corner.
    pub flip_y: bool,
    pub unpack_alignment: i32,
    /// Requested anisotropy, clamped to the renderer limit. 0 disables it.
    pub anisotropy: f32,
    pub level: i32,
    /// Size of an empty allocation, used when there is no image.
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Default for TextureOptions {
    fn default() -> Self {
        TextureOptions {
            target: TextureTarget::Texture2d,
            format: PixelFormat::Rgba,
            internal_format: PixelFormat::Rgba,
            data_type: DataType::UnsignedByte,
            wrap_s: TextureWrap::ClampToEdge,
            wrap_t: TextureWrap::ClampToEdge,
            generate_mipmaps: true,
            min_filter: None,
            mag_filter: TextureFilter::Linear,
            premultiply_alpha: false,
            flip_y: true,
            unpack_alignment: 4,
            anisotropy: 0.0,
            level: 0,
            width: None,
            height: None,
        }
    }
}

/// Sampler parameters last applied to a texture object.
#[derive(Copy, Clone, Debug, PartialEq)]
struct SamplerState {
    min_filter: TextureFilter,
    mag_filter: TextureFilter,
    wrap_s: TextureWrap,
    wrap_t: TextureWrap,
    anisotropy: f32,
}

impl Default for SamplerState {
    // GL defaults for a fresh texture object.
    fn default() -> Self {
        SamplerState {
            min_filter: TextureFilter::NearestMipmapLinear,
            mag_filter: TextureFilter::Linear,
            wrap_s: TextureWrap::Repeat,
            wrap_t: TextureWrap::Repeat,
            anisotropy: 0.0,
        }
    }
}

/// A GPU texture and the image it is uploaded from.
///
/// The upload is lazy: [`Texture::update`] sends the image the first time the
/// texture is bound after it changed. Until an image is set, a 1x1 transparent
/// pixel is uploaded instead.
#[derive(Debug)]
pub struct Texture {
    id: u64,
    handle: TextureHandle,
    options: TextureOptions,
    min_filter: TextureFilter,
    anisotropy: f32,
    image: Option<Rc<RgbaImage>>,
    uploaded: Option<Rc<RgbaImage>>,
    needs_update: bool,
    sampler: SamplerState,
}

impl Texture {
    /// Allocates a texture object. Nothing is uploaded until the first update.
    pub fn new(
        renderer: &mut Renderer,
        options: TextureOptions,
        image: Option<Rc<RgbaImage>>,
    ) -> Result<Texture, RendererError> {
        let handle = renderer
            .gl()
            .create_texture()
            .map_err(RendererError::ResourceCreation)?;

        let min_filter = options.min_filter.unwrap_or(if options.generate_mipmaps {
            TextureFilter::NearestMipmapLinear
        } else {
            TextureFilter::Linear
        });
        let anisotropy = match renderer.parameters().max_anisotropy {
            Some(max) => options.anisotropy.min(max),
            None => 0.0,
        };

        Ok(Texture {
            id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
            handle,
            options,
            min_filter,
            anisotropy,
            image,
            uploaded: None,
            needs_update: true,
            sampler: SamplerState::default(),
        })
    }

    /// Allocates a shared texture.
    pub fn new_shared(
        renderer: &mut Renderer,
        options: TextureOptions,
        image: Option<Rc<RgbaImage>>,
    ) -> Result<TextureRef, RendererError> {
        Ok(Rc::new(RefCell::new(Texture::new(renderer, options, image)?)))
    }

    /// Unique identifier of this texture.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    #[inline]
    pub fn options(&self) -> &TextureOptions {
        &self.options
    }

    /// The source image, `None` while it is loading.
    #[inline]
    pub fn image(&self) -> Option<&Rc<RgbaImage>> {
        self.image.as_ref()
    }

    /// Replaces the source image. It is uploaded on the next update.
    pub fn set_image(&mut self, image: Option<Rc<RgbaImage>>) {
        self.image = image;
    }

    /// Forces an upload on the next update, e.g. after the image was modified.
    pub fn set_needs_update(&mut self) {
        self.needs_update = true;
    }

    fn image_changed(&self) -> bool {
        match (&self.image, &self.uploaded) {
            (Some(a), Some(b)) => !Rc::ptr_eq(a, b),
            (None, None) => false,
            _ => true,
        }
    }

    /// Binds this texture to the active unit, unless it is already bound there.
    pub fn bind(&self, renderer: &mut Renderer) {
        let unit = renderer.state().active_texture_unit;
        if renderer.state().texture_at(unit) == Some(self.id) {
            return;
        }
        renderer
            .gl()
            .bind_texture(self.options.target, Some(self.handle));
        renderer.state_mut().set_texture_at(unit, Some(self.id));
    }

    /// Makes this texture available on `unit`, uploading it if needed.
    pub fn update(&mut self, renderer: &mut Renderer, unit: u32) {
        let needs_update = self.needs_update || self.image_changed();

        if needs_update || renderer.state().texture_at(unit) != Some(self.id) {
            renderer.active_texture(unit);
            self.bind(renderer);
        }

        if !needs_update {
            return;
        }
        self.needs_update = false;

        renderer.set_unpack_alignment(self.options.unpack_alignment);
        self.apply_sampler(renderer);

        let target = self.options.target;
        let level = self.options.level;
        match &self.image {
            Some(image) => {
                let pixels = self.prepare_pixels(image);
                renderer.gl().tex_image_2d(
                    target,
                    level,
                    self.options.internal_format,
                    image.width(),
                    image.height(),
                    PixelFormat::Rgba,
                    DataType::UnsignedByte,
                    Some(&pixels),
                );
                if self.options.generate_mipmaps {
                    renderer.gl().generate_mipmap(target);
                }
                log::debug!(
                    "Uploaded texture {} ({}x{})",
                    self.id,
                    image.width(),
                    image.height()
                );
            }
            None => match self.options.width {
                Some(width) => {
                    let height = self.options.height.unwrap_or(width);
                    renderer.gl().tex_image_2d(
                        target,
                        level,
                        self.options.internal_format,
                        width,
                        height,
                        self.options.format,
                        self.options.data_type,
                        None,
                    );
                }
                None => {
                    // Placeholder so that samplers never read an incomplete texture.
                    renderer.gl().tex_image_2d(
                        target,
                        0,
                        PixelFormat::Rgba,
                        1,
                        1,
                        PixelFormat::Rgba,
                        DataType::UnsignedByte,
                        Some(&[0, 0, 0, 0]),
                    );
                }
            },
        }

        self.uploaded = self.image.clone();
    }

    fn apply_sampler(&mut self, renderer: &mut Renderer) {
        let target = self.options.target;
        let wanted = SamplerState {
            min_filter: self.min_filter,
            mag_filter: self.options.mag_filter,
            wrap_s: self.options.wrap_s,
            wrap_t: self.options.wrap_t,
            anisotropy: self.anisotropy,
        };
        let gl = renderer.gl();

        if wanted.min_filter != self.sampler.min_filter {
            gl.tex_parameter(target, TexParameter::MinFilter(wanted.min_filter));
        }
        if wanted.mag_filter != self.sampler.mag_filter {
            gl.tex_parameter(target, TexParameter::MagFilter(wanted.mag_filter));
        }
        if wanted.wrap_s != self.sampler.wrap_s {
            gl.tex_parameter(target, TexParameter::WrapS(wanted.wrap_s));
        }
        if wanted.wrap_t != self.sampler.wrap_t {
            gl.tex_parameter(target, TexParameter::WrapT(wanted.wrap_t));
        }
        if wanted.anisotropy > 0.0 && wanted.anisotropy != self.sampler.anisotropy {
            gl.tex_parameter(target, TexParameter::MaxAnisotropy(wanted.anisotropy));
        }

        self.sampler = wanted;
    }

    fn prepare_pixels(&self, image: &RgbaImage) -> Vec<u8> {
        let mut pixels = if self.options.flip_y {
            image::imageops::flip_vertical(image).into_raw()
        } else {
            image.as_raw().clone()
        };

        if self.options.premultiply_alpha {
            premultiply(&mut pixels);
        }

        pixels
    }

    /// Deletes the GPU texture.
    pub fn destroy(&mut self, renderer: &mut Renderer) {
        let state = renderer.state_mut();
        for unit in state.texture_units.iter_mut() {
            if *unit == Some(self.id) {
                *unit = None;
            }
        }
        renderer.gl().delete_texture(self.handle);
    }
}

fn premultiply(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u32;
        for c in &mut px[..3] {
            *c = ((*c as u32 * a + 127) / 255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premultiplies_channels() {
        let mut px = [255, 128, 0, 128, 10, 20, 30, 255, 200, 200, 200, 0];
        premultiply(&mut px);
        assert_eq!(px, [128, 64, 0, 128, 10, 20, 30, 255, 0, 0, 0, 0]);
    }
}
