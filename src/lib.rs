/*!
# slidegl

Shader-driven image transitions for carousels.

The crate is made of two layers:

* a small retained-mode engine on top of WebGL2/OpenGL: a [`Renderer`](renderer::Renderer)
  caching every pipeline state change, [`Program`](resource::Program)s introspecting
  their uniforms and attributes, [`Geometry`](resource::Geometry) vertex buffers,
  lazily uploaded [`Texture`](resource::Texture)s, and a [`SceneNode`](scene::SceneNode)
  transform hierarchy drawn through a [`Camera`](camera::Camera).
* a transition orchestrator, the [`Slider`](transition::Slider), blending two slide
  textures with a transition shader as the carousel moves from one slide to another.

```no_run
use std::rc::Rc;
use std::time::Duration;
use slidegl::prelude::*;

# fn run(gl: glow::Context, images: Vec<Rc<image::RgbaImage>>) -> Result<(), TransitionError> {
let renderer = Renderer::from_glow(gl, RendererOptions::default())?;
let fade = TransitionShader::from_body(
    "fade",
    "void main() { gl_FragColor = mix(texture2D(texture1, vUv), texture2D(texture2, vUv), progress); }",
);
let options = SliderOptions {
    shader: ShaderSelection::Fixed("fade".into()),
    ..SliderOptions::default()
};
let mut slider = Slider::new(renderer, vec![fade], options, images.into_iter().map(Some).collect())?;
slider.init();

// Animate toward the second slide, then draw one frame per display refresh.
slider.set_progress(0, 1, 1.0, true, false);
let mut now = web_time::Instant::now();
while slider.is_animating() {
    slider.tick(now);
    now += Duration::from_millis(16);
}
# Ok(())
# }
```

Everything is single-threaded: resources are shared with `Rc<RefCell<_>>` and the
renderer is only ever touched from the thread owning the GPU context.
*/
#![allow(clippy::module_inception)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

#[macro_use]
extern crate bitflags;
#[cfg(feature = "serde")]
extern crate serde;

pub use glamx;

pub mod camera;
pub mod color;
pub mod context;
pub mod math;
pub mod procedural;
pub mod renderer;
pub mod resource;
pub mod scene;
pub mod transition;

pub mod prelude {
    pub use crate::camera::*;
    pub use crate::color::*;
    pub use crate::context::*;
    pub use crate::renderer::*;
    pub use crate::resource::*;
    pub use crate::scene::*;
    pub use crate::transition::*;
    pub use glamx::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};
    pub use std::cell::RefCell;
    pub use std::rc::Rc;
}
