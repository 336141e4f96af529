#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use image::{Rgba, RgbaImage};
use log::{Level, Log, Metadata, Record};
use slidegl::prelude::*;

pub const PASS_VERTEX: &str = "attribute vec3 position;
uniform mat4 modelViewMatrix;
uniform mat4 projectionMatrix;

void main() {
  gl_Position = projectionMatrix * modelViewMatrix * vec4(position, 1.0);
}";

pub const SOLID_FRAGMENT: &str = "precision highp float;
uniform vec4 color;

void main() {
  gl_FragColor = color;
}";

pub const FADE_BODY: &str = "void main() {
  vec4 a = texture2D(texture1, vUv);
  vec4 b = texture2D(texture2, vUv);
  gl_FragColor = mix(a, b, progress);
}";

thread_local! {
    static CAPTURED: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Records every log line of the current test thread, then forwards it to env_logger.
struct CaptureLogger {
    inner: env_logger::Logger,
}

impl Log for CaptureLogger {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        CAPTURED.with(|c| {
            c.borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
        if self.inner.enabled(record.metadata()) {
            self.inner.log(record);
        }
    }

    fn flush(&self) {
        self.inner.flush()
    }
}

pub fn init_logger() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let inner = env_logger::Builder::from_default_env()
            .is_test(true)
            .build();
        if log::set_boxed_logger(Box::new(CaptureLogger { inner })).is_ok() {
            log::set_max_level(log::LevelFilter::Trace);
        }
    });
    let _ = take_logs();
}

/// Drains the lines logged by this thread.
pub fn take_logs() -> Vec<(Level, String)> {
    CAPTURED.with(|c| std::mem::take(&mut *c.borrow_mut()))
}

/// Drains the warnings logged by this thread.
pub fn take_warnings() -> Vec<String> {
    take_logs()
        .into_iter()
        .filter(|(level, _)| *level == Level::Warn)
        .map(|(_, line)| line)
        .collect()
}

/// A renderer on top of a recording context, with its call log.
pub fn renderer() -> (Renderer, CallLog) {
    init_logger();
    let gl = RecordingContext::new();
    let log = gl.log();
    let renderer = Renderer::new(Box::new(gl), RendererOptions::default())
        .expect("recording context has a surface");
    (renderer, log)
}

pub fn solid_program(renderer: &mut Renderer) -> Rc<RefCell<Program>> {
    let options = ProgramOptions::new(PASS_VERTEX, SOLID_FRAGMENT)
        .uniforms(Uniforms::new().with("color", Vec4::ONE));
    Rc::new(RefCell::new(
        Program::new(renderer, options).expect("valid program"),
    ))
}

/// Two triangles covering the unit square.
pub fn quad(renderer: &mut Renderer) -> Geometry {
    Geometry::new(
        renderer,
        [
            (
                "position".to_string(),
                Attribute::new(
                    3,
                    vec![
                        -0.5f32, -0.5, 0.0, 0.5, -0.5, 0.0, 0.5, 0.5, 0.0, -0.5, 0.5, 0.0,
                    ],
                ),
            ),
            (
                "index".to_string(),
                Attribute::index(vec![0u16, 1, 2, 0, 2, 3]),
            ),
        ],
    )
    .expect("valid geometry")
}

pub fn image(width: u32, height: u32, color: [u8; 4]) -> Rc<RgbaImage> {
    Rc::new(RgbaImage::from_pixel(width, height, Rgba(color)))
}

pub fn fade(name: &str) -> TransitionShader {
    TransitionShader::from_body(name, FADE_BODY)
}

/// A renderer sized 800x400 with its call log.
pub fn slider_renderer() -> (Renderer, CallLog) {
    init_logger();
    let gl = RecordingContext::new();
    let log = gl.log();
    let renderer = Renderer::new(
        Box::new(gl),
        RendererOptions {
            width: 800,
            height: 400,
            ..RendererOptions::default()
        },
    )
    .expect("recording context has a surface");
    (renderer, log)
}

/// A slider over `slides` 4x2 images, not initialized yet.
pub fn new_slider(
    shaders: Vec<TransitionShader>,
    options: SliderOptions,
    slides: usize,
) -> (Slider, CallLog) {
    let (renderer, log) = slider_renderer();
    let images = (0..slides)
        .map(|i| Some(image(4, 2, [i as u8 * 40, 0, 0, 255])))
        .collect();
    let slider = Slider::new(renderer, shaders, options, images).expect("valid slider");
    (slider, log)
}

/// A slider over `slides` 4x2 images, initialized on an 800x400 surface.
pub fn slider(shaders: Vec<TransitionShader>, options: SliderOptions, slides: usize) -> (Slider, CallLog) {
    let (mut slider, log) = new_slider(shaders, options, slides);
    slider.init();
    (slider, log)
}

pub fn fixed(name: &str) -> SliderOptions {
    SliderOptions {
        shader: ShaderSelection::Fixed(name.to_string()),
        seed: Some(1),
        ..SliderOptions::default()
    }
}

pub fn same(a: Option<TextureRef>, b: &TextureRef) -> bool {
    a.is_some_and(|a| Rc::ptr_eq(&a, b))
}
