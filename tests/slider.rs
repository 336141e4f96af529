mod common;

use std::time::Duration;

use log::Level;
use slidegl::prelude::*;
use slidegl::procedural;
use web_time::Instant;

const RIPPLE_VERTEX: &str = "attribute vec3 position;
attribute vec2 uv;
uniform mat4 modelViewMatrix;
uniform mat4 projectionMatrix;
uniform float progress;
uniform float amplitude;
varying vec2 vUv;

void main() {
  vUv = uv;
  vec3 p = position;
  p.z += sin(progress * 3.1415) * amplitude;
  gl_Position = projectionMatrix * modelViewMatrix * vec4(p, 1.0);
}";

const RIPPLE_FRAGMENT: &str = "precision highp float;
uniform sampler2D texture1;
uniform float progress;
varying vec2 vUv;

void main() {
  vec4 color = texture2D(texture1, vUv);
  gl_FragColor = vec4(color.rgb, color.a * (1.0 - progress));
}";

fn ripple() -> TransitionShader {
    TransitionShader::new("ripple", RIPPLE_FRAGMENT)
        .with_vertex(
            RIPPLE_VERTEX,
            GeometrySource {
                build: Rc::new(|detail, _| {
                    procedural::plane(2.0, 2.0, detail as u32, detail as u32)
                }),
                detail: 8.0,
                offset_top: 0.0,
            },
        )
        .with_uniform("amplitude", UniformDeclaration::float(0.3).range(0.0, 1.0))
}

fn broken(name: &str) -> TransitionShader {
    TransitionShader::new(name, "#error unsupported\nvoid main() {}")
}

fn resolution(slider: &Slider) -> Vec4 {
    match slider.material().borrow().uniforms().get("resolution") {
        Some(UniformValue::Vec4(v)) => *v,
        other => panic!("unexpected resolution {other:?}"),
    }
}

fn uniform_f32(program: &Rc<RefCell<Program>>, name: &str) -> Option<f32> {
    program.borrow().uniforms().get(name).and_then(|v| v.as_f32())
}

#[test]
fn progress_drives_the_blend_uniforms() {
    let (mut slider, _log) = common::slider(vec![common::fade("fade")], common::fixed("fade"), 3);
    let textures = slider.textures().to_vec();
    assert_eq!(slider.state(), State::Idle);

    for progress in [0.0, 0.5, 1.0] {
        slider.set_progress(0, 1, progress, false, false);
        assert!(common::same(slider.material_texture("texture1"), &textures[0]));
        assert!(common::same(slider.material_texture("texture2"), &textures[1]));
        assert_eq!(slider.progress(), progress);
    }
    assert_eq!(slider.state(), State::Settled { slide: 1 });

    // Backward drags use the magnitude.
    slider.set_progress(1, 0, -0.25, false, false);
    assert!(common::same(slider.material_texture("texture1"), &textures[1]));
    assert!(common::same(slider.material_texture("texture2"), &textures[0]));
    assert_eq!(slider.progress(), 0.25);
    assert_eq!(slider.state(), State::Transitioning { target: 0.25 });
}

#[test]
fn animated_transition_settles_on_the_target() {
    let (mut slider, log) = common::slider(vec![common::fade("fade")], common::fixed("fade"), 2);
    let textures = slider.textures().to_vec();
    let start = Instant::now();

    slider.set_progress(0, 1, 1.0, true, false);
    assert!(slider.is_animating());
    assert_eq!(slider.state(), State::Transitioning { target: 1.0 });

    slider.tick(start);
    assert_eq!(slider.progress(), 0.0);
    slider.tick(start + Duration::from_millis(300));
    assert!((slider.progress() - 0.5).abs() < 1.0e-3);

    slider.tick(start + Duration::from_millis(600));
    assert!(!slider.is_animating());
    assert_eq!(slider.progress(), 0.0);
    assert!(common::same(slider.material_texture("texture1"), &textures[1]));
    assert_eq!(slider.state(), State::Settled { slide: 1 });

    assert_eq!(log.draws().len(), 3);
    assert!((slider.time() - 0.15).abs() < 1.0e-5);
    assert_eq!(uniform_f32(slider.material(), "time"), Some(slider.time()));
}

#[test]
fn new_target_restarts_from_the_live_value() {
    let (mut slider, _log) = common::slider(vec![common::fade("fade")], common::fixed("fade"), 2);
    let textures = slider.textures().to_vec();
    let start = Instant::now();

    slider.set_progress(0, 1, 1.0, true, false);
    slider.tick(start);
    slider.tick(start + Duration::from_millis(300));
    let live = slider.progress();

    slider.set_progress(1, 0, 0.0, true, false);
    slider.tick(start + Duration::from_millis(300));
    assert!((slider.progress() - live).abs() < 1.0e-6);

    slider.tick(start + Duration::from_millis(450));
    assert!(slider.progress() < live);

    slider.tick(start + Duration::from_millis(1000));
    assert_eq!(slider.progress(), 0.0);
    assert!(common::same(slider.material_texture("texture1"), &textures[1]));
    assert_eq!(slider.state(), State::Settled { slide: 1 });
}

#[test]
fn settled_boundaries_replay_the_full_transition() {
    let (mut slider, _log) = common::slider(vec![common::fade("fade")], common::fixed("fade"), 2);
    let start = Instant::now();

    slider.set_progress(0, 1, 1.0, false, false);
    assert_eq!(slider.progress(), 1.0);

    // Already at 1: the ease restarts from 0.
    slider.set_progress(0, 1, 1.0, true, false);
    assert_eq!(slider.progress(), 0.0);
    slider.tick(start);
    slider.tick(start + Duration::from_millis(150));
    assert!(slider.progress() > 0.0 && slider.progress() < 1.0);
}

#[test]
fn shader_swaps_are_debounced_per_frame() {
    let options = SliderOptions {
        shader: ShaderSelection::Random,
        seed: Some(7),
        ..SliderOptions::default()
    };
    let shaders = vec![common::fade("a"), common::fade("b"), common::fade("c")];
    let (mut slider, _log) = common::slider(shaders, options, 3);
    let textures = slider.textures().to_vec();
    let first = slider.material().clone();
    let first_name = slider.current_shader().map(|s| s.name.clone());

    slider.set_progress(0, 1, 0.0, false, true);
    let swapped = slider.material().clone();
    assert!(!Rc::ptr_eq(&first, &swapped));
    assert_ne!(slider.current_shader().map(|s| s.name.clone()), first_name);
    assert_eq!(slider.debounce().swaps_this_frame(), 1);
    assert!(common::same(slider.material_texture("texture1"), &textures[0]));
    assert!(common::same(slider.material_texture("texture2"), &textures[1]));

    slider.set_progress(0, 1, 0.4, false, true);
    assert!(Rc::ptr_eq(slider.material(), &swapped));
    assert_eq!(slider.debounce().swaps_this_frame(), 1);
    assert_eq!(slider.progress(), 0.4);

    slider.tick(Instant::now());
    assert!(!slider.debounce().is_held());

    slider.set_progress(1, 2, 0.0, false, true);
    assert!(!Rc::ptr_eq(slider.material(), &swapped));
}

#[test]
fn fixed_shader_is_never_swapped() {
    let (mut slider, _log) = common::slider(
        vec![common::fade("a"), common::fade("b")],
        common::fixed("a"),
        2,
    );
    let material = slider.material().clone();

    slider.set_progress(0, 1, 0.0, false, true);
    assert!(Rc::ptr_eq(slider.material(), &material));
    assert_eq!(slider.current_shader().map(|s| s.name.as_str()), Some("a"));
}

#[test]
fn per_slide_pool_follows_the_slide() {
    let options = SliderOptions {
        shader: ShaderSelection::Pool(vec!["b".into(), "c".into()]),
        shader_per_slide: true,
        seed: Some(3),
        ..SliderOptions::default()
    };
    let shaders = vec![common::fade("a"), common::fade("b"), common::fade("c")];
    let (mut slider, _log) = common::slider(shaders, options, 3);
    assert_eq!(slider.current_shader().map(|s| s.name.as_str()), Some("b"));

    slider.set_progress(0, 1, 0.0, false, true);
    assert_eq!(slider.current_shader().map(|s| s.name.as_str()), Some("c"));

    slider.tick(Instant::now());
    // No third name: falls back to the first one.
    slider.set_progress(1, 2, 0.0, false, true);
    assert_eq!(slider.current_shader().map(|s| s.name.as_str()), Some("b"));
}

#[test]
fn failed_swap_keeps_the_current_shader() {
    let options = SliderOptions {
        shader: ShaderSelection::Pool(vec!["a".into(), "b".into()]),
        shader_per_slide: true,
        seed: Some(3),
        ..SliderOptions::default()
    };
    let (mut slider, _log) = common::slider(vec![common::fade("a"), broken("b")], options, 2);
    let material = slider.material().clone();
    let _ = common::take_logs();

    slider.set_progress(0, 1, 0.0, false, true);
    assert!(Rc::ptr_eq(slider.material(), &material));
    assert_eq!(slider.current_shader().map(|s| s.name.as_str()), Some("a"));
    assert!(common::take_logs()
        .iter()
        .any(|(level, line)| *level == Level::Error && line.contains("swap")));

    slider.tick(Instant::now());
}

#[test]
fn requests_before_init_are_replayed() {
    let (mut slider, log) = common::new_slider(vec![common::fade("fade")], common::fixed("fade"), 2);

    slider.set_progress(0, 1, 0.4, false, false);
    assert_eq!(slider.progress(), 0.0);
    slider.tick(Instant::now());
    assert!(log.draws().is_empty());

    slider.init();
    assert!(slider.is_initialized());
    assert_eq!(slider.progress(), 0.4);
    slider.tick(Instant::now());
    assert_eq!(log.draws().len(), 1);
}

#[test]
fn resize_fits_the_plane_and_the_image() {
    let (mut slider, _log) = common::slider(vec![common::fade("fade")], common::fixed("fade"), 2);

    assert_eq!(resolution(&slider), Vec4::new(800.0, 400.0, 1.0, 1.0));
    let fov = slider.camera().fov().expect("perspective camera");
    assert!((fov - 2.0 * 0.25f32.atan().to_degrees()).abs() < 1.0e-4);
    assert_eq!(slider.scene().children()[0].scale(), Vec3::new(2.0, 1.0, 1.0));

    slider.resize(400, 800);
    assert_eq!(resolution(&slider), Vec4::new(400.0, 800.0, 0.25, 1.0));
    assert_eq!(slider.renderer().size(), (400, 800));
    assert_eq!(slider.scene().children()[0].scale(), Vec3::new(0.5, 1.0, 1.0));

    // A portrait first image changes the fit.
    slider.resize(800, 400);
    slider.set_image(0, Some(common::image(2, 4, [0, 0, 0, 255])));
    assert_eq!(resolution(&slider), Vec4::new(800.0, 400.0, 1.0, 0.25));
}

#[test]
fn vertex_shaders_draw_both_slides() {
    let (mut slider, log) = common::slider(vec![ripple()], common::fixed("ripple"), 2);
    let textures = slider.textures().to_vec();

    let vertex_material = slider.vertex_material().expect("vertex path").clone();
    let nodes = slider.scene().children();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[1].position(), Vec3::new(0.0, 0.0, -0.0001));
    assert_eq!(nodes[0].scale(), Vec3::new(1.0, 0.5, 0.5));
    assert!(!slider.material().borrow().state().depth_write);

    slider.set_progress(0, 1, 0.5, false, false);
    assert!(common::same(slider.material_texture("texture1"), &textures[0]));
    let incoming = vertex_material
        .borrow()
        .uniforms()
        .get("texture1")
        .and_then(|v| v.as_texture())
        .cloned();
    assert!(common::same(incoming, &textures[1]));

    slider.declared_uniforms_mut()[0].1.value = 0.8;
    log.clear();
    slider.tick(Instant::now());

    assert_eq!(uniform_f32(slider.material(), "amplitude"), Some(0.8));
    assert_eq!(log.draws().len(), 2);
    assert_eq!(log.count(|c| *c == GlCall::Enable(Capability::Blend)), 1);
    assert_eq!(log.count(|c| *c == GlCall::DepthMask(false)), 1);
}

#[test]
fn replace_shader_keeps_the_incoming_slide() {
    let (mut slider, _log) = common::slider(
        vec![common::fade("a"), common::fade("b")],
        common::fixed("a"),
        2,
    );
    let textures = slider.textures().to_vec();
    slider.set_progress(0, 1, 0.3, false, false);

    slider
        .replace_shader(ShaderSelection::Fixed("b".into()))
        .expect("known shader");
    assert_eq!(slider.current_shader().map(|s| s.name.as_str()), Some("b"));
    assert_eq!(slider.options().shader, ShaderSelection::Fixed("b".into()));
    assert!(common::same(slider.material_texture("texture1"), &textures[0]));
    assert!(common::same(slider.material_texture("texture2"), &textures[1]));
    assert_eq!(slider.progress(), 1.0);
    assert_eq!(resolution(&slider), Vec4::new(800.0, 400.0, 1.0, 1.0));

    let material = slider.material().clone();
    let res = slider.replace_shader(ShaderSelection::Fixed("missing".into()));
    assert!(matches!(res, Err(TransitionError::UnknownShader(name)) if name == "missing"));
    assert!(Rc::ptr_eq(slider.material(), &material));
}

#[test]
fn construction_errors() {
    let (renderer, _log) = common::slider_renderer();
    let res = Slider::new(renderer, vec![common::fade("a")], common::fixed("a"), Vec::new());
    assert!(matches!(res, Err(TransitionError::NoSlides)));

    let (renderer, _log) = common::slider_renderer();
    let res = Slider::new(renderer, vec![common::fade("a")], common::fixed("b"), vec![None]);
    assert!(matches!(res, Err(TransitionError::UnknownShader(_))));

    let (renderer, _log) = common::slider_renderer();
    let res = Slider::new(renderer, vec![broken("a")], common::fixed("a"), vec![None]);
    match res {
        Err(TransitionError::Program(ProgramError::Compile {
            source_with_lines, ..
        })) => assert!(source_with_lines.contains("1: #error unsupported")),
        _ => panic!("expected a compile error"),
    }
}

#[test]
fn loading_images_upload_placeholders() {
    let (renderer, log) = common::slider_renderer();
    let mut slider = Slider::new(
        renderer,
        vec![common::fade("fade")],
        common::fixed("fade"),
        vec![None, None],
    )
    .expect("valid slider");
    slider.init();
    slider.tick(Instant::now());

    // Both slides share a 1x1 pixel until their image arrives.
    assert!(log.count(|c| matches!(c, GlCall::TexImage2d { width: 1, height: 1, .. })) >= 2);
    assert_eq!(resolution(&slider), Vec4::ZERO);

    slider.set_image(0, Some(common::image(4, 2, [255, 255, 255, 255])));
    assert_eq!(resolution(&slider), Vec4::new(800.0, 400.0, 1.0, 1.0));
    log.clear();
    slider.tick(Instant::now());
    assert_eq!(
        log.count(|c| matches!(c, GlCall::TexImage2d { width: 4, height: 2, .. })),
        1
    );
}

#[test]
fn out_of_range_slides_are_ignored() {
    let (mut slider, _log) = common::slider(vec![common::fade("fade")], common::fixed("fade"), 2);
    let _ = common::take_logs();

    slider.set_progress(0, 5, 0.5, false, false);
    assert_eq!(slider.progress(), 0.0);
    assert_eq!(slider.state(), State::Idle);
    assert_eq!(common::take_warnings().len(), 1);
}

#[test]
fn destroy_frees_resources_and_stops_drawing() {
    let (mut slider, log) = common::slider(vec![common::fade("fade")], common::fixed("fade"), 3);
    log.clear();

    slider.destroy();
    assert!(slider.is_destroyed());
    // Three slides and the displacement map.
    assert_eq!(log.count(|c| matches!(c, GlCall::DeleteTexture(_))), 4);
    assert_eq!(log.count(|c| matches!(c, GlCall::DeleteProgram(_))), 1);
    assert!(slider.scene().children().is_empty());

    log.clear();
    slider.set_progress(0, 1, 0.5, true, false);
    slider.tick(Instant::now());
    assert!(log.is_empty());
}
