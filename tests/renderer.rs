mod common;

use slidegl::prelude::*;

#[test]
fn missing_surface_is_fatal() {
    let res = Renderer::new(
        Box::new(RecordingContext::without_surface()),
        RendererOptions::default(),
    );
    assert!(matches!(res, Err(RendererError::ContextUnavailable(_))));
}

#[test]
fn cached_setters_are_idempotent() {
    let (mut renderer, log) = common::renderer();
    log.clear();

    renderer.enable(Capability::Blend);
    renderer.enable(Capability::Blend);
    renderer.set_blend_func(BlendFunc::new(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha));
    renderer.set_blend_func(BlendFunc::new(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha));
    renderer.set_depth_func(DepthFunc::LessEqual);
    renderer.set_depth_func(DepthFunc::LessEqual);
    renderer.set_cull_face(Face::Front);
    renderer.set_cull_face(Face::Front);

    assert_eq!(log.count(|c| *c == GlCall::Enable(Capability::Blend)), 1);
    assert_eq!(log.count(|c| matches!(c, GlCall::BlendFunc(..))), 1);
    assert_eq!(log.count(|c| *c == GlCall::DepthFunc(DepthFunc::LessEqual)), 1);
    assert_eq!(log.count(|c| *c == GlCall::CullFace(Face::Front)), 1);

    renderer.disable(Capability::Blend);
    assert_eq!(log.count(|c| *c == GlCall::Disable(Capability::Blend)), 1);
}

#[test]
fn uniform_values_are_cached_per_location() {
    let (mut renderer, log) = common::renderer();
    let program = common::solid_program(&mut renderer);

    program.borrow().use_program(&mut renderer, false);
    log.clear();
    program.borrow().use_program(&mut renderer, false);
    assert_eq!(log.count(|c| matches!(c, GlCall::Uniform { .. })), 0);
    assert_eq!(log.count(|c| matches!(c, GlCall::UseProgram(_))), 0);

    program
        .borrow_mut()
        .uniforms_mut()
        .set("color", Vec4::new(1.0, 0.0, 0.0, 1.0));
    program.borrow().use_program(&mut renderer, false);
    assert_eq!(log.count(|c| matches!(c, GlCall::Uniform { .. })), 1);
}

#[test]
fn missing_uniform_warnings_are_capped() {
    let (mut renderer, _log) = common::renderer();
    let fragment: String = (0..150)
        .map(|i| format!("uniform float u{i};\n"))
        .chain(std::iter::once("void main() {}".to_string()))
        .collect();
    let program = Program::new(
        &mut renderer,
        ProgramOptions::new(common::PASS_VERTEX, fragment),
    )
    .expect("valid program");
    let _ = common::take_logs();

    program.use_program(&mut renderer, false);

    let warnings = common::take_warnings();
    assert_eq!(warnings.len(), (MAX_WARNINGS + 1) as usize);
    assert!(warnings[0].contains("has not been supplied"));
    assert!(warnings.last().is_some_and(|w| w.contains("stopping logs")));

    program.use_program(&mut renderer, false);
    assert!(common::take_warnings().is_empty());
}

#[test]
fn compile_errors_carry_numbered_source() {
    let (mut renderer, _log) = common::renderer();
    let res = Program::new(
        &mut renderer,
        ProgramOptions::new(common::PASS_VERTEX, "#error broken\nvoid main() {}"),
    );

    match res {
        Err(ProgramError::Compile {
            stage,
            source_with_lines,
            log,
        }) => {
            assert_eq!(stage, ShaderStage::Fragment);
            assert!(source_with_lines.starts_with("1: #error broken"));
            assert!(log.contains("#error"));
        }
        other => panic!("expected a compile error, got {:?}", other.err()),
    }
}

#[test]
fn missing_source_is_reported() {
    let (mut renderer, _log) = common::renderer();
    let res = Program::new(&mut renderer, ProgramOptions::new(common::PASS_VERTEX, "  "));
    assert!(matches!(
        res,
        Err(ProgramError::MissingSource {
            stage: ShaderStage::Fragment
        })
    ));
}

#[test]
fn transparent_programs_blend() {
    let (mut renderer, log) = common::renderer();
    let program = Program::new(
        &mut renderer,
        ProgramOptions::new(common::PASS_VERTEX, common::SOLID_FRAGMENT).transparent(true),
    )
    .expect("valid program");
    log.clear();

    program.use_program(&mut renderer, false);
    assert_eq!(log.count(|c| *c == GlCall::Enable(Capability::Blend)), 1);
    assert_eq!(
        log.count(|c| *c == GlCall::BlendFunc(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha)),
        1
    );
}

#[test]
fn frames_can_target_a_framebuffer() {
    let (mut renderer, log) = common::renderer();
    let options = TextureOptions {
        width: Some(64),
        height: Some(32),
        generate_mipmaps: false,
        ..TextureOptions::default()
    };
    let mut color = Texture::new(&mut renderer, options, None).expect("texture");
    log.clear();

    let framebuffer = renderer.create_framebuffer(&mut color).expect("framebuffer");
    assert_eq!(
        log.count(|c| matches!(c, GlCall::TexImage2d { width: 64, height: 32, .. })),
        1
    );
    assert_eq!(
        log.count(|c| *c
            == GlCall::FramebufferTexture2d {
                target: TextureTarget::Texture2d,
                texture: color.handle(),
                level: 0,
            }),
        1
    );
    // Creation leaves the default surface bound.
    assert_eq!(renderer.state().framebuffer, None);

    let scene = SceneNode::empty();
    let mut camera = Camera::default();
    log.clear();
    renderer.render(RenderParams::new(&scene, &mut camera).target(framebuffer));
    assert_eq!(log.calls()[0], GlCall::BindFramebuffer(Some(framebuffer)));

    renderer.render(RenderParams::new(&scene, &mut camera));
    assert_eq!(log.count(|c| *c == GlCall::BindFramebuffer(None)), 1);

    renderer.render(RenderParams::new(&scene, &mut camera).target(framebuffer));
    renderer.delete_framebuffer(framebuffer);
    assert_eq!(renderer.state().framebuffer, None);
    assert_eq!(log.count(|c| *c == GlCall::DeleteFramebuffer(framebuffer)), 1);
}
