mod common;

use slidegl::prelude::*;

fn tex_images(log: &CallLog) -> Vec<GlCall> {
    log.calls()
        .into_iter()
        .filter(|c| matches!(c, GlCall::TexImage2d { .. }))
        .collect()
}

#[test]
fn missing_image_uploads_a_placeholder() {
    let (mut renderer, log) = common::renderer();
    let mut texture = Texture::new(&mut renderer, TextureOptions::default(), None).expect("texture");

    texture.update(&mut renderer, 0);

    assert_eq!(
        tex_images(&log),
        vec![GlCall::TexImage2d {
            target: TextureTarget::Texture2d,
            level: 0,
            width: 1,
            height: 1,
            format: PixelFormat::Rgba,
            bytes: Some(4),
        }]
    );
    assert_eq!(log.count(|c| matches!(c, GlCall::GenerateMipmap(_))), 0);
}

#[test]
fn images_upload_once_per_change() {
    let (mut renderer, log) = common::renderer();
    let mut texture = Texture::new(
        &mut renderer,
        TextureOptions::default(),
        Some(common::image(4, 2, [255, 0, 0, 255])),
    )
    .expect("texture");

    texture.update(&mut renderer, 0);
    assert_eq!(
        tex_images(&log),
        vec![GlCall::TexImage2d {
            target: TextureTarget::Texture2d,
            level: 0,
            width: 4,
            height: 2,
            format: PixelFormat::Rgba,
            bytes: Some(32),
        }]
    );
    assert_eq!(log.count(|c| matches!(c, GlCall::GenerateMipmap(_))), 1);
    // ClampToEdge differs from the GL default, the mipmapped min filter does not.
    assert_eq!(
        log.count(|c| *c == GlCall::TexParameter(TextureTarget::Texture2d, TexParameter::WrapS(TextureWrap::ClampToEdge))),
        1
    );
    assert_eq!(
        log.count(|c| matches!(c, GlCall::TexParameter(_, TexParameter::MinFilter(_)))),
        0
    );

    log.clear();
    texture.update(&mut renderer, 0);
    assert!(log.is_empty());

    texture.set_image(Some(common::image(2, 2, [0, 0, 255, 255])));
    texture.update(&mut renderer, 0);
    assert_eq!(tex_images(&log).len(), 1);
    assert_eq!(log.count(|c| matches!(c, GlCall::TexParameter(..))), 0);
}

#[test]
fn second_bind_on_same_unit_is_skipped() {
    let (mut renderer, log) = common::renderer();
    let texture = Texture::new(&mut renderer, TextureOptions::default(), None).expect("texture");
    log.clear();

    texture.bind(&mut renderer);
    texture.bind(&mut renderer);
    assert_eq!(log.count(|c| matches!(c, GlCall::BindTexture(..))), 1);
}

#[test]
fn textures_move_to_their_unit() {
    let (mut renderer, log) = common::renderer();
    let mut a = Texture::new(&mut renderer, TextureOptions::default(), None).expect("texture");
    let mut b = Texture::new(&mut renderer, TextureOptions::default(), None).expect("texture");
    a.update(&mut renderer, 0);
    b.update(&mut renderer, 1);
    log.clear();

    a.update(&mut renderer, 0);
    b.update(&mut renderer, 1);
    assert!(log.is_empty());

    b.update(&mut renderer, 0);
    assert_eq!(log.count(|c| *c == GlCall::ActiveTexture(0)), 1);
    assert_eq!(
        log.count(|c| *c == GlCall::BindTexture(TextureTarget::Texture2d, Some(b.handle()))),
        1
    );
}

#[test]
fn anisotropy_is_clamped_to_the_context_limit() {
    common::init_logger();
    let gl = RecordingContext::new().with_extension("EXT_texture_filter_anisotropic");
    let log = gl.log();
    let mut renderer = Renderer::new(Box::new(gl), RendererOptions::default()).expect("renderer");
    assert_eq!(renderer.parameters().max_anisotropy, Some(16.0));

    let options = TextureOptions {
        anisotropy: 32.0,
        ..TextureOptions::default()
    };
    let mut texture = Texture::new(&mut renderer, options, None).expect("texture");
    texture.update(&mut renderer, 0);

    assert_eq!(
        log.count(|c| *c == GlCall::TexParameter(TextureTarget::Texture2d, TexParameter::MaxAnisotropy(16.0))),
        1
    );
}
