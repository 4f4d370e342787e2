use std::sync::Arc;
use std::time::Duration;

use glres::trace::{Command, TraceDevice};
use glres::{
    Attachment, FetchImageSource, Framebuffer, GpuContext, LoadEvent, MagFilter,
    MemoryDiagnostics, MinFilter, PixelType, TextureFormat, TextureLoader, TextureParams,
    TextureState, TextureUnit, WrapMode,
};
use image::{DynamicImage, Rgba, RgbaImage};

const WAIT: Duration = Duration::from_secs(10);

struct Fixture {
    _dir: tempfile::TempDir,
    ctx: GpuContext<TraceDevice>,
    loader: TextureLoader<TraceDevice>,
    diagnostics: MemoryDiagnostics,
}

/// Writes a 2x2 PNG whose top row is red and bottom row is blue.
fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let mut image = RgbaImage::new(2, 2);
    for x in 0..2 {
        image.put_pixel(x, 0, Rgba([255, 0, 0, 255]));
        image.put_pixel(x, 1, Rgba([0, 0, 255, 255]));
    }
    DynamicImage::ImageRgba8(image)
        .save(dir.path().join("crate.png"))
        .unwrap();

    let source = FetchImageSource::new().unwrap().with_root(dir.path());
    let loader = TextureLoader::new(Arc::new(source), 2).unwrap();
    let diagnostics = MemoryDiagnostics::new();
    let ctx = GpuContext::with_diagnostics(TraceDevice::new(), Arc::new(diagnostics.clone()));
    Fixture {
        _dir: dir,
        ctx,
        loader,
        diagnostics,
    }
}

#[test]
fn pending_texture_binds_null_until_loaded() {
    let Fixture {
        _dir,
        mut ctx,
        mut loader,
        diagnostics,
    } = fixture();
    let texture = loader
        .load(&mut ctx, "crate.png", TextureParams::default())
        .unwrap();

    texture.bind_to_unit(&mut ctx, TextureUnit(0));
    assert_eq!(
        ctx.device().commands(),
        &[
            Command::ActiveTexture(TextureUnit(0)),
            Command::BindTexture(None)
        ]
    );
    assert_eq!(texture.state(), TextureState::Pending);

    let events = loader.pump_until_idle(&mut ctx, WAIT);
    assert!(matches!(
        events.as_slice(),
        [LoadEvent::Completed {
            width: 2,
            height: 2,
            ..
        }]
    ));
    assert!(texture.is_ready());
    assert!(texture.handle().is_some());
    assert!(diagnostics.errors().is_empty());
}

#[test]
fn upload_flips_rows_and_applies_policy() {
    let Fixture {
        _dir,
        mut ctx,
        mut loader,
        ..
    } = fixture();
    let params = TextureParams::new(
        TextureFormat::Rgb,
        MagFilter::Linear,
        MinFilter::LinearMipmapLinear,
    )
    .with_wrap(WrapMode::Repeat);
    let texture = loader.load(&mut ctx, "crate.png", params).unwrap();
    loader.pump_until_idle(&mut ctx, WAIT);
    assert!(texture.is_ready());

    let upload = ctx.device().commands().iter().find_map(|command| match command {
        Command::TexImage2d {
            format,
            pixel_type,
            pixels,
            ..
        } => Some((*format, *pixel_type, pixels.clone())),
        _ => None,
    });
    let (format, pixel_type, pixels) = upload.unwrap();
    assert_eq!(format, TextureFormat::Rgb);
    assert_eq!(pixel_type, PixelType::UnsignedByte);
    assert_eq!(
        pixels.unwrap(),
        vec![0, 0, 255, 0, 0, 255, 255, 0, 0, 255, 0, 0]
    );
    let mipmaps = ctx
        .device()
        .count(|command| matches!(command, Command::GenerateMipmap));
    assert_eq!(mipmaps, 1);
    assert_eq!(ctx.device().commands().last(), Some(&Command::BindTexture(None)));
}

#[test]
fn discarded_texture_completes_as_noop() {
    let Fixture {
        _dir,
        mut ctx,
        mut loader,
        diagnostics,
    } = fixture();
    let texture = loader
        .load(&mut ctx, "crate.png", TextureParams::default())
        .unwrap();
    drop(texture);

    let before = ctx.device().commands().len();
    let events = loader.pump_until_idle(&mut ctx, WAIT);
    assert_eq!(
        events,
        vec![LoadEvent::Dropped {
            path: "crate.png".to_string()
        }]
    );
    assert_eq!(ctx.device().commands().len(), before);
    assert_eq!(ctx.device().live_objects(), 0);
    assert!(diagnostics.entries().is_empty());
}

#[test]
fn missing_file_fails_without_device_objects() {
    let Fixture {
        _dir,
        mut ctx,
        mut loader,
        diagnostics,
    } = fixture();
    let texture = loader
        .load(&mut ctx, "absent.png", TextureParams::default())
        .unwrap();

    let events = loader.pump_until_idle(&mut ctx, WAIT);
    assert!(matches!(events.as_slice(), [LoadEvent::Failed { .. }]));
    match texture.state() {
        TextureState::Failed { reason } => assert!(reason.contains("absent.png")),
        other => panic!("unexpected state {other:?}"),
    }
    assert_eq!(ctx.device().live_textures(), 0);
    assert_eq!(diagnostics.errors().len(), 1);
}

#[test]
fn pending_texture_can_be_attached_and_reattached() {
    let Fixture {
        _dir,
        mut ctx,
        mut loader,
        ..
    } = fixture();
    let framebuffer = Framebuffer::new(&mut ctx).unwrap();
    let texture = loader
        .load(&mut ctx, "crate.png", TextureParams::default())
        .unwrap();

    texture.attach_to_fbo(&mut ctx, &framebuffer, Attachment::Color(0));
    assert_eq!(framebuffer.attachment(Attachment::Color(0)), None);

    loader.pump_until_idle(&mut ctx, WAIT);
    texture.attach_to_fbo(&mut ctx, &framebuffer, Attachment::Color(0));
    assert_eq!(framebuffer.attachment(Attachment::Color(0)), texture.handle());
    assert!(framebuffer.status(&mut ctx).is_complete());
}
