use std::cell::RefCell;
use std::rc::{Rc, Weak};

use image::imageops::flip_vertical_in_place;
use image::{DynamicImage, ImageBuffer, Pixel};
use tracing::debug;

use crate::context::GpuContext;
use crate::device::{Device, TexImage, TextureParameterValue};
use crate::error::{GpuError, Result};
use crate::framebuffer::Framebuffer;
use crate::types::{
    Attachment, MagFilter, MinFilter, PixelType, TextureFormat, TextureParameter, TextureUnit,
    WrapMode,
};

/// Format and sampling policy shared by both creation paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureParams {
    pub format: TextureFormat,
    pub mag_filter: MagFilter,
    pub min_filter: MinFilter,
    /// Applied to both S and T; `None` keeps the device default.
    pub wrap: Option<WrapMode>,
}

impl TextureParams {
    pub fn new(format: TextureFormat, mag_filter: MagFilter, min_filter: MinFilter) -> Self {
        Self {
            format,
            mag_filter,
            min_filter,
            wrap: None,
        }
    }

    pub fn with_wrap(mut self, wrap: WrapMode) -> Self {
        self.wrap = Some(wrap);
        self
    }

    pub fn generates_mipmaps(&self) -> bool {
        self.min_filter.requires_mipmaps()
    }
}

impl Default for TextureParams {
    fn default() -> Self {
        Self::new(TextureFormat::Rgba, MagFilter::Linear, MinFilter::Linear)
    }
}

/// Arguments of an immediate texture.
///
/// `pixel_type`, `width` and `height` are required; a zero size counts as
/// missing. Without `pixels` the storage is allocated with undefined content.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextureDescriptor<'a> {
    pub params: TextureParams,
    pub pixel_type: Option<PixelType>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub pixels: Option<&'a [u8]>,
}

impl<'a> TextureDescriptor<'a> {
    pub fn new(params: TextureParams, pixel_type: PixelType, width: u32, height: u32) -> Self {
        Self {
            params,
            pixel_type: Some(pixel_type),
            width: Some(width),
            height: Some(height),
            pixels: None,
        }
    }

    pub fn with_pixels(mut self, pixels: &'a [u8]) -> Self {
        self.pixels = Some(pixels);
        self
    }

    fn resolve(&self) -> std::result::Result<(PixelType, u32, u32), String> {
        let mut missing = Vec::new();
        if self.pixel_type.is_none() {
            missing.push("type");
        }
        let width = self.width.filter(|&width| width > 0);
        if width.is_none() {
            missing.push("width");
        }
        let height = self.height.filter(|&height| height > 0);
        if height.is_none() {
            missing.push("height");
        }
        match (self.pixel_type, width, height) {
            (Some(pixel_type), Some(width), Some(height)) => {
                if let Some(pixels) = self.pixels {
                    let expected = u64::from(width)
                        * u64::from(height)
                        * u64::from(self.params.format.channels())
                        * component_size(pixel_type);
                    if pixels.len() as u64 != expected {
                        return Err(format!(
                            "expected {expected} bytes of pixel data, got {}",
                            pixels.len()
                        ));
                    }
                }
                Ok((pixel_type, width, height))
            }
            _ => Err(format!("immediate texture needs {}", missing.join(", "))),
        }
    }
}

fn component_size(pixel_type: PixelType) -> u64 {
    match pixel_type {
        PixelType::UnsignedByte => 1,
        PixelType::UnsignedShort => 2,
        PixelType::UnsignedInt | PixelType::Float => 4,
    }
}

/// Where a texture is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureState {
    /// Waiting for its image; has no device object yet.
    Pending,
    Ready { width: u32, height: u32 },
    Failed { reason: String },
    /// The pending load was cancelled; no device object will be created.
    Cancelled,
}

pub(crate) type LoadId = u64;

pub(crate) struct TextureCell<D: Device> {
    handle: Option<D::Texture>,
    state: TextureState,
    params: TextureParams,
    source: Option<String>,
    load: Option<LoadId>,
}

pub(crate) type TextureRef<D> = Weak<RefCell<TextureCell<D>>>;

impl<D: Device> TextureCell<D> {
    pub(crate) fn handle(&self) -> Option<D::Texture> {
        self.handle
    }

    pub(crate) fn is_waiting_for(&self, id: LoadId) -> bool {
        self.load == Some(id) && self.state == TextureState::Pending
    }

    pub(crate) fn fail(&mut self, reason: String) {
        self.load = None;
        self.state = TextureState::Failed { reason };
    }

    pub(crate) fn cancel(&mut self) {
        self.load = None;
        self.state = TextureState::Cancelled;
    }

    /// Uploads a decoded image for a pending texture and consumes it.
    pub(crate) fn complete(
        &mut self,
        ctx: &mut GpuContext<D>,
        image: DynamicImage,
    ) -> Result<(u32, u32)> {
        self.load = None;
        let (width, height) = (image.width(), image.height());
        let pixels = match image_pixels(image, self.params.format) {
            Ok(pixels) => pixels,
            Err(reason) => {
                self.state = TextureState::Failed {
                    reason: reason.clone(),
                };
                return Err(ctx.fail(GpuError::InvalidArguments(reason)));
            }
        };
        let image = TexImage {
            format: self.params.format,
            width,
            height,
            pixel_type: PixelType::UnsignedByte,
            pixels: Some(&pixels),
        };
        match upload(ctx, &self.params, image) {
            Ok(handle) => {
                self.handle = Some(handle);
                self.state = TextureState::Ready { width, height };
                Ok((width, height))
            }
            Err(err) => {
                self.state = TextureState::Failed {
                    reason: err.to_string(),
                };
                Err(err)
            }
        }
    }
}

/// A 2D texture.
///
/// Deferred textures (see [`crate::TextureLoader`]) exist before their
/// device object does. While pending, binding one binds null and attaching
/// one attaches nothing. Neither is an error.
///
/// Dropping a `Texture` does not free its device object; call
/// [`Texture::delete`].
pub struct Texture<D: Device> {
    cell: Rc<RefCell<TextureCell<D>>>,
}

impl<D: Device> Texture<D> {
    /// Creates a texture with storage allocated right away.
    ///
    /// Missing or zero dimensions, a missing pixel type, or pixel data of the
    /// wrong length fail with [`GpuError::InvalidArguments`] before any
    /// device object is created.
    pub fn new(ctx: &mut GpuContext<D>, descriptor: &TextureDescriptor<'_>) -> Result<Self> {
        let (pixel_type, width, height) = match descriptor.resolve() {
            Ok(resolved) => resolved,
            Err(reason) => return Err(ctx.fail(GpuError::InvalidArguments(reason))),
        };
        let image = TexImage {
            format: descriptor.params.format,
            width,
            height,
            pixel_type,
            pixels: descriptor.pixels,
        };
        let handle = upload(ctx, &descriptor.params, image)?;
        Ok(Self::from_cell(TextureCell {
            handle: Some(handle),
            state: TextureState::Ready { width, height },
            params: descriptor.params,
            source: None,
            load: None,
        }))
    }

    pub(crate) fn pending(params: TextureParams, source: &str, load: LoadId) -> Self {
        Self::from_cell(TextureCell {
            handle: None,
            state: TextureState::Pending,
            params,
            source: Some(source.to_string()),
            load: Some(load),
        })
    }

    fn from_cell(cell: TextureCell<D>) -> Self {
        Self {
            cell: Rc::new(RefCell::new(cell)),
        }
    }

    pub(crate) fn downgrade(&self) -> TextureRef<D> {
        Rc::downgrade(&self.cell)
    }

    pub(crate) fn load_id(&self) -> Option<LoadId> {
        self.cell.borrow().load
    }

    pub(crate) fn cancel(&self) {
        self.cell.borrow_mut().cancel();
    }

    /// Device object, once one exists.
    pub fn handle(&self) -> Option<D::Texture> {
        self.cell.borrow().handle
    }

    pub fn state(&self) -> TextureState {
        self.cell.borrow().state.clone()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.cell.borrow().state, TextureState::Ready { .. })
    }

    pub fn is_pending(&self) -> bool {
        self.cell.borrow().state == TextureState::Pending
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        match self.cell.borrow().state {
            TextureState::Ready { width, height } => Some((width, height)),
            _ => None,
        }
    }

    pub fn params(&self) -> TextureParams {
        self.cell.borrow().params
    }

    /// Image path of a deferred texture.
    pub fn source(&self) -> Option<String> {
        self.cell.borrow().source.clone()
    }

    /// Makes this texture current on `unit`, leaving `unit` active.
    pub fn bind_to_unit(&self, ctx: &mut GpuContext<D>, unit: TextureUnit) {
        let handle = self.handle();
        ctx.active_texture(unit);
        ctx.bind_texture(handle);
    }

    /// Binds `framebuffer` and attaches this texture at `attachment`.
    ///
    /// The framebuffer stays bound afterwards.
    pub fn attach_to_fbo(
        &self,
        ctx: &mut GpuContext<D>,
        framebuffer: &Framebuffer<D>,
        attachment: Attachment,
    ) {
        framebuffer.bind(ctx);
        let handle = self.handle();
        if handle.is_none() {
            debug!(%attachment, "attaching a texture that has no device object yet");
        }
        ctx.device_mut().framebuffer_texture_2d(attachment, handle);
        framebuffer.record_attachment(attachment, self.downgrade());
    }

    /// Frees the device object, if any. A pending load for this texture
    /// completes as a no-op.
    pub fn delete(self, ctx: &mut GpuContext<D>) {
        let handle = self.cell.borrow_mut().handle.take();
        if let Some(handle) = handle {
            ctx.delete_texture(handle);
        }
    }
}

impl<D: Device> std::fmt::Debug for Texture<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cell = self.cell.borrow();
        f.debug_struct("Texture")
            .field("handle", &cell.handle)
            .field("state", &cell.state)
            .field("params", &cell.params)
            .field("source", &cell.source)
            .finish()
    }
}

/// Creates a texture object, uploads `image` and applies `params`.
///
/// The texture is set up on the active unit, whose binding is reset to null
/// afterwards.
fn upload<D: Device>(
    ctx: &mut GpuContext<D>,
    params: &TextureParams,
    image: TexImage<'_>,
) -> Result<D::Texture> {
    let texture = match ctx.device_mut().create_texture() {
        Ok(texture) => texture,
        Err(reason) => {
            return Err(ctx.fail(GpuError::Allocation {
                kind: "texture",
                reason,
            }))
        }
    };
    ctx.bind_texture(Some(texture));

    let device = ctx.device_mut();
    if image.pixels.is_some() {
        device.unpack_alignment(1);
    }
    device.tex_image_2d(image);
    if image.pixels.is_some() {
        device.unpack_alignment(4);
    }
    device.tex_parameter(
        TextureParameter::MagFilter,
        TextureParameterValue::Mag(params.mag_filter),
    );
    device.tex_parameter(
        TextureParameter::MinFilter,
        TextureParameterValue::Min(params.min_filter),
    );
    if let Some(wrap) = params.wrap {
        device.tex_parameter(TextureParameter::WrapS, TextureParameterValue::Wrap(wrap));
        device.tex_parameter(TextureParameter::WrapT, TextureParameterValue::Wrap(wrap));
    }
    if params.generates_mipmaps() {
        device.generate_mipmap();
    }

    ctx.bind_texture(None);
    debug!(
        texture = ?texture,
        width = image.width,
        height = image.height,
        format = ?image.format,
        mipmaps = params.generates_mipmaps(),
        "texture uploaded"
    );
    Ok(texture)
}

/// Converts `image` to tightly packed 8-bit rows of `format`, bottom row
/// first.
fn image_pixels(image: DynamicImage, format: TextureFormat) -> std::result::Result<Vec<u8>, String> {
    let pixels = match format {
        TextureFormat::Rgba => flipped(image.to_rgba8()),
        TextureFormat::Rgb => flipped(image.to_rgb8()),
        TextureFormat::Luminance => flipped(image.to_luma8()),
        TextureFormat::LuminanceAlpha => flipped(image.to_luma_alpha8()),
        TextureFormat::Alpha => flipped(image.to_rgba8())
            .chunks_exact(4)
            .map(|rgba| rgba[3])
            .collect(),
        TextureFormat::DepthComponent => {
            return Err("depth textures cannot be filled from an image".to_string())
        }
    };
    Ok(pixels)
}

fn flipped<P>(mut buffer: ImageBuffer<P, Vec<u8>>) -> Vec<u8>
where
    P: Pixel<Subpixel = u8>,
{
    flip_vertical_in_place(&mut buffer);
    buffer.into_raw()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use image::{Rgba, RgbaImage};

    use super::*;
    use crate::diagnostics::MemoryDiagnostics;
    use crate::trace::{Command, TraceDevice};

    fn context() -> (GpuContext<TraceDevice>, MemoryDiagnostics) {
        let diagnostics = MemoryDiagnostics::new();
        let ctx = GpuContext::with_diagnostics(TraceDevice::new(), Arc::new(diagnostics.clone()));
        (ctx, diagnostics)
    }

    #[test]
    fn missing_arguments_allocate_nothing() {
        let (mut ctx, diagnostics) = context();
        let descriptor = TextureDescriptor {
            width: Some(64),
            height: Some(0),
            ..TextureDescriptor::default()
        };

        let err = Texture::new(&mut ctx, &descriptor).err().unwrap();
        assert_eq!(err.to_string(), "invalid arguments: immediate texture needs type, height");
        assert!(ctx.device().commands().is_empty());
        assert_eq!(diagnostics.errors().len(), 1);
    }

    #[test]
    fn pixel_data_length_is_checked() {
        let (mut ctx, _) = context();
        let data = [0u8; 10];
        let descriptor =
            TextureDescriptor::new(TextureParams::default(), PixelType::UnsignedByte, 2, 2)
                .with_pixels(&data);
        let err = Texture::new(&mut ctx, &descriptor).err().unwrap();
        assert!(matches!(err, GpuError::InvalidArguments(ref reason) if reason.contains("16 bytes")));
        assert_eq!(ctx.device().live_textures(), 0);
    }

    #[test]
    fn immediate_setup_sequence() {
        let (mut ctx, _) = context();
        let params = TextureParams::new(TextureFormat::Rgb, MagFilter::Nearest, MinFilter::Nearest)
            .with_wrap(WrapMode::ClampToEdge);
        let texture = Texture::new(
            &mut ctx,
            &TextureDescriptor::new(params, PixelType::UnsignedByte, 4, 2),
        )
        .unwrap();
        let handle = texture.handle().unwrap();

        let expected = vec![
            Command::CreateTexture(handle),
            Command::BindTexture(Some(handle)),
            Command::TexImage2d {
                format: TextureFormat::Rgb,
                width: 4,
                height: 2,
                pixel_type: PixelType::UnsignedByte,
                pixels: None,
            },
            Command::TexParameter(
                TextureParameter::MagFilter,
                TextureParameterValue::Mag(MagFilter::Nearest),
            ),
            Command::TexParameter(
                TextureParameter::MinFilter,
                TextureParameterValue::Min(MinFilter::Nearest),
            ),
            Command::TexParameter(
                TextureParameter::WrapS,
                TextureParameterValue::Wrap(WrapMode::ClampToEdge),
            ),
            Command::TexParameter(
                TextureParameter::WrapT,
                TextureParameterValue::Wrap(WrapMode::ClampToEdge),
            ),
            Command::BindTexture(None),
        ];
        assert_eq!(ctx.device().commands(), expected.as_slice());
        assert_eq!(texture.state(), TextureState::Ready { width: 4, height: 2 });
        assert!(ctx.bindings().is_clear());
    }

    #[test]
    fn wrap_is_left_alone_when_unset() {
        let (mut ctx, _) = context();
        Texture::new(
            &mut ctx,
            &TextureDescriptor::new(TextureParams::default(), PixelType::UnsignedByte, 1, 1),
        )
        .unwrap();
        let wraps = ctx.device().count(|command| {
            matches!(
                command,
                Command::TexParameter(TextureParameter::WrapS | TextureParameter::WrapT, _)
            )
        });
        assert_eq!(wraps, 0);
    }

    #[test]
    fn supplied_pixels_use_byte_alignment() {
        let (mut ctx, _) = context();
        let data = [1u8, 2, 3, 4, 5, 6];
        let params = TextureParams::new(TextureFormat::Rgb, MagFilter::Linear, MinFilter::Linear);
        Texture::new(
            &mut ctx,
            &TextureDescriptor::new(params, PixelType::UnsignedByte, 2, 1).with_pixels(&data),
        )
        .unwrap();

        let alignments: Vec<u32> = ctx
            .device()
            .commands()
            .iter()
            .filter_map(|command| match command {
                Command::UnpackAlignment(alignment) => Some(*alignment),
                _ => None,
            })
            .collect();
        assert_eq!(alignments, vec![1, 4]);
    }

    #[test]
    fn bind_to_unit_selects_unit_first() {
        let (mut ctx, _) = context();
        let texture = Texture::new(
            &mut ctx,
            &TextureDescriptor::new(TextureParams::default(), PixelType::UnsignedByte, 1, 1),
        )
        .unwrap();
        ctx.device_mut().clear_commands();

        texture.bind_to_unit(&mut ctx, TextureUnit(3));
        let handle = texture.handle();
        assert_eq!(
            ctx.device().commands(),
            &[Command::ActiveTexture(TextureUnit(3)), Command::BindTexture(handle)]
        );
        assert_eq!(ctx.bindings().texture(TextureUnit(3)), handle);
        assert_eq!(ctx.bindings().active_unit(), TextureUnit(3));
    }

    #[test]
    fn delete_forgets_bindings() {
        let (mut ctx, _) = context();
        let texture = Texture::new(
            &mut ctx,
            &TextureDescriptor::new(TextureParams::default(), PixelType::UnsignedByte, 1, 1),
        )
        .unwrap();
        texture.bind_to_unit(&mut ctx, TextureUnit(1));
        texture.delete(&mut ctx);

        assert_eq!(ctx.bindings().texture(TextureUnit(1)), None);
        assert_eq!(ctx.device().live_textures(), 0);
    }

    #[test]
    fn image_rows_are_flipped() {
        let mut image = RgbaImage::new(1, 2);
        image.put_pixel(0, 0, Rgba([255, 0, 0, 10]));
        image.put_pixel(0, 1, Rgba([0, 0, 255, 20]));
        let image = DynamicImage::ImageRgba8(image);

        let rgba = image_pixels(image.clone(), TextureFormat::Rgba).unwrap();
        assert_eq!(rgba, vec![0, 0, 255, 20, 255, 0, 0, 10]);
        let rgb = image_pixels(image.clone(), TextureFormat::Rgb).unwrap();
        assert_eq!(rgb, vec![0, 0, 255, 255, 0, 0]);
        let alpha = image_pixels(image.clone(), TextureFormat::Alpha).unwrap();
        assert_eq!(alpha, vec![20, 10]);
        assert!(image_pixels(image, TextureFormat::DepthComponent).is_err());
    }
}
