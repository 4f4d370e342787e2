use std::cell::RefCell;
use std::collections::BTreeMap;

use glam::Mat4;
use tracing::warn;

use crate::context::GpuContext;
use crate::device::Device;
use crate::error::{GpuError, Result};
use crate::texture::{Texture, TextureDescriptor, TextureParams, TextureRef};
use crate::types::{
    Attachment, FramebufferStatus, MagFilter, MinFilter, PixelType, TextureFormat, TextureUnit,
    WrapMode,
};

/// Off-screen framebuffer object.
///
/// Remembers which texture was last attached at each attachment point
/// without owning it; a texture dropped later simply disappears from
/// [`Framebuffer::attachment`].
pub struct Framebuffer<D: Device> {
    handle: D::Framebuffer,
    attachments: RefCell<BTreeMap<Attachment, TextureRef<D>>>,
}

impl<D: Device> Framebuffer<D> {
    pub fn new(ctx: &mut GpuContext<D>) -> Result<Self> {
        let handle = match ctx.device_mut().create_framebuffer() {
            Ok(handle) => handle,
            Err(reason) => {
                return Err(ctx.fail(GpuError::Allocation {
                    kind: "framebuffer",
                    reason,
                }))
            }
        };
        Ok(Self {
            handle,
            attachments: RefCell::new(BTreeMap::new()),
        })
    }

    pub fn handle(&self) -> D::Framebuffer {
        self.handle
    }

    /// Makes this the render target.
    pub fn bind(&self, ctx: &mut GpuContext<D>) {
        ctx.bind_framebuffer(Some(self.handle));
    }

    /// Restores the default framebuffer.
    pub fn bind_default(ctx: &mut GpuContext<D>) {
        ctx.bind_framebuffer(None);
    }

    /// Binds this framebuffer and checks its completeness.
    pub fn status(&self, ctx: &mut GpuContext<D>) -> FramebufferStatus {
        self.bind(ctx);
        let status = FramebufferStatus::from_gl(ctx.device().check_framebuffer_status());
        if !status.is_complete() {
            warn!(framebuffer = ?self.handle, ?status, "framebuffer incomplete");
        }
        status
    }

    /// Device object of the texture attached at `attachment`, if it is
    /// still alive and has one.
    pub fn attachment(&self, attachment: Attachment) -> Option<D::Texture> {
        let attachments = self.attachments.borrow();
        let cell = attachments.get(&attachment)?.upgrade()?;
        let handle = cell.borrow().handle();
        handle
    }

    /// Attachment points whose texture is still alive.
    pub fn attached(&self) -> Vec<Attachment> {
        self.attachments
            .borrow()
            .iter()
            .filter(|(_, texture)| texture.strong_count() > 0)
            .map(|(attachment, _)| *attachment)
            .collect()
    }

    pub(crate) fn record_attachment(&self, attachment: Attachment, texture: TextureRef<D>) {
        self.attachments.borrow_mut().insert(attachment, texture);
    }

    pub fn delete(self, ctx: &mut GpuContext<D>) {
        ctx.delete_framebuffer(self.handle);
    }
}

impl<D: Device> std::fmt::Debug for Framebuffer<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("handle", &self.handle)
            .field("attached", &self.attached())
            .finish()
    }
}

/// Depth-only render target plus the light's view-projection matrix.
pub struct ShadowMap<D: Device> {
    texture: Texture<D>,
    /// Starts as identity; the caller recomputes it from the light.
    pub view_projection: Mat4,
}

impl<D: Device> ShadowMap<D> {
    pub fn new(ctx: &mut GpuContext<D>, width: u32, height: u32) -> Result<Self> {
        let params = TextureParams::new(
            TextureFormat::DepthComponent,
            MagFilter::Linear,
            MinFilter::Linear,
        )
        .with_wrap(WrapMode::ClampToEdge);
        let descriptor = TextureDescriptor::new(params, PixelType::UnsignedInt, width, height);
        let texture = Texture::new(ctx, &descriptor)?;
        Ok(Self {
            texture,
            view_projection: Mat4::IDENTITY,
        })
    }

    pub fn texture(&self) -> &Texture<D> {
        &self.texture
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.texture.size()
    }

    pub fn bind_to_unit(&self, ctx: &mut GpuContext<D>, unit: TextureUnit) {
        self.texture.bind_to_unit(ctx, unit);
    }

    /// Attaches the depth texture at the depth attachment of `framebuffer`.
    pub fn attach_to_fbo(&self, ctx: &mut GpuContext<D>, framebuffer: &Framebuffer<D>) {
        self.texture.attach_to_fbo(ctx, framebuffer, Attachment::Depth);
    }

    pub fn delete(self, ctx: &mut GpuContext<D>) {
        self.texture.delete(ctx);
    }
}

impl<D: Device> std::fmt::Debug for ShadowMap<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowMap")
            .field("texture", &self.texture)
            .field("view_projection", &self.view_projection)
            .finish()
    }
}
