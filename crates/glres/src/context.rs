use std::collections::BTreeSet;
use std::sync::Arc;

use crate::device::Device;
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::GpuError;
use crate::state::BindingState;
use crate::types::{BufferTarget, TextureUnit};

/// A device plus everything `glres` tracks about it.
///
/// All resource managers take `&mut GpuContext` and route their binding calls
/// through it, so [`BindingState`] always matches what the device has bound.
/// Calls made directly on [`GpuContext::device_mut`] bypass that tracking and
/// are meant for pipeline state `glres` does not own (depth, blend, viewport).
pub struct GpuContext<D: Device> {
    device: D,
    bindings: BindingState<D>,
    extensions: BTreeSet<String>,
    diagnostics: Arc<dyn Diagnostics>,
    loss_reported: bool,
}

impl<D: Device> GpuContext<D> {
    pub fn new(device: D) -> Self {
        Self::with_diagnostics(device, Arc::new(TracingDiagnostics))
    }

    pub fn with_diagnostics(device: D, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            device,
            bindings: BindingState::new(),
            extensions: BTreeSet::new(),
            diagnostics,
            loss_reported: false,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    pub fn bindings(&self) -> &BindingState<D> {
        &self.bindings
    }

    pub fn diagnostics(&self) -> &Arc<dyn Diagnostics> {
        &self.diagnostics
    }

    pub fn is_context_lost(&self) -> bool {
        self.device.is_context_lost()
    }

    pub fn log(&self, message: &str) {
        self.diagnostics.log(message);
    }

    /// Sends an error to the diagnostics sink unless the context is lost.
    ///
    /// While the device reports loss only the loss itself is reported, once;
    /// the latch re-arms when the device comes back. Returns whether
    /// `message` was delivered.
    pub fn report_error(&mut self, message: &str) -> bool {
        if self.device.is_context_lost() {
            if !self.loss_reported {
                self.loss_reported = true;
                self.diagnostics.error("graphics context lost");
            }
            tracing::debug!(suppressed = message, "error report dropped during context loss");
            return false;
        }
        self.loss_reported = false;
        self.diagnostics.error(message);
        true
    }

    /// Reports `error` and hands it back, or `ContextLost` if suppressed.
    pub(crate) fn fail(&mut self, error: GpuError) -> GpuError {
        if self.report_error(&error.to_string()) {
            error
        } else {
            GpuError::ContextLost
        }
    }

    pub fn is_extension_active(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    pub fn active_extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    /// Activates `name` on the device once; repeated calls are no-ops.
    pub(crate) fn activate_extension(&mut self, name: &str) -> bool {
        if self.extensions.contains(name) {
            return true;
        }
        if !self.device.enable_extension(name) {
            return false;
        }
        self.extensions.insert(name.to_string());
        true
    }

    pub fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<D::Buffer>) {
        self.device.bind_buffer(target, buffer);
        self.bindings.set_buffer(target, buffer);
    }

    pub fn active_texture(&mut self, unit: TextureUnit) {
        self.device.active_texture(unit);
        self.bindings.set_active_unit(unit);
    }

    /// Binds `texture` on the active unit.
    pub fn bind_texture(&mut self, texture: Option<D::Texture>) {
        self.device.bind_texture(texture);
        self.bindings.set_texture(texture);
    }

    pub fn bind_framebuffer(&mut self, framebuffer: Option<D::Framebuffer>) {
        self.device.bind_framebuffer(framebuffer);
        self.bindings.set_framebuffer(framebuffer);
    }

    pub fn use_program(&mut self, program: Option<D::Program>) {
        self.device.use_program(program);
        self.bindings.set_program(program);
    }

    /// Binds null everywhere something is bound and returns to unit 0.
    pub fn reset_bindings(&mut self) {
        for target in [BufferTarget::Array, BufferTarget::ElementArray] {
            if self.bindings.buffer(target).is_some() {
                self.bind_buffer(target, None);
            }
        }
        let units: Vec<TextureUnit> = self.bindings.bound_units().collect();
        for unit in units {
            self.active_texture(unit);
            self.bind_texture(None);
        }
        if self.bindings.active_unit() != TextureUnit(0) {
            self.active_texture(TextureUnit(0));
        }
        if self.bindings.framebuffer().is_some() {
            self.bind_framebuffer(None);
        }
        if self.bindings.program().is_some() {
            self.use_program(None);
        }
    }

    pub(crate) fn delete_buffer(&mut self, buffer: D::Buffer) {
        self.device.delete_buffer(buffer);
        self.bindings.forget_buffer(buffer);
    }

    pub(crate) fn delete_texture(&mut self, texture: D::Texture) {
        self.device.delete_texture(texture);
        self.bindings.forget_texture(texture);
    }

    pub(crate) fn delete_framebuffer(&mut self, framebuffer: D::Framebuffer) {
        self.device.delete_framebuffer(framebuffer);
        self.bindings.forget_framebuffer(framebuffer);
    }

    pub(crate) fn delete_program(&mut self, program: D::Program) {
        self.device.delete_program(program);
        self.bindings.forget_program(program);
    }
}
