use std::collections::BTreeMap;
use std::fmt;

use crate::device::Device;
use crate::types::{BufferTarget, TextureUnit};

/// Mirror of the device's "currently bound" slots.
///
/// The device keeps this state implicitly and globally; `GpuContext` updates
/// the mirror on every binding call so callers and tests can see exactly what
/// a sequence left behind.
pub struct BindingState<D: Device> {
    array_buffer: Option<D::Buffer>,
    element_buffer: Option<D::Buffer>,
    active_unit: TextureUnit,
    textures: BTreeMap<TextureUnit, D::Texture>,
    framebuffer: Option<D::Framebuffer>,
    program: Option<D::Program>,
}

impl<D: Device> BindingState<D> {
    pub(crate) fn new() -> Self {
        Self {
            array_buffer: None,
            element_buffer: None,
            active_unit: TextureUnit(0),
            textures: BTreeMap::new(),
            framebuffer: None,
            program: None,
        }
    }

    pub fn buffer(&self, target: BufferTarget) -> Option<D::Buffer> {
        match target {
            BufferTarget::Array => self.array_buffer,
            BufferTarget::ElementArray => self.element_buffer,
        }
    }

    pub fn active_unit(&self) -> TextureUnit {
        self.active_unit
    }

    /// Texture bound on `unit`, if any.
    pub fn texture(&self, unit: TextureUnit) -> Option<D::Texture> {
        self.textures.get(&unit).copied()
    }

    /// Units that currently have a texture bound, in ascending order.
    pub fn bound_units(&self) -> impl Iterator<Item = TextureUnit> + '_ {
        self.textures.keys().copied()
    }

    pub fn framebuffer(&self) -> Option<D::Framebuffer> {
        self.framebuffer
    }

    pub fn program(&self) -> Option<D::Program> {
        self.program
    }

    /// True when nothing is bound anywhere.
    pub fn is_clear(&self) -> bool {
        self.array_buffer.is_none()
            && self.element_buffer.is_none()
            && self.textures.is_empty()
            && self.framebuffer.is_none()
            && self.program.is_none()
    }

    pub(crate) fn set_buffer(&mut self, target: BufferTarget, buffer: Option<D::Buffer>) {
        match target {
            BufferTarget::Array => self.array_buffer = buffer,
            BufferTarget::ElementArray => self.element_buffer = buffer,
        }
    }

    pub(crate) fn set_active_unit(&mut self, unit: TextureUnit) {
        self.active_unit = unit;
    }

    pub(crate) fn set_texture(&mut self, texture: Option<D::Texture>) {
        match texture {
            Some(texture) => {
                self.textures.insert(self.active_unit, texture);
            }
            None => {
                self.textures.remove(&self.active_unit);
            }
        }
    }

    pub(crate) fn set_framebuffer(&mut self, framebuffer: Option<D::Framebuffer>) {
        self.framebuffer = framebuffer;
    }

    pub(crate) fn set_program(&mut self, program: Option<D::Program>) {
        self.program = program;
    }

    // Deleting a bound object implicitly unbinds it on the device.

    pub(crate) fn forget_buffer(&mut self, buffer: D::Buffer) {
        if self.array_buffer == Some(buffer) {
            self.array_buffer = None;
        }
        if self.element_buffer == Some(buffer) {
            self.element_buffer = None;
        }
    }

    pub(crate) fn forget_texture(&mut self, texture: D::Texture) {
        self.textures.retain(|_, bound| *bound != texture);
    }

    pub(crate) fn forget_framebuffer(&mut self, framebuffer: D::Framebuffer) {
        if self.framebuffer == Some(framebuffer) {
            self.framebuffer = None;
        }
    }

    pub(crate) fn forget_program(&mut self, program: D::Program) {
        if self.program == Some(program) {
            self.program = None;
        }
    }
}

impl<D: Device> Clone for BindingState<D> {
    fn clone(&self) -> Self {
        Self {
            array_buffer: self.array_buffer,
            element_buffer: self.element_buffer,
            active_unit: self.active_unit,
            textures: self.textures.clone(),
            framebuffer: self.framebuffer,
            program: self.program,
        }
    }
}

impl<D: Device> fmt::Debug for BindingState<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingState")
            .field("array_buffer", &self.array_buffer)
            .field("element_buffer", &self.element_buffer)
            .field("active_unit", &self.active_unit)
            .field("textures", &self.textures)
            .field("framebuffer", &self.framebuffer)
            .field("program", &self.program)
            .finish()
    }
}
