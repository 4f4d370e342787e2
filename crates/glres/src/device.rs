//! The state-machine surface `glres` drives.
//!
//! `Device` is deliberately close to the GL/WebGL call set: every method maps
//! onto one API entry point, takes typed enums instead of raw `GLenum`s, and
//! hands out backend-specific handle types. Higher layers never talk to a
//! backend directly; they go through [`crate::GpuContext`], which mirrors the
//! binding calls into [`crate::BindingState`].
//!
//! Two implementations ship with the crate:
//!
//! - `GlowDevice` (feature `glow`) forwards to a live `glow::Context`.
//! - [`crate::trace::TraceDevice`] keeps everything in memory and records a
//!   command log, which is what tests and `glprobe` run against.

use std::fmt::Debug;
use std::hash::Hash;

use crate::types::{
    Attachment, BufferTarget, IndexType, MagFilter, MinFilter, PixelType, ShaderStage,
    TextureFormat, TextureParameter, TextureUnit, WrapMode,
};

/// Value written with [`Device::tex_parameter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureParameterValue {
    Mag(MagFilter),
    Min(MinFilter),
    Wrap(WrapMode),
}

impl TextureParameterValue {
    pub fn gl_enum(self) -> u32 {
        match self {
            TextureParameterValue::Mag(filter) => filter.gl_enum(),
            TextureParameterValue::Min(filter) => filter.gl_enum(),
            TextureParameterValue::Wrap(mode) => mode.gl_enum(),
        }
    }
}

/// Full description of a 2D texture image upload at mip level 0.
#[derive(Debug, Clone, Copy)]
pub struct TexImage<'a> {
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub pixel_type: PixelType,
    /// `None` allocates storage without defining its contents.
    pub pixels: Option<&'a [u8]>,
}

pub trait Device {
    type Buffer: Copy + Eq + Hash + Debug;
    type Shader: Copy + Eq + Hash + Debug;
    type Program: Copy + Eq + Hash + Debug;
    type Texture: Copy + Eq + Hash + Debug;
    type Framebuffer: Copy + Eq + Hash + Debug;
    type UniformLocation: Clone + Debug;

    fn is_context_lost(&self) -> bool;
    fn supported_extensions(&self) -> Vec<String>;
    /// Activates a supported extension; returns false if the device refused.
    fn enable_extension(&mut self, name: &str) -> bool;

    fn create_shader(&mut self, stage: ShaderStage) -> Result<Self::Shader, String>;
    fn shader_source(&mut self, shader: Self::Shader, source: &str);
    fn compile_shader(&mut self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&mut self, shader: Self::Shader);

    fn create_program(&mut self) -> Result<Self::Program, String>;
    fn attach_shader(&mut self, program: Self::Program, shader: Self::Shader);
    fn bind_attrib_location(&mut self, program: Self::Program, index: u32, name: &str);
    fn link_program(&mut self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&mut self, program: Self::Program);
    /// Names of every active uniform, as the driver reports them.
    fn active_uniforms(&self, program: Self::Program) -> Vec<String>;
    fn uniform_location(&self, program: Self::Program, name: &str)
        -> Option<Self::UniformLocation>;
    fn use_program(&mut self, program: Option<Self::Program>);
    fn uniform_matrix_4_f32(
        &mut self,
        location: &Self::UniformLocation,
        transpose: bool,
        value: &[f32; 16],
    );

    fn create_buffer(&mut self) -> Result<Self::Buffer, String>;
    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<Self::Buffer>);
    /// Uploads `data` into the buffer bound at `target` with static usage.
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8]);
    fn delete_buffer(&mut self, buffer: Self::Buffer);
    fn enable_vertex_attrib_array(&mut self, index: u32);
    fn vertex_attrib_pointer_f32(&mut self, index: u32, size: u32, stride: u32, offset: u32);
    /// Issues an indexed triangle-list draw from the bound element buffer.
    fn draw_elements(&mut self, count: u32, index_type: IndexType, offset: u32);

    fn create_texture(&mut self) -> Result<Self::Texture, String>;
    fn active_texture(&mut self, unit: TextureUnit);
    fn bind_texture(&mut self, texture: Option<Self::Texture>);
    fn tex_image_2d(&mut self, image: TexImage<'_>);
    fn tex_parameter(&mut self, parameter: TextureParameter, value: TextureParameterValue);
    fn generate_mipmap(&mut self);
    fn unpack_alignment(&mut self, alignment: u32);
    fn delete_texture(&mut self, texture: Self::Texture);

    fn create_framebuffer(&mut self) -> Result<Self::Framebuffer, String>;
    fn bind_framebuffer(&mut self, framebuffer: Option<Self::Framebuffer>);
    fn framebuffer_texture_2d(&mut self, attachment: Attachment, texture: Option<Self::Texture>);
    /// Raw completeness code of the bound framebuffer.
    fn check_framebuffer_status(&self) -> u32;
    fn delete_framebuffer(&mut self, framebuffer: Self::Framebuffer);
}
