//! [`Device`] over a live OpenGL / OpenGL ES / WebGL context through `glow`.
//!
//! # Safety
//!
//! `GlowDevice` issues raw GL calls. The context it wraps must stay current
//! on the thread using the device for as long as the device is alive.

use glow::HasContext;

use crate::device::{Device, TexImage, TextureParameterValue};
use crate::types::{
    gl, Attachment, BufferTarget, IndexType, ShaderStage, TextureParameter, TextureUnit,
};

type Gl = glow::Context;

pub struct GlowDevice {
    gl: Gl,
    context_lost: bool,
}

impl GlowDevice {
    /// Wraps `gl`, which must be current on this thread.
    pub fn new(gl: Gl) -> Self {
        Self {
            gl,
            context_lost: false,
        }
    }

    /// Raw context, for pipeline state `glres` does not manage.
    pub fn gl(&self) -> &Gl {
        &self.gl
    }

    /// Called by the windowing layer when it observes a loss or restore.
    pub fn set_context_lost(&mut self, lost: bool) {
        self.context_lost = lost;
    }

    fn has_extension(&self, name: &str) -> bool {
        let supported = self.gl.supported_extensions();
        supported.contains(name) || supported.contains(&format!("GL_{name}"))
    }
}

impl std::fmt::Debug for GlowDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlowDevice")
            .field("context_lost", &self.context_lost)
            .finish_non_exhaustive()
    }
}

impl Device for GlowDevice {
    type Buffer = <Gl as HasContext>::Buffer;
    type Shader = <Gl as HasContext>::Shader;
    type Program = <Gl as HasContext>::Program;
    type Texture = <Gl as HasContext>::Texture;
    type Framebuffer = <Gl as HasContext>::Framebuffer;
    type UniformLocation = <Gl as HasContext>::UniformLocation;

    fn is_context_lost(&self) -> bool {
        self.context_lost
    }

    fn supported_extensions(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .gl
            .supported_extensions()
            .iter()
            .map(|name| name.strip_prefix("GL_").unwrap_or(name).to_string())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    fn enable_extension(&mut self, name: &str) -> bool {
        // Extensions are live once the driver reports them.
        self.has_extension(name)
    }

    fn create_shader(&mut self, stage: ShaderStage) -> Result<Self::Shader, String> {
        unsafe { self.gl.create_shader(stage.gl_enum()) }
    }

    fn shader_source(&mut self, shader: Self::Shader, source: &str) {
        unsafe { self.gl.shader_source(shader, source) }
    }

    fn compile_shader(&mut self, shader: Self::Shader) {
        unsafe { self.gl.compile_shader(shader) }
    }

    fn shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { self.gl.get_shader_compile_status(shader) }
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    fn delete_shader(&mut self, shader: Self::Shader) {
        unsafe { self.gl.delete_shader(shader) }
    }

    fn create_program(&mut self) -> Result<Self::Program, String> {
        unsafe { self.gl.create_program() }
    }

    fn attach_shader(&mut self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.attach_shader(program, shader) }
    }

    fn bind_attrib_location(&mut self, program: Self::Program, index: u32, name: &str) {
        unsafe { self.gl.bind_attrib_location(program, index, name) }
    }

    fn link_program(&mut self, program: Self::Program) {
        unsafe { self.gl.link_program(program) }
    }

    fn program_link_status(&self, program: Self::Program) -> bool {
        unsafe { self.gl.get_program_link_status(program) }
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        unsafe { self.gl.get_program_info_log(program) }
    }

    fn delete_program(&mut self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn active_uniforms(&self, program: Self::Program) -> Vec<String> {
        unsafe {
            let count = self.gl.get_active_uniforms(program);
            (0..count)
                .filter_map(|index| self.gl.get_active_uniform(program, index))
                .map(|uniform| uniform.name)
                .collect()
        }
    }

    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn use_program(&mut self, program: Option<Self::Program>) {
        unsafe { self.gl.use_program(program) }
    }

    fn uniform_matrix_4_f32(
        &mut self,
        location: &Self::UniformLocation,
        transpose: bool,
        value: &[f32; 16],
    ) {
        unsafe {
            self.gl
                .uniform_matrix_4_f32_slice(Some(location), transpose, value)
        }
    }

    fn create_buffer(&mut self) -> Result<Self::Buffer, String> {
        unsafe { self.gl.create_buffer() }
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<Self::Buffer>) {
        unsafe { self.gl.bind_buffer(target.gl_enum(), buffer) }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8]) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(target.gl_enum(), data, gl::STATIC_DRAW)
        }
    }

    fn delete_buffer(&mut self, buffer: Self::Buffer) {
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn vertex_attrib_pointer_f32(&mut self, index: u32, size: u32, stride: u32, offset: u32) {
        unsafe {
            self.gl.vertex_attrib_pointer_f32(
                index,
                size as i32,
                gl::FLOAT,
                false,
                stride as i32,
                offset as i32,
            )
        }
    }

    fn draw_elements(&mut self, count: u32, index_type: IndexType, offset: u32) {
        unsafe {
            self.gl.draw_elements(
                gl::TRIANGLES,
                count as i32,
                index_type.gl_enum(),
                offset as i32,
            )
        }
    }

    fn create_texture(&mut self) -> Result<Self::Texture, String> {
        unsafe { self.gl.create_texture() }
    }

    fn active_texture(&mut self, unit: TextureUnit) {
        unsafe { self.gl.active_texture(unit.gl_enum()) }
    }

    fn bind_texture(&mut self, texture: Option<Self::Texture>) {
        unsafe { self.gl.bind_texture(gl::TEXTURE_2D, texture) }
    }

    fn tex_image_2d(&mut self, image: TexImage<'_>) {
        let format = image.format.gl_enum();
        unsafe {
            self.gl.tex_image_2d(
                gl::TEXTURE_2D,
                0,
                format as i32,
                image.width as i32,
                image.height as i32,
                0,
                format,
                image.pixel_type.gl_enum(),
                image.pixels,
            )
        }
    }

    fn tex_parameter(&mut self, parameter: TextureParameter, value: TextureParameterValue) {
        unsafe {
            self.gl.tex_parameter_i32(
                gl::TEXTURE_2D,
                parameter.gl_enum(),
                value.gl_enum() as i32,
            )
        }
    }

    fn generate_mipmap(&mut self) {
        unsafe { self.gl.generate_mipmap(gl::TEXTURE_2D) }
    }

    fn unpack_alignment(&mut self, alignment: u32) {
        unsafe {
            self.gl
                .pixel_store_i32(gl::UNPACK_ALIGNMENT, alignment as i32)
        }
    }

    fn delete_texture(&mut self, texture: Self::Texture) {
        unsafe { self.gl.delete_texture(texture) }
    }

    fn create_framebuffer(&mut self) -> Result<Self::Framebuffer, String> {
        unsafe { self.gl.create_framebuffer() }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<Self::Framebuffer>) {
        unsafe { self.gl.bind_framebuffer(gl::FRAMEBUFFER, framebuffer) }
    }

    fn framebuffer_texture_2d(&mut self, attachment: Attachment, texture: Option<Self::Texture>) {
        unsafe {
            self.gl.framebuffer_texture_2d(
                gl::FRAMEBUFFER,
                attachment.gl_enum(),
                gl::TEXTURE_2D,
                texture,
                0,
            )
        }
    }

    fn check_framebuffer_status(&self) -> u32 {
        unsafe { self.gl.check_framebuffer_status(gl::FRAMEBUFFER) }
    }

    fn delete_framebuffer(&mut self, framebuffer: Self::Framebuffer) {
        unsafe { self.gl.delete_framebuffer(framebuffer) }
    }
}
