//! In-memory [`Device`] that records every call.
//!
//! `TraceDevice` allocates handles, tracks which objects are alive, and keeps
//! an ordered [`Command`] log. Shader "compilation" is a light syntactic
//! check (an entry point and balanced braces) and the active-uniform list is
//! read from `uniform` declarations, which is enough to exercise the full
//! resource lifecycle without a GPU.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::device::{Device, TexImage, TextureParameterValue};
use crate::types::{
    gl, Attachment, BufferTarget, IndexType, PixelType, ShaderStage, TextureFormat,
    TextureParameter, TextureUnit,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceBuffer(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceShader(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceProgram(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceTexture(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceFramebuffer(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceLocation {
    pub program: TraceProgram,
    pub name: String,
}

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    EnableExtension(String),
    CreateShader(TraceShader, ShaderStage),
    ShaderSource(TraceShader),
    CompileShader(TraceShader),
    DeleteShader(TraceShader),
    CreateProgram(TraceProgram),
    AttachShader(TraceProgram, TraceShader),
    BindAttribLocation {
        program: TraceProgram,
        index: u32,
        name: String,
    },
    LinkProgram(TraceProgram),
    DeleteProgram(TraceProgram),
    UseProgram(Option<TraceProgram>),
    UniformMatrix4 {
        location: TraceLocation,
        transpose: bool,
        value: [f32; 16],
    },
    CreateBuffer(TraceBuffer),
    BindBuffer(BufferTarget, Option<TraceBuffer>),
    BufferData {
        target: BufferTarget,
        bytes: Vec<u8>,
    },
    DeleteBuffer(TraceBuffer),
    EnableVertexAttribArray(u32),
    VertexAttribPointer {
        index: u32,
        size: u32,
        stride: u32,
        offset: u32,
    },
    DrawElements {
        count: u32,
        index_type: IndexType,
        offset: u32,
    },
    CreateTexture(TraceTexture),
    ActiveTexture(TextureUnit),
    BindTexture(Option<TraceTexture>),
    TexImage2d {
        format: TextureFormat,
        width: u32,
        height: u32,
        pixel_type: PixelType,
        pixels: Option<Vec<u8>>,
    },
    TexParameter(TextureParameter, TextureParameterValue),
    GenerateMipmap,
    UnpackAlignment(u32),
    DeleteTexture(TraceTexture),
    CreateFramebuffer(TraceFramebuffer),
    BindFramebuffer(Option<TraceFramebuffer>),
    FramebufferTexture2d(Attachment, Option<TraceTexture>),
    DeleteFramebuffer(TraceFramebuffer),
}

impl Command {
    /// GL entry point name, used for trace listings.
    pub fn name(&self) -> &'static str {
        match self {
            Command::EnableExtension(_) => "getExtension",
            Command::CreateShader(..) => "createShader",
            Command::ShaderSource(_) => "shaderSource",
            Command::CompileShader(_) => "compileShader",
            Command::DeleteShader(_) => "deleteShader",
            Command::CreateProgram(_) => "createProgram",
            Command::AttachShader(..) => "attachShader",
            Command::BindAttribLocation { .. } => "bindAttribLocation",
            Command::LinkProgram(_) => "linkProgram",
            Command::DeleteProgram(_) => "deleteProgram",
            Command::UseProgram(_) => "useProgram",
            Command::UniformMatrix4 { .. } => "uniformMatrix4fv",
            Command::CreateBuffer(_) => "createBuffer",
            Command::BindBuffer(..) => "bindBuffer",
            Command::BufferData { .. } => "bufferData",
            Command::DeleteBuffer(_) => "deleteBuffer",
            Command::EnableVertexAttribArray(_) => "enableVertexAttribArray",
            Command::VertexAttribPointer { .. } => "vertexAttribPointer",
            Command::DrawElements { .. } => "drawElements",
            Command::CreateTexture(_) => "createTexture",
            Command::ActiveTexture(_) => "activeTexture",
            Command::BindTexture(_) => "bindTexture",
            Command::TexImage2d { .. } => "texImage2D",
            Command::TexParameter(..) => "texParameteri",
            Command::GenerateMipmap => "generateMipmap",
            Command::UnpackAlignment(_) => "pixelStorei",
            Command::DeleteTexture(_) => "deleteTexture",
            Command::CreateFramebuffer(_) => "createFramebuffer",
            Command::BindFramebuffer(_) => "bindFramebuffer",
            Command::FramebufferTexture2d(..) => "framebufferTexture2D",
            Command::DeleteFramebuffer(_) => "deleteFramebuffer",
        }
    }
}

#[derive(Debug)]
struct ShaderRecord {
    stage: ShaderStage,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramRecord {
    attached: Vec<TraceShader>,
    attributes: BTreeMap<u32, String>,
    linked: bool,
    log: String,
    uniforms: Vec<String>,
}

#[derive(Debug, Default)]
pub struct TraceDevice {
    next_id: u32,
    extensions: Vec<String>,
    enabled: BTreeSet<String>,
    context_lost: bool,
    fail_links: bool,
    allocation_budget: Option<usize>,
    shaders: HashMap<TraceShader, ShaderRecord>,
    programs: HashMap<TraceProgram, ProgramRecord>,
    buffers: HashSet<TraceBuffer>,
    textures: HashMap<TraceTexture, Option<(u32, u32)>>,
    framebuffers: HashMap<TraceFramebuffer, BTreeMap<Attachment, TraceTexture>>,
    active_unit: TextureUnit,
    bound_textures: HashMap<TextureUnit, TraceTexture>,
    bound_framebuffer: Option<TraceFramebuffer>,
    commands: Vec<Command>,
}

impl TraceDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertises `names` as supported extensions.
    pub fn with_extensions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn set_context_lost(&mut self, lost: bool) {
        self.context_lost = lost;
    }

    /// Makes every subsequent link fail with a synthetic log.
    pub fn set_fail_links(&mut self, fail: bool) {
        self.fail_links = fail;
    }

    /// Makes every subsequent `create_*` call fail.
    pub fn set_refuse_allocations(&mut self, refuse: bool) {
        self.allocation_budget = refuse.then_some(0);
    }

    /// Lets the next `count` `create_*` calls succeed and refuses the rest.
    pub fn refuse_allocations_after(&mut self, count: usize) {
        self.allocation_budget = Some(count);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Command) -> bool,
    {
        self.commands.iter().filter(|command| predicate(command)).count()
    }

    pub fn enabled_extensions(&self) -> Vec<String> {
        self.enabled.iter().cloned().collect()
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    /// Total number of live device objects of any kind.
    pub fn live_objects(&self) -> usize {
        self.live_shaders()
            + self.live_programs()
            + self.live_buffers()
            + self.live_textures()
            + self.live_framebuffers()
    }

    pub fn attribute_bindings(&self, program: TraceProgram) -> Vec<(u32, String)> {
        self.programs
            .get(&program)
            .map(|record| {
                record
                    .attributes
                    .iter()
                    .map(|(index, name)| (*index, name.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn texture_size(&self, texture: TraceTexture) -> Option<(u32, u32)> {
        self.textures.get(&texture).copied().flatten()
    }

    pub fn framebuffer_attachment(
        &self,
        framebuffer: TraceFramebuffer,
        attachment: Attachment,
    ) -> Option<TraceTexture> {
        self.framebuffers
            .get(&framebuffer)
            .and_then(|attachments| attachments.get(&attachment).copied())
    }

    fn allocate(&mut self, kind: &str) -> Result<u32, String> {
        if let Some(budget) = self.allocation_budget.as_mut() {
            if *budget == 0 {
                return Err(format!("out of memory allocating {kind}"));
            }
            *budget -= 1;
        }
        self.next_id += 1;
        Ok(self.next_id)
    }

    fn record(&mut self, command: Command) {
        self.commands.push(command);
    }
}

impl Device for TraceDevice {
    type Buffer = TraceBuffer;
    type Shader = TraceShader;
    type Program = TraceProgram;
    type Texture = TraceTexture;
    type Framebuffer = TraceFramebuffer;
    type UniformLocation = TraceLocation;

    fn is_context_lost(&self) -> bool {
        self.context_lost
    }

    fn supported_extensions(&self) -> Vec<String> {
        self.extensions.clone()
    }

    fn enable_extension(&mut self, name: &str) -> bool {
        if !self.extensions.iter().any(|supported| supported == name) {
            return false;
        }
        self.enabled.insert(name.to_string());
        self.record(Command::EnableExtension(name.to_string()));
        true
    }

    fn create_shader(&mut self, stage: ShaderStage) -> Result<TraceShader, String> {
        let shader = TraceShader(self.allocate("shader")?);
        self.shaders.insert(
            shader,
            ShaderRecord {
                stage,
                source: String::new(),
                compiled: false,
                log: String::new(),
            },
        );
        self.record(Command::CreateShader(shader, stage));
        Ok(shader)
    }

    fn shader_source(&mut self, shader: TraceShader, source: &str) {
        if let Some(record) = self.shaders.get_mut(&shader) {
            record.source = source.to_string();
        }
        self.record(Command::ShaderSource(shader));
    }

    fn compile_shader(&mut self, shader: TraceShader) {
        let lost = self.context_lost;
        if let Some(record) = self.shaders.get_mut(&shader) {
            let outcome = if lost {
                Err(String::new())
            } else {
                check_source(&record.source)
            };
            match outcome {
                Ok(()) => {
                    record.compiled = true;
                    record.log.clear();
                }
                Err(log) => {
                    record.compiled = false;
                    record.log = log;
                }
            }
        }
        self.record(Command::CompileShader(shader));
    }

    fn shader_compile_status(&self, shader: TraceShader) -> bool {
        self.shaders
            .get(&shader)
            .map(|record| record.compiled)
            .unwrap_or(false)
    }

    fn shader_info_log(&self, shader: TraceShader) -> String {
        self.shaders
            .get(&shader)
            .map(|record| record.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: TraceShader) {
        self.shaders.remove(&shader);
        self.record(Command::DeleteShader(shader));
    }

    fn create_program(&mut self) -> Result<TraceProgram, String> {
        let program = TraceProgram(self.allocate("program")?);
        self.programs.insert(program, ProgramRecord::default());
        self.record(Command::CreateProgram(program));
        Ok(program)
    }

    fn attach_shader(&mut self, program: TraceProgram, shader: TraceShader) {
        if let Some(record) = self.programs.get_mut(&program) {
            record.attached.push(shader);
        }
        self.record(Command::AttachShader(program, shader));
    }

    fn bind_attrib_location(&mut self, program: TraceProgram, index: u32, name: &str) {
        if let Some(record) = self.programs.get_mut(&program) {
            record.attributes.insert(index, name.to_string());
        }
        self.record(Command::BindAttribLocation {
            program,
            index,
            name: name.to_string(),
        });
    }

    fn link_program(&mut self, program: TraceProgram) {
        let stages: Vec<(ShaderStage, bool, String)> = self
            .programs
            .get(&program)
            .map(|record| {
                record
                    .attached
                    .iter()
                    .filter_map(|shader| self.shaders.get(shader))
                    .map(|shader| (shader.stage, shader.compiled, shader.source.clone()))
                    .collect()
            })
            .unwrap_or_default();
        let has_stage = |wanted: ShaderStage| {
            stages
                .iter()
                .any(|(stage, compiled, _)| *stage == wanted && *compiled)
        };
        let outcome = if self.context_lost {
            Err(String::new())
        } else if self.fail_links {
            Err("ERROR: simulated link failure".to_string())
        } else if !has_stage(ShaderStage::Vertex) || !has_stage(ShaderStage::Fragment) {
            Err("ERROR: program needs a compiled vertex and fragment shader".to_string())
        } else {
            let mut uniforms = Vec::new();
            for (_, _, source) in &stages {
                for name in declared_uniforms(source) {
                    if !uniforms.contains(&name) {
                        uniforms.push(name);
                    }
                }
            }
            Ok(uniforms)
        };
        if let Some(record) = self.programs.get_mut(&program) {
            match outcome {
                Ok(uniforms) => {
                    record.linked = true;
                    record.log.clear();
                    record.uniforms = uniforms;
                }
                Err(log) => {
                    record.linked = false;
                    record.log = log;
                    record.uniforms.clear();
                }
            }
        }
        self.record(Command::LinkProgram(program));
    }

    fn program_link_status(&self, program: TraceProgram) -> bool {
        self.programs
            .get(&program)
            .map(|record| record.linked)
            .unwrap_or(false)
    }

    fn program_info_log(&self, program: TraceProgram) -> String {
        self.programs
            .get(&program)
            .map(|record| record.log.clone())
            .unwrap_or_default()
    }

    fn delete_program(&mut self, program: TraceProgram) {
        self.programs.remove(&program);
        self.record(Command::DeleteProgram(program));
    }

    fn active_uniforms(&self, program: TraceProgram) -> Vec<String> {
        self.programs
            .get(&program)
            .map(|record| record.uniforms.clone())
            .unwrap_or_default()
    }

    fn uniform_location(&self, program: TraceProgram, name: &str) -> Option<TraceLocation> {
        let record = self.programs.get(&program)?;
        if record.linked && record.uniforms.iter().any(|uniform| uniform == name) {
            Some(TraceLocation {
                program,
                name: name.to_string(),
            })
        } else {
            None
        }
    }

    fn use_program(&mut self, program: Option<TraceProgram>) {
        self.record(Command::UseProgram(program));
    }

    fn uniform_matrix_4_f32(&mut self, location: &TraceLocation, transpose: bool, value: &[f32; 16]) {
        self.record(Command::UniformMatrix4 {
            location: location.clone(),
            transpose,
            value: *value,
        });
    }

    fn create_buffer(&mut self) -> Result<TraceBuffer, String> {
        let buffer = TraceBuffer(self.allocate("buffer")?);
        self.buffers.insert(buffer);
        self.record(Command::CreateBuffer(buffer));
        Ok(buffer)
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<TraceBuffer>) {
        self.record(Command::BindBuffer(target, buffer));
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8]) {
        self.record(Command::BufferData {
            target,
            bytes: data.to_vec(),
        });
    }

    fn delete_buffer(&mut self, buffer: TraceBuffer) {
        self.buffers.remove(&buffer);
        self.record(Command::DeleteBuffer(buffer));
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.record(Command::EnableVertexAttribArray(index));
    }

    fn vertex_attrib_pointer_f32(&mut self, index: u32, size: u32, stride: u32, offset: u32) {
        self.record(Command::VertexAttribPointer {
            index,
            size,
            stride,
            offset,
        });
    }

    fn draw_elements(&mut self, count: u32, index_type: IndexType, offset: u32) {
        self.record(Command::DrawElements {
            count,
            index_type,
            offset,
        });
    }

    fn create_texture(&mut self) -> Result<TraceTexture, String> {
        let texture = TraceTexture(self.allocate("texture")?);
        self.textures.insert(texture, None);
        self.record(Command::CreateTexture(texture));
        Ok(texture)
    }

    fn active_texture(&mut self, unit: TextureUnit) {
        self.active_unit = unit;
        self.record(Command::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, texture: Option<TraceTexture>) {
        match texture {
            Some(texture) => {
                self.bound_textures.insert(self.active_unit, texture);
            }
            None => {
                self.bound_textures.remove(&self.active_unit);
            }
        }
        self.record(Command::BindTexture(texture));
    }

    fn tex_image_2d(&mut self, image: TexImage<'_>) {
        if let Some(texture) = self.bound_textures.get(&self.active_unit) {
            self.textures
                .insert(*texture, Some((image.width, image.height)));
        }
        self.record(Command::TexImage2d {
            format: image.format,
            width: image.width,
            height: image.height,
            pixel_type: image.pixel_type,
            pixels: image.pixels.map(<[u8]>::to_vec),
        });
    }

    fn tex_parameter(&mut self, parameter: TextureParameter, value: TextureParameterValue) {
        self.record(Command::TexParameter(parameter, value));
    }

    fn generate_mipmap(&mut self) {
        self.record(Command::GenerateMipmap);
    }

    fn unpack_alignment(&mut self, alignment: u32) {
        self.record(Command::UnpackAlignment(alignment));
    }

    fn delete_texture(&mut self, texture: TraceTexture) {
        self.textures.remove(&texture);
        self.bound_textures.retain(|_, bound| *bound != texture);
        for attachments in self.framebuffers.values_mut() {
            attachments.retain(|_, attached| *attached != texture);
        }
        self.record(Command::DeleteTexture(texture));
    }

    fn create_framebuffer(&mut self) -> Result<TraceFramebuffer, String> {
        let framebuffer = TraceFramebuffer(self.allocate("framebuffer")?);
        self.framebuffers.insert(framebuffer, BTreeMap::new());
        self.record(Command::CreateFramebuffer(framebuffer));
        Ok(framebuffer)
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<TraceFramebuffer>) {
        self.bound_framebuffer = framebuffer;
        self.record(Command::BindFramebuffer(framebuffer));
    }

    fn framebuffer_texture_2d(&mut self, attachment: Attachment, texture: Option<TraceTexture>) {
        if let Some(bound) = self.bound_framebuffer {
            if let Some(attachments) = self.framebuffers.get_mut(&bound) {
                match texture {
                    Some(texture) => {
                        attachments.insert(attachment, texture);
                    }
                    None => {
                        attachments.remove(&attachment);
                    }
                }
            }
        }
        self.record(Command::FramebufferTexture2d(attachment, texture));
    }

    fn check_framebuffer_status(&self) -> u32 {
        let Some(bound) = self.bound_framebuffer else {
            return gl::FRAMEBUFFER_COMPLETE;
        };
        let Some(attachments) = self.framebuffers.get(&bound) else {
            return gl::FRAMEBUFFER_UNSUPPORTED;
        };
        if attachments.is_empty() {
            return gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT;
        }
        let mut sizes = Vec::with_capacity(attachments.len());
        for texture in attachments.values() {
            match self.textures.get(texture).copied().flatten() {
                Some(size) => sizes.push(size),
                None => return gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT,
            }
        }
        if sizes.windows(2).any(|pair| pair[0] != pair[1]) {
            return gl::FRAMEBUFFER_INCOMPLETE_DIMENSIONS;
        }
        gl::FRAMEBUFFER_COMPLETE
    }

    fn delete_framebuffer(&mut self, framebuffer: TraceFramebuffer) {
        self.framebuffers.remove(&framebuffer);
        if self.bound_framebuffer == Some(framebuffer) {
            self.bound_framebuffer = None;
        }
        self.record(Command::DeleteFramebuffer(framebuffer));
    }
}

fn check_source(source: &str) -> Result<(), String> {
    if !source.contains("void main") {
        return Err("ERROR: 0:0: 'main' : no entry point defined".to_string());
    }
    let mut depth = 0i64;
    for (index, line) in source.lines().enumerate() {
        for ch in line.chars() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(format!("ERROR: 0:{}: '}}' : syntax error", index + 1));
                    }
                }
                _ => {}
            }
        }
    }
    if depth != 0 {
        return Err("ERROR: 0:0: '' : unexpected end of source".to_string());
    }
    Ok(())
}

/// Names of the uniforms declared in `source`; arrays report as `name[0]`.
fn declared_uniforms(source: &str) -> Vec<String> {
    let mut names = Vec::new();
    for line in source.lines() {
        let Some(rest) = line.trim().strip_prefix("uniform ") else {
            continue;
        };
        let declaration = rest.split(';').next().unwrap_or(rest);
        let mut declarators = declaration.split(',');
        if let Some(first) = declarators.next() {
            if let Some(name) = first.split_whitespace().last() {
                names.push(normalize_uniform(name));
            }
        }
        for declarator in declarators {
            let name = declarator.trim();
            if !name.is_empty() {
                names.push(normalize_uniform(name));
            }
        }
    }
    names
}

fn normalize_uniform(name: &str) -> String {
    match name.find('[') {
        Some(bracket) => format!("{}[0]", name[..bracket].trim()),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_declarations_are_discovered() {
        let source = r"
            precision mediump float;
            uniform mat4 uMVMatrix;
            uniform highp vec3 uLightPos, uEyePos;
            uniform sampler2D uSamplers[4];
            void main() {}
        ";
        assert_eq!(
            declared_uniforms(source),
            vec!["uMVMatrix", "uLightPos", "uEyePos", "uSamplers[0]"]
        );
    }

    #[test]
    fn compile_check_rejects_unbalanced_source() {
        assert!(check_source("void main() { gl_FragColor = vec4(1.0); }").is_ok());
        assert!(check_source("void main() { ").is_err());
        assert!(check_source("void main() } {").is_err());
        assert!(check_source("float f() { return 1.0; }").is_err());
    }

    #[test]
    fn refusing_allocations_reports_reason() {
        let mut device = TraceDevice::new();
        device.set_refuse_allocations(true);
        let err = device.create_buffer().unwrap_err();
        assert!(err.contains("buffer"));
        assert_eq!(device.live_buffers(), 0);
        assert!(device.commands().is_empty());

        device.set_refuse_allocations(false);
        assert!(device.create_buffer().is_ok());
    }

    #[test]
    fn allocation_budget_runs_out() {
        let mut device = TraceDevice::new();
        device.refuse_allocations_after(2);
        let first = device.create_texture().unwrap();
        device.bind_texture(Some(first));
        device.tex_image_2d(TexImage {
            format: TextureFormat::Rgba,
            width: 3,
            height: 5,
            pixel_type: PixelType::UnsignedByte,
            pixels: None,
        });
        assert_eq!(device.texture_size(first), Some((3, 5)));
        assert!(device.create_buffer().is_ok());
        assert!(device.create_framebuffer().unwrap_err().contains("framebuffer"));
        assert_eq!(device.live_objects(), 2);

        let recorded = device.take_commands();
        assert!(!recorded.is_empty());
        assert!(device.commands().is_empty());
    }

    #[test]
    fn framebuffer_status_tracks_attachments() {
        let mut device = TraceDevice::new();
        let framebuffer = device.create_framebuffer().unwrap();
        device.bind_framebuffer(Some(framebuffer));
        assert_eq!(
            device.check_framebuffer_status(),
            gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT
        );

        let texture = device.create_texture().unwrap();
        device.framebuffer_texture_2d(Attachment::Depth, Some(texture));
        assert_eq!(
            device.check_framebuffer_status(),
            gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT
        );

        device.bind_texture(Some(texture));
        device.tex_image_2d(TexImage {
            format: TextureFormat::DepthComponent,
            width: 16,
            height: 16,
            pixel_type: PixelType::UnsignedInt,
            pixels: None,
        });
        assert_eq!(device.check_framebuffer_status(), gl::FRAMEBUFFER_COMPLETE);
        assert_eq!(
            device.framebuffer_attachment(framebuffer, Attachment::Depth),
            Some(texture)
        );
    }
}
