use std::collections::HashMap;

use glam::Mat4;
use tracing::{debug, warn};

use crate::context::GpuContext;
use crate::device::Device;
use crate::error::{GpuError, Result};
use crate::source::ShaderSources;
use crate::types::ShaderStage;

/// A linked shader program and the locations of its active uniforms.
///
/// The shader stages only live for the duration of [`Program::new`]; once
/// linking finishes, successfully or not, they are deleted and the program
/// alone stays on the device.
pub struct Program<D: Device> {
    handle: D::Program,
    uniforms: HashMap<String, D::UniformLocation>,
}

impl<D: Device> Program<D> {
    /// Compiles both stages, binds `attributes` to slots 0, 1, 2… in order,
    /// links, and caches every active uniform location.
    ///
    /// On any failure all device objects created so far are deleted before
    /// the error is returned.
    pub fn new<S: AsRef<str>>(
        ctx: &mut GpuContext<D>,
        vertex_source: &str,
        fragment_source: &str,
        attributes: &[S],
    ) -> Result<Self> {
        let vertex = compile_stage(ctx, ShaderStage::Vertex, vertex_source)?;
        let fragment = match compile_stage(ctx, ShaderStage::Fragment, fragment_source) {
            Ok(shader) => shader,
            Err(err) => {
                ctx.device_mut().delete_shader(vertex);
                return Err(err);
            }
        };

        let program = match ctx.device_mut().create_program() {
            Ok(program) => program,
            Err(reason) => {
                ctx.device_mut().delete_shader(vertex);
                ctx.device_mut().delete_shader(fragment);
                return Err(ctx.fail(GpuError::Allocation {
                    kind: "program",
                    reason,
                }));
            }
        };

        let device = ctx.device_mut();
        device.attach_shader(program, vertex);
        device.attach_shader(program, fragment);
        for (index, name) in attributes.iter().enumerate() {
            device.bind_attrib_location(program, index as u32, name.as_ref());
        }
        device.link_program(program);
        let linked = device.program_link_status(program);
        let log = if linked {
            String::new()
        } else {
            device.program_info_log(program)
        };
        device.delete_shader(vertex);
        device.delete_shader(fragment);

        if !linked {
            ctx.delete_program(program);
            return Err(ctx.fail(GpuError::Link { log }));
        }

        let mut uniforms = HashMap::new();
        for name in ctx.device().active_uniforms(program) {
            let Some(location) = ctx.device().uniform_location(program, &name) else {
                continue;
            };
            // Arrays are reported as `name[0]`; answer to the bare name too.
            if let Some(base) = name.strip_suffix("[0]") {
                uniforms.insert(base.to_string(), location.clone());
            }
            uniforms.insert(name, location);
        }
        debug!(
            program = ?program,
            uniforms = uniforms.len(),
            attributes = attributes.len(),
            "program linked"
        );

        Ok(Self {
            handle: program,
            uniforms,
        })
    }

    /// Like [`Program::new`], with both stages looked up in `sources`.
    ///
    /// Fails with [`GpuError::ShaderSourceNotFound`] before touching the
    /// device if either identifier does not resolve.
    pub fn from_sources<S, A>(
        ctx: &mut GpuContext<D>,
        sources: &S,
        vertex_id: &str,
        fragment_id: &str,
        attributes: &[A],
    ) -> Result<Self>
    where
        S: ShaderSources + ?Sized,
        A: AsRef<str>,
    {
        let Some(vertex_source) = sources.shader_source(vertex_id) else {
            return Err(ctx.fail(GpuError::ShaderSourceNotFound(vertex_id.to_string())));
        };
        let Some(fragment_source) = sources.shader_source(fragment_id) else {
            return Err(ctx.fail(GpuError::ShaderSourceNotFound(fragment_id.to_string())));
        };
        Self::new(ctx, &vertex_source, &fragment_source, attributes)
    }

    pub fn handle(&self) -> D::Program {
        self.handle
    }

    /// Makes this the current program.
    pub fn use_program(&self, ctx: &mut GpuContext<D>) {
        ctx.use_program(Some(self.handle));
    }

    pub fn is_in_use(&self, ctx: &GpuContext<D>) -> bool {
        ctx.bindings().program() == Some(self.handle)
    }

    /// Cached location of `name`, or [`GpuError::NotFound`] when the program
    /// has no such active uniform.
    pub fn uniform_location(&self, name: &str) -> Result<&D::UniformLocation> {
        self.uniforms.get(name).ok_or_else(|| GpuError::NotFound {
            uniform: name.to_string(),
        })
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    /// Names of the cached uniforms, sorted.
    pub fn uniform_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.uniforms.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Writes a 4x4 matrix uniform of the program currently in use.
    ///
    /// A missing uniform is reported through the diagnostics sink and
    /// returned as [`GpuError::NotFound`]; nothing is written.
    pub fn set_mat4(&self, ctx: &mut GpuContext<D>, name: &str, value: &Mat4) -> Result<()> {
        let location = match self.uniform_location(name) {
            Ok(location) => location.clone(),
            Err(err) => return Err(ctx.fail(err)),
        };
        if !self.is_in_use(ctx) {
            warn!(uniform = name, "setting uniform on a program that is not in use");
        }
        ctx.device_mut()
            .uniform_matrix_4_f32(&location, false, &value.to_cols_array());
        Ok(())
    }

    /// Deletes the program, unbinding it first if it is current.
    pub fn delete(self, ctx: &mut GpuContext<D>) {
        ctx.delete_program(self.handle);
    }
}

impl<D: Device> std::fmt::Debug for Program<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("handle", &self.handle)
            .field("uniforms", &self.uniform_names())
            .finish()
    }
}

fn compile_stage<D: Device>(
    ctx: &mut GpuContext<D>,
    stage: ShaderStage,
    source: &str,
) -> Result<D::Shader> {
    let shader = match ctx.device_mut().create_shader(stage) {
        Ok(shader) => shader,
        Err(reason) => {
            return Err(ctx.fail(GpuError::Allocation {
                kind: "shader",
                reason,
            }))
        }
    };
    let device = ctx.device_mut();
    device.shader_source(shader, source);
    device.compile_shader(shader);
    if device.shader_compile_status(shader) {
        return Ok(shader);
    }
    let log = device.shader_info_log(shader);
    device.delete_shader(shader);
    Err(ctx.fail(GpuError::Compile { stage, log }))
}
