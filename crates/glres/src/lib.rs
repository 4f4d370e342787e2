//! GPU resource handles over a GL-style state machine.
//!
//! `glres` turns the bind/configure/unbind call sequences of OpenGL ES 2 /
//! WebGL into a handful of owned resources:
//!
//! - [`Program`]: compiled and linked shader pair with a per-instance uniform
//!   location cache.
//! - [`Mesh`]: static vertex and index buffers with a fixed interleaved
//!   layout (position, uv, normal).
//! - [`Texture`]: 2D texture created immediately or, through a
//!   [`TextureLoader`], once an image finishes decoding off-thread.
//! - [`Framebuffer`] and [`ShadowMap`]: off-screen render targets.
//!
//! Every operation goes through a [`GpuContext`], which wraps a [`Device`]
//! backend and mirrors what that device currently has bound.

pub mod device;
pub mod trace;
pub mod types;

mod context;
mod diagnostics;
mod error;
mod extensions;
mod framebuffer;
mod loader;
mod mesh;
mod program;
mod source;
mod state;
mod texture;

#[cfg(feature = "glow")]
pub mod glow_backend;

pub use context::GpuContext;
pub use device::{Device, TexImage, TextureParameterValue};
pub use diagnostics::{DiagnosticEntry, Diagnostics, MemoryDiagnostics, Severity, TracingDiagnostics};
pub use error::{GpuError, LoadError, Result};
pub use extensions::require_extensions;
pub use framebuffer::{Framebuffer, ShadowMap};
pub use loader::{FetchImageSource, ImageSource, LoadEvent, MemoryImageSource, TextureLoader};
pub use mesh::{
    Geometry, Mesh, Vertex, MODEL_VIEW_UNIFORM, NORMAL_OFFSET, POSITION_OFFSET, UV_OFFSET,
    VERTEX_STRIDE,
};
pub use program::Program;
pub use source::{ShaderLibrary, ShaderSources};
pub use state::BindingState;
pub use texture::{Texture, TextureDescriptor, TextureParams, TextureState};
pub use types::{
    Attachment, BufferTarget, FramebufferStatus, IndexType, MagFilter, MinFilter, PixelType,
    ShaderStage, TextureFormat, TextureParameter, TextureUnit, WrapMode,
};
