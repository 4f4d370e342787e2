use std::fmt;

/// Raw GL enumerant values shared by every backend.
pub mod gl {
    pub const TRIANGLES: u32 = 0x0004;

    pub const VERTEX_SHADER: u32 = 0x8B31;
    pub const FRAGMENT_SHADER: u32 = 0x8B30;

    pub const ARRAY_BUFFER: u32 = 0x8892;
    pub const ELEMENT_ARRAY_BUFFER: u32 = 0x8893;
    pub const STATIC_DRAW: u32 = 0x88E4;

    pub const UNSIGNED_BYTE: u32 = 0x1401;
    pub const UNSIGNED_SHORT: u32 = 0x1403;
    pub const UNSIGNED_INT: u32 = 0x1405;
    pub const FLOAT: u32 = 0x1406;

    pub const TEXTURE_2D: u32 = 0x0DE1;
    pub const TEXTURE0: u32 = 0x84C0;
    pub const UNPACK_ALIGNMENT: u32 = 0x0CF5;

    pub const DEPTH_COMPONENT: u32 = 0x1902;
    pub const ALPHA: u32 = 0x1906;
    pub const RGB: u32 = 0x1907;
    pub const RGBA: u32 = 0x1908;
    pub const LUMINANCE: u32 = 0x1909;
    pub const LUMINANCE_ALPHA: u32 = 0x190A;

    pub const NEAREST: u32 = 0x2600;
    pub const LINEAR: u32 = 0x2601;
    pub const NEAREST_MIPMAP_NEAREST: u32 = 0x2700;
    pub const LINEAR_MIPMAP_NEAREST: u32 = 0x2701;
    pub const NEAREST_MIPMAP_LINEAR: u32 = 0x2702;
    pub const LINEAR_MIPMAP_LINEAR: u32 = 0x2703;

    pub const TEXTURE_MAG_FILTER: u32 = 0x2800;
    pub const TEXTURE_MIN_FILTER: u32 = 0x2801;
    pub const TEXTURE_WRAP_S: u32 = 0x2802;
    pub const TEXTURE_WRAP_T: u32 = 0x2803;

    pub const REPEAT: u32 = 0x2901;
    pub const CLAMP_TO_EDGE: u32 = 0x812F;
    pub const MIRRORED_REPEAT: u32 = 0x8370;

    pub const FRAMEBUFFER: u32 = 0x8D40;
    pub const COLOR_ATTACHMENT0: u32 = 0x8CE0;
    pub const DEPTH_ATTACHMENT: u32 = 0x8D00;
    pub const STENCIL_ATTACHMENT: u32 = 0x8D20;
    pub const DEPTH_STENCIL_ATTACHMENT: u32 = 0x821A;

    pub const FRAMEBUFFER_COMPLETE: u32 = 0x8CD5;
    pub const FRAMEBUFFER_INCOMPLETE_ATTACHMENT: u32 = 0x8CD6;
    pub const FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT: u32 = 0x8CD7;
    pub const FRAMEBUFFER_INCOMPLETE_DIMENSIONS: u32 = 0x8CD9;
    pub const FRAMEBUFFER_UNSUPPORTED: u32 = 0x8CDD;
}

/// Programmable pipeline stage a shader object is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn gl_enum(self) -> u32 {
        match self {
            ShaderStage::Vertex => gl::VERTEX_SHADER,
            ShaderStage::Fragment => gl::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

impl BufferTarget {
    pub fn gl_enum(self) -> u32 {
        match self {
            BufferTarget::Array => gl::ARRAY_BUFFER,
            BufferTarget::ElementArray => gl::ELEMENT_ARRAY_BUFFER,
        }
    }
}

/// Integer width of the entries in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    U8,
    U16,
    U32,
}

impl IndexType {
    /// Picks the narrowest index type able to address `max_index`.
    pub fn smallest_for(max_index: u32) -> Self {
        if max_index <= u32::from(u8::MAX) {
            IndexType::U8
        } else if max_index <= u32::from(u16::MAX) {
            IndexType::U16
        } else {
            IndexType::U32
        }
    }

    pub fn size_bytes(self) -> usize {
        match self {
            IndexType::U8 => 1,
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }

    pub fn gl_enum(self) -> u32 {
        match self {
            IndexType::U8 => gl::UNSIGNED_BYTE,
            IndexType::U16 => gl::UNSIGNED_SHORT,
            IndexType::U32 => gl::UNSIGNED_INT,
        }
    }
}

/// Pixel layout of a texture's storage and of the data uploaded into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Alpha,
    Luminance,
    LuminanceAlpha,
    Rgb,
    Rgba,
    DepthComponent,
}

impl TextureFormat {
    pub fn gl_enum(self) -> u32 {
        match self {
            TextureFormat::Alpha => gl::ALPHA,
            TextureFormat::Luminance => gl::LUMINANCE,
            TextureFormat::LuminanceAlpha => gl::LUMINANCE_ALPHA,
            TextureFormat::Rgb => gl::RGB,
            TextureFormat::Rgba => gl::RGBA,
            TextureFormat::DepthComponent => gl::DEPTH_COMPONENT,
        }
    }

    /// Number of components per pixel when uploading 8-bit image data.
    pub fn channels(self) -> u32 {
        match self {
            TextureFormat::Alpha | TextureFormat::Luminance | TextureFormat::DepthComponent => 1,
            TextureFormat::LuminanceAlpha => 2,
            TextureFormat::Rgb => 3,
            TextureFormat::Rgba => 4,
        }
    }
}

/// Component type of texel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
    Float,
}

impl PixelType {
    pub fn gl_enum(self) -> u32 {
        match self {
            PixelType::UnsignedByte => gl::UNSIGNED_BYTE,
            PixelType::UnsignedShort => gl::UNSIGNED_SHORT,
            PixelType::UnsignedInt => gl::UNSIGNED_INT,
            PixelType::Float => gl::FLOAT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagFilter {
    Nearest,
    Linear,
}

impl MagFilter {
    pub fn gl_enum(self) -> u32 {
        match self {
            MagFilter::Nearest => gl::NEAREST,
            MagFilter::Linear => gl::LINEAR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapNearest,
    LinearMipmapLinear,
}

impl MinFilter {
    /// True for the four filters that sample from a mipmap chain.
    pub fn requires_mipmaps(self) -> bool {
        matches!(
            self,
            MinFilter::NearestMipmapNearest
                | MinFilter::NearestMipmapLinear
                | MinFilter::LinearMipmapNearest
                | MinFilter::LinearMipmapLinear
        )
    }

    pub fn gl_enum(self) -> u32 {
        match self {
            MinFilter::Nearest => gl::NEAREST,
            MinFilter::Linear => gl::LINEAR,
            MinFilter::NearestMipmapNearest => gl::NEAREST_MIPMAP_NEAREST,
            MinFilter::NearestMipmapLinear => gl::NEAREST_MIPMAP_LINEAR,
            MinFilter::LinearMipmapNearest => gl::LINEAR_MIPMAP_NEAREST,
            MinFilter::LinearMipmapLinear => gl::LINEAR_MIPMAP_LINEAR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapMode {
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

impl WrapMode {
    pub fn gl_enum(self) -> u32 {
        match self {
            WrapMode::Repeat => gl::REPEAT,
            WrapMode::ClampToEdge => gl::CLAMP_TO_EDGE,
            WrapMode::MirroredRepeat => gl::MIRRORED_REPEAT,
        }
    }
}

/// Texture parameter names written by the texture setup path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureParameter {
    MagFilter,
    MinFilter,
    WrapS,
    WrapT,
}

impl TextureParameter {
    pub fn gl_enum(self) -> u32 {
        match self {
            TextureParameter::MagFilter => gl::TEXTURE_MAG_FILTER,
            TextureParameter::MinFilter => gl::TEXTURE_MIN_FILTER,
            TextureParameter::WrapS => gl::TEXTURE_WRAP_S,
            TextureParameter::WrapT => gl::TEXTURE_WRAP_T,
        }
    }
}

/// Texture image unit (`TEXTURE0 + index`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TextureUnit(pub u32);

impl TextureUnit {
    pub fn gl_enum(self) -> u32 {
        gl::TEXTURE0 + self.0
    }
}

/// Named slot on a framebuffer that a texture can render into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attachment {
    Color(u32),
    Depth,
    Stencil,
    DepthStencil,
}

impl Attachment {
    pub fn gl_enum(self) -> u32 {
        match self {
            Attachment::Color(index) => gl::COLOR_ATTACHMENT0 + index,
            Attachment::Depth => gl::DEPTH_ATTACHMENT,
            Attachment::Stencil => gl::STENCIL_ATTACHMENT,
            Attachment::DepthStencil => gl::DEPTH_STENCIL_ATTACHMENT,
        }
    }
}

impl fmt::Display for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attachment::Color(index) => write!(f, "color{index}"),
            Attachment::Depth => f.write_str("depth"),
            Attachment::Stencil => f.write_str("stencil"),
            Attachment::DepthStencil => f.write_str("depth-stencil"),
        }
    }
}

/// Result of a framebuffer completeness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    Complete,
    IncompleteAttachment,
    MissingAttachment,
    IncompleteDimensions,
    Unsupported,
    Other(u32),
}

impl FramebufferStatus {
    pub fn from_gl(value: u32) -> Self {
        match value {
            gl::FRAMEBUFFER_COMPLETE => FramebufferStatus::Complete,
            gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => FramebufferStatus::IncompleteAttachment,
            gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => FramebufferStatus::MissingAttachment,
            gl::FRAMEBUFFER_INCOMPLETE_DIMENSIONS => FramebufferStatus::IncompleteDimensions,
            gl::FRAMEBUFFER_UNSUPPORTED => FramebufferStatus::Unsupported,
            other => FramebufferStatus::Other(other),
        }
    }

    pub fn is_complete(self) -> bool {
        matches!(self, FramebufferStatus::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_mipmap_filters_require_mipmaps() {
        let mipmapped = [
            MinFilter::NearestMipmapNearest,
            MinFilter::NearestMipmapLinear,
            MinFilter::LinearMipmapNearest,
            MinFilter::LinearMipmapLinear,
        ];
        for filter in mipmapped {
            assert!(filter.requires_mipmaps(), "{filter:?} should need mipmaps");
        }
        assert!(!MinFilter::Nearest.requires_mipmaps());
        assert!(!MinFilter::Linear.requires_mipmaps());
    }

    #[test]
    fn index_type_grows_with_max_index() {
        assert_eq!(IndexType::smallest_for(23), IndexType::U8);
        assert_eq!(IndexType::smallest_for(255), IndexType::U8);
        assert_eq!(IndexType::smallest_for(256), IndexType::U16);
        assert_eq!(IndexType::smallest_for(70_000), IndexType::U32);
    }

    #[test]
    fn framebuffer_status_maps_known_codes() {
        assert!(FramebufferStatus::from_gl(gl::FRAMEBUFFER_COMPLETE).is_complete());
        assert_eq!(
            FramebufferStatus::from_gl(gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT),
            FramebufferStatus::MissingAttachment
        );
        assert_eq!(FramebufferStatus::from_gl(0x1234), FramebufferStatus::Other(0x1234));
    }

    #[test]
    fn texture_units_offset_from_texture0() {
        assert_eq!(TextureUnit(0).gl_enum(), gl::TEXTURE0);
        assert_eq!(TextureUnit(3).gl_enum(), gl::TEXTURE0 + 3);
    }
}
