//! Resource manifests: which extensions, programs, textures, meshes and
//! render targets a `glres` application builds at startup.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read manifest '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid manifest: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

impl ConfigError {
    /// Individual validation problems, empty for other errors.
    pub fn problems(&self) -> &[String] {
        match self {
            ConfigError::Invalid(problems) => problems,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceManifest {
    pub version: u32,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub loader: LoaderSettings,
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub shaders: ShaderSettings,
    #[serde(default)]
    pub programs: Vec<ProgramEntry>,
    #[serde(default)]
    pub textures: Vec<TextureEntry>,
    #[serde(default)]
    pub meshes: Vec<MeshEntry>,
    #[serde(default)]
    pub framebuffers: Vec<FramebufferEntry>,
    #[serde(default)]
    pub shadow_maps: Vec<ShadowMapEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoaderSettings {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_timeout", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout: default_timeout(),
        }
    }
}

/// Capabilities advertised by an emulated device.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceSettings {
    /// Defaults to every extension the manifest requires.
    #[serde(default)]
    pub supported_extensions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShaderSettings {
    #[serde(default = "default_shader_directory")]
    pub directory: PathBuf,
}

impl Default for ShaderSettings {
    fn default() -> Self {
        Self {
            directory: default_shader_directory(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgramEntry {
    pub name: String,
    pub vertex: String,
    pub fragment: String,
    #[serde(default)]
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextureEntry {
    pub name: String,
    pub source: TextureSource,
    #[serde(default)]
    pub format: FormatName,
    #[serde(default)]
    pub mag_filter: MagFilterName,
    #[serde(default)]
    pub min_filter: MinFilterName,
    #[serde(default)]
    pub wrap: Option<WrapName>,
}

/// Either an image to load, or storage to allocate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TextureSource {
    Image {
        path: String,
    },
    Empty {
        width: u32,
        height: u32,
        #[serde(default)]
        pixel_type: PixelTypeName,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatName {
    Alpha,
    Luminance,
    LuminanceAlpha,
    Rgb,
    #[default]
    Rgba,
    DepthComponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelTypeName {
    #[default]
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagFilterName {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinFilterName {
    Nearest,
    #[default]
    Linear,
    NearestMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapNearest,
    LinearMipmapLinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapName {
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeshEntry {
    pub name: String,
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FramebufferEntry {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShadowMapEntry {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Framebuffer whose depth attachment receives the map.
    #[serde(default)]
    pub framebuffer: Option<String>,
}

fn default_workers() -> usize {
    2
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_shader_directory() -> PathBuf {
    PathBuf::from("shaders")
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl ResourceManifest {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: ResourceManifest = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    /// Extensions an emulated device should advertise.
    pub fn supported_extensions(&self) -> &[String] {
        self.device
            .supported_extensions
            .as_deref()
            .unwrap_or(&self.extensions)
    }

    /// Shader directory, resolved against `root` when relative.
    pub fn shader_directory(&self, root: &Path) -> PathBuf {
        if self.shaders.directory.is_absolute() {
            self.shaders.directory.clone()
        } else {
            root.join(&self.shaders.directory)
        }
    }

    pub fn framebuffer(&self, name: &str) -> Option<&FramebufferEntry> {
        self.framebuffers.iter().find(|framebuffer| framebuffer.name == name)
    }

    /// Checks cross-references and value ranges, reporting every problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.version != 1 {
            problems.push(format!(
                "unsupported manifest version {}; expected 1",
                self.version
            ));
        }

        if self.extensions.iter().any(|name| name.trim().is_empty()) {
            problems.push("extension names may not be empty".to_string());
        }

        if self.loader.workers == 0 {
            problems.push("loader.workers must be at least 1".to_string());
        }

        check_names("programs", self.programs.iter().map(|p| p.name.as_str()), &mut problems);
        check_names("textures", self.textures.iter().map(|t| t.name.as_str()), &mut problems);
        check_names("meshes", self.meshes.iter().map(|m| m.name.as_str()), &mut problems);
        check_names(
            "framebuffers",
            self.framebuffers.iter().map(|f| f.name.as_str()),
            &mut problems,
        );
        check_names(
            "shadow_maps",
            self.shadow_maps.iter().map(|s| s.name.as_str()),
            &mut problems,
        );

        for program in &self.programs {
            if program.vertex.trim().is_empty() || program.fragment.trim().is_empty() {
                problems.push(format!(
                    "program '{}' needs both a vertex and a fragment shader",
                    program.name
                ));
            }
        }

        for texture in &self.textures {
            match &texture.source {
                TextureSource::Image { path } => {
                    if path.trim().is_empty() {
                        problems.push(format!("texture '{}' has an empty path", texture.name));
                    }
                    if texture.format == FormatName::DepthComponent {
                        problems.push(format!(
                            "texture '{}' cannot load a depth_component image",
                            texture.name
                        ));
                    }
                }
                TextureSource::Empty { width, height, .. } => {
                    if *width == 0 || *height == 0 {
                        problems.push(format!(
                            "texture '{}' size must be greater than zero",
                            texture.name
                        ));
                    }
                }
            }
        }

        for mesh in &self.meshes {
            let valid = [mesh.width, mesh.height, mesh.depth]
                .iter()
                .all(|extent| extent.is_finite() && *extent > 0.0);
            if !valid {
                problems.push(format!(
                    "mesh '{}' dimensions must be finite and positive",
                    mesh.name
                ));
            }
        }

        for shadow in &self.shadow_maps {
            if shadow.width == 0 || shadow.height == 0 {
                problems.push(format!(
                    "shadow map '{}' size must be greater than zero",
                    shadow.name
                ));
            }
            if let Some(framebuffer) = &shadow.framebuffer {
                if self.framebuffer(framebuffer).is_none() {
                    problems.push(format!(
                        "shadow map '{}' references unknown framebuffer '{framebuffer}'",
                        shadow.name
                    ));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}

fn check_names<'a>(
    table: &str,
    names: impl Iterator<Item = &'a str>,
    problems: &mut Vec<String>,
) {
    let mut seen = BTreeSet::new();
    for name in names {
        if name.trim().is_empty() {
            problems.push(format!("{table} entry has an empty name"));
        } else if !seen.insert(name) {
            problems.push(format!("{table} defines '{name}' more than once"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1
extensions = ["OES_texture_float", "WEBGL_depth_texture"]

[loader]
workers = 3
timeout = "1500ms"

[shaders]
directory = "glsl"

[[programs]]
name = "scene"
vertex = "scene.vert"
fragment = "scene.frag"
attributes = ["aPosition", "aUV", "aNormal"]

[[textures]]
name = "crate"
source = { path = "assets/crate.png" }
min_filter = "linear_mipmap_linear"
wrap = "repeat"

[[textures]]
name = "scratch"
format = "rgb"
source = { width = 256, height = 128 }

[[meshes]]
name = "box"
width = 2.0
height = 2.0
depth = 2.0

[[framebuffers]]
name = "shadow_pass"

[[shadow_maps]]
name = "sun"
width = 1024
height = 1024
framebuffer = "shadow_pass"
"#;

    #[test]
    fn parses_sample_manifest() {
        let manifest = ResourceManifest::from_toml_str(SAMPLE).expect("parse manifest");
        assert_eq!(manifest.loader.workers, 3);
        assert_eq!(manifest.loader.timeout, Duration::from_millis(1500));
        assert_eq!(manifest.programs[0].attributes.len(), 3);

        let crate_texture = &manifest.textures[0];
        assert_eq!(
            crate_texture.source,
            TextureSource::Image {
                path: "assets/crate.png".into()
            }
        );
        assert_eq!(crate_texture.format, FormatName::Rgba);
        assert_eq!(crate_texture.min_filter, MinFilterName::LinearMipmapLinear);
        assert_eq!(crate_texture.wrap, Some(WrapName::Repeat));

        assert_eq!(
            manifest.textures[1].source,
            TextureSource::Empty {
                width: 256,
                height: 128,
                pixel_type: PixelTypeName::UnsignedByte
            }
        );
        assert_eq!(manifest.shadow_maps[0].framebuffer.as_deref(), Some("shadow_pass"));
        assert_eq!(manifest.shader_directory(Path::new("/srv")), PathBuf::from("/srv/glsl"));
    }

    #[test]
    fn device_extensions_default_to_required() {
        let manifest = ResourceManifest::from_toml_str(SAMPLE).unwrap();
        assert_eq!(manifest.supported_extensions(), manifest.extensions.as_slice());

        let overridden = ResourceManifest::from_toml_str(
            r#"
version = 1
extensions = ["A", "B"]

[device]
supported_extensions = ["A"]
"#,
        )
        .unwrap();
        assert_eq!(overridden.supported_extensions(), &["A".to_string()]);
    }

    #[test]
    fn defaults_apply_to_minimal_manifest() {
        let manifest = ResourceManifest::from_toml_str("version = 1").unwrap();
        assert_eq!(manifest.loader.workers, 2);
        assert_eq!(manifest.loader.timeout, Duration::from_secs(5));
        assert_eq!(manifest.shaders.directory, PathBuf::from("shaders"));
        assert!(manifest.programs.is_empty());
    }

    #[test]
    fn numeric_timeout_is_seconds() {
        let manifest = ResourceManifest::from_toml_str("version = 1\n[loader]\ntimeout = 2.5").unwrap();
        assert_eq!(manifest.loader.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn collects_every_problem() {
        let err = ResourceManifest::from_toml_str(
            r#"
version = 2

[loader]
workers = 0

[[meshes]]
name = "box"
width = 0.0
height = 1.0
depth = 1.0

[[meshes]]
name = "box"
width = 1.0
height = 1.0
depth = 1.0

[[shadow_maps]]
name = "sun"
width = 512
height = 512
framebuffer = "missing"
"#,
        )
        .unwrap_err();

        let problems = err.problems();
        assert_eq!(problems.len(), 5, "{problems:?}");
        assert!(problems.iter().any(|p| p.contains("version 2")));
        assert!(problems.iter().any(|p| p.contains("workers")));
        assert!(problems.iter().any(|p| p.contains("more than once")));
        assert!(problems.iter().any(|p| p.contains("finite and positive")));
        assert!(problems.iter().any(|p| p.contains("unknown framebuffer 'missing'")));
    }

    #[test]
    fn rejects_depth_image_texture() {
        let err = ResourceManifest::from_toml_str(
            r#"
version = 1

[[textures]]
name = "depth"
format = "depth_component"
source = { path = "depth.png" }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_filter_names() {
        let err = ResourceManifest::from_toml_str(
            r#"
version = 1

[[textures]]
name = "t"
min_filter = "trilinear"
source = { path = "t.png" }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let err = ResourceManifest::load(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Io { ref path, .. } if path == &missing));

        let present = dir.path().join("glres.toml");
        std::fs::write(&present, SAMPLE).unwrap();
        let manifest = ResourceManifest::load(&present).unwrap();
        assert_eq!(manifest.meshes.len(), 1);
    }
}
