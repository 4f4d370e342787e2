use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};

use tracing::debug;

/// Resolves shader source text by identifier.
pub trait ShaderSources {
    fn shader_source(&self, id: &str) -> Option<String>;
}

impl ShaderSources for HashMap<String, String> {
    fn shader_source(&self, id: &str) -> Option<String> {
        self.get(id).cloned()
    }
}

impl ShaderSources for BTreeMap<String, String> {
    fn shader_source(&self, id: &str) -> Option<String> {
        self.get(id).cloned()
    }
}

impl<T: ShaderSources + ?Sized> ShaderSources for &T {
    fn shader_source(&self, id: &str) -> Option<String> {
        (**self).shader_source(id)
    }
}

/// Extensions tried, in order, for identifiers given without one.
const SHADER_EXTENSIONS: [&str; 4] = ["glsl", "vert", "frag", "vs"];

/// Shader sources stored as files under a root directory.
///
/// An identifier is a relative path (`"lighting/scene.frag"`). Identifiers
/// without an extension also match `<id>.glsl`, `<id>.vert`, `<id>.frag` and
/// `<id>.vs`. Identifiers that would escape the root never resolve.
#[derive(Debug, Clone)]
pub struct ShaderLibrary {
    root: PathBuf,
}

impl ShaderLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File an identifier maps to, if one exists.
    pub fn resolve(&self, id: &str) -> Option<PathBuf> {
        let relative = Path::new(id);
        let contained = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if id.is_empty() || !contained {
            return None;
        }

        let direct = self.root.join(relative);
        if direct.is_file() {
            return Some(direct);
        }
        if relative.extension().is_some() {
            return None;
        }
        SHADER_EXTENSIONS
            .iter()
            .map(|extension| direct.with_extension(extension))
            .find(|candidate| candidate.is_file())
    }
}

impl ShaderSources for ShaderLibrary {
    fn shader_source(&self, id: &str) -> Option<String> {
        let path = self.resolve(id)?;
        match std::fs::read_to_string(&path) {
            Ok(source) => Some(source),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "failed to read shader source");
                None
            }
        }
    }
}
