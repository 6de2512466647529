//! Template registry
//!
//! Provides [`TemplateRegistry`], the JSON document mapping logical template
//! names to source paths relative to a template root.
//!
//! ```json
//! {
//!   "version": "3",
//!   "templates": { "scene_draft": "steps/scene_draft.md" },
//!   "partials": { "house_style": "partials/house_style.md" }
//! }
//! ```

use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Loaded, validated template registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateRegistry {
    version: String,
    templates: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    partials: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RawRegistry {
    version: Option<String>,
    templates: Option<BTreeMap<String, String>>,
    #[serde(default)]
    partials: BTreeMap<String, String>,
}

impl TemplateRegistry {
    /// Create registry from parts
    ///
    /// # Errors
    /// Returns error if any path is absolute or escapes the root
    pub fn new(
        version: impl Into<String>,
        templates: BTreeMap<String, String>,
        partials: BTreeMap<String, String>,
    ) -> Result<Self, RegistryError> {
        for (name, path) in templates.iter().chain(partials.iter()) {
            validate_relative(name, path)?;
        }
        Ok(Self {
            version: version.into(),
            templates,
            partials,
        })
    }

    /// Parse a registry document
    ///
    /// # Errors
    /// - [`RegistryError::MissingVersion`] if `version` is absent
    /// - [`RegistryError::MissingTemplates`] if `templates` is absent
    /// - [`RegistryError::Json`] for malformed JSON or wrong field types
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let raw: RawRegistry = serde_json::from_str(json)?;
        let version = raw.version.ok_or(RegistryError::MissingVersion)?;
        let templates = raw.templates.ok_or(RegistryError::MissingTemplates)?;
        Self::new(version, templates, raw.partials)
    }

    /// Load a registry file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is invalid
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Serialize back to a JSON document
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json_string(&self) -> Result<String, RegistryError> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    /// Registry version string
    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Template name → relative source path
    #[inline]
    #[must_use]
    pub fn templates(&self) -> &BTreeMap<String, String> {
        &self.templates
    }

    /// Partial name → relative source path
    #[inline]
    #[must_use]
    pub fn partials(&self) -> &BTreeMap<String, String> {
        &self.partials
    }

    /// Source path of a template
    #[inline]
    #[must_use]
    pub fn template_path(&self, name: &str) -> Option<&Path> {
        self.templates.get(name).map(Path::new)
    }

    /// Source path of a partial
    #[inline]
    #[must_use]
    pub fn partial_path(&self, name: &str) -> Option<&Path> {
        self.partials.get(name).map(Path::new)
    }
}

fn validate_relative(name: &str, path: &str) -> Result<(), RegistryError> {
    let invalid = || RegistryError::InvalidPath {
        name: name.to_string(),
        path: path.to_string(),
    };
    if path.is_empty() {
        return Err(invalid());
    }
    let escapes = Path::new(path).components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(invalid());
    }
    Ok(())
}

/// Provider of template source text
///
/// Paths are the relative paths recorded in the registry.
pub trait TemplateSource {
    /// Read the source text at a relative path
    ///
    /// # Errors
    /// Returns IO error if the source cannot be read
    fn read(&self, relative: &Path) -> std::io::Result<String>;
}

/// Template sources on disk under a root directory
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Create source rooted at a directory
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TemplateSource for DirSource {
    fn read(&self, relative: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(self.root.join(relative))
    }
}

/// In-memory template sources
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: BTreeMap<PathBuf, String>,
}

impl MemorySource {
    /// Create empty source
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a file (builder form)
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    /// Insert a file
    pub fn insert(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }
}

impl TemplateSource for MemorySource {
    fn read(&self, relative: &Path) -> std::io::Result<String> {
        self.files.get(relative).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no in-memory source at {}", relative.display()),
            )
        })
    }
}
