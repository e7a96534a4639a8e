//! Resource locations and the sources model documents are read from
//!
//! Model documents live in a resource-pack namespace (`namespace:path`).
//! References inside a document are resolved relative to the directory of
//! the document that contains them:
//!
//! - `ns:path` is taken as-is
//! - `/path` is absolute within the referencing document's namespace
//! - `~/path` points into the `optifine/` folder of that namespace
//! - anything else is joined with the referencing document's directory,
//!   with `.` and `..` segments normalized
//!
//! # Example
//!
//! ```
//! use cemkit::resource::ResourceLocation;
//!
//! let jem = ResourceLocation::new("minecraft", "optifine/cem/zombie.jem");
//! assert_eq!(jem.resolve("zombie_head.jpm").to_string(), "minecraft:optifine/cem/zombie_head.jpm");
//! assert_eq!(jem.resolve("../mob/arm.jpm").to_string(), "minecraft:optifine/mob/arm.jpm");
//! assert_eq!(jem.resolve("~/cem/shared.jpm").to_string(), "minecraft:optifine/cem/shared.jpm");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Namespace used when a location string carries none.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Folder that `~/` references expand to.
const OPTIFINE_ROOT: &str = "optifine";

/// A namespaced resource path, e.g. `minecraft:optifine/cem/zombie.jem`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceLocation {
    namespace: String,
    path: String,
}

impl ResourceLocation {
    /// Create a location from an explicit namespace and path.
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), path: path.into() }
    }

    /// Parse `namespace:path`, falling back to `default_namespace` when no
    /// namespace is present.
    pub fn parse_with_default(location: &str, default_namespace: &str) -> Self {
        match location.split_once(':') {
            Some((namespace, path)) if !namespace.is_empty() => Self::new(namespace, path),
            Some((_, path)) => Self::new(default_namespace, path),
            None => Self::new(default_namespace, location),
        }
    }

    /// Parse `namespace:path` using [`DEFAULT_NAMESPACE`].
    pub fn parse(location: &str) -> Self {
        Self::parse_with_default(location, DEFAULT_NAMESPACE)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Directory part of the path, without a trailing slash.
    pub fn directory(&self) -> &str {
        self.path.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    /// Resolve a reference found inside the document at this location.
    pub fn resolve(&self, reference: &str) -> ResourceLocation {
        if reference.contains(':') {
            return Self::parse_with_default(reference, &self.namespace);
        }
        if let Some(absolute) = reference.strip_prefix('/') {
            return Self::new(self.namespace.clone(), normalize(absolute));
        }
        if let Some(rest) = reference.strip_prefix("~/") {
            return Self::new(self.namespace.clone(), normalize(&format!("{OPTIFINE_ROOT}/{rest}")));
        }
        let joined = match self.directory() {
            "" => reference.to_string(),
            dir => format!("{dir}/{reference}"),
        };
        Self::new(self.namespace.clone(), normalize(&joined))
    }
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

/// Collapse empty, `.` and `..` segments. `..` never climbs above the
/// namespace root.
fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Error reading a resource.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ResourceError {
    /// Nothing exists at the location
    #[error("Resource not found: {0}")]
    NotFound(ResourceLocation),
    /// The resource exists but could not be read
    #[error("Error reading resource '{location}': {message}")]
    Io { location: ResourceLocation, message: String },
}

/// Somewhere model documents can be read from.
///
/// Reads are blocking and happen only while documents load, never per frame.
pub trait ResourceSource: Send + Sync {
    /// Read the resource at `location` as UTF-8 text.
    fn read_to_string(&self, location: &ResourceLocation) -> Result<String, ResourceError>;
}

/// Reads resources from an unpacked resource pack (`assets/<namespace>/<path>`).
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Create a source rooted at a resource pack directory (the one
    /// containing `assets/`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path a location maps to.
    pub fn file_path(&self, location: &ResourceLocation) -> PathBuf {
        let mut path = self.root.join("assets").join(location.namespace());
        for segment in location.path().split('/') {
            path.push(segment);
        }
        path
    }
}

impl ResourceSource for DirectorySource {
    fn read_to_string(&self, location: &ResourceLocation) -> Result<String, ResourceError> {
        let path = self.file_path(location);
        if !path.is_file() {
            return Err(ResourceError::NotFound(location.clone()));
        }
        fs::read_to_string(&path)
            .map_err(|e| ResourceError::Io { location: location.clone(), message: e.to_string() })
    }
}

/// In-memory resources, keyed by location.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: BTreeMap<ResourceLocation, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a resource.
    pub fn insert(&mut self, location: ResourceLocation, contents: impl Into<String>) {
        self.files.insert(location, contents.into());
    }

    /// Builder form of [`MemorySource::insert`], taking a `namespace:path` string.
    pub fn with(mut self, location: &str, contents: impl Into<String>) -> Self {
        self.insert(ResourceLocation::parse(location), contents);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ResourceSource for MemorySource {
    fn read_to_string(&self, location: &ResourceLocation) -> Result<String, ResourceError> {
        self.files.get(location).cloned().ok_or_else(|| ResourceError::NotFound(location.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn jem() -> ResourceLocation {
        ResourceLocation::new("minecraft", "optifine/cem/zombie.jem")
    }

    #[test]
    fn test_parse_with_namespace() {
        let loc = ResourceLocation::parse("mymod:models/thing.jpm");
        assert_eq!(loc.namespace(), "mymod");
        assert_eq!(loc.path(), "models/thing.jpm");
    }

    #[test]
    fn test_parse_without_namespace() {
        let loc = ResourceLocation::parse("optifine/cem/cow.jem");
        assert_eq!(loc.namespace(), "minecraft");
        assert_eq!(loc.to_string(), "minecraft:optifine/cem/cow.jem");
    }

    #[test]
    fn test_resolve_same_directory() {
        assert_eq!(jem().resolve("head.jpm"), ResourceLocation::new("minecraft", "optifine/cem/head.jpm"));
        assert_eq!(jem().resolve("./head.jpm"), ResourceLocation::new("minecraft", "optifine/cem/head.jpm"));
    }

    #[test]
    fn test_resolve_subdirectory_and_parent() {
        assert_eq!(jem().resolve("parts/arm.jpm").path(), "optifine/cem/parts/arm.jpm");
        assert_eq!(jem().resolve("../arm.jpm").path(), "optifine/arm.jpm");
        assert_eq!(jem().resolve("../../../../arm.jpm").path(), "arm.jpm");
    }

    #[test]
    fn test_resolve_absolute_forms() {
        assert_eq!(jem().resolve("/textures/entity/z.png").path(), "textures/entity/z.png");
        assert_eq!(jem().resolve("~/cem/z.jpm").path(), "optifine/cem/z.jpm");
        let namespaced = jem().resolve("other:cem/z.jpm");
        assert_eq!(namespaced.namespace(), "other");
        assert_eq!(namespaced.path(), "cem/z.jpm");
    }

    #[test]
    fn test_resolve_from_root_level_document() {
        let loc = ResourceLocation::new("minecraft", "zombie.jem");
        assert_eq!(loc.directory(), "");
        assert_eq!(loc.resolve("head.jpm").path(), "head.jpm");
    }

    #[test]
    fn test_memory_source() {
        let source = MemorySource::new().with("minecraft:a/b.jpm", "{}");
        assert_eq!(source.len(), 1);
        assert_eq!(source.read_to_string(&ResourceLocation::parse("a/b.jpm")).unwrap(), "{}");
        let missing = source.read_to_string(&ResourceLocation::parse("a/c.jpm"));
        assert!(matches!(missing, Err(ResourceError::NotFound(_))));
    }

    #[test]
    fn test_directory_source_reads_pack_layout() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("assets/minecraft/optifine/cem");
        fs::create_dir_all(&dir).unwrap();
        let mut file = fs::File::create(dir.join("head.jpm")).unwrap();
        file.write_all(b"{\"id\": \"head\"}").unwrap();

        let source = DirectorySource::new(temp.path());
        let text = source.read_to_string(&jem().resolve("head.jpm")).unwrap();
        assert!(text.contains("head"));

        let missing = source.read_to_string(&jem().resolve("nope.jpm"));
        assert!(matches!(missing, Err(ResourceError::NotFound(_))));
    }
}
