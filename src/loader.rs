//! Loading entity model documents from a resource source
//!
//! Geometry documents are parsed once per resolved location and shared
//! between every part (and every entity document) that references them.
//! Independent entity documents can be loaded in parallel; a failure in one
//! never affects the others.
//!
//! # Example
//!
//! ```
//! use cemkit::config::CemConfig;
//! use cemkit::loader::ModelLoader;
//! use cemkit::resource::{MemorySource, ResourceLocation};
//!
//! let source = MemorySource::new()
//!     .with("optifine/cem/pig.jem", r#"{"textureSize": [64, 32], "models": [{"part": "head", "model": "pig_head.jpm"}]}"#)
//!     .with("optifine/cem/pig_head.jpm", r#"{"id": "head", "translate": [0, 12, -6]}"#);
//!
//! let loader = ModelLoader::new(source, CemConfig::default());
//! let registry = loader.load_registry(&ResourceLocation::parse("optifine/cem/pig.jem")).unwrap();
//! assert!(registry.entry_by_part_name("head").is_some());
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use rayon::prelude::*;
use thiserror::Error;

use crate::config::CemConfig;
use crate::document::{DocumentError, EntityModelDocument};
use crate::geometry::{GeometryError, PartGeometry};
use crate::registry::ModelRegistry;
use crate::resource::{ResourceError, ResourceLocation, ResourceSource};

/// Error reading or parsing a geometry document.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum GeometryLoadError {
    #[error(transparent)]
    Read(#[from] ResourceError),
    #[error(transparent)]
    Parse(#[from] GeometryError),
}

/// Error loading an entity model document.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// The document itself could not be read
    #[error(transparent)]
    Read(#[from] ResourceError),
    /// The document was read but is invalid
    #[error("Error loading {location}: {source}")]
    Document { location: ResourceLocation, source: DocumentError },
}

/// Memoized geometry documents, keyed by resolved location.
#[derive(Debug, Default)]
pub struct GeometryCache {
    entries: Mutex<HashMap<ResourceLocation, Arc<PartGeometry>>>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ResourceLocation, Arc<PartGeometry>>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return the geometry at `location`, reading and parsing it on first use.
    pub fn load(
        &self,
        location: &ResourceLocation,
        resources: &dyn ResourceSource,
    ) -> Result<Arc<PartGeometry>, GeometryLoadError> {
        if let Some(geometry) = self.entries().get(location) {
            return Ok(Arc::clone(geometry));
        }

        let text = resources.read_to_string(location)?;
        let geometry = Arc::new(PartGeometry::parse(&text)?);
        tracing::debug!(location = %location, "parsed geometry document");

        // Another thread may have parsed the same file meanwhile; keep the first
        let mut entries = self.entries();
        let shared = entries.entry(location.clone()).or_insert(geometry);
        Ok(Arc::clone(shared))
    }

    pub fn contains(&self, location: &ResourceLocation) -> bool {
        self.entries().contains_key(location)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }
}

/// Loads entity model documents and builds their registries.
#[derive(Debug)]
pub struct ModelLoader<S: ResourceSource> {
    resources: S,
    config: CemConfig,
    cache: GeometryCache,
}

impl<S: ResourceSource> ModelLoader<S> {
    pub fn new(resources: S, config: CemConfig) -> Self {
        Self { resources, config, cache: GeometryCache::new() }
    }

    pub fn config(&self) -> &CemConfig {
        &self.config
    }

    pub fn cache(&self) -> &GeometryCache {
        &self.cache
    }

    pub fn resources(&self) -> &S {
        &self.resources
    }

    /// Parse a location string, using the configured default namespace.
    pub fn location(&self, location: &str) -> ResourceLocation {
        ResourceLocation::parse_with_default(location, &self.config.default_namespace)
    }

    /// Read and validate one entity model document.
    pub fn load_document(&self, location: &ResourceLocation) -> Result<EntityModelDocument, LoadError> {
        let text = self.resources.read_to_string(location)?;
        EntityModelDocument::parse(&text, location.clone(), &self.resources, &self.cache).map_err(|source| {
            tracing::error!(location = %location, error = %source, "failed to load entity model");
            LoadError::Document { location: location.clone(), source }
        })
    }

    /// Load a document and build its registry, compiling its animations.
    pub fn load_registry(&self, location: &ResourceLocation) -> Result<ModelRegistry, LoadError> {
        let document = self.load_document(location)?;
        Ok(ModelRegistry::new(document, &self.config))
    }

    /// Load several independent documents in parallel.
    ///
    /// Results come back in the order of `locations`.
    pub fn load_all(
        &self,
        locations: &[ResourceLocation],
    ) -> Vec<(ResourceLocation, Result<EntityModelDocument, LoadError>)> {
        locations
            .par_iter()
            .map(|location| (location.clone(), self.load_document(location)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::MemorySource;

    const SHARED_JPM: &str = r#"{"id": "limb", "boxes": [{"coordinates": [-2, 0, -2, 4, 12, 4]}]}"#;

    fn source() -> MemorySource {
        MemorySource::new()
            .with("optifine/cem/limb.jpm", SHARED_JPM)
            .with(
                "optifine/cem/zombie.jem",
                r#"{"textureSize": [64, 64], "models": [
                    {"part": "left_arm", "model": "limb.jpm"},
                    {"part": "right_arm", "model": "./limb.jpm"}
                ]}"#,
            )
            .with(
                "optifine/cem/skeleton.jem",
                r#"{"textureSize": [64, 32], "models": [{"part": "left_leg", "model": "limb.jpm"}]}"#,
            )
            .with("optifine/cem/broken.jem", r#"{"models": []}"#)
    }

    #[test]
    fn test_shared_geometry_is_parsed_once() {
        let loader = ModelLoader::new(source(), CemConfig::default());
        let doc = loader.load_document(&ResourceLocation::parse("optifine/cem/zombie.jem")).unwrap();
        assert_eq!(loader.cache().len(), 1);
        let left = doc.part("left_arm").unwrap().geometry() as *const PartGeometry;
        let right = doc.part("right_arm").unwrap().geometry() as *const PartGeometry;
        assert_eq!(left, right);
    }

    #[test]
    fn test_missing_document() {
        let loader = ModelLoader::new(source(), CemConfig::default());
        let err = loader.load_document(&ResourceLocation::parse("optifine/cem/cow.jem")).unwrap_err();
        assert!(matches!(err, LoadError::Read(ResourceError::NotFound(_))));
    }

    #[test]
    fn test_invalid_document_names_location() {
        let loader = ModelLoader::new(source(), CemConfig::default());
        let err = loader.load_document(&ResourceLocation::parse("optifine/cem/broken.jem")).unwrap_err();
        assert!(err.to_string().contains("minecraft:optifine/cem/broken.jem"));
        assert!(err.to_string().contains("textureSize"));
    }

    #[test]
    fn test_load_all_isolates_failures() {
        let loader = ModelLoader::new(source(), CemConfig::default());
        let locations: Vec<_> = ["zombie.jem", "broken.jem", "skeleton.jem"]
            .iter()
            .map(|name| ResourceLocation::parse(&format!("optifine/cem/{name}")))
            .collect();
        let results = loader.load_all(&locations);
        assert_eq!(results.len(), 3);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert!(results[2].1.is_ok());
        assert_eq!(results[2].0, locations[2]);
        assert_eq!(loader.cache().len(), 1);
    }

    #[test]
    fn test_cache_reports_parse_errors() {
        let cache = GeometryCache::new();
        let source = MemorySource::new().with("bad.jpm", "{oops");
        let err = cache.load(&ResourceLocation::parse("bad.jpm"), &source).unwrap_err();
        assert!(matches!(err, GeometryLoadError::Parse(GeometryError::Syntax(_))));
        assert!(cache.is_empty());
    }
}
