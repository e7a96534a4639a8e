//! Entity model documents (`.jem`) and their part definitions
//!
//! An entity model document names a texture, the texture atlas size, an
//! optional shadow radius and a list of parts. Each part either references
//! an external geometry document (`model`) or carries its geometry inline.
//! Animation expressions are stored as raw strings here; compiling them
//! needs the finished part registry.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::geometry::{GeometryError, PartGeometry};
use crate::loader::GeometryCache;
use crate::resource::{ResourceLocation, ResourceSource};

/// Characters allowed in a texture path.
pub const TEXTURE_PATH_PATTERN: &str = r"^[a-z0-9/._\-]+$";

fn texture_path_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(TEXTURE_PATH_PATTERN).expect("texture path pattern compiles"))
}

/// Check a texture path against [`TEXTURE_PATH_PATTERN`].
pub fn is_valid_texture_path(path: &str) -> bool {
    texture_path_regex().is_match(path)
}

/// Error building a document.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum DocumentError {
    /// Document text is not valid JSON5
    #[error("syntax error: {0}")]
    Syntax(String),
    /// A required element is absent
    #[error("Element \"{0}\" is required")]
    MissingField(&'static str),
    /// An element has the wrong type or shape
    #[error("Element \"{field}\" is invalid: {message}")]
    InvalidField { field: String, message: String },
    /// Texture path uses characters outside `[a-z0-9/._-]`
    #[error("Non [a-z0-9/._-] character in path of location: {0}")]
    InvalidTexturePath(String),
    /// Animation key without the `.` between part reference and variable
    #[error("Animation key \"{key}\" in part \"{part}\" is not of the form <part>.<variable>")]
    MalformedAnimationKey { part: String, key: String },
    /// A referenced geometry document could not be loaded
    #[error("Error loading dependent file: {location}: {message}")]
    DependentFile { location: ResourceLocation, message: String },
    /// Inline geometry could not be parsed
    #[error("Invalid geometry in part \"{part}\": {source}")]
    Geometry { part: String, source: GeometryError },
}

/// Left and right halves of an animation key such as `head.rx`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnimationKey {
    /// Part reference, resolved against the registry
    pub target: String,
    /// Channel and axis, e.g. `rx`
    pub variable: String,
}

impl AnimationKey {
    /// Split at the first `.`; `None` when there is no separator.
    pub fn parse(key: &str) -> Option<Self> {
        let (target, variable) = key.split_once('.')?;
        Some(Self { target: target.to_string(), variable: variable.to_string() })
    }
}

/// One declared animation, not yet compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationEntry {
    pub key: AnimationKey,
    pub expression: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPartDefinition {
    #[serde(default)]
    part: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    base_id: Option<String>,
    #[serde(default)]
    attach: Option<bool>,
    #[serde(default)]
    scale: Option<f32>,
    #[serde(default)]
    animations: Option<Vec<Map<String, Value>>>,
}

/// One entry of the document's `models` list.
#[derive(Debug, Clone, PartialEq)]
pub struct PartDefinition {
    part: String,
    base_id: Option<String>,
    model: Option<ResourceLocation>,
    attach: bool,
    scale: f32,
    geometry: Arc<PartGeometry>,
    animations: Vec<AnimationEntry>,
}

impl PartDefinition {
    /// Build a part definition from its JSON object.
    ///
    /// `document` is the location of the containing entity document;
    /// `model` references are resolved relative to it and loaded through
    /// `cache`.
    pub fn from_value(
        value: &Value,
        document: &ResourceLocation,
        resources: &dyn ResourceSource,
        cache: &GeometryCache,
    ) -> Result<Self, DocumentError> {
        let raw = RawPartDefinition::deserialize(value).map_err(|e| DocumentError::InvalidField {
            field: "models".to_string(),
            message: e.to_string(),
        })?;

        let part = match raw.part {
            Some(part) if !part.is_empty() => part,
            _ => return Err(DocumentError::MissingField("part")),
        };

        let animations = parse_animations(&part, raw.animations.unwrap_or_default())?;

        let (model, geometry) = match raw.model {
            Some(reference) => {
                let location = document.resolve(&reference);
                let geometry = cache.load(&location, resources).map_err(|e| {
                    tracing::error!(location = %location, error = %e, "failed to read dependent model file");
                    DocumentError::DependentFile { location: location.clone(), message: e.to_string() }
                })?;
                (Some(location), geometry)
            }
            None => {
                let geometry = PartGeometry::from_value(value)
                    .map_err(|source| DocumentError::Geometry { part: part.clone(), source })?;
                (None, Arc::new(geometry))
            }
        };

        Ok(Self {
            part,
            base_id: raw.base_id,
            model,
            attach: raw.attach.unwrap_or(false),
            scale: raw.scale.unwrap_or(1.0),
            geometry,
            animations,
        })
    }

    /// Logical part name.
    pub fn part(&self) -> &str {
        &self.part
    }

    pub fn base_id(&self) -> Option<&str> {
        self.base_id.as_deref()
    }

    /// Resolved location of the external geometry, if the part has one.
    pub fn model(&self) -> Option<&ResourceLocation> {
        self.model.as_ref()
    }

    pub fn attach(&self) -> bool {
        self.attach
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn geometry(&self) -> &PartGeometry {
        &self.geometry
    }

    /// Geometry id, used in place of the part name inside reference paths.
    pub fn id(&self) -> Option<&str> {
        self.geometry.id.as_deref()
    }

    /// Declared animations in document order.
    pub fn animations(&self) -> &[AnimationEntry] {
        &self.animations
    }
}

/// Flatten the `animations` list of objects into ordered entries.
/// A repeated key keeps its first position and takes the later expression.
fn parse_animations(
    part: &str,
    objects: Vec<Map<String, Value>>,
) -> Result<Vec<AnimationEntry>, DocumentError> {
    let mut entries: Vec<AnimationEntry> = Vec::new();
    for object in objects {
        for (key, value) in object {
            let parsed = AnimationKey::parse(&key).ok_or_else(|| DocumentError::MalformedAnimationKey {
                part: part.to_string(),
                key: key.clone(),
            })?;
            let expression = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                other => {
                    return Err(DocumentError::InvalidField {
                        field: format!("animations.{key}"),
                        message: format!("expected an expression string, found {other}"),
                    })
                }
            };
            match entries.iter_mut().find(|entry| entry.key == parsed) {
                Some(existing) => existing.expression = expression,
                None => entries.push(AnimationEntry { key: parsed, expression }),
            }
        }
    }
    Ok(entries)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntityDocument {
    #[serde(default)]
    texture: Option<String>,
    #[serde(default)]
    texture_size: Option<[f32; 2]>,
    #[serde(default)]
    shadow_size: Option<f32>,
    #[serde(default)]
    models: Option<Vec<Value>>,
}

/// A validated entity model document.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityModelDocument {
    location: ResourceLocation,
    texture: Option<String>,
    texture_size: [f32; 2],
    shadow_size: Option<f32>,
    parts: Vec<PartDefinition>,
}

impl EntityModelDocument {
    /// Parse document text read from `location`.
    pub fn parse(
        text: &str,
        location: ResourceLocation,
        resources: &dyn ResourceSource,
        cache: &GeometryCache,
    ) -> Result<Self, DocumentError> {
        let value: Value = json5::from_str(text).map_err(|e| DocumentError::Syntax(e.to_string()))?;
        Self::from_value(&value, location, resources, cache)
    }

    /// Build a document from an already parsed JSON value.
    pub fn from_value(
        value: &Value,
        location: ResourceLocation,
        resources: &dyn ResourceSource,
        cache: &GeometryCache,
    ) -> Result<Self, DocumentError> {
        let raw = RawEntityDocument::deserialize(value).map_err(|e| DocumentError::InvalidField {
            field: "document".to_string(),
            message: e.to_string(),
        })?;

        let models = raw.models.ok_or(DocumentError::MissingField("models"))?;
        let texture_size = raw.texture_size.ok_or(DocumentError::MissingField("textureSize"))?;
        if let Some(texture) = &raw.texture {
            if !is_valid_texture_path(texture) {
                return Err(DocumentError::InvalidTexturePath(texture.clone()));
            }
        }

        let mut parts: Vec<PartDefinition> = Vec::with_capacity(models.len());
        for model in &models {
            let definition = PartDefinition::from_value(model, &location, resources, cache)?;
            match parts.iter_mut().find(|p| p.part == definition.part) {
                Some(existing) => {
                    tracing::debug!(part = %definition.part, document = %location, "duplicate part definition replaces earlier one");
                    *existing = definition;
                }
                None => parts.push(definition),
            }
        }

        Ok(Self { location, texture: raw.texture, texture_size, shadow_size: raw.shadow_size, parts })
    }

    /// Where this document was loaded from.
    pub fn location(&self) -> &ResourceLocation {
        &self.location
    }

    /// Texture path as written in the document.
    pub fn texture_path(&self) -> Option<&str> {
        self.texture.as_deref()
    }

    /// Texture location, resolved relative to the document.
    pub fn texture(&self) -> Option<ResourceLocation> {
        self.texture.as_deref().map(|t| self.location.resolve(t))
    }

    /// Atlas `[width, height]`.
    pub fn texture_size(&self) -> [f32; 2] {
        self.texture_size
    }

    pub fn shadow_size(&self) -> Option<f32> {
        self.shadow_size
    }

    /// Part definitions in document order.
    pub fn parts(&self) -> &[PartDefinition] {
        &self.parts
    }

    pub fn part(&self, name: &str) -> Option<&PartDefinition> {
        self.parts.iter().find(|p| p.part == name)
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.part.as_str())
    }
}
