//! Part geometry documents (`.jpm`)
//!
//! A geometry document describes one part: its pivot (`translate`), rest
//! rotation, boxes, and nested submodels. The same grammar is used for
//! standalone `.jpm` files and for geometry written inline in a `.jem`
//! part definition; unrelated keys on the object are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error parsing a geometry document.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum GeometryError {
    /// Document text is not valid JSON5
    #[error("syntax error: {0}")]
    Syntax(String),
    /// Document is well-formed but does not describe a part
    #[error("invalid part geometry: {0}")]
    Invalid(String),
}

/// Set of inverted axes, written as a string such as `"xy"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AxisFlags {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl AxisFlags {
    /// Sign multiplier for each axis (`-1.0` when inverted).
    pub fn signs(&self) -> [f32; 3] {
        let sign = |inverted: bool| if inverted { -1.0 } else { 1.0 };
        [sign(self.x), sign(self.y), sign(self.z)]
    }
}

impl From<String> for AxisFlags {
    fn from(value: String) -> Self {
        let value = value.to_ascii_lowercase();
        Self { x: value.contains('x'), y: value.contains('y'), z: value.contains('z') }
    }
}

impl From<AxisFlags> for String {
    fn from(flags: AxisFlags) -> Self {
        [(flags.x, 'x'), (flags.y, 'y'), (flags.z, 'z')]
            .iter()
            .filter(|(set, _)| *set)
            .map(|(_, c)| *c)
            .collect()
    }
}

/// Texture mirroring, written as `"u"`, `"v"` or `"uv"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MirrorFlags {
    pub u: bool,
    pub v: bool,
}

impl From<String> for MirrorFlags {
    fn from(value: String) -> Self {
        let value = value.to_ascii_lowercase();
        Self { u: value.contains('u'), v: value.contains('v') }
    }
}

impl From<MirrorFlags> for String {
    fn from(flags: MirrorFlags) -> Self {
        let mut out = String::new();
        if flags.u {
            out.push('u');
        }
        if flags.v {
            out.push('v');
        }
        out
    }
}

/// One box primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryBox {
    /// Texture offset `[u, v]` in atlas pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture_offset: Option<[f32; 2]>,
    /// `[x, y, z, width, height, depth]`, in the same frame as the part's `translate`
    pub coordinates: [f32; 6],
    /// Inflation applied on every side
    #[serde(default)]
    pub size_add: f32,
}

impl GeometryBox {
    pub fn origin(&self) -> [f32; 3] {
        [self.coordinates[0], self.coordinates[1], self.coordinates[2]]
    }

    pub fn size(&self) -> [f32; 3] {
        [self.coordinates[3], self.coordinates[4], self.coordinates[5]]
    }
}

/// Parsed part geometry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartGeometry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Overrides the entity document's atlas size for this part
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture_size: Option<[f32; 2]>,
    #[serde(default)]
    pub invert_axis: AxisFlags,
    /// Pivot point
    #[serde(default)]
    pub translate: [f32; 3],
    /// Rest rotation in degrees
    #[serde(default)]
    pub rotate: [f32; 3],
    #[serde(default)]
    pub mirror_texture: MirrorFlags,
    #[serde(default)]
    pub boxes: Vec<GeometryBox>,
    /// Single-child shorthand, ordered before `submodels`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submodel: Option<Box<PartGeometry>>,
    #[serde(default)]
    pub submodels: Vec<PartGeometry>,
}

impl PartGeometry {
    /// Parse a standalone geometry document.
    pub fn parse(text: &str) -> Result<Self, GeometryError> {
        let value: Value = json5::from_str(text).map_err(|e| GeometryError::Syntax(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Read geometry from an already parsed JSON object.
    pub fn from_value(value: &Value) -> Result<Self, GeometryError> {
        if !value.is_object() {
            return Err(GeometryError::Invalid("expected an object".to_string()));
        }
        Self::deserialize(value).map_err(|e| GeometryError::Invalid(e.to_string()))
    }

    /// Pivot with axis inversion applied.
    pub fn pivot(&self) -> [f32; 3] {
        let signs = self.invert_axis.signs();
        [self.translate[0] * signs[0], self.translate[1] * signs[1], self.translate[2] * signs[2]]
    }

    /// Rest rotation in radians with axis inversion applied.
    pub fn rotation(&self) -> [f32; 3] {
        let signs = self.invert_axis.signs();
        [
            self.rotate[0].to_radians() * signs[0],
            self.rotate[1].to_radians() * signs[1],
            self.rotate[2].to_radians() * signs[2],
        ]
    }

    /// Child geometries in declaration order.
    pub fn children(&self) -> impl Iterator<Item = &PartGeometry> {
        self.submodel.as_deref().into_iter().chain(self.submodels.iter())
    }
}
