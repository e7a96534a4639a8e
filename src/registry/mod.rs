//! Model registry: live part tree, reference lookup and animations.
//!
//! This module provides:
//! - `ModelRegistry`, built from one validated entity model document
//! - `PartArena`/`ModelPart`, the live part tree the renderer reads
//! - `PathKey`, the root-to-part identifier chains used for lookups
//! - `RootAssembly`, the inputs for assembling the renderer-facing tree
//!
//! Construction is lenient: animations that fail to resolve or compile are
//! logged, recorded as [`RegistryWarning`]s and skipped, leaving the rest
//! of the model usable.

mod assembly;
mod part;
mod path;
mod traits;

use std::collections::{BTreeMap, BTreeSet};

pub use assembly::{FamilyTree, PartNameMap, ReferenceModelProvider, ReferencePart, RootAssembly};
pub use part::{Cuboid, ModelPart, PartArena, PartId, PartKind, PartTransform, TRANSPARENT_INNER};
pub use path::PathKey;
pub use traits::{LookupError, ReferenceResolver};

use crate::animation::AnimationBinding;
use crate::config::CemConfig;
use crate::document::EntityModelDocument;
use crate::pose::{EntityState, PoseInputs};
use crate::resource::ResourceLocation;

/// Category of a [`RegistryWarning`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum WarningKind {
    /// An animation was dropped
    Animation,
    /// A part name did not match any part
    MissingPart,
    /// A transparency overlay pairing was skipped
    Overlay,
    /// Root assembly could not follow the family tree
    Assembly,
}

/// Non-fatal problem found while building or assembling a model.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryWarning {
    pub kind: WarningKind,
    pub message: String,
}

impl RegistryWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn missing_part(name: &str, document: &ResourceLocation) -> Self {
        Self::new(WarningKind::MissingPart, format!("Model part {} isn't specified in {}", name, document))
    }
}

/// All data of one custom entity model.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    document: EntityModelDocument,
    config: CemConfig,
    parts: PartArena,
    database: BTreeMap<PathKey, PartId>,
    paths: BTreeMap<PartId, PathKey>,
    /// Top-level lookup names in registration order
    aliases: Vec<(String, PartId)>,
    animations: Vec<AnimationBinding>,
    warnings: Vec<RegistryWarning>,
    prepared_pairs: BTreeSet<(PartId, PartId)>,
    root: Option<PartId>,
}

impl ModelRegistry {
    /// Build the part tree for `document` and compile its animations.
    pub fn new(document: EntityModelDocument, config: &CemConfig) -> Self {
        let mut registry = Self {
            document,
            config: config.clone(),
            parts: PartArena::new(),
            database: BTreeMap::new(),
            paths: BTreeMap::new(),
            aliases: Vec::new(),
            animations: Vec::new(),
            warnings: Vec::new(),
            prepared_pairs: BTreeSet::new(),
            root: None,
        };
        registry.insert_parts();
        registry.compile_animations();
        tracing::debug!(
            document = %registry.document.location(),
            parts = registry.parts.len(),
            animations = registry.animations.len(),
            "built model registry"
        );
        registry
    }

    fn insert_parts(&mut self) {
        let texture_size = self.document.texture_size();
        let mut inserted = Vec::with_capacity(self.document.parts().len());

        for definition in self.document.parts() {
            let name = definition.part().to_string();
            let id = self.parts.insert_geometry(name.clone(), definition.geometry(), texture_size, definition.scale());

            let mut segment = definition.id().unwrap_or(&name).to_string();
            if self.database.contains_key(&PathKey::root(segment.as_str())) {
                segment = name.clone();
                let mut n = 1;
                while self.database.contains_key(&PathKey::root(segment.as_str())) {
                    segment = format!("{name}#{n}");
                    n += 1;
                }
            }
            index_paths(&self.parts, &mut self.database, &mut self.paths, id, PathKey::root(segment));

            if self.alias(&name).is_none() {
                self.aliases.push((name, id));
            }
            inserted.push((definition.base_id().map(str::to_string), id));
        }

        // Base ids never shadow a part name.
        for (base_id, id) in inserted {
            if let Some(base_id) = base_id {
                if self.alias(&base_id).is_none() {
                    self.aliases.push((base_id, id));
                } else {
                    tracing::debug!(base_id = %base_id, "base id already names a part; not aliased");
                }
            }
        }
    }

    fn compile_animations(&mut self) {
        let max_depth = self.config.max_expression_depth;
        let mut bindings = Vec::new();
        let mut warnings = Vec::new();

        for definition in self.document.parts() {
            let Some(context) = self.alias(definition.part()) else {
                continue;
            };
            for entry in definition.animations() {
                match AnimationBinding::compile(entry, self, context, max_depth) {
                    Ok(binding) => bindings.push(binding),
                    Err(e) => {
                        tracing::error!(
                            expression = %entry.expression,
                            document = %self.document.location(),
                            error = %e,
                            "error applying animation"
                        );
                        warnings.push(RegistryWarning::new(
                            WarningKind::Animation,
                            format!(
                                "Error applying animation \"{}\" in \"{}\": {}",
                                entry.expression,
                                self.document.location(),
                                e
                            ),
                        ));
                    }
                }
            }
        }

        self.animations = bindings;
        self.warnings.extend(warnings);
    }

    fn alias(&self, name: &str) -> Option<PartId> {
        self.aliases.iter().find(|(n, _)| n == name).map(|(_, id)| *id)
    }

    /// Top-level part registered under `name` (a part name or base id).
    pub fn entry_by_part_name(&self, name: &str) -> Option<PartId> {
        let found = self.alias(name);
        if found.is_none() {
            tracing::warn!(part = %name, document = %self.document.location(), "model part isn't specified");
        }
        found
    }

    /// Make `child`'s pivot relative to `parent`'s.
    ///
    /// Applied at most once per pair; returns whether the pivot changed.
    pub fn prep_child(&mut self, parent: &str, child: &str) -> bool {
        let (Some(parent_id), Some(child_id)) = (self.entry_by_part_name(parent), self.entry_by_part_name(child))
        else {
            for name in [parent, child] {
                if self.alias(name).is_none() {
                    let warning = RegistryWarning::missing_part(name, self.document.location());
                    self.warnings.push(warning);
                }
            }
            return false;
        };
        if !self.prepared_pairs.insert((parent_id, child_id)) {
            return false;
        }
        let parent_pivot = self.parts[parent_id].transform.pivot;
        let pivot = &mut self.parts[child_id].transform.pivot;
        for (value, offset) in pivot.iter_mut().zip(parent_pivot) {
            *value -= offset;
        }
        true
    }

    /// Run every animation for one frame.
    pub fn apply_animations(
        &mut self,
        limb_angle: f32,
        limb_distance: f32,
        age: f32,
        head_yaw: f32,
        head_pitch: f32,
        entity: Option<&dyn EntityState>,
    ) {
        let mut pose = PoseInputs::new(limb_angle, limb_distance, age, head_yaw, head_pitch);
        if let Some(entity) = entity {
            pose = pose.with_entity(entity);
        }
        self.apply_pose(&pose);
    }

    /// Run every animation in declaration order; later writes win.
    pub fn apply_pose(&mut self, pose: &PoseInputs<'_>) {
        for binding in &self.animations {
            binding.apply(pose, &mut self.parts);
        }
    }

    pub fn has_texture(&self) -> bool {
        self.document.texture_path().is_some()
    }

    /// Custom texture location, resolved relative to the document.
    pub fn texture(&self) -> Option<ResourceLocation> {
        self.document.texture()
    }

    pub fn has_shadow_radius(&self) -> bool {
        self.document.shadow_size().is_some()
    }

    pub fn shadow_radius(&self) -> Option<f32> {
        self.document.shadow_size()
    }

    pub fn parts(&self) -> &PartArena {
        &self.parts
    }

    pub fn part(&self, id: PartId) -> Option<&ModelPart> {
        self.parts.get(id)
    }

    /// Registered path of a part built from the document.
    pub fn path_key(&self, id: PartId) -> Option<&PathKey> {
        self.paths.get(&id)
    }

    /// Every registered path, sorted.
    pub fn path_keys(&self) -> impl Iterator<Item = (&PathKey, PartId)> {
        self.database.iter().map(|(key, id)| (key, *id))
    }

    /// Top-level names, part names first, then base ids.
    pub fn aliases(&self) -> &[(String, PartId)] {
        &self.aliases
    }

    pub fn animations(&self) -> &[AnimationBinding] {
        &self.animations
    }

    pub fn warnings(&self) -> &[RegistryWarning] {
        &self.warnings
    }

    pub fn document(&self) -> &EntityModelDocument {
        &self.document
    }

    pub fn config(&self) -> &CemConfig {
        &self.config
    }

    /// Root produced by [`prep_root_part`](Self::prep_root_part), if assembled.
    pub fn pre_prepared_part(&self) -> Option<PartId> {
        self.root
    }

    fn not_found(&self, reference: &str) -> LookupError {
        LookupError::PartNotFound { reference: reference.to_string(), document: self.document.location().to_string() }
    }
}

fn index_paths(
    parts: &PartArena,
    database: &mut BTreeMap<PathKey, PartId>,
    paths: &mut BTreeMap<PartId, PathKey>,
    id: PartId,
    key: PathKey,
) {
    for (segment, child) in parts[id].children() {
        index_paths(parts, database, paths, *child, key.child(segment.as_str()));
    }
    database.insert(key.clone(), id);
    paths.insert(id, key);
}

impl ReferenceResolver for ModelRegistry {
    fn find_child(&self, reference: &str, context: Option<PartId>) -> Result<PartId, LookupError> {
        let segments: Vec<&str> = reference.split(':').collect();

        if let [single] = segments.as_slice() {
            if let Some(id) = self.alias(single) {
                return Ok(id);
            }
        }

        if let Some(context) = context {
            if matches!(segments[0], "this" | "part") {
                if segments.len() == 1 {
                    return Ok(context);
                }
                let own = match self.paths.get(&context).and_then(PathKey::last) {
                    Some(segment) => segment,
                    None => self.parts.get(context).map(ModelPart::name).unwrap_or_default(),
                };
                let mut rewritten = vec![own];
                rewritten.extend_from_slice(&segments[1..]);
                return self.find_child(&rewritten.join(":"), None);
            }
        }

        // Sorted iteration makes the first shortest match the lexicographically smallest.
        let mut best: Option<(&PathKey, PartId)> = None;
        for (key, id) in &self.database {
            if key.matches(&segments) && best.map_or(true, |(hit, _)| key.len() < hit.len()) {
                best = Some((key, *id));
            }
        }
        best.map(|(_, id)| id).ok_or_else(|| self.not_found(reference))
    }
}
