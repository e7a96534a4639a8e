//! Root assembly: arranging registry parts into the renderer-facing tree
//!
//! The renderer describes how its own model is shaped (which parts hang
//! under which) and what its parts are called; assembly re-parents the
//! custom parts accordingly under a synthetic root. With transparent parts
//! enabled, each assembled part is additionally wrapped so that it takes
//! its rest transform from the renderer's reference model.

use std::collections::{BTreeMap, BTreeSet};

use super::part::{ModelPart, PartId, PartTransform};
use super::{ModelRegistry, RegistryWarning, WarningKind};

/// Custom part name to renderer part name.
pub type PartNameMap = BTreeMap<String, String>;

/// Declared parent/children relationships, innermost family first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FamilyTree {
    families: Vec<(String, Vec<String>)>,
}

impl FamilyTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `children` as hanging under `parent`.
    pub fn with_family<I, S>(mut self, parent: impl Into<String>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.families.push((parent.into(), children.into_iter().map(Into::into).collect()));
        self
    }

    pub fn families(&self) -> &[(String, Vec<String>)] {
        &self.families
    }

    /// First declared parent listing `name` as a child.
    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.families
            .iter()
            .find(|(_, children)| children.iter().any(|c| c == name))
            .map(|(parent, _)| parent.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

/// One node of the renderer's own model, used for the transparency overlay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferencePart {
    pub transform: PartTransform,
    pub children: BTreeMap<String, ReferencePart>,
}

impl ReferencePart {
    pub fn new(transform: PartTransform) -> Self {
        Self { transform, children: BTreeMap::new() }
    }

    pub fn with_child(mut self, name: impl Into<String>, child: ReferencePart) -> Self {
        self.children.insert(name.into(), child);
        self
    }
}

/// Supplies the reference model tree on demand.
pub trait ReferenceModelProvider {
    fn reference_model(&self) -> ReferencePart;
}

impl<F> ReferenceModelProvider for F
where
    F: Fn() -> ReferencePart,
{
    fn reference_model(&self) -> ReferencePart {
        self()
    }
}

/// Inputs for [`ModelRegistry::prep_root_part`].
pub struct RootAssembly<'a> {
    reference: &'a dyn ReferenceModelProvider,
    part_names: PartNameMap,
    family_tree: FamilyTree,
    /// Manual pivot overrides for the transparency overlay
    fixes: BTreeMap<String, [f32; 3]>,
    inflate: Option<f32>,
}

impl<'a> RootAssembly<'a> {
    pub fn new(reference: &'a dyn ReferenceModelProvider) -> Self {
        Self {
            reference,
            part_names: PartNameMap::new(),
            family_tree: FamilyTree::new(),
            fixes: BTreeMap::new(),
            inflate: None,
        }
    }

    pub fn with_part_names(mut self, part_names: PartNameMap) -> Self {
        self.part_names = part_names;
        self
    }

    pub fn with_family_tree(mut self, family_tree: FamilyTree) -> Self {
        self.family_tree = family_tree;
        self
    }

    /// Override the overlay pivot of `part` while keeping the reference rotation.
    pub fn with_fix(mut self, part: impl Into<String>, pivot: [f32; 3]) -> Self {
        self.fixes.insert(part.into(), pivot);
        self
    }

    /// Grow every assembled cuboid by `amount`. Zero is still an inflation.
    pub fn with_inflate(mut self, amount: f32) -> Self {
        self.inflate = Some(amount);
        self
    }

    fn translate<'n>(&'n self, name: &'n str) -> &'n str {
        self.part_names.get(name).map(String::as_str).unwrap_or(name)
    }
}

impl ModelRegistry {
    /// Assemble the renderer-facing tree and return its root.
    ///
    /// A registry is assembled once; later calls return the cached root.
    pub fn prep_root_part(&mut self, assembly: &RootAssembly<'_>) -> PartId {
        if let Some(root) = self.root {
            return root;
        }

        for (parent, children) in assembly.family_tree.families() {
            for child in children {
                self.prep_child(parent, child);
            }
        }

        let root = self.parts.push_root();

        // Outermost families first so every parent is attached before its children.
        let mut part_list: Vec<String> = Vec::new();
        let family_keys = assembly.family_tree.families().iter().rev().map(|(parent, _)| parent.as_str());
        for name in family_keys.chain(self.document.part_names()) {
            if !part_list.iter().any(|n| n == name) {
                part_list.push(name.to_string());
            }
        }

        for name in &part_list {
            let Some(entry) = self.entry_by_part_name(name) else {
                self.warnings.push(RegistryWarning::missing_part(name, self.document.location()));
                continue;
            };
            let parent = self.resolve_parent(root, name, assembly);
            let slot = assembly.translate(name);
            if let Some(replaced) = self.parts[parent].add_child(slot, entry) {
                if replaced != entry {
                    let message = format!(
                        "\"{}\" replaces child \"{}\" of \"{}\"",
                        name,
                        slot,
                        self.parts[parent].name()
                    );
                    tracing::warn!(document = %self.document.location(), "{}", message);
                    self.warnings.push(RegistryWarning::new(WarningKind::Assembly, message));
                }
            }
        }

        if let Some(amount) = assembly.inflate {
            self.inflate_tree(root, amount);
        }

        if self.config.use_transparent_parts {
            let reference = assembly.reference.reference_model();
            let fixes: BTreeMap<String, [f32; 3]> = assembly
                .fixes
                .iter()
                .map(|(name, pivot)| (assembly.translate(name).to_string(), *pivot))
                .collect();
            let mut visited = BTreeSet::new();
            self.make_transparent(root, &reference, &fixes, &mut visited);
        }

        tracing::debug!(
            document = %self.document.location(),
            children = self.parts[root].children().len(),
            "assembled root part"
        );
        self.root = Some(root);
        root
    }

    /// Walk the family tree upward from `name`, then down the assembled tree.
    fn resolve_parent(&mut self, root: PartId, name: &str, assembly: &RootAssembly<'_>) -> PartId {
        let mut chain: Vec<&str> = Vec::new();
        let mut seen: BTreeSet<&str> = BTreeSet::from([name]);
        let mut current = name;
        while let Some(parent) = assembly.family_tree.parent_of(current) {
            if !seen.insert(parent) {
                let message = format!("family tree cycle through \"{}\"", parent);
                tracing::warn!(part = %name, "{}", message);
                self.warnings.push(RegistryWarning::new(WarningKind::Assembly, message));
                break;
            }
            chain.push(parent);
            current = parent;
        }

        let mut part = root;
        for ancestor in chain.iter().rev() {
            match self.parts[part].child(assembly.translate(ancestor)) {
                Some(child) => part = child,
                None => {
                    let message = format!("ancestor \"{}\" of \"{}\" is not assembled", ancestor, name);
                    tracing::warn!(document = %self.document.location(), "{}", message);
                    self.warnings.push(RegistryWarning::new(WarningKind::Assembly, message));
                    break;
                }
            }
        }
        part
    }

    fn inflate_tree(&mut self, root: PartId, amount: f32) {
        let mut visited = BTreeSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            self.parts[id].inflate(amount);
            stack.extend(self.parts[id].children().iter().map(|(_, child)| *child));
        }
    }

    /// Wrap every child of `target` that also exists in `reference`.
    fn make_transparent(
        &mut self,
        target: PartId,
        reference: &ReferencePart,
        fixes: &BTreeMap<String, [f32; 3]>,
        visited: &mut BTreeSet<PartId>,
    ) {
        let keys: BTreeSet<String> = self.parts[target]
            .children()
            .iter()
            .map(|(name, _)| name.clone())
            .chain(reference.children.keys().cloned())
            .collect();

        for key in keys {
            let (Some(child), Some(reference_child)) = (self.parts[target].child(&key), reference.children.get(&key))
            else {
                let message = format!("transparency overlay skipped \"{}\": not present in both models", key);
                tracing::warn!(document = %self.document.location(), "{}", message);
                self.warnings.push(RegistryWarning::new(WarningKind::Overlay, message));
                continue;
            };

            let transform = match fixes.get(&key) {
                Some(pivot) => PartTransform { pivot: *pivot, ..reference_child.transform },
                None => reference_child.transform,
            };

            if visited.insert(child) {
                self.make_transparent(child, reference_child, fixes, visited);
            }

            let inner = &mut self.parts[child].transform;
            for i in 0..3 {
                inner.pivot[i] -= transform.pivot[i];
                inner.rotation[i] -= transform.rotation[i];
            }

            let wrapper = self.parts.push(ModelPart::transparent(key.clone(), child, transform));
            self.parts[target].add_child(key, wrapper);
        }
    }
}
