//! Live model parts and the arena that owns them
//!
//! Parts reference each other by [`PartId`]. The arena is the single owner,
//! which lets compiled expressions keep cheap handles to the parts they
//! read while animation bindings write through `&mut PartArena`.

use std::ops::{Index, IndexMut};

use crate::animation::{Axis, Channel};
use crate::geometry::PartGeometry;

/// Child name under which a transparent wrapper keeps the wrapped part.
pub const TRANSPARENT_INNER: &str = "inner";

/// Handle to a part in a [`PartArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartId(usize);

impl PartId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Pivot, rotation (radians) and scale of a part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartTransform {
    pub pivot: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for PartTransform {
    fn default() -> Self {
        Self { pivot: [0.0; 3], rotation: [0.0; 3], scale: [1.0; 3] }
    }
}

impl PartTransform {
    pub fn new(pivot: [f32; 3], rotation: [f32; 3]) -> Self {
        Self { pivot, rotation, ..Default::default() }
    }

    pub fn from_pivot(pivot: [f32; 3]) -> Self {
        Self { pivot, ..Default::default() }
    }
}

/// A box primitive, positioned relative to its part's pivot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cuboid {
    /// Lower corner, relative to the pivot
    pub from: [f32; 3],
    /// Dimensions (w, h, d)
    pub size: [f32; 3],
    /// Amount grown on every side
    pub inflate: f32,
    /// Texture offset in atlas pixels
    pub uv: [f32; 2],
    pub mirror: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    /// Synthetic root produced by root assembly
    Root,
    /// Part built from a geometry document
    Custom,
    /// Wrapper carrying a reference model's transform around a custom part
    Transparent { inner: PartId },
}

/// One node of the live part tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPart {
    name: String,
    id: Option<String>,
    kind: PartKind,
    pub transform: PartTransform,
    /// Per-frame offset written by translate bindings
    pub translation: [f32; 3],
    cuboids: Vec<Cuboid>,
    texture_size: [f32; 2],
    children: Vec<(String, PartId)>,
}

impl ModelPart {
    pub(crate) fn root() -> Self {
        Self {
            name: String::new(),
            id: None,
            kind: PartKind::Root,
            transform: PartTransform::default(),
            translation: [0.0; 3],
            cuboids: Vec::new(),
            texture_size: [0.0; 2],
            children: Vec::new(),
        }
    }

    pub(crate) fn transparent(name: String, inner: PartId, transform: PartTransform) -> Self {
        Self {
            name,
            id: None,
            kind: PartKind::Transparent { inner },
            transform,
            translation: [0.0; 3],
            cuboids: Vec::new(),
            texture_size: [0.0; 2],
            children: vec![(TRANSPARENT_INNER.to_string(), inner)],
        }
    }

    /// Logical part name for top-level parts, path segment for children.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Geometry id, when the document gave one.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn kind(&self) -> PartKind {
        self.kind
    }

    pub fn cuboids(&self) -> &[Cuboid] {
        &self.cuboids
    }

    /// Atlas size the cuboid UVs refer to.
    pub fn texture_size(&self) -> [f32; 2] {
        self.texture_size
    }

    /// Children in attachment order.
    pub fn children(&self) -> &[(String, PartId)] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<PartId> {
        self.children.iter().find(|(n, _)| n == name).map(|(_, id)| *id)
    }

    /// Attach `part` as `name`, replacing any child already using that name.
    ///
    /// Returns the replaced child, if any.
    pub fn add_child(&mut self, name: impl Into<String>, part: PartId) -> Option<PartId> {
        let name = name.into();
        match self.children.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => Some(std::mem::replace(&mut slot.1, part)),
            None => {
                self.children.push((name, part));
                None
            }
        }
    }

    /// Current value of one channel/axis.
    pub fn channel_value(&self, channel: Channel, axis: Axis) -> f32 {
        let i = axis.index();
        match channel {
            Channel::Translate => self.translation[i],
            Channel::Rotate => self.transform.rotation[i],
            Channel::Scale => self.transform.scale[i],
        }
    }

    /// Overwrite one channel/axis.
    pub fn set_channel(&mut self, channel: Channel, axis: Axis, value: f32) {
        let i = axis.index();
        match channel {
            Channel::Translate => self.translation[i] = value,
            Channel::Rotate => self.transform.rotation[i] = value,
            Channel::Scale => self.transform.scale[i] = value,
        }
    }

    pub(crate) fn inflate(&mut self, amount: f32) {
        for cuboid in &mut self.cuboids {
            cuboid.inflate += amount;
        }
    }
}

/// Owner of every part of one model.
#[derive(Debug, Clone, Default)]
pub struct PartArena {
    parts: Vec<ModelPart>,
}

impl PartArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, part: ModelPart) -> PartId {
        self.parts.push(part);
        PartId(self.parts.len() - 1)
    }

    /// Push an empty root part.
    pub fn push_root(&mut self) -> PartId {
        self.push(ModelPart::root())
    }

    pub fn get(&self, id: PartId) -> Option<&ModelPart> {
        self.parts.get(id.0)
    }

    pub fn get_mut(&mut self, id: PartId) -> Option<&mut ModelPart> {
        self.parts.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PartId, &ModelPart)> {
        self.parts.iter().enumerate().map(|(i, part)| (PartId(i), part))
    }

    /// Build the subtree for `geometry`, returning its top part.
    ///
    /// Children are named by their geometry id; anonymous children and
    /// repeated ids get a `#<index>` segment so sibling names stay unique.
    pub(crate) fn insert_geometry(
        &mut self,
        name: String,
        geometry: &PartGeometry,
        inherited_texture_size: [f32; 2],
        scale: f32,
    ) -> PartId {
        let pivot = geometry.pivot();
        let signs = geometry.invert_axis.signs();
        let texture_size = geometry.texture_size.unwrap_or(inherited_texture_size);

        let cuboids = geometry
            .boxes
            .iter()
            .map(|b| {
                let origin = b.origin();
                let size = b.size();
                let mut from = [0.0; 3];
                for i in 0..3 {
                    let corner = if signs[i] < 0.0 { -(origin[i] + size[i]) } else { origin[i] };
                    from[i] = corner - pivot[i];
                }
                Cuboid {
                    from,
                    size,
                    inflate: b.size_add,
                    uv: b.texture_offset.unwrap_or([0.0, 0.0]),
                    mirror: geometry.mirror_texture.u,
                }
            })
            .collect();

        let id = self.push(ModelPart {
            name,
            id: geometry.id.clone(),
            kind: PartKind::Custom,
            transform: PartTransform { pivot, rotation: geometry.rotation(), scale: [scale; 3] },
            translation: [0.0; 3],
            cuboids,
            texture_size,
            children: Vec::new(),
        });

        for (index, child) in geometry.children().enumerate() {
            let mut segment = child.id.clone().unwrap_or_else(|| format!("#{index}"));
            if self[id].child(&segment).is_some() {
                segment = format!("{segment}#{index}");
            }
            let child_id = self.insert_geometry(segment.clone(), child, texture_size, 1.0);
            self[id].children.push((segment, child_id));
        }

        id
    }
}

impl Index<PartId> for PartArena {
    type Output = ModelPart;

    fn index(&self, id: PartId) -> &ModelPart {
        &self.parts[id.0]
    }
}

impl IndexMut<PartId> for PartArena {
    fn index_mut(&mut self, id: PartId) -> &mut ModelPart {
        &mut self.parts[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(text: &str) -> PartGeometry {
        PartGeometry::parse(text).unwrap()
    }

    #[test]
    fn test_insert_geometry_relative_cuboids() {
        let mut arena = PartArena::new();
        let head = arena.insert_geometry(
            "head".to_string(),
            &geometry(r#"{"translate": [0, 24, 0], "boxes": [{"coordinates": [-4, 24, -4, 8, 8, 8], "textureOffset": [0, 16]}]}"#),
            [64.0, 32.0],
            1.5,
        );
        let part = &arena[head];
        assert_eq!(part.name(), "head");
        assert_eq!(part.kind(), PartKind::Custom);
        assert_eq!(part.transform.pivot, [0.0, 24.0, 0.0]);
        assert_eq!(part.transform.scale, [1.5; 3]);
        assert_eq!(part.cuboids()[0].from, [-4.0, 0.0, -4.0]);
        assert_eq!(part.cuboids()[0].uv, [0.0, 16.0]);
        assert_eq!(part.texture_size(), [64.0, 32.0]);
    }

    #[test]
    fn test_inverted_axis_box_corner() {
        let mut arena = PartArena::new();
        let id = arena.insert_geometry(
            "arm".to_string(),
            &geometry(r#"{"invertAxis": "y", "boxes": [{"coordinates": [0, 2, 0, 1, 4, 1]}]}"#),
            [64.0, 64.0],
            1.0,
        );
        assert_eq!(arena[id].cuboids()[0].from, [0.0, -6.0, 0.0]);
    }

    #[test]
    fn test_children_names_are_unique() {
        let mut arena = PartArena::new();
        let body = arena.insert_geometry(
            "body".to_string(),
            &geometry(r#"{"textureSize": [32, 32], "submodels": [{"id": "a"}, {}, {"id": "a"}]}"#),
            [64.0, 64.0],
            1.0,
        );
        let names: Vec<_> = arena[body].children().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "#1", "a#2"]);
        let first = arena[body].child("a").unwrap();
        assert_eq!(arena[first].texture_size(), [32.0, 32.0]);
        assert_eq!(arena[first].transform.scale, [1.0; 3]);
    }

    #[test]
    fn test_channels_overwrite() {
        let mut part = ModelPart::root();
        part.set_channel(Channel::Rotate, Axis::X, 2.0);
        part.set_channel(Channel::Rotate, Axis::X, 7.0);
        part.set_channel(Channel::Translate, Axis::Z, -1.0);
        part.set_channel(Channel::Scale, Axis::Y, 0.5);
        assert_eq!(part.channel_value(Channel::Rotate, Axis::X), 7.0);
        assert_eq!(part.translation, [0.0, 0.0, -1.0]);
        assert_eq!(part.transform.scale, [1.0, 0.5, 1.0]);
    }

    #[test]
    fn test_add_child_replaces_same_name() {
        let mut arena = PartArena::new();
        let root = arena.push(ModelPart::root());
        let a = arena.push(ModelPart::root());
        let b = arena.push(ModelPart::root());
        assert_eq!(arena[root].add_child("x", a), None);
        assert_eq!(arena[root].add_child("x", b), Some(a));
        assert_eq!(arena[root].children(), &[("x".to_string(), b)]);
    }
}
