//! Integration tests for loading, assembling and animating entity models
//!
//! These tests load the documents under `tests/fixtures` through a
//! directory-backed resource source, the same way a resource pack is read.

use std::fs;
use std::path::{Path, PathBuf};

use cemkit::animation::{Axis, Channel};
use cemkit::config::CemConfig;
use cemkit::document::DocumentError;
use cemkit::loader::{LoadError, ModelLoader};
use cemkit::pose::EntityState;
use cemkit::registry::{
    FamilyTree, ModelRegistry, PartKind, PartNameMap, PartTransform, ReferencePart, ReferenceResolver,
    RootAssembly, WarningKind,
};
use cemkit::resource::{DirectorySource, ResourceLocation};
use tempfile::TempDir;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn loader(config: CemConfig) -> ModelLoader<DirectorySource> {
    ModelLoader::new(DirectorySource::new(fixtures()), config)
}

fn wolf(config: CemConfig) -> ModelRegistry {
    let loader = loader(config);
    let location = loader.location("optifine/cem/wolf.jem");
    loader.load_registry(&location).expect("wolf fixture should load")
}

fn no_reference() -> ReferencePart {
    ReferencePart::default()
}

struct Sneaking;

impl EntityState for Sneaking {
    fn health(&self) -> f32 {
        8.0
    }
    fn max_health(&self) -> f32 {
        8.0
    }
    fn hurt_time(&self) -> f32 {
        0.0
    }
    fn is_child(&self) -> bool {
        false
    }
    fn is_in_water(&self) -> bool {
        false
    }
    fn is_riding(&self) -> bool {
        false
    }
    fn is_sneaking(&self) -> bool {
        true
    }
}

// =============================================================================
// Document loading
// =============================================================================

#[test]
fn test_wolf_document() {
    let registry = wolf(CemConfig::default());
    let document = registry.document();
    assert_eq!(document.texture_size(), [64.0, 32.0]);
    assert_eq!(document.part_names().collect::<Vec<_>>(), vec!["head", "body", "tail", "leg1"]);
    assert_eq!(
        document.part("head").unwrap().model().unwrap().to_string(),
        "minecraft:optifine/cem/parts/wolf_head.jpm"
    );
    assert_eq!(
        document.part("tail").unwrap().model().unwrap().to_string(),
        "minecraft:optifine/cem/parts/wolf_tail.jpm"
    );
    assert!(registry.has_texture());
    assert_eq!(registry.texture().unwrap().to_string(), "minecraft:optifine/cem/wolf_custom.png");
    assert_eq!(registry.shadow_radius(), Some(0.5));
}

#[test]
fn test_rejected_texture_path() {
    let loader = loader(CemConfig::default());
    let err = loader.load_document(&loader.location("optifine/cem/bad_texture.jem")).unwrap_err();
    match err {
        LoadError::Document { source: DocumentError::InvalidTexturePath(path), .. } => assert_eq!(path, "A/B.PNG"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_dependent_file_names_location() {
    let loader = loader(CemConfig::default());
    let err = loader.load_document(&loader.location("optifine/cem/missing_part_file.jem")).unwrap_err();
    match err {
        LoadError::Document { source: DocumentError::DependentFile { location, .. }, .. } => {
            assert_eq!(location.to_string(), "minecraft:optifine/cem/parts/not_there.jpm")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_load_all_in_parallel() {
    let loader = loader(CemConfig::default());
    let locations: Vec<ResourceLocation> = ["wolf.jem", "bad_texture.jem", "missing_part_file.jem"]
        .iter()
        .map(|name| loader.location(&format!("optifine/cem/{name}")))
        .collect();
    let results = loader.load_all(&locations);
    let ok: Vec<bool> = results.iter().map(|(_, result)| result.is_ok()).collect();
    assert_eq!(ok, vec![true, false, false]);
}

#[test]
fn test_documents_from_temp_pack() {
    let temp = TempDir::new().unwrap();
    let cem = temp.path().join("assets").join("mymod").join("optifine").join("cem");
    fs::create_dir_all(&cem).unwrap();
    fs::write(cem.join("golem.jem"), r#"{"textureSize": [128, 128], "models": [{"part": "head", "model": "golem_head.jpm"}]}"#)
        .unwrap();
    fs::write(cem.join("golem_head.jpm"), r#"{"translate": [0, 31, 0], "boxes": [{"coordinates": [-4, 31, -5, 8, 10, 8]}]}"#)
        .unwrap();

    let config = CemConfig { default_namespace: "mymod".to_string(), ..CemConfig::default() };
    let loader = ModelLoader::new(DirectorySource::new(temp.path()), config);
    let registry = loader.load_registry(&loader.location("optifine/cem/golem.jem")).unwrap();
    let head = registry.entry_by_part_name("head").unwrap();
    assert_eq!(registry.parts()[head].transform.pivot, [0.0, 31.0, 0.0]);
    assert_eq!(registry.parts()[head].texture_size(), [128.0, 128.0]);
}

// =============================================================================
// Lookup
// =============================================================================

#[test]
fn test_path_lookup() {
    let registry = wolf(CemConfig::default());
    let arm = registry.find_child("arm", None).unwrap();
    let hand = registry.find_child("arm:hand", None).unwrap();
    assert_eq!(registry.path_key(arm).unwrap().segments(), &["body", "arm"]);
    assert_eq!(registry.path_key(hand).unwrap().segments(), &["body", "arm", "hand"]);

    let head = registry.entry_by_part_name("head").unwrap();
    let ear = registry.find_child("this:ear", Some(head)).unwrap();
    assert_eq!(registry.path_key(ear).unwrap().to_string(), "head:ear");
    assert_eq!(registry.find_child("this", Some(head)).unwrap(), head);
    assert_eq!(registry.entry_by_part_name("front_leg"), registry.entry_by_part_name("leg1"));
}

// =============================================================================
// Animation
// =============================================================================

#[test]
fn test_bad_expression_leaves_rest_loaded() {
    let registry = wolf(CemConfig::default());
    let animation_warnings: Vec<_> =
        registry.warnings().iter().filter(|w| w.kind == WarningKind::Animation).collect();
    assert_eq!(animation_warnings.len(), 1);
    assert!(animation_warnings[0].message.contains("speed * 2"));
    assert!(animation_warnings[0].message.contains("minecraft:optifine/cem/wolf.jem"));
    assert_eq!(registry.animations().len(), 8);
}

#[test]
fn test_head_follows_pitch() {
    let mut registry = wolf(CemConfig::default());
    registry.apply_animations(0.0, 0.0, 0.0, 0.0, 10.0, None);
    let head = registry.entry_by_part_name("head").unwrap();
    assert_eq!(registry.parts()[head].channel_value(Channel::Rotate, Axis::X), 5.0);
}

#[test]
fn test_cross_part_and_entity_bindings() {
    let mut registry = wolf(CemConfig::default());
    registry.apply_animations(0.0, 1.0, 0.0, 0.0, 0.0, Some(&Sneaking));

    let arm = registry.find_child("arm", None).unwrap();
    let hand = registry.find_child("hand", None).unwrap();
    let tail = registry.entry_by_part_name("tail").unwrap();
    let body = registry.entry_by_part_name("body").unwrap();

    assert!((registry.parts()[arm].channel_value(Channel::Rotate, Axis::X) - 1.4).abs() < 1e-6);
    assert_eq!(registry.parts()[hand].translation, [0.0, 0.0, 1.0]);
    let body_rx = registry.parts()[body].transform.rotation[0];
    assert_eq!(registry.parts()[tail].transform.rotation[0], body_rx + 0.5);
    // tail.rz reads tail.rx, which was written earlier in the same frame
    assert_eq!(registry.parts()[tail].transform.rotation[2], body_rx + 0.5);

    registry.apply_animations(0.0, 1.0, 0.0, 0.0, 0.0, None);
    assert_eq!(registry.parts()[hand].translation, [0.0, 0.0, 0.0]);
}

#[test]
fn test_rotate_overwrites_each_frame() {
    let mut registry = wolf(CemConfig::default());
    let leg = registry.entry_by_part_name("leg1").unwrap();
    let bindings: Vec<String> = registry
        .animations()
        .iter()
        .filter(|b| b.target() == leg)
        .map(|b| b.expression().source().to_string())
        .collect();
    assert_eq!(bindings, vec!["leg1.rx + 7"]);

    registry.apply_animations(0.0, 0.0, 0.0, 0.0, 0.0, None);
    assert_eq!(registry.parts()[leg].channel_value(Channel::Rotate, Axis::X), 7.0);
}

// =============================================================================
// Root assembly
// =============================================================================

#[test]
fn test_empty_assembly() {
    let mut registry = wolf(CemConfig::default());
    let provider = no_reference;
    let root = registry.prep_root_part(&RootAssembly::new(&provider));
    let names: Vec<&str> = registry.parts()[root].children().iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["head", "body", "tail", "leg1"]);
    let tail = registry.parts()[root].child("tail").unwrap();
    assert_eq!(registry.parts()[tail].transform.pivot, [-1.0, 12.0, 8.0]);
}

#[test]
fn test_family_assembly_with_names() {
    let mut registry = wolf(CemConfig::default());
    let provider = no_reference;
    let names = PartNameMap::from([("tail".to_string(), "real_tail".to_string())]);
    let family = FamilyTree::new().with_family("body", ["tail", "leg1"]);
    let root = registry.prep_root_part(&RootAssembly::new(&provider).with_part_names(names).with_family_tree(family));

    let body = registry.parts()[root].child("body").unwrap();
    let tail = registry.parts()[body].child("real_tail").unwrap();
    assert_eq!(registry.parts()[tail].transform.pivot, [-1.0, -2.0, 6.0]);
    assert!(registry.parts()[root].child("tail").is_none());
    assert!(registry.parts()[body].child("arm").is_some());
}

#[test]
fn test_transparent_assembly() {
    let config = CemConfig { use_transparent_parts: true, ..CemConfig::default() };
    let mut registry = wolf(config);
    let provider = || {
        ReferencePart::default()
            .with_child(
                "head",
                ReferencePart::new(PartTransform::from_pivot([-1.0, 13.5, -7.0]))
                    .with_child("ear", ReferencePart::new(PartTransform::from_pivot([0.0, 3.0, 1.0]))),
            )
            .with_child("body", ReferencePart::new(PartTransform::new([0.0, 14.0, 2.0], [1.5708, 0.0, 0.0])))
    };
    let root = registry.prep_root_part(&RootAssembly::new(&provider));

    let head_wrapper = registry.parts()[root].child("head").unwrap();
    let head = registry.entry_by_part_name("head").unwrap();
    assert_eq!(registry.parts()[head_wrapper].kind(), PartKind::Transparent { inner: head });
    assert_eq!(registry.parts()[head].transform.pivot, [0.0, 0.0, 0.0]);

    let ear_wrapper = registry.parts()[head].child("ear").unwrap();
    assert!(matches!(registry.parts()[ear_wrapper].kind(), PartKind::Transparent { .. }));

    let overlay = registry.warnings().iter().filter(|w| w.kind == WarningKind::Overlay).count();
    // tail and leg1 at the root, snout under head, arm under body
    assert_eq!(overlay, 4);
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_discovery() {
    let temp = TempDir::new().unwrap();
    let nested = temp.path().join("pack").join("assets");
    fs::create_dir_all(&nested).unwrap();
    fs::write(temp.path().join("cem.toml"), "use_transparent_parts = true\n").unwrap();

    let config = CemConfig::discover(&nested).unwrap();
    assert!(config.use_transparent_parts);
    assert_eq!(config.default_namespace, "minecraft");
}
