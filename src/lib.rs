//! cemkit - Custom entity model compiler and animation runtime
//!
//! This library provides functionality to:
//! - Parse entity model (`.jem`) and part geometry (`.jpm`) documents
//! - Build a live part tree with path-based part lookup
//! - Assemble the tree to match a renderer's model layout
//! - Compile animation expressions once and apply them every frame

pub mod animation;
pub mod config;
pub mod document;
pub mod expression;
pub mod geometry;
pub mod loader;
pub mod pose;
pub mod registry;
pub mod resource;
