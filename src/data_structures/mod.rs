//! Engine data structures: scene graph, meshes, materials and textures.
//!
//! This module contains the core data types for scene representation:
//!
//! - `model` contains mesh definitions and GPU draw helpers
//! - `material` contains the shared shading descriptor for scene nodes
//! - `texture` contains GPU texture wrapper and creation utilities
//! - `instance` holds per-node transformation data
//! - `scene_graph` enables hierarchical scene organisation

pub mod instance;
pub mod material;
pub mod model;
pub mod scene_graph;
pub mod texture;
