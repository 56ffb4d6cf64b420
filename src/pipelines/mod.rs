//! Render pipeline definitions.
//!
//! - `basic` builds the lit scene pipeline and the shared pipeline factory
//! - `unlit` builds the flat pipelines (textured planes, axes lines)
//! - `light` owns the light uniform shared by the lit pipeline

pub mod basic;
pub mod light;
pub mod unlit;
