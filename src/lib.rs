//! deskview
//!
//! A small cross-platform viewer that assembles and renders an interactive
//! 3D desk scene (ground plane, desk, chair, monitor, decorative props and
//! paper planes) with orbit camera controls. The crate targets native
//! windows and the browser canvas (WASM) from the same code path and keeps
//! its runtime surface minimal: one scene, one perpetual render loop, and
//! asynchronous model loading that never blocks a frame.
//!
//! High-level modules
//! - `camera`: camera, projection and the damped orbit controller
//! - `context`: central GPU and window context owning device/queue/pipelines
//! - `data_structures`: scene data models (scene graph, meshes, materials)
//! - `view`: the application shell, event loop and per-frame update order
//! - `scene`: the hardcoded desk-scene assembly and attach logic
//! - `postprocess`: name-pattern material/visibility rules for loaded models
//! - `animation`: per-subtree playback of embedded animation clips
//! - `resources`: asset fetching and glTF decoding into scene fragments
//! - `render`: draw-batch collection for efficient pipeline reuse
//!

pub mod animation;
pub mod camera;
pub mod context;
pub mod data_structures;
pub mod pipelines;
pub mod postprocess;
pub mod render;
pub mod resources;
pub mod scene;
pub mod view;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use winit::dpi::PhysicalPosition;
pub use winit::event::DeviceEvent;
pub use winit::event::WindowEvent;
