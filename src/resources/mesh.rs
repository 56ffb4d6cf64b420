//! Generated geometry: planes and axis lines.
//!
//! The scene's ground and paper sheets are simple quads and the axes helper
//! is a line list; neither comes from an asset file.

use crate::data_structures::model::{Mesh, MeshTopology, ModelVertex};

/// A `width` x `depth` quad in the XY plane facing +Z, centred on the
/// origin, UVs spanning 0..1.
///
/// Both windings are indexed so the quad is visible from either side
/// regardless of back-face culling, matching how the ground is used.
pub fn plane(device: &wgpu::Device, name: &str, width: f32, depth: f32) -> Mesh {
    let w = width / 2.0;
    let d = depth / 2.0;
    let vertices = [
        ModelVertex {
            position: [-w, -d, 0.0],
            tex_coords: [0.0, 1.0],
            normal: [0.0, 0.0, 1.0],
        },
        ModelVertex {
            position: [w, -d, 0.0],
            tex_coords: [1.0, 1.0],
            normal: [0.0, 0.0, 1.0],
        },
        ModelVertex {
            position: [w, d, 0.0],
            tex_coords: [1.0, 0.0],
            normal: [0.0, 0.0, 1.0],
        },
        ModelVertex {
            position: [-w, d, 0.0],
            tex_coords: [0.0, 0.0],
            normal: [0.0, 0.0, 1.0],
        },
    ];
    let indices = [
        0u32, 1, 2, 0, 2, 3, // front
        0, 2, 1, 0, 3, 2, // back
    ];
    Mesh::new(device, name, &vertices, &indices)
}

/// A single axis line from the origin to `tip`, drawn as a line list.
pub fn axis_line(device: &wgpu::Device, name: &str, tip: [f32; 3]) -> Mesh {
    let vertices = [
        ModelVertex {
            position: [0.0, 0.0, 0.0],
            tex_coords: [0.0, 0.0],
            normal: [0.0, 1.0, 0.0],
        },
        ModelVertex {
            position: tip,
            tex_coords: [1.0, 1.0],
            normal: [0.0, 1.0, 0.0],
        },
    ];
    let indices = [0u32, 1];
    Mesh::with_topology(device, name, &vertices, &indices, MeshTopology::Lines)
}
