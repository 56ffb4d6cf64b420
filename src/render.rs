//! Draw-batch collection for efficient pipeline reuse.
//!
//! Each frame the scene graph is walked once and every visible node with
//! geometry contributes [`DrawItem`]s to a [`DrawBatches`]. The view then
//! binds each pipeline exactly once and draws its batch, instead of
//! switching pipelines per node.

use std::sync::Arc;

use crate::data_structures::{
    material::{Material, Shading},
    model::{Mesh, MeshTopology},
};

/// One mesh to draw: geometry, its node's instance buffer and material.
pub struct DrawItem<'a> {
    pub mesh: &'a Mesh,
    pub material: &'a Arc<Material>,
    pub instance_buffer: &'a wgpu::Buffer,
}

/// Visible geometry sorted into per-pipeline batches.
///
/// - `lit` is drawn with the scene pipeline (camera + light bound)
/// - `unlit` is drawn flat (paper planes, screen glow)
/// - `lines` is the unlit line-list variant (axes helper)
#[derive(Default)]
pub struct DrawBatches<'a> {
    pub lit: Vec<DrawItem<'a>>,
    pub unlit: Vec<DrawItem<'a>>,
    pub lines: Vec<DrawItem<'a>>,
}

impl<'a> DrawBatches<'a> {
    pub fn push(&mut self, item: DrawItem<'a>) {
        match (item.material.shading, item.mesh.topology) {
            (Shading::Lit, MeshTopology::Triangles) => self.lit.push(item),
            (Shading::Unlit, MeshTopology::Triangles) => self.unlit.push(item),
            // Lines are always drawn unlit
            (_, MeshTopology::Lines) => self.lines.push(item),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lit.is_empty() && self.unlit.is_empty() && self.lines.is_empty()
    }
}
