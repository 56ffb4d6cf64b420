//! Mesh data and render-pass draw helpers.
//!
//! A [`Mesh`] owns the GPU vertex/index buffers for one piece of geometry.
//! Scene nodes reference meshes together with a shared
//! [`Material`](crate::data_structures::material::Material); the
//! [`DrawMesh`] extension trait wires both into a render pass.

use wgpu::util::DeviceExt;

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Primitive topology of a mesh. Almost everything is triangles; the axes
/// helper draws line lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshTopology {
    Triangles,
    Lines,
}

/// GPU geometry: one vertex buffer, one index buffer.
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub topology: MeshTopology,
}

impl Mesh {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
    ) -> Self {
        Self::with_topology(device, name, vertices, indices, MeshTopology::Triangles)
    }

    pub fn with_topology(
        device: &wgpu::Device,
        name: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
        topology: MeshTopology,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", name)),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", name)),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
            topology,
        }
    }
}

pub trait DrawMesh<'a> {
    /// Draw one mesh with its material, instance and shared scene bind groups.
    ///
    /// Bind group slots follow the pipeline layouts: 0 material, 1 camera,
    /// 2 light (the unlit pipeline only binds 0 and 1).
    fn draw_mesh(
        &mut self,
        mesh: &'a Mesh,
        material_bind_group: &'a wgpu::BindGroup,
        instance_buffer: &'a wgpu::Buffer,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: Option<&'a wgpu::BindGroup>,
    );
}

impl<'a, 'b> DrawMesh<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh(
        &mut self,
        mesh: &'b Mesh,
        material_bind_group: &'b wgpu::BindGroup,
        instance_buffer: &'b wgpu::Buffer,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: Option<&'b wgpu::BindGroup>,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_vertex_buffer(1, instance_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, material_bind_group, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        if let Some(light) = light_bind_group {
            self.set_bind_group(2, light, &[]);
        }
        self.draw_indexed(0..mesh.num_elements, 0, 0..1);
    }
}
