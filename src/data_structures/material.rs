//! Shared material descriptors for scene nodes.
//!
//! A [`Material`] is a shading descriptor (base colour, optional texture,
//! UV tiling, lit vs unlit mode) shared by reference across any number of
//! scene nodes. The CPU-side description and the GPU bind group are split:
//! the description can be built and inspected anywhere, `upload` attaches
//! the GPU half once a device is available. A node whose material has not
//! been uploaded yet is drawn with the context's placeholder binding, so a
//! partially loaded scene never fails a frame.

use std::sync::OnceLock;

use wgpu::util::DeviceExt;

use crate::data_structures::texture::Texture;

/// Rendering mode of a material: shaded by the scene lights, or flat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shading {
    Lit,
    Unlit,
}

/// Per-material uniform data: base colour and UV tiling repeat.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    base_color: [f32; 4],
    uv_repeat: [f32; 2],
    // Uniform structs require 16 byte alignment, pad the vec2 out
    _padding: [f32; 2],
}

#[derive(Debug)]
pub struct MaterialGpu {
    // The bind group keeps buffer and texture alive, the fields are only
    // retained for debugging
    #[allow(unused)]
    buffer: wgpu::Buffer,
    #[allow(unused)]
    texture: Option<Texture>,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub shading: Shading,
    pub base_color: [f32; 4],
    pub uv_repeat: [f32; 2],
    gpu: OnceLock<MaterialGpu>,
}

impl Material {
    pub fn new(name: &str, shading: Shading, base_color: [f32; 4], uv_repeat: [f32; 2]) -> Self {
        Self {
            name: name.to_string(),
            shading,
            base_color,
            uv_repeat,
            gpu: OnceLock::new(),
        }
    }

    /// A lit material with a solid colour and no texture.
    pub fn solid(name: &str, base_color: [f32; 4]) -> Self {
        Self::new(name, Shading::Lit, base_color, [1.0, 1.0])
    }

    /// Create the GPU half: uniform buffer and bind group.
    ///
    /// `texture` is the material's own texture or `None` for untextured
    /// materials, which then sample `placeholder` (solid white). Calling
    /// `upload` more than once is a no-op.
    pub fn upload(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        texture: Option<Texture>,
        placeholder: &Texture,
    ) {
        if self.gpu.get().is_some() {
            return;
        }
        let uniform = MaterialUniform {
            base_color: self.base_color,
            uv_repeat: self.uv_repeat,
            _padding: [0.0; 2],
        };
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} material buffer", self.name)),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let (view, sampler) = match &texture {
            Some(tex) => (&tex.view, &tex.sampler),
            None => (&placeholder.view, &placeholder.sampler),
        };
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffer.as_entire_binding(),
                },
            ],
            label: Some(&format!("{} material bind group", self.name)),
        });
        let _ = self.gpu.set(MaterialGpu {
            buffer,
            texture,
            bind_group,
        });
    }

    /// The bind group, present once [`upload`](Self::upload) ran.
    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.gpu.get().map(|gpu| &gpu.bind_group)
    }
}

/// Bind group layout shared by every material: diffuse texture, sampler and
/// the material uniform.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}
