use crate::data_structures::{
    instance::InstanceRaw,
    material,
    model::{self, Vertex},
    texture::Texture,
};

use crate::pipelines::basic::mk_render_pipeline;

/// Flat pipeline for paper planes and other self-lit geometry.
pub fn mk_unlit_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    mk_flat_pipeline(
        device,
        config,
        camera_bind_group_layout,
        wgpu::PrimitiveTopology::TriangleList,
    )
}

/// Line-list variant of the flat pipeline, used by the axes helper.
pub fn mk_axes_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    mk_flat_pipeline(
        device,
        config,
        camera_bind_group_layout,
        wgpu::PrimitiveTopology::LineList,
    )
}

fn mk_flat_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    topology: wgpu::PrimitiveTopology,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Unlit Pipeline Layout"),
        bind_group_layouts: &[&material::material_layout(device), camera_bind_group_layout],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Unlit Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("unlit_shader.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        &layout,
        config.format,
        Some(wgpu::BlendState {
            alpha: wgpu::BlendComponent::REPLACE,
            color: wgpu::BlendComponent::REPLACE,
        }),
        Some(Texture::DEPTH_FORMAT),
        &[model::ModelVertex::desc(), InstanceRaw::desc()],
        topology,
        shader,
    )
}
