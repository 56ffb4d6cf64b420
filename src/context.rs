use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

use cgmath::Deg;

use crate::{
    camera::{self, CameraResources, CameraUniform},
    data_structures::{
        material::{self, Material},
        texture::{self, Texture},
    },
    pipelines::{
        basic::mk_scene_pipeline,
        light::{LightResources, LightUniform},
        unlit::{mk_axes_pipeline, mk_unlit_pipeline},
    },
};

// Where the orbit starts and how it feels
const CAMERA_START: [f32; 3] = [5.0, 5.0, 5.0];
const CAMERA_TARGET: [f32; 3] = [0.0, 0.0, 0.0];
const CAMERA_FOVY_DEG: f32 = 75.0;
const CAMERA_ZNEAR: f32 = 0.1;
const CAMERA_ZFAR: f32 = 1000.0;
const ORBIT_DAMPING: f32 = 0.05;
const ORBIT_ZOOM_SPEED: f32 = 2.0;

const LIGHT_POSITION: [f32; 3] = [-2.0, 10.0, 0.0];
const LIGHT_COLOR: [f32; 3] = [1.0, 1.0, 1.0];
const AMBIENT_STRENGTH: f32 = 0.5;

/// The render pipelines built once at startup.
pub struct Pipelines {
    pub scene: wgpu::RenderPipeline,
    pub unlit: wgpu::RenderPipeline,
    pub axes: wgpu::RenderPipeline,
}

/// Central GPU and window context.
///
/// Owns the surface, device, queue and everything derived from them:
/// camera resources, light resources, depth texture and the render
/// pipelines. All of it is released through `Drop` when the view state is
/// torn down, on every exit path.
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: camera::Projection,
    pub light: LightResources,
    pub pipelines: Pipelines,
    pub clear_colour: wgpu::Color,
    /// Fallback for nodes whose material has no GPU half yet.
    pub default_material: Arc<Material>,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        // The instance is a handle to our GPU
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                experimental_features: Default::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders assume an Srgb surface texture; fall back to whatever
        // the platform offers otherwise.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let camera = camera::Camera::new(CAMERA_START, CAMERA_TARGET);
        let projection = camera::Projection::new(
            config.width,
            config.height,
            Deg(CAMERA_FOVY_DEG),
            CAMERA_ZNEAR,
            CAMERA_ZFAR,
        );
        let controller = camera::OrbitController::new(
            CAMERA_START.into(),
            CAMERA_TARGET.into(),
            ORBIT_DAMPING,
            ORBIT_ZOOM_SPEED,
        );

        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(&camera, &projection);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("camera_bind_group_layout"),
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let camera = CameraResources {
            camera,
            controller,
            uniform: camera_uniform,
            buffer: camera_buffer,
            bind_group: camera_bind_group,
            bind_group_layout: camera_bind_group_layout,
        };

        let depth_texture = Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        let light = LightResources::new(
            LightUniform {
                position: LIGHT_POSITION,
                _padding: 0,
                color: LIGHT_COLOR,
                ambient: AMBIENT_STRENGTH,
            },
            &device,
        );

        let pipelines = Pipelines {
            scene: mk_scene_pipeline(
                &device,
                &config,
                &light.bind_group_layout,
                &camera.bind_group_layout,
            ),
            unlit: mk_unlit_pipeline(&device, &config, &camera.bind_group_layout),
            axes: mk_axes_pipeline(&device, &config, &camera.bind_group_layout),
        };

        let placeholder = Texture::create_placeholder(&device, &queue);
        let default_material = Arc::new(Material::solid("default", [0.8, 0.8, 0.8, 1.0]));
        default_material.upload(
            &device,
            &material::material_layout(&device),
            None,
            &placeholder,
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            light,
            pipelines,
            window,
            depth_texture,
            clear_colour: wgpu::Color::BLACK,
            default_material,
        })
    }
}
