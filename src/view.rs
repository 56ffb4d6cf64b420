//! The application shell and render loop.
//!
//! This module owns the winit event loop, the view state (GPU context plus
//! scene) and the perpetual per-frame update. The loop has two states:
//! idle before the first frame, then running for the lifetime of the view.
//! Each tick runs in fixed order:
//!
//! 1. advance the orbit-controller damping
//! 2. advance every bound animation driver and re-propagate transforms
//! 3. draw the full scene graph through the current camera
//!
//! Model loads are issued as independent asynchronous tasks right after
//! startup; each completion arrives as a [`ViewEvent`] on the event-loop
//! thread, so all scene mutation stays on one thread and a tick may observe
//! the scene in any partially populated state. Destroying the view stops
//! the loop and drops the GPU context; a load that completes afterwards is
//! detected in the event handler and discarded without touching anything.

use std::{fmt::Debug, iter, sync::Arc};

use instant::Instant;

#[cfg(feature = "integration-tests")]
use instant::Duration;
#[cfg(feature = "integration-tests")]
use tokio::runtime::Runtime;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    context::Context,
    data_structures::{model::DrawMesh, texture::Texture},
    render::DrawBatches,
    resources::{GltfLoader, SceneFragment},
    scene::{self, ModelSpec, Scene},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Startup configuration: where assets are fetched from.
pub struct ViewConfig {
    /// Directory (native) or URL path below the page origin (WASM) that
    /// every asset fetch resolves against.
    pub asset_root: String,
    /// Render-to-texture probe invoked after each frame; the view exits
    /// once it reports `Passed`.
    #[cfg(feature = "integration-tests")]
    pub probe: Option<RenderProbe>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            asset_root: "assets".to_string(),
            #[cfg(feature = "integration-tests")]
            probe: None,
        }
    }
}

#[cfg(feature = "integration-tests")]
pub enum ImageTestResult {
    Passed,
    Waiting,
    Failed,
}

#[cfg(feature = "integration-tests")]
pub type RenderProbe = Box<
    dyn FnMut(
        u32,
        &image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> Result<ImageTestResult, anyhow::Error>,
>;

/// Render-loop state: idle before the first frame, then running for the
/// lifetime of the view. There is no exit transition during normal
/// operation; only teardown stops the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoopState {
    Idle,
    Running,
}

/// View state bundle: GPU context, scene and surface status.
pub struct ViewState {
    pub(crate) ctx: Context,
    pub(crate) scene: Scene,
    pub(crate) specs: Vec<ModelSpec>,
    is_surface_configured: bool,
    occluded: bool,
}

impl ViewState {
    async fn new(window: Arc<Window>, loader: &GltfLoader) -> anyhow::Result<Self> {
        let ctx = Context::new(window).await?;
        let (scene, specs) = scene::assemble_desk_scene(&ctx, loader).await;
        Ok(Self {
            ctx,
            scene,
            specs,
            is_surface_configured: false,
            occluded: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.config.width = width;
            self.ctx.config.height = height;
            self.is_surface_configured = true;
            self.ctx.projection.resize(width, height);
            self.ctx
                .surface
                .configure(&self.ctx.device, &self.ctx.config);
            self.ctx.depth_texture = Texture::create_depth_texture(
                &self.ctx.device,
                [self.ctx.config.width, self.ctx.config.height],
                "depth_texture",
            );
        }
    }

    #[cfg(feature = "integration-tests")]
    fn get_test_texture(&self, extent3d: wgpu::Extent3d, depth: bool) -> wgpu::Texture {
        self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Render Probe Texture"),
            size: extent3d,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: if depth {
                wgpu::TextureFormat::Depth32Float
            } else {
                self.ctx.config.format
            },
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    #[cfg(feature = "integration-tests")]
    fn get_width_height(&self) -> (u32, u32) {
        // The img lib requires divisibility of 256...
        let width = self.ctx.config.width;
        let height = self.ctx.config.height;
        let width = width + (256 - (width % 256));
        let height = height + (256 - (height % 256));
        (width, height)
    }

    #[cfg(feature = "integration-tests")]
    fn get_test_3d_extent(&self) -> wgpu::Extent3d {
        let (width, height) = self.get_width_height();
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        }
    }

    fn render(
        &mut self,
        #[cfg(feature = "integration-tests")] probe: &mut Option<RenderProbe>,
        #[cfg(feature = "integration-tests")] frame: u32,
        #[cfg(feature = "integration-tests")] async_runtime: &Runtime,
        #[cfg(feature = "integration-tests")] proxy: &EventLoopProxy<ViewEvent>,
    ) -> Result<(), wgpu::SurfaceError> {
        // schedule the next tick with the host's frame presentation
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        #[cfg(not(feature = "integration-tests"))]
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        #[cfg(feature = "integration-tests")]
        let (tex, depth) = {
            let extent3d = self.get_test_3d_extent();
            let tex = self.get_test_texture(extent3d, false);
            let depth = self.get_test_texture(extent3d, true);
            (tex, depth)
        };

        let fallback = self
            .ctx
            .default_material
            .bind_group()
            .expect("default material is uploaded at startup");

        let mut batches = DrawBatches::default();
        self.scene.collect_draws(&mut batches);

        let mut encoder: wgpu::CommandEncoder =
            self.ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });
        {
            let mut render_pass: wgpu::RenderPass<'_> =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        #[cfg(feature = "integration-tests")]
                        view: &tex.create_view(&wgpu::TextureViewDescriptor::default()),
                        #[cfg(not(feature = "integration-tests"))]
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        #[cfg(feature = "integration-tests")]
                        view: &depth.create_view(&wgpu::TextureViewDescriptor::default()),
                        #[cfg(not(feature = "integration-tests"))]
                        view: &self.ctx.depth_texture.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });

            // Actual rendering: a partially populated scene is a valid
            // scene, empty batches simply draw nothing
            render_pass.set_pipeline(&self.ctx.pipelines.scene);
            for item in &batches.lit {
                render_pass.draw_mesh(
                    item.mesh,
                    item.material.bind_group().unwrap_or(fallback),
                    item.instance_buffer,
                    &self.ctx.camera.bind_group,
                    Some(&self.ctx.light.bind_group),
                );
            }

            render_pass.set_pipeline(&self.ctx.pipelines.unlit);
            for item in &batches.unlit {
                render_pass.draw_mesh(
                    item.mesh,
                    item.material.bind_group().unwrap_or(fallback),
                    item.instance_buffer,
                    &self.ctx.camera.bind_group,
                    None,
                );
            }

            render_pass.set_pipeline(&self.ctx.pipelines.axes);
            for item in &batches.lines {
                render_pass.draw_mesh(
                    item.mesh,
                    item.material.bind_group().unwrap_or(fallback),
                    item.instance_buffer,
                    &self.ctx.camera.bind_group,
                    None,
                );
            }
        }

        #[cfg(feature = "integration-tests")]
        let output_buffer = {
            let u32_size = std::mem::size_of::<u32>() as u32;
            let (width, height) = self.get_width_height();
            let output_buffer_size = (u32_size * width * height) as wgpu::BufferAddress;
            let output_buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
                size: output_buffer_size,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                label: None,
                mapped_at_creation: false,
            });
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &tex,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &output_buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(u32_size * width),
                        rows_per_image: Some(height),
                    },
                },
                self.get_test_3d_extent(),
            );
            output_buffer
        };

        self.ctx.queue.submit(iter::once(encoder.finish()));

        #[cfg(feature = "integration-tests")]
        if let Some(probe) = probe {
            let fut_img = async {
                let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
                let buffer_slice = output_buffer.slice(..);
                buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
                    tx.send(result).unwrap();
                });
                self.ctx
                    .device
                    .poll(wgpu::PollType::Wait {
                        submission_index: None,
                        timeout: Some(Duration::from_secs(3)),
                    })
                    .unwrap();
                rx.receive().await.unwrap().unwrap();
                let data = buffer_slice.get_mapped_range();
                let (width, height) = self.get_width_height();
                image::ImageBuffer::<image::Rgba<u8>, _>::from_raw(width, height, data).unwrap()
            };
            let img = async_runtime.block_on(fut_img);
            match probe(frame, &img) {
                Err(e) => panic!("{}", e),
                Ok(ImageTestResult::Passed) => {
                    proxy
                        .send_event(ViewEvent::Exit)
                        .expect("probe passed but the winit event-loop could not safely exit");
                }
                Ok(ImageTestResult::Failed) => panic!("render probe assertion failed"),
                Ok(ImageTestResult::Waiting) => (),
            }
        }

        output.present();
        Ok(())
    }
}

/// Events delivered to the view on the event-loop thread.
pub(crate) enum ViewEvent {
    /// Deferred initialization handoff (the WASM path cannot block).
    #[allow(dead_code)]
    Initialized(Box<ViewState>),
    /// One asynchronous model load finished, successfully or not.
    ModelLoaded {
        file: String,
        slot: usize,
        result: anyhow::Result<SceneFragment>,
    },
    #[allow(dead_code)]
    Exit,
}

impl Debug for ViewEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::ModelLoaded { file, slot, result } => f
                .debug_struct("ModelLoaded")
                .field("file", file)
                .field("slot", slot)
                .field("ok", &result.is_ok())
                .finish(),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<ViewEvent>,
    state: Option<ViewState>,
    loader: GltfLoader,
    loop_state: LoopState,
    last_time: Instant,
    started: bool,
    #[cfg(feature = "integration-tests")]
    probe: Option<RenderProbe>,
    #[cfg(feature = "integration-tests")]
    frame: u32,
}

impl App {
    fn new(event_loop: &EventLoop<ViewEvent>, config: ViewConfig) -> Self {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new().unwrap();
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            state: None,
            loader: GltfLoader::new(config.asset_root),
            loop_state: LoopState::Idle,
            last_time: Instant::now(),
            started: false,
            #[cfg(feature = "integration-tests")]
            probe: config.probe,
            #[cfg(feature = "integration-tests")]
            frame: 0,
        }
    }

    /// Issue every model load as an independent task. Completions arrive
    /// as [`ViewEvent::ModelLoaded`] in no particular order while the
    /// render loop keeps running.
    fn spawn_loads(&self) {
        let Some(state) = &self.state else {
            return;
        };
        for (slot, spec) in state.specs.iter().enumerate() {
            let loader = self.loader.clone();
            let file = spec.file.clone();
            let device = state.ctx.device.clone();
            let queue = state.ctx.queue.clone();
            let proxy = self.proxy.clone();
            let load = async move {
                let result = loader.load_scene(&file, &device, &queue).await;
                // the receiver may already be gone when the view was torn
                // down while the load was in flight
                let _ = proxy.send_event(ViewEvent::ModelLoaded { file, slot, result });
            };
            #[cfg(not(target_arch = "wasm32"))]
            self.async_runtime.spawn(load);
            #[cfg(target_arch = "wasm32")]
            wasm_bindgen_futures::spawn_local(load);
        }
    }

    /// Stop the render loop and release the surface and GPU resources.
    ///
    /// Dropping the view state releases everything it owns; in-flight
    /// loads are not cancelled, their completions are discarded by the
    /// liveness check in `user_event`.
    fn teardown(&mut self, event_loop: &ActiveEventLoop) {
        log::info!("tearing down view");
        self.loop_state = LoopState::Idle;
        self.state = None;
        event_loop.exit();
    }
}

impl ApplicationHandler<ViewEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.started {
            return;
        }
        self.started = true;

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes();

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = Arc::new(event_loop.create_window(window_attributes).unwrap());
        let loader = self.loader.clone();

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self
                .async_runtime
                .block_on(ViewState::new(window, &loader))
            {
                Ok(state) => {
                    self.state = Some(state);
                    self.spawn_loads();
                    self.last_time = Instant::now();
                    if let Some(state) = &self.state {
                        state.ctx.window.request_redraw();
                    }
                }
                Err(e) => {
                    log::error!("view initialization failed: {}", e);
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match ViewState::new(window, &loader).await {
                    Ok(state) => {
                        assert!(
                            proxy
                                .send_event(ViewEvent::Initialized(Box::new(state)))
                                .is_ok()
                        );
                    }
                    Err(e) => log::error!("view initialization failed: {}", e),
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewEvent) {
        match event {
            ViewEvent::Initialized(state) => {
                // This is the message from our wasm `spawn_local`
                self.state = Some(*state);
                self.spawn_loads();

                // Important: Trigger a resize and redraw now that we are initialized
                let state = self.state.as_mut().unwrap();
                let size = state.ctx.window.inner_size();
                state.resize(size.width, size.height);
                self.last_time = Instant::now();
                state.ctx.window.request_redraw();
            }
            ViewEvent::ModelLoaded { file, slot, result } => {
                // Liveness check: a load that outlived the view must not
                // touch the torn-down scene
                let Some(state) = &mut self.state else {
                    log::warn!("load of {} completed after teardown, dropping it", file);
                    return;
                };
                match result {
                    Ok(fragment) => {
                        let spec = &state.specs[slot];
                        let transform = spec.transform.clone();
                        let rules = spec.rules.clone();
                        state.scene.attach_fragment(fragment, transform, &rules);
                        log::info!("attached {}", file);
                    }
                    // the model simply never appears, nothing to roll back
                    Err(e) => log::error!("failed to load {}: {}", file, e),
                }
            }
            ViewEvent::Exit => {
                self.teardown(event_loop);
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            state.ctx.camera.controller.handle_mouse(dx, dy);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        if let WindowEvent::CloseRequested = event {
            self.teardown(event_loop);
            return;
        }

        let Some(state) = &mut self.state else {
            return;
        };

        state.ctx.camera.controller.handle_window_events(&event);

        match event {
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::Occluded(occluded) => {
                state.occluded = occluded;
                if !occluded {
                    // resume without catch-up: skipped time is not replayed
                    self.last_time = Instant::now();
                    state.ctx.window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => {
                if state.occluded {
                    // tick skipped entirely while not visible
                    return;
                }
                if self.loop_state == LoopState::Idle {
                    self.loop_state = LoopState::Running;
                    log::info!("render loop running");
                }
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                // 1. camera damping
                state
                    .ctx
                    .camera
                    .controller
                    .update(&mut state.ctx.camera.camera, dt);
                state
                    .ctx
                    .camera
                    .uniform
                    .update_view_proj(&state.ctx.camera.camera, &state.ctx.projection);
                state.ctx.queue.write_buffer(
                    &state.ctx.camera.buffer,
                    0,
                    bytemuck::cast_slice(&[state.ctx.camera.uniform]),
                );

                // 2. animation drivers
                state.scene.advance(dt.as_secs_f32());
                state.scene.write_to_buffers(&state.ctx.queue);

                // 3. draw
                #[cfg(feature = "integration-tests")]
                {
                    self.frame += 1;
                }
                match state.render(
                    #[cfg(feature = "integration-tests")]
                    &mut self.probe,
                    #[cfg(feature = "integration-tests")]
                    self.frame,
                    #[cfg(feature = "integration-tests")]
                    &self.async_runtime,
                    #[cfg(feature = "integration-tests")]
                    &self.proxy,
                ) {
                    Ok(_) => (),
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Run the desk-scene view until the window closes.
pub fn run(config: ViewConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    let event_loop: EventLoop<ViewEvent> = {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        winit::event_loop::EventLoop::with_user_event()
            .with_any_thread(true)
            .build()
            .expect("Failed to create an event loop")
    };

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    let event_loop: EventLoop<ViewEvent> = {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        winit::event_loop::EventLoop::with_user_event()
            .with_any_thread(true)
            .build()
            .expect("Failed to create an event loop")
    };

    #[cfg(not(feature = "integration-tests"))]
    let event_loop: EventLoop<ViewEvent> = EventLoop::with_user_event().build()?;

    let mut app = App::new(&event_loop, config);

    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    if let Err(e) = run(ViewConfig::default()) {
        log::error!("view exited with error: {}", e);
    }
}
