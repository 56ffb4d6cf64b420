//! Camera, projection and the damped orbit controller.
//!
//! The camera orbits a target point. User input moves goal values for
//! azimuth, elevation and distance; the controller eases the current values
//! toward the goals once per frame with an exponential damping factor, so
//! motion settles smoothly instead of stopping dead. Skipping the per-frame
//! update leaves the camera static regardless of input.

use instant::Duration;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3, perspective};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

/// wgpu clip space z goes 0..1 while cgmath produces OpenGL's -1..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Debug)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P, target: P) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }
}

/// Perspective projection with defensive resize handling.
#[derive(Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        let mut projection = Self {
            aspect: 1.0,
            fovy: fovy.into(),
            znear,
            zfar,
        };
        projection.resize(width, height);
        projection
    }

    /// Recompute the aspect ratio for a new surface size.
    ///
    /// Zero dimensions clamp to one pixel so a degenerate resize event can
    /// never divide by zero; calling this repeatedly with the same size is
    /// a no-op.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// The camera uniform visible to shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Orbit-style camera controller with exponential damping.
#[derive(Debug)]
pub struct OrbitController {
    target: Point3<f32>,
    azimuth: f32,
    elevation: f32,
    distance: f32,
    goal_azimuth: f32,
    goal_elevation: f32,
    goal_distance: f32,
    damping: f32,
    zoom_speed: f32,
    rotate_speed: f32,
    dragging: bool,
}

impl OrbitController {
    pub const MIN_DISTANCE: f32 = 1.0;
    pub const MAX_DISTANCE: f32 = 100.0;
    // Stay shy of the poles so the up vector never degenerates
    const MAX_ELEVATION: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

    /// A controller orbiting `target`, starting at `position`.
    pub fn new(position: Point3<f32>, target: Point3<f32>, damping: f32, zoom_speed: f32) -> Self {
        let offset = position - target;
        let distance = offset.magnitude().max(Self::MIN_DISTANCE);
        let elevation = (offset.y / distance).asin();
        let azimuth = offset.z.atan2(offset.x);
        Self {
            target,
            azimuth,
            elevation,
            distance,
            goal_azimuth: azimuth,
            goal_elevation: elevation,
            goal_distance: distance,
            damping,
            zoom_speed,
            rotate_speed: 0.005,
            dragging: false,
        }
    }

    /// Track drag state and wheel zoom from window events.
    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = *state == ElementState::Pressed;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                self.zoom_by(scroll);
            }
            _ => {}
        }
    }

    /// Feed raw mouse motion. Only moves the goals while dragging.
    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        if !self.dragging {
            return;
        }
        self.rotate_by(dx as f32, dy as f32);
    }

    /// Move the distance goal by a wheel step (positive zooms in).
    pub fn zoom_by(&mut self, scroll: f32) {
        let factor = 1.0 - scroll * self.zoom_speed * 0.1;
        self.goal_distance =
            (self.goal_distance * factor).clamp(Self::MIN_DISTANCE, Self::MAX_DISTANCE);
    }

    /// Move the azimuth/elevation goals by a mouse-motion step.
    pub fn rotate_by(&mut self, dx: f32, dy: f32) {
        self.goal_azimuth += dx * self.rotate_speed;
        self.goal_elevation = (self.goal_elevation + dy * self.rotate_speed)
            .clamp(-Self::MAX_ELEVATION, Self::MAX_ELEVATION);
    }

    /// Ease the current orbit toward the goals and place the camera.
    ///
    /// The damping factor is applied once per frame (frame-rate-coupled,
    /// like the controls this mimics); `dt` is accepted for parity with
    /// the rest of the per-frame API.
    pub fn update(&mut self, camera: &mut Camera, _dt: Duration) {
        self.azimuth += (self.goal_azimuth - self.azimuth) * self.damping;
        self.elevation += (self.goal_elevation - self.elevation) * self.damping;
        self.distance += (self.goal_distance - self.distance) * self.damping;

        let (sin_e, cos_e) = self.elevation.sin_cos();
        let (sin_a, cos_a) = self.azimuth.sin_cos();
        camera.position = self.target
            + Vector3::new(
                self.distance * cos_e * cos_a,
                self.distance * sin_e,
                self.distance * cos_e * sin_a,
            );
        camera.target = self.target;
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn goal_distance(&self) -> f32 {
        self.goal_distance
    }
}

/// Camera state bundled with its GPU resources.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}
