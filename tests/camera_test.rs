use instant::Duration;

use cgmath::{InnerSpace, Point3};

use deskview::camera::{Camera, OrbitController, Projection};

fn controller() -> OrbitController {
    OrbitController::new(
        Point3::new(5.0, 5.0, 5.0),
        Point3::new(0.0, 0.0, 0.0),
        0.05,
        2.0,
    )
}

#[test]
fn resize_recomputes_aspect() {
    let mut projection = Projection::new(800, 600, cgmath::Deg(75.0), 0.1, 1000.0);
    assert!((projection.aspect() - 800.0 / 600.0).abs() < 1e-6);

    projection.resize(1920, 1080);
    assert!((projection.aspect() - 1920.0 / 1080.0).abs() < 1e-6);
}

#[test]
fn repeated_resizes_are_idempotent() {
    let mut projection = Projection::new(800, 600, cgmath::Deg(75.0), 0.1, 1000.0);
    projection.resize(1024, 768);
    let first = projection.aspect();
    projection.resize(1024, 768);
    projection.resize(1024, 768);
    assert_eq!(projection.aspect(), first);
}

#[test]
fn degenerate_resize_never_divides_by_zero() {
    let mut projection = Projection::new(800, 600, cgmath::Deg(75.0), 0.1, 1000.0);
    projection.resize(0, 0);
    assert!(projection.aspect().is_finite());
    projection.resize(640, 0);
    assert!((projection.aspect() - 640.0).abs() < 1e-6);
}

#[test]
fn controller_starts_at_the_configured_position() {
    let controller = controller();
    assert!((controller.distance() - 75.0f32.sqrt()).abs() < 1e-4);
}

#[test]
fn damping_eases_toward_the_zoom_goal() {
    let mut controller = controller();
    let mut camera = Camera::new(Point3::new(5.0, 5.0, 5.0), Point3::new(0.0, 0.0, 0.0));

    controller.zoom_by(1.0);
    let goal = controller.goal_distance();
    assert!(goal < controller.distance(), "zooming in shrinks the goal");

    // one update moves only a damped fraction of the way
    controller.update(&mut camera, Duration::from_millis(16));
    let after_one = controller.distance();
    assert!(after_one > goal);

    // many updates converge onto the goal
    for _ in 0..500 {
        controller.update(&mut camera, Duration::from_millis(16));
    }
    assert!((controller.distance() - goal).abs() < 1e-3);
}

#[test]
fn update_keeps_the_camera_on_the_orbit_sphere() {
    let mut controller = controller();
    let mut camera = Camera::new(Point3::new(5.0, 5.0, 5.0), Point3::new(0.0, 0.0, 0.0));

    controller.rotate_by(40.0, -25.0);
    for _ in 0..300 {
        controller.update(&mut camera, Duration::from_millis(16));
    }

    let radius = (camera.position - camera.target).magnitude();
    assert!((radius - controller.distance()).abs() < 1e-3);
    assert_eq!(camera.target, Point3::new(0.0, 0.0, 0.0));
}

#[test]
fn zoom_goal_is_clamped() {
    let mut controller = controller();
    for _ in 0..200 {
        controller.zoom_by(5.0);
    }
    assert!(controller.goal_distance() >= OrbitController::MIN_DISTANCE);

    for _ in 0..200 {
        controller.zoom_by(-5.0);
    }
    assert!(controller.goal_distance() <= OrbitController::MAX_DISTANCE);
}

#[test]
fn skipping_the_update_leaves_the_camera_static() {
    let mut controller = controller();
    let camera = Camera::new(Point3::new(5.0, 5.0, 5.0), Point3::new(0.0, 0.0, 0.0));
    let before = camera.position;

    // input alone moves only the goals
    controller.rotate_by(100.0, 0.0);
    controller.zoom_by(3.0);

    assert_eq!(camera.position, before);
}
