use std::sync::Arc;

use cgmath::Vector3;

use deskview::animation::AnimationDriver;
use deskview::data_structures::instance::Instance;
use deskview::data_structures::material::Material;
use deskview::data_structures::scene_graph::{ContainerNode, MeshNode, ModelAnimation, SceneNode};

fn slide_animation() -> ModelAnimation {
    ModelAnimation {
        name: "slide".to_string(),
        timestamps: vec![0.0, 1.0, 2.0],
        translations: vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
        ],
        rotations: Vec::new(),
        scales: Vec::new(),
    }
}

fn animated_subtree() -> Box<dyn SceneNode> {
    // animations travel on the nodes, the driver only owns the clock
    let mut root = ContainerNode::new("model", Vec::new());
    let mut inner = ContainerNode::new("armature", vec![slide_animation()]);
    inner.add_child(Box::new(MeshNode::new(
        "slider",
        Arc::new(Material::solid("mat", [1.0, 1.0, 1.0, 1.0])),
    )));
    root.add_child(Box::new(inner));
    Box::new(root)
}

#[test]
fn bind_returns_none_without_clips() {
    let root: Box<dyn SceneNode> = Box::new(ContainerNode::new("empty", Vec::new()));
    assert!(AnimationDriver::bind(root.as_ref()).is_none());
}

#[test]
fn bind_collects_clips_from_the_subtree() {
    let root = animated_subtree();
    let driver = AnimationDriver::bind(root.as_ref()).expect("subtree carries a clip");
    assert_eq!(driver.clip_names(), vec!["slide"]);
}

#[test]
fn zero_delta_is_a_no_op() {
    let root = animated_subtree();
    let mut driver = AnimationDriver::bind(root.as_ref()).unwrap();
    driver.play(0);
    driver.advance(0.5);
    let time = driver.time();

    for _ in 0..10 {
        driver.advance(0.0);
    }
    assert_eq!(driver.time(), time);
}

#[test]
fn negative_delta_is_treated_as_zero() {
    let root = animated_subtree();
    let mut driver = AnimationDriver::bind(root.as_ref()).unwrap();
    driver.play(0);
    driver.advance(0.5);
    driver.advance(-1.0);
    assert_eq!(driver.time(), 0.5);
}

#[test]
fn time_advances_monotonically_until_wrap() {
    let root = animated_subtree();
    let mut driver = AnimationDriver::bind(root.as_ref()).unwrap();
    driver.play(0);

    let mut last = driver.time();
    for _ in 0..3 {
        driver.advance(0.5);
        assert!(driver.time() > last);
        last = driver.time();
    }

    // 1.5 + 0.7 passes the 2.0 duration and wraps
    driver.advance(0.7);
    assert!((driver.time() - 0.2).abs() < 1e-5);
}

#[test]
fn advance_without_play_keeps_the_clock_at_zero() {
    let root = animated_subtree();
    let mut driver = AnimationDriver::bind(root.as_ref()).unwrap();
    driver.advance(1.0);
    assert_eq!(driver.time(), 0.0);
    assert!(driver.active_clip().is_none());
}

#[test]
fn apply_poses_the_subtree_at_the_current_time() {
    let mut root = animated_subtree();
    let mut driver = AnimationDriver::bind(root.as_ref()).unwrap();
    driver.play(0);
    driver.advance(1.0);
    driver.apply(root.as_mut());
    root.update_world_transforms(&Instance::default());

    let armature = root.children()[0].as_ref();
    assert!((armature.local_transform().position.x - 1.0).abs() < 1e-5);
}

#[test]
fn play_restarts_from_the_beginning() {
    let root = animated_subtree();
    let mut driver = AnimationDriver::bind(root.as_ref()).unwrap();
    driver.play(0);
    driver.advance(1.3);
    driver.play(0);
    assert_eq!(driver.time(), 0.0);
    assert_eq!(driver.active_clip(), Some("slide"));
}
