use std::sync::Arc;

use cgmath::{Quaternion, Rad, Rotation3, Vector3};

use deskview::data_structures::instance::Instance;
use deskview::data_structures::material::Material;
use deskview::data_structures::scene_graph::{
    AnimationClip, ContainerNode, MeshNode, ModelAnimation, SceneNode, merge,
};
use deskview::resources::SceneFragment;
use deskview::resources::animation::Keyframes;
use deskview::scene::Scene;

fn mesh(name: &str) -> Box<dyn SceneNode> {
    Box::new(MeshNode::new(
        name,
        Arc::new(Material::solid(name, [1.0, 1.0, 1.0, 1.0])),
    ))
}

fn translated(position: [f32; 3]) -> Instance {
    Instance {
        position: position.into(),
        ..Default::default()
    }
}

#[test]
fn world_transforms_compose_down_the_tree() {
    let mut root = ContainerNode::new("root", Vec::new());
    root.set_local_transform(translated([1.0, 0.0, 0.0]));

    let mut child = mesh("child");
    child.set_local_transform(translated([0.0, 2.0, 0.0]));
    root.add_child(child);

    root.update_world_transforms(&Instance::default());

    let world = root.children()[0].world_transform();
    assert_eq!(world.position, Vector3::new(1.0, 2.0, 0.0));
}

#[test]
fn parent_scale_applies_to_child_position() {
    let mut root = ContainerNode::new("root", Vec::new());
    root.set_local_transform(Instance {
        scale: Vector3::new(2.0, 2.0, 2.0),
        ..Default::default()
    });

    let mut child = mesh("child");
    child.set_local_transform(translated([1.0, 0.0, 0.0]));
    root.add_child(child);

    root.update_world_transforms(&Instance::default());

    let world = root.children()[0].world_transform();
    assert_eq!(world.position, Vector3::new(2.0, 0.0, 0.0));
    assert_eq!(world.scale, Vector3::new(2.0, 2.0, 2.0));
}

#[test]
fn hiding_a_node_keeps_its_children_in_the_hierarchy() {
    let mut root = ContainerNode::new("root", Vec::new());
    let mut group = ContainerNode::new("group", Vec::new());
    group.add_child(mesh("inner"));
    root.add_child(Box::new(group));

    root.children_mut()[0].set_visible(false);

    assert!(!root.children()[0].is_visible());
    assert_eq!(root.children()[0].children().len(), 1);
}

#[test]
fn fragments_attach_regardless_of_completion_order() {
    // model B resolves before model A; both must end up in the scene with
    // their own transforms
    let mut scene = Scene::new();

    let fragment_b = SceneFragment {
        root: mesh("model_b"),
        clips: Vec::new(),
    };
    scene.attach_fragment(fragment_b, translated([5.0, 0.0, 0.0]), &[]);

    let fragment_a = SceneFragment {
        root: mesh("model_a"),
        clips: Vec::new(),
    };
    scene.attach_fragment(fragment_a, translated([-5.0, 0.0, 0.0]), &[]);

    let children = scene.root().children();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].name(), "model_b");
    assert_eq!(children[1].name(), "model_a");
    assert_eq!(children[0].world_transform().position, Vector3::new(5.0, 0.0, 0.0));
    assert_eq!(children[1].world_transform().position, Vector3::new(-5.0, 0.0, 0.0));
}

#[test]
fn late_fragment_after_teardown_leaves_nothing_behind() {
    // a load completion that outlives the view is dropped by the event
    // handler instead of being attached; the fragment itself must be safe
    // to discard after the scene is gone
    let fragment = SceneFragment {
        root: mesh("late_model"),
        clips: Vec::new(),
    };
    let scene = Scene::new();
    drop(scene);
    drop(fragment);
}

#[test]
fn merge_folds_channels_of_the_same_clip() {
    let clips = vec![
        AnimationClip {
            name: "spin".to_string(),
            keyframes: Keyframes::Translation(vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(2.0, 0.0, 0.0),
            ]),
            timestamps: vec![0.0, 1.0],
        },
        AnimationClip {
            name: "spin".to_string(),
            keyframes: Keyframes::Rotation(vec![
                Quaternion::from_angle_y(Rad(0.0)),
                Quaternion::from_angle_y(Rad(1.0)),
            ]),
            timestamps: vec![0.0, 1.0],
        },
    ];

    let merged = merge(clips);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].name, "spin");
    assert_eq!(merged[0].translations.len(), 2);
    assert_eq!(merged[0].rotations.len(), 2);
    assert_eq!(merged[0].duration(), 1.0);
}

#[test]
fn sample_interpolates_between_keyframes() {
    let animation = ModelAnimation {
        name: "slide".to_string(),
        timestamps: vec![0.0, 1.0],
        translations: vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(2.0, 0.0, 0.0)],
        rotations: Vec::new(),
        scales: Vec::new(),
    };
    let base = Instance::default();

    let mid = animation.sample(&base, 0.5);
    assert!((mid.position.x - 1.0).abs() < 1e-5);
    // components without keyframes keep the base value
    assert_eq!(mid.rotation, base.rotation);
    assert_eq!(mid.scale, base.scale);
}

#[test]
fn sample_clamps_outside_the_clip() {
    let animation = ModelAnimation {
        name: "slide".to_string(),
        timestamps: vec![0.0, 1.0],
        translations: vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(2.0, 0.0, 0.0)],
        rotations: Vec::new(),
        scales: Vec::new(),
    };
    let base = Instance::default();

    assert_eq!(animation.sample(&base, -1.0).position.x, 0.0);
    assert_eq!(animation.sample(&base, 9.0).position.x, 2.0);
}
