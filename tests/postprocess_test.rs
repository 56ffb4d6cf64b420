use std::sync::Arc;

use deskview::data_structures::material::Material;
use deskview::data_structures::scene_graph::{ContainerNode, MeshNode, SceneNode};
use deskview::postprocess::{Rule, apply};

fn lit(name: &str) -> Arc<Material> {
    Arc::new(Material::solid(name, [1.0, 1.0, 1.0, 1.0]))
}

/// A typical loaded model shape: a container with a few named mesh leaves.
fn subtree(default_material: &Arc<Material>) -> Box<dyn SceneNode> {
    let mut root = ContainerNode::new("model", Vec::new());
    for name in ["Wall_02", "Handle_Left", "Desk_Top", "flore_plate"] {
        root.add_child(Box::new(MeshNode::new(name, default_material.clone())));
    }
    Box::new(root)
}

fn child<'a>(root: &'a dyn SceneNode, idx: usize) -> &'a dyn SceneNode {
    root.children()[idx].as_ref()
}

#[test]
fn hide_rule_matches_substring_case_insensitively() {
    let default = lit("default");
    let mut root = subtree(&default);

    apply(root.as_mut(), &[Rule::hide("wall")]);

    assert!(!child(root.as_ref(), 0).is_visible(), "Wall_02 must be hidden");
    assert!(child(root.as_ref(), 1).is_visible());
    assert!(child(root.as_ref(), 2).is_visible());
}

#[test]
fn substitute_rule_matches_substring_case_insensitively() {
    let default = lit("default");
    let handle = lit("handle");
    let mut root = subtree(&default);

    apply(root.as_mut(), &[Rule::substitute("hand", handle.clone())]);

    let substituted = child(root.as_ref(), 1).material().unwrap();
    assert!(Arc::ptr_eq(substituted, &handle));
    let untouched = child(root.as_ref(), 2).material().unwrap();
    assert!(Arc::ptr_eq(untouched, &default));
}

#[test]
fn empty_pattern_matches_every_mesh() {
    let default = lit("default");
    let wood = lit("wood");
    let mut root = subtree(&default);

    apply(root.as_mut(), &[Rule::substitute("", wood.clone())]);

    for idx in 0..4 {
        assert!(Arc::ptr_eq(child(root.as_ref(), idx).material().unwrap(), &wood));
    }
}

#[test]
fn later_material_rule_wins() {
    let default = lit("default");
    let wood = lit("wood");
    let handle = lit("handle");
    let mut root = subtree(&default);

    // the catch-all assigns wood, the later specific rule overrides it
    apply(
        root.as_mut(),
        &[
            Rule::substitute("", wood.clone()),
            Rule::substitute("hand", handle.clone()),
        ],
    );

    assert!(Arc::ptr_eq(child(root.as_ref(), 1).material().unwrap(), &handle));
    assert!(Arc::ptr_eq(child(root.as_ref(), 0).material().unwrap(), &wood));
}

#[test]
fn hide_rules_accumulate_across_the_list() {
    let default = lit("default");
    let wood = lit("wood");
    let mut root = subtree(&default);

    // a later non-hide rule never re-shows a hidden node
    apply(
        root.as_mut(),
        &[
            Rule::hide("wall"),
            Rule::substitute("", wood.clone()),
            Rule::hide("flore"),
        ],
    );

    assert!(!child(root.as_ref(), 0).is_visible());
    assert!(!child(root.as_ref(), 3).is_visible());
    // hidden nodes still get the material assignment
    assert!(Arc::ptr_eq(child(root.as_ref(), 0).material().unwrap(), &wood));
    // and stay in the hierarchy
    assert_eq!(root.children().len(), 4);
}

#[test]
fn applying_rules_twice_equals_applying_once() {
    let default = lit("default");
    let wood = lit("wood");
    let handle = lit("handle");
    let rules = [
        Rule::substitute("", wood.clone()),
        Rule::substitute("hand", handle.clone()),
        Rule::hide("wall"),
        Rule::hide("flore"),
    ];

    let mut once = subtree(&default);
    apply(once.as_mut(), &rules);

    let mut twice = subtree(&default);
    apply(twice.as_mut(), &rules);
    apply(twice.as_mut(), &rules);

    for idx in 0..4 {
        let a = child(once.as_ref(), idx);
        let b = child(twice.as_ref(), idx);
        assert_eq!(a.is_visible(), b.is_visible());
        assert!(Arc::ptr_eq(a.material().unwrap(), b.material().unwrap()));
    }
}

#[test]
fn rules_only_touch_mesh_leaves() {
    let default = lit("default");
    let wood = lit("wood");
    // a container whose own name matches must stay untouched
    let mut root: Box<dyn SceneNode> = Box::new(ContainerNode::new("wall_group", Vec::new()));
    root.add_child(Box::new(MeshNode::new("desk", default.clone())));

    apply(root.as_mut(), &[Rule::hide("wall"), Rule::substitute("", wood.clone())]);

    assert!(root.is_visible());
    assert!(root.material().is_none());
    assert!(Arc::ptr_eq(child(root.as_ref(), 0).material().unwrap(), &wood));
}
