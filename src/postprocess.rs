//! Name-pattern material and visibility rules for loaded models.
//!
//! Model files arrive with whatever sub-object names and materials the
//! artist exported. After a model is decoded, an ordered rule list is
//! applied once to every mesh leaf of the subtree: each rule pairs a
//! case-insensitive substring pattern with an effect. This is a flat
//! pattern-matching pass, not a rule engine — there is no precedence
//! beyond list order and no wildcard syntax beyond containment.
//!
//! Composition policy:
//! - material substitution: the last matching rule wins
//! - visibility: hide effects accumulate — any matching hide rule hides
//!   the node (and, through traversal, its descendants), show is never
//!   re-granted by a later rule
//!
//! Applying the same rule list twice yields the same assignment as
//! applying it once.

use std::sync::Arc;

use crate::data_structures::{material::Material, scene_graph::SceneNode};

/// What a matching rule does to a mesh leaf.
#[derive(Clone)]
pub enum Effect {
    /// Assign this material, overriding the loader-supplied default.
    SubstituteMaterial(Arc<Material>),
    /// Hide the node from rendering (it stays in the hierarchy).
    SetInvisible,
}

/// One `{pattern, effect}` pair. The pattern matches when the mesh name
/// contains it, ignoring case; the empty pattern matches every mesh.
#[derive(Clone)]
pub struct Rule {
    pattern: String,
    effect: Effect,
}

impl Rule {
    pub fn new(pattern: &str, effect: Effect) -> Self {
        Self {
            pattern: pattern.to_lowercase(),
            effect,
        }
    }

    pub fn substitute(pattern: &str, material: Arc<Material>) -> Self {
        Self::new(pattern, Effect::SubstituteMaterial(material))
    }

    pub fn hide(pattern: &str) -> Self {
        Self::new(pattern, Effect::SetInvisible)
    }

    fn matches(&self, name: &str) -> bool {
        name.to_lowercase().contains(&self.pattern)
    }
}

/// Apply `rules` in order to every mesh leaf below (and including) `node`.
pub fn apply(node: &mut dyn SceneNode, rules: &[Rule]) {
    if node.is_mesh() {
        for rule in rules {
            if !rule.matches(node.name()) {
                continue;
            }
            match &rule.effect {
                Effect::SubstituteMaterial(material) => node.set_material(material.clone()),
                Effect::SetInvisible => node.set_visible(false),
            }
        }
    }
    for child in node.children_mut() {
        apply(child.as_mut(), rules);
    }
}
