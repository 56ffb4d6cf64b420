//! The desk scene: assembly, attach logic and per-frame advancement.
//!
//! A [`Scene`] owns the node hierarchy, an anchor slot that loaded models
//! attach beneath, and the animation drivers bound to attached subtrees.
//! [`assemble_desk_scene`] builds the hardcoded content — ground plane,
//! axes helper, paper planes — and returns the [`ModelSpec`] list the view
//! loads asynchronously. Every transform constant in here is hand-tuned
//! to the shipped assets.

use std::f32::consts::{FRAC_PI_2, PI};
use std::sync::Arc;

use cgmath::{Euler, Quaternion, Rad, Vector3};

use crate::{
    animation::{AnimationDriver, BoundDriver},
    context::Context,
    data_structures::{
        instance::Instance,
        material::{self, Material, Shading},
        scene_graph::{ContainerNode, MeshNode, SceneNode},
        texture::{Texture, WrapMode},
    },
    postprocess::{self, Rule},
    render::DrawBatches,
    resources::{GltfLoader, SceneFragment, mesh},
};

const GROUND_SIZE: f32 = 10.0;
const GROUND_POSITION: [f32; 3] = [0.0, -2.1, 1.0];
// 0x727272 gray
const GROUND_COLOR: [f32; 4] = [0.447, 0.447, 0.447, 1.0];
// 0x8b4513 saddle brown
const CHAIR_COLOR: [f32; 4] = [0.545, 0.271, 0.076, 1.0];
const MONITOR_BODY_COLOR: [f32; 4] = [0.08, 0.08, 0.09, 1.0];
const MONITOR_GLOW_COLOR: [f32; 4] = [0.7, 0.85, 1.0, 1.0];
const AXES_LENGTH: f32 = 5.0;
const PAPER_SIZE: [f32; 2] = [0.6, 0.8];

const WOOD_TEXTURE: &str = "wood_color.jpg";
const HANDLE_TEXTURE: &str = "handle_texture.jpg";
const PAPER_TEXTURE: &str = "paper.jpg";

/// One model to load: file name, placement and the rules run over its
/// subtree after decode.
pub struct ModelSpec {
    pub file: String,
    pub transform: Instance,
    pub rules: Vec<Rule>,
}

/// The renderable hierarchy plus the animation state bound to it.
pub struct Scene {
    root: Box<dyn SceneNode>,
    anchor: Option<usize>,
    drivers: Vec<BoundDriver>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            root: Box::new(ContainerNode::new("scene", Vec::new())),
            anchor: None,
            drivers: Vec::new(),
        }
    }

    pub fn root(&self) -> &dyn SceneNode {
        self.root.as_ref()
    }

    pub fn root_mut(&mut self) -> &mut dyn SceneNode {
        self.root.as_mut()
    }

    /// Add a top-level node, returning its child index.
    pub fn add_node(&mut self, node: Box<dyn SceneNode>) -> usize {
        self.root.add_child(node);
        self.root.children().len() - 1
    }

    /// Select the top-level node loaded models attach beneath. Without an
    /// anchor, fragments attach to the root itself.
    pub fn set_anchor(&mut self, index: usize) {
        self.anchor = Some(index);
    }

    fn anchor_node_mut(&mut self) -> &mut dyn SceneNode {
        match self.anchor {
            Some(index) => self.root.children_mut()[index].as_mut(),
            None => self.root.as_mut(),
        }
    }

    /// Post-process, place and insert a loaded fragment.
    ///
    /// Rules are applied before the subtree becomes visible, the fragment
    /// root gets `transform`, and any embedded clips are bound to a driver
    /// that immediately starts looping the first clip. The attach order of
    /// concurrent loads does not matter; each fragment only carries its own
    /// transform.
    pub fn attach_fragment(
        &mut self,
        mut fragment: SceneFragment,
        transform: Instance,
        rules: &[Rule],
    ) {
        postprocess::apply(fragment.root.as_mut(), rules);
        fragment.root.set_local_transform(transform);

        let driver = AnimationDriver::bind(fragment.root.as_ref());

        let anchor = self.anchor_node_mut();
        let slot = anchor.children().len();
        anchor.add_child(fragment.root);

        if let Some(mut driver) = driver {
            driver.play(0);
            self.drivers.push(BoundDriver { slot, driver });
        }

        self.update_world_transforms();
    }

    /// Advance every bound animation driver by `dt` seconds and re-pose
    /// the animated subtrees.
    pub fn advance(&mut self, dt: f32) {
        if self.drivers.is_empty() {
            return;
        }
        let anchor_index = self.anchor;
        for i in 0..self.drivers.len() {
            self.drivers[i].driver.advance(dt);
            let slot = self.drivers[i].slot;
            let driver = &self.drivers[i].driver;
            let anchor: &mut dyn SceneNode = match anchor_index {
                Some(index) => self.root.children_mut()[index].as_mut(),
                None => self.root.as_mut(),
            };
            driver.apply(anchor.children_mut()[slot].as_mut());
        }
        self.update_world_transforms();
    }

    pub fn update_world_transforms(&mut self) {
        self.root.update_world_transforms(&Instance::default());
    }

    pub fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        self.root.write_to_buffers(queue);
    }

    pub fn collect_draws<'a>(&'a self, batches: &mut DrawBatches<'a>) {
        self.root.collect_draws(batches);
    }

    pub fn driver_count(&self) -> usize {
        self.drivers.len()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

fn euler(x: f32, y: f32, z: f32) -> Quaternion<f32> {
    Euler::new(Rad(x), Rad(y), Rad(z)).into()
}

async fn try_texture(
    loader: &GltfLoader,
    file: &str,
    wrap: WrapMode,
    ctx: &Context,
) -> Option<Texture> {
    match crate::resources::texture::load_texture(
        loader.asset_root(),
        file,
        wrap,
        &ctx.device,
        &ctx.queue,
        None,
    )
    .await
    {
        Ok(texture) => Some(texture),
        Err(e) => {
            log::error!("failed to load texture {}: {}", file, e);
            None
        }
    }
}

/// Build the static desk-scene content and the model load list.
///
/// Everything here is synchronous scene population apart from the small
/// decoration textures; model files load later, while the scene is already
/// rendering.
pub async fn assemble_desk_scene(ctx: &Context, loader: &GltfLoader) -> (Scene, Vec<ModelSpec>) {
    let device = &ctx.device;
    let layout = material::material_layout(device);
    let placeholder = Texture::create_placeholder(device, &ctx.queue);

    // The decoration textures are independent fetches, run them together
    let (paper_texture, wood_texture, handle_texture) = futures::future::join3(
        try_texture(loader, PAPER_TEXTURE, WrapMode::Clamp, ctx),
        try_texture(loader, WOOD_TEXTURE, WrapMode::Repeat, ctx),
        try_texture(loader, HANDLE_TEXTURE, WrapMode::Repeat, ctx),
    )
    .await;

    let mut scene = Scene::new();

    // Ground plane at the origin; loaded models attach beneath it
    let ground_material = Arc::new(Material::solid("ground", GROUND_COLOR));
    ground_material.upload(device, &layout, None, &placeholder);
    let mut ground = MeshNode::with_geometry(
        device,
        "ground",
        ground_material,
        vec![mesh::plane(device, "ground", GROUND_SIZE, GROUND_SIZE)],
        Vec::new(),
    );
    ground.set_local_transform(Instance {
        position: GROUND_POSITION.into(),
        rotation: euler(-FRAC_PI_2, 0.0, 0.0),
        scale: Vector3::new(1.0, 1.0, 1.0),
    });
    let ground_index = scene.add_node(Box::new(ground));
    scene.set_anchor(ground_index);

    // Axes helper to visualise the coordinate system
    let mut axes = ContainerNode::new("axes", Vec::new());
    let axis_specs: [(&str, [f32; 3], [f32; 4]); 3] = [
        ("axis_x", [AXES_LENGTH, 0.0, 0.0], [1.0, 0.2, 0.2, 1.0]),
        ("axis_y", [0.0, AXES_LENGTH, 0.0], [0.2, 1.0, 0.2, 1.0]),
        ("axis_z", [0.0, 0.0, AXES_LENGTH], [0.2, 0.2, 1.0, 1.0]),
    ];
    for (name, tip, color) in axis_specs {
        let axis_material = Arc::new(Material::new(name, Shading::Unlit, color, [1.0, 1.0]));
        axis_material.upload(device, &layout, None, &placeholder);
        axes.add_child(Box::new(MeshNode::with_geometry(
            device,
            name,
            axis_material,
            vec![mesh::axis_line(device, name, tip)],
            Vec::new(),
        )));
    }
    scene.add_node(Box::new(axes));

    // Two paper sheets on the desk surface, flat in the ground's frame
    let paper_material = Arc::new(Material::new(
        "paper",
        Shading::Unlit,
        [1.0, 1.0, 1.0, 1.0],
        [1.0, 1.0],
    ));
    paper_material.upload(device, &layout, paper_texture, &placeholder);
    let paper_spots: [([f32; 3], f32); 2] = [([0.4, 1.8, 1.16], 0.35), ([1.7, 2.2, 1.16], -0.2)];
    for (i, (position, tilt)) in paper_spots.into_iter().enumerate() {
        let name = format!("paper_{}", i);
        let mut sheet = MeshNode::with_geometry(
            device,
            &name,
            paper_material.clone(),
            vec![mesh::plane(device, &name, PAPER_SIZE[0], PAPER_SIZE[1])],
            Vec::new(),
        );
        sheet.set_local_transform(Instance {
            position: position.into(),
            rotation: euler(0.0, 0.0, tilt),
            scale: Vector3::new(1.0, 1.0, 1.0),
        });
        // in the ground's frame, so the sheets lie flat on the desk top
        scene.anchor_node_mut().add_child(Box::new(sheet));
    }

    scene.update_world_transforms();

    // Rule materials for the loaded models
    let wood = Arc::new(Material::new(
        "wood",
        Shading::Lit,
        [1.0, 1.0, 1.0, 1.0],
        [4.0, 4.0],
    ));
    wood.upload(device, &layout, wood_texture, &placeholder);

    let handle = Arc::new(Material::new(
        "handle",
        Shading::Lit,
        [1.0, 1.0, 1.0, 1.0],
        [1.0, 1.0],
    ));
    handle.upload(device, &layout, handle_texture, &placeholder);

    let brown = Arc::new(Material::solid("chair brown", CHAIR_COLOR));
    brown.upload(device, &layout, None, &placeholder);

    let monitor_body = Arc::new(Material::solid("monitor body", MONITOR_BODY_COLOR));
    monitor_body.upload(device, &layout, None, &placeholder);

    let screen_glow = Arc::new(Material::new(
        "screen glow",
        Shading::Unlit,
        MONITOR_GLOW_COLOR,
        [1.0, 1.0],
    ));
    screen_glow.upload(device, &layout, None, &placeholder);

    let specs = vec![
        ModelSpec {
            file: "table.glb".to_string(),
            transform: Instance {
                position: Vector3::new(1.0, 2.5, 0.0),
                rotation: euler(FRAC_PI_2, 0.0, 0.0),
                scale: Vector3::new(3.0, 3.0, 3.0),
            },
            rules: vec![
                Rule::substitute("", wood),
                Rule::substitute("hand", handle),
                Rule::hide("wall"),
                Rule::hide("flore"),
            ],
        },
        ModelSpec {
            file: "chair.glb".to_string(),
            transform: Instance {
                position: Vector3::new(1.0, -1.5, 0.0),
                rotation: euler(FRAC_PI_2, 4.0, 0.0),
                scale: Vector3::new(2.5, 2.5, 2.5),
            },
            rules: vec![Rule::substitute("", brown)],
        },
        ModelSpec {
            file: "monitor.glb".to_string(),
            transform: Instance {
                position: Vector3::new(0.9, 2.9, 1.16),
                rotation: euler(FRAC_PI_2, PI, 0.0),
                scale: Vector3::new(1.5, 1.5, 1.5),
            },
            rules: vec![
                Rule::substitute("", monitor_body),
                Rule::substitute("screen", screen_glow),
            ],
        },
        ModelSpec {
            // decorative props keep their own glTF materials
            file: "props.glb".to_string(),
            transform: Instance {
                position: Vector3::new(2.2, 1.9, 1.16),
                rotation: euler(FRAC_PI_2, 0.0, 0.0),
                scale: Vector3::new(1.0, 1.0, 1.0),
            },
            rules: Vec::new(),
        },
    ];

    (scene, specs)
}
