use std::{
    collections::HashMap,
    io::{BufReader, Cursor},
    sync::Arc,
};

use crate::{
    data_structures::{
        material::{self, Material, Shading},
        scene_graph::{AnimationClip, ContainerNode, SceneNode, to_scene_node},
        texture::{Texture, WrapMode},
    },
    resources::{animation::Keyframes, texture::load_binary},
};

/**
 * This module contains all logic for loading models/textures/etc. from external files.
 */
pub mod animation;
pub mod mesh;
pub mod texture;

/// A decoded model: the subtree root plus the names of any embedded
/// animation clips (the keyframe tracks themselves live on the nodes).
pub struct SceneFragment {
    pub root: Box<dyn SceneNode>,
    pub clips: Vec<String>,
}

/// Asynchronous model loader.
///
/// The loader is configured once with the asset-root location all fetches
/// resolve against (a directory on native, a URL path below the page origin
/// on WASM) and must be in place before the first load. Decoding of the
/// model payload itself is delegated to the `gltf` crate. Every
/// [`load_scene`](Self::load_scene) call is independent: concurrent loads
/// are allowed and complete in no particular order.
#[derive(Clone, Debug)]
pub struct GltfLoader {
    asset_root: String,
}

impl GltfLoader {
    pub fn new(asset_root: impl Into<String>) -> Self {
        Self {
            asset_root: asset_root.into(),
        }
    }

    pub fn asset_root(&self) -> &str {
        &self.asset_root
    }

    /// Fetch and decode one glTF/GLB file into a scene fragment.
    ///
    /// There is no retry and no timeout; the caller decides what a failure
    /// means for the scene.
    pub async fn load_scene(
        &self,
        file_name: &str,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> anyhow::Result<SceneFragment> {
        let gltf_bytes = load_binary(&self.asset_root, file_name).await?;
        let gltf_cursor = Cursor::new(gltf_bytes);
        let gltf_reader = BufReader::new(gltf_cursor);
        let gltf = gltf::Gltf::from_reader(gltf_reader)?;

        // Load buffers
        let mut buffer_data = Vec::new();
        for buffer in gltf.buffers() {
            match buffer.source() {
                gltf::buffer::Source::Bin => {
                    if let Some(blob) = gltf.blob.as_deref() {
                        buffer_data.push(blob.into());
                    };
                }
                gltf::buffer::Source::Uri(uri) => {
                    let bin = load_binary(&self.asset_root, uri).await?;
                    buffer_data.push(bin);
                }
            }
        }

        // Load animations: one AnimationClip per channel, grouped by the
        // glTF node the channel targets
        let mut animations: HashMap<usize, Vec<AnimationClip>> = HashMap::new();
        let mut clip_names: Vec<String> = Vec::new();
        for animation in gltf.animations() {
            let name = animation.name().unwrap_or("Default").to_string();
            if !clip_names.contains(&name) {
                clip_names.push(name.clone());
            }
            for channel in animation.channels() {
                let reader = channel.reader(|buffer| Some(&buffer_data[buffer.index()]));
                let timestamps = match reader.read_inputs() {
                    Some(gltf::accessor::Iter::Standard(times)) => times.collect::<Vec<f32>>(),
                    Some(gltf::accessor::Iter::Sparse(_)) => {
                        log::warn!("sparse animation input in {} is not supported", file_name);
                        Vec::new()
                    }
                    None => {
                        log::warn!("no animation input found in channel {}", channel.index());
                        Vec::new()
                    }
                };
                let keyframes = match reader.read_outputs() {
                    Some(gltf::animation::util::ReadOutputs::Translations(translations)) => {
                        Keyframes::Translation(translations.map(|tr| tr.into()).collect())
                    }
                    Some(gltf::animation::util::ReadOutputs::Rotations(rotations)) => {
                        Keyframes::Rotation(rotations.into_f32().map(|quat| quat.into()).collect())
                    }
                    Some(gltf::animation::util::ReadOutputs::Scales(scales)) => {
                        Keyframes::Scale(scales.map(|sc| sc.into()).collect())
                    }
                    Some(gltf::animation::util::ReadOutputs::MorphTargetWeights(_)) | None => {
                        Keyframes::Other
                    }
                };
                let clip = AnimationClip {
                    name: name.clone(),
                    keyframes,
                    timestamps,
                };
                animations
                    .entry(channel.target().node().index())
                    .and_modify(|clips| clips.push(clip.clone()))
                    .or_insert(vec![clip]);
            }
        }

        // Load materials. Missing or failing textures degrade to the solid
        // base colour over the placeholder, never to a load error.
        let placeholder = Texture::create_placeholder(device, queue);
        let layout = material::material_layout(device);
        let mut materials: Vec<Arc<Material>> = Vec::new();
        for gltf_material in gltf.materials() {
            let pbr = gltf_material.pbr_metallic_roughness();
            let name = gltf_material.name().unwrap_or("material");
            let diffuse_texture = match pbr.base_color_texture() {
                Some(info) => {
                    let wrap = wrap_mode(info.texture().sampler().wrap_s());
                    match self
                        .load_material_texture(&info.texture(), &buffer_data, wrap, device, queue)
                        .await
                    {
                        Ok(texture) => Some(texture),
                        Err(e) => {
                            log::error!("failed to load texture of material {}: {}", name, e);
                            None
                        }
                    }
                }
                None => None,
            };
            let material = Material::new(name, Shading::Lit, pbr.base_color_factor(), [1.0, 1.0]);
            material.upload(device, &layout, diffuse_texture, &placeholder);
            materials.push(Arc::new(material));
        }
        let fallback = Arc::new(Material::solid("fallback", [0.8, 0.8, 0.8, 1.0]));
        fallback.upload(device, &layout, None, &placeholder);

        let mut models = Vec::new();
        for scene in gltf.scenes() {
            for node in scene.nodes() {
                let model =
                    to_scene_node(node, &buffer_data, device, &materials, &fallback, &animations);
                models.push(model);
            }
        }

        let root = if models.len() == 1 {
            models.into_iter().next().unwrap()
        } else {
            let mut root = ContainerNode::new(file_name, Vec::new());
            for model in models {
                root.add_child(model);
            }
            Box::new(root)
        };

        Ok(SceneFragment {
            root,
            clips: clip_names,
        })
    }

    async fn load_material_texture(
        &self,
        texture: &gltf::Texture<'_>,
        buffer_data: &[Vec<u8>],
        wrap: WrapMode,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> anyhow::Result<Texture> {
        match texture.source().source() {
            gltf::image::Source::View { view, mime_type } => {
                let start = view.offset();
                let end = start + view.length();
                let bytes = &buffer_data[view.buffer().index()][start..end];
                Texture::from_bytes(
                    device,
                    queue,
                    bytes,
                    texture.source().name().unwrap_or("embedded texture"),
                    mime_type.split('/').next_back(),
                    wrap,
                )
            }
            gltf::image::Source::Uri { uri, mime_type } => {
                let data = load_binary(&self.asset_root, uri).await?;
                Texture::from_bytes(
                    device,
                    queue,
                    &data,
                    uri,
                    mime_type.and_then(|mt| mt.split('/').next_back()),
                    wrap,
                )
            }
        }
    }
}

fn wrap_mode(mode: gltf::texture::WrappingMode) -> WrapMode {
    match mode {
        gltf::texture::WrappingMode::ClampToEdge => WrapMode::Clamp,
        gltf::texture::WrappingMode::MirroredRepeat | gltf::texture::WrappingMode::Repeat => {
            WrapMode::Repeat
        }
    }
}
