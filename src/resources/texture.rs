use crate::data_structures::texture::{Texture, WrapMode};

#[cfg(target_arch = "wasm32")]
fn format_url(asset_root: &str, file_name: &str) -> reqwest::Url {
    let window = web_sys::window().unwrap();
    let location = window.location();
    let origin = location.origin().unwrap();
    let base = reqwest::Url::parse(&format!("{}/{}/", origin, asset_root.trim_matches('/'))).unwrap();
    base.join(file_name).unwrap()
}

pub async fn load_binary(asset_root: &str, file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(asset_root, file_name);
        reqwest::get(url).await?.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new(asset_root).join(file_name);
        std::fs::read(path)?
    };

    Ok(data)
}

pub async fn load_texture(
    asset_root: &str,
    file_name: &str,
    wrap: WrapMode,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    format: Option<&str>,
) -> anyhow::Result<Texture> {
    let data = load_binary(asset_root, file_name).await?;
    Texture::from_bytes(device, queue, &data, file_name, format, wrap)
}
