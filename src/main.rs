use deskview::view::{self, ViewConfig};

fn main() -> anyhow::Result<()> {
    let asset_root = std::env::var("DESKVIEW_ASSETS").unwrap_or_else(|_| "assets".to_string());
    view::run(ViewConfig {
        asset_root,
        ..Default::default()
    })
}
