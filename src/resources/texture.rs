use std::path::Path;

use crate::{config::PortalConfig, error::AssetLoadError};

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> Result<reqwest::Url, AssetLoadError> {
    let fetch_error = |reason: String| AssetLoadError::Fetch {
        url: file_name.to_string(),
        reason,
    };
    let window = web_sys::window().ok_or_else(|| fetch_error("no browser window".to_string()))?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| fetch_error(format!("no page origin: {e:?}")))?;
    let base = reqwest::Url::parse(&format!("{origin}/assets/")).map_err(|e| fetch_error(e.to_string()))?;
    base.join(file_name).map_err(|e| fetch_error(e.to_string()))
}

/// Reads one asset: `<assets_root>/<file_name>` natively, `<origin>/assets/<file_name>` on the web.
pub async fn load_binary(assets_root: &Path, file_name: &str) -> Result<Vec<u8>, AssetLoadError> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let _ = assets_root;
        let url = format_url(file_name)?;
        let fetch_error = |e: reqwest::Error| AssetLoadError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        };
        reqwest::get(url.clone())
            .await
            .and_then(|response| response.error_for_status())
            .map_err(fetch_error)?
            .bytes()
            .await
            .map_err(fetch_error)?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = assets_root.join(file_name);
        tokio::fs::read(&path)
            .await
            .map_err(|source| AssetLoadError::Io { path, source })?
    };

    log::debug!("Loaded {file_name} ({} bytes)", data.len());
    Ok(data)
}

/// Loads and decodes the baked lightmap.
///
/// The image is kept as stored: it is uploaded as sRGB and not flipped, since
/// glTF texture coordinates start at the top-left row.
pub async fn load_baked_image(config: &PortalConfig) -> Result<image::DynamicImage, AssetLoadError> {
    log::info!("Loading baked texture {}", config.baked_texture);
    let bytes = load_binary(&config.assets_root, &config.baked_texture).await?;
    image::load_from_memory(&bytes).map_err(|source| AssetLoadError::Image {
        name: config.baked_texture.clone(),
        source,
    })
}
