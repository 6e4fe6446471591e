//! Asset loading: the baked texture and the glTF model.
//!
//! Everything here produces CPU-side data ([`image::DynamicImage`],
//! [`SceneGraph`]); uploading to the GPU happens once the result reaches
//! the event loop.

use std::collections::HashMap;

use crate::{
    config::PortalConfig,
    data_structures::{
        instance::Instance,
        model::{MeshData, ModelVertex},
        scene_graph::{SceneGraph, SceneNode},
    },
    error::AssetLoadError,
};

pub mod texture;

pub use texture::{load_baked_image, load_binary};

/// Required by models compressed with Draco.
pub const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

/// Everything the scene needs from disk or network.
#[derive(Clone, Debug)]
pub struct LoadedAssets {
    pub baked: image::DynamicImage,
    pub graph: SceneGraph,
}

/// Loads texture and model concurrently. Either failing fails the whole load.
pub async fn load_scene_assets(config: &PortalConfig) -> Result<LoadedAssets, AssetLoadError> {
    let (baked, graph) = futures::join!(load_baked_image(config), load_model_gltf(config));
    let assets = LoadedAssets {
        baked: baked?,
        graph: graph?,
    };
    log::info!(
        "Loaded {} ({} nodes) and {} ({}x{})",
        config.model,
        assets.graph.node_count(),
        config.baked_texture,
        assets.baked.width(),
        assets.baked.height()
    );
    Ok(assets)
}

/// Loads the model file and any external buffers it references.
pub async fn load_model_gltf(config: &PortalConfig) -> Result<SceneGraph, AssetLoadError> {
    log::info!("Loading model {}", config.model);
    let bytes = load_binary(&config.assets_root, &config.model).await?;
    let gltf = open_gltf(config, &bytes)?;

    let mut external = HashMap::new();
    for uri in external_buffer_uris(&gltf) {
        let path = sibling_path(&config.model, &uri);
        let data = load_binary(&config.assets_root, &path).await?;
        external.insert(uri, data);
    }

    scene_from_gltf(&config.model, &gltf, &external)
}

/// Parses GLB or glTF bytes into a scene graph. `external` maps buffer URIs
/// to their contents; GLB models usually need none.
pub fn parse_gltf(
    config: &PortalConfig,
    bytes: &[u8],
    external: &HashMap<String, Vec<u8>>,
) -> Result<SceneGraph, AssetLoadError> {
    let gltf = open_gltf(config, bytes)?;
    scene_from_gltf(&config.model, &gltf, external)
}

/// Rejects models needing an extension we cannot decode, then parses with validation.
fn open_gltf(config: &PortalConfig, bytes: &[u8]) -> Result<gltf::Gltf, AssetLoadError> {
    let gltf_error = |source| AssetLoadError::Gltf {
        name: config.model.clone(),
        source,
    };

    let unchecked = gltf::Gltf::from_slice_without_validation(bytes).map_err(gltf_error)?;
    if let Some(extension) = unchecked.extensions_required().next() {
        return Err(if extension == DRACO_EXTENSION {
            AssetLoadError::CompressedGeometry {
                name: config.model.clone(),
                extension: extension.to_string(),
                decoder_path: config.decoder_path.clone(),
            }
        } else {
            AssetLoadError::UnsupportedExtension {
                name: config.model.clone(),
                extension: extension.to_string(),
            }
        });
    }

    gltf::Gltf::from_slice(bytes).map_err(gltf_error)
}

fn external_buffer_uris(gltf: &gltf::Gltf) -> Vec<String> {
    let mut uris: Vec<String> = Vec::new();
    for buffer in gltf.buffers() {
        if let gltf::buffer::Source::Uri(uri) = buffer.source() {
            if !uri.starts_with("data:") && !uris.iter().any(|known| known == uri) {
                uris.push(uri.to_string());
            }
        }
    }
    uris
}

/// Buffer URIs are relative to the model file.
fn sibling_path(model: &str, uri: &str) -> String {
    match model.rfind('/') {
        Some(index) => format!("{}/{}", &model[..index], uri),
        None => uri.to_string(),
    }
}

fn scene_from_gltf(
    name: &str,
    gltf: &gltf::Gltf,
    external: &HashMap<String, Vec<u8>>,
) -> Result<SceneGraph, AssetLoadError> {
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => gltf.blob.clone(),
            gltf::buffer::Source::Uri(uri) => external.get(uri).cloned(),
        };
        match data {
            Some(data) if data.len() >= buffer.length() => buffer_data.push(data),
            _ => {
                return Err(AssetLoadError::MissingBuffer {
                    name: name.to_string(),
                    index: buffer.index(),
                });
            }
        }
    }

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .ok_or_else(|| AssetLoadError::MissingScene {
            name: name.to_string(),
        })?;

    let nodes = scene
        .nodes()
        .map(|node| to_scene_node(node, &buffer_data))
        .collect();
    Ok(SceneGraph::new(scene.name().unwrap_or("Scene"), nodes))
}

fn to_scene_node(node: gltf::Node, buffer_data: &[Vec<u8>]) -> SceneNode {
    SceneNode {
        name: node.name().unwrap_or_default().to_string(),
        transform: Instance::from_decomposed(node.transform().decomposed()),
        mesh: node.mesh().map(|mesh| read_mesh(&mesh, buffer_data)),
        material: None,
        children: node
            .children()
            .map(|child| to_scene_node(child, buffer_data))
            .collect(),
    }
}

/// Positions, first UV set and indices of every triangle primitive.
fn read_mesh(mesh: &gltf::Mesh, buffer_data: &[Vec<u8>]) -> MeshData {
    let mut data = MeshData::default();
    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "Skipping {:?} primitive {} of mesh {:?}",
                primitive.mode(),
                primitive.index(),
                mesh.name()
            );
            continue;
        }
        let reader = primitive.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));
        let Some(positions) = reader.read_positions() else {
            log::warn!("Mesh {:?} has a primitive without positions", mesh.name());
            continue;
        };
        let positions: Vec<[f32; 3]> = positions.collect();
        let tex_coords: Vec<[f32; 2]> = reader
            .read_tex_coords(0)
            .map(|tex_coords| tex_coords.into_f32().collect())
            .unwrap_or_default();

        let vertices = positions
            .iter()
            .enumerate()
            .map(|(i, &position)| ModelVertex {
                position,
                tex_coords: tex_coords.get(i).copied().unwrap_or_default(),
            })
            .collect();
        let indices = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        data.append(vertices, indices);
    }
    data
}
