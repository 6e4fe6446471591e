#![allow(dead_code)]

use portal_scene::data_structures::{
    model::{MeshData, ModelVertex},
    scene_graph::{SceneGraph, SceneNode},
};

pub fn triangle() -> MeshData {
    let mut mesh = MeshData::default();
    mesh.append(vec![ModelVertex::default(); 3], vec![0, 1, 2]);
    mesh
}

/// The model as exported: one baked mesh, two pole lights, the portal.
pub fn portal_graph() -> SceneGraph {
    SceneGraph::new(
        "Scene",
        vec![
            SceneNode::new("baked").with_mesh(triangle()),
            SceneNode::new("poleLightA").with_mesh(triangle()),
            SceneNode::new("poleLightB").with_mesh(triangle()),
            SceneNode::new("portalLight").with_mesh(triangle()),
        ],
    )
}

/// Node names for [`glb`], each pointing at the same triangle.
pub const GLB_NODES: [&str; 4] = ["baked", "poleLightA", "poleLightB", "portalLight"];

/// A minimal binary glTF with [`GLB_NODES`] in its only scene.
/// `required_extension` lands in `extensionsRequired`.
pub fn glb(required_extension: Option<&str>) -> Vec<u8> {
    let mut bin = Vec::new();
    for position in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
        position.iter().for_each(|v| bin.extend_from_slice(&v.to_le_bytes()));
    }
    for uv in [[0.0f32, 0.0], [1.0, 0.0], [0.0, 1.0]] {
        uv.iter().for_each(|v| bin.extend_from_slice(&v.to_le_bytes()));
    }
    for index in [0u16, 1, 2] {
        bin.extend_from_slice(&index.to_le_bytes());
    }
    let bin_length = bin.len();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let nodes = GLB_NODES
        .iter()
        .map(|name| format!(r#"{{"name":"{name}","mesh":0}}"#))
        .collect::<Vec<_>>()
        .join(",");
    let extensions = match required_extension {
        Some(ext) => format!(r#""extensionsUsed":["{ext}"],"extensionsRequired":["{ext}"],"#),
        None => String::new(),
    };
    let json = format!(
        r#"{{"asset":{{"version":"2.0"}},{extensions}"scene":0,"scenes":[{{"name":"Scene","nodes":[0,1,2,3]}}],"nodes":[{nodes}],"meshes":[{{"primitives":[{{"attributes":{{"POSITION":0,"TEXCOORD_0":1}},"indices":2}}]}}],"accessors":[{{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0,0,0],"max":[1,1,0]}},{{"bufferView":1,"componentType":5126,"count":3,"type":"VEC2"}},{{"bufferView":2,"componentType":5123,"count":3,"type":"SCALAR"}}],"bufferViews":[{{"buffer":0,"byteOffset":0,"byteLength":36}},{{"buffer":0,"byteOffset":36,"byteLength":24}},{{"buffer":0,"byteOffset":60,"byteLength":6}}],"buffers":[{{"byteLength":{bin_length}}}]}}"#
    );
    let mut json = json.into_bytes();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"JSON");
    glb.extend_from_slice(&json);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"BIN\0");
    glb.extend_from_slice(&bin);
    glb
}
