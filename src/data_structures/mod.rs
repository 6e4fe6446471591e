//! Scene data: models, textures, the scene graph, materials and particles.
//!
//! - `colour` holds sRGB colours and their linear conversion
//! - `instance` holds per-node transformation data
//! - `material` binds materials to nodes by name
//! - `model` contains mesh data on the CPU and GPU side
//! - `particles` generates the firefly point cloud
//! - `scene_graph` is the loaded node tree with name lookup
//! - `texture` wraps GPU textures
//! - `uniforms` holds the shader uniforms shared across the frame

pub mod colour;
pub mod instance;
pub mod material;
pub mod model;
pub mod particles;
pub mod scene_graph;
pub mod texture;
pub mod uniforms;
