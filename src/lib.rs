//! portal-scene
//!
//! A small night-time scene: a stone portal with an animated noise shader, a
//! baked-lighting model around it and a swarm of fireflies. It renders
//! natively through wgpu and winit, and in the browser through WebGL.
//!
//! High-level modules
//! - `camera`: camera, projection, uniforms and damped orbit controls
//! - `config`: the scene's constants and asset locations
//! - `context`: scene state and the GPU context that owns device/queue/surface
//! - `data_structures`: scene graph, meshes, materials, particles, uniforms
//! - `debug`: the live tweak panel and its egui overlay
//! - `error`: typed errors for asset loading, material binding and the panel
//! - `flow`: event loop and render loop
//! - `pipelines`: the baked, flat, portal and firefly pipelines
//! - `resources`: texture and glTF loading
//! - `render`: per-frame composition of the uploaded scene
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod debug;
pub mod error;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resources;

pub use config::PortalConfig;
pub use flow::run;
