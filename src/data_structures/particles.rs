//! Firefly point cloud.

use rand::Rng;

/// Half the side length of the square the fireflies spawn over (x and z).
pub const SPREAD: f32 = 2.0;
/// Maximum spawn height.
pub const MAX_HEIGHT: f32 = 1.5;

/// Positions and per-point scales, generated once and never changed.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleBuffer {
    pub positions: Vec<[f32; 3]>,
    pub scales: Vec<f32>,
}

impl ParticleBuffer {
    /// Samples `count` points independently and uniformly:
    /// x, z in `[-2, 2]`, y in `[0, 1.5]`, scale in `[0, 1)`.
    pub fn generate(count: usize, rng: &mut impl Rng) -> Self {
        let mut positions = Vec::with_capacity(count);
        let mut scales = Vec::with_capacity(count);
        for _ in 0..count {
            positions.push([
                (rng.r#gen::<f32>() - 0.5) * 2.0 * SPREAD,
                rng.r#gen::<f32>() * MAX_HEIGHT,
                (rng.r#gen::<f32>() - 0.5) * 2.0 * SPREAD,
            ]);
            scales.push(rng.r#gen::<f32>());
        }
        Self { positions, scales }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Interleaved per-instance data for the firefly pipeline.
    pub fn to_raw(&self) -> Vec<FireflyRaw> {
        self.positions
            .iter()
            .zip(&self.scales)
            .map(|(&position, &scale)| FireflyRaw { position, scale })
            .collect()
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FireflyRaw {
    pub position: [f32; 3],
    pub scale: f32,
}

impl crate::data_structures::model::Vertex for FireflyRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<FireflyRaw>() as wgpu::BufferAddress,
            // one quad (four vertices from the vertex index) per firefly
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}
