//! Vertex transformation and the per-frame processed-vertex cache

use crate::math::{Mat4, Vec3, Vec4};
use crate::types::{Light, ProcessedVertex, RasterSettings};
use crate::MAX_VERTICES;

/// Number of floats per source vertex: position, normal, UV, RGBA color
pub(crate) const VERTEX_STRIDE: usize = 12;

/// Everything the per-frame vertex and triangle stages read. Frozen by the
/// host for the duration of a render call.
pub(crate) struct FrameInputs<'a> {
    /// Active prefix of the source vertex buffer
    pub vertices: &'a [f32],
    pub mvp: &'a Mat4,
    pub model: &'a Mat4,
    pub light: &'a Light,
    pub settings: &'a RasterSettings,
    pub width: usize,
    pub height: usize,
}

impl FrameInputs<'_> {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / VERTEX_STRIDE
    }
}

/// Directional diffuse term clamped into [0, 1]
pub(crate) fn light_scalar(normal: Vec3, light: &Light, ambient: f32) -> f32 {
    let ndotl = (-normal.dot(light.direction)).max(0.0);
    (ambient + ndotl * light.intensity).min(1.0)
}

/// Run one source vertex through the transform stage: MVP, guarded divide,
/// snap, viewport, world-space normal/position, affine factor, pre-lit
/// scalar. UV comes out pre-multiplied by the affine factor.
pub(crate) fn process_vertex(inputs: &FrameInputs, vertex_idx: usize) -> ProcessedVertex {
    let v = &inputs.vertices[vertex_idx * VERTEX_STRIDE..vertex_idx * VERTEX_STRIDE + VERTEX_STRIDE];
    let settings = inputs.settings;

    let pos = Vec4::new(v[0], v[1], v[2], 1.0);
    let normal = Vec3::new(v[3], v[4], v[5]);
    let (u, vt) = (v[6], v[7]);
    let (r, g, b) = (v[8], v[9], v[10]);

    let clip = inputs.mvp.mul_vec4(pos);
    let mut ndc = clip.perspective_divide();

    // Quantize to the snap grid: the vertex "swim"
    if settings.vertex_snapping {
        ndc.x = (ndc.x * settings.snap_resolution.x).floor() / settings.snap_resolution.x;
        ndc.y = (ndc.y * settings.snap_resolution.y).floor() / settings.snap_resolution.y;
    }

    // Viewport transform, Y flipped so screen row 0 is at NDC +1
    let screen_x = (ndc.x + 1.0) * 0.5 * inputs.width as f32;
    let screen_y = (1.0 - ndc.y) * 0.5 * inputs.height as f32;

    let world_normal = inputs.model.mul_dir(normal).normalize();
    let world_pos = inputs.model.mul_vec4(pos);

    // Affine divisor: larger for distant vertices, so screen-linear UV
    // interpolation over-stretches nearby texels
    let dist = clip.w.max(0.001);
    let affine = dist + (clip.w * 8.0 / dist) * 0.5;

    let light = if settings.lighting {
        light_scalar(world_normal, inputs.light, settings.ambient_light)
    } else {
        1.0
    };

    ProcessedVertex {
        screen: Vec3::new(screen_x, screen_y, ndc.z),
        world: world_pos.xyz(),
        normal: world_normal,
        depth: ndc.z,
        u: u * affine,
        v: vt * affine,
        r,
        g,
        b,
        affine,
        light,
    }
}

/// Per-frame memoization of processed vertices, indexed by vertex id.
/// The flag array is zeroed over the active vertex count at frame start;
/// the slot array is written at most once per vertex per frame.
pub(crate) struct VertexCache {
    processed: Vec<u8>,
    slots: Vec<ProcessedVertex>,
}

impl VertexCache {
    pub fn new() -> Self {
        Self {
            processed: vec![0; MAX_VERTICES],
            slots: vec![ProcessedVertex::default(); MAX_VERTICES],
        }
    }

    pub fn invalidate(&mut self, vertex_count: usize) {
        let n = vertex_count.min(MAX_VERTICES);
        self.processed[..n].fill(0);
    }

    /// Process-on-miss lookup
    pub fn fetch(&mut self, inputs: &FrameInputs, vertex_idx: usize) -> ProcessedVertex {
        if self.processed[vertex_idx] == 0 {
            self.slots[vertex_idx] = process_vertex(inputs, vertex_idx);
            self.processed[vertex_idx] = 1;
        }
        self.slots[vertex_idx]
    }

    /// Read-only lookup for workers; the slot must have been populated this
    /// frame via `fetch`
    pub fn get(&self, vertex_idx: usize) -> ProcessedVertex {
        self.slots[vertex_idx]
    }
}
