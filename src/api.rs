//! Host-facing surface: the owned rasterizer value and a process-wide
//! singleton over it
//!
//! All storage lives inside [`Rasterizer`], allocated once at the
//! compile-time maxima. The host fills buffers through the `_mut` accessors
//! and invokes operations between render calls; the core never reallocates
//! and never frees. [`singleton`] wraps one shared instance for hosts that
//! want the flat function-style surface instead of owning the value.

use crate::baker::{self, BakeState};
use crate::framebuffer::Framebuffer;
use crate::math::{Mat4, Vec2, Vec3, EPSILON};
use crate::parallel;
use crate::render;
use crate::types::{Color, Light, RampStop, RasterSettings, TextureStore};
use crate::vertex::{FrameInputs, VertexCache, VERTEX_STRIDE};
use crate::{MAX_INDICES, MAX_THREADS, MAX_VERTICES};

/// The rasterizer core: framebuffers, geometry, textures, matrices, light,
/// settings, the per-frame vertex cache and the material baker.
pub struct Rasterizer {
    fb: Framebuffer,
    vertices: Vec<f32>,
    indices: Vec<u32>,
    vertex_count: usize,
    index_count: usize,
    mvp: Mat4,
    model: Mat4,
    textures: TextureStore,
    light: Light,
    pub settings: RasterSettings,
    cache: VertexCache,
    bake: BakeState,
    thread_count: usize,
}

impl Rasterizer {
    pub fn new() -> Self {
        Self {
            fb: Framebuffer::new(),
            vertices: vec![0.0; MAX_VERTICES * VERTEX_STRIDE],
            indices: vec![0; MAX_INDICES],
            vertex_count: 0,
            index_count: 0,
            mvp: Mat4::IDENTITY,
            model: Mat4::IDENTITY,
            textures: TextureStore::new(),
            light: Light::default(),
            settings: RasterSettings::default(),
            cache: VertexCache::new(),
            bake: BakeState::new(),
            thread_count: 1,
        }
    }

    // --- resolution ---

    pub fn set_render_resolution(&mut self, width: i32, height: i32) {
        self.fb.set_resolution(width, height);
    }

    pub fn render_width(&self) -> usize {
        self.fb.width()
    }

    pub fn render_height(&self) -> usize {
        self.fb.height()
    }

    pub fn pixel_count(&self) -> usize {
        self.fb.pixel_count()
    }

    // --- buffer access for the host ---

    /// Source vertex storage: 12 floats per vertex
    /// (px,py,pz, nx,ny,nz, u,v, r,g,b,a)
    pub fn vertices_mut(&mut self) -> &mut [f32] {
        &mut self.vertices
    }

    pub fn indices_mut(&mut self) -> &mut [u32] {
        &mut self.indices
    }

    /// Row-major MVP matrix storage
    pub fn mvp_matrix_mut(&mut self) -> &mut [f32; 16] {
        &mut self.mvp.m
    }

    /// Row-major model matrix storage
    pub fn model_matrix_mut(&mut self) -> &mut [f32; 16] {
        &mut self.model.m
    }

    /// Raw RGBA bytes of a texture slot; None for invalid slots
    pub fn texture_mut(&mut self, slot: i32) -> Option<&mut [u8]> {
        self.textures.slot_mut(slot)
    }

    /// The (width, height) pairs for all texture slots
    pub fn texture_sizes_mut(&mut self) -> &mut [i32] {
        self.textures.sizes_mut()
    }

    /// Active region of the pixel buffer, 0xAABBGGRR words
    pub fn pixels(&self) -> &[u32] {
        self.fb.pixels()
    }

    /// Active region of the depth buffer
    pub fn depth(&self) -> &[u16] {
        self.fb.depth()
    }

    // --- textures ---

    pub fn set_texture_size(&mut self, slot: i32, width: i32, height: i32) {
        self.textures.set_size(slot, width, height);
    }

    /// Select the sampling slot; -1 disables sampling
    pub fn set_current_texture(&mut self, slot: i32) {
        self.textures.set_current(slot);
    }

    // --- light ---

    /// Normalizes the direction; near-zero input keeps the previous one
    pub fn set_light_direction(&mut self, x: f32, y: f32, z: f32) {
        let dir = Vec3::new(x, y, z);
        if dir.len() < EPSILON {
            log::warn!("zero-length light direction ignored");
            return;
        }
        self.light.direction = dir.normalize();
    }

    pub fn set_light_color(&mut self, r: f32, g: f32, b: f32, intensity: f32) {
        self.light.color = Vec3::new(r, g, b);
        self.light.intensity = intensity;
    }

    // --- counts ---

    pub fn set_vertex_count(&mut self, count: i32) {
        let clamped = count.clamp(0, MAX_VERTICES as i32);
        if clamped != count {
            log::warn!("vertex count {} out of range, clamped to {}", count, clamped);
        }
        self.vertex_count = clamped as usize;
    }

    pub fn set_index_count(&mut self, count: i32) {
        let clamped = count.clamp(0, MAX_INDICES as i32);
        if clamped != count {
            log::warn!("index count {} out of range, clamped to {}", count, clamped);
        }
        self.index_count = clamped as usize;
    }

    // --- settings ---

    pub fn set_ambient_light(&mut self, ambient: f32) {
        self.settings.ambient_light = ambient;
    }

    pub fn set_snap_resolution(&mut self, x: f32, y: f32) {
        self.settings.snap_resolution = Vec2::new(x, y);
    }

    // --- threading ---

    pub fn set_thread_count(&mut self, count: i32) {
        let clamped = count.clamp(1, MAX_THREADS as i32);
        if clamped != count {
            log::warn!("thread count {} out of range, clamped to {}", count, clamped);
        }
        self.thread_count = clamped as usize;
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    // --- frame operations ---

    pub fn clear(&mut self, r: u8, g: u8, b: u8) {
        self.fb.clear(r, g, b);
    }

    /// Rasterize the active triangle list sequentially
    pub fn render_triangles(&mut self) {
        let inputs = FrameInputs {
            vertices: &self.vertices[..self.vertex_count * VERTEX_STRIDE],
            mvp: &self.mvp,
            model: &self.model,
            light: &self.light,
            settings: &self.settings,
            width: self.fb.width(),
            height: self.fb.height(),
        };
        render::render_triangles(
            &mut self.fb,
            &mut self.cache,
            &inputs,
            &self.indices[..self.index_count],
            &self.textures,
        );
    }

    /// Rasterize the active triangle list across the configured worker
    /// threads. Small batches fall back to the sequential path.
    pub fn render_triangles_parallel(&mut self) {
        let inputs = FrameInputs {
            vertices: &self.vertices[..self.vertex_count * VERTEX_STRIDE],
            mvp: &self.mvp,
            model: &self.model,
            light: &self.light,
            settings: &self.settings,
            width: self.fb.width(),
            height: self.fb.height(),
        };
        parallel::render_triangles_parallel(
            &mut self.fb,
            &mut self.cache,
            &inputs,
            &self.indices[..self.index_count],
            &self.textures,
            self.thread_count,
        );
    }

    // --- overlays ---

    pub fn draw_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, r: u8, g: u8, b: u8, depth: u16) {
        self.fb.draw_line(x0, y0, x1, y1, Color::new(r, g, b), depth);
    }

    pub fn draw_thick_line(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        thickness: i32,
        r: u8,
        g: u8,
        b: u8,
        depth: u16,
    ) {
        self.fb
            .draw_thick_line(x0, y0, x1, y1, thickness, Color::new(r, g, b), depth);
    }

    pub fn render_point(&mut self, x: f32, y: f32, color: u32, size: i32) {
        self.fb.render_point(x, y, color, size);
    }

    /// Point records are 6 floats (x,y,z,r,g,b); the MVP is caller-supplied
    /// and independent of the mesh pipeline's matrices
    pub fn render_points_batch(
        &mut self,
        vertex_data: &[f32],
        indices: &[u32],
        mvp: &Mat4,
        point_size: i32,
    ) {
        self.fb.render_points_batch(vertex_data, indices, mvp, point_size);
    }

    // --- material baker ---

    pub fn set_bake_params(&mut self, width: i32, height: i32, source_slot: i32) {
        self.bake.set_params(width, height, source_slot);
    }

    /// The compiled opcode stream, terminated by `OP_END`
    pub fn bake_program_mut(&mut self) -> &mut [u8] {
        &mut self.bake.program
    }

    /// Staged ramp stops, used by COLOR_RAMP ops with no inline stops
    pub fn color_ramp_mut(&mut self) -> &mut [RampStop] {
        &mut self.bake.ramp
    }

    pub fn set_color_ramp_count(&mut self, count: i32) {
        self.bake.set_ramp_count(count.max(0) as usize);
    }

    /// Baked RGBA output, `bake_width * bake_height * 4` bytes
    pub fn bake_output(&self) -> &[u8] {
        let len = (self.bake.width.max(0) as usize) * (self.bake.height.max(0) as usize) * 4;
        &self.bake.output[..len]
    }

    pub fn bake_material(&mut self) {
        baker::bake_material(&mut self.bake, &self.textures);
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Flat function-style surface over one shared [`Rasterizer`], initialized
/// on first use. Bulk buffer access goes through [`singleton::with`]; the
/// scalar operations have thin wrappers.
pub mod singleton {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn instance() -> &'static Mutex<Rasterizer> {
        static INSTANCE: OnceLock<Mutex<Rasterizer>> = OnceLock::new();
        INSTANCE.get_or_init(|| Mutex::new(Rasterizer::new()))
    }

    /// Run `f` against the shared rasterizer. A poisoned lock is recovered;
    /// the core holds no invariants a panic could break mid-frame that the
    /// next clear does not reset.
    pub fn with<R>(f: impl FnOnce(&mut Rasterizer) -> R) -> R {
        let mut guard = match instance().lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    pub fn set_render_resolution(width: i32, height: i32) {
        with(|r| r.set_render_resolution(width, height));
    }

    pub fn get_render_width() -> usize {
        with(|r| r.render_width())
    }

    pub fn get_render_height() -> usize {
        with(|r| r.render_height())
    }

    pub fn get_pixel_count() -> usize {
        with(|r| r.pixel_count())
    }

    pub fn set_texture_size(slot: i32, width: i32, height: i32) {
        with(|r| r.set_texture_size(slot, width, height));
    }

    pub fn set_current_texture(slot: i32) {
        with(|r| r.set_current_texture(slot));
    }

    pub fn set_light_direction(x: f32, y: f32, z: f32) {
        with(|r| r.set_light_direction(x, y, z));
    }

    pub fn set_light_color(red: f32, green: f32, blue: f32, intensity: f32) {
        with(|r| r.set_light_color(red, green, blue, intensity));
    }

    pub fn set_vertex_count(count: i32) {
        with(|r| r.set_vertex_count(count));
    }

    pub fn set_index_count(count: i32) {
        with(|r| r.set_index_count(count));
    }

    pub fn set_enable_lighting(enabled: bool) {
        with(|r| r.settings.lighting = enabled);
    }

    pub fn set_enable_dithering(enabled: bool) {
        with(|r| r.settings.dithering = enabled);
    }

    pub fn set_enable_texturing(enabled: bool) {
        with(|r| r.settings.texturing = enabled);
    }

    pub fn set_enable_backface_culling(enabled: bool) {
        with(|r| r.settings.backface_culling = enabled);
    }

    pub fn set_enable_vertex_snapping(enabled: bool) {
        with(|r| r.settings.vertex_snapping = enabled);
    }

    pub fn set_enable_smooth_shading(enabled: bool) {
        with(|r| r.settings.smooth_shading = enabled);
    }

    pub fn set_ambient_light(ambient: f32) {
        with(|r| r.set_ambient_light(ambient));
    }

    pub fn set_snap_resolution(x: f32, y: f32) {
        with(|r| r.set_snap_resolution(x, y));
    }

    pub fn set_thread_count(count: i32) {
        with(|r| r.set_thread_count(count));
    }

    pub fn get_thread_count() -> usize {
        with(|r| r.thread_count())
    }

    pub fn clear(red: u8, green: u8, blue: u8) {
        with(|r| r.clear(red, green, blue));
    }

    pub fn render_triangles() {
        with(|r| r.render_triangles());
    }

    pub fn render_triangles_parallel() {
        with(|r| r.render_triangles_parallel());
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_line(x0: f32, y0: f32, x1: f32, y1: f32, red: u8, green: u8, blue: u8, depth: u16) {
        with(|r| r.draw_line(x0, y0, x1, y1, red, green, blue, depth));
    }

    pub fn render_point(x: f32, y: f32, color: u32, size: i32) {
        with(|r| r.render_point(x, y, color, size));
    }

    pub fn set_bake_params(width: i32, height: i32, source_slot: i32) {
        with(|r| r.set_bake_params(width, height, source_slot));
    }

    pub fn set_color_ramp_count(count: i32) {
        with(|r| r.set_color_ramp_count(count));
    }

    pub fn bake_material() {
        with(|r| r.bake_material());
    }
}
