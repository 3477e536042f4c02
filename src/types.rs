//! Core types shared across the pipeline

use serde::{Deserialize, Serialize};

use crate::math::{Vec2, Vec3};
use crate::{MAX_TEXTURES, MAX_TEXTURE_SIZE};

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };
    pub const MAGENTA: Color = Color { r: 255, g: 0, b: 255, a: 255 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Pack to the framebuffer's 32-bit word: 0xAABBGGRR little-endian
    pub fn to_abgr(self) -> u32 {
        ((self.a as u32) << 24) | ((self.b as u32) << 16) | ((self.g as u32) << 8) | self.r as u32
    }
}

/// Pack opaque channel values into the framebuffer word layout
#[inline]
pub(crate) fn pack_abgr(r: u32, g: u32, b: u32) -> u32 {
    0xFF00_0000 | (b << 16) | (g << 8) | r
}

/// Single directional light
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Light {
    /// Unit direction the light travels in (a surface lit head-on has a
    /// normal opposing this)
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            direction: Vec3::ZERO,
            color: Vec3::new(1.0, 1.0, 1.0),
            intensity: 1.0,
        }
    }
}

/// Rasterizer settings. Defaults match the authentic-PS1 configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterSettings {
    pub lighting: bool,
    /// 8x8 Bayer ordered dithering, quantizing each channel to 5 bits
    pub dithering: bool,
    pub texturing: bool,
    /// Double-sided lighting mode: geometry is always drawn, backfaces get
    /// their normals flipped for the light calculation
    pub backface_culling: bool,
    /// Quantize NDC x/y to the snap grid (the vertex "swim")
    pub vertex_snapping: bool,
    /// Gouraud (per-vertex) instead of flat (per-face) lighting
    pub smooth_shading: bool,
    pub ambient_light: f32,
    pub snap_resolution: Vec2,
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            lighting: true,
            dithering: true,
            texturing: true,
            backface_culling: true,
            vertex_snapping: true,
            smooth_shading: false,
            ambient_light: 0.2,
            snap_resolution: Vec2::new(320.0, 240.0),
        }
    }
}

/// A source vertex after the per-frame transform stage
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessedVertex {
    /// Screen-space position (x, y in pixels, z = NDC depth)
    pub screen: Vec3,
    /// World-space position, for flat-shading face normals
    pub world: Vec3,
    /// Unit world-space normal
    pub normal: Vec3,
    /// NDC depth in [-1, 1]
    pub depth: f32,
    /// Texture coordinates pre-multiplied by the affine factor
    pub u: f32,
    pub v: f32,
    /// Vertex color, 0-255 per channel
    pub r: f32,
    pub g: f32,
    pub b: f32,
    /// Affine divisor interpolated across the triangle; dividing the
    /// pre-multiplied UV by it per pixel produces the texture warp
    pub affine: f32,
    /// Precomputed light scalar in [0, 1]
    pub light: f32,
}

/// Color ramp stop for the material baker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RampStop {
    pub position: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Borrowed view of one texture slot's active region
#[derive(Clone, Copy)]
pub struct TextureRef<'a> {
    pub data: &'a [u8],
    pub width: i32,
    pub height: i32,
}

/// Fixed texture slots. Each slot holds up to 512x512 RGBA plus its
/// (width, height) metadata; at most one slot is current for sampling.
pub struct TextureStore {
    data: Vec<u8>,
    sizes: [i32; MAX_TEXTURES * 2],
    current: i32,
}

impl TextureStore {
    pub fn new() -> Self {
        Self {
            data: vec![0; MAX_TEXTURES * MAX_TEXTURE_SIZE],
            sizes: [0; MAX_TEXTURES * 2],
            current: -1,
        }
    }

    /// Raw bytes of a slot for the host to fill. None for invalid slots.
    pub fn slot_mut(&mut self, slot: i32) -> Option<&mut [u8]> {
        if slot < 0 || slot as usize >= MAX_TEXTURES {
            return None;
        }
        let start = slot as usize * MAX_TEXTURE_SIZE;
        Some(&mut self.data[start..start + MAX_TEXTURE_SIZE])
    }

    /// The (width, height) metadata array, two entries per slot
    pub fn sizes_mut(&mut self) -> &mut [i32] {
        &mut self.sizes
    }

    pub fn set_size(&mut self, slot: i32, width: i32, height: i32) {
        if slot < 0 || slot as usize >= MAX_TEXTURES {
            log::warn!("set_texture_size: slot {} out of range, ignored", slot);
            return;
        }
        self.sizes[slot as usize * 2] = width;
        self.sizes[slot as usize * 2 + 1] = height;
    }

    pub fn size_of(&self, slot: i32) -> (i32, i32) {
        if slot < 0 || slot as usize >= MAX_TEXTURES {
            return (0, 0);
        }
        (self.sizes[slot as usize * 2], self.sizes[slot as usize * 2 + 1])
    }

    /// Select the sampling slot; -1 disables sampling
    pub fn set_current(&mut self, slot: i32) {
        self.current = slot;
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    /// Resolve a slot to a usable view, or None when the slot is unset,
    /// out of range, or has no declared size
    pub fn resolve(&self, slot: i32) -> Option<TextureRef<'_>> {
        if slot < 0 || slot as usize >= MAX_TEXTURES {
            return None;
        }
        let (w, h) = self.size_of(slot);
        if w <= 0 || h <= 0 {
            return None;
        }
        let start = slot as usize * MAX_TEXTURE_SIZE;
        let len = (w as usize * h as usize * 4).min(MAX_TEXTURE_SIZE);
        Some(TextureRef {
            data: &self.data[start..start + len],
            width: w,
            height: h,
        })
    }

    /// The view triangle sampling should use, honoring the texturing toggle
    pub fn resolve_current(&self, texturing_enabled: bool) -> Option<TextureRef<'_>> {
        if !texturing_enabled {
            return None;
        }
        self.resolve(self.current)
    }
}

impl Default for TextureStore {
    fn default() -> Self {
        Self::new()
    }
}
