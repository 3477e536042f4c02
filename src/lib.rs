//! `groggy`: PS1-style software rasterizer core
//!
//! A CPU triangle pipeline with authentic first-generation console rendering:
//! - Affine texture mapping (warpy textures)
//! - Vertex snapping (jittery vertices)
//! - Flat and Gouraud shading from a single directional light
//! - 8x8 ordered dithering down to 5 bits per channel
//! - 16-bit depth buffer
//! - SIMD quad rasterization, optionally spread across worker threads
//! - A bytecode material baker for procedural RGBA textures
//!
//! The host owns windowing, asset I/O and matrix composition. It fills the
//! buffers exposed by [`Rasterizer`], calls [`Rasterizer::clear`] and
//! [`Rasterizer::render_triangles`], then reads the pixel buffer back.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod api;
mod baker;
mod framebuffer;
mod math;
mod parallel;
mod render;
mod types;
mod vertex;

pub use api::{singleton, Rasterizer};
pub use baker::{
    OP_ALPHA_CUTOFF, OP_COLOR_RAMP, OP_END, OP_FLAT_COLOR, OP_MIX_ADD, OP_MIX_LERP,
    OP_MIX_MULTIPLY, OP_NOISE, OP_SAMPLE_TEXTURE, OP_VORONOI,
};
pub use framebuffer::Framebuffer;
pub use math::{Mat4, Vec2, Vec3, Vec4};
pub use types::{Color, Light, RampStop, RasterSettings, TextureStore};

/// Maximum supported render resolution (buffers are allocated for this size)
pub const MAX_RENDER_WIDTH: usize = 1920;
pub const MAX_RENDER_HEIGHT: usize = 1200;
pub const MAX_PIXEL_COUNT: usize = MAX_RENDER_WIDTH * MAX_RENDER_HEIGHT;

/// Geometry buffer capacities
pub const MAX_VERTICES: usize = 65536;
pub const MAX_INDICES: usize = 65536 * 3;

/// Texture slots: 16 slots of up to 512x512 RGBA
pub const MAX_TEXTURES: usize = 16;
pub const MAX_TEXTURE_SIZE: usize = 512 * 512 * 4;

/// Parallel driver bounds
pub const MAX_THREADS: usize = 8;
pub const MIN_PARALLEL_TRIANGLES: usize = 64;

/// Material baker bounds
pub const MAX_COLOR_RAMP_STOPS: usize = 16;
pub const MAX_BAKE_PROGRAM_SIZE: usize = 2048;
