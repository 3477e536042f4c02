//! Framebuffer storage, the clear path, and overlay primitives
//!
//! Pixel words are 0xAABBGGRR little-endian. Cleared background keeps alpha
//! at 0 so a downstream compositor can tell untouched pixels from geometry;
//! every geometry or overlay write sets alpha to 0xFF. Depth is unsigned
//! 16-bit, 0 nearest, 0xFFFF cleared.

use crate::math::{Mat4, Vec4};
use crate::types::{pack_abgr, Color};
use crate::{MAX_PIXEL_COUNT, MAX_RENDER_HEIGHT, MAX_RENDER_WIDTH};

/// Cleared depth value (farthest)
pub const DEPTH_CLEAR: u16 = 0xFFFF;

/// Pixel and depth buffers with a runtime-variable active extent.
/// Storage is allocated once for the maximum resolution; rendering and
/// clearing touch only the active `width * height` prefix.
pub struct Framebuffer {
    pixels: Vec<u32>,
    depth: Vec<u16>,
    width: usize,
    height: usize,
}

impl Framebuffer {
    pub fn new() -> Self {
        Self {
            pixels: vec![0; MAX_PIXEL_COUNT],
            depth: vec![DEPTH_CLEAR; MAX_PIXEL_COUNT],
            width: 640,
            height: 480,
        }
    }

    /// Set the active extent, clamped to [1, max]
    pub fn set_resolution(&mut self, width: i32, height: i32) {
        let w = width.clamp(1, MAX_RENDER_WIDTH as i32);
        let h = height.clamp(1, MAX_RENDER_HEIGHT as i32);
        if w != width || h != height {
            log::warn!(
                "render resolution {}x{} out of range, clamped to {}x{}",
                width,
                height,
                w,
                h
            );
        }
        self.width = w as usize;
        self.height = h as usize;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Active region of the pixel buffer
    pub fn pixels(&self) -> &[u32] {
        &self.pixels[..self.pixel_count()]
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        let n = self.pixel_count();
        &mut self.pixels[..n]
    }

    /// Active region of the depth buffer
    pub fn depth(&self) -> &[u16] {
        &self.depth[..self.pixel_count()]
    }

    pub fn depth_mut(&mut self) -> &mut [u16] {
        let n = self.pixel_count();
        &mut self.depth[..n]
    }

    /// Fill the active extent with the background color (alpha 0) and reset
    /// depth to the far plane. Storage past the active extent is untouched.
    pub fn clear(&mut self, r: u8, g: u8, b: u8) {
        let word = ((b as u32) << 16) | ((g as u32) << 8) | r as u32;
        let n = self.pixel_count();
        self.pixels[..n].fill(word);
        self.depth[..n].fill(DEPTH_CLEAR);
    }

    /// Bresenham line with integer endpoints, drawn only where `depth_value`
    /// is at most the stored depth. Clipped to the active viewport.
    pub fn draw_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Color, depth_value: u16) {
        let word = pack_abgr(color.r as u32, color.g as u32, color.b as u32);

        let mut x = x0 as i32;
        let mut y = y0 as i32;
        let x1 = x1 as i32;
        let y1 = y1 as i32;

        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
                let idx = y as usize * self.width + x as usize;
                if depth_value <= self.depth[idx] {
                    self.pixels[idx] = word;
                    self.depth[idx] = depth_value;
                }
            }

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Thick line as a bundle of parallel offset lines
    pub fn draw_thick_line(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        thickness: i32,
        color: Color,
        depth_value: u16,
    ) {
        if thickness <= 1 {
            self.draw_line(x0, y0, x1, y1, color, depth_value);
            return;
        }

        let dx = x1 - x0;
        let dy = y1 - y0;
        let len = (dx * dx + dy * dy).sqrt();
        if len < 0.001 {
            return;
        }

        // Perpendicular step
        let px = -dy / len;
        let py = dx / len;

        let half = thickness / 2;
        for i in -half..=half {
            let offset = i as f32;
            self.draw_line(
                x0 + px * offset,
                y0 + py * offset,
                x1 + px * offset,
                y1 + py * offset,
                color,
                depth_value,
            );
        }
    }

    /// Fill a size x size square centered at (x, y), forcing depth to 0 so
    /// the point stays on top of all geometry. No depth test.
    pub fn render_point(&mut self, x: f32, y: f32, color: u32, size: i32) {
        let cx = x as i32;
        let cy = y as i32;
        let half = size / 2;

        for py in -half..=half {
            for px in -half..=half {
                let sx = cx + px;
                let sy = cy + py;
                if sx >= 0 && sx < self.width as i32 && sy >= 0 && sy < self.height as i32 {
                    let idx = sy as usize * self.width + sx as usize;
                    self.pixels[idx] = color;
                    self.depth[idx] = 0;
                }
            }
        }
    }

    /// Transform point records (x,y,z,r,g,b per vertex) through a caller
    /// supplied MVP and splat depth-tested squares. Points behind the camera
    /// or outside the NDC x/y bounds are skipped; z is not bounds-checked,
    /// its depth just clamps into the u16 range. The point depth scale spans
    /// the full u16 range with a -1 bias so splats win z-fights against
    /// geometry drawn at the same position.
    pub fn render_points_batch(
        &mut self,
        vertex_data: &[f32],
        indices: &[u32],
        mvp: &Mat4,
        point_size: i32,
    ) {
        let half = point_size / 2;

        for &index in indices {
            let base = index as usize * 6;
            if base + 6 > vertex_data.len() {
                continue;
            }
            let v = &vertex_data[base..base + 6];

            let clip = mvp.mul_vec4(Vec4::new(v[0], v[1], v[2], 1.0));
            if clip.w < 0.1 {
                continue;
            }

            let inv = 1.0 / clip.w;
            let (nx, ny, nz) = (clip.x * inv, clip.y * inv, clip.z * inv);
            if !(-1.0..=1.0).contains(&nx) || !(-1.0..=1.0).contains(&ny) {
                continue;
            }

            let screen_x = ((nx + 1.0) * 0.5 * self.width as f32) as i32;
            let screen_y = ((1.0 - ny) * 0.5 * self.height as f32) as i32;

            let depth =
                (((nz + 1.0) * 0.5 * 65534.0).round() as i32 - 1).clamp(0, u16::MAX as i32) as u16;

            let word = pack_abgr(v[3] as u32 & 0xFF, v[4] as u32 & 0xFF, v[5] as u32 & 0xFF);

            for py in -half..=half {
                for px in -half..=half {
                    let sx = screen_x + px;
                    let sy = screen_y + py;
                    if sx >= 0 && sx < self.width as i32 && sy >= 0 && sy < self.height as i32 {
                        let idx = sy as usize * self.width + sx as usize;
                        if depth < self.depth[idx] {
                            self.pixels[idx] = word;
                            self.depth[idx] = depth;
                        }
                    }
                }
            }
        }
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw view of the framebuffer's active extent for the rasterizer hot loop.
///
/// Workers on separate threads may hold copies of the same view; concurrent
/// writes to one pixel race and the last writer wins, independently for
/// color and depth (see the parallel module).
#[derive(Clone, Copy)]
pub(crate) struct FrameView {
    pixels: *mut u32,
    depth: *mut u16,
    pub width: usize,
    pub height: usize,
}

unsafe impl Send for FrameView {}
unsafe impl Sync for FrameView {}

impl FrameView {
    pub fn of(fb: &mut Framebuffer) -> Self {
        Self {
            pixels: fb.pixels.as_mut_ptr(),
            depth: fb.depth.as_mut_ptr(),
            width: fb.width,
            height: fb.height,
        }
    }

    /// # Safety
    /// `idx` must be below `width * height`.
    #[inline(always)]
    pub unsafe fn depth_at(self, idx: usize) -> u16 {
        *self.depth.add(idx)
    }

    /// # Safety
    /// `idx` must be below `width * height`.
    #[inline(always)]
    pub unsafe fn store(self, idx: usize, color: u32, depth: u16) {
        *self.pixels.add(idx) = color;
        *self.depth.add(idx) = depth;
    }

    /// Pointer into the depth buffer for vectorized loads.
    ///
    /// # Safety
    /// `idx` must be below `width * height` and loads through the pointer
    /// must stay inside the active extent.
    #[inline(always)]
    pub unsafe fn depth_ptr(self, idx: usize) -> *const u16 {
        self.depth.add(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_touches_active_extent_only() {
        let mut fb = Framebuffer::new();
        fb.set_resolution(640, 480);
        fb.clear(255, 0, 0);

        fb.set_resolution(320, 240);
        fb.clear(10, 20, 30);
        assert!(fb.pixels().iter().all(|&p| p == 0x001E140A));
        assert!(fb.depth().iter().all(|&d| d == DEPTH_CLEAR));

        // Words past the smaller extent still hold the red clear
        fb.set_resolution(640, 480);
        assert_eq!(fb.pixels()[320 * 240], 0x000000FF);
    }

    #[test]
    fn test_resolution_clamps() {
        let mut fb = Framebuffer::new();
        fb.set_resolution(0, -5);
        assert_eq!((fb.width(), fb.height()), (1, 1));
        fb.set_resolution(100_000, 100_000);
        assert_eq!((fb.width(), fb.height()), (MAX_RENDER_WIDTH, MAX_RENDER_HEIGHT));
    }

    #[test]
    fn test_draw_line_depth_conditional() {
        let mut fb = Framebuffer::new();
        fb.set_resolution(64, 64);
        fb.clear(0, 0, 0);

        fb.draw_line(0.0, 10.0, 63.0, 10.0, Color::RED, 100);
        let idx = 10 * 64 + 5;
        assert_eq!(fb.pixels()[idx], 0xFF0000FF);
        assert_eq!(fb.depth()[idx], 100);

        // A farther line must not overwrite
        fb.draw_line(0.0, 10.0, 63.0, 10.0, Color::GREEN, 200);
        assert_eq!(fb.pixels()[idx], 0xFF0000FF);

        // An equal-depth line wins (<= test)
        fb.draw_line(0.0, 10.0, 63.0, 10.0, Color::BLUE, 100);
        assert_eq!(fb.pixels()[idx], 0xFFFF0000);
    }

    #[test]
    fn test_render_point_always_on_top() {
        let mut fb = Framebuffer::new();
        fb.set_resolution(32, 32);
        fb.clear(0, 0, 0);
        fb.draw_line(16.0, 16.0, 16.0, 16.0, Color::RED, 0);

        fb.render_point(16.0, 16.0, 0xFF00FF00, 3);
        let idx = 16 * 32 + 16;
        assert_eq!(fb.pixels()[idx], 0xFF00FF00);
        assert_eq!(fb.depth()[idx], 0);
    }

    #[test]
    fn test_points_batch_rejects_and_bias() {
        let mut fb = Framebuffer::new();
        fb.set_resolution(64, 64);
        fb.clear(0, 0, 0);

        // z = 0 maps to round(0.5 * 65534) - 1
        let data = [
            0.0, 0.0, 0.0, 255.0, 0.0, 0.0, // center point
            2.0, 0.0, 0.0, 0.0, 255.0, 0.0, // outside NDC x, skipped
            0.5, 0.0, -3.0, 0.0, 0.0, 255.0, // z outside NDC: drawn, depth clamps to 0
        ];
        fb.render_points_batch(&data, &[0, 1, 2], &Mat4::IDENTITY, 1);

        let idx = 32 * 64 + 32;
        assert_eq!(fb.pixels()[idx], 0xFF0000FF);
        assert_eq!(fb.depth()[idx], 32766);

        // Only x/y are bounds-checked: the third point lands on-screen with
        // its depth clamped at the near end of the u16 range
        let far_z = 32 * 64 + 48;
        assert_eq!(fb.pixels()[far_z], 0xFFFF0000);
        assert_eq!(fb.depth()[far_z], 0);

        let drawn = fb.pixels().iter().filter(|&&p| p != 0).count();
        assert_eq!(drawn, 2);
    }
}
