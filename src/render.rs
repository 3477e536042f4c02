//! Triangle front-end and the edge-function rasterizer
//!
//! Triangles walk an integer bounding box with incrementally stepped edge
//! functions, four pixels per step on the untextured fast path. Textured
//! pixels divide the interpolated UV by the interpolated affine factor,
//! which is what makes textures swim.

use crate::framebuffer::{Framebuffer, FrameView};
use crate::math::{max3, min3};
use crate::types::{pack_abgr, ProcessedVertex, TextureRef, TextureStore};
use crate::vertex::{light_scalar, FrameInputs, VertexCache};

#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

/// 8x8 Bayer threshold matrix
pub(crate) const DITHER_MATRIX: [[i8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// Triangles with less than this much doubled area are degenerate
const AREA_EPSILON: f32 = 1e-4;

/// Rasterize the active triangle list in input order.
/// The vertex cache is invalidated at the start of every call.
pub(crate) fn render_triangles(
    fb: &mut Framebuffer,
    cache: &mut VertexCache,
    inputs: &FrameInputs,
    indices: &[u32],
    textures: &TextureStore,
) {
    cache.invalidate(inputs.vertex_count());
    let texture = textures.resolve_current(inputs.settings.texturing);
    let view = FrameView::of(fb);
    let vertex_count = inputs.vertex_count();

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
            continue;
        }
        let v0 = cache.fetch(inputs, i0);
        let v1 = cache.fetch(inputs, i1);
        let v2 = cache.fetch(inputs, i2);
        draw_triangle(view, inputs, texture, v0, v1, v2);
    }
}

/// Per-triangle front end: whole-triangle NDC depth reject, facing
/// determination, flat/smooth light resolution, then rasterization.
/// Geometry is always drawn double-sided; facing only flips the normals
/// that feed the light calculation.
pub(crate) fn draw_triangle(
    view: FrameView,
    inputs: &FrameInputs,
    texture: Option<TextureRef>,
    mut v0: ProcessedVertex,
    mut v1: ProcessedVertex,
    mut v2: ProcessedVertex,
) {
    // No clipping: any vertex off the depth range rejects the whole triangle
    if v0.depth < -1.0 || v1.depth < -1.0 || v2.depth < -1.0 {
        return;
    }
    if v0.depth > 1.0 || v1.depth > 1.0 || v2.depth > 1.0 {
        return;
    }

    // Screen-space winding; the sign convention follows the Y-flipped viewport
    let edge1 = v1.screen - v0.screen;
    let edge2 = v2.screen - v0.screen;
    let cross_z = edge1.x * edge2.y - edge1.y * edge2.x;
    let backfacing = cross_z >= 0.0;

    let settings = inputs.settings;
    if settings.lighting {
        if settings.smooth_shading {
            if backfacing {
                v0.normal = v0.normal * -1.0;
                v1.normal = v1.normal * -1.0;
                v2.normal = v2.normal * -1.0;
            }
            v0.light = light_scalar(v0.normal, inputs.light, settings.ambient_light);
            v1.light = light_scalar(v1.normal, inputs.light, settings.ambient_light);
            v2.light = light_scalar(v2.normal, inputs.light, settings.ambient_light);
        } else {
            let mut face_normal = (v1.world - v0.world).cross(v2.world - v0.world).normalize();
            if backfacing {
                face_normal = face_normal * -1.0;
            }
            let face_light = light_scalar(face_normal, inputs.light, settings.ambient_light);
            v0.light = face_light;
            v1.light = face_light;
            v2.light = face_light;
        }
    }

    rasterize_triangle(view, &v0, &v1, &v2, texture, settings.dithering);
}

/// Per-vertex attributes laid out for interpolation
struct TriAttribs {
    d: [f32; 3],
    // Colors pre-multiplied with each vertex's light scalar
    r: [f32; 3],
    g: [f32; 3],
    b: [f32; 3],
    u: [f32; 3],
    v: [f32; 3],
    aff: [f32; 3],
}

impl TriAttribs {
    fn new(v0: &ProcessedVertex, v1: &ProcessedVertex, v2: &ProcessedVertex) -> Self {
        Self {
            d: [v0.depth, v1.depth, v2.depth],
            r: [v0.r * v0.light, v1.r * v1.light, v2.r * v2.light],
            g: [v0.g * v0.light, v1.g * v1.light, v2.g * v2.light],
            b: [v0.b * v0.light, v1.b * v1.light, v2.b * v2.light],
            u: [v0.u, v1.u, v2.u],
            v: [v0.v, v1.v, v2.v],
            aff: [v0.affine, v1.affine, v2.affine],
        }
    }
}

#[inline(always)]
fn inside(w0: f32, w1: f32, w2: f32) -> bool {
    // Accepts both windings without vertex swaps
    (w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0) || (w0 <= 0.0 && w1 <= 0.0 && w2 <= 0.0)
}

#[inline(always)]
fn dither_amount(x: i32, y: i32) -> i32 {
    let threshold = DITHER_MATRIX[(y & 7) as usize][(x & 7) as usize] as i32;
    (threshold - 32) >> 2
}

/// Ordered-dither quantization to 5 bits per channel
#[inline(always)]
fn quantize_channel(c: f32, amt: i32) -> u32 {
    ((((c + amt as f32) as i32) >> 3) << 3).clamp(0, 255) as u32
}

fn rasterize_triangle(
    view: FrameView,
    v0: &ProcessedVertex,
    v1: &ProcessedVertex,
    v2: &ProcessedVertex,
    texture: Option<TextureRef>,
    dithering: bool,
) {
    let width = view.width as i32;
    let height = view.height as i32;

    let (x0, y0) = (v0.screen.x, v0.screen.y);
    let (x1, y1) = (v1.screen.x, v1.screen.y);
    let (x2, y2) = (v2.screen.x, v2.screen.y);

    let min_x = (min3(x0, x1, x2) as i32).max(0);
    let max_x = ((max3(x0, x1, x2) as i32) + 1).min(width - 1);
    let min_y = (min3(y0, y1, y2) as i32).max(0);
    let max_y = ((max3(y0, y1, y2) as i32) + 1).min(height - 1);
    if min_x > max_x || min_y > max_y {
        return;
    }

    // Edge function coefficients; stepping one pixel right adds A, one row
    // down adds B
    let a01 = y0 - y1;
    let b01 = x1 - x0;
    let a12 = y1 - y2;
    let b12 = x2 - x1;
    let a20 = y2 - y0;
    let b20 = x0 - x2;

    // Doubled signed area; the sign carries the winding through inv_area
    let area = a01 * (x2 - x0) + b01 * (y2 - y0);
    if area.abs() < AREA_EPSILON {
        return;
    }
    let inv_area = 1.0 / area;

    // Edge values sampled at the first pixel center
    let px = min_x as f32 + 0.5;
    let py = min_y as f32 + 0.5;
    let mut w0_row = a12 * (px - x1) + b12 * (py - y1);
    let mut w1_row = a20 * (px - x2) + b20 * (py - y2);
    let mut w2_row = a01 * (px - x0) + b01 * (py - y0);

    let attr = TriAttribs::new(v0, v1, v2);

    #[cfg(target_arch = "x86_64")]
    let quad = unsafe { QuadSetup::new(&attr, a12, a20, a01, inv_area) };

    for y in min_y..=max_y {
        let mut w0 = w0_row;
        let mut w1 = w1_row;
        let mut w2 = w2_row;
        let y_off = y as usize * view.width;
        let mut x = min_x;

        if let Some(tex) = texture {
            while x <= max_x {
                if inside(w0, w1, w2) {
                    unsafe {
                        shade_pixel_textured(
                            view,
                            &attr,
                            tex,
                            y_off + x as usize,
                            x,
                            y,
                            w0 * inv_area,
                            w1 * inv_area,
                            w2 * inv_area,
                            dithering,
                        );
                    }
                }
                w0 += a12;
                w1 += a20;
                w2 += a01;
                x += 1;
            }
        } else {
            #[cfg(target_arch = "x86_64")]
            while x + 3 <= max_x {
                unsafe { raster_quad(view, &quad, y_off, x, y, w0, w1, w2, dithering) };
                w0 += a12 * 4.0;
                w1 += a20 * 4.0;
                w2 += a01 * 4.0;
                x += 4;
            }

            // Remaining pixels of the row (the whole row without SIMD)
            while x <= max_x {
                if inside(w0, w1, w2) {
                    unsafe {
                        shade_pixel_flat(
                            view,
                            &attr,
                            y_off + x as usize,
                            x,
                            y,
                            w0 * inv_area,
                            w1 * inv_area,
                            w2 * inv_area,
                            dithering,
                        );
                    }
                }
                w0 += a12;
                w1 += a20;
                w2 += a01;
                x += 1;
            }
        }

        w0_row += b12;
        w1_row += b20;
        w2_row += b01;
    }
}

/// Depth-test, shade and write one untextured pixel.
///
/// # Safety
/// `idx` must be inside the view's active extent.
#[inline]
unsafe fn shade_pixel_flat(
    view: FrameView,
    attr: &TriAttribs,
    idx: usize,
    x: i32,
    y: i32,
    bw0: f32,
    bw1: f32,
    bw2: f32,
    dithering: bool,
) {
    let depth_f = attr.d[0] * bw0 + attr.d[1] * bw1 + attr.d[2] * bw2;
    let depth = ((depth_f + 1.0) * 32767.5) as u16;
    if depth >= view.depth_at(idx) {
        return;
    }

    let cr = attr.r[0] * bw0 + attr.r[1] * bw1 + attr.r[2] * bw2;
    let cg = attr.g[0] * bw0 + attr.g[1] * bw1 + attr.g[2] * bw2;
    let cb = attr.b[0] * bw0 + attr.b[1] * bw1 + attr.b[2] * bw2;

    let (r, g, b) = finish_channels(cr, cg, cb, x, y, dithering);
    view.store(idx, pack_abgr(r, g, b), depth);
}

/// Depth-test, sample, modulate and write one textured pixel. The per-pixel
/// affine divide (instead of a perspective divide) is the warp.
///
/// # Safety
/// `idx` must be inside the view's active extent.
#[inline]
#[allow(clippy::too_many_arguments)]
unsafe fn shade_pixel_textured(
    view: FrameView,
    attr: &TriAttribs,
    tex: TextureRef,
    idx: usize,
    x: i32,
    y: i32,
    bw0: f32,
    bw1: f32,
    bw2: f32,
    dithering: bool,
) {
    let depth_f = attr.d[0] * bw0 + attr.d[1] * bw1 + attr.d[2] * bw2;
    let depth = ((depth_f + 1.0) * 32767.5) as u16;
    if depth >= view.depth_at(idx) {
        return;
    }

    let u_aff = attr.u[0] * bw0 + attr.u[1] * bw1 + attr.u[2] * bw2;
    let v_aff = attr.v[0] * bw0 + attr.v[1] * bw1 + attr.v[2] * bw2;
    let affine = attr.aff[0] * bw0 + attr.aff[1] * bw1 + attr.aff[2] * bw2;

    let mut tu = u_aff / affine;
    let mut tv = v_aff / affine;
    tu -= tu.floor();
    tv -= tv.floor();

    let tw = tex.width;
    let th = tex.height;
    // V flipped: image row 0 is the top of the texture
    let mut tx = (tu * tw as f32) as i32;
    let mut ty = ((1.0 - tv) * th as f32) as i32;
    tx = ((tx % tw) + tw) % tw;
    ty = ((ty % th) + th) % th;

    let off = (ty * tw + tx) as usize * 4;
    let tex_r = tex.data[off] as f32;
    let tex_g = tex.data[off + 1] as f32;
    let tex_b = tex.data[off + 2] as f32;

    let lit_r = attr.r[0] * bw0 + attr.r[1] * bw1 + attr.r[2] * bw2;
    let lit_g = attr.g[0] * bw0 + attr.g[1] * bw1 + attr.g[2] * bw2;
    let lit_b = attr.b[0] * bw0 + attr.b[1] * bw1 + attr.b[2] * bw2;

    let cr = tex_r * lit_r / 255.0;
    let cg = tex_g * lit_g / 255.0;
    let cb = tex_b * lit_b / 255.0;

    let (r, g, b) = finish_channels(cr, cg, cb, x, y, dithering);
    view.store(idx, pack_abgr(r, g, b), depth);
}

#[inline(always)]
fn finish_channels(cr: f32, cg: f32, cb: f32, x: i32, y: i32, dithering: bool) -> (u32, u32, u32) {
    if dithering {
        let amt = dither_amount(x, y);
        (
            quantize_channel(cr, amt),
            quantize_channel(cg, amt),
            quantize_channel(cb, amt),
        )
    } else {
        (
            cr.clamp(0.0, 255.0) as u32,
            cg.clamp(0.0, 255.0) as u32,
            cb.clamp(0.0, 255.0) as u32,
        )
    }
}

/// Per-triangle SIMD constants for the 4-wide quad stamp
#[cfg(target_arch = "x86_64")]
struct QuadSetup {
    offs0: __m128,
    offs1: __m128,
    offs2: __m128,
    inv_area: __m128,
    one: __m128,
    depth_scale: __m128,
    d0: __m128,
    d1: __m128,
    d2: __m128,
    r0: __m128,
    r1: __m128,
    r2: __m128,
    g0: __m128,
    g1: __m128,
    g2: __m128,
    b0: __m128,
    b1: __m128,
    b2: __m128,
}

#[cfg(target_arch = "x86_64")]
impl QuadSetup {
    unsafe fn new(attr: &TriAttribs, a12: f32, a20: f32, a01: f32, inv_area: f32) -> Self {
        Self {
            offs0: _mm_setr_ps(0.0, a12, a12 * 2.0, a12 * 3.0),
            offs1: _mm_setr_ps(0.0, a20, a20 * 2.0, a20 * 3.0),
            offs2: _mm_setr_ps(0.0, a01, a01 * 2.0, a01 * 3.0),
            inv_area: _mm_set1_ps(inv_area),
            one: _mm_set1_ps(1.0),
            depth_scale: _mm_set1_ps(32767.5),
            d0: _mm_set1_ps(attr.d[0]),
            d1: _mm_set1_ps(attr.d[1]),
            d2: _mm_set1_ps(attr.d[2]),
            r0: _mm_set1_ps(attr.r[0]),
            r1: _mm_set1_ps(attr.r[1]),
            r2: _mm_set1_ps(attr.r[2]),
            g0: _mm_set1_ps(attr.g[0]),
            g1: _mm_set1_ps(attr.g[1]),
            g2: _mm_set1_ps(attr.g[2]),
            b0: _mm_set1_ps(attr.b[0]),
            b1: _mm_set1_ps(attr.b[1]),
            b2: _mm_set1_ps(attr.b[2]),
        }
    }
}

#[cfg(target_arch = "x86_64")]
#[inline]
fn interp(q0: __m128, q1: __m128, q2: __m128, bw0: __m128, bw1: __m128, bw2: __m128) -> __m128 {
    unsafe {
        _mm_add_ps(
            _mm_add_ps(_mm_mul_ps(bw0, q0), _mm_mul_ps(bw1, q1)),
            _mm_mul_ps(bw2, q2),
        )
    }
}

/// Evaluate and write a 4-pixel quad: lane inside masks, barycentrics,
/// interpolated depth against the gathered depth words, interpolated color,
/// per-lane write-back where the combined mask is set.
///
/// # Safety
/// All four pixels `y_off + x .. y_off + x + 3` must be inside the view's
/// active extent (the caller's loop bound guarantees it).
#[cfg(target_arch = "x86_64")]
#[allow(clippy::too_many_arguments)]
unsafe fn raster_quad(
    view: FrameView,
    q: &QuadSetup,
    y_off: usize,
    x: i32,
    y: i32,
    w0: f32,
    w1: f32,
    w2: f32,
    dithering: bool,
) {
    let sw0 = _mm_add_ps(_mm_set1_ps(w0), q.offs0);
    let sw1 = _mm_add_ps(_mm_set1_ps(w1), q.offs1);
    let sw2 = _mm_add_ps(_mm_set1_ps(w2), q.offs2);

    // Inside when all edge values share a sign, per lane
    let zero = _mm_setzero_ps();
    let all_ge = _mm_and_ps(
        _mm_and_ps(_mm_cmpge_ps(sw0, zero), _mm_cmpge_ps(sw1, zero)),
        _mm_cmpge_ps(sw2, zero),
    );
    let all_le = _mm_and_ps(
        _mm_and_ps(_mm_cmple_ps(sw0, zero), _mm_cmple_ps(sw1, zero)),
        _mm_cmple_ps(sw2, zero),
    );
    let inside = _mm_or_ps(all_ge, all_le);
    if _mm_movemask_ps(inside) == 0 {
        return;
    }

    let bw0 = _mm_mul_ps(sw0, q.inv_area);
    let bw1 = _mm_mul_ps(sw1, q.inv_area);
    let bw2 = _mm_mul_ps(sw2, q.inv_area);

    // Interpolated depth, scaled into the triangle path's u16 range
    let depth_f = interp(q.d0, q.d1, q.d2, bw0, bw1, bw2);
    let depth_i = _mm_cvttps_epi32(_mm_mul_ps(_mm_add_ps(depth_f, q.one), q.depth_scale));

    // Gather the four current depth words and widen for the compare
    let idx = y_off + x as usize;
    let old = _mm_loadl_epi64(view.depth_ptr(idx) as *const __m128i);
    let old_wide = _mm_unpacklo_epi16(old, _mm_setzero_si128());
    let nearer = _mm_cmplt_epi32(depth_i, old_wide);

    let write_mask = _mm_movemask_ps(_mm_and_ps(inside, _mm_castsi128_ps(nearer)));
    if write_mask == 0 {
        return;
    }

    let cr = interp(q.r0, q.r1, q.r2, bw0, bw1, bw2);
    let cg = interp(q.g0, q.g1, q.g2, bw0, bw1, bw2);
    let cb = interp(q.b0, q.b1, q.b2, bw0, bw1, bw2);

    let mut depth_arr = [0i32; 4];
    let mut r_arr = [0f32; 4];
    let mut g_arr = [0f32; 4];
    let mut b_arr = [0f32; 4];
    _mm_storeu_si128(depth_arr.as_mut_ptr() as *mut __m128i, depth_i);
    _mm_storeu_ps(r_arr.as_mut_ptr(), cr);
    _mm_storeu_ps(g_arr.as_mut_ptr(), cg);
    _mm_storeu_ps(b_arr.as_mut_ptr(), cb);

    for lane in 0..4 {
        if write_mask & (1 << lane) == 0 {
            continue;
        }
        let (r, g, b) = finish_channels(
            r_arr[lane],
            g_arr[lane],
            b_arr[lane],
            x + lane as i32,
            y,
            dithering,
        );
        view.store(idx + lane, pack_abgr(r, g, b), depth_arr[lane] as u16);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Mat4;
    use crate::types::{Light, RasterSettings};

    fn flat_settings() -> RasterSettings {
        RasterSettings {
            lighting: false,
            dithering: false,
            texturing: false,
            vertex_snapping: false,
            ..RasterSettings::default()
        }
    }

    fn ndc_vertex(x: f32, y: f32, z: f32, r: f32, g: f32, b: f32) -> [f32; 12] {
        [x, y, z, 0.0, 0.0, -1.0, 0.0, 0.0, r, g, b, 255.0]
    }

    fn render(
        fb: &mut Framebuffer,
        vertices: &[f32],
        indices: &[u32],
        settings: &RasterSettings,
    ) {
        let mvp = Mat4::IDENTITY;
        let model = Mat4::IDENTITY;
        let light = Light::default();
        let inputs = FrameInputs {
            vertices,
            mvp: &mvp,
            model: &model,
            light: &light,
            settings,
            width: fb.width(),
            height: fb.height(),
        };
        let mut cache = VertexCache::new();
        let textures = TextureStore::new();
        render_triangles(fb, &mut cache, &inputs, indices, &textures);
    }

    #[test]
    fn test_both_windings_fill() {
        let settings = flat_settings();
        let mut verts = Vec::new();
        verts.extend_from_slice(&ndc_vertex(-1.0, -1.0, 0.0, 255.0, 0.0, 0.0));
        verts.extend_from_slice(&ndc_vertex(1.0, -1.0, 0.0, 255.0, 0.0, 0.0));
        verts.extend_from_slice(&ndc_vertex(0.0, 1.0, 0.0, 255.0, 0.0, 0.0));

        let mut fb_ccw = Framebuffer::new();
        fb_ccw.set_resolution(64, 64);
        fb_ccw.clear(0, 0, 0);
        render(&mut fb_ccw, &verts, &[0, 1, 2], &settings);

        let mut fb_cw = Framebuffer::new();
        fb_cw.set_resolution(64, 64);
        fb_cw.clear(0, 0, 0);
        render(&mut fb_cw, &verts, &[0, 2, 1], &settings);

        let filled_ccw = fb_ccw.pixels().iter().filter(|&&p| p != 0).count();
        let filled_cw = fb_cw.pixels().iter().filter(|&&p| p != 0).count();
        assert!(filled_ccw > 0);
        assert_eq!(filled_ccw, filled_cw, "winding must not affect coverage");
        // Center pixel is solid red
        assert_eq!(fb_ccw.pixels()[32 * 64 + 32], 0xFF0000FF);
    }

    #[test]
    fn test_degenerate_triangle_skipped() {
        let settings = flat_settings();
        let mut verts = Vec::new();
        // Three collinear points
        verts.extend_from_slice(&ndc_vertex(-0.5, 0.0, 0.0, 255.0, 255.0, 255.0));
        verts.extend_from_slice(&ndc_vertex(0.0, 0.0, 0.0, 255.0, 255.0, 255.0));
        verts.extend_from_slice(&ndc_vertex(0.5, 0.0, 0.0, 255.0, 255.0, 255.0));

        let mut fb = Framebuffer::new();
        fb.set_resolution(64, 64);
        fb.clear(0, 0, 0);
        render(&mut fb, &verts, &[0, 1, 2], &settings);
        assert!(fb.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_depth_out_of_range_rejects_whole_triangle() {
        let settings = flat_settings();
        let mut verts = Vec::new();
        verts.extend_from_slice(&ndc_vertex(-0.8, -0.8, 0.0, 255.0, 0.0, 0.0));
        verts.extend_from_slice(&ndc_vertex(0.8, -0.8, 0.0, 255.0, 0.0, 0.0));
        // One vertex past the far plane kills the triangle, no clipping
        verts.extend_from_slice(&ndc_vertex(0.0, 0.8, 1.5, 255.0, 0.0, 0.0));

        let mut fb = Framebuffer::new();
        fb.set_resolution(64, 64);
        fb.clear(0, 0, 0);
        render(&mut fb, &verts, &[0, 1, 2], &settings);
        assert!(fb.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_dither_masks_low_bits() {
        let mut settings = flat_settings();
        settings.dithering = true;
        let mut verts = Vec::new();
        verts.extend_from_slice(&ndc_vertex(-1.0, -1.0, 0.0, 128.0, 128.0, 128.0));
        verts.extend_from_slice(&ndc_vertex(1.0, -1.0, 0.0, 128.0, 128.0, 128.0));
        verts.extend_from_slice(&ndc_vertex(0.0, 1.0, 0.0, 128.0, 128.0, 128.0));

        let mut fb = Framebuffer::new();
        fb.set_resolution(64, 64);
        fb.clear(0, 0, 0);
        render(&mut fb, &verts, &[0, 1, 2], &settings);

        let mut written = 0;
        for &p in fb.pixels() {
            if p >> 24 != 0xFF {
                continue;
            }
            written += 1;
            for ch in [p & 0xFF, (p >> 8) & 0xFF, (p >> 16) & 0xFF] {
                assert_eq!(ch & 0x7, 0, "channel {:#x} has low bits set", ch);
                assert!(
                    ch == 120 || ch == 128 || ch == 136,
                    "mid-gray dithered to unexpected {}",
                    ch
                );
            }
        }
        assert!(written > 500, "expected a large filled area, got {}", written);
    }
}
