//! Bytecode-interpreted material baker
//!
//! A fixed-depth stack machine evaluates a compiled opcode stream once per
//! texel and writes an RGBA texture. The inner loop steps four texels along
//! U at a time, mirroring the rasterizer's quad stamp; ops are arithmetic
//! over integer channel lanes and auto-vectorize. All noise sources hash the
//! integer lattice with a fixed multiplier chain so output is
//! byte-deterministic across runs and platforms.

use crate::types::{RampStop, TextureRef, TextureStore};
use crate::{MAX_BAKE_PROGRAM_SIZE, MAX_COLOR_RAMP_STOPS, MAX_TEXTURE_SIZE};

pub const OP_FLAT_COLOR: u8 = 0;
pub const OP_SAMPLE_TEXTURE: u8 = 1;
pub const OP_MIX_MULTIPLY: u8 = 2;
pub const OP_MIX_ADD: u8 = 3;
pub const OP_MIX_LERP: u8 = 4;
pub const OP_COLOR_RAMP: u8 = 5;
pub const OP_VORONOI: u8 = 6;
pub const OP_ALPHA_CUTOFF: u8 = 7;
pub const OP_NOISE: u8 = 8;
pub const OP_END: u8 = 255;

/// Largest bake extent per axis (output fits MAX_TEXTURE_SIZE)
pub const MAX_BAKE_EXTENT: i32 = 512;

const STACK_DEPTH: usize = 8;
const LANES: usize = 4;

/// Baker inputs and output, owned by the rasterizer value
pub(crate) struct BakeState {
    pub width: i32,
    pub height: i32,
    pub source_slot: i32,
    pub program: Vec<u8>,
    pub ramp: Vec<RampStop>,
    pub ramp_count: usize,
    pub output: Vec<u8>,
}

impl BakeState {
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            source_slot: -1,
            program: vec![0; MAX_BAKE_PROGRAM_SIZE],
            ramp: vec![RampStop::default(); MAX_COLOR_RAMP_STOPS],
            ramp_count: 0,
            output: vec![0; MAX_TEXTURE_SIZE],
        }
    }

    pub fn set_params(&mut self, width: i32, height: i32, source_slot: i32) {
        let w = width.clamp(1, MAX_BAKE_EXTENT);
        let h = height.clamp(1, MAX_BAKE_EXTENT);
        if w != width || h != height {
            log::warn!("bake extent {}x{} out of range, clamped to {}x{}", width, height, w, h);
        }
        self.width = w;
        self.height = h;
        self.source_slot = source_slot;
    }

    pub fn set_ramp_count(&mut self, count: usize) {
        self.ramp_count = count.min(MAX_COLOR_RAMP_STOPS);
    }
}

/// Four texels' worth of RGBA, one integer per channel per lane
#[derive(Clone, Copy, Default)]
struct LaneRgba {
    r: [i32; LANES],
    g: [i32; LANES],
    b: [i32; LANES],
    a: [i32; LANES],
}

impl LaneRgba {
    fn splat(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: [r as i32; LANES],
            g: [g as i32; LANES],
            b: [b as i32; LANES],
            a: [a as i32; LANES],
        }
    }

    fn grayscale(values: [i32; LANES]) -> Self {
        Self {
            r: values,
            g: values,
            b: values,
            a: [255; LANES],
        }
    }

    /// Apply a binary op channel-wise across all lanes
    fn zip(self, other: Self, f: impl Fn(i32, i32) -> i32) -> Self {
        let mut out = Self::default();
        for i in 0..LANES {
            out.r[i] = f(self.r[i], other.r[i]);
            out.g[i] = f(self.g[i], other.g[i]);
            out.b[i] = f(self.b[i], other.b[i]);
            out.a[i] = f(self.a[i], other.a[i]);
        }
        out
    }
}

/// Fixed-depth operand stack; push on a full stack drops the value,
/// pop on an empty stack is reported so the caller can skip the op
struct LaneStack {
    items: [LaneRgba; STACK_DEPTH],
    len: usize,
}

impl LaneStack {
    fn new() -> Self {
        Self {
            items: [LaneRgba::default(); STACK_DEPTH],
            len: 0,
        }
    }

    fn push(&mut self, value: LaneRgba) {
        if self.len == STACK_DEPTH {
            log::warn!("bake stack overflow, value dropped");
            return;
        }
        self.items[self.len] = value;
        self.len += 1;
    }

    fn pop(&mut self) -> Option<LaneRgba> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(self.items[self.len])
    }

    fn top_mut(&mut self) -> Option<&mut LaneRgba> {
        if self.len == 0 {
            return None;
        }
        Some(&mut self.items[self.len - 1])
    }
}

/// Integer lattice hash shared by Voronoi and both noise modes.
/// The multiplier chain is part of the output contract; golden-image tests
/// depend on it.
fn hash(cx: i32, cy: i32) -> u32 {
    let h = (cx as u32)
        .wrapping_mul(374_761_393)
        .wrapping_add((cy as u32).wrapping_mul(668_265_263));
    (h ^ (h >> 13)).wrapping_mul(1_274_126_177)
}

fn smoothstep(f: f32) -> f32 {
    f * f * (3.0 - 2.0 * f)
}

fn lattice_value(ix: i32, iy: i32) -> f32 {
    (hash(ix, iy) & 0xFFFF) as f32 / 65535.0
}

fn value_noise(x: f32, y: f32) -> f32 {
    let ix = x.floor() as i32;
    let iy = y.floor() as i32;
    let fx = x - x.floor();
    let fy = y - y.floor();
    let sx = smoothstep(fx);
    let sy = smoothstep(fy);

    let v00 = lattice_value(ix, iy);
    let v10 = lattice_value(ix + 1, iy);
    let v01 = lattice_value(ix, iy + 1);
    let v11 = lattice_value(ix + 1, iy + 1);

    let top = v00 + (v10 - v00) * sx;
    let bottom = v01 + (v11 - v01) * sx;
    top + (bottom - top) * sy
}

fn lattice_gradient(ix: i32, iy: i32) -> (f32, f32) {
    let h = hash(ix, iy);
    let gx = (h & 0xFFFF) as f32 / 65535.0 * 2.0 - 1.0;
    let gy = ((h >> 16) & 0xFFFF) as f32 / 65535.0 * 2.0 - 1.0;
    (gx, gy)
}

/// Gradient noise on the same lattice, remapped from [-1, 1] into [0, 1]
fn gradient_noise(x: f32, y: f32) -> f32 {
    let ix = x.floor() as i32;
    let iy = y.floor() as i32;
    let fx = x - x.floor();
    let fy = y - y.floor();
    let sx = smoothstep(fx);
    let sy = smoothstep(fy);

    let dot = |cx: i32, cy: i32, ox: f32, oy: f32| {
        let (gx, gy) = lattice_gradient(cx, cy);
        gx * ox + gy * oy
    };
    let d00 = dot(ix, iy, fx, fy);
    let d10 = dot(ix + 1, iy, fx - 1.0, fy);
    let d01 = dot(ix, iy + 1, fx, fy - 1.0);
    let d11 = dot(ix + 1, iy + 1, fx - 1.0, fy - 1.0);

    let top = d00 + (d10 - d00) * sx;
    let bottom = d01 + (d11 - d01) * sx;
    let v = top + (bottom - top) * sy;
    v * 0.5 + 0.5
}

/// fBm: amplitude halves and frequency doubles per octave; the sum is
/// normalized by the accumulated amplitude
fn fbm(x: f32, y: f32, octaves: u8, gradient: bool) -> f32 {
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut sum = 0.0;
    let mut norm = 0.0;
    for _ in 0..octaves {
        let n = if gradient {
            gradient_noise(x * frequency, y * frequency)
        } else {
            value_noise(x * frequency, y * frequency)
        };
        sum += n * amplitude;
        norm += amplitude;
        amplitude *= 0.5;
        frequency *= 2.0;
    }
    sum / norm
}

/// F1/F2 over a 3x3 cell neighborhood with hashed jitter points
fn voronoi(u: f32, v: f32, scale: f32, edge_mode: bool) -> i32 {
    let px = u * scale;
    let py = v * scale;
    let cx = px.floor() as i32;
    let cy = py.floor() as i32;

    let mut f1 = f32::MAX;
    let mut f2 = f32::MAX;
    for dy in -1..=1 {
        for dx in -1..=1 {
            let gx = cx + dx;
            let gy = cy + dy;
            let mut h = hash(gx, gy);
            let rx = (h & 0xFFFF) as f32 / 65535.0;
            h = h.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let ry = (h & 0xFFFF) as f32 / 65535.0;

            let fx = gx as f32 + rx;
            let fy = gy as f32 + ry;
            let d = ((px - fx) * (px - fx) + (py - fy) * (py - fy)).sqrt();
            if d < f1 {
                f2 = f1;
                f1 = d;
            } else if d < f2 {
                f2 = d;
            }
        }
    }

    let value = if edge_mode { 1.0 - (f2 - f1) * 2.0 } else { f1 };
    (value.clamp(0.0, 1.0) * 255.0) as i32
}

/// Sample the source texture at (u, 1-v), or a magenta/black checkerboard
/// when no usable source exists
fn sample_lanes(source: Option<TextureRef>, u: &[f32; LANES], v: f32) -> LaneRgba {
    let mut out = LaneRgba::default();
    match source {
        Some(tex) => {
            let sv = 1.0 - v;
            let mut ty = (sv * tex.height as f32) as i32;
            ty = ((ty % tex.height) + tex.height) % tex.height;
            for i in 0..LANES {
                let mut tx = (u[i] * tex.width as f32) as i32;
                tx = ((tx % tex.width) + tex.width) % tex.width;
                let off = (ty * tex.width + tx) as usize * 4;
                out.r[i] = tex.data[off] as i32;
                out.g[i] = tex.data[off + 1] as i32;
                out.b[i] = tex.data[off + 2] as i32;
                out.a[i] = tex.data[off + 3] as i32;
            }
        }
        None => {
            let cell_y = (v * 8.0) as i32;
            for i in 0..LANES {
                let cell_x = (u[i] * 8.0) as i32;
                let magenta = (cell_x + cell_y) & 1 == 0;
                out.r[i] = if magenta { 255 } else { 0 };
                out.g[i] = 0;
                out.b[i] = if magenta { 255 } else { 0 };
                out.a[i] = 255;
            }
        }
    }
    out
}

/// Clamp-or-lerp lookup across ordered stops; `p` is a 0..255 factor
fn ramp_lookup(stops: &[RampStop], p: i32) -> (i32, i32, i32, i32) {
    let first = stops[0];
    let last = stops[stops.len() - 1];
    if p <= first.position as i32 {
        return (first.r as i32, first.g as i32, first.b as i32, first.a as i32);
    }
    if p >= last.position as i32 {
        return (last.r as i32, last.g as i32, last.b as i32, last.a as i32);
    }

    for pair in stops.windows(2) {
        let (low, high) = (pair[0], pair[1]);
        let lo = low.position as i32;
        let hi = high.position as i32;
        if p < lo || p > hi {
            continue;
        }
        if hi == lo {
            return (low.r as i32, low.g as i32, low.b as i32, low.a as i32);
        }
        let t = (p - lo) * 255 / (hi - lo);
        let mix = |a: i32, b: i32| (a * (255 - t) + b * t) >> 8;
        return (
            mix(low.r as i32, high.r as i32),
            mix(low.g as i32, high.g as i32),
            mix(low.b as i32, high.b as i32),
            mix(low.a as i32, high.a as i32),
        );
    }
    (last.r as i32, last.g as i32, last.b as i32, last.a as i32)
}

/// Reads operands in order, tolerating a truncated stream
struct Cursor<'a> {
    bytes: &'a [u8],
    pc: usize,
}

impl<'a> Cursor<'a> {
    fn next(&mut self) -> Option<u8> {
        let b = self.bytes.get(self.pc).copied();
        if b.is_some() {
            self.pc += 1;
        }
        b
    }
}

/// Execute the program for one 4-texel quad
fn run_program(
    program: &[u8],
    staged_ramp: &[RampStop],
    source: Option<TextureRef>,
    u: &[f32; LANES],
    v: f32,
) -> LaneRgba {
    let mut stack = LaneStack::new();
    let mut cursor = Cursor { bytes: program, pc: 0 };

    loop {
        let Some(op) = cursor.next() else {
            log::warn!("bake program missing END, terminated at stream end");
            break;
        };
        match op {
            OP_END => break,
            OP_FLAT_COLOR => {
                let (Some(r), Some(g), Some(b), Some(a)) =
                    (cursor.next(), cursor.next(), cursor.next(), cursor.next())
                else {
                    break;
                };
                stack.push(LaneRgba::splat(r, g, b, a));
            }
            OP_SAMPLE_TEXTURE => {
                stack.push(sample_lanes(source, u, v));
            }
            OP_MIX_MULTIPLY => {
                let Some(_factor) = cursor.next() else { break };
                if stack.len < 2 {
                    continue;
                }
                let top = stack.pop().unwrap_or_default();
                let under = stack.pop().unwrap_or_default();
                stack.push(under.zip(top, |a, b| (a * b) >> 8));
            }
            OP_MIX_ADD => {
                let Some(factor) = cursor.next() else { break };
                if stack.len < 2 {
                    continue;
                }
                let top = stack.pop().unwrap_or_default();
                let under = stack.pop().unwrap_or_default();
                let f = factor as i32;
                stack.push(under.zip(top, move |a, b| (a + ((b * f) >> 8)).min(255)));
            }
            OP_MIX_LERP => {
                let Some(factor) = cursor.next() else { break };
                if stack.len < 2 {
                    continue;
                }
                let top = stack.pop().unwrap_or_default();
                let under = stack.pop().unwrap_or_default();
                let f = factor as i32;
                stack.push(under.zip(top, move |a, b| (a * (255 - f) + b * f) >> 8));
            }
            OP_COLOR_RAMP => {
                let Some(stop_count) = cursor.next() else { break };
                // Inline stops travel with the opcode; a count of zero uses
                // the host-staged ramp buffer instead
                let mut inline = [RampStop::default(); MAX_COLOR_RAMP_STOPS];
                let mut inline_len = 0usize;
                let mut truncated = false;
                for i in 0..stop_count as usize {
                    let (Some(pos), Some(r), Some(g), Some(b), Some(a)) = (
                        cursor.next(),
                        cursor.next(),
                        cursor.next(),
                        cursor.next(),
                        cursor.next(),
                    ) else {
                        truncated = true;
                        break;
                    };
                    if i < MAX_COLOR_RAMP_STOPS {
                        inline[i] = RampStop { position: pos, r, g, b, a };
                        inline_len = i + 1;
                    }
                }
                if truncated {
                    break;
                }
                let stops: &[RampStop] = if inline_len > 0 {
                    &inline[..inline_len]
                } else {
                    staged_ramp
                };
                if stops.is_empty() {
                    continue;
                }
                let Some(top) = stack.top_mut() else { continue };
                for i in 0..LANES {
                    let p = top.r[i].clamp(0, 255);
                    let (r, g, b, a) = ramp_lookup(stops, p);
                    top.r[i] = r;
                    top.g[i] = g;
                    top.b[i] = b;
                    top.a[i] = a;
                }
            }
            OP_VORONOI => {
                let (Some(scale), Some(mode)) = (cursor.next(), cursor.next()) else {
                    break;
                };
                let scale = scale.max(1) as f32;
                let mut values = [0i32; LANES];
                for i in 0..LANES {
                    values[i] = voronoi(u[i], v, scale, mode == 1);
                }
                stack.push(LaneRgba::grayscale(values));
            }
            OP_ALPHA_CUTOFF => {
                let Some(threshold) = cursor.next() else { break };
                let Some(top) = stack.top_mut() else { continue };
                for i in 0..LANES {
                    top.a[i] = if top.a[i] >= threshold as i32 { 255 } else { 0 };
                }
            }
            OP_NOISE => {
                let (Some(scale), Some(octaves), Some(mode)) =
                    (cursor.next(), cursor.next(), cursor.next())
                else {
                    break;
                };
                let scale = scale.max(1) as f32;
                let octaves = octaves.clamp(1, 8);
                let mut values = [0i32; LANES];
                for i in 0..LANES {
                    let n = fbm(u[i] * scale, v * scale, octaves, mode == 1);
                    values[i] = (n.clamp(0.0, 1.0) * 255.0) as i32;
                }
                stack.push(LaneRgba::grayscale(values));
            }
            unknown => {
                log::warn!("unknown bake opcode {}, program terminated", unknown);
                break;
            }
        }
    }

    // The texel is whatever is left on top; an empty stack bakes magenta
    stack.pop().unwrap_or_else(|| LaneRgba::splat(255, 0, 255, 255))
}

/// Run the program over the bake extent and fill the output buffer
pub(crate) fn bake_material(state: &mut BakeState, textures: &TextureStore) {
    let w = state.width;
    let h = state.height;
    if w <= 0 || h <= 0 {
        log::warn!("bake_material called before set_bake_params, ignored");
        return;
    }

    let source = textures.resolve(state.source_slot);
    let staged = &state.ramp[..state.ramp_count];
    let inv_w = 1.0 / w as f32;
    let inv_h = 1.0 / h as f32;

    for y in 0..h {
        let v = (y as f32 + 0.5) * inv_h;
        let mut x = 0;
        while x < w {
            let mut u = [0f32; LANES];
            for (i, slot) in u.iter_mut().enumerate() {
                *slot = (x as f32 + i as f32 + 0.5) * inv_w;
            }
            let quad = run_program(&state.program, staged, source, &u, v);

            for lane in 0..LANES {
                let px = x + lane as i32;
                if px >= w {
                    break;
                }
                let off = (y * w + px) as usize * 4;
                state.output[off] = quad.r[lane].clamp(0, 255) as u8;
                state.output[off + 1] = quad.g[lane].clamp(0, 255) as u8;
                state.output[off + 2] = quad.b[lane].clamp(0, 255) as u8;
                state.output[off + 3] = quad.a[lane].clamp(0, 255) as u8;
            }
            x += LANES as i32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bake(program: &[u8], width: i32, height: i32) -> BakeState {
        let mut state = BakeState::new();
        state.set_params(width, height, -1);
        state.program[..program.len()].copy_from_slice(program);
        let textures = TextureStore::new();
        bake_material(&mut state, &textures);
        state
    }

    fn texel(state: &BakeState, x: i32, y: i32) -> [u8; 4] {
        let off = (y * state.width + x) as usize * 4;
        [
            state.output[off],
            state.output[off + 1],
            state.output[off + 2],
            state.output[off + 3],
        ]
    }

    #[test]
    fn test_flat_color_round_trip() {
        let state = bake(&[OP_FLAT_COLOR, 12, 34, 56, 78, OP_END], 8, 8);
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(texel(&state, x, y), [12, 34, 56, 78]);
            }
        }
    }

    #[test]
    fn test_empty_stack_bakes_magenta() {
        let state = bake(&[OP_END], 4, 4);
        assert_eq!(texel(&state, 0, 0), [255, 0, 255, 255]);
    }

    #[test]
    fn test_mix_multiply() {
        let program = [
            OP_FLAT_COLOR, 128, 128, 128, 255,
            OP_FLAT_COLOR, 255, 0, 128, 255,
            OP_MIX_MULTIPLY, 0,
            OP_END,
        ];
        let state = bake(&program, 4, 4);
        // (128*255)>>8 = 127, (128*0)>>8 = 0, (128*128)>>8 = 64
        assert_eq!(texel(&state, 0, 0), [127, 0, 64, 254]);
    }

    #[test]
    fn test_mix_add_saturates() {
        let program = [
            OP_FLAT_COLOR, 200, 10, 0, 255,
            OP_FLAT_COLOR, 200, 20, 0, 255,
            OP_MIX_ADD, 255,
            OP_END,
        ];
        let state = bake(&program, 4, 4);
        // 200 + (200*255)>>8 = 200 + 199 -> clamped 255; 10 + (20*255)>>8 = 29
        assert_eq!(texel(&state, 0, 0), [255, 29, 0, 255]);
    }

    #[test]
    fn test_mix_lerp_endpoints() {
        let program = [
            OP_FLAT_COLOR, 10, 10, 10, 255,
            OP_FLAT_COLOR, 200, 200, 200, 255,
            OP_MIX_LERP, 255,
            OP_END,
        ];
        let state = bake(&program, 4, 4);
        // Factor 255 takes (almost exactly) the top color
        let t = texel(&state, 0, 0);
        assert!(t[0] >= 199 && t[0] <= 200, "lerp(255) gave {}", t[0]);
    }

    #[test]
    fn test_underflow_skips_mix() {
        let program = [
            OP_FLAT_COLOR, 50, 60, 70, 255,
            OP_MIX_MULTIPLY, 0, // only one value on the stack
            OP_END,
        ];
        let state = bake(&program, 4, 4);
        assert_eq!(texel(&state, 0, 0), [50, 60, 70, 255]);
    }

    #[test]
    fn test_color_ramp_midpoint() {
        let program = [
            OP_FLAT_COLOR, 128, 0, 0, 255,
            OP_COLOR_RAMP, 2, //
            0, 0, 0, 0, 255, //
            255, 255, 255, 255, 255, //
            OP_END,
        ];
        let state = bake(&program, 4, 4);
        let t = texel(&state, 0, 0);
        for ch in &t[..3] {
            assert!((*ch as i32 - 128).abs() <= 1, "ramp(128) gave {}", ch);
        }
        assert_eq!(t[3], 255);
    }

    #[test]
    fn test_color_ramp_clamps_outside_stops() {
        let program = [
            OP_FLAT_COLOR, 10, 0, 0, 255,
            OP_COLOR_RAMP, 2, //
            100, 11, 22, 33, 255, //
            200, 44, 55, 66, 255, //
            OP_END,
        ];
        let state = bake(&program, 4, 4);
        assert_eq!(texel(&state, 0, 0), [11, 22, 33, 255]);
    }

    #[test]
    fn test_color_ramp_uses_staged_stops_when_inline_empty() {
        let mut state = BakeState::new();
        state.set_params(4, 4, -1);
        state.ramp[0] = RampStop { position: 0, r: 5, g: 6, b: 7, a: 255 };
        state.ramp[1] = RampStop { position: 255, r: 5, g: 6, b: 7, a: 255 };
        state.set_ramp_count(2);
        let program = [OP_FLAT_COLOR, 90, 0, 0, 255, OP_COLOR_RAMP, 0, OP_END];
        state.program[..program.len()].copy_from_slice(&program);
        let textures = TextureStore::new();
        bake_material(&mut state, &textures);
        assert_eq!(texel(&state, 0, 0), [5, 6, 7, 255]);
    }

    #[test]
    fn test_alpha_cutoff() {
        let program = [
            OP_FLAT_COLOR, 1, 2, 3, 100,
            OP_ALPHA_CUTOFF, 100,
            OP_END,
        ];
        let state = bake(&program, 4, 4);
        assert_eq!(texel(&state, 0, 0)[3], 255);

        let program = [
            OP_FLAT_COLOR, 1, 2, 3, 99,
            OP_ALPHA_CUTOFF, 100,
            OP_END,
        ];
        let state = bake(&program, 4, 4);
        assert_eq!(texel(&state, 0, 0)[3], 0);
    }

    #[test]
    fn test_sample_without_source_is_checkerboard() {
        let state = bake(&[OP_SAMPLE_TEXTURE, OP_END], 16, 16);
        // Top-left cell is magenta, the next cell along U is black
        assert_eq!(texel(&state, 0, 0), [255, 0, 255, 255]);
        assert_eq!(texel(&state, 2, 0), [0, 0, 0, 255]);
        // 16px over 8 cells: cell stride is 2 texels
        assert_eq!(texel(&state, 0, 2), [0, 0, 0, 255]);
    }

    #[test]
    fn test_sample_reads_source_slot() {
        let mut textures = TextureStore::new();
        textures.set_size(3, 2, 2);
        {
            let data = textures.slot_mut(3).unwrap();
            // 2x2: row 0 red/green, row 1 blue/white
            let texels: [[u8; 4]; 4] = [
                [255, 0, 0, 255],
                [0, 255, 0, 255],
                [0, 0, 255, 255],
                [255, 255, 255, 255],
            ];
            for (i, t) in texels.iter().enumerate() {
                data[i * 4..i * 4 + 4].copy_from_slice(t);
            }
        }

        let mut state = BakeState::new();
        state.set_params(2, 2, 3);
        let program = [OP_SAMPLE_TEXTURE, OP_END];
        state.program[..program.len()].copy_from_slice(&program);
        bake_material(&mut state, &textures);

        // V is flipped: output row 0 (v≈0.25) samples source row 1
        assert_eq!(texel(&state, 0, 0), [0, 0, 255, 255]);
        assert_eq!(texel(&state, 1, 0), [255, 255, 255, 255]);
        assert_eq!(texel(&state, 0, 1), [255, 0, 0, 255]);
    }

    #[test]
    fn test_hash_is_stable() {
        // Fixed-point of the chain: zero input stays zero
        assert_eq!(hash(0, 0), 0);
        // Determinism across calls
        assert_eq!(hash(17, -3), hash(17, -3));
        assert_ne!(hash(1, 0), hash(0, 1));
    }

    #[test]
    fn test_noise_and_voronoi_deterministic() {
        let a = bake(&[OP_NOISE, 8, 4, 0, OP_END], 32, 32);
        let b = bake(&[OP_NOISE, 8, 4, 0, OP_END], 32, 32);
        assert_eq!(&a.output[..32 * 32 * 4], &b.output[..32 * 32 * 4]);

        let grad = bake(&[OP_NOISE, 8, 4, 1, OP_END], 32, 32);
        assert_ne!(&a.output[..32 * 32 * 4], &grad.output[..32 * 32 * 4]);

        let v1 = bake(&[OP_VORONOI, 4, 0, OP_END], 32, 32);
        let v2 = bake(&[OP_VORONOI, 4, 0, OP_END], 32, 32);
        assert_eq!(&v1.output[..32 * 32 * 4], &v2.output[..32 * 32 * 4]);

        // Grayscale with opaque alpha, varying across the image
        let first = texel(&v1, 0, 0);
        assert_eq!(first[0], first[1]);
        assert_eq!(first[1], first[2]);
        assert_eq!(first[3], 255);
        let mut distinct = std::collections::HashSet::new();
        for y in 0..32 {
            for x in 0..32 {
                distinct.insert(texel(&v1, x, y)[0]);
            }
        }
        assert!(distinct.len() > 4, "voronoi output suspiciously flat");
    }

    #[test]
    fn test_unknown_opcode_terminates() {
        let state = bake(&[OP_FLAT_COLOR, 9, 9, 9, 255, 200, OP_FLAT_COLOR, 1, 1, 1, 255, OP_END], 4, 4);
        // Opcode 200 stops the program; the first color is still on top
        assert_eq!(texel(&state, 0, 0), [9, 9, 9, 255]);
    }
}
