//! Multi-threaded triangle driver
//!
//! The vertex cache is fully populated on the calling thread, then the
//! triangle list is split into contiguous ranges, one scoped worker per
//! range, all writing the shared pixel and depth buffers without locks.
//! Within a range triangles rasterize in input order; across ranges there is
//! no ordering, and two triangles touching the same pixel race with the last
//! writer winning, independently for color and depth.

use crate::framebuffer::{Framebuffer, FrameView};
use crate::render;
use crate::types::TextureStore;
use crate::vertex::{FrameInputs, VertexCache};
use crate::{MAX_THREADS, MIN_PARALLEL_TRIANGLES};

pub(crate) fn render_triangles_parallel(
    fb: &mut Framebuffer,
    cache: &mut VertexCache,
    inputs: &FrameInputs,
    indices: &[u32],
    textures: &TextureStore,
    thread_count: usize,
) {
    let triangle_count = indices.len() / 3;
    let workers = thread_count.clamp(1, MAX_THREADS).min(triangle_count.max(1));
    if workers <= 1 || triangle_count < MIN_PARALLEL_TRIANGLES {
        render::render_triangles(fb, cache, inputs, indices, textures);
        return;
    }

    let vertex_count = inputs.vertex_count();
    cache.invalidate(vertex_count);

    // Populate every referenced vertex once, single-threaded; workers then
    // read the cache without synchronization
    for &index in indices {
        if (index as usize) < vertex_count {
            cache.fetch(inputs, index as usize);
        }
    }

    let texture = textures.resolve_current(inputs.settings.texturing);
    let view = FrameView::of(fb);
    let cache = &*cache;

    let per_worker = triangle_count.div_ceil(workers);
    log::debug!(
        "parallel render: {} triangles across {} workers ({} per range)",
        triangle_count,
        workers,
        per_worker
    );

    std::thread::scope(|scope| {
        for worker in 0..workers {
            let start = worker * per_worker;
            let end = ((worker + 1) * per_worker).min(triangle_count);
            if start >= end {
                break;
            }
            let range = &indices[start * 3..end * 3];

            scope.spawn(move || {
                for tri in range.chunks_exact(3) {
                    let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
                    if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                        continue;
                    }
                    let v0 = cache.get(i0);
                    let v1 = cache.get(i1);
                    let v2 = cache.get(i2);
                    render::draw_triangle(view, inputs, texture, v0, v1, v2);
                }
            });
        }
    });
}
