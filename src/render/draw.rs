//! Innermost rasterisers.
//!
//! All three drawers share one contract: a 16.16 fixed-point texture
//! coordinate generator (start + per-step increment), a destination run
//! (`start..=end`, empty runs are a no-op) and a prepared [`Blend`].
//! Texture reads wrap through the power-of-two mask — the accumulators
//! are free to overflow, `wrapping_add` keeps the sampled index well
//! defined.
//!
//! The sloped-span drawer is the odd one out: linear stepping is only
//! valid at constant depth, so it recomputes exact (u, v) from 1/z at
//! every 16-pixel anchor and lerps between anchors — one divide per
//! sixteen pixels instead of one per pixel.

use crate::render::pixel::{Blend, PixelFormat};

/// One vertical wall run.  `tex_row` is the pre-shifted u-strip offset;
/// `yfrac` walks v down the column.
pub(crate) struct ColumnJob {
    pub x: i32,
    pub y1: i32,
    pub y2: i32,
    pub yfrac: u32,
    pub ystep: u32,
    pub tex_row: u32,
    pub blend: Blend,
}

pub(crate) fn draw_column<P: PixelFormat>(
    job: &ColumnJob,
    dest: &mut [P::Texel],
    stride: usize,
    tex: &[P::Texel],
    mask: u32,
) {
    let count = job.y2 - job.y1 + 1;
    if count <= 0 {
        return;
    }

    let mut yfrac = job.yfrac;
    let mut idx = job.y1 as usize * stride + job.x as usize;

    for _ in 0..count {
        let texel = tex[(job.tex_row + ((yfrac >> 16) & mask)) as usize];
        dest[idx] = P::shade_texel(texel, &job.blend);
        idx += stride;
        yfrac = yfrac.wrapping_add(job.ystep);
    }
}

/// One horizontal flat run at constant depth; u and v both step per pixel.
pub(crate) struct SpanJob {
    pub x1: i32,
    pub x2: i32,
    pub y: i32,
    pub ufrac: u32,
    pub vfrac: u32,
    pub ustep: u32,
    pub vstep: u32,
    pub blend: Blend,
}

pub(crate) fn draw_span<P: PixelFormat>(
    job: &SpanJob,
    dest: &mut [P::Texel],
    stride: usize,
    tex: &[P::Texel],
    mask: u32,
    shift: u32,
) {
    let count = job.x2 - job.x1 + 1;
    if count <= 0 {
        return;
    }

    let mut u = job.ufrac;
    let mut v = job.vfrac;
    let row = &mut dest[job.y as usize * stride + job.x1 as usize..];

    for px in &mut row[..count as usize] {
        let texel = tex[((((u >> 16) & mask) << shift) + ((v >> 16) & mask)) as usize];
        *px = P::shade_texel(texel, &job.blend);
        u = u.wrapping_add(job.ustep);
        v = v.wrapping_add(job.vstep);
    }
}

/// One horizontal run over a tilted flat: (u/z, v/z, 1/z) step linearly,
/// the channel multipliers interpolate in 16.16 across the run.
pub(crate) struct SlopeSpanJob {
    pub x1: i32,
    pub x2: i32,
    pub y: i32,
    pub iu: f32,
    pub iv: f32,
    pub id: f32,
    pub iustep: f32,
    pub ivstep: f32,
    pub idstep: f32,
    pub rfrac: i32,
    pub gfrac: i32,
    pub bfrac: i32,
    pub rstep: i32,
    pub gstep: i32,
    pub bstep: i32,
}

/// Pixels per true-perspective anchor; between anchors (u, v) is linear.
const SPANJUMP: i32 = 16;

pub(crate) fn draw_sloped_span<P: PixelFormat>(
    job: &SlopeSpanJob,
    dest: &mut [P::Texel],
    stride: usize,
    tex: &[P::Texel],
    mask: u32,
    shift: u32,
) {
    let mut count = job.x2 - job.x1 + 1;
    if count <= 0 {
        return;
    }

    let mut iu = job.iu;
    let mut iv = job.iv;
    let mut id = job.id;
    let mut r = job.rfrac;
    let mut g = job.gfrac;
    let mut b = job.bfrac;

    let mut idx = job.y as usize * stride + job.x1 as usize;

    let mut chunk = |len: i32,
                     iu: &mut f32,
                     iv: &mut f32,
                     id: &mut f32,
                     r: &mut i32,
                     g: &mut i32,
                     b: &mut i32,
                     idx: &mut usize| {
        let mul_start = 65536.0 / *id;
        *id += job.idstep * len as f32;
        let mul_end = 65536.0 / *id;

        let u_start = *iu * mul_start;
        let v_start = *iv * mul_start;
        *iu += job.iustep * len as f32;
        *iv += job.ivstep * len as f32;
        let u_end = *iu * mul_end;
        let v_end = *iv * mul_end;

        let mut ufrac = u_start as i32;
        let mut vfrac = v_start as i32;
        let ustep = ((u_end - u_start) / len as f32) as i32;
        let vstep = ((v_end - v_start) / len as f32) as i32;

        for _ in 0..len {
            let u = ((ufrac as u32 >> 16) & mask) as usize;
            let v = ((vfrac as u32 >> 16) & mask) as usize;
            let texel = tex[(v << shift as usize) + u];

            let blend = Blend {
                r: (*r >> 16) as u16,
                g: (*g >> 16) as u16,
                b: (*b >> 16) as u16,
                fog_add: 0,
            };
            dest[*idx] = P::shade_texel(texel, &blend);
            *idx += 1;

            ufrac = ufrac.wrapping_add(ustep);
            vfrac = vfrac.wrapping_add(vstep);
            *r = r.wrapping_add(job.rstep);
            *g = g.wrapping_add(job.gstep);
            *b = b.wrapping_add(job.bstep);
        }
    };

    while count >= SPANJUMP {
        chunk(
            SPANJUMP, &mut iu, &mut iv, &mut id, &mut r, &mut g, &mut b, &mut idx,
        );
        count -= SPANJUMP;
    }
    if count > 0 {
        chunk(
            count, &mut iu, &mut iv, &mut id, &mut r, &mut g, &mut b, &mut idx,
        );
    }
}
