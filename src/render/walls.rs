//! Wall projection and column rasterisation.
//!
//! One map line in, up to three textured strips out: a line is transformed
//! into view space (with a per-frame vertex cache so shared corners
//! transform once), clipped against the near plane and the screen edges,
//! classified one- or two-sided, and walked column by column.  Along the
//! way every exposed floor/ceiling region above or below the drawn parts
//! is handed to the visplane arena.
//!
//! All per-column quantities — inverse depth, texture arc length, the four
//! height boundaries and both peg anchors — step linearly across the
//! screen span, so the inner loops are pure incremental arithmetic.

use bitflags::bitflags;
use glam::{Vec2, vec2};

use crate::render::context::{CachedVertex, ClipBands, RenderContext};
use crate::render::draw::{self, ColumnJob};
use crate::render::lighting::wall_shade;
use crate::render::pixel::PixelFormat;
use crate::render::view::Viewport;
use crate::render::visplane::{PlaneArena, VisplaneId};
use crate::world::{LightFog, Line, MapData, Sector};

/// Destination + texture bundle the column drawer needs.
pub(crate) struct Raster<'a, P: PixelFormat> {
    pub dest: &'a mut [P::Texel],
    pub tex: &'a [P::Texel],
    pub mask: u32,
    pub shift: u32,
}

bitflags! {
    /// Which strips a projected wall renders and which flats it exposes.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub(crate) struct WallParts: u8 {
        const MARK_CEILING = 0x01;
        const MARK_FLOOR   = 0x02;
        const UPPER        = 0x04;
        const LOWER        = 0x08;
        const MIDDLE       = 0x10;
    }
}

/// Per-column interpolation state for one projected wall.
struct Wall {
    x1: i32,
    x2: i32,

    top: f32,
    top_step: f32,
    high: f32,
    high_step: f32,
    low: f32,
    low_step: f32,
    bottom: f32,
    bottom_step: f32,

    tpeg: f32,
    tpeg_step: f32,
    lpeg: f32,
    lpeg_step: f32,

    dist: f32,
    dist_step: f32,
    len: f32,
    len_step: f32,

    x_offset: f32,
    y_offset: f32,
    x_scale: f32,
    y_scale: f32,

    light: LightFog,
    parts: WallParts,
    floor_plane: Option<VisplaneId>,
    ceiling_plane: Option<VisplaneId>,
}

impl Wall {
    /// Step every accumulator one column to the right.
    #[inline]
    fn advance(&mut self) {
        self.dist += self.dist_step;
        self.len += self.len_step;
        self.top += self.top_step;
        self.bottom += self.bottom_step;
        self.high += self.high_step;
        self.low += self.low_step;
        self.tpeg += self.tpeg_step;
        self.lpeg += self.lpeg_step;
    }
}

/// Slide a behind-plane endpoint along the edge to depth 1, returning the
/// clipped point and the map-space arc length that was cut away (needed to
/// keep texture coordinates continuous).
pub(crate) fn near_clip(p: Vec2, other: Vec2) -> (Vec2, f32) {
    let dx = (1.0 - p.y) * ((other.x - p.x) / (other.y - p.y));
    let arc = vec2(dx, 1.0 - p.y).length();
    (vec2(p.x + dx, 1.0), arc)
}

/// Slope-aware heights of a boundary at both wall ends, shifted along the
/// plane for the parts the near clip cut away.
fn slope_ends(
    map: &MapData,
    sector: &Sector,
    ceiling: bool,
    mv1: Vec2,
    mv2: Vec2,
    line_len: f32,
    leftclip: f32,
    rightclip: f32,
) -> (f32, f32) {
    let slope_id = if ceiling {
        sector.ceiling_slope
    } else {
        sector.floor_slope
    };
    match slope_id {
        Some(id) => {
            let slope = &map.slopes[id as usize];
            let mut z1 = slope.z_at(mv1.x, mv1.y);
            let mut z2 = slope.z_at(mv2.x, mv2.y);
            let zfrac = (z2 - z1) / line_len;
            if leftclip != 0.0 {
                z1 += leftclip * zfrac;
            }
            if rightclip != 0.0 {
                z2 -= rightclip * zfrac;
            }
            (z1, z2)
        }
        None => {
            let z = if ceiling {
                sector.ceiling_z
            } else {
                sector.floor_z
            };
            (z, z)
        }
    }
}

/// Project one map line and rasterise whatever parts of it face the
/// camera, narrowing the clip bands and marking visplane regions as a
/// side effect.
pub(crate) fn project_wall<P: PixelFormat>(
    ctx: &mut RenderContext,
    map: &MapData,
    line: &Line,
    raster: &mut Raster<'_, P>,
) {
    let RenderContext {
        camera,
        view,
        clip,
        vertex_cache,
        planes,
        ..
    } = ctx;

    let v1 = map.vertices[line.v1 as usize].pos;
    let v2 = map.vertices[line.v2 as usize].pos;

    let mut t1 = match vertex_cache[line.v1 as usize] {
        Some(c) => c.view,
        None => camera.to_view(v1),
    };
    let mut t2 = match vertex_cache[line.v2 as usize] {
        Some(c) => c.view,
        None => camera.to_view(v2),
    };

    // wholly behind the view plane
    if t1.y < 1.0 && t2.y < 1.0 {
        return;
    }

    let mut leftclip = 0.0f32;
    let mut rightclip = 0.0f32;

    // projection: x = xcenter + vx * xfoc / depth, with 1/depth carried
    // along because everything else steps linearly in it
    let (mut x1, mut i1);
    if t1.y < 1.0 {
        let (p, arc) = near_clip(t1, t2);
        t1 = p;
        leftclip = arc;
        i1 = 1.0;
        x1 = view.xcenter + t1.x * i1 * view.xfoc;
    } else if let Some(c) = vertex_cache[line.v1 as usize] {
        i1 = c.inv_depth;
        x1 = c.proj_x;
    } else {
        i1 = 1.0 / t1.y;
        x1 = view.xcenter + t1.x * i1 * view.xfoc;
        vertex_cache[line.v1 as usize] = Some(CachedVertex {
            view: t1,
            proj_x: x1,
            inv_depth: i1,
        });
    }

    let (mut x2, mut i2);
    if t2.y < 1.0 {
        let (p, arc) = near_clip(t2, t1);
        t2 = p;
        rightclip = arc;
        i2 = 1.0;
        x2 = view.xcenter + t2.x * i2 * view.xfoc;
    } else if let Some(c) = vertex_cache[line.v2 as usize] {
        i2 = c.inv_depth;
        x2 = c.proj_x;
    } else {
        i2 = 1.0 / t2.y;
        x2 = view.xcenter + t2.x * i2 * view.xfoc;
        vertex_cache[line.v2 as usize] = Some(CachedVertex {
            view: t2,
            proj_x: x2,
            inv_depth: i2,
        });
    }

    // reversed on screen ⇒ seen from behind: switch to the back side or
    // cull if there is none
    let (side_id, back_sector_id, mv1, mv2);
    if x2 < x1 {
        match line.sides[1] {
            Some(s) => side_id = s,
            None => return,
        }
        back_sector_id = line.sectors[0];
        std::mem::swap(&mut x1, &mut x2);
        std::mem::swap(&mut i1, &mut i2);
        std::mem::swap(&mut leftclip, &mut rightclip);
        mv1 = v2;
        mv2 = v1;
    } else {
        match line.sides[0] {
            Some(s) => side_id = s,
            None => return,
        }
        back_sector_id = line.sectors[1];
        mv1 = v1;
        mv2 = v2;
    }

    let side = &map.sides[side_id as usize];
    let sector = &map.sectors[side.sector as usize];
    let back_sector = back_sector_id.map(|id| &map.sectors[id as usize]);

    let x_offset = leftclip * side.x_scale + side.x_offset;
    let y_offset = side.y_offset;

    // round half-in so a wall occupying a single post still lands on a
    // column, without double-claiming the seam with its neighbour
    let mut floorx1 = (x1 + 0.999).floor() as i32;
    let mut floorx2 = (x2 - 0.001).floor() as i32;

    if floorx2 < 0 || floorx1 >= view.width as i32 {
        return;
    }

    // 1/depth interpolates linearly across the screen span; depth does not
    let istep = if floorx2 > floorx1 {
        1.0 / (floorx2 - floorx1) as f32
    } else {
        1.0
    };

    let mut wall = Wall {
        x1: floorx1,
        x2: floorx2,
        top: 0.0,
        top_step: 0.0,
        high: 0.0,
        high_step: 0.0,
        low: 0.0,
        low_step: 0.0,
        bottom: 0.0,
        bottom_step: 0.0,
        tpeg: 0.0,
        tpeg_step: 0.0,
        lpeg: 0.0,
        lpeg_step: 0.0,
        dist: i1,
        dist_step: (i2 - i1) * istep,
        len: 0.0,
        len_step: 0.0,
        x_offset,
        y_offset,
        x_scale: side.x_scale,
        y_scale: side.y_scale,
        light: sector.light,
        parts: WallParts::empty(),
        floor_plane: None,
        ceiling_plane: None,
    };

    // heights below want 1/depth premultiplied by the vertical focal
    let length = (t2 - t1).length();
    let i1 = i1 * view.yfoc;
    let i2 = i2 * view.yfoc;
    wall.len_step = length * i2 * istep;

    let camz = camera.pos.z;
    let eye = camera.pos.truncate();

    // screeny = ycenter - (height - camz) * yfoc / depth
    let (mut top1, mut high1, mut low1, mut bottom1);

    match back_sector {
        None => {
            if camz < sector.ceiling_at(&map.slopes, eye.x, eye.y) {
                wall.parts |= WallParts::MARK_CEILING;
            }
            if camz > sector.floor_at(&map.slopes, eye.x, eye.y) {
                wall.parts |= WallParts::MARK_FLOOR;
            }

            let (z1, z2) = slope_ends(map, sector, true, mv1, mv2, line.length, leftclip, rightclip);
            top1 = view.ycenter - (z1 - camz) * i1;
            high1 = top1;
            let high2 = view.ycenter - (z2 - camz) * i2;
            wall.tpeg = view.ycenter - (sector.ceiling_z - camz) * i1;
            let peg2 = view.ycenter - (sector.ceiling_z - camz) * i2;

            let (z1, z2) =
                slope_ends(map, sector, false, mv1, mv2, line.length, leftclip, rightclip);
            bottom1 = view.ycenter - (z1 - camz) * i1 - 1.0;
            low1 = bottom1;
            let low2 = view.ycenter - (z2 - camz) * i2 - 1.0;

            wall.top_step = (high2 - high1) * istep;
            wall.high_step = wall.top_step;
            wall.bottom_step = (low2 - low1) * istep;
            wall.low_step = wall.bottom_step;
            wall.tpeg_step = (peg2 - wall.tpeg) * istep;

            wall.parts |= WallParts::MIDDLE;
        }
        Some(back) => {
            let light_same = sector.light == back.light;

            // ceiling pair
            let (frontz1, frontz2) =
                slope_ends(map, sector, true, mv1, mv2, line.length, leftclip, rightclip);
            let (backz1, backz2) =
                slope_ends(map, back, true, mv1, mv2, line.length, leftclip, rightclip);
            let plane_in_sight = camz < sector.ceiling_at(&map.slopes, eye.x, eye.y);

            if (!light_same
                || frontz1 != backz1
                || frontz2 != backz2
                || sector.ceiling_slope != back.ceiling_slope)
                && plane_in_sight
            {
                wall.parts |= WallParts::MARK_CEILING;
            }

            top1 = view.ycenter - (frontz1 - camz) * i1;
            let top2 = view.ycenter - (frontz2 - camz) * i2;
            wall.top_step = (top2 - top1) * istep;

            high1 = 0.0;
            if frontz1 > backz1 || frontz2 > backz2 {
                wall.tpeg = view.ycenter - (back.ceiling_z - camz) * i1;
                let peg2 = view.ycenter - (back.ceiling_z - camz) * i2;
                wall.tpeg_step = (peg2 - wall.tpeg) * istep;

                high1 = view.ycenter - (backz1 - camz) * i1;
                let high2 = view.ycenter - (backz2 - camz) * i2;
                wall.high_step = (high2 - high1) * istep;

                wall.parts |= WallParts::UPPER;
            }

            // floor pair
            let (frontz1, frontz2) =
                slope_ends(map, sector, false, mv1, mv2, line.length, leftclip, rightclip);
            let (backz1, backz2) =
                slope_ends(map, back, false, mv1, mv2, line.length, leftclip, rightclip);
            let plane_in_sight = camz > sector.floor_at(&map.slopes, eye.x, eye.y);

            if (!light_same
                || frontz1 != backz1
                || frontz2 != backz2
                || sector.floor_slope != back.floor_slope)
                && plane_in_sight
            {
                wall.parts |= WallParts::MARK_FLOOR;
            }

            low1 = 0.0;
            if frontz1 < backz1 || frontz2 < backz2 {
                low1 = view.ycenter - (backz1 - camz) * i1 - 1.0;
                let low2 = view.ycenter - (backz2 - camz) * i2 - 1.0;
                wall.low_step = (low2 - low1) * istep;

                wall.lpeg = view.ycenter - (back.floor_z - camz) * i1;
                let peg2 = view.ycenter - (back.floor_z - camz) * i2;
                wall.lpeg_step = (peg2 - wall.lpeg) * istep;

                bottom1 = view.ycenter - (frontz1 - camz) * i1 - 2.0;
                let bottom2 = view.ycenter - (frontz2 - camz) * i2 - 2.0;
                wall.bottom_step = (bottom2 - bottom1) * istep;

                wall.parts |= WallParts::LOWER;
            } else {
                bottom1 = view.ycenter - (frontz1 - camz) * i1 - 1.0;
                let bottom2 = view.ycenter - (frontz2 - camz) * i2 - 1.0;
                wall.bottom_step = (bottom2 - bottom1) * istep;
            }
        }
    }

    // clip to the left screen edge: jump every per-column accumulator by
    // the number of columns skipped
    if x1 < 0.0 {
        wall.len += wall.len_step * -x1;
        wall.dist += wall.dist_step * -x1;

        high1 += wall.high_step * -x1;
        low1 += wall.low_step * -x1;
        top1 += wall.top_step * -x1;
        bottom1 += wall.bottom_step * -x1;

        wall.tpeg += wall.tpeg_step * -x1;
        wall.lpeg += wall.lpeg_step * -x1;

        floorx1 = 0;
    }
    if x2 >= view.width as f32 {
        floorx2 = view.width as i32 - 1;
    }

    if wall.parts.contains(WallParts::MARK_FLOOR) {
        let plane = planes.find(sector.floor_z, &sector.light, sector.floor_slope);
        wall.floor_plane = Some(planes.extend(plane, floorx1, floorx2));
    }
    if wall.parts.contains(WallParts::MARK_CEILING) {
        let plane = planes.find(sector.ceiling_z, &sector.light, sector.ceiling_slope);
        wall.ceiling_plane = Some(planes.extend(plane, floorx1, floorx2));
    }

    wall.x1 = floorx1;
    wall.x2 = floorx2;
    wall.top = top1;
    wall.high = high1;
    wall.low = low1;
    wall.bottom = bottom1;

    if back_sector.is_none() {
        render_wall_1s(&mut wall, clip, planes, view, raster);
    } else {
        render_wall_2s(&mut wall, clip, planes, view, raster);
    }
}

/// Column texture state shared by every strip of one wall column.
struct ColumnTex {
    tex_row: u32,
    ystep: u32,
    yscale: f32,
    blend: crate::render::pixel::Blend,
}

impl ColumnTex {
    #[inline]
    fn calc<P: PixelFormat>(wall: &Wall, view: &Viewport, mask: u32, shift: u32) -> Self {
        // actual scale is depth / yfoc, reached through 1/depth
        let basescale = 1.0 / (wall.dist * view.yfoc);
        let yscale = basescale * wall.y_scale;
        let xscale = basescale * wall.x_scale;

        let u = (wall.len * xscale + wall.x_offset) as i32;
        Self {
            tex_row: ((u & mask as i32) as u32) << shift,
            ystep: fixed(yscale),
            yscale,
            blend: P::blend(wall_shade(wall.dist, &wall.light), &wall.light),
        }
    }

    /// 16.16 start coordinate pegging row `y1` to the given anchor.
    #[inline]
    fn yfrac(&self, y1: i32, peg: f32, y_offset: f32) -> u32 {
        fixed((y1 as f32 - peg + 1.0) * self.yscale + y_offset)
    }
}

#[inline]
fn fixed(v: f32) -> u32 {
    (v * 65536.0) as i64 as u32
}

fn render_wall_1s<P: PixelFormat>(
    wall: &mut Wall,
    clip: &mut ClipBands,
    planes: &mut PlaneArena,
    view: &Viewport,
    raster: &mut Raster<'_, P>,
) {
    for x in wall.x1..=wall.x2 {
        let col = x as usize;
        if clip.top[col] < clip.bot[col] {
            let ctop = clip.top[col] as i32;
            let cbot = clip.bot[col] as i32;

            let t = if wall.top < ctop as f32 {
                ctop
            } else {
                wall.top as i32
            };
            let b = if wall.bottom > cbot as f32 {
                cbot
            } else {
                wall.bottom as i32
            };

            mark_planes(wall, planes, x, t, b, ctop, cbot);

            // a solid wall closes its column for good
            clip.top[col] = b as f32;
            clip.bot[col] = t as f32;

            if wall.parts.contains(WallParts::MIDDLE) && t <= b {
                let tex = ColumnTex::calc::<P>(wall, view, raster.mask, raster.shift);
                let job = ColumnJob {
                    x,
                    y1: t,
                    y2: b,
                    yfrac: tex.yfrac(t, wall.tpeg, wall.y_offset),
                    ystep: tex.ystep,
                    tex_row: tex.tex_row,
                    blend: tex.blend,
                };
                draw::draw_column::<P>(&job, raster.dest, view.width, raster.tex, raster.mask);
            }
        }
        wall.advance();
    }
}

fn render_wall_2s<P: PixelFormat>(
    wall: &mut Wall,
    clip: &mut ClipBands,
    planes: &mut PlaneArena,
    view: &Viewport,
    raster: &mut Raster<'_, P>,
) {
    for x in wall.x1..=wall.x2 {
        let col = x as usize;
        if clip.top[col] < clip.bot[col] {
            let ctop = clip.top[col] as i32;
            let cbot = clip.bot[col] as i32;

            let t = if wall.top < ctop as f32 {
                ctop
            } else {
                wall.top as i32
            };
            let b = if wall.bottom > cbot as f32 {
                cbot
            } else {
                wall.bottom as i32
            };

            mark_planes(wall, planes, x, t, b, ctop, cbot);

            let has_strip = wall
                .parts
                .intersects(WallParts::UPPER | WallParts::LOWER);
            let tex = has_strip.then(|| ColumnTex::calc::<P>(wall, view, raster.mask, raster.shift));

            if wall.parts.contains(WallParts::UPPER) {
                let h = if wall.high < ctop as f32 {
                    ctop
                } else if wall.high > cbot as f32 {
                    cbot
                } else {
                    wall.high as i32
                };

                if t <= h {
                    let tex = tex.as_ref().unwrap();
                    let job = ColumnJob {
                        x,
                        y1: t,
                        y2: h,
                        yfrac: tex.yfrac(t, wall.tpeg, wall.y_offset),
                        ystep: tex.ystep,
                        tex_row: tex.tex_row,
                        blend: tex.blend,
                    };
                    draw::draw_column::<P>(&job, raster.dest, view.width, raster.tex, raster.mask);
                    clip.top[col] = h as f32;
                } else {
                    clip.top[col] = t as f32;
                }
            } else {
                clip.top[col] = t as f32;
            }

            if wall.parts.contains(WallParts::LOWER) {
                let l = if wall.low < ctop as f32 {
                    ctop
                } else if wall.low > cbot as f32 {
                    cbot
                } else {
                    wall.low as i32
                };

                if l <= b {
                    let tex = tex.as_ref().unwrap();
                    let job = ColumnJob {
                        x,
                        y1: l,
                        y2: b,
                        yfrac: tex.yfrac(l, wall.lpeg, wall.y_offset),
                        ystep: tex.ystep,
                        tex_row: tex.tex_row,
                        blend: tex.blend,
                    };
                    draw::draw_column::<P>(&job, raster.dest, view.width, raster.tex, raster.mask);
                    clip.bot[col] = l as f32;
                } else {
                    clip.bot[col] = b as f32;
                }
            } else {
                clip.bot[col] = b as f32;
            }
        }
        wall.advance();
    }
}

/// Record the still-open gap above/below the wall on its flats.
#[inline]
fn mark_planes(
    wall: &Wall,
    planes: &mut PlaneArena,
    x: i32,
    t: i32,
    b: i32,
    ctop: i32,
    cbot: i32,
) {
    if wall.parts.contains(WallParts::MARK_CEILING) {
        if let Some(pid) = wall.ceiling_plane {
            let m = (t - 1).min(cbot);
            if m > ctop {
                let plane = planes.get_mut(pid);
                plane.set_top(x, ctop);
                plane.set_bot(x, m);
            }
        }
    }
    if wall.parts.contains(WallParts::MARK_FLOOR) {
        if let Some(pid) = wall.floor_plane {
            let m = (b + 1).max(ctop);
            if m < cbot {
                let plane = planes.get_mut(pid);
                plane.set_top(x, m);
                plane.set_bot(x, cbot);
            }
        }
    }
}

/*============================== Tests ===============================*/
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_clip_interpolates_linearly() {
        // depth 0.5 → clipped to 1.0 against a partner at depth 10:
        // the new point must sit (1 − 0.5)/(10 − 0.5) of the way along
        let p = vec2(-3.0, 0.5);
        let other = vec2(7.0, 10.0);
        let (clipped, arc) = near_clip(p, other);

        let frac = (1.0 - 0.5) / (10.0 - 0.5);
        let expect = p + (other - p) * frac;
        assert!((clipped.x - expect.x).abs() < 1e-5);
        assert_eq!(clipped.y, 1.0);
        // the cut arc is exactly the distance from the old to the new point
        assert!((arc - (clipped - p).length()).abs() < 1e-5);
    }

    #[test]
    fn near_clip_stays_on_the_edge() {
        let a = vec2(2.0, -1.0);
        let b = vec2(-4.0, 5.0);
        let (c, _) = near_clip(a, b);
        assert_eq!(c.y, 1.0);
        // the clipped point is collinear with the original edge
        let cross = (c.x - a.x) * (b.y - a.y) - (c.y - a.y) * (b.x - a.x);
        assert!(cross.abs() < 1e-4);
    }
}
