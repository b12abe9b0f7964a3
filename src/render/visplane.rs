//! Visplane collector and scan converter.
//!
//! ▸ During wall projection every exposed floor/ceiling region is merged
//!   into a *visplane*: one flat value (height or slope + light) plus the
//!   per-column vertical gap it still owns on screen.
//! ▸ After the walls, each visplane's top/bot silhouette is traced once
//!   left-to-right and handed to the span drawers as maximal horizontal
//!   runs — O(width) per plane, not O(width × height).
//!
//! Planes live in a frame-scoped arena: allocation is a bump, "freeing"
//! is the per-frame rewind, and the parent→child links that represent a
//! flat resurfacing behind nearer geometry are arena indices.

use glam::{Vec3, vec2, vec3};

use crate::render::camera::Camera;
use crate::render::draw::{self, SlopeSpanJob, SpanJob};
use crate::render::lighting::{slope_shade, wall_shade};
use crate::render::pixel::PixelFormat;
use crate::render::view::Viewport;
use crate::world::{LightFog, MapData, Slope, SlopeId};

pub type VisplaneId = u16;

/// Hard ceiling on live planes per frame.  Running out mid-frame means the
/// map (or the merge logic) is broken, not that the frame is busy.
pub const MAX_VISPLANES: usize = 1024;

/// Column not yet claimed by any wall; also the closed-column sentinel
/// during scan conversion.
pub(crate) const UNSET: i32 = i32::MAX;

/// One batched horizontal-scan job: a flat surface value and the screen
/// columns it still owns.  `top`/`bot` are indexed from -1 to width — the
/// two sentinel columns let the silhouette scan close every run without
/// edge cases.
pub struct Visplane {
    pub z: f32,
    pub light: LightFog,
    pub slope: Option<SlopeId>,

    pub x1: i32,
    pub x2: i32,

    root: bool,
    child: Option<VisplaneId>,

    top: Vec<i32>,
    bot: Vec<i32>,
}

impl Visplane {
    fn new(width: usize, z: f32, light: LightFog, slope: Option<SlopeId>, root: bool) -> Self {
        Self {
            z,
            light,
            slope,
            x1: width as i32,
            x2: -1,
            root,
            child: None,
            top: vec![0; width + 2],
            bot: vec![0; width + 2],
        }
    }

    #[inline(always)]
    pub fn top_at(&self, x: i32) -> i32 {
        self.top[(x + 1) as usize]
    }

    #[inline(always)]
    pub fn bot_at(&self, x: i32) -> i32 {
        self.bot[(x + 1) as usize]
    }

    #[inline(always)]
    pub(crate) fn set_top(&mut self, x: i32, v: i32) {
        self.top[(x + 1) as usize] = v;
    }

    #[inline(always)]
    pub(crate) fn set_bot(&mut self, x: i32, v: i32) {
        self.bot[(x + 1) as usize] = v;
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn child(&self) -> Option<VisplaneId> {
        self.child
    }
}

/// Frame-scoped visplane pool.  `clear` rewinds it; nothing is ever freed
/// individually.
#[derive(Default)]
pub struct PlaneArena {
    planes: Vec<Visplane>,
    width: usize,
}

impl PlaneArena {
    pub(crate) fn clear(&mut self, width: usize) {
        if self.planes.capacity() > 0 && self.width != width {
            log::trace!("visplane arena re-targeted to width {width}");
        }
        self.width = width;
        self.planes.clear();
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    pub fn get(&self, id: VisplaneId) -> &Visplane {
        &self.planes[id as usize]
    }

    pub(crate) fn get_mut(&mut self, id: VisplaneId) -> &mut Visplane {
        &mut self.planes[id as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Visplane> + '_ {
        self.planes.iter()
    }

    fn alloc(&mut self, z: f32, light: LightFog, slope: Option<SlopeId>, root: bool) -> VisplaneId {
        assert!(self.planes.len() < MAX_VISPLANES, "out of visplanes");
        let id = self.planes.len() as VisplaneId;
        self.planes.push(Visplane::new(self.width, z, light, slope, root));
        id
    }

    /// Fetch the plane for a flat value, allocating on first sight.
    /// Identity is epsilon-equal height, byte-equal light and the same
    /// slope — children inherit their parent's identity, so the first hit
    /// in allocation order is always the parent.
    pub(crate) fn find(&mut self, z: f32, light: &LightFog, slope: Option<SlopeId>) -> VisplaneId {
        for (i, p) in self.planes.iter().enumerate() {
            if (p.z - z).abs() < 1e-5 && p.light == *light && p.slope == slope {
                return i as VisplaneId;
            }
        }
        self.alloc(z, *light, slope, true)
    }

    /// Claim `[x1, x2]` on the plane.
    ///
    /// An empty plane adopts the range; a range beyond either end widens
    /// it in place (the in-between columns open as `UNSET` and stay
    /// closed unless a wall claims them); a range that overlaps columns
    /// already claimed chains into a child plane of the same identity.
    /// Returns the plane that actually owns the new columns.
    pub(crate) fn extend(&mut self, id: VisplaneId, x1: i32, x2: i32) -> VisplaneId {
        let plane = &mut self.planes[id as usize];

        let (owner, open_l, open_r) = if plane.x1 > plane.x2 {
            plane.x1 = x1;
            plane.x2 = x2;
            (id, x1, x2)
        } else if x1 > plane.x2 {
            let l = plane.x2 + 1;
            plane.x2 = x2;
            (id, l, x2)
        } else if x2 < plane.x1 {
            let r = plane.x1 - 1;
            plane.x1 = x1;
            (id, x1, r)
        } else {
            // overlap with already-claimed columns: re-open the range on a
            // child of the same identity
            if let Some(child) = plane.child {
                return self.extend(child, x1, x2);
            }
            let (z, light, slope, grand) = (plane.z, plane.light, plane.slope, plane.child);
            let child = self.alloc(z, light, slope, false);
            let [plane, new] = self
                .planes
                .get_disjoint_mut([id as usize, child as usize])
                .expect("distinct plane ids");
            new.child = grand;
            plane.child = Some(child);
            new.x1 = x1;
            new.x2 = x2;
            (child, x1, x2)
        };

        let owned = &mut self.planes[owner as usize];
        for x in open_l..=open_r {
            owned.set_top(x, UNSET);
        }
        owner
    }
}

/*──────────────────── silhouette scan conversion ────────────────────*/

/// Walk the plane left-to-right and emit one `(x_start, x_end, y)` run for
/// every row the open vertical interval closes on.  The sentinel columns
/// just outside `[x1, x2]` force every run to close.
fn scan_silhouette(
    plane: &mut Visplane,
    span_start: &mut [i32],
    mut emit: impl FnMut(i32, i32, i32),
) {
    let x1 = plane.x1;
    let stop = plane.x2 + 1;

    plane.set_top(x1 - 1, UNSET);
    plane.set_top(stop, UNSET);
    plane.set_bot(x1 - 1, 0);
    plane.set_bot(stop, 0);

    for x in x1..=stop {
        let mut t1 = plane.top_at(x - 1);
        let t2 = plane.top_at(x);
        let mut b1 = plane.bot_at(x - 1);
        let b2 = plane.bot_at(x);

        // rows that just closed emit their span…
        while t2 > t1 && t1 <= b1 {
            emit(span_start[t1 as usize], x - 1, t1);
            t1 += 1;
        }
        while b2 < b1 && t1 <= b1 {
            emit(span_start[b1 as usize], x - 1, b1);
            b1 -= 1;
        }

        // …rows that just opened remember where they started
        let mut t2 = t2;
        let mut b2 = b2;
        while t2 < t1 && t2 <= b2 {
            span_start[t2 as usize] = x;
            t2 += 1;
        }
        while b2 > b1 && t2 <= b2 {
            span_start[b2 as usize] = x;
            b2 -= 1;
        }
    }
}

/*─────────────────────── span construction ──────────────────────────*/

/// Per-plane constants for sloped texturing: the three cross-product
/// vectors that turn a screen ray into (u/z, v/z, 1/z), plus the
/// brightness ramp coefficients.
struct SlopeVectors {
    a: Vec3,
    b: Vec3,
    c: Vec3,
    /// Plane height straight under the eye.
    zat: f32,
    plight: f32,
    shade: f32,
}

/// Brightness table span the slope ramp is phrased in.
const COLORMAP_RANGE: f32 = 256.0;

impl SlopeVectors {
    fn calc(
        slope: &Slope,
        light: &LightFog,
        camera: &Camera,
        view: &Viewport,
        tex_size: u32,
    ) -> Self {
        let size = tex_size as f32;

        // anchor the texture grid on the slope origin, snapped to texture
        // tiles so flats don't swim when the origin moves
        let ox = (slope.origin.x as i32 - slope.origin.x as i32 % tex_size as i32) as f32;
        let oy = (slope.origin.y as i32 - slope.origin.y as i32 % tex_size as i32) as f32;

        let p_map = vec2(ox, oy - size);
        let m_map = vec2(ox - size, oy - size);
        let n_map = vec2(ox, oy - 2.0 * size);

        let p = camera.to_view_3d(p_map, slope.z_at(p_map.x, p_map.y));
        let m = camera.to_view_3d(m_map, slope.z_at(m_map.x, m_map.y)) - p;
        let n = camera.to_view_3d(n_map, slope.z_at(n_map.x, n_map.y)) - p;

        let scale = |mut v: Vec3| {
            v.x *= 0.5;
            v.y *= 0.5 / view.focratio;
            v.z *= 0.5;
            v
        };

        let zat = slope.z_at(camera.pos.x, camera.pos.y);
        let inv_scale = 1.0 / size;

        Self {
            a: scale(p.cross(n)),
            b: scale(p.cross(m)),
            c: scale(m.cross(n)),
            zat,
            plight: (view.slope_vis * inv_scale * inv_scale) / (zat - camera.pos.z),
            shade: COLORMAP_RANGE * 2.0 - (f32::from(light.level) + 16.0) * COLORMAP_RANGE / 128.0,
        }
    }

    /// Brightness input at inverse plane distance `id`.
    #[inline]
    fn map_at(&self, light: &LightFog, id: f32) -> f32 {
        let base = 4.0 * f32::from(light.level) - 448.0;
        base - (COLORMAP_RANGE - (self.shade - self.plight * id))
    }
}

/// Channel multipliers as 16.16 fracs for the sloped drawer.
fn slope_fracs(map: f32, light: &LightFog) -> (i32, i32, i32) {
    let s = slope_shade(map, light);
    let ul = i32::from(s.ulight);
    (
        (ul * i32::from(light.r)) << 8,
        (ul * i32::from(light.g)) << 8,
        (ul * i32::from(light.b)) << 8,
    )
}

#[inline]
fn fixed(v: f32) -> u32 {
    (v * 65536.0) as i64 as u32
}

/// Scan-convert every root plane (children follow their parents) into
/// spans and draw them.
pub(crate) fn render_planes<P: PixelFormat>(
    planes: &mut PlaneArena,
    span_start: &mut [i32],
    camera: &Camera,
    view: &Viewport,
    map: &MapData,
    dest: &mut [P::Texel],
    tex: &[P::Texel],
    mask: u32,
    shift: u32,
) {
    for root in 0..planes.len() {
        if !planes.planes[root].root {
            continue;
        }
        let mut next = Some(root as VisplaneId);
        while let Some(id) = next {
            next = render_one::<P>(planes, span_start, camera, view, map, dest, tex, mask, shift, id);
        }
    }
}

/// Draw one plane, returning the chained child to continue with (or
/// `None` when the whole chain is culled).
fn render_one<P: PixelFormat>(
    planes: &mut PlaneArena,
    span_start: &mut [i32],
    camera: &Camera,
    view: &Viewport,
    map: &MapData,
    dest: &mut [P::Texel],
    tex: &[P::Texel],
    mask: u32,
    shift: u32,
    id: VisplaneId,
) -> Option<VisplaneId> {
    let plane = &mut planes.planes[id as usize];
    if plane.x1 > plane.x2 {
        return plane.child;
    }

    let z = plane.z;
    let light = plane.light;
    let tex_size = mask + 1;

    let sv = match plane.slope {
        Some(sid) => {
            let slope = &map.slopes[sid as usize];
            let sv = SlopeVectors::calc(slope, &light, camera, view, tex_size);
            // a slope seen edge-on or from its back side contributes nothing
            if slope.is_ceiling && sv.zat <= camera.pos.z {
                return None;
            }
            if !slope.is_ceiling && sv.zat >= camera.pos.z {
                return None;
            }
            Some(sv)
        }
        None => None,
    };

    let child = plane.child;

    scan_silhouette(plane, span_start, |x1, x2, y| match &sv {
        None => flat_span::<P>(x1, x2, y, z, &light, camera, view, dest, tex, mask, shift),
        Some(sv) => sloped_span::<P>(x1, x2, y, sv, &light, view, dest, tex, mask, shift),
    });

    child
}

/// Constant-depth flat span: one light for the whole run, u/v stepped
/// linearly in 16.16.
fn flat_span<P: PixelFormat>(
    x1: i32,
    x2: i32,
    y: i32,
    z: f32,
    light: &LightFog,
    camera: &Camera,
    view: &Viewport,
    dest: &mut [P::Texel],
    tex: &[P::Texel],
    mask: u32,
    shift: u32,
) {
    let height = z - camera.pos.z;
    if height == 0.0 {
        return;
    }

    // invert the wall projection: the view depth of this screen row is
    // height * yfoc / (ycenter - y), biased a pixel towards the horizon
    let mut dy = if y as f32 == view.ycenter {
        0.01
    } else if (y as f32) < view.ycenter {
        (view.ycenter - y as f32).abs() - 1.0
    } else {
        (view.ycenter - y as f32).abs() + 1.0
    };
    if dy == 0.0 {
        dy = 0.01;
    }

    let mut iscale = (height / dy).abs();
    let realy = iscale * view.yfoc;
    iscale *= view.focratio;

    let ustep = camera.cos() * iscale;
    let vstep = -camera.sin() * iscale;

    let blend = P::blend(wall_shade(1.0 / realy, light), light);

    // texture coords at the screen centre, walked out to x1
    let job = SpanJob {
        x1,
        x2,
        y,
        ufrac: fixed(camera.pos.x + camera.sin() * realy + (x1 as f32 - view.xcenter) * ustep),
        vfrac: fixed(camera.pos.y + camera.cos() * realy + (x1 as f32 - view.xcenter) * vstep),
        ustep: fixed(ustep),
        vstep: fixed(vstep),
        blend,
    };
    draw::draw_span::<P>(&job, dest, view.width, tex, mask, shift);
}

/// True-perspective span over a tilted plane.
fn sloped_span<P: PixelFormat>(
    x1: i32,
    x2: i32,
    y: i32,
    sv: &SlopeVectors,
    light: &LightFog,
    view: &Viewport,
    dest: &mut [P::Texel],
    tex: &[P::Texel],
    mask: u32,
    shift: u32,
) {
    let size = (mask + 1) as f32;
    let s = vec3(x1 as f32 - view.xcenter, y as f32 - view.ycenter, view.xfoc);

    // premultiplied by the texture size so the drawer's 16.16 fracs land
    // directly on texel indices
    let iu = s.dot(sv.a) * size;
    let iv = s.dot(sv.b) * size;
    let id = s.dot(sv.c);

    let (rfrac, gfrac, bfrac) = slope_fracs(sv.map_at(light, id), light);

    let count = x2 - x1;
    let (rstep, gstep, bstep) = if count > 0 {
        let id_end = id + sv.c.x * count as f32;
        let (re, ge, be) = slope_fracs(sv.map_at(light, id_end), light);
        (
            (re - rfrac) / count,
            (ge - gfrac) / count,
            (be - bfrac) / count,
        )
    } else {
        (0, 0, 0)
    };

    let job = SlopeSpanJob {
        x1,
        x2,
        y,
        iu,
        iv,
        id,
        iustep: sv.a.x * size,
        ivstep: sv.b.x * size,
        idstep: sv.c.x,
        rfrac,
        gfrac,
        bfrac,
        rstep,
        gstep,
        bstep,
    };
    draw::draw_sloped_span::<P>(&job, dest, view.width, tex, mask, shift);
}

/*============================== Tests ===============================*/
#[cfg(test)]
mod tests {
    use super::*;

    fn arena(width: usize) -> PlaneArena {
        let mut a = PlaneArena::default();
        a.clear(width);
        a
    }

    fn flat(level: u16) -> LightFog {
        LightFog::flat(level)
    }

    #[test]
    fn find_reuses_matching_planes() {
        let mut a = arena(64);
        let p1 = a.find(-40.0, &flat(128), None);
        let p2 = a.find(-40.0, &flat(128), None);
        assert_eq!(p1, p2);
        // different light ⇒ different plane
        let p3 = a.find(-40.0, &flat(129), None);
        assert_ne!(p1, p3);
        // different slope identity ⇒ different plane
        let p4 = a.find(-40.0, &flat(128), Some(0));
        assert_ne!(p1, p4);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn extend_adopts_then_widens() {
        let mut a = arena(64);
        let p = a.find(0.0, &flat(128), None);
        assert_eq!(a.extend(p, 10, 20), p);
        assert_eq!((a.get(p).x1, a.get(p).x2), (10, 20));

        // disjoint to the right widens in place and opens the gap
        assert_eq!(a.extend(p, 30, 40), p);
        assert_eq!((a.get(p).x1, a.get(p).x2), (10, 40));
        for x in 21..=40 {
            assert_eq!(a.get(p).top_at(x), UNSET, "column {x}");
        }

        // disjoint to the left widens too
        assert_eq!(a.extend(p, 0, 5), p);
        assert_eq!((a.get(p).x1, a.get(p).x2), (0, 40));
    }

    #[test]
    fn contained_range_leaves_parent_bounds_alone() {
        let mut a = arena(64);
        let p = a.find(0.0, &flat(128), None);
        a.extend(p, 10, 30);

        let child = a.extend(p, 15, 20);
        assert_ne!(child, p);
        assert_eq!((a.get(p).x1, a.get(p).x2), (10, 30));
        assert_eq!(a.get(p).child(), Some(child));
        assert!(!a.get(child).is_root());
    }

    #[test]
    fn conflicting_ranges_chain_a_child_and_keep_parent_columns() {
        let mut a = arena(64);
        let p = a.find(0.0, &flat(128), None);

        // two non-overlapping claims, both owned by the parent
        a.extend(p, 0, 10);
        a.extend(p, 20, 30);
        // pretend walls closed some parent columns with real bounds
        for x in 0..=10 {
            a.get_mut(p).set_top(x, 5);
            a.get_mut(p).set_bot(x, 90);
        }

        // a third claim overlapping both ranges must not disturb them
        let child = a.extend(p, 5, 25);
        assert_ne!(child, p);
        for x in 0..=10 {
            assert_eq!(a.get(p).top_at(x), 5);
            assert_eq!(a.get(p).bot_at(x), 90);
        }
        assert_eq!((a.get(child).x1, a.get(child).x2), (5, 25));
        for x in 5..=25 {
            assert_eq!(a.get(child).top_at(x), UNSET);
        }
        // identity carried over
        assert_eq!(a.get(child).z, a.get(p).z);
        assert_eq!(a.get(child).light, a.get(p).light);

        // and a fourth conflicting claim recurses into the same chain
        let grand = a.extend(p, 7, 9);
        assert_ne!(grand, child);
        assert_eq!(a.get(child).child(), Some(grand));
    }

    #[test]
    fn silhouette_scan_emits_maximal_runs() {
        let mut a = arena(16);
        let p = a.find(0.0, &flat(128), None);
        a.extend(p, 2, 5);

        // rectangle rows 3..=4 on columns 2..=5, except column 4 carves
        // the bottom row away
        for x in 2..=5 {
            a.get_mut(p).set_top(x, 3);
            a.get_mut(p).set_bot(x, 4);
        }
        a.get_mut(p).set_bot(4, 3);

        let mut span_start = vec![0i32; 32];
        let mut got = Vec::new();
        scan_silhouette(a.get_mut(p), &mut span_start, |x1, x2, y| {
            got.push((x1, x2, y));
        });
        got.sort();

        // row 3 runs the full width; row 4 splits around column 4
        assert_eq!(got, vec![(2, 3, 4), (2, 5, 3), (5, 5, 4)]);
    }
}
