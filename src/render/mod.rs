//! The software renderer.
//!
//! One frame is a single synchronous pass over an exclusive
//! [`Surface`]: reset the per-frame state, project every map line
//! front-to-back in author order (walls rasterise immediately and mark
//! exposed flats), then scan-convert the accumulated visplanes into
//! horizontal spans.  No depth sort, no BSP — occlusion falls out of the
//! clip bands plus the map author's line ordering, exactly like the
//! column renderers this one descends from.

mod camera;
mod context;
mod draw;
mod lighting;
mod pixel;
mod view;
mod visplane;
mod walls;

pub use camera::Camera;
pub use context::{ClipBands, RenderContext};
pub use lighting::{Shade, slope_shade, wall_shade};
pub use pixel::{Argb8888, Blend, Depth, Indexed8, PixelFormat, Rgb555, Surface, TextureView};
pub use view::Viewport;
pub use visplane::{MAX_VISPLANES, PlaneArena, Visplane, VisplaneId};

/// Configuration and contract violations caught before (or instead of)
/// touching pixels.  Running out of visplanes mid-frame is *not* here —
/// that ceiling is an engine invariant and panics.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("{0} bytes per pixel is unsupported (8, 16 and 32-bit colour only)")]
    UnsupportedDepth(usize),

    #[error("surface buffer holds {got} bytes, expected {expected}")]
    SurfaceSize { expected: usize, got: usize },

    #[error("pixel buffer is not aligned for its depth")]
    SurfaceAlign,

    #[error("texture size {0} is not a power of two")]
    TextureNotPow2(usize),

    #[error("texture buffer holds {got} bytes, expected {expected}")]
    TextureSize { expected: usize, got: usize },

    #[error("surface is {got_w}×{got_h} but the context renders {want_w}×{want_h}")]
    SurfaceMismatch {
        want_w: usize,
        want_h: usize,
        got_w: usize,
        got_h: usize,
    },

    #[error("texture depth {tex:?} does not match surface depth {surface:?}")]
    DepthMismatch { surface: Depth, tex: Depth },
}

/// Render one frame of `map` into `surface`, texturing every wall and
/// flat with `texture`.
///
/// The map must be linked, the surface must match the context viewport,
/// and texture and surface must share a depth.  The depth decides which
/// drawer family runs; everything past this point is monomorphic.
pub fn render_frame(
    ctx: &mut RenderContext,
    map: &crate::world::MapData,
    surface: &mut Surface<'_>,
    texture: &TextureView<'_>,
) -> Result<(), RenderError> {
    if surface.width != ctx.view.width || surface.height != ctx.view.height {
        return Err(RenderError::SurfaceMismatch {
            want_w: ctx.view.width,
            want_h: ctx.view.height,
            got_w: surface.width,
            got_h: surface.height,
        });
    }
    if texture.depth != surface.depth {
        return Err(RenderError::DepthMismatch {
            surface: surface.depth,
            tex: texture.depth,
        });
    }

    match surface.depth {
        Depth::Indexed8 => frame::<Indexed8>(ctx, map, surface, texture),
        Depth::Rgb555 => frame::<Rgb555>(ctx, map, surface, texture),
        Depth::Argb8888 => frame::<Argb8888>(ctx, map, surface, texture),
    }
}

fn frame<P: PixelFormat>(
    ctx: &mut RenderContext,
    map: &crate::world::MapData,
    surface: &mut Surface<'_>,
    texture: &TextureView<'_>,
) -> Result<(), RenderError> {
    let dest = surface.texels_mut::<P>()?;
    let tex = texture.texels::<P>()?;
    let mask = texture.mask();
    let shift = texture.shift();

    ctx.begin_frame(map.vertices.len());

    {
        let mut raster = walls::Raster::<P> {
            dest: &mut *dest,
            tex,
            mask,
            shift,
        };
        for line in &map.lines {
            walls::project_wall::<P>(ctx, map, line, &mut raster);
        }
    }

    let RenderContext {
        camera,
        view,
        span_start,
        planes,
        ..
    } = ctx;
    visplane::render_planes::<P>(
        planes, span_start, camera, view, map, dest, tex, mask, shift,
    );
    log::trace!("frame done, {} visplanes", planes.len());

    Ok(())
}

/*============================== Tests ===============================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{LightFog, Line, MapData, Sector, Side, Slope, Vertex};
    use glam::{vec2, vec3};

    const W: usize = 640;
    const H: usize = 400;

    fn solid_texture(texel: u32) -> Vec<u32> {
        vec![texel; 64 * 64]
    }

    /// Square one-sector room, lines wound so the front sides face inward.
    fn room(floor_z: f32, ceiling_z: f32) -> MapData {
        let mut map = MapData::default();
        map.vertices = [
            vec2(-64.0, 64.0),
            vec2(64.0, 64.0),
            vec2(64.0, -64.0),
            vec2(-64.0, -64.0),
        ]
        .into_iter()
        .map(|pos| Vertex { pos })
        .collect();
        map.sectors
            .push(Sector::new(floor_z, ceiling_z, LightFog::flat(128)));
        for i in 0..4u16 {
            map.sides.push(Side::new(0));
            map.lines.push(Line::solid(i, (i + 1) % 4, i, 0));
        }
        map
    }

    fn render_once(ctx: &mut RenderContext, map: &MapData, buf: &mut [u32], tex: &[u32]) {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(buf);
        let mut surface = Surface::new(bytes, W, H, 4).unwrap();
        let texture =
            TextureView::new(bytemuck::cast_slice(tex), 64, Depth::Argb8888).unwrap();
        render_frame(ctx, map, &mut surface, &texture).unwrap();
    }

    #[test]
    fn single_room_wall_and_floor_plane() {
        let mut map = room(-20.0, 20.0);
        map.link().unwrap();

        // centred, eye level between the flats, looking at the +y wall
        let camera = Camera::new(vec3(0.0, 0.0, 0.0), 0.0);
        let mut ctx = RenderContext::new(camera, W, H, 90.0);

        let tex = solid_texture(0x0080_8080);
        let mut buf = vec![0u32; W * H];
        render_once(&mut ctx, &map, &mut buf, &tex);

        // wall depth 64, yfoc 320 (640×400 at 90°): the wall's screen rows
        // are ycenter ± 20 * 320 / 64 = 200 ± 100
        let t_expect = 100.0;
        let b_expect = 299.0;
        for x in [0usize, 160, 320, 479, 639] {
            // a solid wall closes its column: top/bot arrive swapped
            assert!((ctx.clip.bot[x] - t_expect).abs() <= 1.0, "column {x}");
            assert!((ctx.clip.top[x] - b_expect).abs() <= 1.0, "column {x}");
        }

        // exactly one floor and one ceiling plane, spanning the wall's
        // screen range; their seams track the wall within a pixel
        let floor = ctx
            .planes()
            .iter()
            .find(|p| (p.z - -20.0).abs() < 1e-4)
            .expect("floor visplane");
        assert_eq!((floor.x1, floor.x2), (0, W as i32 - 1));
        for x in [0, 320, 639] {
            assert!((floor.top_at(x) - 300).abs() <= 1, "{}", floor.top_at(x));
            assert_eq!(floor.bot_at(x), H as i32 - 1);
        }

        let ceiling = ctx
            .planes()
            .iter()
            .find(|p| (p.z - 20.0).abs() < 1e-4)
            .expect("ceiling visplane");
        assert_eq!((ceiling.x1, ceiling.x2), (0, W as i32 - 1));
        for x in [0, 320, 639] {
            assert_eq!(ceiling.top_at(x), 0);
            assert!((ceiling.bot_at(x) - 99).abs() <= 1, "{}", ceiling.bot_at(x));
        }

        // wall, floor and ceiling together leave no hole in the frame
        assert!(buf.iter().all(|&p| p != 0));
    }

    #[test]
    fn approaching_a_floor_slope_moves_its_edge_down() {
        let mut map = room(-30.0, 40.0);
        // floor climbs towards the far (+y) wall: tilted toward the camera
        map.slopes
            .push(Slope::new(vec3(0.0, -64.0, -30.0), 0.0, 1.0, 0.25));
        map.sectors[0].floor_slope = Some(0);
        map.link().unwrap();

        let camera = Camera::new(vec3(0.0, -32.0, 10.0), 0.0);
        let mut ctx = RenderContext::new(camera, W, H, 90.0);
        let tex = solid_texture(0x0040_6080);
        let mut buf = vec![0u32; W * H];

        let mut edges = Vec::new();
        for _ in 0..3 {
            render_once(&mut ctx, &map, &mut buf, &tex);
            let floor = ctx
                .planes()
                .iter()
                .find(|p| p.slope == Some(0))
                .expect("sloped floor visplane");
            edges.push(floor.top_at(W as i32 / 2));
            ctx.camera.move_by(8.0);
        }

        // each step towards the wall pushes the floor/wall seam further
        // down the screen
        assert!(edges[0] < edges[1] && edges[1] < edges[2], "{edges:?}");
    }

    #[test]
    fn depth_dispatch_validates_inputs() {
        let mut map = room(-20.0, 20.0);
        map.link().unwrap();
        let camera = Camera::new(vec3(0.0, 0.0, 0.0), 0.0);
        let mut ctx = RenderContext::new(camera, W, H, 90.0);

        // mismatched surface dimensions
        let mut small = vec![0u8; 16 * 16 * 4];
        let mut surface = Surface::new(&mut small, 16, 16, 4).unwrap();
        let texbuf = solid_texture(0);
        let texture =
            TextureView::new(bytemuck::cast_slice(&texbuf[..]), 64, Depth::Argb8888).unwrap();
        assert!(matches!(
            render_frame(&mut ctx, &map, &mut surface, &texture),
            Err(RenderError::SurfaceMismatch { .. })
        ));

        // mismatched texture depth
        let mut buf = vec![0u32; W * H];
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut buf);
        let mut surface = Surface::new(bytes, W, H, 4).unwrap();
        let tex8 = vec![0u8; 64 * 64];
        let texture = TextureView::new(&tex8, 64, Depth::Indexed8).unwrap();
        assert!(matches!(
            render_frame(&mut ctx, &map, &mut surface, &texture),
            Err(RenderError::DepthMismatch { .. })
        ));
    }

    #[test]
    fn indexed8_frames_render_too() {
        let mut map = room(-20.0, 20.0);
        map.link().unwrap();
        let camera = Camera::new(vec3(0.0, 0.0, 0.0), 0.0);
        let mut ctx = RenderContext::new(camera, W, H, 90.0);

        let tex = vec![7u8; 64 * 64];
        let mut buf = vec![0u8; W * H];
        let mut surface = Surface::new(&mut buf, W, H, 1).unwrap();
        let texture = TextureView::new(&tex, 64, Depth::Indexed8).unwrap();
        render_frame(&mut ctx, &map, &mut surface, &texture).unwrap();

        // palette texels pass through unshaded
        assert!(buf.iter().all(|&p| p == 7));
    }
}
