//! Distance lighting and fog weights.
//!
//! The model is a linear ramp: a sector light never scales a wall below
//! `2·level − 224` nor above `2·level − 40` (capped at 256), and closeness
//! — the *inverse* view depth — adds `invdepth · 2560 · 4` between the
//! two.  Fog, when a sector carries a window, attenuates that scalar and
//! contributes an additive colour weighted by the remainder, so a fully
//! fogged pixel is exactly the fog colour.
//!
//! Everything here is format-independent; packing the scalar into texel
//! multipliers lives with the [`PixelFormat`](crate::render::pixel)
//! implementations.

use crate::world::LightFog;

/// Brightness scalar (0..=256, 1.8 fixed point) plus the fog blend weight
/// (0..=256, 0 = fog off).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Shade {
    pub ulight: u16,
    pub fog: u16,
}

/// Light ramp for walls and flat (constant-depth) spans.
///
/// `inv_depth` is 1/y in view space: it grows as the surface approaches
/// the eye, so brightness climbs towards the sector maximum up close and
/// settles at the minimum far away.
pub fn wall_shade(inv_depth: f32, light: &LightFog) -> Shade {
    let mut maxlight = i32::from(light.level) * 2 - 40;
    if maxlight > 256 {
        maxlight = 256;
    }

    let mut ulight: u16 = 0;
    if maxlight >= 0 {
        let mut li = f32::from(light.level) * 2.0 - 224.0;
        li += inv_depth * 2560.0 * 4.0;
        li = li.clamp(0.0, maxlight as f32);

        // the scalars are 1.8 fixed point; mirror the 9-bit wrap of the
        // original scalar range
        ulight = (li as i32 & 0x1FF).unsigned_abs() as u16;
    }

    let mut fog: u16 = 0;
    if light.fogged() {
        let f = (inv_depth - light.fog_stop) / (light.fog_start - light.fog_stop);
        let flight = if f > 1.0 {
            256
        } else if f < 0.0 {
            0
        } else {
            (f * 256.0) as u16
        };
        ulight = ((u32::from(ulight) * u32::from(flight)) >> 8) as u16;
        fog = 256 - flight;
    }

    Shade { ulight, fog }
}

/// Light ramp for sloped spans.
///
/// Slope brightness varies along the row, so the caller feeds the
/// interpolated plane-distance value straight in; only the sector clamp
/// window applies.  Fog on slopes is intentionally not wired up.
pub fn slope_shade(map: f32, light: &LightFog) -> Shade {
    let mut maxlight = i32::from(light.level) * 2 - 40;
    if maxlight > 256 {
        maxlight = 256;
    }
    let minlight = f32::from(light.level) * 2.0 - 224.0;

    let mut map = map.abs();
    if map < minlight {
        map = minlight;
    }
    if map > maxlight as f32 {
        map = maxlight as f32;
    }
    map = map.clamp(0.0, 256.0);

    Shade {
        ulight: map as u16,
        fog: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light(level: u16) -> LightFog {
        LightFog::flat(level)
    }

    #[test]
    fn dark_sectors_stay_dark_at_any_distance() {
        // level*2 - 40 <= 0 ⇒ scalar pinned to zero
        for level in [0u16, 10, 20] {
            for inv_depth in [0.0f32, 0.001, 0.1, 1.0, 100.0] {
                assert_eq!(wall_shade(inv_depth, &light(level)).ulight, 0);
            }
        }
    }

    #[test]
    fn shade_saturates_close_up() {
        let l = light(128);
        let max = (128 * 2 - 40) as u16;
        // Past the threshold the ramp clips to the sector maximum…
        let near = wall_shade(1.0, &l);
        assert_eq!(near.ulight, max);
        // …and cannot climb further.
        assert_eq!(wall_shade(50.0, &l).ulight, max);
    }

    #[test]
    fn shade_falls_off_with_depth() {
        let l = light(128);
        let far = wall_shade(0.001, &l);
        let near = wall_shade(0.02, &l);
        assert!(far.ulight < near.ulight);
        assert_eq!(far.fog, 0);
    }

    #[test]
    fn fog_weight_splits_the_blend() {
        let mut l = light(128);
        l.fog_start = 0.02; // fog clears up close
        l.fog_stop = 0.002; // solid fog far out
        l.fog_r = 200;

        // halfway through the window
        let s = wall_shade(0.011, &l);
        assert!(s.fog > 0 && s.fog < 256);

        // beyond the stop distance everything is fog
        let s = wall_shade(0.001, &l);
        assert_eq!(s.fog, 256);
        assert_eq!(s.ulight, 0);

        // closer than the start distance the fog weight vanishes
        let s = wall_shade(0.05, &l);
        assert_eq!(s.fog, 0);
    }

    #[test]
    fn slope_shade_clamps_to_window() {
        let l = light(128);
        let max = (128 * 2 - 40) as f32;
        let min = (128.0f32 * 2.0 - 224.0).max(0.0);
        assert_eq!(slope_shade(1000.0, &l).ulight, max as u16);
        assert_eq!(slope_shade(0.0, &l).ulight, min as u16);
        assert_eq!(slope_shade(-90.0, &l).ulight, 90);
        // and never any fog
        assert_eq!(slope_shade(500.0, &l).fog, 0);
    }
}
