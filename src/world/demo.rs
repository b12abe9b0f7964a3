//! Built-in test map: a long sloped hall with a small flat annex behind a
//! portal on its north wall.  The hall's floor and ceiling both tilt, so a
//! walk through it exercises every drawer the renderer has.

use glam::{Vec3, vec2, vec3};
use once_cell::sync::Lazy;

use crate::world::{LightFog, Line, MapData, Sector, Side, Slope, Vertex};

/// Where the viewer drops the camera: a little back from the hall centre,
/// eye below the flat annex ceiling.
pub const SPAWN_POS: Vec3 = vec3(0.0, -192.0, -39.0);
pub const SPAWN_ANGLE: f32 = 0.0;

static DEMO: Lazy<MapData> = Lazy::new(|| {
    let mut map = build();
    map.link().expect("built-in demo map must link");
    map
});

/// The linked demo map.  Cheap to call; built once.
pub fn demo_map() -> &'static MapData {
    &DEMO
}

fn build() -> MapData {
    let light = LightFog {
        level: 128,
        r: 256,
        g: 256,
        b: 256,
        fog_start: 0.0,
        fog_stop: 0.0,
        fog_r: 90,
        fog_g: 0,
        fog_b: 0,
    };

    let vertices = [
        vec2(-64.0, 64.0),   // 0: hall nw
        vec2(64.0, 64.0),    // 1: hall ne
        vec2(96.0, 0.0),     // 2: east jog
        vec2(96.0, -512.0),  // 3: hall se
        vec2(-64.0, -512.0), // 4: hall sw
        vec2(0.0, 128.0),    // 5: annex apex
    ]
    .into_iter()
    .map(|pos| Vertex { pos })
    .collect();

    let sides = vec![
        Side::new(0),
        Side::new(0),
        Side::new(0),
        Side::new(0),
        Side::new(0),
        Side::new(1),
    ];

    let lines = vec![
        Line::portal(0, 1, [0, 5], [0, 1]), // shared edge hall/annex
        Line::solid(1, 2, 1, 0),
        Line::solid(2, 3, 2, 0),
        Line::solid(3, 4, 3, 0),
        Line::solid(4, 0, 4, 0),
        Line::solid(0, 5, 5, 1),
        Line::solid(5, 1, 5, 1),
    ];

    // Hall floor drops towards the south, its ceiling towards the east.
    let slopes = vec![
        Slope::new(vec3(-72.0, 64.0, -48.0), 0.0, -1.0, -0.2),
        Slope::new(vec3(-72.0, 64.0, 64.0), -1.0, 0.0, -0.2),
    ];

    let mut hall = Sector::new(-80.0, 64.0, light);
    hall.floor_slope = Some(0);
    hall.ceiling_slope = Some(1);

    let annex = Sector::new(-48.0, 32.0, light);

    MapData {
        vertices,
        sides,
        lines,
        sectors: vec![hall, annex],
        slopes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_map_links() {
        let map = demo_map();
        assert_eq!(map.sectors.len(), 2);
        assert_eq!(map.sectors[0].lines.len(), 5);
        assert_eq!(map.sectors[1].lines.len(), 3);
        // Slope planes were derived during linking.
        assert!(map.slopes[0].normal.z > 0.0);
        assert!(map.slopes[1].normal.z < 0.0);
    }
}
