use glam::Vec2;
use smallvec::SmallVec;

use crate::world::{light::LightFog, slope::Slope};

pub type VertexId = u16;
pub type SideId = u16;
pub type LineId = u16;
pub type SectorId = u16;
pub type SlopeId = u16;

/// Things that can be wrong with a map before the first frame.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MapError {
    #[error("line {0} references vertex {1} out of range")]
    BadVertex(LineId, VertexId),

    #[error("line {0} references side {1} out of range")]
    BadSide(LineId, SideId),

    #[error("side {0} references sector {1} out of range")]
    BadSector(SideId, SectorId),

    #[error("sector {0} references slope {1} out of range")]
    BadSlope(SectorId, SlopeId),

    #[error("sector {0} has a fog window with start == stop")]
    DegenerateFog(SectorId),

    #[error("line {0} has no front side")]
    NoFrontSide(LineId),
}

/// Map-space corner point.  Projection results are cached per frame by the
/// renderer, not here — the map itself is immutable after [`MapData::link`].
#[derive(Clone, Copy, Debug)]
pub struct Vertex {
    pub pos: Vec2,
}

/// One directional face of a line: texture alignment plus the sector it
/// belongs to.
#[derive(Clone, Copy, Debug)]
pub struct Side {
    pub x_offset: f32,
    pub y_offset: f32,
    pub x_scale: f32,
    pub y_scale: f32,
    pub sector: SectorId,
}

impl Side {
    pub fn new(sector: SectorId) -> Self {
        Self {
            x_offset: 0.0,
            y_offset: 0.0,
            x_scale: 1.0,
            y_scale: 1.0,
            sector,
        }
    }
}

/// Boundary edge between one or two sectors.  One side ⇒ solid wall,
/// two sides ⇒ portal.  `length` is filled in by [`MapData::link`].
#[derive(Clone, Copy, Debug)]
pub struct Line {
    pub v1: VertexId,
    pub v2: VertexId,
    pub length: f32,
    pub sides: [Option<SideId>; 2],
    pub sectors: [Option<SectorId>; 2],
}

impl Line {
    pub fn solid(v1: VertexId, v2: VertexId, side: SideId, sector: SectorId) -> Self {
        Self {
            v1,
            v2,
            length: 0.0,
            sides: [Some(side), None],
            sectors: [Some(sector), None],
        }
    }

    pub fn portal(v1: VertexId, v2: VertexId, sides: [SideId; 2], sectors: [SectorId; 2]) -> Self {
        Self {
            v1,
            v2,
            length: 0.0,
            sides: [Some(sides[0]), Some(sides[1])],
            sectors: [Some(sectors[0]), Some(sectors[1])],
        }
    }
}

/// Closed convex region.  `lines` is rebuilt by [`MapData::link`].
#[derive(Clone, Debug)]
pub struct Sector {
    pub floor_z: f32,
    pub ceiling_z: f32,
    pub light: LightFog,

    pub floor_slope: Option<SlopeId>,
    pub ceiling_slope: Option<SlopeId>,

    /// Bounding lines, unordered but fixed after linking.
    pub lines: SmallVec<[LineId; 8]>,
}

impl Sector {
    pub fn new(floor_z: f32, ceiling_z: f32, light: LightFog) -> Self {
        Self {
            floor_z,
            ceiling_z,
            light,
            floor_slope: None,
            ceiling_slope: None,
            lines: SmallVec::new(),
        }
    }

    /// Floor height under `(x, y)`, following the slope when present.
    #[inline]
    pub fn floor_at(&self, slopes: &[Slope], x: f32, y: f32) -> f32 {
        match self.floor_slope {
            Some(id) => slopes[id as usize].z_at(x, y),
            None => self.floor_z,
        }
    }

    /// Ceiling height above `(x, y)`, following the slope when present.
    #[inline]
    pub fn ceiling_at(&self, slopes: &[Slope], x: f32, y: f32) -> f32 {
        match self.ceiling_slope {
            Some(id) => slopes[id as usize].z_at(x, y),
            None => self.ceiling_z,
        }
    }
}

/// Immutable snapshot of one map, pre-linked for rendering.
///
/// All cross-references are indices into the flat arrays; [`MapData::link`]
/// must run once before the first frame and validates every one of them.
#[derive(Clone, Debug, Default)]
pub struct MapData {
    pub vertices: Vec<Vertex>,
    pub sides: Vec<Side>,
    pub lines: Vec<Line>,
    pub sectors: Vec<Sector>,
    pub slopes: Vec<Slope>,
}

impl MapData {
    /// One-time load pass: validate indices, compute line lengths, build
    /// per-sector bounding-line lists, derive slope plane vectors, reject
    /// malformed light data.
    pub fn link(&mut self) -> Result<(), MapError> {
        for (i, side) in self.sides.iter().enumerate() {
            if side.sector as usize >= self.sectors.len() {
                return Err(MapError::BadSector(i as SideId, side.sector));
            }
        }

        for (i, line) in self.lines.iter_mut().enumerate() {
            let id = i as LineId;
            for &v in &[line.v1, line.v2] {
                if v as usize >= self.vertices.len() {
                    return Err(MapError::BadVertex(id, v));
                }
            }
            for s in line.sides.iter().flatten() {
                if *s as usize >= self.sides.len() {
                    return Err(MapError::BadSide(id, *s));
                }
            }
            if line.sides[0].is_none() {
                return Err(MapError::NoFrontSide(id));
            }

            let v1 = self.vertices[line.v1 as usize].pos;
            let v2 = self.vertices[line.v2 as usize].pos;
            line.length = (v2 - v1).length();
        }

        for (i, sector) in self.sectors.iter_mut().enumerate() {
            let id = i as SectorId;
            sector.lines.clear();
            if sector.light.is_malformed() {
                return Err(MapError::DegenerateFog(id));
            }
            for slope in [sector.floor_slope, sector.ceiling_slope]
                .into_iter()
                .flatten()
            {
                if slope as usize >= self.slopes.len() {
                    return Err(MapError::BadSlope(id, slope));
                }
            }
        }

        for (i, line) in self.lines.iter().enumerate() {
            for sec in line.sectors.iter().flatten() {
                self.sectors[*sec as usize].lines.push(i as LineId);
            }
        }

        for sector in &self.sectors {
            if let Some(id) = sector.floor_slope {
                self.slopes[id as usize].finish(false);
            }
            if let Some(id) = sector.ceiling_slope {
                self.slopes[id as usize].finish(true);
            }
        }

        Ok(())
    }
}
