pub mod demo;
mod geometry;
mod light;
mod slope;

pub use geometry::{
    Line, LineId, MapData, MapError, Sector, SectorId, Side, SideId, SlopeId, Vertex, VertexId,
};
pub use light::LightFog;
pub use slope::Slope;
