use glam::Vec2;

use crate::render::camera::Camera;
use crate::render::view::Viewport;
use crate::render::visplane::PlaneArena;

/// Screen clipping bands, one slot per column: the vertical pixel gap not
/// yet covered by nearer geometry.  They start fully open each frame and
/// only ever narrow as walls land in front-to-back line order.
pub struct ClipBands {
    pub top: Vec<f32>,
    pub bot: Vec<f32>,
}

impl ClipBands {
    fn new(width: usize) -> Self {
        Self {
            top: vec![0.0; width],
            bot: vec![0.0; width],
        }
    }

    fn reset(&mut self, height: usize) {
        self.top.fill(0.0);
        self.bot.fill(height as f32 - 1.0);
    }
}

/// View-space projection of a vertex, remembered for the rest of the
/// frame so shared corners transform once.
#[derive(Clone, Copy)]
pub(crate) struct CachedVertex {
    pub view: Vec2,
    pub proj_x: f32,
    pub inv_depth: f32,
}

/// Everything one renderer instance mutates while producing a frame.
///
/// There are no globals: two contexts render independently (handy for
/// tests, or a picture-in-picture view), they just cannot share a
/// destination surface.
pub struct RenderContext {
    pub camera: Camera,
    pub view: Viewport,

    pub(crate) clip: ClipBands,
    pub(crate) span_start: Vec<i32>,
    pub(crate) vertex_cache: Vec<Option<CachedVertex>>,
    pub(crate) planes: PlaneArena,
}

impl RenderContext {
    /// Set up a context for a fixed viewport.  `fov_degrees` is the
    /// horizontal field of view (90 is the classic choice).
    pub fn new(camera: Camera, width: usize, height: usize, fov_degrees: f32) -> Self {
        let view = Viewport::new(width, height, fov_degrees);
        let mut planes = PlaneArena::default();
        planes.clear(width);
        Self {
            camera,
            view,
            clip: ClipBands::new(width),
            span_start: vec![0; height],
            vertex_cache: Vec::new(),
            planes,
        }
    }

    /// Per-frame reset: normalise the camera, open the clip bands, rewind
    /// the visplane arena and forget every cached vertex projection.
    pub fn begin_frame(&mut self, vertex_count: usize) {
        self.camera.setup();
        self.clip.reset(self.view.height);
        self.planes.clear(self.view.width);

        self.vertex_cache.clear();
        self.vertex_cache.resize(vertex_count, None);
    }

    /// Visplanes accumulated by the frame rendered last — mainly for
    /// inspection and tests.
    pub fn planes(&self) -> &PlaneArena {
        &self.planes
    }
}
