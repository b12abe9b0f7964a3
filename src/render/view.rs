/// Projection constants derived once per viewport size / field of view.
///
/// `yfoc` carries the 1.6 aspect correction so flats keep square texels on
/// non-4:3 buffers; `focratio` relates the two focal lengths and shows up
/// wherever vertical distances are converted back to view depths.
#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    pub width: usize,
    pub height: usize,
    pub xcenter: f32,
    pub ycenter: f32,

    pub fov: f32, // degrees
    pub xfoc: f32,
    pub yfoc: f32,
    pub focratio: f32,

    /// Visibility scale for the distance-light falloff of sloped flats.
    pub slope_vis: f32,
}

/// Aspect the focal correction targets (the classic 320×200-on-4:3 look).
const ASPECT: f32 = 1.6;

impl Viewport {
    pub fn new(width: usize, height: usize, fov_degrees: f32) -> Self {
        let xcenter = width as f32 / 2.0;
        let ycenter = height as f32 / 2.0;

        let half_fov = (fov_degrees * 0.5).to_radians();
        let ratio = ASPECT / (width as f32 / height as f32);
        let xfoc = xcenter / half_fov.tan();
        let yfoc = xfoc * ratio;

        let slope_t = ((90.0 + fov_degrees * 0.5).to_radians()).tan();
        let slope_vis = 8.0 * slope_t * 16.0 * 320.0 / width as f32;

        Self {
            width,
            height,
            xcenter,
            ycenter,
            fov: fov_degrees,
            xfoc,
            yfoc,
            focratio: yfoc / xfoc,
            slope_vis,
        }
    }
}
