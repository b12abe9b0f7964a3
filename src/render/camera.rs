use glam::{Vec2, Vec3, vec2};

use std::f32::consts::{PI, TAU};

/// Free-flying eye point in map space.
///
/// * `pos.z` is an absolute height, not an offset above the floor — the
///   map may not have a floor under the camera at all.
/// * Heading only; the projection has no pitch.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub pos: Vec3,
    pub angle: f32,

    // cached by `setup()`, consumed by the per-frame transforms
    sin: f32,
    cos: f32,
}

/// cosf misbehaves right at the two straight-side angles; force the exact
/// zero so depth signs stay stable there.
fn safe_cos(ang: f32) -> f32 {
    if ang == PI / 2.0 || ang == 3.0 * PI / 2.0 {
        0.0
    } else {
        ang.cos()
    }
}

impl Camera {
    pub fn new(pos: Vec3, angle: f32) -> Self {
        let mut cam = Self {
            pos,
            angle,
            sin: 0.0,
            cos: 0.0,
        };
        cam.setup();
        cam
    }

    /// Advance along the facing direction.
    pub fn move_by(&mut self, dist: f32) {
        self.pos.x += self.angle.sin() * dist;
        self.pos.y += self.angle.cos() * dist;
    }

    /// Sidestep, positive to the right of the facing direction.
    pub fn strafe(&mut self, dist: f32) {
        self.pos.x += self.angle.cos() * dist;
        self.pos.y -= self.angle.sin() * dist;
    }

    pub fn rotate(&mut self, delta: f32) {
        self.angle += delta;
    }

    pub fn fly(&mut self, delta: f32) {
        self.pos.z += delta;
    }

    /// Normalise the heading into [0, 2π) and refresh the cached trig.
    /// Runs once per frame before any transform.
    pub fn setup(&mut self) {
        self.angle = self.angle.rem_euclid(TAU);
        self.sin = self.angle.sin();
        self.cos = safe_cos(self.angle);
    }

    #[inline(always)]
    pub fn sin(&self) -> f32 {
        self.sin
    }

    #[inline(always)]
    pub fn cos(&self) -> f32 {
        self.cos
    }

    /// Map point → view space: `.x` lateral (+right), `.y` depth ahead.
    #[inline]
    pub fn to_view(&self, p: Vec2) -> Vec2 {
        let d = p - self.pos.truncate();
        vec2(
            d.x * self.cos - d.y * self.sin,
            d.x * self.sin + d.y * self.cos,
        )
    }

    /// Map point with height → view space, matching [`Self::to_view`] on
    /// the horizontal axes: `.x` lateral, `.y` drop below the eye,
    /// `.z` depth ahead.  Used by the sloped-flat texture vectors.
    #[inline]
    pub fn to_view_3d(&self, map: Vec2, z: f32) -> Vec3 {
        let tx = map.x - self.pos.x;
        let ty = self.pos.z - z;
        let tz = map.y - self.pos.y;
        Vec3 {
            x: tx * self.cos - tz * self.sin,
            y: ty,
            z: tz * self.cos + tx * self.sin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;

    #[test]
    fn to_view_depth_is_forward() {
        let mut cam = Camera::new(Vec3::ZERO, 0.0);
        cam.setup();
        // Facing +y: a point straight ahead lands on the depth axis.
        let v = cam.to_view(vec2(0.0, 10.0));
        assert!(v.x.abs() < 1e-5 && (v.y - 10.0).abs() < 1e-5);
        // A point to the right keeps a positive lateral offset.
        let v = cam.to_view(vec2(5.0, 0.0));
        assert!((v.x - 5.0).abs() < 1e-5 && v.y.abs() < 1e-5);
    }

    #[test]
    fn move_then_face_east() {
        let mut cam = Camera::new(Vec3::ZERO, 0.0);
        cam.move_by(10.0);
        assert!((cam.pos.y - 10.0).abs() < 1e-5);

        cam.rotate(PI / 2.0);
        cam.setup();
        assert_eq!(cam.cos(), 0.0); // exact, not merely small
        cam.move_by(4.0);
        assert!((cam.pos.x - 4.0).abs() < 1e-4);
    }

    #[test]
    fn angle_wraps_into_range() {
        let mut cam = Camera::new(Vec3::ZERO, -0.5);
        cam.setup();
        assert!(cam.angle >= 0.0 && cam.angle < TAU);

        cam.rotate(10.0 * TAU + 0.25);
        cam.setup();
        assert!((cam.angle - (TAU - 0.5 + 0.25).rem_euclid(TAU)).abs() < 1e-4);
    }

    #[test]
    fn strafe_is_perpendicular() {
        let mut cam = Camera::new(vec3(1.0, 2.0, 0.0), 0.3);
        let before = cam.pos;
        cam.strafe(3.0);
        let d = cam.pos - before;
        // dot with the forward vector ~ 0
        let fwd = vec2(0.3f32.sin(), 0.3f32.cos());
        assert!(d.truncate().dot(fwd).abs() < 1e-5);
    }
}
