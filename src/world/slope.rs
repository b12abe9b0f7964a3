use glam::{Vec3, vec3};

/// Planar slope attached to a sector floor or ceiling.
///
/// The plane is described by an origin point, a 2-D gradient direction and
/// a z delta per map unit travelled along that direction.  Everything else
/// (`normal`, `unit_z`, `is_ceiling`) is derived once by
/// [`MapData::link`](crate::world::MapData::link).
#[derive(Clone, Copy, Debug)]
pub struct Slope {
    pub origin: Vec3,

    /// Gradient direction on the map plane; need not be normalised.
    pub grad_x: f32,
    pub grad_y: f32,
    /// Height change per map unit along the gradient.
    pub z_delta: f32,

    /// Normalised plane normal (derived).
    pub normal: Vec3,
    /// z component of the normalised gradient vector (derived).
    pub unit_z: f32,
    /// Whether the slope caps a ceiling (derived from its owning sector).
    pub is_ceiling: bool,
}

impl Slope {
    pub fn new(origin: Vec3, grad_x: f32, grad_y: f32, z_delta: f32) -> Self {
        Self {
            origin,
            grad_x,
            grad_y,
            z_delta,
            normal: Vec3::ZERO,
            unit_z: 0.0,
            is_ceiling: false,
        }
    }

    /// Height of the plane above map point `(x, y)`.
    #[inline]
    pub fn z_at(&self, x: f32, y: f32) -> f32 {
        let dist = (x - self.origin.x) * self.grad_x + (y - self.origin.y) * self.grad_y;
        self.origin.z + dist * self.z_delta
    }

    /// Derive the plane normal and unit slope.  Called once at link time,
    /// after the owning sector tells us which way the surface faces.
    pub(crate) fn finish(&mut self, is_ceiling: bool) {
        self.is_ceiling = is_ceiling;

        let v1 = self.origin;
        let v2 = vec3(v1.x, v1.y + 10.0, self.z_at(v1.x, v1.y + 10.0));
        let v3 = vec3(v1.x + 10.0, v1.y, self.z_at(v1.x + 10.0, v1.y));

        // Wind the triangle so the normal points into the sector interior.
        let p = if is_ceiling {
            (v1 - v3).cross(v2 - v3)
        } else {
            (v1 - v2).cross(v3 - v2)
        };
        self.normal = p.normalize_or_zero();

        self.unit_z = vec3(self.grad_x, self.grad_y, self.z_delta)
            .normalize_or_zero()
            .z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z_at_follows_gradient() {
        // Drops 0.2 per unit travelled along -y.
        let s = Slope::new(vec3(-72.0, 64.0, -48.0), 0.0, -1.0, -0.2);
        assert_eq!(s.z_at(-72.0, 64.0), -48.0);
        // 64 units along the gradient: z rises by 64 * 0.2
        let z = s.z_at(-72.0, 0.0);
        assert!((z - (-48.0 + 64.0 * 0.2)).abs() < 1e-4);
        // Perpendicular moves never change the height.
        assert_eq!(s.z_at(100.0, 64.0), -48.0);
    }

    #[test]
    fn floor_normal_points_up() {
        let mut s = Slope::new(vec3(0.0, 0.0, 0.0), 1.0, 0.0, -0.25);
        s.finish(false);
        assert!(s.normal.z > 0.0);
        assert!((s.normal.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn ceiling_normal_points_down() {
        let mut s = Slope::new(vec3(0.0, 0.0, 64.0), 0.0, 1.0, 0.1);
        s.finish(true);
        assert!(s.normal.z < 0.0);
    }
}
