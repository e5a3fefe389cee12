use glam::{Mat4, Vec3};

/// Perspective camera looking at a target point
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl PerspectiveCamera {
    pub fn new(fov_deg: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_deg,
            aspect,
            near,
            far,
        }
    }

    pub fn look_at(&mut self, position: Vec3, target: Vec3) {
        self.position = position;
        self.target = target;
    }

    /// Up vector that is never parallel to the view direction
    fn stable_up(&self) -> Vec3 {
        let forward = (self.target - self.position).normalize_or_zero();
        if forward.cross(self.up).length_squared() < 1e-8 {
            if forward.y > 0.0 {
                Vec3::Z
            } else {
                Vec3::NEG_Z
            }
        } else {
            self.up
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.stable_up())
    }

    /// Projection with depth mapped to 0..1
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_deg.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self::new(45.0, 1.0, 0.1, 1000.0)
    }
}

/// Preview camera position for a distance and pair of angles in degrees.
///
/// `vertical_deg` is the elevation above the horizon and `initial_deg` the
/// azimuth measured from +X towards +Z.
pub fn orbit_position(distance: f32, initial_deg: f32, vertical_deg: f32) -> Vec3 {
    let phi = (90.0 - vertical_deg).to_radians();
    let theta = initial_deg.to_radians();
    Vec3::new(
        distance * phi.sin() * theta.cos(),
        distance * phi.cos(),
        distance * phi.sin() * theta.sin(),
    )
}
