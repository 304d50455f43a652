use blastfield_common::Aabb;
use blastfield_input::MoveIntent;
use blastfield_render::RenderView;
use glam::{Mat4, Vec3};

/// Fly camera with position, yaw, pitch, and projection parameters.
///
/// When `bounds` is set the position is clamped into it after every move.
pub struct FlyCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub speed: f32,
    pub boost: f32,
    pub sensitivity: f32,
    pub bounds: Option<Aabb>,
    home: (Vec3, f32, f32),
}

impl Default for FlyCamera {
    fn default() -> Self {
        let position = Vec3::new(0.0, 1.5, 10.0);
        let yaw = -90.0_f32.to_radians();
        Self {
            position,
            yaw,
            pitch: 0.0,
            fov: 75.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            speed: 5.0,
            boost: 3.0,
            sensitivity: 0.003,
            bounds: None,
            home: (position, yaw, 0.0),
        }
    }
}

impl FlyCamera {
    /// A camera confined to `ground` shrunk by `margin` horizontally, and to
    /// `[ground.min.y + min_height, ground.max.y + max_height]` vertically.
    pub fn bounded(ground: Aabb, margin: f32, min_height: f32, max_height: f32) -> Self {
        let inner = ground.shrink_xz(margin);
        let bounds = Aabb::new(
            Vec3::new(inner.min.x, ground.min.y + min_height, inner.min.z),
            Vec3::new(inner.max.x, ground.max.y + max_height, inner.max.z),
        );
        let mut camera = Self {
            bounds: Some(bounds),
            ..Self::default()
        };
        camera.position = bounds.clamp(camera.position);
        camera.home.0 = camera.position;
        camera
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward()).normalize()
    }

    /// Move by a held-button intent over `dt` seconds.
    pub fn apply(&mut self, intent: MoveIntent, dt: f32) {
        if intent.is_idle() {
            return;
        }
        let step = self.speed * dt * if intent.boost { self.boost } else { 1.0 };
        let delta =
            self.forward() * intent.forward + self.right() * intent.right + Vec3::Y * intent.up;
        self.position += delta * step;
        self.confine();
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch -= dy * self.sensitivity;
        self.pitch = self.pitch.clamp(-89.0_f32.to_radians(), 89.0_f32.to_radians());
    }

    /// Return to the start pose.
    pub fn reset(&mut self) {
        (self.position, self.yaw, self.pitch) = self.home;
    }

    fn confine(&mut self) {
        if let Some(bounds) = &self.bounds {
            self.position = bounds.clamp(self.position);
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Renderer-agnostic view description.
    pub fn render_view(&self) -> RenderView {
        RenderView {
            eye: self.position,
            target: self.position + self.forward(),
            fov_degrees: self.fov.to_degrees(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_faces_down_negative_z() {
        let cam = FlyCamera::default();
        assert_eq!(cam.position, Vec3::new(0.0, 1.5, 10.0));
        assert!(cam.forward().distance(Vec3::NEG_Z) < 1e-5);
        let vp = cam.view_projection();
        assert!(!vp.col(0).x.is_nan());
    }

    #[test]
    fn camera_movement() {
        let mut cam = FlyCamera::default();
        let start = cam.position;
        cam.apply(
            MoveIntent {
                forward: 1.0,
                ..Default::default()
            },
            1.0,
        );
        assert!(cam.position.z < start.z);
        assert!((cam.position.distance(start) - cam.speed).abs() < 1e-4);
    }

    #[test]
    fn boost_multiplies_speed() {
        let mut cam = FlyCamera::default();
        let start = cam.position;
        cam.apply(
            MoveIntent {
                right: 1.0,
                boost: true,
                ..Default::default()
            },
            0.5,
        );
        assert!((cam.position.x - start.x - cam.speed * cam.boost * 0.5).abs() < 1e-4);
    }

    #[test]
    fn bounded_camera_stays_inside() {
        let ground = Aabb::new(Vec3::new(-20.0, -1.0, -20.0), Vec3::new(20.0, 0.0, 20.0));
        let mut cam = FlyCamera::bounded(ground, 2.0, 0.5, 30.0);
        for _ in 0..100 {
            cam.apply(
                MoveIntent {
                    forward: 1.0,
                    up: -1.0,
                    ..Default::default()
                },
                1.0,
            );
        }
        assert!(cam.position.z >= -18.0 - 1e-4);
        assert!(cam.position.y >= -0.5 - 1e-4);
    }

    #[test]
    fn pitch_is_limited_and_reset_restores() {
        let mut cam = FlyCamera::default();
        cam.rotate(500.0, -10_000.0);
        assert!(cam.pitch <= 89.0_f32.to_radians());
        cam.reset();
        assert_eq!(cam.pitch, 0.0);
        assert_eq!(cam.position, Vec3::new(0.0, 1.5, 10.0));
    }

    #[test]
    fn render_view_matches_pose() {
        let view = FlyCamera::default().render_view();
        assert!((view.fov_degrees - 75.0).abs() < 1e-3);
        assert!(view.target.z < view.eye.z);
    }
}
