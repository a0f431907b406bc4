//! Perspective orbit camera with damped controls.

use glam::{Mat4, Vec3};

use crate::scene::Dispose;

/// Vertical field of view, in degrees.
pub const FOV_Y_DEGREES: f32 = 35.0;

/// Drag and wheel input, eased out over several frames.
#[derive(Clone, Debug)]
pub struct OrbitControls {
    /// Fraction of the remaining motion applied per update.
    pub damping: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Radians per pixel of drag.
    pub rotate_speed: f32,
    yaw_velocity: f32,
    pitch_velocity: f32,
    zoom_velocity: f32,
    disposed: bool,
}

impl OrbitControls {
    pub fn new() -> Self {
        Self {
            damping: 0.05,
            min_distance: 4.0,
            max_distance: 40.0,
            rotate_speed: 0.005,
            yaw_velocity: 0.0,
            pitch_velocity: 0.0,
            zoom_velocity: 0.0,
            disposed: false,
        }
    }

    /// Queue a drag of `dx`, `dy` pixels. Ignored once disposed.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        if self.disposed {
            return;
        }
        self.yaw_velocity -= dx * self.rotate_speed;
        self.pitch_velocity += dy * self.rotate_speed;
    }

    /// Queue a zoom; positive moves away.
    pub fn zoom(&mut self, amount: f32) {
        if self.disposed {
            return;
        }
        self.zoom_velocity += amount;
    }

    fn is_settled(&self) -> bool {
        self.yaw_velocity == 0.0 && self.pitch_velocity == 0.0 && self.zoom_velocity == 0.0
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispose for OrbitControls {
    fn dispose(&mut self) -> bool {
        let released = !self.disposed;
        self.disposed = true;
        self.yaw_velocity = 0.0;
        self.pitch_velocity = 0.0;
        self.zoom_velocity = 0.0;
        released
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// Orbit camera looking at the crystal.
pub struct Camera {
    /// Horizontal rotation angle in radians.
    pub yaw: f32,
    /// Vertical rotation angle in radians.
    pub pitch: f32,
    /// Distance from the target point.
    pub distance: f32,
    /// Point the camera orbits around.
    pub target: Vec3,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub controls: OrbitControls,
}

impl Camera {
    pub fn new(aspect: f32) -> Self {
        Self {
            yaw: 0.6,
            pitch: 0.25,
            distance: 14.0,
            target: Vec3::new(0.0, 1.0, 0.0),
            aspect,
            near: 0.1,
            far: 100.0,
            controls: OrbitControls::new(),
        }
    }

    /// Calculate the camera's world position.
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    /// Calculate the view matrix for rendering.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), self.aspect, self.near, self.far)
    }

    /// Match the viewport. Zero-sized viewports are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Apply one frame of damped control motion.
    pub fn update(&mut self) {
        let c = &mut self.controls;
        if c.is_settled() {
            return;
        }
        let d = c.damping;
        self.yaw += c.yaw_velocity * d;
        self.pitch = (self.pitch + c.pitch_velocity * d).clamp(-1.5, 1.5);
        self.distance = (self.distance + c.zoom_velocity * d).clamp(c.min_distance, c.max_distance);

        for v in [&mut c.yaw_velocity, &mut c.pitch_velocity, &mut c.zoom_velocity] {
            *v *= 1.0 - d;
            if v.abs() < 1e-5 {
                *v = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_updates_aspect() {
        let mut camera = Camera::new(1.0);
        camera.resize(1920, 1080);
        assert!((camera.aspect - 16.0 / 9.0).abs() < 1e-6);
        camera.resize(0, 1080);
        assert!((camera.aspect - 16.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_damped_rotation_eases_out() {
        let mut camera = Camera::new(1.0);
        let start = camera.yaw;
        camera.controls.rotate(-100.0, 0.0);

        camera.update();
        let first = camera.yaw - start;
        camera.update();
        let second = camera.yaw - start - first;

        assert!(first > 0.0);
        assert!(second > 0.0 && second < first);
    }

    #[test]
    fn test_disposed_controls_ignore_input() {
        let mut camera = Camera::new(1.0);
        assert!(camera.controls.dispose());
        assert!(!camera.controls.dispose());

        let before = camera.position();
        camera.controls.rotate(50.0, 50.0);
        camera.controls.zoom(10.0);
        camera.update();
        assert_eq!(camera.position(), before);
    }

    #[test]
    fn test_distance_clamped() {
        let mut camera = Camera::new(1.0);
        camera.controls.zoom(10_000.0);
        camera.update();
        assert_eq!(camera.distance, camera.controls.max_distance);
    }
}
