//! Camera poses and the free-flying edit camera.
//!
//! Conventions: right-handed world, +Y up, a camera looks along its local -Z.

use nalgebra::{Matrix4, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Pitch limit in degrees; looking straight up or down would make the
/// right vector degenerate.
pub const MAX_PITCH_DEG: f64 = 89.0;

/// Field-of-view limits in degrees for scroll zoom.
pub const MIN_ZOOM_DEG: f64 = 1.0;
pub const MAX_ZOOM_DEG: f64 = 45.0;

// ============================================================================
// POSE
// ============================================================================

/// A camera placement: what the tracking engine produces each frame and
/// what a renderer consumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
}

impl CameraPose {
    pub fn new(position: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self { position, rotation }
    }

    /// World-to-camera transform: `rotation⁻¹ · translate(-position)`.
    pub fn view_matrix(&self) -> Matrix4<f64> {
        self.rotation.inverse().to_homogeneous() * Matrix4::new_translation(&-self.position)
    }

    /// Model matrix placing a marker at this pose with uniform `scale`.
    pub fn model_matrix(&self, scale: f64) -> Matrix4<f64> {
        Matrix4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Matrix4::new_scaling(scale)
    }

    /// Viewing direction in world space.
    pub fn forward(&self) -> Vector3<f64> {
        self.rotation * -Vector3::z()
    }
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::new(Vector3::zeros(), UnitQuaternion::identity())
    }
}

/// Orientation that points a camera's -Z axis along `direction`.
///
/// Falls back to identity for a zero direction, and to an alternate up
/// axis when `direction` is parallel to `up`.
pub fn look_rotation(direction: &Vector3<f64>, up: &Vector3<f64>) -> UnitQuaternion<f64> {
    let Some(dir) = direction.try_normalize(1e-12) else {
        return UnitQuaternion::identity();
    };

    let up = if dir.cross(up).norm_squared() < 1e-12 {
        if dir.x.abs() < 0.9 { Vector3::x() } else { Vector3::z() }
    } else {
        *up
    };

    UnitQuaternion::look_at_rh(&dir, &up).inverse()
}

// ============================================================================
// FLY CAMERA
// ============================================================================

/// Keyboard movement directions for the fly camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Forward,
    Backward,
    Left,
    Right,
}

/// Configuration for a `FlyCamera`.
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Starting position
    pub position: Vector3<f64>,

    /// World up axis (default: +Y)
    pub world_up: Vector3<f64>,

    /// Heading in degrees; -90 looks down -Z
    pub yaw: f64,

    /// Elevation in degrees, clamped to ±`MAX_PITCH_DEG`
    pub pitch: f64,

    /// Units per second for keyboard movement (default: 2.5)
    pub movement_speed: f64,

    /// Degrees per pixel of mouse motion (default: 0.1)
    pub mouse_sensitivity: f64,

    /// Vertical field of view in degrees (default: 45)
    pub zoom: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            world_up: Vector3::y(),
            yaw: -90.0,
            pitch: 0.0,
            movement_speed: 2.5,
            mouse_sensitivity: 0.1,
            zoom: MAX_ZOOM_DEG,
        }
    }
}

impl CameraConfig {
    /// The overview camera: high above the origin looking down.
    pub fn overview() -> Self {
        Self {
            position: Vector3::new(0.0, 20.0, 0.0),
            yaw: 0.0,
            pitch: -90.0,
            ..Self::default()
        }
    }
}

/// Free-flying yaw/pitch camera driven by keyboard, mouse and scroll wheel.
#[derive(Debug, Clone)]
pub struct FlyCamera {
    pub position: Vector3<f64>,
    world_up: Vector3<f64>,
    yaw: f64,
    pitch: f64,
    movement_speed: f64,
    mouse_sensitivity: f64,
    zoom: f64,

    // Derived basis, refreshed whenever yaw/pitch change
    front: Vector3<f64>,
    right: Vector3<f64>,
    up: Vector3<f64>,
}

impl FlyCamera {
    pub fn new(config: CameraConfig) -> Self {
        let mut camera = Self {
            position: config.position,
            world_up: config.world_up,
            yaw: config.yaw,
            pitch: config.pitch.clamp(-MAX_PITCH_DEG, MAX_PITCH_DEG),
            movement_speed: config.movement_speed,
            mouse_sensitivity: config.mouse_sensitivity,
            zoom: config.zoom.clamp(MIN_ZOOM_DEG, MAX_ZOOM_DEG),
            front: -Vector3::z(),
            right: Vector3::x(),
            up: Vector3::y(),
        };
        camera.update_vectors();
        camera
    }

    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Vertical field of view in degrees.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn front(&self) -> Vector3<f64> {
        self.front
    }

    pub fn right(&self) -> Vector3<f64> {
        self.right
    }

    pub fn up(&self) -> Vector3<f64> {
        self.up
    }

    /// Moves the camera along its own basis.
    pub fn process_movement(&mut self, direction: Movement, elapsed: f64) {
        let velocity = self.movement_speed * elapsed;
        match direction {
            Movement::Forward => self.position += self.front * velocity,
            Movement::Backward => self.position -= self.front * velocity,
            Movement::Left => self.position -= self.right * velocity,
            Movement::Right => self.position += self.right * velocity,
        }
    }

    /// Turns the camera by a mouse offset in pixels (`dy` positive = up).
    pub fn process_mouse(&mut self, dx: f64, dy: f64) {
        self.yaw += dx * self.mouse_sensitivity;
        self.pitch = (self.pitch + dy * self.mouse_sensitivity).clamp(-MAX_PITCH_DEG, MAX_PITCH_DEG);
        self.update_vectors();
    }

    /// Narrows (positive `dy`) or widens the field of view.
    pub fn process_scroll(&mut self, dy: f64) {
        self.zoom = (self.zoom - dy).clamp(MIN_ZOOM_DEG, MAX_ZOOM_DEG);
    }

    pub fn rotation(&self) -> UnitQuaternion<f64> {
        look_rotation(&self.front, &self.world_up)
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose::new(self.position, self.rotation())
    }

    pub fn view_matrix(&self) -> Matrix4<f64> {
        self.pose().view_matrix()
    }

    /// Perspective projection using the current zoom as vertical FOV.
    pub fn projection(&self, aspect: f64, near: f64, far: f64) -> Matrix4<f64> {
        Matrix4::new_perspective(aspect, self.zoom.to_radians(), near, far)
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vector3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize();
        self.right = self.front.cross(&self.world_up).normalize();
        self.up = self.right.cross(&self.front).normalize();
    }
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector4};

    #[test]
    fn test_default_looks_down_negative_z() {
        let camera = FlyCamera::default();
        assert_relative_eq!(camera.front(), -Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(camera.pose().forward(), -Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_overview_pitch_is_clamped() {
        let camera = FlyCamera::new(CameraConfig::overview());
        assert_eq!(camera.pitch(), -MAX_PITCH_DEG);
        assert!(camera.front().y < -0.99);
        assert!(camera.right().iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_mouse_clamps_pitch() {
        let mut camera = FlyCamera::default();
        camera.process_mouse(0.0, 5000.0);
        assert_eq!(camera.pitch(), MAX_PITCH_DEG);

        camera.process_mouse(100.0, 0.0);
        assert_relative_eq!(camera.yaw(), -80.0, epsilon = 1e-12);
    }

    #[test]
    fn test_scroll_clamps_zoom() {
        let mut camera = FlyCamera::default();
        camera.process_scroll(10.0);
        assert_relative_eq!(camera.zoom(), 35.0);

        camera.process_scroll(100.0);
        assert_eq!(camera.zoom(), MIN_ZOOM_DEG);

        camera.process_scroll(-100.0);
        assert_eq!(camera.zoom(), MAX_ZOOM_DEG);
    }

    #[test]
    fn test_movement() {
        let mut camera = FlyCamera::default();
        camera.process_movement(Movement::Forward, 2.0);
        assert_relative_eq!(camera.position, Vector3::new(0.0, 0.0, -5.0), epsilon = 1e-12);

        camera.process_movement(Movement::Right, 1.0);
        assert_relative_eq!(camera.position, Vector3::new(2.5, 0.0, -5.0), epsilon = 1e-12);
    }

    #[test]
    fn test_view_matrix_maps_position_to_origin() {
        let pose = CameraPose::new(
            Vector3::new(3.0, 1.0, -2.0),
            look_rotation(&Vector3::new(1.0, 0.0, 1.0), &Vector3::y()),
        );
        let view = pose.view_matrix();

        let eye = view * Vector4::new(3.0, 1.0, -2.0, 1.0);
        assert_relative_eq!(eye, Vector4::new(0.0, 0.0, 0.0, 1.0), epsilon = 1e-12);

        // A point ahead of the camera lands on the -Z axis in view space
        let ahead = pose.position + pose.forward() * 4.0;
        let ahead = view.transform_point(&Point3::from(ahead));
        assert_relative_eq!(ahead, Point3::new(0.0, 0.0, -4.0), epsilon = 1e-12);
    }

    #[test]
    fn test_look_rotation_degenerate_inputs() {
        assert_eq!(look_rotation(&Vector3::zeros(), &Vector3::y()), UnitQuaternion::identity());

        let down = look_rotation(&-Vector3::y(), &Vector3::y());
        assert_relative_eq!(down * -Vector3::z(), -Vector3::y(), epsilon = 1e-12);
    }
}
