//! A single point light orbiting the scene, plus the orthographic
//! light-space transform a shadow pass renders with.

use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Orbit angular rate per unit of camera speed (radians per second).
pub const ORBIT_RATE: f64 = 0.1;

/// Half extent of the shadow frustum.
pub const SHADOW_EXTENT: f64 = 10.0;
pub const SHADOW_NEAR: f64 = 0.1;
pub const SHADOW_FAR: f64 = 30.0;

/// A white light circling the origin in the x/z plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitLight {
    pub position: Vector3<f64>,
    pub color: [f32; 3],

    /// Orbit radius (default: 10)
    pub radius: f64,
}

impl Default for OrbitLight {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 10.0, 0.0),
            color: [1.0, 1.0, 1.0],
            radius: 10.0,
        }
    }
}

impl OrbitLight {
    /// Moves the light along its orbit. Faster tracking shots spin the
    /// light faster; the height is left untouched.
    pub fn update(&mut self, time: f64, speed: f64) {
        let angle = time * speed * ORBIT_RATE;
        self.position.x = angle.sin() * self.radius;
        self.position.z = angle.cos() * self.radius;
    }

    /// `ortho(±10, ±10, 0.1, 30) · lookAt(light, origin, +Y)`.
    pub fn light_space_matrix(&self) -> Matrix4<f64> {
        let projection = Matrix4::new_orthographic(
            -SHADOW_EXTENT,
            SHADOW_EXTENT,
            -SHADOW_EXTENT,
            SHADOW_EXTENT,
            SHADOW_NEAR,
            SHADOW_FAR,
        );

        let eye = Point3::from(self.position);
        // Directly overhead the +Y up vector is parallel to the view direction
        let up = if self.position.xz().norm_squared() < 1e-12 {
            Vector3::z()
        } else {
            Vector3::y()
        };
        let view = Matrix4::look_at_rh(&eye, &Point3::origin(), &up);

        projection * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_orbit_start() {
        let mut light = OrbitLight::default();
        light.update(0.0, 2.5);
        assert_relative_eq!(light.position, Vector3::new(0.0, 10.0, 10.0), epsilon = 1e-12);
    }

    #[test]
    fn test_orbit_quarter_turn() {
        let mut light = OrbitLight::default();
        // angle = time · speed · 0.1 = π/2
        light.update(FRAC_PI_2 / (2.0 * ORBIT_RATE), 2.0);
        assert_relative_eq!(light.position, Vector3::new(10.0, 10.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_light_space_centers_origin() {
        let mut light = OrbitLight::default();
        light.update(1.3, 2.5);

        let clip = light.light_space_matrix().transform_point(&Point3::origin());
        assert_relative_eq!(clip.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(clip.y, 0.0, epsilon = 1e-9);
        assert!(clip.z > -1.0 && clip.z < 1.0);
    }

    #[test]
    fn test_light_space_overhead_is_finite() {
        let light = OrbitLight::default();
        assert!(light.light_space_matrix().iter().all(|v| v.is_finite()));
    }
}
