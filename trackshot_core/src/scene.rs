//! Render-agnostic scene description.
//!
//! Every object in the demo is a unit cube with a model matrix and a flat
//! colour; a renderer draws one cube per marker.

use crate::app::{AppState, ViewMode};
use nalgebra::{Matrix4, Vector3};
use serde::Serialize;

/// World-space positions of the decorative cubes.
pub const CUBE_POSITIONS: [[f64; 3]; 5] = [
    [0.0, 0.0, 0.0],
    [2.0, 5.0, 5.0],
    [-1.5, 2.2, -2.5],
    [-3.8, 2.0, -8.3],
    [2.4, -0.4, -3.5],
];

pub const GROUND_COLOR: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
pub const CUBE_COLOR: [f32; 4] = [0.0, 0.0, 1.0, 1.0];
pub const LIGHT_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
pub const WAYPOINT_COLOR: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
pub const CAMERA_COLOR: [f32; 4] = [1.0, 0.0, 1.0, 1.0];

const WAYPOINT_SCALE: f64 = 0.1;
const CAMERA_SCALE: f64 = 0.5;
const LIGHT_SCALE: f64 = 0.2;

/// Which pass the markers are for. The depth (shadow) pass leaves out the
/// light itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPass {
    Color,
    Depth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Ground,
    Cube,
    Light,
    Waypoint,
    TrackingCamera,
}

/// One cube to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneMarker {
    pub kind: MarkerKind,
    pub model: Matrix4<f64>,
    pub color: [f32; 4],
}

/// Lists everything to draw for `pass` in the current state.
pub fn markers(state: &AppState, pass: RenderPass) -> Vec<SceneMarker> {
    let mut markers = Vec::with_capacity(CUBE_POSITIONS.len() + state.store().len() + 3);

    if state.mode() == ViewMode::Edit {
        markers.push(SceneMarker {
            kind: MarkerKind::TrackingCamera,
            model: state.tracking_pose().model_matrix(CAMERA_SCALE),
            color: CAMERA_COLOR,
        });
    }

    markers.push(SceneMarker {
        kind: MarkerKind::Ground,
        model: Matrix4::new_translation(&Vector3::new(0.0, -2.0, 0.0))
            * Matrix4::new_nonuniform_scaling(&Vector3::new(20.0, 0.1, 20.0)),
        color: GROUND_COLOR,
    });

    if pass == RenderPass::Color {
        markers.push(SceneMarker {
            kind: MarkerKind::Light,
            model: Matrix4::new_translation(&state.light().position) * Matrix4::new_scaling(LIGHT_SCALE),
            color: LIGHT_COLOR,
        });
    }

    for waypoint in state.store().iter() {
        markers.push(SceneMarker {
            kind: MarkerKind::Waypoint,
            model: Matrix4::new_translation(&waypoint.position)
                * waypoint.rotation.to_homogeneous()
                * Matrix4::new_scaling(WAYPOINT_SCALE),
            color: WAYPOINT_COLOR,
        });
    }

    let axis = Vector3::new(1.0, 0.3, 0.5).normalize();
    for (i, position) in CUBE_POSITIONS.iter().enumerate() {
        let angle = (20.0 * i as f64).to_radians();
        markers.push(SceneMarker {
            kind: MarkerKind::Cube,
            model: Matrix4::new_translation(&Vector3::from(*position)) * Matrix4::new_rotation(axis * angle),
            color: CUBE_COLOR,
        });
    }

    markers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppConfig;

    fn count(markers: &[SceneMarker], kind: MarkerKind) -> usize {
        markers.iter().filter(|m| m.kind == kind).count()
    }

    #[test]
    fn test_edit_mode_shows_tracking_camera() {
        let app = AppState::default();
        let markers = markers(&app, RenderPass::Color);

        assert_eq!(count(&markers, MarkerKind::TrackingCamera), 1);
        assert_eq!(count(&markers, MarkerKind::Ground), 1);
        assert_eq!(count(&markers, MarkerKind::Light), 1);
        assert_eq!(count(&markers, MarkerKind::Waypoint), 20);
        assert_eq!(count(&markers, MarkerKind::Cube), 5);
        assert_eq!(markers.len(), 28);
    }

    #[test]
    fn test_tracking_mode_hides_tracking_camera() {
        let mut app = AppState::default();
        app.set_mode(ViewMode::Tracking);

        let markers = markers(&app, RenderPass::Color);
        assert_eq!(count(&markers, MarkerKind::TrackingCamera), 0);
        assert_eq!(markers.len(), 27);
    }

    #[test]
    fn test_depth_pass_skips_light() {
        let app = AppState::new(AppConfig {
            waypoint_count: 4,
            ..AppConfig::default()
        });
        let markers = markers(&app, RenderPass::Depth);

        assert_eq!(count(&markers, MarkerKind::Light), 0);
        assert_eq!(count(&markers, MarkerKind::Waypoint), 4);
    }

    #[test]
    fn test_ground_transform() {
        let app = AppState::default();
        let markers = markers(&app, RenderPass::Color);
        let ground = markers.iter().find(|m| m.kind == MarkerKind::Ground).unwrap();

        let corner = ground.model.transform_point(&nalgebra::Point3::new(0.5, 0.5, 0.5));
        approx::assert_relative_eq!(corner, nalgebra::Point3::new(10.0, -1.95, 10.0), epsilon = 1e-12);
    }
}
