//! The Waypoint Store - an ordered, cyclic sequence of camera poses.
//!
//! Insertion order is travel order. Index arithmetic wraps modulo the store
//! length, so the last waypoint connects back to the first and the tracking
//! camera loops forever without the store ever being rotated or mutated.

use crate::camera::look_rotation;
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

// ============================================================================
// WAYPOINT
// ============================================================================

/// A single recorded camera pose used as a spline control point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// World-space position
    pub position: Vector3<f64>,

    /// Orientation (camera looks along its local -Z)
    pub rotation: UnitQuaternion<f64>,
}

impl Waypoint {
    /// Creates a waypoint from a position and rotation.
    pub fn new(position: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self { position, rotation }
    }

    /// Creates a waypoint with identity rotation.
    pub fn at(position: Vector3<f64>) -> Self {
        Self::new(position, UnitQuaternion::identity())
    }
}

// ============================================================================
// NEIGHBOR SET
// ============================================================================

/// The four waypoints (previous, current, next, next-next) that define
/// the spline and orientation curve of one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborSet {
    /// Store indices of the four control waypoints
    pub indices: [usize; 4],

    /// The control waypoints, in the same order as `indices`
    pub waypoints: [Waypoint; 4],
}

impl NeighborSet {
    /// Index of the segment's starting waypoint.
    pub fn segment(&self) -> usize {
        self.indices[1]
    }

    /// Control positions `[p0, p1, p2, p3]`.
    pub fn positions(&self) -> [Vector3<f64>; 4] {
        self.waypoints.map(|w| w.position)
    }

    /// Control rotations `[q0, q1, q2, q3]`.
    pub fn rotations(&self) -> [UnitQuaternion<f64>; 4] {
        self.waypoints.map(|w| w.rotation)
    }

    /// The waypoint the segment ends at.
    pub fn target(&self) -> &Waypoint {
        &self.waypoints[2]
    }
}

// ============================================================================
// STORE
// ============================================================================

/// Ordered, logically cyclic container of waypoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaypointStore {
    waypoints: Vec<Waypoint>,
}

impl WaypointStore {
    /// Minimum number of waypoints before a segment can be evaluated.
    pub const MIN_WAYPOINTS: usize = 4;

    /// Default minimum distance between a new waypoint and any existing one.
    pub const MIN_SPACING: f64 = 1.0;

    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds `count` waypoints on a circle of `radius` in the x/z plane at
    /// height `y`, then closes the loop so each one faces the next.
    pub fn ring(count: usize, radius: f64, y: f64) -> Self {
        let mut store = Self::new();
        let step = if count > 0 { TAU / count as f64 } else { 0.0 };

        for i in 0..count {
            let angle = i as f64 * step;
            store.push(Waypoint::at(Vector3::new(
                radius * angle.cos(),
                y,
                radius * angle.sin(),
            )));
        }

        store.close_loop_facing(&Vector3::y());
        store
    }

    /// Appends a waypoint to the end. Never fails.
    pub fn push(&mut self, waypoint: Waypoint) {
        self.waypoints.push(waypoint);
    }

    /// Appends a waypoint unless it lies within `min_distance` of an
    /// existing one.
    ///
    /// Returns the index of the new waypoint.
    pub fn push_spaced(&mut self, waypoint: Waypoint, min_distance: f64) -> Result<usize, PathError> {
        if let Some((index, distance)) = self.nearest(&waypoint.position) {
            if distance < min_distance {
                return Err(PathError::TooClose {
                    index,
                    distance,
                    min_distance,
                });
            }
        }

        self.waypoints.push(waypoint);
        Ok(self.waypoints.len() - 1)
    }

    /// Returns the index of and distance to the waypoint closest to `position`.
    pub fn nearest(&self, position: &Vector3<f64>) -> Option<(usize, f64)> {
        self.waypoints
            .iter()
            .enumerate()
            .map(|(i, w)| (i, (w.position - position).norm()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Number of waypoints.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Returns true if the store holds no waypoints.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Returns true if enough waypoints exist to evaluate a segment.
    pub fn is_trackable(&self) -> bool {
        self.waypoints.len() >= Self::MIN_WAYPOINTS
    }

    /// Returns the waypoint at `index` modulo the store length.
    pub fn get_wrapped(&self, index: usize) -> Option<&Waypoint> {
        if self.waypoints.is_empty() {
            return None;
        }
        self.waypoints.get(index % self.waypoints.len())
    }

    /// Returns the waypoint at `index` (no wraparound).
    pub fn get(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints.get(index)
    }

    /// Iterates over the waypoints in travel order.
    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter()
    }

    /// All waypoint positions in travel order.
    pub fn positions(&self) -> Vec<Vector3<f64>> {
        self.waypoints.iter().map(|w| w.position).collect()
    }

    /// Returns the control waypoints for the segment starting at `index`:
    /// `(index-1, index, index+1, index+2)`, all modulo the store length.
    pub fn neighbor_set(&self, index: usize) -> Result<NeighborSet, PathError> {
        let n = self.waypoints.len();
        if n < Self::MIN_WAYPOINTS {
            return Err(PathError::NotEnoughWaypoints {
                required: Self::MIN_WAYPOINTS,
                available: n,
            });
        }

        let i = index % n;
        let indices = [(i + n - 1) % n, i, (i + 1) % n, (i + 2) % n];
        let waypoints = indices.map(|k| self.waypoints[k]);

        Ok(NeighborSet { indices, waypoints })
    }

    /// Rotates every waypoint to face the next one; the last faces the first.
    ///
    /// This is the only in-place edit the store allows.
    pub fn close_loop_facing(&mut self, up: &Vector3<f64>) {
        let n = self.waypoints.len();
        if n < 2 {
            return;
        }

        for i in 0..n {
            let next = self.waypoints[(i + 1) % n].position;
            let direction = next - self.waypoints[i].position;
            self.waypoints[i].rotation = look_rotation(&direction, up);
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Errors raised by the waypoint store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathError {
    #[error("Tracking needs at least {required} waypoints, store has {available}")]
    NotEnoughWaypoints { required: usize, available: usize },

    #[error("Waypoint rejected: {distance:.3} from waypoint #{index} (minimum {min_distance})")]
    TooClose {
        index: usize,
        distance: f64,
        min_distance: f64,
    },
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn square() -> WaypointStore {
        let mut store = WaypointStore::new();
        store.push(Waypoint::at(Vector3::new(8.0, 0.0, 0.0)));
        store.push(Waypoint::at(Vector3::new(0.0, 0.0, 8.0)));
        store.push(Waypoint::at(Vector3::new(-8.0, 0.0, 0.0)));
        store.push(Waypoint::at(Vector3::new(0.0, 0.0, -8.0)));
        store
    }

    #[test]
    fn test_neighbor_set_wraps_at_end() {
        let store = WaypointStore::ring(6, 8.0, 0.0);
        let set = store.neighbor_set(5).unwrap();
        assert_eq!(set.indices, [4, 5, 0, 1]);
        assert_eq!(set.segment(), 5);
    }

    #[test]
    fn test_neighbor_set_wraps_at_start() {
        let store = square();
        let set = store.neighbor_set(0).unwrap();
        assert_eq!(set.indices, [3, 0, 1, 2]);
        assert_eq!(set.target().position, Vector3::new(0.0, 0.0, 8.0));
    }

    #[test]
    fn test_neighbor_set_requires_four() {
        let mut store = WaypointStore::new();
        for i in 0..3 {
            store.push(Waypoint::at(Vector3::new(i as f64 * 5.0, 0.0, 0.0)));
        }

        assert_eq!(
            store.neighbor_set(0),
            Err(PathError::NotEnoughWaypoints { required: 4, available: 3 })
        );
        assert!(!store.is_trackable());
    }

    #[test]
    fn test_push_spaced_rejects_close_point() {
        let mut store = square();
        let result = store.push_spaced(Waypoint::at(Vector3::new(8.5, 0.0, 0.0)), 1.0);

        assert!(matches!(result, Err(PathError::TooClose { index: 0, .. })));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_push_spaced_accepts_distant_point() {
        let mut store = square();
        let index = store
            .push_spaced(Waypoint::at(Vector3::new(10.0, 0.0, 0.0)), WaypointStore::MIN_SPACING)
            .unwrap();

        assert_eq!(index, 4);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_push_spaced_into_empty_store() {
        let mut store = WaypointStore::new();
        assert_eq!(store.push_spaced(Waypoint::at(Vector3::zeros()), 1.0), Ok(0));
    }

    #[test]
    fn test_ring_layout() {
        let store = WaypointStore::ring(20, 8.0, 0.0);
        assert_eq!(store.len(), 20);

        for waypoint in store.iter() {
            assert_relative_eq!(waypoint.position.norm(), 8.0, epsilon = 1e-9);
            assert_relative_eq!(waypoint.position.y, 0.0);
        }
    }

    #[test]
    fn test_close_loop_faces_next_waypoint() {
        let mut store = square();
        store.close_loop_facing(&Vector3::y());

        let n = store.len();
        for i in 0..n {
            let here = store.get(i).unwrap();
            let next = store.get_wrapped(i + 1).unwrap();
            let forward = here.rotation * -Vector3::z();
            let expected = (next.position - here.position).normalize();
            assert_relative_eq!(forward, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_nearest() {
        let store = square();
        let (index, distance) = store.nearest(&Vector3::new(0.0, 0.0, 7.0)).unwrap();
        assert_eq!(index, 1);
        assert_relative_eq!(distance, 1.0);
        assert!(WaypointStore::new().nearest(&Vector3::zeros()).is_none());
    }

    proptest! {
        #[test]
        fn prop_push_spaced_keeps_minimum_spacing(
            points in prop::collection::vec((-5.0f64..5.0, -5.0f64..5.0, -5.0f64..5.0), 1..40),
        ) {
            let mut store = WaypointStore::new();
            for (x, y, z) in points {
                let _ = store.push_spaced(Waypoint::at(Vector3::new(x, y, z)), WaypointStore::MIN_SPACING);
            }

            let positions = store.positions();
            for (i, a) in positions.iter().enumerate() {
                for b in positions.iter().skip(i + 1) {
                    prop_assert!((a - b).norm() >= WaypointStore::MIN_SPACING);
                }
            }
        }
    }
}
