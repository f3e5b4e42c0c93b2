//! The Spline Evaluator - non-uniform Catmull-Rom via the Barry–Goldman
//! pyramid of linear blends.
//!
//! Knot spacing grows by the distance between neighbouring control points
//! raised to `alpha`:
//! - `alpha = 0.0` → uniform Catmull-Rom
//! - `alpha = 0.5` → centripetal (no cusps or self-intersections in a segment)
//! - `alpha = 1.0` → chordal
//!
//! The curve interpolates its controls: `t = 0` yields `p1`, `t = 1` yields `p2`.

use nalgebra::Vector3;

/// Centripetal parametrization, the value the tracking camera uses.
pub const CENTRIPETAL_ALPHA: f64 = 0.5;

/// Distances below this are treated as coincident control points.
pub const MIN_KNOT_SPACING: f64 = 1e-9;

/// Evaluates the segment between `p1` and `p2` at local parameter `t`.
///
/// # Arguments
/// * `alpha` - Knot parametrization exponent (0.5 = centripetal)
/// * `points` - Control positions `[p0, p1, p2, p3]`
/// * `t` - Local parameter, 0 at `p1` and 1 at `p2`
///
/// An outer control that coincides with its inner neighbour (`p0 == p1` or
/// `p2 == p3`) gets a floored knot spacing. The two points it blends are the
/// same, so the curve stays finite and still runs from `p1` to `p2`.
///
/// # Errors
/// Returns `SplineError::CoincidentControlPoints` when `p1` and `p2`
/// coincide: the segment has no length to travel.
pub fn catmull_rom(alpha: f64, points: &[Vector3<f64>; 4], t: f64) -> Result<Vector3<f64>, SplineError> {
    let [p0, p1, p2, p3] = points;

    if (p2 - p1).norm() < MIN_KNOT_SPACING {
        return Err(SplineError::CoincidentControlPoints { first: 1, second: 2 });
    }

    let t0 = 0.0;
    let t1 = t0 + knot_spacing(alpha, p0, p1);
    let t2 = t1 + knot_spacing(alpha, p1, p2);
    let t3 = t2 + knot_spacing(alpha, p2, p3);

    // Remap t from [0, 1] into [t1, t2]
    let t = t1 + t * (t2 - t1);

    let a1 = blend(p0, p1, t0, t1, t);
    let a2 = blend(p1, p2, t1, t2, t);
    let a3 = blend(p2, p3, t2, t3, t);

    let b1 = blend(&a1, &a2, t0, t2, t);
    let b2 = blend(&a2, &a3, t1, t3, t);

    Ok(blend(&b1, &b2, t1, t2, t))
}

/// Samples `samples + 1` evenly spaced points along one segment,
/// both endpoints included. Used to draw the path for debugging.
pub fn sample_segment(
    alpha: f64,
    points: &[Vector3<f64>; 4],
    samples: usize,
) -> Result<Vec<Vector3<f64>>, SplineError> {
    let samples = samples.max(1);
    (0..=samples)
        .map(|i| catmull_rom(alpha, points, i as f64 / samples as f64))
        .collect()
}

/// Returns `|b - a|^alpha`, with the distance floored at `MIN_KNOT_SPACING`.
fn knot_spacing(alpha: f64, a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    (b - a).norm().max(MIN_KNOT_SPACING).powf(alpha)
}

/// Linear blend of `a` (at knot `ta`) and `b` (at knot `tb`), evaluated at `t`.
fn blend(a: &Vector3<f64>, b: &Vector3<f64>, ta: f64, tb: f64, t: f64) -> Vector3<f64> {
    let span = tb - ta;
    a * ((tb - t) / span) + b * ((t - ta) / span)
}

/// Errors raised by the spline evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SplineError {
    #[error("Control points p{first} and p{second} coincide (zero knot spacing)")]
    CoincidentControlPoints { first: usize, second: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn square() -> [Vector3<f64>; 4] {
        [
            Vector3::new(0.0, 0.0, -8.0),
            Vector3::new(8.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 8.0),
            Vector3::new(-8.0, 0.0, 0.0),
        ]
    }

    #[test]
    fn test_endpoints_interpolate() {
        let points = square();
        let start = catmull_rom(CENTRIPETAL_ALPHA, &points, 0.0).unwrap();
        let end = catmull_rom(CENTRIPETAL_ALPHA, &points, 1.0).unwrap();

        assert_relative_eq!(start, points[1], epsilon = 1e-9);
        assert_relative_eq!(end, points[2], epsilon = 1e-9);
    }

    #[test]
    fn test_midpoint_curves_outward() {
        // Equal spacing makes every alpha agree with the uniform spline:
        // (-p0 + 9 p1 + 9 p2 - p3) / 16
        let mid = catmull_rom(CENTRIPETAL_ALPHA, &square(), 0.5).unwrap();
        assert_relative_eq!(mid, Vector3::new(5.0, 0.0, 5.0), epsilon = 1e-9);

        let linear_mid = Vector3::new(4.0, 0.0, 4.0);
        assert!(mid.norm() > linear_mid.norm());
    }

    #[test]
    fn test_uniform_matches_closed_form() {
        let points = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 2.0, 0.0),
            Vector3::new(4.0, 2.0, 1.0),
            Vector3::new(5.0, -1.0, 3.0),
        ];
        let t: f64 = 0.3;
        let [p0, p1, p2, p3] = points;
        let expected = 0.5
            * ((2.0 * p1)
                + (-p0 + p2) * t
                + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t.powi(2)
                + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t.powi(3));

        let value = catmull_rom(0.0, &points, t).unwrap();
        assert_relative_eq!(value, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_coincident_points_rejected() {
        let mut points = square();
        points[2] = points[1];

        assert_eq!(
            catmull_rom(CENTRIPETAL_ALPHA, &points, 0.5),
            Err(SplineError::CoincidentControlPoints { first: 1, second: 2 })
        );
    }

    #[test]
    fn test_coincident_outer_points_stay_on_curve() {
        let base = square();
        let mut cases = Vec::new();
        let mut repeated_start = base;
        repeated_start[0] = base[1];
        cases.push(repeated_start);
        let mut repeated_end = base;
        repeated_end[3] = base[2];
        cases.push(repeated_end);

        for points in cases {
            let start = catmull_rom(CENTRIPETAL_ALPHA, &points, 0.0).unwrap();
            let end = catmull_rom(CENTRIPETAL_ALPHA, &points, 1.0).unwrap();
            assert_relative_eq!(start, points[1], epsilon = 1e-6);
            assert_relative_eq!(end, points[2], epsilon = 1e-6);

            // Small steps in t stay small in space
            let samples = sample_segment(CENTRIPETAL_ALPHA, &points, 64).unwrap();
            for pair in samples.windows(2) {
                assert!(pair.iter().all(|p| p.iter().all(|c| c.is_finite())));
                assert!((pair[1] - pair[0]).norm() < 1.0);
            }
        }
    }

    #[test]
    fn test_sample_segment_includes_endpoints() {
        let points = square();
        let samples = sample_segment(CENTRIPETAL_ALPHA, &points, 8).unwrap();

        assert_eq!(samples.len(), 9);
        assert_relative_eq!(samples[0], points[1], epsilon = 1e-9);
        assert_relative_eq!(samples[8], points[2], epsilon = 1e-9);
    }

    fn point() -> impl Strategy<Value = Vector3<f64>> {
        (-50.0..50.0f64, -50.0..50.0f64, -50.0..50.0f64).prop_map(|(x, y, z)| Vector3::new(x, y, z))
    }

    proptest! {
        #[test]
        fn prop_endpoints_interpolate(
            p0 in point(), p1 in point(), p2 in point(), p3 in point(),
            alpha in 0.0..1.0f64,
        ) {
            let points = [p0, p1, p2, p3];
            prop_assume!((p1 - p0).norm() > 0.1 && (p2 - p1).norm() > 0.1 && (p3 - p2).norm() > 0.1);

            let start = catmull_rom(alpha, &points, 0.0).unwrap();
            let end = catmull_rom(alpha, &points, 1.0).unwrap();

            prop_assert!((start - p1).norm() < 1e-6);
            prop_assert!((end - p2).norm() < 1e-6);
        }
    }
}
