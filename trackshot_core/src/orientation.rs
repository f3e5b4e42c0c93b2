//! The Orientation Interpolator - SQUAD (spherical quadrangle) over unit
//! quaternions.
//!
//! Each segment blends its two control rotations `q1 → q2` together with two
//! tangent ("intermediate") rotations built from the neighbours on either
//! side, so the camera's turn rate stays smooth through every waypoint:
//!
//! ```text
//! s_i      = q_i · exp(-(log(q_i⁻¹ q_{i+1}) + log(q_i⁻¹ q_{i-1})) / 4)
//! squad(t) = slerp(slerp(q1, q2, t), slerp(s1, s2, t), 2t(1 - t))
//! ```

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

/// Above this |dot| two rotations are blended linearly and renormalized.
const NLERP_THRESHOLD: f64 = 0.9995;

/// Below this norm a rotation vector is treated as zero.
const LOG_EPSILON: f64 = 1e-12;

/// Evaluates the orientation curve of one segment at local parameter `t`.
///
/// # Arguments
/// * `rotations` - Control rotations `[q0, q1, q2, q3]`
/// * `t` - Local parameter, 0 at `q1` and 1 at `q2`
///
/// Controls are first moved into a common hemisphere so the curve never
/// takes the long way round; the result at `t = 1` may therefore be `-q2`,
/// which is the same rotation.
pub fn interpolate(rotations: &[UnitQuaternion<f64>; 4], t: f64) -> UnitQuaternion<f64> {
    let [q0, q1, q2, q3] = align_hemispheres(rotations);

    let s1 = intermediate(&q0, &q1, &q2);
    let s2 = intermediate(&q1, &q2, &q3);

    squad(&q1, &q2, &s1, &s2, t)
}

/// Spherical quadrangle interpolation between `q1` and `q2` with tangent
/// rotations `s1` and `s2`.
pub fn squad(
    q1: &UnitQuaternion<f64>,
    q2: &UnitQuaternion<f64>,
    s1: &UnitQuaternion<f64>,
    s2: &UnitQuaternion<f64>,
    t: f64,
) -> UnitQuaternion<f64> {
    let outer = slerp(q1, q2, t);
    let inner = slerp(s1, s2, t);
    slerp(&outer, &inner, 2.0 * t * (1.0 - t))
}

/// Tangent rotation at `q` for a curve passing through `prev → q → next`.
pub fn intermediate(
    prev: &UnitQuaternion<f64>,
    q: &UnitQuaternion<f64>,
    next: &UnitQuaternion<f64>,
) -> UnitQuaternion<f64> {
    let inv = q.inverse();
    let to_next = log(&(inv * next));
    let to_prev = log(&(inv * prev));

    q * exp(&((to_next + to_prev) * -0.25))
}

/// Spherical linear interpolation without shortest-path correction.
///
/// SQUAD relies on the caller's choice of hemisphere, so unlike the usual
/// slerp this never negates `b`. Nearly parallel inputs fall back to a
/// normalized lerp.
pub fn slerp(a: &UnitQuaternion<f64>, b: &UnitQuaternion<f64>, t: f64) -> UnitQuaternion<f64> {
    let dot = a.coords.dot(&b.coords);

    if dot.abs() > NLERP_THRESHOLD {
        // Near-antipodal inputs are the same rotation; blend them as such
        let b = if dot < 0.0 { -b.coords } else { b.coords };
        let coords = a.coords + (b - a.coords) * t;
        return UnitQuaternion::new_normalize(Quaternion::from(coords));
    }

    let theta = dot.clamp(-1.0, 1.0).acos();
    let sin_theta = theta.sin();
    let wa = ((1.0 - t) * theta).sin() / sin_theta;
    let wb = (t * theta).sin() / sin_theta;

    UnitQuaternion::new_normalize(Quaternion::from(a.coords * wa + b.coords * wb))
}

/// Rotation angle (radians, in `[0, π]`) between two orientations,
/// treating `q` and `-q` as equal.
pub fn angular_distance(a: &UnitQuaternion<f64>, b: &UnitQuaternion<f64>) -> f64 {
    let dot = a.coords.dot(&b.coords).abs().min(1.0);
    2.0 * dot.acos()
}

/// Flips each control (after the first) into the hemisphere of its
/// predecessor.
fn align_hemispheres(rotations: &[UnitQuaternion<f64>; 4]) -> [UnitQuaternion<f64>; 4] {
    let mut aligned = *rotations;

    // q1 is the segment start and stays as given; q0 aligns backwards from it
    if aligned[0].coords.dot(&aligned[1].coords) < 0.0 {
        aligned[0] = negate(&aligned[0]);
    }
    for i in 2..4 {
        if aligned[i].coords.dot(&aligned[i - 1].coords) < 0.0 {
            aligned[i] = negate(&aligned[i]);
        }
    }

    aligned
}

fn negate(q: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::new_unchecked(-q.into_inner())
}

/// Logarithm of a unit quaternion as a rotation vector (axis · half-angle).
fn log(q: &UnitQuaternion<f64>) -> Vector3<f64> {
    let imag = q.imag();
    let sin_half = imag.norm();
    if sin_half < LOG_EPSILON {
        return Vector3::zeros();
    }
    let half_angle = sin_half.atan2(q.scalar());
    imag * (half_angle / sin_half)
}

/// Inverse of [`log`].
fn exp(v: &Vector3<f64>) -> UnitQuaternion<f64> {
    let half_angle = v.norm();
    if half_angle < LOG_EPSILON {
        return UnitQuaternion::identity();
    }
    let s = half_angle.sin() / half_angle;
    UnitQuaternion::new_normalize(Quaternion::new(half_angle.cos(), v.x * s, v.y * s, v.z * s))
}
