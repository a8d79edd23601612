//! Joint angle computation

use super::landmark::Keypoint;

const DENOMINATOR_EPSILON: f64 = 1e-6;

/// Angle at vertex `b` between rays `b→a` and `b→c`, in degrees (0-180).
///
/// Only the x/y projection is used. A zero-length ray yields 90° rather
/// than NaN.
pub fn angle_between(a: &Keypoint, b: &Keypoint, c: &Keypoint) -> f64 {
    let (bax, bay) = (a.x - b.x, a.y - b.y);
    let (bcx, bcy) = (c.x - b.x, c.y - b.y);

    let dot = bax * bcx + bay * bcy;
    let norms = bax.hypot(bay) * bcx.hypot(bcy);

    let cosine = (dot / (norms + DENOMINATOR_EPSILON)).clamp(-1.0, 1.0);
    cosine.acos().to_degrees()
}
