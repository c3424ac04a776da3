//! Vector helpers used by the scattering code.

use crate::Vec3;

/// Components below this magnitude count as zero.
const NEAR_ZERO_EPSILON: f32 = 1e-8;

/// Returns true if the vector is close to zero in all dimensions.
#[inline]
pub fn near_zero(v: Vec3) -> bool {
    v.abs().max_element() < NEAR_ZERO_EPSILON
}

/// Reflect a vector about a normal.
///
/// r = v - 2(v·n)n
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract a unit vector through a surface using Snell's law.
///
/// `etai_over_etat` is the ratio of refractive indices (incident over
/// transmitted). Total internal reflection is not detected here; callers
/// must check `etai_over_etat * sin_theta > 1.0` first.
#[inline]
pub fn refract(uv: Vec3, n: Vec3, etai_over_etat: f32) -> Vec3 {
    let cos_theta = (-uv).dot(n).min(1.0);
    let r_out_perp = etai_over_etat * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    r_out_perp + r_out_parallel
}
