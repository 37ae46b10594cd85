//! Dense vector primitives.
//!
//! Binary operations check operand lengths explicitly and fail with
//! [`Error::DimensionMismatch`] instead of truncating to the shorter vector.
//! Norms accumulate in `f64` so that unit-normalized vectors stay within
//! `1e-6` of length one even for a few hundred dimensions.

use crate::error::{Error, Result};

/// Norms below this are treated as zero by [`normalize_in_place`].
pub const NORM_EPSILON: f32 = 1e-12;

#[inline]
fn check_dims(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() == b.len() {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        })
    }
}

/// Element-wise `a + b`.
pub fn add(a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
    check_dims(a, b)?;
    Ok(a.iter().zip(b).map(|(x, y)| x + y).collect())
}

/// Element-wise `a - b`.
pub fn subtract(a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
    check_dims(a, b)?;
    Ok(a.iter().zip(b).map(|(x, y)| x - y).collect())
}

/// `v * factor`.
pub fn scale(v: &[f32], factor: f32) -> Vec<f32> {
    v.iter().map(|x| x * factor).collect()
}

/// Inner product.
pub fn dot(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dims(a, b)?;
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    Ok(sum as f32)
}

/// L2 norm.
pub fn l2_norm(v: &[f32]) -> f32 {
    let sum: f64 = v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum();
    sum.sqrt() as f32
}

/// `‖a - b‖₂`.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dims(a, b)?;
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum();
    Ok(sum.sqrt() as f32)
}

/// Cosine similarity in `[-1, 1]`; `0.0` when either vector is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    let num = dot(a, b)?;
    let denom = l2_norm(a) * l2_norm(b);
    if denom < NORM_EPSILON {
        return Ok(0.0);
    }
    Ok((num / denom).clamp(-1.0, 1.0))
}

/// Scale `v` to unit L2 norm. The (near-)zero vector is left untouched.
pub fn normalize_in_place(v: &mut [f32]) {
    let sum: f64 = v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum();
    let norm = sum.sqrt();
    if norm < f64::from(NORM_EPSILON) {
        return;
    }
    for x in v.iter_mut() {
        *x = (f64::from(*x) / norm) as f32;
    }
}

/// TransE residual `h + r - t`.
pub fn translation_residual(h: &[f32], r: &[f32], t: &[f32]) -> Result<Vec<f32>> {
    check_dims(h, r)?;
    check_dims(h, t)?;
    Ok(h.iter()
        .zip(r)
        .zip(t)
        .map(|((h, r), t)| h + r - t)
        .collect())
}

/// `target += factor * v`.
pub(crate) fn add_scaled(target: &mut [f32], v: &[f32], factor: f32) -> Result<()> {
    check_dims(target, v)?;
    for (x, d) in target.iter_mut().zip(v) {
        *x += factor * d;
    }
    Ok(())
}
