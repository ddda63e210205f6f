use crate::utils::geometry::{Affine2, ImageSize};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Bounds a fitted transform must respect to count as a plausible on-screen
/// instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationLimits {
    /// Maximum relative difference between the two axis scales.
    pub max_scale_skew: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    /// Fraction of the projected template allowed outside the scene per side.
    pub max_clip_fraction: f64,
    /// Allowed deviation from upright, in degrees either way.
    pub max_rotation_degrees: f64,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_scale_skew: 0.1,
            min_scale: 0.1,
            max_scale: 10.0,
            max_clip_fraction: 0.25,
            max_rotation_degrees: 45.0,
        }
    }
}

impl ValidationLimits {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(self.max_scale_skew >= 0.0) {
            errors.push("validation.max_scale_skew must be non-negative".to_string());
        }
        if !(self.min_scale > 0.0) || !(self.max_scale > self.min_scale) {
            errors.push("validation scale bounds must satisfy 0 < min_scale < max_scale".to_string());
        }
        if !(0.0..=0.5).contains(&self.max_clip_fraction) {
            errors.push("validation.max_clip_fraction must be within [0, 0.5]".to_string());
        }
        if !(0.0..=180.0).contains(&self.max_rotation_degrees) {
            errors.push("validation.max_rotation_degrees must be within [0, 180]".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Top,
    Right,
    Bottom,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Side::Left => "left",
            Side::Top => "top",
            Side::Right => "right",
            Side::Bottom => "bottom",
        };
        f.write_str(name)
    }
}

/// Why a round produced no region.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum Rejection {
    #[error("robust fit found no consensus")]
    NoConsensus,
    #[error("transform contains non-finite values")]
    NonFinite,
    #[error("non-positive axis scale (mirrored or collapsed)")]
    NonPositiveScale,
    #[error("axis scales disagree: {scale_x:.3} vs {scale_y:.3}")]
    ScaleSkew { scale_x: f64, scale_y: f64 },
    #[error("scale out of range: {scale_x:.3} x {scale_y:.3}")]
    ScaleOutOfRange { scale_x: f64, scale_y: f64 },
    #[error("projection clipped on the {0} side")]
    Clipped(Side),
    #[error("rotation of {degrees:.1} degrees")]
    ExcessiveRotation { degrees: f64 },
}

/// Check a template-to-scene transform against `limits`. Rules are applied
/// in a fixed order and the first failure is reported.
pub fn validate_transform(
    transform: &Affine2,
    template: ImageSize,
    scene: ImageSize,
    limits: &ValidationLimits,
) -> Result<(), Rejection> {
    if transform.m.iter().flatten().any(|v| !v.is_finite()) {
        return Err(Rejection::NonFinite);
    }

    let [[a, _, tx], [_, d, ty]] = transform.m;
    if a <= 0.0 || d <= 0.0 {
        return Err(Rejection::NonPositiveScale);
    }

    let scale_x = transform.scale_x();
    let scale_y = transform.scale_y();
    if (scale_y / scale_x - 1.0).abs() > limits.max_scale_skew {
        return Err(Rejection::ScaleSkew { scale_x, scale_y });
    }
    let in_range = |s: f64| s >= limits.min_scale && s <= limits.max_scale;
    if !in_range(scale_x) || !in_range(scale_y) {
        return Err(Rejection::ScaleOutOfRange { scale_x, scale_y });
    }

    let width = scale_x * template.width as f64;
    let height = scale_y * template.height as f64;
    let clip = limits.max_clip_fraction;
    if tx + clip * width < 0.0 {
        return Err(Rejection::Clipped(Side::Left));
    }
    if ty + clip * height < 0.0 {
        return Err(Rejection::Clipped(Side::Top));
    }
    if tx + (1.0 - clip) * width > scene.width as f64 {
        return Err(Rejection::Clipped(Side::Right));
    }
    if ty + (1.0 - clip) * height > scene.height as f64 {
        return Err(Rejection::Clipped(Side::Bottom));
    }

    let degrees = transform.rotation_degrees();
    if degrees > limits.max_rotation_degrees && degrees < 360.0 - limits.max_rotation_degrees {
        return Err(Rejection::ExcessiveRotation { degrees });
    }

    Ok(())
}
