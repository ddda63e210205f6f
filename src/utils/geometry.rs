use serde::{Deserialize, Serialize};

/// A 2D point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(&self, other: &Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Pixel size of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: i32,
    pub height: i32,
}

impl ImageSize {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

impl From<opencv::core::Size> for ImageSize {
    fn from(size: opencv::core::Size) -> Self {
        Self {
            width: size.width,
            height: size.height,
        }
    }
}

/// 2x3 affine map `[a b tx; c d ty]` taking template coordinates to scene
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine2 {
    pub m: [[f64; 3]; 2],
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine2 {
    pub fn new(a: f64, b: f64, tx: f64, c: f64, d: f64, ty: f64) -> Self {
        Self {
            m: [[a, b, tx], [c, d, ty]],
        }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0)
    }

    /// Uniform scale followed by a rotation (degrees, counter-clockwise in
    /// matrix terms) and a translation.
    pub fn similarity(scale: f64, angle_degrees: f64, tx: f64, ty: f64) -> Self {
        let (sin, cos) = angle_degrees.to_radians().sin_cos();
        Self::new(scale * cos, -scale * sin, tx, scale * sin, scale * cos, ty)
    }

    pub fn apply(&self, p: Point2) -> Point2 {
        let [[a, b, tx], [c, d, ty]] = self.m;
        Point2 {
            x: a * p.x + b * p.y + tx,
            y: c * p.x + d * p.y + ty,
        }
    }

    /// Length of the first matrix row.
    pub fn scale_x(&self) -> f64 {
        self.m[0][0].hypot(self.m[0][1])
    }

    /// Length of the second matrix row.
    pub fn scale_y(&self) -> f64 {
        self.m[1][0].hypot(self.m[1][1])
    }

    /// Rotation angle in degrees within [0, 360).
    ///
    /// The angle magnitude comes from `acos(a / scale_x)`; the sign of
    /// `atan(-c / a)` picks the quadrant, so small clockwise and
    /// counter-clockwise rotations land near 0 and near 360 respectively
    /// instead of wrapping ambiguously.
    pub fn rotation_degrees(&self) -> f64 {
        let a = self.m[0][0];
        let c = self.m[1][0];
        let scale_x = self.scale_x();
        if scale_x == 0.0 {
            return 0.0;
        }
        let sign = (-c / a).atan();
        let degrees = (a / scale_x).clamp(-1.0, 1.0).acos().to_degrees();
        if (degrees > 90.0 && sign > 0.0) || (degrees < 90.0 && sign < 0.0) {
            360.0 - degrees
        } else {
            degrees
        }
    }
}
