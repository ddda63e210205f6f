use opencv::core::KeyPoint;
use opencv::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One located template instance: an axis-aligned rectangle in scene
/// coordinates plus its accumulated evidence.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,

    /// Inlier fraction of the accepted transform. Summed when regions merge,
    /// so it is not bounded by 1.
    pub confidence: f32,

    /// Set by consumers to mark a region outside their area of interest.
    /// Survives merges (logical OR).
    pub excluded: bool,
}

impl DetectionRegion {
    pub fn new(x: i32, y: i32, width: i32, height: i32, confidence: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
            excluded: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x as f64 && x < self.right() as f64 && y >= self.y as f64 && y < self.bottom() as f64
    }

    pub fn intersection_area(&self, other: &DetectionRegion) -> i64 {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            0
        } else {
            (right - left) as i64 * (bottom - top) as i64
        }
    }

    /// Bounding union of both rectangles. An empty rectangle contributes
    /// nothing to the bounds.
    pub fn union_bounds(&self, other: &DetectionRegion) -> (i32, i32, i32, i32) {
        if self.is_empty() {
            return (other.x, other.y, other.width, other.height);
        }
        if other.is_empty() {
            return (self.x, self.y, self.width, self.height);
        }
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        (left, top, right - left, bottom - top)
    }

    /// Fold `other` into this region: union bounds, summed confidence,
    /// OR-ed exclusion flag.
    pub fn absorb(&mut self, other: &DetectionRegion) {
        let (x, y, width, height) = self.union_bounds(other);
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        self.confidence += other.confidence;
        self.excluded |= other.excluded;
    }
}

/// Keypoint position and shape, detached from the OpenCV object.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub angle: f32,
    pub response: f32,
    pub octave: i32,
}

impl From<&KeyPoint> for Keypoint {
    fn from(kp: &KeyPoint) -> Self {
        let pt = kp.pt();
        Self {
            x: pt.x,
            y: pt.y,
            size: kp.size(),
            angle: kp.angle(),
            response: kp.response(),
            octave: kp.octave(),
        }
    }
}

/// Scene keypoint index paired with a template keypoint index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    pub scene_idx: usize,
    pub template_idx: usize,
    pub distance: f32,
}

/// Element type of a descriptor row, which decides the usable distance
/// metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DescriptorKind {
    Binary,
    Float,
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorKind::Binary => write!(f, "binary"),
            DescriptorKind::Float => write!(f, "floating-point"),
        }
    }
}
