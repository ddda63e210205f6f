use crate::Result;
use opencv::core::{no_array, KeyPoint, Mat, Vector};
use opencv::features2d::Feature2DTrait;
use opencv::prelude::*;

/// Object-safe view of an OpenCV feature algorithm: the *locator* half finds
/// keypoints, the *descriptor* half turns them into one row each.
///
/// Every `Feature2D` implementation (ORB, BRISK, SIFT, AKAZE, ...) gets this
/// for free, which lets the registry keep heterogeneous backends behind one
/// boxed type.
pub trait FeatureBackend {
    /// Detect keypoints on a single-channel image.
    fn locate(&mut self, image: &Mat) -> Result<Vector<KeyPoint>>;

    /// Compute descriptors for `keypoints`. Keypoints the algorithm cannot
    /// describe are removed, so the returned row count always matches the
    /// keypoint count afterwards.
    fn describe(&mut self, image: &Mat, keypoints: &mut Vector<KeyPoint>) -> Result<Mat>;
}

impl<T: Feature2DTrait> FeatureBackend for T {
    fn locate(&mut self, image: &Mat) -> Result<Vector<KeyPoint>> {
        let mut keypoints = Vector::<KeyPoint>::new();
        Feature2DTrait::detect(self, image, &mut keypoints, &no_array())?;
        Ok(keypoints)
    }

    fn describe(&mut self, image: &Mat, keypoints: &mut Vector<KeyPoint>) -> Result<Mat> {
        let mut descriptors = Mat::default();
        Feature2DTrait::compute(self, image, keypoints, &mut descriptors)?;
        Ok(descriptors)
    }
}
