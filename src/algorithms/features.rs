use crate::algorithms::registry::BackendPair;
use crate::pipeline::types::Keypoint;
use crate::utils::geometry::ImageSize;
use crate::Result;
use opencv::core::Mat;
use opencv::prelude::*;

/// Keypoints of one image with their descriptor rows.
///
/// Immutable once built; `descriptors.rows() == keypoints.len()` always holds.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    keypoints: Vec<Keypoint>,
    descriptors: Mat,
    size: ImageSize,
}

impl FeatureSet {
    pub fn empty(size: ImageSize) -> Self {
        Self {
            keypoints: Vec::new(),
            descriptors: Mat::default(),
            size,
        }
    }

    /// Extract features from a single-channel image.
    pub fn from_image(image: &Mat, backend: &mut BackendPair) -> Result<Self> {
        let size = ImageSize::from(image.size()?);
        let (keypoints, descriptors) = extract(image, backend)?;
        Ok(Self {
            keypoints,
            descriptors,
            size,
        })
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &Mat {
        &self.descriptors
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// Locate keypoints and describe them with the pair's descriptor half.
///
/// No keypoints (or an unusable backend) gives an empty list and a zero-row
/// matrix rather than an error.
pub fn extract(image: &Mat, backend: &mut BackendPair) -> Result<(Vec<Keypoint>, Mat)> {
    if !backend.is_usable() {
        log::warn!("feature backend unusable, no keypoints extracted");
        return Ok((Vec::new(), Mat::default()));
    }

    let mut located = backend.locate(image)?;
    if located.is_empty() {
        log::debug!("no keypoints found in {}x{} image", image.cols(), image.rows());
        return Ok((Vec::new(), Mat::default()));
    }

    let descriptors = backend.describe(image, &mut located)?;
    let keypoints: Vec<Keypoint> = located.iter().map(|kp| Keypoint::from(&kp)).collect();

    if descriptors.rows() as usize != keypoints.len() {
        return Err(anyhow::anyhow!(
            "descriptor rows ({}) do not match keypoints ({})",
            descriptors.rows(),
            keypoints.len()
        ));
    }

    log::trace!("extracted {} keypoints", keypoints.len());
    Ok((keypoints, descriptors))
}
