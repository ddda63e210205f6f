use crate::Result;
use opencv::core::{self, Mat};
use opencv::imgproc;
use opencv::prelude::*;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Which single channel feature extraction runs on.
///
/// Unrecognized names are kept verbatim as [`ChannelSelector::PassThrough`]:
/// the image is then handed to the backend unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChannelSelector {
    Red,
    Green,
    Blue,
    Grayscale,
    Hue,
    Saturation,
    Value,
    PassThrough(String),
}

impl ChannelSelector {
    /// Every selector that actually reduces an image.
    pub const ALL: [ChannelSelector; 7] = [
        ChannelSelector::Red,
        ChannelSelector::Green,
        ChannelSelector::Blue,
        ChannelSelector::Grayscale,
        ChannelSelector::Hue,
        ChannelSelector::Saturation,
        ChannelSelector::Value,
    ];

    pub fn parse(name: &str) -> Self {
        match name {
            "R" => ChannelSelector::Red,
            "G" => ChannelSelector::Green,
            "B" => ChannelSelector::Blue,
            "Grayscale" | "grayscale" => ChannelSelector::Grayscale,
            "H" => ChannelSelector::Hue,
            "S" => ChannelSelector::Saturation,
            "V" => ChannelSelector::Value,
            other => ChannelSelector::PassThrough(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ChannelSelector::Red => "R",
            ChannelSelector::Green => "G",
            ChannelSelector::Blue => "B",
            ChannelSelector::Grayscale => "Grayscale",
            ChannelSelector::Hue => "H",
            ChannelSelector::Saturation => "S",
            ChannelSelector::Value => "V",
            ChannelSelector::PassThrough(name) => name,
        }
    }
}

impl Default for ChannelSelector {
    fn default() -> Self {
        ChannelSelector::Grayscale
    }
}

impl fmt::Display for ChannelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelSelector {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for ChannelSelector {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<ChannelSelector> for String {
    fn from(selector: ChannelSelector) -> Self {
        selector.as_str().to_string()
    }
}

/// Reduce a BGR(A) image to one channel.
///
/// Single-channel input is returned as a copy whatever the selector; a
/// pass-through selector also returns the input untouched.
pub fn reduce(image: &Mat, selector: &ChannelSelector) -> Result<Mat> {
    let channels = image.channels();
    if channels == 1 {
        return Ok(image.clone());
    }
    if channels != 3 && channels != 4 {
        log::debug!(
            "cannot reduce {}-channel image, passing through unchanged",
            channels
        );
        return Ok(image.clone());
    }

    let mut reduced = Mat::default();
    match selector {
        ChannelSelector::Blue => core::extract_channel(image, &mut reduced, 0)?,
        ChannelSelector::Green => core::extract_channel(image, &mut reduced, 1)?,
        ChannelSelector::Red => core::extract_channel(image, &mut reduced, 2)?,
        ChannelSelector::Grayscale => {
            let code = if channels == 4 {
                imgproc::COLOR_BGRA2GRAY
            } else {
                imgproc::COLOR_BGR2GRAY
            };
            imgproc::cvt_color_def(image, &mut reduced, code)?;
        }
        ChannelSelector::Hue | ChannelSelector::Saturation | ChannelSelector::Value => {
            let hsv = to_hsv(image, channels)?;
            let index = match selector {
                ChannelSelector::Hue => 0,
                ChannelSelector::Saturation => 1,
                _ => 2,
            };
            core::extract_channel(&hsv, &mut reduced, index)?;
        }
        ChannelSelector::PassThrough(name) => {
            log::debug!("channel selector {:?} not recognized, image left as is", name);
            return Ok(image.clone());
        }
    }

    Ok(reduced)
}

fn to_hsv(image: &Mat, channels: i32) -> Result<Mat> {
    let mut hsv = Mat::default();
    if channels == 4 {
        let mut bgr = Mat::default();
        imgproc::cvt_color_def(image, &mut bgr, imgproc::COLOR_BGRA2BGR)?;
        imgproc::cvt_color_def(&bgr, &mut hsv, imgproc::COLOR_BGR2HSV)?;
    } else {
        imgproc::cvt_color_def(image, &mut hsv, imgproc::COLOR_BGR2HSV)?;
    }
    Ok(hsv)
}
