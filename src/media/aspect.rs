use serde::Serialize;
use std::fmt;

use super::{Geometry, MediaError};

const RATIO_16_9: f64 = 16.0 / 9.0;
const RATIO_9_16: f64 = 9.0 / 16.0;
const TOLERANCE: f64 = 0.001;

/// Orientation bucket used as the storage key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectClass {
    Landscape,
    Portrait,
    Other,
}

impl AspectClass {
    pub fn prefix(&self) -> &'static str {
        match self {
            AspectClass::Landscape => "landscape",
            AspectClass::Portrait => "portrait",
            AspectClass::Other => "other",
        }
    }
}

impl fmt::Display for AspectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

pub fn classify(width: u32, height: u32) -> Result<AspectClass, MediaError> {
    Ok(Geometry::new(width, height)?.aspect_class())
}

pub(crate) fn classify_ratio(ratio: f64) -> AspectClass {
    if (ratio - RATIO_16_9).abs() < TOLERANCE {
        AspectClass::Landscape
    } else if (ratio - RATIO_9_16).abs() < TOLERANCE {
        AspectClass::Portrait
    } else {
        AspectClass::Other
    }
}
