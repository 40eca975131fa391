//! Canonical spectral bands

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use canopy_core::Error;

/// A spectral band in the canonical stacking order.
///
/// Stacked observations put bands along the third axis in the order given
/// by [`Band::CANONICAL`] unless the configuration says otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Band {
    Red,
    Green,
    Blue,
    Nir,
    Swir1,
    Swir2,
}

impl Band {
    /// RED, GREEN, BLUE, NIR, SWIR1, SWIR2
    pub const CANONICAL: [Band; 6] = [
        Band::Red,
        Band::Green,
        Band::Blue,
        Band::Nir,
        Band::Swir1,
        Band::Swir2,
    ];

    /// Upper-case band name, e.g. `"NIR"`
    pub fn name(self) -> &'static str {
        match self {
            Band::Red => "RED",
            Band::Green => "GREEN",
            Band::Blue => "BLUE",
            Band::Nir => "NIR",
            Band::Swir1 => "SWIR1",
            Band::Swir2 => "SWIR2",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Band {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Band::CANONICAL
            .into_iter()
            .find(|band| band.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidParameter {
                name: "band",
                value: s.to_string(),
                reason: "expected one of RED, GREEN, BLUE, NIR, SWIR1, SWIR2".to_string(),
            })
    }
}
