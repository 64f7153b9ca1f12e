use serde::{Deserialize, Serialize};
use std::fmt;

///
/// Crs
///
/// Spatial reference carried by layers and distance/area calculators.
/// Only the authority id and the geographic flag matter to measurements.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Crs {
    pub auth_id: String,
    #[serde(default)]
    pub geographic: bool,
}

impl Crs {
    #[must_use]
    pub fn new(auth_id: impl Into<String>, geographic: bool) -> Self {
        Self {
            auth_id: auth_id.into(),
            geographic,
        }
    }

    /// WGS 84 geographic coordinates.
    #[must_use]
    pub fn wgs84() -> Self {
        Self::new("EPSG:4326", true)
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.auth_id)
    }
}
