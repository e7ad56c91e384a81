//! Cache Key Module
//!
//! Bounding boxes and the rounded fingerprint used to address cache entries.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::ProxyError;

/// Decimal digits kept before hashing (~100m at the equator).
pub const KEY_PRECISION: i32 = 3;

// == Bounding Box ==
/// A south/west/north/east rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Creates a bounding box, rejecting NaN and infinite coordinates.
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Result<Self, ProxyError> {
        let bbox = Self {
            south,
            west,
            north,
            east,
        };
        if bbox.coords().iter().any(|c| !c.is_finite()) {
            return Err(ProxyError::InvalidRequest(format!(
                "bbox coordinates must be finite: {}",
                bbox
            )));
        }
        Ok(bbox)
    }

    /// Coordinates in request order.
    pub fn coords(&self) -> [f64; 4] {
        [self.south, self.west, self.north, self.east]
    }

    /// Grows the box by `degrees` on every side.
    pub fn expand(&self, degrees: f64) -> Self {
        Self {
            south: self.south - degrees,
            west: self.west - degrees,
            north: self.north + degrees,
            east: self.east + degrees,
        }
    }

    /// Approximate (height, width) in kilometres, 111km per degree.
    pub fn extent_km(&self) -> (f64, f64) {
        (
            (self.north - self.south) * 111.0,
            (self.east - self.west) * 111.0,
        )
    }

    /// Rounded fingerprint of this box.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::from_bbox(self)
    }
}

impl FromStr for BoundingBox {
    type Err = ProxyError;

    /// Parses `"south,west,north,east"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(ProxyError::InvalidRequest(format!(
                "bbox must have 4 comma-separated values, got {}",
                parts.len()
            )));
        }

        let mut coords = [0.0f64; 4];
        for (slot, part) in coords.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| {
                ProxyError::InvalidRequest(format!("bbox value is not a number: {:?}", part))
            })?;
        }

        Self::new(coords[0], coords[1], coords[2], coords[3])
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.south, self.west, self.north, self.east)
    }
}

// == Cache Key ==
/// Hex SHA-256 of the bounding box rounded to [`KEY_PRECISION`] digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for a bounding box.
    ///
    /// Coordinates are scaled to integers before formatting so that `-0.0`
    /// and `0.0` (and any float noise below the precision) collapse together.
    pub fn from_bbox(bbox: &BoundingBox) -> Self {
        let scale = 10f64.powi(KEY_PRECISION);
        let canonical = bbox
            .coords()
            .iter()
            .map(|c| ((c * scale).round() as i64).to_string())
            .collect::<Vec<_>>()
            .join(",");

        let digest = Sha256::digest(canonical.as_bytes());
        Self(format!("{:x}", digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
