//! Request DTOs for the roads proxy API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::cache::BoundingBox;
use crate::error::{ProxyError, Result};
use crate::roads::{road_query, WarmupTarget};

/// Request body for `POST /api/roads`
///
/// # Fields
/// - `bbox`: `"south,west,north,east"`
/// - `query`: Overpass QL forwarded verbatim to the mirrors
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoadsRequest {
    #[serde(default)]
    pub bbox: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
}

impl RoadsRequest {
    /// Validates the request and parses the bounding box.
    pub fn parse(&self) -> Result<(BoundingBox, &str)> {
        let bbox = non_blank(self.bbox.as_deref());
        let query = non_blank(self.query.as_deref());

        match (bbox, query) {
            (Some(bbox), Some(query)) => Ok((bbox.parse()?, query)),
            _ => Err(ProxyError::InvalidRequest(
                "bbox and query required".to_string(),
            )),
        }
    }
}

/// Request body for `POST /api/roads/warmup`
///
/// Without targets the shop directory chooses the regions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WarmupRequest {
    #[serde(default)]
    pub targets: Option<Vec<WarmupTargetRequest>>,
}

/// One explicitly requested warm-up region.
#[derive(Debug, Clone, Deserialize)]
pub struct WarmupTargetRequest {
    pub label: String,
    pub bbox: String,
    /// Defaults to the standard road query for the bbox
    #[serde(default)]
    pub query: Option<String>,
}

impl WarmupTargetRequest {
    pub fn into_target(self) -> Result<WarmupTarget> {
        let bbox: BoundingBox = self.bbox.parse()?;
        let query = match non_blank(self.query.as_deref()) {
            Some(query) => query.to_string(),
            None => road_query(&bbox),
        };
        Ok(WarmupTarget::new(self.label, bbox, query))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
