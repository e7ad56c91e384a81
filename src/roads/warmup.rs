//! Warm-up targets and reports
//!
//! Turns shop-directory city bounds into Overpass queries and collects the
//! per-target outcome of a warm-up run.

use std::fmt;

use crate::cache::BoundingBox;
use crate::directory::{CityBounds, ShopDirectory};
use crate::error::{Result, UpstreamError};

/// Road classes drawn on the map; `*_link` ramps are excluded separately.
const HIGHWAY_CLASSES: &str =
    "motorway|trunk|primary|secondary|tertiary|residential|unclassified|road|service|living_street";

/// Longest error text kept in a report line.
const MAX_REASON_CHARS: usize = 50;

/// Builds the standard road query for a bounding box.
pub fn road_query(bbox: &BoundingBox) -> String {
    let area = format!(
        "{:.6},{:.6},{:.6},{:.6}",
        bbox.south, bbox.west, bbox.north, bbox.east
    );
    format!(
        "[out:json][timeout:60];\
         (way[\"highway\"~\"{}\"][\"highway\"!~\".*_link\"]({}));\
         out geom;",
        HIGHWAY_CLASSES, area
    )
}

// == Warmup Settings ==
/// How directory cities become targets.
#[derive(Debug, Clone, Copy)]
pub struct WarmupSettings {
    /// Cities with the most shops first, at most this many
    pub city_limit: usize,
    /// Degrees added around the shop bounds
    pub buffer_deg: f64,
}

impl Default for WarmupSettings {
    fn default() -> Self {
        Self {
            city_limit: 5,
            buffer_deg: 0.27,
        }
    }
}

// == Warmup Target ==
/// A labelled region to pre-load.
#[derive(Debug, Clone)]
pub struct WarmupTarget {
    pub label: String,
    pub bbox: BoundingBox,
    pub query: String,
}

impl WarmupTarget {
    pub fn new(label: impl Into<String>, bbox: BoundingBox, query: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            bbox,
            query: query.into(),
        }
    }

    /// Target covering every shop of a city plus `buffer_deg` on each side.
    pub fn for_city(city: &CityBounds, buffer_deg: f64) -> Result<Self> {
        let bbox = city.bbox()?.expand(buffer_deg);
        Ok(Self::new(city.city.clone(), bbox, road_query(&bbox)))
    }
}

/// Asks the directory for its largest cities and turns them into targets.
pub async fn targets_from_directory(
    directory: &dyn ShopDirectory,
    settings: &WarmupSettings,
) -> Result<Vec<WarmupTarget>> {
    directory
        .top_cities(settings.city_limit)
        .await?
        .iter()
        .map(|city| WarmupTarget::for_city(city, settings.buffer_deg))
        .collect()
}

// == Warmup Outcome ==
#[derive(Debug, Clone, PartialEq)]
pub enum WarmupOutcome {
    /// Already fresh, nothing fetched
    Cached,
    /// Fetched from the primary mirror and stored
    Fetched { elements: usize },
    /// Primary mirror failed; nothing stored
    Failed(UpstreamError),
}

/// One line of a warm-up report.
#[derive(Debug, Clone)]
pub struct WarmupEntry {
    pub label: String,
    pub bbox: BoundingBox,
    pub outcome: WarmupOutcome,
}

impl fmt::Display for WarmupEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            WarmupOutcome::Cached => write!(f, "{} (from cache)", self.label),
            WarmupOutcome::Fetched { elements } => {
                let (height, width) = self.bbox.extent_km();
                write!(
                    f,
                    "{} ({} roads, {:.1}×{:.1}km)",
                    self.label, elements, height, width
                )
            }
            WarmupOutcome::Failed(UpstreamError::Rejected { status, .. }) => {
                write!(f, "{} (error {})", self.label, status)
            }
            WarmupOutcome::Failed(UpstreamError::RateLimited(_)) => {
                write!(f, "{} (error 429)", self.label)
            }
            WarmupOutcome::Failed(UpstreamError::GatewayTimeout(_)) => {
                write!(f, "{} (error 504)", self.label)
            }
            WarmupOutcome::Failed(err) => {
                let reason: String = err.to_string().chars().take(MAX_REASON_CHARS).collect();
                write!(f, "{} (error: {})", self.label, reason)
            }
        }
    }
}

// == Warmup Report ==
#[derive(Debug, Clone, Default)]
pub struct WarmupReport {
    pub entries: Vec<WarmupEntry>,
    /// Cache size once every target was processed
    pub cache_size: usize,
}

impl WarmupReport {
    pub fn push(&mut self, target: &WarmupTarget, outcome: WarmupOutcome) {
        self.entries.push(WarmupEntry {
            label: target.label.clone(),
            bbox: target.bbox,
            outcome,
        });
    }

    /// Human-readable line per target.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }

    pub fn fetched(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, WarmupOutcome::Fetched { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, WarmupOutcome::Failed(_)))
            .count()
    }
}
