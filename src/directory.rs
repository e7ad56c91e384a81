//! Shop Directory
//!
//! Read-only source of per-city shop bounds used to pick warm-up regions.
//! The shop records themselves live elsewhere; only the aggregates are read.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cache::BoundingBox;
use crate::error::{ProxyError, Result};

/// Aggregate extent of one city's shops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityBounds {
    pub city: String,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
    #[serde(default)]
    pub shop_count: u64,
}

impl CityBounds {
    /// Box spanning every shop of the city.
    pub fn bbox(&self) -> Result<BoundingBox> {
        BoundingBox::new(self.min_lat, self.min_lng, self.max_lat, self.max_lng)
    }
}

/// Anything that can list cities by shop count.
#[async_trait]
pub trait ShopDirectory: Send + Sync {
    /// Up to `limit` cities, most shops first.
    async fn top_cities(&self, limit: usize) -> Result<Vec<CityBounds>>;
}

// == Static Directory ==
/// In-memory directory, optionally loaded from a JSON array of [`CityBounds`].
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    cities: Vec<CityBounds>,
}

impl StaticDirectory {
    pub fn new(cities: Vec<CityBounds>) -> Self {
        Self { cities }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let cities: Vec<CityBounds> = serde_json::from_str(raw)
            .map_err(|e| ProxyError::Configuration(format!("invalid city bounds: {}", e)))?;
        Ok(Self::new(cities))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

#[async_trait]
impl ShopDirectory for StaticDirectory {
    async fn top_cities(&self, limit: usize) -> Result<Vec<CityBounds>> {
        let mut cities = self.cities.clone();
        cities.sort_by(|a, b| b.shop_count.cmp(&a.shop_count));
        cities.truncate(limit);
        Ok(cities)
    }
}
