//! Tunables for the map core.
//!
//! Every field has a default so the frontend can send a partial JSON document
//! (or nothing at all) and only override what it needs.

use serde::{Deserialize, Serialize};

use crate::error::GeoError;

/// Clustering tunables. Distances are in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterConfig {
    /// Above this zoom every property is drawn as its own marker.
    pub max_cluster_zoom: f64,
    /// Threshold at zoom 0.
    pub base_threshold_m: f64,
    /// Threshold reduction per zoom level.
    pub threshold_step_m: f64,
    /// Floor for the threshold.
    pub min_threshold_m: f64,
    /// Planar degree-to-meter factor used for neighbor distances.
    pub meters_per_degree: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            max_cluster_zoom: 14.0,
            base_threshold_m: 200.0,
            threshold_step_m: 10.0,
            min_threshold_m: 50.0,
            meters_per_degree: 111_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeatmapConfig {
    /// Grid cell edge in degrees (~1 km).
    pub cell_size_deg: f64,
    /// Intensity used when every cell has the same average price.
    pub degenerate_intensity: f64,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            cell_size_deg: 0.01,
            degenerate_intensity: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeometryConfig {
    /// Kilometers per degree of latitude.
    pub km_per_degree: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            km_per_degree: 111.32,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterConfig {
    /// Drop properties inside the drawn polygon's bounding box but outside the polygon itself.
    pub refine_to_polygon: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapCoreConfig {
    pub cluster: ClusterConfig,
    pub heatmap: HeatmapConfig,
    pub geometry: GeometryConfig,
    pub filter: FilterConfig,
}

impl MapCoreConfig {
    /// Parse a possibly partial JSON config. Blank input gives the defaults.
    pub fn from_json(input: &str) -> Result<Self, GeoError> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(input)?)
    }
}
