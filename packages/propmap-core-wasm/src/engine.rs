//! Explicit recompute-on-demand engine behind the interactive map.
//!
//! The host owns the event loop: it feeds property sets, viewport changes,
//! filter criteria and drawn vertices in, and gets a complete set of render
//! descriptors back from every pass. Nothing is updated incrementally; each
//! pass replaces the previous output wholesale.

use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

use crate::bbox_filter::{filter, FilterCriteria};
use crate::cache_keys::make_viewport_key;
use crate::cluster::{cluster, MapFeature};
use crate::config::MapCoreConfig;
use crate::console_log;
use crate::draw_geometry::{BoundsUpdate, DrawGeometry, DrawnPolygon};
use crate::error::GeoError;
use crate::heatmap::aggregate;
use crate::models::{
    BoundingBox, Coordinate, GeocodedProperty, HeatCellDescriptor, MarkerDescriptor, Property,
    Viewport,
};

/// Changes for the next pass. Absent fields keep their previous value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineInput {
    pub properties: Option<Vec<GeocodedProperty>>,
    /// Listings that skip geocoding; those without coordinates stay unresolved.
    pub raw_properties: Option<Vec<Property>>,
    pub viewport: Option<Viewport>,
    pub criteria: Option<FilterCriteria>,
    pub drawn_vertices: Option<Vec<Coordinate>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum AdapterStatus {
    Ready,
    Failed { reason: String, retryable: bool },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOutput {
    pub pass: u64,
    pub markers: Vec<MarkerDescriptor>,
    pub heat_cells: Vec<HeatCellDescriptor>,
    pub visible_count: usize,
    /// Properties matching the criteria that could not be placed on the map.
    pub unresolved_ids: Vec<String>,
    pub draw_geometry: DrawGeometry,
    pub draw_bounds: BoundsUpdate,
    pub adapter: AdapterStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum MarkerClickOutcome {
    #[serde(rename_all = "camelCase")]
    ZoomToBounds { bounds: BoundingBox },
    #[serde(rename_all = "camelCase")]
    SelectProperty { property_id: String },
    Unknown,
}

pub struct MapEngine {
    id: String,
    config: MapCoreConfig,
    properties: Vec<GeocodedProperty>,
    viewport: Option<Viewport>,
    viewport_key: Option<String>,
    criteria: FilterCriteria,
    polygon: DrawnPolygon,
    features: Vec<MapFeature>,
    pass: u64,
    adapter: AdapterStatus,
    disposed: bool,
}

impl MapEngine {
    pub fn new(config: MapCoreConfig) -> Self {
        let polygon = DrawnPolygon::new(config.geometry.clone());
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            config,
            properties: Vec::new(),
            viewport: None,
            viewport_key: None,
            criteria: FilterCriteria::default(),
            polygon,
            features: Vec::new(),
            pass: 0,
            adapter: AdapterStatus::Ready,
            disposed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn adapter_status(&self) -> &AdapterStatus {
        &self.adapter
    }

    fn ensure_live(&self) -> Result<(), GeoError> {
        if self.disposed {
            Err(GeoError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Apply the given changes and run a full pass. `properties` and
    /// `rawProperties` both replace the property set, so only one may be given.
    pub fn update(&mut self, input: EngineInput) -> Result<RenderOutput, GeoError> {
        self.ensure_live()?;
        if input.properties.is_some() && input.raw_properties.is_some() {
            return Err(GeoError::InvalidInput(
                "pass either properties or rawProperties, not both".to_string(),
            ));
        }

        if let Some(properties) = input.properties {
            self.properties = properties;
        }
        if let Some(raw) = input.raw_properties {
            self.properties = raw.into_iter().map(GeocodedProperty::from_located).collect();
        }
        if let Some(viewport) = input.viewport {
            self.viewport_key = Some(make_viewport_key(&viewport));
            self.viewport = Some(viewport);
        }
        if let Some(criteria) = input.criteria {
            self.criteria = criteria;
        }
        let draw_bounds = match input.drawn_vertices {
            Some(vertices) => self.polygon.set_vertices(vertices),
            None => BoundsUpdate::Unchanged,
        };

        Ok(self.recompute(draw_bounds))
    }

    /// Pan/zoom end from the map. Re-runs only when the viewport actually moved,
    /// so a burst of identical events costs one pass.
    pub fn on_bounds_changed(&mut self, viewport: Viewport) -> Result<Option<RenderOutput>, GeoError> {
        self.ensure_live()?;
        let key = make_viewport_key(&viewport);
        if self.viewport_key.as_deref() == Some(key.as_str()) {
            return Ok(None);
        }
        self.viewport_key = Some(key);
        self.viewport = Some(viewport);
        Ok(Some(self.recompute(BoundsUpdate::Unchanged)))
    }

    pub fn on_marker_clicked(&self, marker_id: &str) -> MarkerClickOutcome {
        match self.features.iter().find(|f| f.marker_id() == marker_id) {
            Some(MapFeature::Cluster(cluster)) => MarkerClickOutcome::ZoomToBounds {
                bounds: cluster.bounds,
            },
            Some(MapFeature::Single(single)) => MarkerClickOutcome::SelectProperty {
                property_id: single.property_id.clone(),
            },
            None => MarkerClickOutcome::Unknown,
        }
    }

    /// Record that the map canvas failed to come up. Passes keep running so the
    /// output is ready once the adapter recovers.
    pub fn mark_adapter_failed(&mut self, reason: &str) {
        console_log!("Map adapter failed for engine {}: {}", self.id, reason);
        self.adapter = AdapterStatus::Failed {
            reason: reason.to_string(),
            retryable: true,
        };
    }

    pub fn mark_adapter_ready(&mut self) {
        if self.adapter != AdapterStatus::Ready {
            console_log!("Map adapter recovered for engine {}", self.id);
        }
        self.adapter = AdapterStatus::Ready;
    }

    /// Error to surface when the host tries to draw while the adapter is down.
    pub fn require_adapter(&self) -> Result<(), GeoError> {
        match &self.adapter {
            AdapterStatus::Ready => Ok(()),
            AdapterStatus::Failed { reason, .. } => {
                Err(GeoError::AdapterUnavailable(reason.clone()))
            }
        }
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.properties.clear();
        self.features.clear();
        self.polygon.clear();
        self.viewport = None;
        self.viewport_key = None;
        self.disposed = true;
        console_log!("Map engine {} disposed after {} passes", self.id, self.pass);
    }

    fn search_bounds(&self) -> Option<BoundingBox> {
        self.polygon
            .bounds()
            .or_else(|| self.viewport.map(|v| v.bounds))
    }

    fn recompute(&mut self, draw_bounds: BoundsUpdate) -> RenderOutput {
        self.pass += 1;

        let bounds = self.search_bounds();
        let mut visible = filter(&self.properties, &self.criteria, bounds.as_ref());
        visible.retain(|p| p.position().is_some());
        if self.config.filter.refine_to_polygon && self.polygon.vertices().len() >= 3 {
            let polygon = &self.polygon;
            visible.retain(|p| p.position().map(|c| polygon.contains(&c)).unwrap_or(false));
        }

        let unresolved_ids = filter(&self.properties, &self.criteria, None)
            .iter()
            .filter(|p| p.position().is_none())
            .map(|p| p.id().to_string())
            .collect();

        let zoom = self.viewport.map(|v| v.zoom).unwrap_or(0.0);
        self.features = cluster(&visible, zoom, &self.config.cluster);
        let markers: Vec<MarkerDescriptor> = self.features.iter().map(MapFeature::to_marker).collect();
        let heat_cells: Vec<HeatCellDescriptor> = aggregate(&visible, &self.config.heatmap)
            .iter()
            .map(|cell| cell.to_descriptor())
            .collect();

        console_log!(
            "Engine {} pass {}: {} visible, {} markers, {} heat cells",
            self.id,
            self.pass,
            visible.len(),
            markers.len(),
            heat_cells.len()
        );

        RenderOutput {
            pass: self.pass,
            markers,
            heat_cells,
            visible_count: visible.len(),
            unresolved_ids,
            draw_geometry: self.polygon.geometry(),
            draw_bounds,
            adapter: self.adapter.clone(),
        }
    }
}

/// JS-facing wrapper around `MapEngine`.
#[wasm_bindgen]
pub struct MapEngineHandle {
    engine: MapEngine,
}

#[wasm_bindgen]
impl MapEngineHandle {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<MapEngineHandle, JsValue> {
        let config = MapCoreConfig::from_json(config_json.as_deref().unwrap_or(""))?;
        Ok(MapEngineHandle {
            engine: MapEngine::new(config),
        })
    }

    #[wasm_bindgen(getter)]
    pub fn id(&self) -> String {
        self.engine.id().to_string()
    }

    pub fn update(&mut self, input: JsValue) -> Result<JsValue, JsValue> {
        let input: EngineInput = from_value(input).map_err(GeoError::from)?;
        let output = self.engine.update(input)?;
        Ok(to_value(&output)?)
    }

    /// Returns `null` when the viewport did not change.
    #[wasm_bindgen(js_name = onBoundsChanged)]
    pub fn on_bounds_changed(&mut self, viewport: JsValue) -> Result<JsValue, JsValue> {
        let viewport: Viewport = from_value(viewport).map_err(GeoError::from)?;
        match self.engine.on_bounds_changed(viewport)? {
            Some(output) => Ok(to_value(&output)?),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = onMarkerClicked)]
    pub fn on_marker_clicked(&self, marker_id: &str) -> Result<JsValue, JsValue> {
        Ok(to_value(&self.engine.on_marker_clicked(marker_id))?)
    }

    #[wasm_bindgen(js_name = markAdapterFailed)]
    pub fn mark_adapter_failed(&mut self, reason: &str) {
        self.engine.mark_adapter_failed(reason);
    }

    #[wasm_bindgen(js_name = markAdapterReady)]
    pub fn mark_adapter_ready(&mut self) {
        self.engine.mark_adapter_ready();
    }

    /// Throws with the failure reason while the map adapter is down.
    #[wasm_bindgen(js_name = requireAdapter)]
    pub fn require_adapter(&self) -> Result<(), JsValue> {
        Ok(self.engine.require_adapter()?)
    }

    pub fn dispose(&mut self) {
        self.engine.dispose();
    }
}
