use serde::Deserialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

// Create a console module for logging
pub mod console;
pub mod models;
pub mod config;
pub mod error;
mod module_state;
pub mod cache_manager;
pub mod cache_keys;
pub mod cancellation;
pub mod geocode;
pub mod cluster;
pub mod heatmap;
pub mod draw_geometry;
pub mod bbox_filter;
pub mod engine;
pub mod price_label;

use bbox_filter::FilterCriteria;
use config::MapCoreConfig;
use error::GeoError;
use geocode::{GeocodeResolver, JsGeocodeProvider};
use models::{BoundingBox, Coordinate, GeocodeProgress, GeocodedProperty, Property};
use module_state::ModuleState;

pub use engine::{MapEngine, MapEngineHandle};

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

#[wasm_bindgen]
extern "C" {
    // Host-supplied geocoder: resolves to {lng, lat} or {coordinates: [lng, lat]}
    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = geocodeAddress, catch)]
    pub fn geocode_address(query: &str) -> Result<js_sys::Promise, JsValue>;
}

#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => ($crate::console::log(&format!($($t)*)))
}

use std::sync::Once;
static INIT: Once = Once::new();

#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        module_state::init();
        console_log!("propmap core initialized");
    });
}

fn parse_properties(json: &str) -> Result<Vec<GeocodedProperty>, GeoError> {
    // Accept either geocoded entries or raw listings carrying their own coordinates
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Entry {
        Geocoded(GeocodedProperty),
        Raw(Property),
    }

    let entries: Vec<Entry> = serde_json::from_str(json)?;
    Ok(entries
        .into_iter()
        .map(|entry| match entry {
            Entry::Geocoded(p) => p,
            Entry::Raw(p) => GeocodedProperty::from_located(p),
        })
        .collect())
}

/// Resolve addresses for a JSON array of properties, one at a time.
/// Starting another batch with the same `operation_id` cancels this one.
#[wasm_bindgen]
pub async fn geocode_properties_async(
    input_json: String,
    operation_id: String,
    on_progress: Option<js_sys::Function>,
) -> Result<JsValue, JsValue> {
    let properties: Vec<Property> = serde_json::from_str(&input_json).map_err(GeoError::from)?;
    let token = cancellation::begin_operation(&operation_id);
    let resolver = GeocodeResolver::new(JsGeocodeProvider);

    let report = |progress: GeocodeProgress| {
        if let Some(callback) = &on_progress {
            if let Ok(value) = to_value(&progress) {
                let _ = callback.call1(&JsValue::NULL, &value);
            }
        }
    };

    let result = resolver.resolve_all(properties, report, Some(&token)).await;
    cancellation::finish_operation(&token);
    Ok(to_value(&result?)?)
}

#[wasm_bindgen]
pub fn cluster_properties(properties_json: &str, zoom: f64) -> Result<JsValue, JsValue> {
    let properties = parse_properties(properties_json)?;
    let features = cluster::cluster(&properties, zoom, &MapCoreConfig::default().cluster);
    Ok(to_value(&features)?)
}

/// Cluster and return marker descriptors ready for the render adapter.
#[wasm_bindgen]
pub fn build_markers(properties_json: &str, zoom: f64) -> Result<JsValue, JsValue> {
    let properties = parse_properties(properties_json)?;
    let markers: Vec<_> = cluster::cluster(&properties, zoom, &MapCoreConfig::default().cluster)
        .iter()
        .map(cluster::MapFeature::to_marker)
        .collect();
    Ok(to_value(&markers)?)
}

#[wasm_bindgen]
pub fn aggregate_heat_cells(properties_json: &str) -> Result<JsValue, JsValue> {
    let properties = parse_properties(properties_json)?;
    let cells: Vec<_> = heatmap::aggregate(&properties, &MapCoreConfig::default().heatmap)
        .iter()
        .map(heatmap::HeatCell::to_descriptor)
        .collect();
    Ok(to_value(&cells)?)
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct DrawGeometryResult {
    area_km2: f64,
    perimeter_km: f64,
    bounds: Option<BoundingBox>,
}

/// Area, perimeter and bounds for a JSON array of `{lng, lat}` vertices.
/// `bounds` is null when there are no vertices.
#[wasm_bindgen]
pub fn compute_draw_geometry(vertices_json: &str) -> Result<JsValue, JsValue> {
    let vertices: Vec<Coordinate> = serde_json::from_str(vertices_json).map_err(GeoError::from)?;
    let geometry =
        draw_geometry::compute_geometry(&vertices, &MapCoreConfig::default().geometry);
    let result = DrawGeometryResult {
        area_km2: geometry.area_km2,
        perimeter_km: geometry.perimeter_km,
        bounds: draw_geometry::bounding_box(&vertices),
    };
    Ok(to_value(&result)?)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterInput {
    properties: Vec<Property>,
    #[serde(default)]
    criteria: FilterCriteria,
    #[serde(default)]
    bounds: Option<BoundingBox>,
}

#[wasm_bindgen]
pub fn filter_properties(input_json: &str) -> Result<JsValue, JsValue> {
    let input: FilterInput = serde_json::from_str(input_json).map_err(GeoError::from)?;
    let matches = bbox_filter::filter(&input.properties, &input.criteria, input.bounds.as_ref());
    Ok(to_value(&matches)?)
}

#[wasm_bindgen]
pub fn get_geocode_cache_stats() -> Result<JsValue, JsValue> {
    let stats = ModuleState::with(|state| state.geocode_cache.stats());
    Ok(to_value(&stats)?)
}

#[wasm_bindgen]
pub fn clear_geocode_cache() -> bool {
    ModuleState::with_mut(|state| state.geocode_cache.clear());
    console_log!("Geocode cache cleared");
    true
}
