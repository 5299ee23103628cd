use thiserror::Error;
use wasm_bindgen::JsValue;

/// Failure reported by a geocoding provider. Never escapes the resolver:
/// it is turned into an unresolved property instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeocodeError {
    #[error("no coordinates found for '{0}'")]
    NotFound(String),
    #[error("geocoding provider failed: {0}")]
    Provider(String),
    #[error("property has no address to geocode")]
    EmptyQuery,
}

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
    #[error("operation {0} was cancelled")]
    Cancelled(String),
    #[error("map engine has been disposed")]
    Disposed,
    #[error("map adapter unavailable: {0}")]
    AdapterUnavailable(String),
}

impl From<serde_json::Error> for GeoError {
    fn from(e: serde_json::Error) -> Self {
        GeoError::InvalidInput(e.to_string())
    }
}

impl From<serde_wasm_bindgen::Error> for GeoError {
    fn from(e: serde_wasm_bindgen::Error) -> Self {
        GeoError::InvalidInput(e.to_string())
    }
}

impl From<GeoError> for JsValue {
    fn from(e: GeoError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}
