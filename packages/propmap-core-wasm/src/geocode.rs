//! Address to coordinate resolution.
//!
//! The resolver never fails a property: provider errors turn into
//! `resolved = false`, and callers leave such properties out of every spatial
//! pass while still listing them. Successful lookups are cached by normalized
//! address, so resolving the same address twice only hits the provider once.

use std::cell::RefCell;

use futures::future::{FutureExt, LocalBoxFuture};
use serde::Deserialize;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

use crate::cache_keys::{make_address_key, make_geocode_query};
use crate::cache_manager::GeocodeCache;
use crate::cancellation::CancellationToken;
use crate::console_log;
use crate::error::{GeoError, GeocodeError};
use crate::models::{CacheStats, Coordinate, GeocodeProgress, GeocodedProperty, Property};
use crate::module_state::ModuleState;

/// Something that can turn a free-text address into coordinates.
pub trait GeocodeProvider {
    fn geocode_address<'a>(
        &'a self,
        query: &'a str,
    ) -> LocalBoxFuture<'a, Result<Coordinate, GeocodeError>>;
}

/// Where resolved addresses are remembered.
pub trait GeocodeStore {
    fn lookup(&self, key: &str) -> Option<Coordinate>;
    fn store(&self, key: String, coordinates: Coordinate);
}

/// The process-wide cache held in `ModuleState`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalGeocodeStore;

impl GeocodeStore for GlobalGeocodeStore {
    fn lookup(&self, key: &str) -> Option<Coordinate> {
        ModuleState::with_mut(|state| state.geocode_cache.get(key))
    }

    fn store(&self, key: String, coordinates: Coordinate) {
        ModuleState::with_mut(|state| state.geocode_cache.insert(key, coordinates));
    }
}

/// A private cache, for embedding the resolver without sharing results.
#[derive(Debug, Default)]
pub struct LocalGeocodeStore {
    cache: RefCell<GeocodeCache>,
}

impl LocalGeocodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.borrow().stats()
    }
}

impl GeocodeStore for LocalGeocodeStore {
    fn lookup(&self, key: &str) -> Option<Coordinate> {
        self.cache.borrow_mut().get(key)
    }

    fn store(&self, key: String, coordinates: Coordinate) {
        self.cache.borrow_mut().insert(key, coordinates);
    }
}

// Shapes the JS helper may answer with
#[derive(Deserialize)]
#[serde(untagged)]
enum ProviderReply {
    Point { lng: f64, lat: f64 },
    Wrapped { coordinates: [f64; 2] },
}

impl From<ProviderReply> for Coordinate {
    fn from(reply: ProviderReply) -> Self {
        match reply {
            ProviderReply::Point { lng, lat } => Coordinate::new(lng, lat),
            ProviderReply::Wrapped { coordinates } => Coordinate::new(coordinates[0], coordinates[1]),
        }
    }
}

fn js_error(value: JsValue) -> GeocodeError {
    GeocodeError::Provider(
        value
            .as_string()
            .unwrap_or_else(|| format!("{:?}", value)),
    )
}

/// Provider backed by the host page's `wasmJsHelpers.geocodeAddress`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsGeocodeProvider;

impl GeocodeProvider for JsGeocodeProvider {
    fn geocode_address<'a>(
        &'a self,
        query: &'a str,
    ) -> LocalBoxFuture<'a, Result<Coordinate, GeocodeError>> {
        async move {
            let promise = crate::geocode_address(query).map_err(js_error)?;
            let value = JsFuture::from(promise).await.map_err(js_error)?;
            if value.is_null() || value.is_undefined() {
                return Err(GeocodeError::NotFound(query.to_string()));
            }
            let reply: ProviderReply = serde_wasm_bindgen::from_value(value)
                .map_err(|e| GeocodeError::Provider(e.to_string()))?;
            Ok(reply.into())
        }
        .boxed_local()
    }
}

pub struct GeocodeResolver<P, S = GlobalGeocodeStore> {
    provider: P,
    store: S,
}

impl<P: GeocodeProvider> GeocodeResolver<P> {
    /// Resolver sharing the process-wide cache.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            store: GlobalGeocodeStore,
        }
    }
}

impl<P: GeocodeProvider, S: GeocodeStore> GeocodeResolver<P, S> {
    pub fn with_store(provider: P, store: S) -> Self {
        Self { provider, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve one property. Properties that already carry valid coordinates
    /// are returned as resolved without touching the provider or the cache.
    pub async fn resolve(&self, property: Property) -> GeocodedProperty {
        if let Some(coordinates) = property.valid_coordinates() {
            return GeocodedProperty::resolved(property, coordinates);
        }

        let query = make_geocode_query(&property);
        match self.lookup_or_fetch(&query).await {
            Ok(coordinates) => GeocodedProperty::resolved(property, coordinates),
            Err(e) => {
                console_log!("Geocoding property {} failed: {}", property.id, e);
                GeocodedProperty::unresolved(property)
            }
        }
    }

    async fn lookup_or_fetch(&self, query: &str) -> Result<Coordinate, GeocodeError> {
        if query.is_empty() {
            return Err(GeocodeError::EmptyQuery);
        }
        let key = make_address_key(query);
        if let Some(coordinates) = self.store.lookup(&key) {
            return Ok(coordinates);
        }

        let coordinates = self.provider.geocode_address(query).await?;
        if !coordinates.is_valid() {
            return Err(GeocodeError::Provider(format!(
                "out of range coordinates for '{}'",
                query
            )));
        }
        self.store.store(key, coordinates);
        Ok(coordinates)
    }

    /// Resolve properties one after another, in input order, reporting
    /// `{current, total}` after each. Stops with `GeoError::Cancelled` once
    /// `cancel` is tripped; results of a cancelled run are discarded.
    pub async fn resolve_all<F>(
        &self,
        properties: Vec<Property>,
        mut on_progress: F,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<GeocodedProperty>, GeoError>
    where
        F: FnMut(GeocodeProgress),
    {
        let total = properties.len();
        console_log!("Geocoding {} properties", total);

        let mut resolved = Vec::with_capacity(total);
        for (index, property) in properties.into_iter().enumerate() {
            if let Some(token) = cancel {
                token.throw_if_cancelled()?;
            }
            resolved.push(self.resolve(property).await);
            on_progress(GeocodeProgress {
                current: index + 1,
                total,
            });
        }
        if let Some(token) = cancel {
            token.throw_if_cancelled()?;
        }

        let failed = resolved.iter().filter(|p| !p.resolved).count();
        console_log!(
            "Geocoding finished: {} resolved, {} unresolved",
            total - failed,
            failed
        );
        Ok(resolved)
    }
}
