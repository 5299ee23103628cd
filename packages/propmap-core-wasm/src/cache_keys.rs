// Utility functions to generate consistent keys across the core.

use crate::models::{Property, Viewport};

/// Build the geocoding query "address, city, state", skipping blank parts.
pub fn make_geocode_query(property: &Property) -> String {
    [&property.address, &property.city, &property.state]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Cache key for a geocoding query: lower-cased with whitespace collapsed,
/// so "12 Main  St" and "12 main st" share one entry.
pub fn make_address_key(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Key identifying a viewport: "zoom/west_south_east_north". Bounds are rounded
/// to ~0.1 m so sub-pixel jitter from the map canvas does not count as a change.
/// Zoom is kept exact: any fractional step may cross the clustering cutoff.
pub fn make_viewport_key(viewport: &Viewport) -> String {
    let b = &viewport.bounds;
    format!(
        "{}/{:.6}_{:.6}_{:.6}_{:.6}",
        viewport.zoom, b.west, b.south, b.east, b.north
    )
}
