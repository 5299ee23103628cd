//! Property-based invariants for the map core's pure computations.
//!
//! 1. Above the clustering zoom every located property is its own marker.
//! 2. Clustering never assigns a property to more than one feature.
//! 3. Every cluster member lies within the threshold of the cluster's seed.
//! 4. Heat cell intensities stay in [0, 1] and counts add up.
//! 5. A single shared price gives intensity 0.5 everywhere.
//! 6. Fewer than three vertices measure zero.
//! 7. Area and perimeter are non-negative and ignore winding order.
//! 8. Filtering is repeatable and order-preserving.

use propmap_core_wasm::bbox_filter::{filter, FilterCriteria};
use propmap_core_wasm::cluster::{cluster, cluster_threshold_m, MapFeature};
use propmap_core_wasm::config::{ClusterConfig, GeometryConfig, HeatmapConfig};
use propmap_core_wasm::draw_geometry::compute_geometry;
use propmap_core_wasm::heatmap::aggregate;
use propmap_core_wasm::models::{Coordinate, GeocodedProperty, ListingType, Property};
use proptest::prelude::*;
use std::collections::HashSet;

// ── Helpers ─────────────────────────────────────────────────────────────

fn property(index: usize, lng: f64, lat: f64, price: f64, bedrooms: u32) -> GeocodedProperty {
    GeocodedProperty::resolved(
        Property {
            id: format!("p{}", index),
            coordinates: None,
            address: String::new(),
            city: String::new(),
            state: String::new(),
            price,
            currency: "USD".into(),
            property_type: if index % 2 == 0 { "house" } else { "condo" }.into(),
            listing_type: if index % 3 == 0 { ListingType::Rent } else { ListingType::Sale },
            bedrooms,
            bathrooms: 1,
            created_at: 0.0,
        },
        Coordinate::new(lng, lat),
    )
}

// City-sized spread around a fixed center so neighborhoods actually overlap
fn city_properties() -> impl Strategy<Value = Vec<GeocodedProperty>> {
    prop::collection::vec(
        (-0.02f64..0.02, -0.02f64..0.02, 500.0f64..2_000_000.0, 0u32..6),
        0..60,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (dx, dy, price, beds))| property(i, -87.63 + dx, 41.88 + dy, price, beds))
            .collect()
    })
}

fn vertices() -> impl Strategy<Value = Vec<Coordinate>> {
    prop::collection::vec((-0.05f64..0.05, -0.05f64..0.05), 0..12).prop_map(|points| {
        points
            .into_iter()
            .map(|(dx, dy)| Coordinate::new(13.40 + dx, 52.52 + dy))
            .collect()
    })
}

fn member_ids(features: &[MapFeature]) -> Vec<String> {
    features
        .iter()
        .flat_map(|f| match f {
            MapFeature::Cluster(c) => c.property_ids.clone(),
            MapFeature::Single(s) => vec![s.property_id.clone()],
        })
        .collect()
}

// ═════════════════════════════════════════════════════════════════════════
// 1. No grouping above the clustering zoom
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn high_zoom_is_all_singles(properties in city_properties(), zoom in 15.0f64..22.0) {
        let features = cluster(&properties, zoom, &ClusterConfig::default());
        prop_assert_eq!(features.len(), properties.len());
        prop_assert!(features.iter().all(|f| matches!(f, MapFeature::Single(_))));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Each property lands in exactly one feature
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn clustering_partitions_input(properties in city_properties(), zoom in 0.0f64..14.0) {
        let features = cluster(&properties, zoom, &ClusterConfig::default());
        let ids = member_ids(&features);
        let unique: HashSet<_> = ids.iter().collect();
        prop_assert_eq!(ids.len(), properties.len());
        prop_assert_eq!(unique.len(), properties.len());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Members are within the threshold of their seed (greedy, not pairwise)
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn members_are_near_their_seed(properties in city_properties(), zoom in 0.0f64..14.0) {
        let config = ClusterConfig::default();
        let threshold = cluster_threshold_m(zoom, &config);
        let by_id: std::collections::HashMap<_, _> = properties
            .iter()
            .map(|p| (p.id().to_string(), p.position().expect("resolved")))
            .collect();

        for feature in cluster(&properties, zoom, &config) {
            if let MapFeature::Cluster(c) = feature {
                prop_assert!(c.count >= 2);
                prop_assert_eq!(c.count, c.property_ids.len());
                let seed = by_id[&c.property_ids[0]];
                for id in &c.property_ids[1..] {
                    let m = by_id[id];
                    let d = ((m.lng - seed.lng).powi(2) + (m.lat - seed.lat).powi(2)).sqrt()
                        * config.meters_per_degree;
                    prop_assert!(d < threshold, "{} is {} m from seed, threshold {}", id, d, threshold);
                }
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Heat cells are normalized and account for every priced property
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn heat_cells_are_normalized(properties in city_properties()) {
        let cells = aggregate(&properties, &HeatmapConfig::default());
        prop_assert_eq!(cells.iter().map(|c| c.count).sum::<usize>(), properties.len());
        for cell in &cells {
            prop_assert!((0.0..=1.0).contains(&cell.intensity));
        }
        let min = cells.iter().map(|c| c.average_price).fold(f64::INFINITY, f64::min);
        let max = cells.iter().map(|c| c.average_price).fold(f64::NEG_INFINITY, f64::max);
        if max - min > 1e-6 * max {
            prop_assert!(cells.iter().any(|c| c.intensity == 0.0));
            prop_assert!(cells.iter().any(|c| c.intensity == 1.0));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. One shared price means intensity 0.5
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn shared_price_is_half_intensity(properties in city_properties(), price in 1.0f64..1e7) {
        let same: Vec<_> = properties
            .into_iter()
            .map(|mut p| { p.property.price = price; p })
            .collect();
        for cell in aggregate(&same, &HeatmapConfig::default()) {
            prop_assert_eq!(cell.intensity, 0.5);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6 & 7. Polygon measures
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn polygon_measures_are_sane(points in vertices()) {
        let config = GeometryConfig::default();
        let geometry = compute_geometry(&points, &config);
        if points.len() < 3 {
            prop_assert_eq!(geometry.area_km2, 0.0);
            prop_assert_eq!(geometry.perimeter_km, 0.0);
        } else {
            prop_assert!(geometry.area_km2 >= 0.0);
            prop_assert!(geometry.perimeter_km >= 0.0);
            if geometry.area_km2 == 0.0 {
                prop_assert_eq!(geometry.perimeter_km, 0.0);
            }
            let mut reversed = points.clone();
            reversed.reverse();
            let other = compute_geometry(&reversed, &config);
            prop_assert!((other.area_km2 - geometry.area_km2).abs() < 1e-9);
            prop_assert!((other.perimeter_km - geometry.perimeter_km).abs() < 1e-9);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 8. Filtering has no hidden state
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn filter_is_idempotent(
        properties in city_properties(),
        min_price in 0.0f64..500_000.0,
        bedrooms in prop::collection::vec(0u32..6, 0..3),
    ) {
        let criteria = FilterCriteria {
            min_price,
            bedrooms,
            ..FilterCriteria::default()
        };
        let first = filter(&properties, &criteria, None);
        let second = filter(&properties, &criteria, None);
        prop_assert_eq!(&first, &second);

        // Output is a subsequence of the input
        let mut cursor = properties.iter();
        for kept in &first {
            prop_assert!(cursor.any(|p| p.id() == kept.id()));
        }
    }
}
