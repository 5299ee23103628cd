//! Zoom-dependent grouping of nearby properties.
//!
//! The grouping is a greedy single pass in input order: each unprocessed
//! property seeds a cluster with every other unprocessed property closer than
//! the zoom's threshold. Members are only guaranteed to be within the threshold
//! of their seed, not of each other, and a different input order can give a
//! different grouping. Consumers rely on this exact seed-order behavior.
//!
//! Neighbor search is O(n²) per pass, which is fine for a city's worth of
//! listings (hundreds). A grid index would be the upgrade past a few thousand.

use serde::{Deserialize, Serialize};

use crate::config::ClusterConfig;
use crate::models::{
    BoundingBox, Coordinate, GeocodedProperty, MarkerDescriptor, MarkerKind, MarkerPayload,
};
use crate::price_label::format_price_label;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: String,
    pub centroid: Coordinate,
    pub property_ids: Vec<String>,
    pub count: usize,
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleMarker {
    pub property_id: String,
    pub coordinates: Coordinate,
    pub price: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MapFeature {
    Cluster(Cluster),
    Single(SingleMarker),
}

impl MapFeature {
    pub fn marker_id(&self) -> String {
        match self {
            MapFeature::Cluster(cluster) => cluster.id.clone(),
            MapFeature::Single(single) => format!("property-{}", single.property_id),
        }
    }

    pub fn to_marker(&self) -> MarkerDescriptor {
        match self {
            MapFeature::Cluster(cluster) => MarkerDescriptor {
                id: self.marker_id(),
                coordinates: cluster.centroid,
                kind: MarkerKind::Cluster,
                payload: MarkerPayload::Cluster {
                    count: cluster.count,
                    property_ids: cluster.property_ids.clone(),
                },
            },
            MapFeature::Single(single) => MarkerDescriptor {
                id: self.marker_id(),
                coordinates: single.coordinates,
                kind: MarkerKind::Single,
                payload: MarkerPayload::Single {
                    property_id: single.property_id.clone(),
                    price: single.price,
                    currency: single.currency.clone(),
                    label: format_price_label(single.price, &single.currency),
                },
            },
        }
    }
}

/// Distance under which two properties merge, in meters. Shrinks with zoom.
pub fn cluster_threshold_m(zoom: f64, config: &ClusterConfig) -> f64 {
    (config.base_threshold_m - zoom * config.threshold_step_m).max(config.min_threshold_m)
}

// Flat-plane distance in meters; only meaningful at city scale
fn planar_distance_m(a: &Coordinate, b: &Coordinate, meters_per_degree: f64) -> f64 {
    let d_lng = a.lng - b.lng;
    let d_lat = a.lat - b.lat;
    (d_lng * d_lng + d_lat * d_lat).sqrt() * meters_per_degree
}

fn single(property: &GeocodedProperty, coordinates: Coordinate) -> MapFeature {
    MapFeature::Single(SingleMarker {
        property_id: property.id().to_string(),
        coordinates,
        price: property.property.price,
        currency: property.property.currency.clone(),
    })
}

fn merge(members: &[(&GeocodedProperty, Coordinate)]) -> MapFeature {
    let count = members.len();
    let (sum_lng, sum_lat) = members
        .iter()
        .fold((0.0, 0.0), |(lng, lat), (_, c)| (lng + c.lng, lat + c.lat));
    let centroid = Coordinate::new(sum_lng / count as f64, sum_lat / count as f64);
    let bounds = BoundingBox::from_coordinates(members.iter().map(|(_, c)| *c))
        .unwrap_or_else(|| BoundingBox::new(centroid.lng, centroid.lat, centroid.lng, centroid.lat));
    let property_ids: Vec<String> = members.iter().map(|(p, _)| p.id().to_string()).collect();

    MapFeature::Cluster(Cluster {
        id: format!("cluster-{}", property_ids[0]),
        centroid,
        property_ids,
        count,
        bounds,
    })
}

/// Group properties for the given zoom. Unresolved properties are left out.
pub fn cluster(
    properties: &[GeocodedProperty],
    zoom: f64,
    config: &ClusterConfig,
) -> Vec<MapFeature> {
    let located: Vec<(&GeocodedProperty, Coordinate)> = properties
        .iter()
        .filter_map(|p| p.position().map(|c| (p, c)))
        .collect();

    if zoom > config.max_cluster_zoom {
        return located.iter().map(|(p, c)| single(p, *c)).collect();
    }

    let threshold = cluster_threshold_m(zoom, config);
    let mut processed = vec![false; located.len()];
    let mut features = Vec::new();

    for seed in 0..located.len() {
        if processed[seed] {
            continue;
        }
        let seed_position = located[seed].1;

        let neighbors: Vec<usize> = (0..located.len())
            .filter(|&other| other != seed && !processed[other])
            .filter(|&other| {
                planar_distance_m(&seed_position, &located[other].1, config.meters_per_degree)
                    < threshold
            })
            .collect();

        processed[seed] = true;
        if neighbors.is_empty() {
            features.push(single(located[seed].0, seed_position));
            continue;
        }

        let mut members = Vec::with_capacity(neighbors.len() + 1);
        members.push(located[seed]);
        for &other in &neighbors {
            processed[other] = true;
            members.push(located[other]);
        }
        features.push(merge(&members));
    }

    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListingType, Property};

    fn at(id: &str, lng: f64, lat: f64) -> GeocodedProperty {
        GeocodedProperty::resolved(
            Property {
                id: id.into(),
                coordinates: None,
                address: String::new(),
                city: String::new(),
                state: String::new(),
                price: 300_000.0,
                currency: "USD".into(),
                property_type: "condo".into(),
                listing_type: ListingType::Sale,
                bedrooms: 2,
                bathrooms: 1,
                created_at: 0.0,
            },
            Coordinate::new(lng, lat),
        )
    }

    fn clusters(features: &[MapFeature]) -> Vec<&Cluster> {
        features
            .iter()
            .filter_map(|f| match f {
                MapFeature::Cluster(c) => Some(c),
                MapFeature::Single(_) => None,
            })
            .collect()
    }

    #[test]
    fn threshold_shrinks_with_zoom_down_to_floor() {
        let config = ClusterConfig::default();
        assert_eq!(cluster_threshold_m(0.0, &config), 200.0);
        assert_eq!(cluster_threshold_m(10.0, &config), 100.0);
        assert_eq!(cluster_threshold_m(14.0, &config), 60.0);
        assert_eq!(cluster_threshold_m(16.0, &config), 50.0);
    }

    #[test]
    fn high_zoom_returns_every_property_as_single() {
        let properties = vec![at("a", 0.0, 0.0), at("b", 0.0, 0.0), at("c", 0.0001, 0.0)];
        let features = cluster(&properties, 15.0, &ClusterConfig::default());
        assert_eq!(features.len(), 3);
        assert!(features.iter().all(|f| matches!(f, MapFeature::Single(_))));
    }

    #[test]
    fn zoom_at_limit_still_clusters() {
        let properties = vec![at("a", 0.0, 0.0), at("b", 0.0001, 0.0)];
        let features = cluster(&properties, 14.0, &ClusterConfig::default());
        assert_eq!(clusters(&features).len(), 1);
    }

    #[test]
    fn two_neighborhoods_form_two_clusters() {
        let mut properties = Vec::new();
        for i in 0..6 {
            let offset = i as f64 * 0.0001;
            properties.push(at(&format!("n{}", i), -73.9851 + offset, 40.7589));
            properties.push(at(&format!("s{}", i), -73.9969, 40.7061 + offset));
        }

        let features = cluster(&properties, 10.0, &ClusterConfig::default());
        let found = clusters(&features);
        assert_eq!(features.len(), 2);
        assert_eq!(found.len(), 2);
        assert_eq!(found.iter().map(|c| c.count).sum::<usize>(), 12);
        assert!(found.iter().all(|c| c.count == 6));
        assert_eq!(found[0].property_ids[0], "n0");
        assert_eq!(found[1].property_ids[0], "s0");
    }

    #[test]
    fn centroid_is_member_mean() {
        let properties = vec![at("a", 0.0, 0.0), at("b", 0.0004, 0.0002)];
        let features = cluster(&properties, 12.0, &ClusterConfig::default());
        let c = clusters(&features)[0];
        assert!((c.centroid.lng - 0.0002).abs() < 1e-12);
        assert!((c.centroid.lat - 0.0001).abs() < 1e-12);
        assert_eq!(c.bounds, BoundingBox::new(0.0, 0.0, 0.0004, 0.0002));
    }

    #[test]
    fn first_seed_wins_overlapping_neighborhoods() {
        // ~0.0007 deg apart = ~78 m; threshold at zoom 12 is 80 m
        let properties = vec![
            at("a", 0.0, 0.0),
            at("b", 0.0007, 0.0),
            at("c", 0.0014, 0.0),
        ];
        let features = cluster(&properties, 12.0, &ClusterConfig::default());
        assert_eq!(features.len(), 2);
        match (&features[0], &features[1]) {
            (MapFeature::Cluster(c), MapFeature::Single(s)) => {
                assert_eq!(c.property_ids, vec!["a", "b"]);
                assert_eq!(s.property_id, "c");
            }
            other => panic!("unexpected grouping: {:?}", other),
        }
    }

    #[test]
    fn unresolved_properties_are_skipped() {
        let mut lost = at("lost", 0.0, 0.0);
        lost.resolved = false;
        let properties = vec![lost, at("a", 1.0, 1.0)];
        let features = cluster(&properties, 10.0, &ClusterConfig::default());
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].marker_id(), "property-a");
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(cluster(&[], 3.0, &ClusterConfig::default()).is_empty());
        assert!(cluster(&[], 18.0, &ClusterConfig::default()).is_empty());
    }

    #[test]
    fn markers_carry_payloads() {
        let properties = vec![at("a", 0.0, 0.0), at("b", 0.0001, 0.0), at("c", 1.0, 1.0)];
        let markers: Vec<_> = cluster(&properties, 10.0, &ClusterConfig::default())
            .iter()
            .map(MapFeature::to_marker)
            .collect();
        assert_eq!(markers[0].id, "cluster-a");
        assert_eq!(markers[0].kind, MarkerKind::Cluster);
        assert_eq!(
            markers[0].payload,
            MarkerPayload::Cluster {
                count: 2,
                property_ids: vec!["a".into(), "b".into()]
            }
        );
        assert_eq!(markers[1].kind, MarkerKind::Single);
        match &markers[1].payload {
            MarkerPayload::Single { label, .. } => assert_eq!(label, "$300K"),
            other => panic!("unexpected payload: {:?}", other),
        }
    }
}
