use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::HeatmapConfig;
use crate::models::{Coordinate, GeocodedProperty, HeatCellDescriptor, HeatCellMetadata};

// Relative spread below which cell averages count as one price (summation noise)
const PRICE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellKey {
    pub x: i64,
    pub y: i64,
}

impl CellKey {
    pub fn for_coordinate(c: &Coordinate, cell_size: f64) -> Self {
        CellKey {
            x: (c.lng / cell_size).floor() as i64,
            y: (c.lat / cell_size).floor() as i64,
        }
    }

    pub fn center(&self, cell_size: f64) -> Coordinate {
        Coordinate::new(
            (self.x as f64 + 0.5) * cell_size,
            (self.y as f64 + 0.5) * cell_size,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatCell {
    pub key: CellKey,
    pub center: Coordinate,
    pub count: usize,
    pub average_price: f64,
    pub intensity: f64,
}

impl HeatCell {
    pub fn to_descriptor(&self) -> HeatCellDescriptor {
        HeatCellDescriptor {
            coordinates: self.center,
            intensity: self.intensity,
            metadata: HeatCellMetadata {
                cell_key: format!("{}:{}", self.key.x, self.key.y),
                count: self.count,
                average_price: self.average_price,
            },
        }
    }
}

// Running totals for one cell while binning
struct CellAccumulator {
    key: CellKey,
    count: usize,
    price_sum: f64,
}

/// Bin priced, located properties into a fixed grid and normalize each cell's
/// average price against the pass-wide min/max.
///
/// Cells come out in the order their first property was seen. Intensities are
/// only assigned once every cell is known; when all averages are equal every
/// cell gets `degenerate_intensity`.
pub fn aggregate(properties: &[GeocodedProperty], config: &HeatmapConfig) -> Vec<HeatCell> {
    let cell_size = config.cell_size_deg;
    let mut index: HashMap<CellKey, usize> = HashMap::new();
    let mut cells: Vec<CellAccumulator> = Vec::new();

    for property in properties {
        let Some(position) = property.position() else {
            continue;
        };
        let price = property.property.price;
        if !price.is_finite() || price <= 0.0 {
            continue;
        }

        let key = CellKey::for_coordinate(&position, cell_size);
        let slot = *index.entry(key).or_insert_with(|| {
            cells.push(CellAccumulator {
                key,
                count: 0,
                price_sum: 0.0,
            });
            cells.len() - 1
        });
        cells[slot].count += 1;
        cells[slot].price_sum += price;
    }

    if cells.is_empty() {
        return Vec::new();
    }

    let averages: Vec<f64> = cells
        .iter()
        .map(|cell| cell.price_sum / cell.count as f64)
        .collect();
    let min = averages.iter().copied().fold(f64::INFINITY, f64::min);
    let max = averages.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    let degenerate = range <= PRICE_EPSILON * max.abs();

    cells
        .iter()
        .zip(averages)
        .map(|(cell, average_price)| HeatCell {
            key: cell.key,
            center: cell.key.center(cell_size),
            count: cell.count,
            average_price,
            intensity: if degenerate {
                config.degenerate_intensity
            } else {
                (average_price - min) / range
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListingType, Property};

    fn priced(id: &str, lng: f64, lat: f64, price: f64) -> GeocodedProperty {
        GeocodedProperty::resolved(
            Property {
                id: id.into(),
                coordinates: None,
                address: String::new(),
                city: String::new(),
                state: String::new(),
                price,
                currency: "USD".into(),
                property_type: "apartment".into(),
                listing_type: ListingType::Rent,
                bedrooms: 1,
                bathrooms: 1,
                created_at: 0.0,
            },
            Coordinate::new(lng, lat),
        )
    }

    #[test]
    fn empty_input_gives_no_cells() {
        assert!(aggregate(&[], &HeatmapConfig::default()).is_empty());
    }

    #[test]
    fn single_price_gives_half_intensity() {
        let properties = vec![
            priced("a", 0.001, 0.001, 2000.0),
            priced("b", 0.051, 0.001, 2000.0),
            priced("c", 0.101, 0.051, 2000.0),
        ];
        let cells = aggregate(&properties, &HeatmapConfig::default());
        assert_eq!(cells.len(), 3);
        assert!(cells.iter().all(|c| c.intensity == 0.5));
    }

    #[test]
    fn cells_average_and_normalize() {
        let properties = vec![
            priced("a", 0.001, 0.001, 1000.0),
            priced("b", 0.009, 0.009, 3000.0),
            priced("c", 0.015, 0.001, 5000.0),
            priced("d", 0.025, 0.001, 1500.0),
        ];
        let cells = aggregate(&properties, &HeatmapConfig::default());
        assert_eq!(cells.len(), 3);

        assert_eq!(cells[0].key, CellKey { x: 0, y: 0 });
        assert_eq!(cells[0].count, 2);
        assert_eq!(cells[0].average_price, 2000.0);
        assert!((cells[0].center.lng - 0.005).abs() < 1e-12);
        assert!((cells[0].center.lat - 0.005).abs() < 1e-12);

        // averages: 2000, 5000, 1500 -> min 1500, max 5000
        assert!((cells[0].intensity - 500.0 / 3500.0).abs() < 1e-12);
        assert_eq!(cells[1].intensity, 1.0);
        assert_eq!(cells[2].intensity, 0.0);
    }

    #[test]
    fn negative_coordinates_floor_into_their_own_cell() {
        let key = CellKey::for_coordinate(&Coordinate::new(-0.001, -0.001), 0.01);
        assert_eq!(key, CellKey { x: -1, y: -1 });
        let center = key.center(0.01);
        assert!((center.lng + 0.005).abs() < 1e-12);
    }

    #[test]
    fn unpriced_and_unresolved_are_ignored() {
        let mut unresolved = priced("u", 0.0, 0.0, 900.0);
        unresolved.resolved = false;
        let properties = vec![
            unresolved,
            priced("free", 0.0, 0.0, 0.0),
            priced("nan", 0.0, 0.0, f64::NAN),
            priced("ok", 0.0, 0.0, 900.0),
        ];
        let cells = aggregate(&properties, &HeatmapConfig::default());
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].count, 1);
        assert_eq!(cells[0].intensity, 0.5);
    }

    #[test]
    fn descriptor_exposes_metadata() {
        let cells = aggregate(&[priced("a", 0.004, 0.004, 100.0)], &HeatmapConfig::default());
        let descriptor = cells[0].to_descriptor();
        assert_eq!(descriptor.metadata.cell_key, "0:0");
        assert_eq!(descriptor.metadata.count, 1);
        assert_eq!(descriptor.metadata.average_price, 100.0);
        assert_eq!(descriptor.intensity, 0.5);
    }
}
