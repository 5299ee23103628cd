// Narrow a property list down to what matches the active filters and the visible map area.

use serde::{Deserialize, Serialize};

use crate::models::{BoundingBox, Coordinate, GeocodedProperty, ListingType, Property};

/// User-selected search criteria. Every empty set and every zero price bound means "any".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterCriteria {
    pub property_types: Vec<String>,
    pub listing_types: Vec<ListingType>,
    pub min_price: f64,
    pub max_price: f64,
    pub bedrooms: Vec<u32>,
}

/// Anything the filter can look at: a raw listing or a geocoded one.
pub trait Listing {
    fn property(&self) -> &Property;
    fn location(&self) -> Option<Coordinate>;
}

impl Listing for Property {
    fn property(&self) -> &Property {
        self
    }

    fn location(&self) -> Option<Coordinate> {
        self.valid_coordinates()
    }
}

impl Listing for GeocodedProperty {
    fn property(&self) -> &Property {
        &self.property
    }

    fn location(&self) -> Option<Coordinate> {
        self.position()
    }
}

impl FilterCriteria {
    pub fn matches(&self, property: &Property) -> bool {
        let type_ok = self.property_types.is_empty()
            || self
                .property_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&property.property_type));
        let listing_ok =
            self.listing_types.is_empty() || self.listing_types.contains(&property.listing_type);
        let min_ok = self.min_price <= 0.0 || property.price >= self.min_price;
        let max_ok = self.max_price <= 0.0 || property.price <= self.max_price;
        let bedrooms_ok = self.bedrooms.is_empty() || self.bedrooms.contains(&property.bedrooms);

        type_ok && listing_ok && min_ok && max_ok && bedrooms_ok
    }
}

/// Items matching `criteria` and, when given, lying inside `bounds`, in input order.
/// Items without usable coordinates never pass a bounds check.
pub fn filter<T>(items: &[T], criteria: &FilterCriteria, bounds: Option<&BoundingBox>) -> Vec<T>
where
    T: Listing + Clone,
{
    items
        .iter()
        .filter(|item| criteria.matches(item.property()))
        .filter(|item| match bounds {
            Some(bbox) => item
                .location()
                .map(|c| bbox.contains(&c))
                .unwrap_or(false),
            None => true,
        })
        .cloned()
        .collect()
}
