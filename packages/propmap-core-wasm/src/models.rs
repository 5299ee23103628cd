// Shared data structures passed between the map frontend and the core
use geo_types::{coord, Coord, Rect};
use serde::{Deserialize, Serialize};

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lng: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Finite and inside the WGS84 longitude/latitude ranges.
    pub fn is_valid(&self) -> bool {
        self.lng.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lng)
            && (-90.0..=90.0).contains(&self.lat)
    }
}

impl From<Coordinate> for Coord<f64> {
    fn from(c: Coordinate) -> Self {
        coord! { x: c.lng, y: c.lat }
    }
}

impl From<Coord<f64>> for Coordinate {
    fn from(c: Coord<f64>) -> Self {
        Coordinate::new(c.x, c.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Rent,
    Sale,
}

/// A listed property as supplied by the property service. Treated as immutable input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: String,
    #[serde(default)]
    pub coordinates: Option<Coordinate>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub property_type: String,
    pub listing_type: ListingType,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: u32,
    // Milliseconds since the Unix epoch
    #[serde(default)]
    pub created_at: f64,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Property {
    /// Coordinates usable for spatial work, if any.
    pub fn valid_coordinates(&self) -> Option<Coordinate> {
        self.coordinates.filter(Coordinate::is_valid)
    }
}

/// A property after the geocode resolver has run over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodedProperty {
    pub property: Property,
    pub coordinates: Option<Coordinate>,
    pub resolved: bool,
}

impl GeocodedProperty {
    pub fn resolved(property: Property, coordinates: Coordinate) -> Self {
        Self {
            property,
            coordinates: Some(coordinates),
            resolved: true,
        }
    }

    pub fn unresolved(property: Property) -> Self {
        Self {
            property,
            coordinates: None,
            resolved: false,
        }
    }

    /// Wraps properties that already carry coordinates without going through a provider.
    pub fn from_located(property: Property) -> Self {
        match property.valid_coordinates() {
            Some(c) => Self::resolved(property, c),
            None => Self::unresolved(property),
        }
    }

    /// Coordinates if this entry may take part in spatial operations.
    pub fn position(&self) -> Option<Coordinate> {
        if self.resolved {
            self.coordinates.filter(Coordinate::is_valid)
        } else {
            None
        }
    }

    pub fn id(&self) -> &str {
        &self.property.id
    }
}

/// Geographic rectangle. `west > east` means the box crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Smallest box containing every coordinate, `None` for an empty iterator.
    pub fn from_coordinates<I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = Coordinate>,
    {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut bbox = BoundingBox::new(first.lng, first.lat, first.lng, first.lat);
        for c in iter {
            bbox.west = bbox.west.min(c.lng);
            bbox.east = bbox.east.max(c.lng);
            bbox.south = bbox.south.min(c.lat);
            bbox.north = bbox.north.max(c.lat);
        }
        Some(bbox)
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    pub fn contains(&self, point: &Coordinate) -> bool {
        if point.lat < self.south || point.lat > self.north {
            return false;
        }
        if self.crosses_antimeridian() {
            point.lng >= self.west || point.lng <= self.east
        } else {
            point.lng >= self.west && point.lng <= self.east
        }
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new((self.west + self.east) / 2.0, (self.south + self.north) / 2.0)
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

/// What the user currently sees on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: Coordinate,
    pub zoom: f64,
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Single,
    Cluster,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MarkerPayload {
    #[serde(rename_all = "camelCase")]
    Single {
        property_id: String,
        price: f64,
        currency: String,
        label: String,
    },
    #[serde(rename_all = "camelCase")]
    Cluster {
        count: usize,
        property_ids: Vec<String>,
    },
}

/// Renderable marker handed to the map render adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerDescriptor {
    pub id: String,
    pub coordinates: Coordinate,
    pub kind: MarkerKind,
    pub payload: MarkerPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatCellMetadata {
    pub cell_key: String,
    pub count: usize,
    pub average_price: f64,
}

/// Renderable density sample handed to the map render adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatCellDescriptor {
    pub coordinates: Coordinate,
    pub intensity: f64,
    pub metadata: HeatCellMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeProgress {
    pub current: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
    pub hit_rate: f64,
}
