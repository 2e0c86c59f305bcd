use std::sync::Arc;

use geo::{BoundingRect, Contains, MultiPolygon, Point, Rect};
use geojson::GeoJson;
use serde::{Deserialize, Deserializer};

use crate::error::DatasetError;

/// Shared handle to a region. Collections, filtered views, the selection and
/// the comparison set all point at the same immutable region.
pub type RegionRef = Arc<Region>;

/// Scored attribute bag of a region feature.
///
/// Each logical attribute may arrive under one of two aliases; accessors resolve
/// them in a fixed order (first listed alias wins):
///
/// | attribute      | aliases                      |
/// |----------------|------------------------------|
/// | name           | `SUBZONE_N`, `subzone`       |
/// | planning area  | `PLN_AREA_N`, `planning_area`|
/// | composite score| `H_score`, `h_score`         |
///
/// Numeric fields accept JSON numbers or numeric strings. Anything else (and empty
/// strings) is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RegionAttributes {
    #[serde(rename = "SUBZONE_N", default, deserialize_with = "lenient_string")]
    pub subzone_n: Option<String>,
    #[serde(rename = "subzone", default, deserialize_with = "lenient_string")]
    pub subzone: Option<String>,
    #[serde(rename = "PLN_AREA_N", default, deserialize_with = "lenient_string")]
    pub pln_area_n: Option<String>,
    #[serde(rename = "planning_area", default, deserialize_with = "lenient_string")]
    pub planning_area: Option<String>,
    #[serde(rename = "H_score", default, deserialize_with = "lenient_f64")]
    pub h_score_upper: Option<f64>,
    #[serde(rename = "h_score", default, deserialize_with = "lenient_f64")]
    pub h_score: Option<f64>,
    #[serde(rename = "Dem", default, deserialize_with = "lenient_f64")]
    pub demand: Option<f64>,
    #[serde(rename = "Sup", default, deserialize_with = "lenient_f64")]
    pub supply: Option<f64>,
    #[serde(rename = "Acc", default, deserialize_with = "lenient_f64")]
    pub accessibility: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub population: Option<f64>,
}

impl RegionAttributes {
    pub fn name(&self) -> Option<&str> {
        self.subzone_n.as_deref().or(self.subzone.as_deref())
    }

    pub fn planning_area(&self) -> Option<&str> {
        self.pln_area_n
            .as_deref()
            .or(self.planning_area.as_deref())
    }

    /// Composite score as delivered, `None` when neither alias is usable.
    pub fn raw_score(&self) -> Option<f64> {
        self.h_score_upper.or(self.h_score)
    }

    /// Composite score used for ranking. Absent scores rank as 0.
    pub fn score(&self) -> f64 {
        self.raw_score().unwrap_or(0.0)
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let text = match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => return Ok(None),
    };
    if text.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(text))
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// Resolved identity of a region: explicit feature id, then primary name, then
/// alternate name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegionKey(String);

impl RegionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RegionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One scored region feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: Option<String>,
    pub attributes: RegionAttributes,
    /// Boundary in lon/lat. Empty when the feature had no polygonal geometry.
    pub geometry: MultiPolygon<f64>,
}

impl Region {
    pub fn new(id: Option<String>, attributes: RegionAttributes, geometry: MultiPolygon<f64>) -> Self {
        Self {
            id: id.filter(|id| !id.trim().is_empty()),
            attributes,
            geometry,
        }
    }

    /// The single identity function used for selection, comparison and highlighting.
    /// Returns `None` when no field resolves; such regions never match anything.
    pub fn key(&self) -> Option<RegionKey> {
        self.id
            .as_deref()
            .or(self.attributes.subzone_n.as_deref())
            .or(self.attributes.subzone.as_deref())
            .map(|key| RegionKey(key.to_string()))
    }

    /// True only when both regions resolve to the same identity.
    pub fn same_identity(&self, other: &Region) -> bool {
        match (self.key(), other.key()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.attributes.name()
    }

    pub fn score(&self) -> f64 {
        self.attributes.score()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.geometry.bounding_rect().map(Bounds::from)
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.geometry.contains(&Point::new(lon, lat))
    }
}

/// Axis-aligned lon/lat bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    pub fn union(self, other: Bounds) -> Bounds {
        Bounds {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
            .iter()
            .all(|v| v.is_finite())
            && self.min_lon <= self.max_lon
            && self.min_lat <= self.max_lat
    }
}

impl From<Rect<f64>> for Bounds {
    fn from(rect: Rect<f64>) -> Self {
        Self {
            min_lon: rect.min().x,
            min_lat: rect.min().y,
            max_lon: rect.max().x,
            max_lat: rect.max().y,
        }
    }
}

/// Combined bounding box of a set of regions, `None` if none has geometry.
pub fn bounds_of<'a>(regions: impl IntoIterator<Item = &'a RegionRef>) -> Option<Bounds> {
    regions
        .into_iter()
        .filter_map(|region| region.bounds())
        .reduce(Bounds::union)
        .filter(Bounds::is_valid)
}

/// Ordered feature collection. Cloning is cheap: regions are shared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionCollection {
    regions: Vec<RegionRef>,
}

impl RegionCollection {
    pub fn new(regions: Vec<RegionRef>) -> Self {
        Self { regions }
    }

    /// Parse a GeoJSON `FeatureCollection` document.
    pub fn from_geojson_str(text: &str) -> Result<Self, DatasetError> {
        let geojson: GeoJson = text.parse()?;
        Self::from_geojson(geojson)
    }

    pub fn from_geojson(geojson: GeoJson) -> Result<Self, DatasetError> {
        let collection = match geojson {
            GeoJson::FeatureCollection(collection) => collection,
            GeoJson::Feature(_) => return Err(DatasetError::NotFeatureCollection("Feature")),
            GeoJson::Geometry(_) => return Err(DatasetError::NotFeatureCollection("Geometry")),
        };

        let regions = collection
            .features
            .into_iter()
            .map(|feature| Arc::new(region_from_feature(feature)))
            .collect();
        Ok(Self { regions })
    }

    pub fn regions(&self) -> &[RegionRef] {
        &self.regions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RegionRef> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        bounds_of(&self.regions)
    }
}

impl<'a> IntoIterator for &'a RegionCollection {
    type Item = &'a RegionRef;
    type IntoIter = std::slice::Iter<'a, RegionRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}

fn region_from_feature(feature: geojson::Feature) -> Region {
    let id = feature.id.map(|id| match id {
        geojson::feature::Id::String(s) => s,
        geojson::feature::Id::Number(n) => n.to_string(),
    });

    let attributes = feature
        .properties
        .and_then(|props| serde_json::from_value(serde_json::Value::Object(props)).ok())
        .unwrap_or_default();

    let geometry = feature
        .geometry
        .and_then(|geom| geo::Geometry::<f64>::try_from(geom).ok())
        .map(polygons_of)
        .unwrap_or_else(|| MultiPolygon::new(Vec::new()));

    Region::new(id, attributes, geometry)
}

/// Keep the polygonal parts of a geometry; points and lines are dropped.
fn polygons_of(geometry: geo::Geometry<f64>) -> MultiPolygon<f64> {
    match geometry {
        geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
        geo::Geometry::MultiPolygon(mp) => mp,
        geo::Geometry::Rect(r) => MultiPolygon::new(vec![r.to_polygon()]),
        geo::Geometry::Triangle(t) => MultiPolygon::new(vec![t.to_polygon()]),
        geo::Geometry::GeometryCollection(gc) => MultiPolygon::new(
            gc.into_iter()
                .flat_map(|g| polygons_of(g).0)
                .collect(),
        ),
        _ => MultiPolygon::new(Vec::new()),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use geo::{MultiPolygon, Rect, coord};

    use super::{Region, RegionAttributes, RegionRef};

    /// Unit square at (`x`, 0) with the given name and score.
    pub(crate) fn region(name: &str, score: f64) -> RegionRef {
        region_at(name, score, 0.0)
    }

    pub(crate) fn region_at(name: &str, score: f64, x: f64) -> RegionRef {
        let attributes = RegionAttributes {
            subzone_n: Some(name.to_string()),
            h_score_upper: Some(score),
            ..RegionAttributes::default()
        };
        let square = Rect::new(coord! { x: x, y: 0.0 }, coord! { x: x + 1.0, y: 1.0 });
        Arc::new(Region::new(
            None,
            attributes,
            MultiPolygon::new(vec![square.to_polygon()]),
        ))
    }

    pub(crate) fn unnamed(score: f64) -> RegionRef {
        let attributes = RegionAttributes {
            h_score_upper: Some(score),
            ..RegionAttributes::default()
        };
        Arc::new(Region::new(None, attributes, MultiPolygon::new(Vec::new())))
    }
}
