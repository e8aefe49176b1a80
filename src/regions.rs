// Region boundaries and the crash-to-region assignment.
//
// Boundaries are loaded from a GeoJSON `FeatureCollection`, kept in their
// native CRS and indexed in an R-tree. Crash points are projected into that
// CRS, tested against the polygons, and crashes without a usable point fall
// back to their `BOROUGH` label.

use crate::crs::Crs;
use crate::error::{JoinAmbiguityError, ReferenceDataError};
use crate::types::{Dataset, RegionCountRow};
use crate::util::canonical_region;
use geo::{BoundingRect, Contains, Coord, Intersects, MapCoords, MultiPolygon, Point};
use geojson::GeoJson;
use rstar::{RTree, RTreeObject, AABB};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

pub const DEFAULT_NAME_PROPERTY: &str = "BoroName";

/// One named polygon (or multipolygon) in the boundary CRS.
#[derive(Debug, Clone)]
pub struct RegionBoundary {
    pub name: String,
    pub key: String,
    pub polygon: MultiPolygon<f64>,
}

/// Envelope of one boundary, pointing back into `Boundaries::regions`.
struct BoundaryEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

pub struct Boundaries {
    crs: Crs,
    regions: Vec<RegionBoundary>,
    index: RTree<BoundaryEntry>,
}

impl Boundaries {
    /// Read a GeoJSON file of region polygons named by `name_property`.
    pub fn load(path: impl AsRef<Path>, name_property: &str) -> Result<Self, ReferenceDataError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ReferenceDataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let boundaries = Self::from_geojson_str(&text, name_property)?;
        log::info!(
            "Loaded {} boundary polygons ({} regions) from {} in {:?}",
            boundaries.regions.len(),
            boundaries.region_keys().len(),
            path.display(),
            boundaries.crs
        );
        Ok(boundaries)
    }

    pub fn from_geojson_str(text: &str, name_property: &str) -> Result<Self, ReferenceDataError> {
        let GeoJson::FeatureCollection(collection) = text.parse::<GeoJson>()? else {
            return Err(ReferenceDataError::NotFeatureCollection);
        };
        let crs = match collection
            .foreign_members
            .as_ref()
            .and_then(|members| members.get("crs"))
        {
            Some(member) => {
                let name = member
                    .pointer("/properties/name")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default();
                Crs::from_name(name)
                    .ok_or_else(|| ReferenceDataError::UnsupportedCrs(name.to_string()))?
            }
            None => Crs::Wgs84,
        };

        let mut regions = Vec::with_capacity(collection.features.len());
        for (index, feature) in collection.features.into_iter().enumerate() {
            let name = feature
                .property(name_property)
                .and_then(serde_json::Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ReferenceDataError::MissingName {
                    index,
                    property: name_property.to_string(),
                })?
                .to_string();
            let polygon = feature
                .geometry
                .and_then(|g| geo::Geometry::<f64>::try_from(g).ok())
                .and_then(|g| match g {
                    geo::Geometry::MultiPolygon(mp) => Some(mp),
                    geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
                    _ => None,
                })
                .ok_or_else(|| ReferenceDataError::InvalidGeometry {
                    index,
                    name: name.clone(),
                })?;
            regions.push(RegionBoundary {
                key: canonical_region(&name),
                name,
                polygon,
            });
        }
        Self::new(crs, regions)
    }

    pub fn new(crs: Crs, regions: Vec<RegionBoundary>) -> Result<Self, ReferenceDataError> {
        if regions.is_empty() {
            return Err(ReferenceDataError::Empty);
        }
        let entries = regions
            .iter()
            .enumerate()
            .filter_map(|(index, region)| {
                let rect = region.polygon.bounding_rect()?;
                Some(BoundaryEntry {
                    index,
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();
        Ok(Self {
            crs,
            regions,
            index: RTree::bulk_load(entries),
        })
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn regions(&self) -> &[RegionBoundary] {
        &self.regions
    }

    /// Distinct canonical region keys.
    pub fn region_keys(&self) -> HashSet<&str> {
        self.regions.iter().map(|r| r.key.as_str()).collect()
    }

    /// Display name for a canonical key, if a boundary carries it.
    pub fn display_name(&self, key: &str) -> Option<&str> {
        self.regions
            .iter()
            .find(|r| r.key == key)
            .map(|r| r.name.as_str())
    }

    /// Regions holding the point `(x, y)` given in the boundary CRS. Several
    /// polygons of one region count once.
    ///
    /// Polygons that strictly contain the point win. A point on a boundary
    /// edge belongs to the region it touches, unless the edge is shared by
    /// two regions, in which case nothing is returned.
    pub fn locate(&self, x: f64, y: f64) -> Vec<&RegionBoundary> {
        let point = Point::new(x, y);
        let inside = self.matching(x, y, |polygon| polygon.contains(&point));
        if !inside.is_empty() {
            return inside;
        }
        let touching = self.matching(x, y, |polygon| polygon.intersects(&point));
        if touching.len() == 1 {
            touching
        } else {
            Vec::new()
        }
    }

    fn matching(
        &self,
        x: f64,
        y: f64,
        test: impl Fn(&MultiPolygon<f64>) -> bool,
    ) -> Vec<&RegionBoundary> {
        let mut hits: Vec<&RegionBoundary> = Vec::new();
        for entry in self
            .index
            .locate_in_envelope_intersecting(&AABB::from_point([x, y]))
        {
            let region = &self.regions[entry.index];
            if test(&region.polygon) && !hits.iter().any(|h| h.key == region.key) {
                hits.push(region);
            }
        }
        hits.sort_by(|a, b| a.key.cmp(&b.key));
        hits
    }

    /// Polygons converted to longitude/latitude for drawing.
    pub fn lon_lat_polygons(&self) -> Vec<(&str, MultiPolygon<f64>)> {
        let crs = self.crs;
        self.regions
            .iter()
            .map(|r| {
                let polygon = r.polygon.map_coords(move |c| {
                    let (x, y) = crs.unproject(c.x, c.y);
                    Coord { x, y }
                });
                (r.key.as_str(), polygon)
            })
            .collect()
    }
}

/// Crash counts per canonical region plus how each crash was attributed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionCounts {
    pub counts: BTreeMap<String, usize>,
    pub by_geometry: usize,
    pub by_label: usize,
    /// Points no single region holds (they may still count by label).
    pub unassigned: usize,
}

impl RegionCounts {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Rows for export, largest region first.
    pub fn rows(&self, boundaries: &Boundaries) -> Vec<RegionCountRow> {
        let mut rows: Vec<RegionCountRow> = self
            .counts
            .iter()
            .map(|(key, &crashes)| RegionCountRow {
                region: boundaries
                    .display_name(key)
                    .map_or_else(|| key.clone(), str::to_string),
                crashes,
            })
            .collect();
        rows.sort_by(|a, b| b.crashes.cmp(&a.crashes).then_with(|| a.region.cmp(&b.region)));
        rows
    }
}

/// Attribute every identified crash to at most one region.
///
/// A crash whose point lies inside a region counts there. Crashes not placed
/// that way (no coordinates, or a point outside every polygon) count under
/// their `BOROUGH` label when they have one; the fallback is keyed on the
/// collision id so no crash is counted twice.
pub fn assign_regions(
    data: &Dataset,
    boundaries: &Boundaries,
) -> Result<RegionCounts, JoinAmbiguityError> {
    let mut result = RegionCounts::default();
    let mut placed: HashSet<&str> = HashSet::new();

    for (id, record) in data.identified() {
        let Some((lon, lat)) = record.lon_lat() else {
            continue;
        };
        let (x, y) = boundaries.crs().project(lon, lat);
        match boundaries.locate(x, y).as_slice() {
            [] => result.unassigned += 1,
            [region] => {
                placed.insert(id);
                *result.counts.entry(region.key.clone()).or_insert(0) += 1;
                result.by_geometry += 1;
            }
            many => {
                return Err(JoinAmbiguityError {
                    id: id.to_string(),
                    lon,
                    lat,
                    regions: many.iter().map(|r| r.name.clone()).collect(),
                });
            }
        }
    }

    for (id, record) in data.identified() {
        let Some(label) = record.borough.as_deref() else {
            continue;
        };
        if placed.contains(id) {
            continue;
        }
        *result.counts.entry(canonical_region(label)).or_insert(0) += 1;
        result.by_label += 1;
    }

    if result.unassigned > 0 {
        log::warn!(
            "{} crash points fall outside every boundary polygon",
            result.unassigned
        );
    }
    log::debug!(
        "region assignment: {} by geometry, {} by label",
        result.by_geometry,
        result.by_label
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CrashRecord;
    use geo::{polygon, Polygon};

    fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]
    }

    fn region(name: &str, polygon: Polygon<f64>) -> RegionBoundary {
        RegionBoundary {
            name: name.to_string(),
            key: canonical_region(name),
            polygon: MultiPolygon(vec![polygon]),
        }
    }

    /// Queens is (0..1, 0..1), Brooklyn is (1..2, 0..1).
    fn boroughs() -> Boundaries {
        Boundaries::new(
            Crs::Wgs84,
            vec![
                region("Queens", square(0.0, 0.0, 1.0)),
                region("Brooklyn", square(1.0, 0.0, 1.0)),
            ],
        )
        .unwrap()
    }

    fn crash(id: &str, lon_lat: Option<(f64, f64)>, borough: Option<&str>) -> CrashRecord {
        CrashRecord {
            collision_id: Some(id.to_string()),
            longitude: lon_lat.map(|p| p.0),
            latitude: lon_lat.map(|p| p.1),
            borough: borough.map(str::to_string),
            ..Default::default()
        }
    }

    fn dataset(records: Vec<CrashRecord>) -> Dataset {
        Dataset {
            records,
            factor_slots: 0,
        }
    }

    #[test]
    fn test_point_and_label_fallback() {
        let data = dataset(vec![
            crash("1", Some((0.5, 0.5)), None),
            crash("2", None, Some("BROOKLYN")),
        ]);
        let counts = assign_regions(&data, &boroughs()).unwrap();
        assert_eq!(counts.counts.get("queens"), Some(&1));
        assert_eq!(counts.counts.get("brooklyn"), Some(&1));
        assert_eq!((counts.by_geometry, counts.by_label), (1, 1));
    }

    #[test]
    fn test_geometry_wins_over_label() {
        let data = dataset(vec![crash("1", Some((0.5, 0.5)), Some("BROOKLYN"))]);
        let counts = assign_regions(&data, &boroughs()).unwrap();
        assert_eq!(counts.total(), 1);
        assert_eq!(counts.counts.get("queens"), Some(&1));
        assert_eq!(counts.counts.get("brooklyn"), None);
    }

    #[test]
    fn test_point_outside_uses_label_or_drops() {
        let data = dataset(vec![
            crash("1", Some((1.0, 0.5)), None),
            crash("2", Some((9.0, 9.0)), Some("Queens")),
            crash("3", None, None),
        ]);
        let counts = assign_regions(&data, &boroughs()).unwrap();
        assert_eq!(counts.unassigned, 2);
        assert_eq!(counts.total(), 1);
        assert_eq!(counts.counts.get("queens"), Some(&1));
    }

    #[test]
    fn test_outer_edge_point_belongs_to_its_region() {
        let data = dataset(vec![
            crash("1", Some((0.0, 0.5)), None),
            crash("2", Some((2.0, 1.0)), None),
            crash("3", Some((1.0, 1.0)), None),
        ]);
        let counts = assign_regions(&data, &boroughs()).unwrap();
        assert_eq!(counts.counts.get("queens"), Some(&1));
        assert_eq!(counts.counts.get("brooklyn"), Some(&1));
        // (1, 1) is a corner shared by both boroughs.
        assert_eq!(counts.unassigned, 1);
        assert_eq!(counts.by_geometry, 2);
    }

    #[test]
    fn test_coverage_matches_placeable_records() {
        let data = dataset(vec![
            crash("1", Some((0.2, 0.2)), Some("QUEENS")),
            crash("2", Some((1.2, 0.2)), None),
            crash("3", None, Some("MANHATTAN")),
            crash("4", None, Some("Brooklyn")),
            crash("5", None, None),
        ]);
        let counts = assign_regions(&data, &boroughs()).unwrap();
        assert_eq!(counts.total(), 4);
        assert_eq!(counts.counts.get("manhattan"), Some(&1));
        assert_eq!(counts.counts.get("brooklyn"), Some(&2));
    }

    #[test]
    fn test_overlapping_regions_are_ambiguous() {
        let boundaries = Boundaries::new(
            Crs::Wgs84,
            vec![
                region("Queens", square(0.0, 0.0, 1.0)),
                region("Nassau", square(0.5, 0.0, 1.0)),
            ],
        )
        .unwrap();
        let data = dataset(vec![crash("9", Some((0.75, 0.5)), None)]);
        let err = assign_regions(&data, &boundaries).unwrap_err();
        assert_eq!(err.id, "9");
        assert_eq!(err.regions, vec!["Nassau".to_string(), "Queens".to_string()]);
    }

    #[test]
    fn test_multi_feature_region_counts_once() {
        let boundaries = Boundaries::new(
            Crs::Wgs84,
            vec![
                region("Queens", square(0.0, 0.0, 1.0)),
                region("QUEENS", square(0.0, 0.0, 2.0)),
            ],
        )
        .unwrap();
        let data = dataset(vec![crash("1", Some((0.5, 0.5)), None)]);
        let counts = assign_regions(&data, &boundaries).unwrap();
        assert_eq!(counts.counts.get("queens"), Some(&1));
    }

    #[test]
    fn test_points_are_projected_into_state_plane() {
        let (x, y) = Crs::NyLongIsland.project(-73.8, 40.7);
        let boundaries = Boundaries::new(
            Crs::NyLongIsland,
            vec![region("Queens", square(x - 100.0, y - 100.0, 200.0))],
        )
        .unwrap();
        let data = dataset(vec![crash("1", Some((-73.8, 40.7)), None)]);
        let counts = assign_regions(&data, &boundaries).unwrap();
        assert_eq!(counts.by_geometry, 1);
    }

    #[test]
    fn test_geojson_with_state_plane_crs() {
        let text = r#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::2263"}},
            "features": [{
                "type": "Feature",
                "properties": {"BoroName": "Staten Island"},
                "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}
            }]
        }"#;
        let boundaries = Boundaries::from_geojson_str(text, DEFAULT_NAME_PROPERTY).unwrap();
        assert_eq!(boundaries.crs(), Crs::NyLongIsland);
        assert_eq!(boundaries.display_name("staten island"), Some("Staten Island"));
        assert_eq!(boundaries.locate(5.0, 5.0).len(), 1);
    }

    #[test]
    fn test_geojson_errors() {
        let point = r#"{"type": "Point", "coordinates": [0, 0]}"#;
        assert!(matches!(
            Boundaries::from_geojson_str(point, DEFAULT_NAME_PROPERTY),
            Err(ReferenceDataError::NotFeatureCollection)
        ));

        let unnamed = r#"{"type": "FeatureCollection", "features": [{
            "type": "Feature", "properties": {},
            "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}
        }]}"#;
        assert!(matches!(
            Boundaries::from_geojson_str(unnamed, DEFAULT_NAME_PROPERTY),
            Err(ReferenceDataError::MissingName { index: 0, .. })
        ));

        let empty = r#"{"type": "FeatureCollection", "features": []}"#;
        assert!(matches!(
            Boundaries::from_geojson_str(empty, DEFAULT_NAME_PROPERTY),
            Err(ReferenceDataError::Empty)
        ));

        assert!(matches!(
            Boundaries::from_geojson_str("{not json", DEFAULT_NAME_PROPERTY),
            Err(ReferenceDataError::GeoJson(_))
        ));

        let pin = r#"{"type": "FeatureCollection", "features": [{
            "type": "Feature", "properties": {"BoroName": "Queens"},
            "geometry": {"type": "Point", "coordinates": [0, 0]}
        }]}"#;
        assert!(matches!(
            Boundaries::from_geojson_str(pin, DEFAULT_NAME_PROPERTY),
            Err(ReferenceDataError::InvalidGeometry { index: 0, ref name }) if name == "Queens"
        ));

        let no_geometry = r#"{"type": "FeatureCollection", "features": [{
            "type": "Feature", "properties": {"BoroName": "Queens"}, "geometry": null
        }]}"#;
        assert!(matches!(
            Boundaries::from_geojson_str(no_geometry, DEFAULT_NAME_PROPERTY),
            Err(ReferenceDataError::InvalidGeometry { index: 0, .. })
        ));

        assert!(matches!(
            Boundaries::load("/nonexistent/nybb.geojson", DEFAULT_NAME_PROPERTY),
            Err(ReferenceDataError::Io { .. })
        ));

        let mercator = r#"{"type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "EPSG:3857"}}, "features": []}"#;
        assert!(matches!(
            Boundaries::from_geojson_str(mercator, DEFAULT_NAME_PROPERTY),
            Err(ReferenceDataError::UnsupportedCrs(_))
        ));
    }

    #[test]
    fn test_rows_sorted_by_count_with_boundary_names() {
        let mut counts = RegionCounts::default();
        counts.counts.insert("queens".into(), 3);
        counts.counts.insert("brooklyn".into(), 5);
        counts.counts.insert("elsewhere".into(), 3);
        let rows = counts.rows(&boroughs());
        let names: Vec<&str> = rows.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(names, vec!["Brooklyn", "Queens", "elsewhere"]);
    }
}
