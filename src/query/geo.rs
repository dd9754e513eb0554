//! Radius filtering by great-circle distance.
//!
//! There is no spatial index: [`GeoFilter::scan`] is a linear pass over every
//! live document, and [`GeoFilter::combined`] filters the top text results.

use serde::{Deserialize, Serialize};

use crate::document::{DocId, Document};
use crate::error::{PlacedexError, Result};
use crate::query::query::Query;
use crate::query::searcher::Searcher;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Text hits considered by [`GeoFilter::combined`] unless overridden.
pub const COMBINED_TEXT_LIMIT: usize = 50;

/// A geographical point with latitude and longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (-90 to 90)
    pub lat: f64,
    /// Longitude in degrees (-180 to 180)
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(PlacedexError::invalid_argument(format!(
                "Invalid latitude: {lat} (must be between -90 and 90)"
            )));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(PlacedexError::invalid_argument(format!(
                "Invalid longitude: {lon} (must be between -180 and 180)"
            )));
        }

        Ok(GeoPoint { lat, lon })
    }

    /// Haversine distance to another point in kilometers.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let lat1_rad = self.lat.to_radians();
        let lat2_rad = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lon = (other.lon - self.lon).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }
}

/// A search center and radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryPoint {
    pub center: GeoPoint,
    pub radius_km: f64,
}

impl QueryPoint {
    pub fn new(lat: f64, lon: f64, radius_km: f64) -> Result<Self> {
        let center = GeoPoint::new(lat, lon)?;
        if !(radius_km >= 0.0) {
            return Err(PlacedexError::invalid_argument(format!(
                "Invalid radius: {radius_km} (must be non-negative)"
            )));
        }
        Ok(QueryPoint { center, radius_km })
    }

    /// Distance from the center to `point`, when within the radius (inclusive).
    pub fn distance_within(&self, point: &GeoPoint) -> Option<f64> {
        let distance = self.center.distance_km(point);
        (distance <= self.radius_km).then_some(distance)
    }
}

/// A document inside the search radius.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoHit {
    pub doc_id: DocId,
    pub distance_km: f64,
    /// Text relevance, when the hit came from a text search.
    pub score: Option<f32>,
    pub document: Document,
}

/// Filters documents by the coordinates held in two Numeric fields.
#[derive(Debug, Clone)]
pub struct GeoFilter {
    lat_field: String,
    lon_field: String,
    text_limit: usize,
}

impl Default for GeoFilter {
    fn default() -> Self {
        Self::new("latitude", "longitude")
    }
}

impl GeoFilter {
    pub fn new<A: Into<String>, O: Into<String>>(lat_field: A, lon_field: O) -> Self {
        GeoFilter {
            lat_field: lat_field.into(),
            lon_field: lon_field.into(),
            text_limit: COMBINED_TEXT_LIMIT,
        }
    }

    /// Number of ranked text hits [`combined`](Self::combined) filters.
    pub fn with_text_limit(mut self, limit: usize) -> Self {
        self.text_limit = limit;
        self
    }

    pub fn text_limit(&self) -> usize {
        self.text_limit
    }

    /// The document's coordinates, if both fields hold a valid value.
    pub fn location(&self, document: &Document) -> Option<GeoPoint> {
        let lat = document.get_field(&self.lat_field)?.numeric_value()?;
        let lon = document.get_field(&self.lon_field)?.numeric_value()?;
        GeoPoint::new(lat, lon).ok()
    }

    /// Keep the candidates within the radius, in their given order.
    /// Candidates without coordinates are skipped.
    pub fn within_radius<I>(&self, point: &QueryPoint, candidates: I) -> Vec<GeoHit>
    where
        I: IntoIterator<Item = (DocId, Option<f32>, Document)>,
    {
        candidates
            .into_iter()
            .filter_map(|(doc_id, score, document)| {
                let location = self.location(&document)?;
                let distance_km = point.distance_within(&location)?;
                Some(GeoHit {
                    doc_id,
                    distance_km,
                    score,
                    document,
                })
            })
            .collect()
    }

    /// Every live document within the radius, in ascending doc id order.
    pub fn scan(&self, searcher: &Searcher, point: &QueryPoint) -> Vec<GeoHit> {
        let candidates = searcher
            .snapshot()
            .documents()
            .map(|stored| (stored.doc_id, None, stored.fields));
        let hits = self.within_radius(point, candidates);
        log::debug!(
            "geo scan of {} docs kept {} within {} km",
            searcher.num_docs(),
            hits.len(),
            point.radius_km
        );
        hits
    }

    /// The top text hits for `query` that lie within the radius, in rank
    /// order. Documents ranked below the text limit are never considered.
    pub fn combined(&self, searcher: &Searcher, query: &Query, point: &QueryPoint) -> Result<Vec<GeoHit>> {
        let top = searcher.search(query, Some(self.text_limit))?;
        let candidates = top
            .hits
            .into_iter()
            .map(|hit| (hit.doc_id, Some(hit.score), hit.document));
        Ok(self.within_radius(point, candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(lat: f64, lon: f64) -> Document {
        Document::builder()
            .add_numeric("latitude", lat)
            .add_numeric("longitude", lon)
            .build()
    }

    #[test]
    fn test_point_validation() {
        assert!(GeoPoint::new(90.0, -180.0).is_ok());
        assert!(GeoPoint::new(90.1, 0.0).is_err());
        assert!(GeoPoint::new(0.0, 180.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());

        assert!(QueryPoint::new(0.0, 0.0, 0.0).is_ok());
        assert!(matches!(
            QueryPoint::new(0.0, 0.0, -1.0),
            Err(PlacedexError::InvalidArgument(_))
        ));
        assert!(QueryPoint::new(0.0, 0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_haversine() {
        let origin = GeoPoint::new(0.0, 0.0).unwrap();
        let east = GeoPoint::new(0.0, 1.0).unwrap();
        assert_eq!(origin.distance_km(&origin), 0.0);
        assert!((origin.distance_km(&east) - 111.19).abs() < 0.01);
        assert_eq!(origin.distance_km(&east), east.distance_km(&origin));
    }

    #[test]
    fn test_within_radius() {
        let filter = GeoFilter::default();
        let point = QueryPoint::new(0.0, 0.0, 111.2).unwrap();
        let candidates = vec![
            (7, Some(2.0), place(0.0, 1.0)),
            (3, Some(1.5), place(0.0, 2.0)),
            (5, Some(1.0), place(0.0, 0.5)),
            (9, Some(0.5), Document::builder().add_text("name", "nowhere").build()),
            (
                4,
                Some(0.2),
                Document::builder()
                    .add_text("latitude", "0.25")
                    .add_text("longitude", " 0.0 ")
                    .build(),
            ),
        ];

        let hits = filter.within_radius(&point, candidates);
        let ids: Vec<DocId> = hits.iter().map(|hit| hit.doc_id).collect();
        assert_eq!(ids, vec![7, 5, 4]);
        assert_eq!(hits[0].score, Some(2.0));
    }

    #[test]
    fn test_radius_boundary_is_inclusive() {
        let filter = GeoFilter::new("lat", "lon").with_text_limit(10);
        assert_eq!(filter.text_limit(), 10);

        let document = Document::builder()
            .add_numeric("lat", 36.1)
            .add_numeric("lon", -115.2)
            .build();
        let exact = QueryPoint::new(36.1, -115.2, 0.0).unwrap();
        let hits = filter.within_radius(&exact, vec![(0, None, document)]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].distance_km, 0.0);
    }
}
