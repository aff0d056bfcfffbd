use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::metrics::TrackMetrics;

/// A single recorded track point (`<trkpt>`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            timestamp: None,
            elevation: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    /// True when both coordinates are finite and inside the WGS84 ranges.
    pub fn is_valid(lat: f64, lng: f64) -> bool {
        lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng)
    }
}

/// Points of one run in recording order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Track {
    points: Vec<GeoPoint>,
}

impl Track {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { points }
    }

    /// Build a track from points that did not come through the parser,
    /// dropping any with invalid coordinates.
    pub fn from_untrusted(points: Vec<GeoPoint>) -> Self {
        let total = points.len();
        let points: Vec<GeoPoint> = points
            .into_iter()
            .filter(|p| GeoPoint::is_valid(p.lat, p.lng))
            .collect();
        if points.len() < total {
            debug!("dropped {} point(s) with invalid coordinates", total - points.len());
        }
        Self { points }
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The start point, used to place the route on a map.
    pub fn anchor(&self) -> Option<&GeoPoint> {
        self.points.first()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.points)
    }

    /// Index of the first point whose timestamp is earlier than the previous
    /// timestamped point, if any. Points without a timestamp are ignored.
    pub fn first_out_of_order(&self) -> Option<usize> {
        let mut last: Option<DateTime<Utc>> = None;
        for (i, pt) in self.points.iter().enumerate() {
            if let Some(t) = pt.timestamp {
                if last.is_some_and(|prev| t < prev) {
                    return Some(i);
                }
                last = Some(t);
            }
        }
        None
    }

    pub fn is_chronological(&self) -> bool {
        self.first_out_of_order().is_none()
    }
}

impl From<Vec<GeoPoint>> for Track {
    fn from(points: Vec<GeoPoint>) -> Self {
        Self::new(points)
    }
}

/// Geographic extent of a point set, also used for map viewports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        let first = points.first()?;
        let init = Self::new(first.lat, first.lat, first.lng, first.lng);
        Some(points[1..].iter().fold(init, |b, p| Self {
            min_lat: b.min_lat.min(p.lat),
            max_lat: b.max_lat.max(p.lat),
            min_lng: b.min_lng.min(p.lng),
            max_lng: b.max_lng.max(p.lng),
        }))
    }

    pub fn lat_range(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lng_range(&self) -> f64 {
        self.max_lng - self.min_lng
    }

    /// Inclusive containment test.
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
    }
}

/// A projected point in canvas pixels, origin top-left, y down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

/// Non-fatal findings collected while reading a track.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TrackWarning {
    /// Points dropped for missing, unparsable or out-of-range coordinates.
    SkippedPoints { count: usize },
    /// Points whose `<time>` could not be read; kept without a timestamp.
    InvalidTimestamps { count: usize },
    InvalidElevations { count: usize },
    /// Fewer than two points: no distance and nothing to draw.
    TooFewPoints { count: usize },
    /// Timestamps go backwards at this index. The track is kept in file order.
    NonMonotonicTime { index: usize },
}

/// Result of reading one track file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTrack {
    pub points: Track,
    pub metrics: TrackMetrics,
    pub warnings: Vec<TrackWarning>,
}
