use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::track_types::{GeoPoint, Track};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Summary of one run, derived once from its track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackMetrics {
    pub total_distance_km: f64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_min: f64,
    /// Minutes per kilometre; `0.0` when distance or duration is unknown.
    pub pace_min_per_km: f64,
}

/// Great-circle distance between two points in kilometres.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Sum of the legs between consecutive points.
pub fn total_distance_km(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|w| haversine_km(&w[0], &w[1])).sum()
}

/// Derive distance, duration and pace for a track.
///
/// Start and end times come from the first and last point only. A track whose
/// timestamps run backwards yields a negative duration; it is not clamped.
pub fn compute_metrics(track: &Track) -> TrackMetrics {
    let points = track.points();
    let total_distance_km = total_distance_km(points);

    let start_time = points.first().and_then(|p| p.timestamp);
    let end_time = points.last().and_then(|p| p.timestamp);

    let duration_min = match (start_time, end_time) {
        (Some(start), Some(end)) => (end - start).num_milliseconds() as f64 / 60_000.0,
        _ => 0.0,
    };

    let pace_min_per_km = if total_distance_km > 0.0 && duration_min > 0.0 {
        duration_min / total_distance_km
    } else {
        0.0
    };

    TrackMetrics {
        total_distance_km,
        start_time,
        end_time,
        duration_min,
        pace_min_per_km,
    }
}
