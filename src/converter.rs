use chrono::SecondsFormat;
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Value as JsonValue};

use crate::metrics::total_distance_km;
use crate::track_types::{GeoPoint, Track};

/// A run's path as a GeoJSON Feature for the map layer.
///
/// Two or more points give a LineString, a single point gives a Point, and an
/// empty track gives nothing. Points with invalid coordinates are left out.
pub fn route_feature(route_id: &str, track: &Track) -> Option<Feature> {
    let points: Vec<GeoPoint> = track
        .points()
        .iter()
        .filter(|p| GeoPoint::is_valid(p.lat, p.lng))
        .copied()
        .collect();
    let points = points.as_slice();
    let geometry = match points {
        [] => return None,
        [only] => Geometry::new(Value::Point(point_coords(only))),
        _ => Geometry::new(Value::LineString(points.iter().map(point_coords).collect())),
    };

    let mut props = Map::new();
    props.insert(
        "routeId".to_string(),
        JsonValue::String(route_id.to_string()),
    );
    if let Some(km) = serde_json::Number::from_f64(total_distance_km(points)) {
        props.insert("distanceKm".to_string(), JsonValue::Number(km));
    }
    insert_coordinate_times(&mut props, points);

    Some(Feature {
        bbox: None,
        geometry: Some(geometry),
        id: Some(Id::String(route_id.to_string())),
        properties: Some(props),
        foreign_members: None,
    })
}

/// All non-empty routes, in input order.
pub fn routes_collection<'a, I>(routes: I) -> FeatureCollection
where
    I: IntoIterator<Item = (&'a str, &'a Track)>,
{
    FeatureCollection {
        bbox: None,
        features: routes
            .into_iter()
            .filter_map(|(id, track)| route_feature(id, track))
            .collect(),
        foreign_members: None,
    }
}

/// `[lng, lat]` or `[lng, lat, ele]`.
fn point_coords(pt: &GeoPoint) -> Vec<f64> {
    let mut coords = vec![pt.lng, pt.lat];
    if let Some(ele) = pt.elevation {
        coords.push(ele);
    }
    coords
}

fn insert_coordinate_times(props: &mut Map<String, JsonValue>, points: &[GeoPoint]) {
    if points.iter().all(|pt| pt.timestamp.is_none()) {
        return;
    }
    let times: Vec<JsonValue> = points
        .iter()
        .map(|pt| match pt.timestamp {
            Some(t) => JsonValue::String(t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            None => JsonValue::Null,
        })
        .collect();

    let mut coord_props = Map::new();
    coord_props.insert("times".to_string(), JsonValue::Array(times));
    props.insert(
        "coordinateProperties".to_string(),
        JsonValue::Object(coord_props),
    );
}
