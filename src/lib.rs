pub mod converter;
pub mod error;
pub mod format;
pub mod metrics;
pub mod normalize;
pub mod options;
pub mod parser;
pub mod track_types;
pub mod visibility;

use serde::Deserialize;
use wasm_bindgen::prelude::*;

use crate::normalize::{Canvas, normalize, svg_path};
use crate::options::EngineConfig;
use crate::track_types::{BoundingBox, GeoPoint, Track};
use crate::visibility::{RouteAnchor, Viewport, VisibilityFilter};

/// Parse GPX text into `{ points, metrics, warnings }`, returned as a JS object.
#[wasm_bindgen(js_name = parseTrack)]
pub fn parse_track(gpx_string: &str) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let parsed = parser::parse_track(gpx_string)?;
    to_js(&parsed)
}

/// Project track points onto a square canvas of `size` pixels.
#[wasm_bindgen(js_name = normalizeRoute)]
pub fn normalize_route(points: JsValue, size: f64, options: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let track = parse_points(points)?;
    to_js(&normalize(track.points(), &Canvas::from_config(&opts, size)))
}

/// SVG path data for a route drawn on a `size` pixel square, or `undefined`
/// when there is nothing to draw.
#[wasm_bindgen(js_name = routeSvgPath)]
pub fn route_svg_path(points: JsValue, size: f64, options: JsValue) -> Result<Option<String>, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let track = parse_points(points)?;
    Ok(svg_path(&normalize(track.points(), &Canvas::from_config(&opts, size))))
}

#[derive(Debug, Deserialize)]
struct RouteInput {
    id: String,
    points: Vec<GeoPoint>,
}

/// Convert `[{ id, points }]` into a GeoJSON FeatureCollection string.
#[wasm_bindgen(js_name = routesToGeoJsonString)]
pub fn routes_to_geojson_string(routes: JsValue) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let routes: Vec<RouteInput> =
        serde_wasm_bindgen::from_value(routes).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let tracks: Vec<(String, Track)> = routes
        .into_iter()
        .map(|r| (r.id, Track::from_untrusted(r.points)))
        .collect();
    let fc = converter::routes_collection(tracks.iter().map(|(id, t)| (id.as_str(), t)));
    serde_json::to_string(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen(js_name = formatDistance)]
pub fn format_distance(km: f64) -> String {
    format::format_distance(km)
}

#[wasm_bindgen(js_name = formatPace)]
pub fn format_pace(pace: f64) -> String {
    format::format_pace(pace)
}

#[wasm_bindgen(js_name = formatClock)]
pub fn format_clock(minutes: f64) -> String {
    format::format_clock(minutes)
}

/// Route culling for a multi-route map.
///
/// Forward every zoom/bounds event to `viewportChanged`, then call `flush`
/// once `nextDeadline()` has passed (e.g. from `setTimeout`).
#[wasm_bindgen]
pub struct RouteVisibility {
    routes: Vec<RouteAnchor>,
    filter: VisibilityFilter,
}

#[wasm_bindgen]
impl RouteVisibility {
    /// `routes` is `[{ routeId, anchor: { lat, lng } }]`.
    #[wasm_bindgen(constructor)]
    pub fn new(routes: JsValue, options: JsValue) -> Result<RouteVisibility, JsValue> {
        console_error_panic_hook::set_once();

        let opts = parse_options(options)?;
        let mut routes: Vec<RouteAnchor> =
            serde_wasm_bindgen::from_value(routes).map_err(|e| JsValue::from_str(&e.to_string()))?;
        routes.retain(RouteAnchor::has_valid_anchor);
        Ok(Self {
            routes,
            filter: VisibilityFilter::new(&opts),
        })
    }

    /// Visibility for the given viewport, without debouncing.
    #[wasm_bindgen(js_name = evaluateNow)]
    pub fn evaluate_now(&mut self, bounds: JsValue, level: f64) -> Result<JsValue, JsValue> {
        let viewport = parse_viewport(bounds, level)?;
        to_js(&self.filter.evaluate_now(&self.routes, &viewport))
    }

    #[wasm_bindgen(js_name = viewportChanged)]
    pub fn viewport_changed(&mut self, bounds: JsValue, level: f64) -> Result<(), JsValue> {
        let viewport = parse_viewport(bounds, level)?;
        self.filter.viewport_changed(&viewport, js_sys::Date::now());
        Ok(())
    }

    /// Updated visibility if a settled change is due, otherwise `null`.
    pub fn flush(&mut self) -> Result<JsValue, JsValue> {
        match self.filter.poll(&self.routes, js_sys::Date::now()) {
            Some(states) => to_js(&states),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = nextDeadline)]
    pub fn next_deadline(&self) -> Option<f64> {
        self.filter.next_deadline()
    }

    pub fn dispose(&mut self) {
        self.filter.dispose();
    }
}

fn parse_options(options: JsValue) -> Result<EngineConfig, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(EngineConfig::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

fn parse_points(points: JsValue) -> Result<Track, JsValue> {
    let points: Vec<GeoPoint> =
        serde_wasm_bindgen::from_value(points).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(Track::from_untrusted(points))
}

fn parse_viewport(bounds: JsValue, level: f64) -> Result<Viewport, JsValue> {
    let bounds: BoundingBox =
        serde_wasm_bindgen::from_value(bounds).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(Viewport { bounds, level })
}

fn to_js<T: serde::Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
