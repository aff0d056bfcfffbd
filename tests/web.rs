#![cfg(target_arch = "wasm32")]

use runlog_track_wasm::{RouteVisibility, format_distance, parse_track, route_svg_path};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

const GPX: &str = r#"<?xml version="1.0"?>
<gpx version="1.1"><trk><trkseg>
  <trkpt lat="37.5665" lon="126.9780"><time>2025-01-01T06:00:00Z</time></trkpt>
  <trkpt lat="37.5675" lon="126.9790"><time>2025-01-01T06:05:00Z</time></trkpt>
  <trkpt lat="37.5685" lon="126.9800"><time>2025-01-01T06:10:00Z</time></trkpt>
</trkseg></trk></gpx>"#;

fn get(obj: &JsValue, key: &str) -> JsValue {
    js_sys::Reflect::get(obj, &JsValue::from_str(key)).unwrap()
}

#[wasm_bindgen_test]
fn parse_track_returns_metrics() {
    let parsed = parse_track(GPX).unwrap();
    let metrics = get(&parsed, "metrics");
    let duration = get(&metrics, "durationMin").as_f64().unwrap();
    assert!((duration - 10.0).abs() < 1e-9);
    let points = js_sys::Array::from(&get(&parsed, "points"));
    assert_eq!(points.length(), 3);
}

#[wasm_bindgen_test]
fn parse_track_rejects_garbage() {
    assert!(parse_track("not xml").is_err());
}

#[wasm_bindgen_test]
fn svg_path_from_js_points() {
    let points = js_sys::JSON::parse(
        r#"[{"lat":37.5665,"lng":126.978},{"lat":37.5675,"lng":126.979},{"lat":37.5685,"lng":126.98}]"#,
    )
    .unwrap();
    let d = route_svg_path(points, 100.0, JsValue::UNDEFINED).unwrap();
    assert_eq!(d.as_deref(), Some("M 10.00,90.00 L 50.00,50.00 L 90.00,10.00"));
    assert_eq!(format_distance(0.2837), "0.28");
}

#[wasm_bindgen_test]
fn route_visibility_hides_when_zoomed_out() {
    let routes = js_sys::JSON::parse(
        r#"[{"routeId":"a","anchor":{"lat":37.5665,"lng":126.978}}]"#,
    )
    .unwrap();
    let bounds = js_sys::JSON::parse(
        r#"{"minLat":37.4,"maxLat":37.7,"minLng":126.8,"maxLng":127.2}"#,
    )
    .unwrap();
    let mut vis = RouteVisibility::new(routes, JsValue::NULL).unwrap();

    let near = js_sys::Array::from(&vis.evaluate_now(bounds.clone(), 5.0).unwrap());
    assert_eq!(get(&near.get(0), "isPathVisible"), JsValue::TRUE);

    let far = js_sys::Array::from(&vis.evaluate_now(bounds.clone(), 11.0).unwrap());
    assert_eq!(get(&far.get(0), "isPathVisible"), JsValue::FALSE);

    vis.viewport_changed(bounds, 5.0).unwrap();
    assert!(vis.next_deadline().is_some());
    vis.dispose();
    assert!(vis.next_deadline().is_none());
}

fn js_point(lat: f64, lng: f64) -> JsValue {
    let obj = js_sys::Object::new();
    js_sys::Reflect::set(&obj, &JsValue::from_str("lat"), &JsValue::from_f64(lat)).unwrap();
    js_sys::Reflect::set(&obj, &JsValue::from_str("lng"), &JsValue::from_f64(lng)).unwrap();
    obj.into()
}

#[wasm_bindgen_test]
fn svg_path_never_contains_nan() {
    let points = js_sys::Array::of3(
        &js_point(37.5665, 126.978),
        &js_point(f64::NAN, 126.979),
        &js_point(37.5685, 126.98),
    );
    let d = route_svg_path(points.clone().into(), 100.0, JsValue::UNDEFINED).unwrap();
    assert_eq!(d.as_deref(), Some("M 10.00,90.00 L 90.00,10.00"));

    assert_eq!(route_svg_path(points.clone().into(), f64::NAN, JsValue::UNDEFINED).unwrap(), None);
    assert_eq!(route_svg_path(points.into(), -1.0, JsValue::UNDEFINED).unwrap(), None);
}
