use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::trace;
use serde::{Deserialize, Serialize};

use crate::options::EngineConfig;
use crate::track_types::{BoundingBox, GeoPoint, Track};

/// What the map currently shows. `level` follows the provider's convention:
/// larger is further zoomed out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub bounds: BoundingBox,
    pub level: f64,
}

/// Read access to an interactive map, supplied by the caller.
pub trait MapView {
    fn bounds(&self) -> BoundingBox;
    fn level(&self) -> f64;

    fn viewport(&self) -> Viewport {
        Viewport {
            bounds: self.bounds(),
            level: self.level(),
        }
    }
}

/// Called with the new viewport and the event time in milliseconds.
pub type ViewportListener = Box<dyn FnMut(Viewport, f64)>;

/// A map that can report zoom/bounds changes.
pub trait ViewportEvents: MapView {
    fn on_viewport_changed(&mut self, listener: ViewportListener);
}

impl MapView for Viewport {
    fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    fn level(&self) -> f64 {
        self.level
    }
}

/// A route as seen by the culler: its id and start point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteAnchor {
    pub route_id: String,
    pub anchor: GeoPoint,
}

impl RouteAnchor {
    /// `None` for an empty track, which has no path to draw.
    pub fn from_track(route_id: impl Into<String>, track: &Track) -> Option<Self> {
        track.anchor().map(|anchor| Self {
            route_id: route_id.into(),
            anchor: *anchor,
        })
    }

    pub fn has_valid_anchor(&self) -> bool {
        GeoPoint::is_valid(self.anchor.lat, self.anchor.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteVisibilityState {
    pub route_id: String,
    pub is_path_visible: bool,
}

pub fn is_zoomed_out(level: f64, threshold: f64) -> bool {
    level > threshold
}

/// Decide which route paths to draw for `viewport`.
///
/// Above the zoom threshold every path is hidden. Otherwise a path is drawn
/// when its anchor lies inside the viewport bounds; the rest of the path is
/// not considered.
pub fn evaluate(routes: &[RouteAnchor], viewport: &Viewport, threshold: f64) -> Vec<RouteVisibilityState> {
    let zoomed_out = is_zoomed_out(viewport.level, threshold);
    routes
        .iter()
        .map(|r| RouteVisibilityState {
            route_id: r.route_id.clone(),
            is_path_visible: !zoomed_out
                && r.has_valid_anchor()
                && viewport.bounds.contains(r.anchor.lat, r.anchor.lng),
        })
        .collect()
}

#[derive(Debug)]
struct Pending<T> {
    value: T,
    due_ms: f64,
}

/// Single-slot trailing debounce driven by caller-supplied timestamps.
///
/// Each `schedule` replaces the pending value and pushes the deadline back;
/// `poll` hands the value out once, after the interval has passed since the
/// most recent `schedule`.
#[derive(Debug)]
pub struct Debouncer<T> {
    interval_ms: f64,
    pending: Option<Pending<T>>,
}

impl<T> Debouncer<T> {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms: interval_ms.max(0.0),
            pending: None,
        }
    }

    /// Returns true when an earlier pending value was superseded.
    pub fn schedule(&mut self, value: T, now_ms: f64) -> bool {
        let replaced = self.pending.is_some();
        self.pending = Some(Pending {
            value,
            due_ms: now_ms + self.interval_ms,
        });
        replaced
    }

    pub fn poll(&mut self, now_ms: f64) -> Option<T> {
        let due_ms = self.pending.as_ref()?.due_ms;
        if now_ms < due_ms {
            return None;
        }
        self.pending.take().map(|p| p.value)
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    pub fn deadline(&self) -> Option<f64> {
        self.pending.as_ref().map(|p| p.due_ms)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Viewport-driven culling for a multi-route map.
#[derive(Debug)]
pub struct VisibilityFilter {
    threshold: f64,
    debouncer: Debouncer<Viewport>,
    recomputations: usize,
}

impl VisibilityFilter {
    pub fn new(cfg: &EngineConfig) -> Self {
        Self {
            threshold: cfg.zoom_hidden_threshold,
            debouncer: Debouncer::new(cfg.debounce_ms),
            recomputations: 0,
        }
    }

    /// Evaluate immediately, e.g. for the first render after the map loads.
    pub fn evaluate_now<M: MapView + ?Sized>(&mut self, routes: &[RouteAnchor], map: &M) -> Vec<RouteVisibilityState> {
        self.recompute(routes, &map.viewport())
    }

    /// Record a zoom/bounds change. Only the latest viewport is kept.
    pub fn viewport_changed<M: MapView + ?Sized>(&mut self, map: &M, now_ms: f64) {
        if self.debouncer.schedule(map.viewport(), now_ms) {
            trace!("viewport change superseded a pending recompute");
        }
    }

    /// Register `filter` for `map`'s change events.
    ///
    /// The listener holds only a weak reference, so events arriving after the
    /// filter is dropped are ignored.
    pub fn subscribe<M: ViewportEvents + ?Sized>(filter: &Rc<RefCell<Self>>, map: &mut M) {
        let weak: Weak<RefCell<Self>> = Rc::downgrade(filter);
        map.on_viewport_changed(Box::new(move |viewport, now_ms| {
            match weak.upgrade() {
                Some(filter) => filter.borrow_mut().viewport_changed(&viewport, now_ms),
                None => trace!("viewport change after the filter was dropped"),
            }
        }));
    }

    /// Recompute if the debounce interval has elapsed since the last change.
    pub fn poll(&mut self, routes: &[RouteAnchor], now_ms: f64) -> Option<Vec<RouteVisibilityState>> {
        let viewport = self.debouncer.poll(now_ms)?;
        Some(self.recompute(routes, &viewport))
    }

    /// When the caller should poll next, if anything is pending.
    pub fn next_deadline(&self) -> Option<f64> {
        self.debouncer.deadline()
    }

    /// Drop any pending recompute; call when the map view is torn down.
    pub fn dispose(&mut self) {
        self.debouncer.cancel();
    }

    pub fn recompute_count(&self) -> usize {
        self.recomputations
    }

    fn recompute(&mut self, routes: &[RouteAnchor], viewport: &Viewport) -> Vec<RouteVisibilityState> {
        self.recomputations += 1;
        trace!(
            "recomputing visibility for {} routes at level {}",
            routes.len(),
            viewport.level
        );
        evaluate(routes, viewport, self.threshold)
    }
}

impl Drop for VisibilityFilter {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seoul_view(level: f64) -> Viewport {
        Viewport {
            bounds: BoundingBox::new(37.50, 37.60, 126.90, 127.05),
            level,
        }
    }

    fn routes() -> Vec<RouteAnchor> {
        vec![
            RouteAnchor {
                route_id: "in".into(),
                anchor: GeoPoint::new(37.5665, 126.9780),
            },
            RouteAnchor {
                route_id: "busan".into(),
                anchor: GeoPoint::new(35.1796, 129.0756),
            },
        ]
    }

    fn visible(states: &[RouteVisibilityState]) -> Vec<&str> {
        states
            .iter()
            .filter(|s| s.is_path_visible)
            .map(|s| s.route_id.as_str())
            .collect()
    }

    #[test]
    fn test_anchor_containment() {
        let states = evaluate(&routes(), &seoul_view(5.0), 10.0);
        assert_eq!(states.len(), 2);
        assert_eq!(visible(&states), vec!["in"]);
    }

    #[test]
    fn test_threshold_boundary() {
        let at = evaluate(&routes(), &seoul_view(10.0), 10.0);
        assert_eq!(visible(&at), vec!["in"]);

        let above = evaluate(&routes(), &seoul_view(11.0), 10.0);
        assert!(visible(&above).is_empty());
        assert_eq!(above.len(), 2);
    }

    #[test]
    fn test_anchor_only_not_path_intersection() {
        // path would cross the viewport, but the anchor is outside
        let track = Track::new(vec![GeoPoint::new(37.40, 126.95), GeoPoint::new(37.55, 126.95)]);
        let r = RouteAnchor::from_track("crossing", &track).unwrap();
        let states = evaluate(&[r], &seoul_view(5.0), 10.0);
        assert!(!states[0].is_path_visible);
    }

    #[test]
    fn test_anchor_on_edge_is_inside() {
        let r = RouteAnchor {
            route_id: "edge".into(),
            anchor: GeoPoint::new(37.50, 126.90),
        };
        assert!(evaluate(&[r], &seoul_view(3.0), 10.0)[0].is_path_visible);
    }

    #[test]
    fn test_invalid_anchor_is_hidden() {
        let nan = RouteAnchor {
            route_id: "nan".into(),
            anchor: GeoPoint::new(f64::NAN, 126.95),
        };
        assert!(!nan.has_valid_anchor());
        let everywhere = Viewport {
            bounds: BoundingBox::new(-90.0, 90.0, -180.0, 180.0),
            level: 1.0,
        };
        assert!(!evaluate(&[nan], &everywhere, 10.0)[0].is_path_visible);
    }

    #[test]
    fn test_empty_track_has_no_anchor() {
        assert!(RouteAnchor::from_track("x", &Track::default()).is_none());
    }

    #[test]
    fn test_debouncer_last_value_wins() {
        let mut d = Debouncer::new(100.0);
        assert!(!d.schedule(1, 0.0));
        assert!(d.schedule(2, 40.0));
        assert!(d.schedule(3, 80.0));
        assert_eq!(d.poll(150.0), None);
        assert_eq!(d.deadline(), Some(180.0));
        assert_eq!(d.poll(180.0), Some(3));
        assert_eq!(d.poll(500.0), None);
        assert!(!d.is_pending());
    }

    #[test]
    fn test_debouncer_cancel() {
        let mut d = Debouncer::new(100.0);
        d.schedule("a", 0.0);
        assert_eq!(d.cancel(), Some("a"));
        assert_eq!(d.poll(1000.0), None);
    }

    #[test]
    fn test_filter_coalesces_bursts() {
        let mut filter = VisibilityFilter::new(&EngineConfig::default());
        let routes = routes();

        // zoom out then back in during one gesture
        filter.viewport_changed(&seoul_view(12.0), 0.0);
        filter.viewport_changed(&seoul_view(11.0), 20.0);
        filter.viewport_changed(&seoul_view(9.0), 50.0);
        filter.viewport_changed(&seoul_view(8.0), 90.0);

        assert!(filter.poll(&routes, 120.0).is_none());
        assert_eq!(filter.recompute_count(), 0);

        let states = filter.poll(&routes, 190.0).unwrap();
        assert_eq!(visible(&states), vec!["in"]);
        assert_eq!(filter.recompute_count(), 1);
        assert!(filter.poll(&routes, 400.0).is_none());
        assert_eq!(filter.recompute_count(), 1);
    }

    #[test]
    fn test_filter_dispose_drops_pending() {
        let mut filter = VisibilityFilter::new(&EngineConfig::default());
        filter.viewport_changed(&seoul_view(5.0), 0.0);
        assert_eq!(filter.next_deadline(), Some(100.0));
        filter.dispose();
        assert!(filter.next_deadline().is_none());
        assert!(filter.poll(&routes(), 1000.0).is_none());
    }

    #[derive(Default)]
    struct EmittingMap {
        current: Option<Viewport>,
        listeners: Vec<ViewportListener>,
    }

    impl EmittingMap {
        fn emit(&mut self, viewport: Viewport, now_ms: f64) {
            self.current = Some(viewport);
            for listener in &mut self.listeners {
                listener(viewport, now_ms);
            }
        }
    }

    impl MapView for EmittingMap {
        fn bounds(&self) -> BoundingBox {
            self.current.map_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0), |v| v.bounds)
        }

        fn level(&self) -> f64 {
            self.current.map_or(0.0, |v| v.level)
        }
    }

    impl ViewportEvents for EmittingMap {
        fn on_viewport_changed(&mut self, listener: ViewportListener) {
            self.listeners.push(listener);
        }
    }

    #[test]
    fn test_subscribed_filter_receives_changes() {
        let mut map = EmittingMap::default();
        let filter = Rc::new(RefCell::new(VisibilityFilter::new(&EngineConfig::default())));
        VisibilityFilter::subscribe(&filter, &mut map);

        map.emit(seoul_view(12.0), 0.0);
        map.emit(seoul_view(7.0), 30.0);
        assert_eq!(filter.borrow().next_deadline(), Some(130.0));

        let states = filter.borrow_mut().poll(&routes(), 130.0).unwrap();
        assert_eq!(visible(&states), vec!["in"]);
        assert_eq!(filter.borrow().recompute_count(), 1);

        // map outlives the filter
        drop(filter);
        map.emit(seoul_view(5.0), 500.0);
        assert_eq!(map.level(), 5.0);
    }

    #[test]
    fn test_evaluate_now_skips_debounce() {
        let mut filter = VisibilityFilter::new(&EngineConfig::default());
        let states = filter.evaluate_now(&routes(), &seoul_view(20.0));
        assert!(visible(&states).is_empty());
        assert_eq!(filter.recompute_count(), 1);
    }
}
