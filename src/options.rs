use serde::Deserialize;

/// Tunables for route rendering and map culling.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Width of the exported share image in pixels (default: 1080)
    #[serde(default = "default_canvas_width")]
    pub canvas_width: f64,

    /// Height of the exported share image in pixels (default: 1350)
    #[serde(default = "default_canvas_height")]
    pub canvas_height: f64,

    /// Padding on each side of a route drawing, as a fraction of its size (default: 0.10)
    #[serde(default = "default_padding_fraction")]
    pub padding_fraction: f64,

    /// Map level above which every route path is hidden (default: 10)
    #[serde(default = "default_zoom_hidden_threshold")]
    pub zoom_hidden_threshold: f64,

    /// Quiet period after the last viewport change before recomputing (default: 100)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: f64,

    /// Route drawing size on the on-screen preview card (default: 120)
    #[serde(default = "default_preview_route_size")]
    pub preview_route_size: f64,

    /// Route drawing size on the exported image (default: 180)
    #[serde(default = "default_export_route_size")]
    pub export_route_size: f64,

    /// Axis range substituted for a flat bounding box, in degrees (default: 0.001)
    #[serde(default = "default_min_axis_range")]
    pub min_axis_range: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            canvas_width: default_canvas_width(),
            canvas_height: default_canvas_height(),
            padding_fraction: default_padding_fraction(),
            zoom_hidden_threshold: default_zoom_hidden_threshold(),
            debounce_ms: default_debounce_ms(),
            preview_route_size: default_preview_route_size(),
            export_route_size: default_export_route_size(),
            min_axis_range: default_min_axis_range(),
        }
    }
}

fn default_canvas_width() -> f64 {
    1080.0
}

fn default_canvas_height() -> f64 {
    1350.0
}

fn default_padding_fraction() -> f64 {
    0.10
}

fn default_zoom_hidden_threshold() -> f64 {
    10.0
}

fn default_debounce_ms() -> f64 {
    100.0
}

fn default_preview_route_size() -> f64 {
    120.0
}

fn default_export_route_size() -> f64 {
    180.0
}

fn default_min_axis_range() -> f64 {
    0.001
}
