use crate::options::EngineConfig;
use crate::track_types::{BoundingBox, GeoPoint, NormalizedPoint};

/// A square drawing surface for a static route preview.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub size: f64,
    pub padding_fraction: f64,
    /// Range used in place of a zero-width axis, in degrees.
    pub min_axis_range: f64,
}

impl Canvas {
    pub fn new(size: f64) -> Self {
        let cfg = EngineConfig::default();
        Self::from_config(&cfg, size)
    }

    pub fn from_config(cfg: &EngineConfig, size: f64) -> Self {
        Self {
            size,
            padding_fraction: cfg.padding_fraction,
            min_axis_range: cfg.min_axis_range,
        }
    }

    /// Same canvas at `factor` times the pixel size.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            size: self.size * factor,
            ..*self
        }
    }

    pub fn padding(&self) -> f64 {
        self.size * self.padding_fraction
    }

    /// Finite positive size, padding leaving room to draw, and a positive
    /// fallback range.
    pub fn is_drawable(&self) -> bool {
        self.size.is_finite()
            && self.size > 0.0
            && self.padding_fraction.is_finite()
            && (0.0..0.5).contains(&self.padding_fraction)
            && self.min_axis_range.is_finite()
            && self.min_axis_range > 0.0
    }
}

/// Project points onto `canvas`, keeping the route's aspect ratio and
/// centering it inside the padded area. North is up (smaller `y`).
///
/// Points with non-finite or out-of-range coordinates are left out. Fewer than
/// two remaining points, or a canvas without a usable size, produce an empty
/// path. Flat axes (all points on one latitude or longitude) are widened
/// symmetrically to `min_axis_range`, so a straight line or a single repeated
/// point lands in the middle of the canvas.
pub fn normalize(points: &[GeoPoint], canvas: &Canvas) -> Vec<NormalizedPoint> {
    if !canvas.is_drawable() {
        return Vec::new();
    }
    let points: Vec<GeoPoint> = points
        .iter()
        .filter(|p| GeoPoint::is_valid(p.lat, p.lng))
        .copied()
        .collect();
    if points.len() < 2 {
        return Vec::new();
    }
    let Some(bounds) = BoundingBox::from_points(&points) else {
        return Vec::new();
    };

    let (min_lng, lng_range) = effective_axis(bounds.min_lng, bounds.lng_range(), canvas.min_axis_range);
    let (min_lat, lat_range) = effective_axis(bounds.min_lat, bounds.lat_range(), canvas.min_axis_range);
    let max_lat = min_lat + lat_range;

    let padding = canvas.padding();
    let available = canvas.size - 2.0 * padding;
    let scale = (available / lng_range).min(available / lat_range);

    let offset_x = padding + (available - lng_range * scale) / 2.0;
    let offset_y = padding + (available - lat_range * scale) / 2.0;

    points
        .iter()
        .map(|p| NormalizedPoint {
            x: offset_x + (p.lng - min_lng) * scale,
            y: offset_y + (max_lat - p.lat) * scale,
        })
        .collect()
}

fn effective_axis(min: f64, range: f64, fallback: f64) -> (f64, f64) {
    if range > 0.0 {
        (min, range)
    } else {
        (min - fallback / 2.0, fallback)
    }
}

/// SVG path data (`M x,y L x,y ...`) with two-decimal coordinates.
pub fn svg_path(points: &[NormalizedPoint]) -> Option<String> {
    let (first, rest) = points.split_first()?;
    if rest.is_empty() {
        return None;
    }
    let mut d = format!("M {:.2},{:.2}", first.x, first.y);
    for p in rest {
        d.push_str(&format!(" L {:.2},{:.2}", p.x, p.y));
    }
    Some(d)
}

/// The fixed-resolution share image and its on-screen scaled preview.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportFrame {
    pub width: f64,
    pub height: f64,
}

impl Default for ExportFrame {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ExportFrame {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            width: cfg.canvas_width,
            height: cfg.canvas_height,
        }
    }

    /// Uniform factor that fits the frame to a container width. Zero until the
    /// container has a usable width.
    pub fn preview_scale(&self, container_width: f64) -> f64 {
        if container_width.is_finite() && container_width > 0.0 && self.width > 0.0 {
            container_width / self.width
        } else {
            0.0
        }
    }

    pub fn scaled_height(&self, scale: f64) -> f64 {
        self.height * scale
    }

    /// Route drawing as it appears inside the preview at `scale`.
    pub fn preview_route(&self, points: &[GeoPoint], route_canvas: &Canvas, scale: f64) -> Vec<NormalizedPoint> {
        normalize(points, &route_canvas.scaled(scale))
    }
}
