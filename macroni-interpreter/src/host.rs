//! The adapter layer between built-ins and the desktop.
//!
//! Every side effect a script can cause goes through [`Host`]. The
//! interpreter owns argument handling and result shaping; a host only moves
//! pointers, reads pixels, and so on.

use crate::error::HostResult;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Largest search radius `check_pixel_color` scans
pub const MAX_PIXEL_RADIUS: i64 = 1024;

/// Screen position in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        let dx = other.x as f64 - self.x as f64;
        let dy = other.y as f64 - self.y as f64;
        dx.hypot(dy)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// True when every channel is within `tolerance` of `other`
    pub fn matches(&self, other: Rgb, tolerance: u8) -> bool {
        self.r.abs_diff(other.r) <= tolerance
            && self.g.abs_diff(other.g) <= tolerance
            && self.b.abs_diff(other.b) <= tolerance
    }
}

/// Search area given as origin and size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

impl Region {
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x < self.left.saturating_add(self.width)
            && point.y >= self.top
            && point.y < self.top.saturating_add(self.height)
    }

    pub fn from_bounds(bounds: Bounds) -> Self {
        Self {
            left: bounds.left,
            top: bounds.top,
            width: bounds.right.saturating_sub(bounds.left),
            height: bounds.bottom.saturating_sub(bounds.top),
        }
    }
}

/// Area given as two opposite corners, as captured interactively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl Bounds {
    /// Normalise two arbitrary corners so left <= right and top <= bottom
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            right: a.x.max(b.x),
            bottom: a.y.max(b.y),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateQuery {
    pub template_dir: PathBuf,
    pub name: String,
    pub region: Option<Region>,
    pub top_k: usize,
}

impl TemplateQuery {
    /// `<dir>/<name>.png`
    pub fn path(&self) -> PathBuf {
        self.template_dir.join(format!("{}.png", self.name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OcrQuery {
    pub region: Option<Bounds>,
    pub min_confidence: f64,
    /// Case-insensitive substrings; empty accepts everything
    pub filters: Vec<String>,
    pub upscale: f64,
}

impl OcrQuery {
    pub fn accepts(&self, text: &str, confidence: f64) -> bool {
        if confidence < self.min_confidence {
            return false;
        }
        if self.filters.is_empty() {
            return true;
        }
        let lowered = text.to_lowercase();
        self.filters
            .iter()
            .any(|filter| lowered.contains(&filter.to_lowercase()))
    }
}

impl Default for OcrQuery {
    fn default() -> Self {
        Self {
            region: None,
            min_confidence: 0.45,
            filters: Vec::new(),
            upscale: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OcrMatch {
    pub text: String,
    pub confidence: f64,
    /// Corners clockwise from top-left
    pub bbox: [Point; 4],
}

/// Side-effecting capabilities the built-ins are implemented against
pub trait Host {
    fn print(&mut self, line: &str) -> HostResult<()>;

    fn sleep(&mut self, duration: Duration) -> HostResult<()>;

    /// Wall-clock seconds since the Unix epoch
    fn epoch_seconds(&mut self) -> f64;

    /// Move the pointer to `target` at `pixels_per_second`
    fn mouse_move(&mut self, target: Point, pixels_per_second: f64, humanlike: bool)
    -> HostResult<()>;

    fn mouse_position(&mut self) -> HostResult<Point>;

    fn left_click(&mut self) -> HostResult<()>;

    fn send_input(&mut self, kind: &str, key: &str, action: &str) -> HostResult<()>;

    /// Press every key in order, wait `delay_ms`, release in reverse
    fn press_and_release(&mut self, delay_ms: u64, keys: &[String]) -> HostResult<()>;

    /// Centres of the best matches, best first, at most `top_k`
    fn find_templates(&mut self, query: &TemplateQuery) -> HostResult<Vec<Point>>;

    fn pixel_at(&mut self, point: Point) -> HostResult<Rgb>;

    /// True if any pixel within `radius` of `center` matches `color`;
    /// the radius is clamped to [`MAX_PIXEL_RADIUS`]
    fn check_pixel_color(
        &mut self,
        center: Point,
        radius: i64,
        color: Rgb,
        tolerance: u8,
    ) -> HostResult<bool> {
        let radius = radius.clamp(0, MAX_PIXEL_RADIUS);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy > radius * radius {
                    continue;
                }
                let point = Point::new(center.x.saturating_add(dx), center.y.saturating_add(dy));
                if self.pixel_at(point)?.matches(color, tolerance) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Coordinates stored under `label`, asking the user when absent or
    /// when `use_cache` is false
    fn coordinates(&mut self, label: &str, use_cache: bool) -> HostResult<Point>;

    /// Colour stored under `alias`, sampled interactively when needed
    fn pixel_color(&mut self, alias: &str, use_cache: bool) -> HostResult<Rgb>;

    fn capture_region(&mut self, key: &str, overwrite: bool) -> HostResult<Bounds>;

    fn ocr_find_text(&mut self, query: &OcrQuery) -> HostResult<Vec<OcrMatch>>;

    /// Record input under `name`; returns the number of events stored
    fn record(&mut self, name: &str, start_key: &str, stop_key: &str) -> HostResult<usize>;

    /// Replay a stored recording; returns the number of events applied
    fn playback(&mut self, name: &str, stop_key: &str) -> HostResult<usize>;

    fn recording_exists(&mut self, name: &str) -> bool;
}
