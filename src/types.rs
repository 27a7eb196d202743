use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

// ─── Geometry ───────────────────────────────────────────────────────────────

/// Integer pixel coordinate in frame space. May lie outside the frame
/// (pointer drags can leave the image).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`. Exact for any pair of i32 points.
    pub fn distance(&self, other: Point) -> f64 {
        let dx = (self.x as i64 - other.x as i64) as f64;
        let dy = (self.y as i64 - other.y as i64) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned pixel rectangle, half-open: `[x0, x1) × [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl Rect {
    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }
}

// ─── Pointer input ──────────────────────────────────────────────────────────

/// Discrete pointer event in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up(Point),
}

// ─── Sticks ─────────────────────────────────────────────────────────────────

/// Which drumstick a tracked color belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StickSide {
    Left,
    Right,
}

impl fmt::Display for StickSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StickSide::Left => write!(f, "left"),
            StickSide::Right => write!(f, "right"),
        }
    }
}

// ─── Hits ───────────────────────────────────────────────────────────────────

/// A tracked color just entered a zone it was not previously in.
/// Produced by the hit detector, consumed by the voice dispatcher and the
/// optional hit log / OSC outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitEvent {
    /// Index into the session's zone list (kit order)
    pub zone_index: usize,
    pub drum: String,
    /// Frames processed since session start
    pub frame_index: u64,
    /// Microseconds since session start
    pub timestamp_us: u64,
}

impl fmt::Display for HitEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>10}µs  frame={:<6} hit {} (zone {})",
            self.timestamp_us, self.frame_index, self.drum, self.zone_index
        )
    }
}

// ─── Session clock ──────────────────────────────────────────────────────────

/// Monotonic clock for the playing session.
#[derive(Clone)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Constants ──────────────────────────────────────────────────────────────

/// Fraction of a zone's area a stick mask must exceed to register a hit.
pub const HIT_FRACTION: f64 = 0.05;
/// Fraction of a zone's area both stick masks must fall below to release.
pub const RELEASE_FRACTION: f64 = 0.025;

/// Side length of the square structuring element used to denoise masks.
pub const OPENING_KERNEL: u32 = 5;

/// Hue tolerance around a sampled stick color (OpenCV hue units).
pub const HUE_TOLERANCE: u8 = 20;
/// Saturation/value tolerance below a sampled stick color.
pub const SV_LOWER_TOLERANCE: u8 = 100;
/// Saturation/value widening above a sampled stick color. Wider than the
/// lower tolerance, so the upper bound always clamps to 255.
pub const SV_UPPER_TOLERANCE: u16 = 255;
/// Largest hue value in the 0–179 convention.
pub const HUE_MAX: u8 = 179;

/// Number of playback voices in the default pool.
pub const DEFAULT_VOICE_COUNT: usize = 8;
