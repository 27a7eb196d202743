//! HSV conversion and per-stick color windows.

use crate::types::{HUE_MAX, HUE_TOLERANCE, SV_LOWER_TOLERANCE, SV_UPPER_TOLERANCE};
use image::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 8-bit HSV triple. Hue is in half-degrees (0–179), saturation and value
/// are 0–255, matching the common computer-vision convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }
}

impl fmt::Display for Hsv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.h, self.s, self.v)
    }
}

/// Convert an RGB pixel to 8-bit HSV.
#[inline]
pub fn rgb_to_hsv(px: Rgb<u8>) -> Hsv {
    let [r, g, b] = px.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = (max - min) as f32;

    let v = max;
    let s = if max == 0 {
        0
    } else {
        (delta * 255.0 / max as f32).round() as u8
    };

    let h = if delta == 0.0 {
        0.0
    } else {
        let (r, g, b) = (r as f32, g as f32, b as f32);
        let deg = if max as f32 == r {
            60.0 * (g - b) / delta
        } else if max as f32 == g {
            120.0 + 60.0 * (b - r) / delta
        } else {
            240.0 + 60.0 * (r - g) / delta
        };
        if deg < 0.0 {
            deg + 360.0
        } else {
            deg
        }
    };
    // 360° maps back onto 0 after halving and rounding
    let h = ((h / 2.0).round() as u16 % (HUE_MAX as u16 + 1)) as u8;

    Hsv { h, s, v }
}

/// Inclusive HSV window a stick's color must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl ColorRange {
    /// Window around a single sampled pixel.
    ///
    /// Hue gets ±20; saturation and value get -100 below and +255 above, so
    /// the upper S/V bound always ends up at 255. Hue does not wrap around
    /// red: a sample at hue 5 yields a lower bound of 0, not 165.
    pub fn from_sample(sample: Hsv) -> Self {
        let lower = Hsv {
            h: sample.h.saturating_sub(HUE_TOLERANCE),
            s: sample.s.saturating_sub(SV_LOWER_TOLERANCE),
            v: sample.v.saturating_sub(SV_LOWER_TOLERANCE),
        };
        let upper = Hsv {
            h: sample.h.saturating_add(HUE_TOLERANCE).min(HUE_MAX),
            s: (sample.s as u16 + SV_UPPER_TOLERANCE).min(255) as u8,
            v: (sample.v as u16 + SV_UPPER_TOLERANCE).min(255) as u8,
        };
        Self { lower, upper }
    }

    #[inline]
    pub fn contains(&self, px: Hsv) -> bool {
        (self.lower.h..=self.upper.h).contains(&px.h)
            && (self.lower.s..=self.upper.s).contains(&px.s)
            && (self.lower.v..=self.upper.v).contains(&px.v)
    }
}

impl fmt::Display for ColorRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.lower, self.upper)
    }
}
