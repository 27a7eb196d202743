//! Circular drum zones and their occupancy thresholds.

use crate::types::{Point, Rect, HIT_FRACTION, RELEASE_FRACTION};
use image::{GrayImage, Luma};
use std::f64::consts::PI;

/// Mask value for pixels inside a zone or a stick mask.
pub const MASK_ON: Luma<u8> = Luma([255]);

/// A named circular region of the frame tied to one drum sound.
///
/// Geometry is fixed at construction: the mask and bounding box are
/// computed once and never change.
#[derive(Debug, Clone)]
pub struct Zone {
    pub name: String,
    pub center: Point,
    pub radius: u32,
    /// Closed disk of `radius` around `center`, frame-sized
    mask: GrayImage,
    /// Frame-clipped bounding box of the disk
    bounds: Rect,
    area: f64,
}

impl Zone {
    pub fn new(name: impl Into<String>, center: Point, radius: u32, width: u32, height: u32) -> Self {
        let bounds = disk_bounds(center, radius, width, height);
        let mut mask = GrayImage::new(width, height);
        for y in bounds.y0..bounds.y1 {
            for x in bounds.x0..bounds.x1 {
                if in_disk(center, radius, x, y) {
                    mask.put_pixel(x, y, MASK_ON);
                }
            }
        }

        Self {
            name: name.into(),
            center,
            radius,
            mask,
            bounds,
            area: PI * (radius as f64) * (radius as f64),
        }
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    /// Pixel count a stick must exceed to strike this zone.
    pub fn hit_threshold(&self) -> f64 {
        self.area * HIT_FRACTION
    }

    /// Pixel count both sticks must fall below to release this zone.
    pub fn release_threshold(&self) -> f64 {
        self.area * RELEASE_FRACTION
    }

    /// Zero-radius zones have no area and never fire.
    pub fn is_degenerate(&self) -> bool {
        self.radius == 0
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Whether pixel `(x, y)` lies inside the zone mask.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.mask.width() && y < self.mask.height() && self.mask.get_pixel(x, y)[0] != 0
    }

    /// Number of set pixels of `stick_mask` that fall inside this zone.
    /// Only the zone's bounding box is scanned.
    pub fn count_overlap(&self, stick_mask: &GrayImage) -> u32 {
        debug_assert_eq!(stick_mask.dimensions(), self.mask.dimensions());
        let mut count = 0u32;
        for y in self.bounds.y0..self.bounds.y1 {
            for x in self.bounds.x0..self.bounds.x1 {
                if self.mask.get_pixel(x, y)[0] != 0 && stick_mask.get_pixel(x, y)[0] != 0 {
                    count += 1;
                }
            }
        }
        count
    }
}

#[inline]
fn in_disk(center: Point, radius: u32, x: u32, y: u32) -> bool {
    let dx = x as i128 - center.x as i128;
    let dy = y as i128 - center.y as i128;
    let r = radius as i128;
    dx * dx + dy * dy <= r * r
}

fn disk_bounds(center: Point, radius: u32, width: u32, height: u32) -> Rect {
    let r = radius as i64;
    let clip = |v: i64, max: u32| v.clamp(0, max as i64) as u32;
    Rect {
        x0: clip(center.x as i64 - r, width),
        y0: clip(center.y as i64 - r, height),
        x1: clip(center.x as i64 + r + 1, width),
        y1: clip(center.y as i64 + r + 1, height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_is_closed_disk() {
        let c = Point::new(20, 15);
        let zone = Zone::new("snare", c, 7, 40, 30);
        for y in 0..30 {
            for x in 0..40 {
                let inside = Point::new(x as i32, y as i32).distance(c) <= 7.0;
                assert_eq!(zone.contains(x, y), inside, "pixel ({}, {})", x, y);
            }
        }
        // Boundary at exactly the radius is included
        assert!(zone.contains(27, 15));
        assert!(zone.contains(20, 8));
        assert!(!zone.contains(28, 15));
    }

    #[test]
    fn test_zone_clipped_at_frame_edge() {
        let zone = Zone::new("hi_hat", Point::new(2, 2), 5, 20, 20);
        assert_eq!(zone.bounds(), Rect { x0: 0, y0: 0, x1: 8, y1: 8 });
        assert!(zone.contains(0, 0));
    }

    #[test]
    fn test_zone_outside_frame_is_empty() {
        let zone = Zone::new("crash_cymbal", Point::new(-50, 10), 5, 20, 20);
        assert!(zone.bounds().is_empty());
        let full = GrayImage::from_pixel(20, 20, MASK_ON);
        assert_eq!(zone.count_overlap(&full), 0);
    }

    #[test]
    fn test_thresholds_follow_area() {
        let zone = Zone::new("snare", Point::new(50, 50), 10, 100, 100);
        let area = PI * 100.0;
        assert!((zone.area() - area).abs() < 1e-9);
        assert!((zone.hit_threshold() - area * 0.05).abs() < 1e-9);
        assert!((zone.release_threshold() - area * 0.025).abs() < 1e-9);
    }

    #[test]
    fn test_zero_radius_is_degenerate() {
        let zone = Zone::new("snare", Point::new(5, 5), 0, 10, 10);
        assert!(zone.is_degenerate());
        assert_eq!(zone.area(), 0.0);
        assert!(zone.contains(5, 5));
    }

    #[test]
    fn test_huge_radius_covers_frame() {
        let zone = Zone::new("ride_cymbal", Point::new(i32::MIN, i32::MIN), u32::MAX, 20, 20);
        // Corner distance is about 3.04e9, inside a radius of 4.29e9
        assert_eq!(zone.bounds(), Rect { x0: 0, y0: 0, x1: 20, y1: 20 });
        assert!(zone.contains(0, 0));
        assert!(zone.contains(19, 19));

        let far = Zone::new("ride_cymbal", Point::new(i32::MAX, i32::MAX), 3_000_000_000, 20, 20);
        assert!(!far.contains(0, 0));
    }

    #[test]
    fn test_count_overlap_intersection() {
        let zone = Zone::new("floor_tom", Point::new(10, 10), 3, 20, 20);
        let mut stick = GrayImage::new(20, 20);
        // Row through the center: x = 7..=13 is inside, 14..16 outside
        for x in 7..17 {
            stick.put_pixel(x, 10, MASK_ON);
        }
        assert_eq!(zone.count_overlap(&stick), 7);
    }
}
