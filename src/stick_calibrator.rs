//! Stick color setup: the first click samples the left stick's color, the
//! second the right stick's. Later clicks are ignored.

use crate::color::{rgb_to_hsv, ColorRange, Hsv};
use crate::types::{Point, StickSide};
use image::RgbImage;
use log::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct StickCalibrator {
    left: Option<ColorRange>,
    right: Option<ColorRange>,
}

/// Both calibrated stick colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StickColors {
    pub left: ColorRange,
    pub right: ColorRange,
}

impl StickCalibrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn left(&self) -> Option<&ColorRange> {
        self.left.as_ref()
    }

    pub fn right(&self) -> Option<&ColorRange> {
        self.right.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    pub fn colors(&self) -> Option<StickColors> {
        Some(StickColors {
            left: self.left?,
            right: self.right?,
        })
    }

    /// Sample the clicked pixel of `frame` and fill the next free slot.
    /// Returns the slot that was filled, or `None` if the click was ignored.
    pub fn click(&mut self, frame: &RgbImage, at: Point) -> Option<StickSide> {
        if self.is_complete() {
            debug!("Stick colors already set; ignoring click at {}", at);
            return None;
        }
        let Some(sample) = sample_hsv(frame, at) else {
            debug!("Click at {} is outside the frame", at);
            return None;
        };

        let range = ColorRange::from_sample(sample);
        let side = if self.left.is_none() {
            self.left = Some(range);
            StickSide::Left
        } else {
            self.right = Some(range);
            StickSide::Right
        };
        info!("{} stick color: sample {} → {}", side, sample, range);
        Some(side)
    }
}

/// HSV value of the pixel at `at`, if it lies inside the frame.
pub fn sample_hsv(frame: &RgbImage, at: Point) -> Option<Hsv> {
    let x = u32::try_from(at.x).ok()?;
    let y = u32::try_from(at.y).ok()?;
    frame.get_pixel_checked(x, y).map(|px| rgb_to_hsv(*px))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn two_tone_frame() -> RgbImage {
        let mut frame = RgbImage::from_pixel(20, 10, Rgb([0, 0, 255]));
        for y in 0..10 {
            for x in 10..20 {
                frame.put_pixel(x, y, Rgb([255, 0, 0]));
            }
        }
        frame
    }

    #[test]
    fn test_first_click_left_then_right() {
        let frame = two_tone_frame();
        let mut cal = StickCalibrator::new();
        assert!(cal.colors().is_none());

        assert_eq!(cal.click(&frame, Point::new(2, 2)), Some(StickSide::Left));
        assert!(!cal.is_complete());
        assert_eq!(cal.click(&frame, Point::new(15, 5)), Some(StickSide::Right));
        assert!(cal.is_complete());

        let colors = cal.colors().unwrap();
        assert_eq!(colors.left, ColorRange::from_sample(Hsv::new(120, 255, 255)));
        assert_eq!(colors.right, ColorRange::from_sample(Hsv::new(0, 255, 255)));
    }

    #[test]
    fn test_clicks_after_both_set_are_ignored() {
        let frame = two_tone_frame();
        let mut cal = StickCalibrator::new();
        cal.click(&frame, Point::new(2, 2));
        cal.click(&frame, Point::new(15, 5));
        let before = cal.colors();
        assert_eq!(cal.click(&frame, Point::new(2, 2)), None);
        assert_eq!(cal.colors(), before);
    }

    #[test]
    fn test_click_outside_frame_is_ignored() {
        let frame = two_tone_frame();
        let mut cal = StickCalibrator::new();
        assert_eq!(cal.click(&frame, Point::new(-1, 3)), None);
        assert_eq!(cal.click(&frame, Point::new(20, 3)), None);
        assert!(cal.left().is_none());
    }
}
