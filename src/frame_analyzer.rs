use crate::color::{rgb_to_hsv, ColorRange, Hsv};
use crate::types::OPENING_KERNEL;
use image::{GrayImage, RgbImage};
use log::trace;

/// Per-stick binary color masks for one frame.
#[derive(Debug, Clone)]
pub struct StickMasks {
    pub left: GrayImage,
    pub right: GrayImage,
}

/// Turns a frame into per-stick color-presence masks.
///
/// # Pipeline
///
/// 1. RGB → HSV per pixel (once, shared by both sticks)
/// 2. Inclusive per-channel threshold against each stick's `ColorRange`
/// 3. Morphological opening with a square structuring element: erosion
///    removes specks smaller than the kernel, dilation restores the blobs
///    that survived
///
/// Opening is the only noise rejection. There is no temporal smoothing;
/// the hit detector's hysteresis absorbs frame-to-frame flicker.
///
/// Neighbors outside the frame are skipped in both passes, so a blob
/// touching the border is neither eroded nor grown by the border itself.
pub struct FrameAnalyzer {
    kernel: u32,
}

impl FrameAnalyzer {
    pub fn new() -> Self {
        Self {
            kernel: OPENING_KERNEL,
        }
    }

    /// Compute both stick masks. Returns `None` unless both colors are set.
    pub fn analyze(
        &self,
        frame: &RgbImage,
        left: Option<&ColorRange>,
        right: Option<&ColorRange>,
    ) -> Option<StickMasks> {
        let (left, right) = (left?, right?);
        let (w, h) = frame.dimensions();

        let hsv: Vec<Hsv> = frame.pixels().map(|px| rgb_to_hsv(*px)).collect();
        let left = self.open(&threshold(&hsv, w, h, left));
        let right = self.open(&threshold(&hsv, w, h, right));

        trace!(
            "Masks: left={} px  right={} px",
            count_set(&left),
            count_set(&right)
        );
        Some(StickMasks { left, right })
    }

    /// Erosion followed by dilation.
    pub fn open(&self, mask: &GrayImage) -> GrayImage {
        let radius = self.kernel / 2;
        let eroded = morph(mask, radius, Morph::Erode);
        morph(&eroded, radius, Morph::Dilate)
    }
}

impl Default for FrameAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn threshold(hsv: &[Hsv], w: u32, h: u32, range: &ColorRange) -> GrayImage {
    let data = hsv
        .iter()
        .map(|&px| if range.contains(px) { 255 } else { 0 })
        .collect();
    // Length is w*h by construction
    GrayImage::from_raw(w, h, data).unwrap_or_else(|| GrayImage::new(w, h))
}

/// Number of set pixels in a mask.
pub fn count_set(mask: &GrayImage) -> u32 {
    mask.as_raw().iter().filter(|&&v| v != 0).count() as u32
}

#[derive(Clone, Copy)]
enum Morph {
    Erode,
    Dilate,
}

/// Square min/max filter, split into a horizontal and a vertical pass.
/// A rectangular structuring element makes the split exact.
fn morph(mask: &GrayImage, radius: u32, op: Morph) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    let (w, h) = mask.dimensions();
    let (w, h, r) = (w as usize, h as usize, radius as usize);
    let src = mask.as_raw();

    let combine = |window: &mut dyn Iterator<Item = u8>| match op {
        Morph::Erode => window.min().unwrap_or(0),
        Morph::Dilate => window.max().unwrap_or(0),
    };

    let mut horiz = vec![0u8; w * h];
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        for x in 0..w {
            let lo = x.saturating_sub(r);
            let hi = (x + r + 1).min(w);
            horiz[y * w + x] = combine(&mut row[lo..hi].iter().copied());
        }
    }

    let mut out = vec![0u8; w * h];
    for y in 0..h {
        let lo = y.saturating_sub(r);
        let hi = (y + r + 1).min(h);
        for x in 0..w {
            out[y * w + x] = combine(&mut (lo..hi).map(|yy| horiz[yy * w + x]));
        }
    }

    GrayImage::from_raw(w as u32, h as u32, out).unwrap_or_else(|| GrayImage::new(w as u32, h as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::MASK_ON;
    use image::Rgb;

    const ORANGE: Rgb<u8> = Rgb([255, 128, 0]);
    const CYAN: Rgb<u8> = Rgb([0, 200, 255]);
    const GREY: Rgb<u8> = Rgb([60, 60, 60]);

    fn fill(frame: &mut RgbImage, x0: u32, y0: u32, size: u32, px: Rgb<u8>) {
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                frame.put_pixel(x, y, px);
            }
        }
    }

    fn ranges() -> (ColorRange, ColorRange) {
        (
            ColorRange::from_sample(rgb_to_hsv(ORANGE)),
            ColorRange::from_sample(rgb_to_hsv(CYAN)),
        )
    }

    #[test]
    fn test_no_masks_without_both_colors() {
        let frame = RgbImage::from_pixel(10, 10, GREY);
        let (l, r) = ranges();
        let fa = FrameAnalyzer::new();
        assert!(fa.analyze(&frame, None, None).is_none());
        assert!(fa.analyze(&frame, Some(&l), None).is_none());
        assert!(fa.analyze(&frame, None, Some(&r)).is_none());
        assert!(fa.analyze(&frame, Some(&l), Some(&r)).is_some());
    }

    #[test]
    fn test_masks_separate_sticks() {
        let mut frame = RgbImage::from_pixel(40, 30, GREY);
        fill(&mut frame, 5, 5, 8, ORANGE);
        fill(&mut frame, 25, 15, 6, CYAN);
        let (l, r) = ranges();

        let masks = FrameAnalyzer::new().analyze(&frame, Some(&l), Some(&r)).unwrap();
        assert_eq!(count_set(&masks.left), 64);
        assert_eq!(count_set(&masks.right), 36);
        assert_eq!(masks.left.get_pixel(8, 8)[0], 255);
        assert_eq!(masks.left.get_pixel(27, 17)[0], 0);
        assert_eq!(masks.right.get_pixel(27, 17)[0], 255);
    }

    #[test]
    fn test_opening_removes_specks() {
        let mut frame = RgbImage::from_pixel(40, 30, GREY);
        // 4x4 is smaller than the 5x5 kernel and must vanish
        fill(&mut frame, 5, 5, 4, ORANGE);
        // Lone pixel
        frame.put_pixel(30, 20, ORANGE);
        let (l, r) = ranges();

        let masks = FrameAnalyzer::new().analyze(&frame, Some(&l), Some(&r)).unwrap();
        assert_eq!(count_set(&masks.left), 0);
    }

    #[test]
    fn test_opening_keeps_solid_blob() {
        let mut mask = GrayImage::new(20, 20);
        for y in 6..11 {
            for x in 6..11 {
                mask.put_pixel(x, y, MASK_ON);
            }
        }
        let opened = FrameAnalyzer::new().open(&mask);
        assert_eq!(opened, mask);
    }

    #[test]
    fn test_opening_at_border_ignores_outside() {
        // A 5x5 block in the corner survives: the out-of-frame half of the
        // kernel does not count against it.
        let mut mask = GrayImage::new(12, 12);
        for y in 0..5 {
            for x in 0..5 {
                mask.put_pixel(x, y, MASK_ON);
            }
        }
        let opened = FrameAnalyzer::new().open(&mask);
        assert_eq!(opened, mask);
    }
}
