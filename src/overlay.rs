//! Overlay primitives drawn over each frame and the display sinks that
//! consume them.

use crate::error::{DrumError, DrumResult};
use crate::session::{Phase, PhaseKind, Session};
use crate::types::{HitEvent, Point, PointerEvent};
use image::{Rgb, RgbImage};
use log::{debug, info, warn};
use std::path::PathBuf;

pub const ZONE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const PREVIEW_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const STATUS_ZONES: Rgb<u8> = Rgb([0, 0, 255]);
pub const STATUS_COLORS: Rgb<u8> = Rgb([255, 0, 0]);
pub const STATUS_PLAYING: Rgb<u8> = Rgb([0, 255, 0]);

/// Pixel scale of the 3×5 font.
const FONT_SCALE: i32 = 2;
const STATUS_AT: Point = Point { x: 10, y: 10 };

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle {
        center: Point,
        radius: u32,
        color: Rgb<u8>,
        thickness: u32,
    },
    Text {
        at: Point,
        text: String,
        color: Rgb<u8>,
    },
}

/// Everything drawn over one frame, plus the state a text display needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub shapes: Vec<Shape>,
    pub status: String,
    pub status_color: Rgb<u8>,
    pub phase: PhaseKind,
    pub frame_index: u64,
    /// Hits detected on this frame
    pub hits: Vec<HitEvent>,
}

impl Overlay {
    /// Zones in green with their names, the drag preview in blue, and the
    /// status line colored by phase. Zones currently struck are drawn thicker.
    pub fn build(session: &Session, hits: &[HitEvent]) -> Self {
        let active = |i: usize| match session.phase() {
            Phase::Playing(p) => p.detector().is_active(i),
            _ => false,
        };

        let mut shapes = Vec::new();
        for (i, zone) in session.zones().iter().enumerate() {
            shapes.push(Shape::Circle {
                center: zone.center,
                radius: zone.radius,
                color: ZONE_COLOR,
                thickness: if active(i) { 4 } else { 2 },
            });
            shapes.push(Shape::Text {
                at: Point::new(
                    zone.center.x - text_width(&zone.name) / 2,
                    zone.center.y - 5 * FONT_SCALE / 2,
                ),
                text: zone.name.clone(),
                color: ZONE_COLOR,
            });
        }
        if let Some((center, radius)) = session.preview() {
            shapes.push(Shape::Circle {
                center,
                radius,
                color: PREVIEW_COLOR,
                thickness: 2,
            });
        }

        let phase = session.kind();
        let status = session.status_text();
        let status_color = match phase {
            PhaseKind::Zones => STATUS_ZONES,
            PhaseKind::Colors => STATUS_COLORS,
            PhaseKind::Playing => STATUS_PLAYING,
        };
        shapes.push(Shape::Text {
            at: STATUS_AT,
            text: status.clone(),
            color: status_color,
        });

        Self {
            shapes,
            status,
            status_color,
            phase,
            // The session has already counted the frame
            frame_index: session.frames_processed().saturating_sub(1),
            hits: hits.to_vec(),
        }
    }
}

// ─── Rasterizing ────────────────────────────────────────────────────────────

/// Draw every shape into `frame`. Anything off-frame is clipped.
pub fn rasterize(frame: &mut RgbImage, overlay: &Overlay) {
    for shape in &overlay.shapes {
        match shape {
            Shape::Circle {
                center,
                radius,
                color,
                thickness,
            } => draw_ring(frame, *center, *radius, *thickness, *color),
            Shape::Text { at, text, color } => draw_text(frame, *at, text, *color),
        }
    }
}

/// Ring of `thickness` pixels straddling the circle of `radius`.
/// Only the part of the ring's bounding box inside the frame is scanned.
fn draw_ring(frame: &mut RgbImage, c: Point, radius: u32, thickness: u32, color: Rgb<u8>) {
    let (w, h) = frame.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let half = thickness as f64 / 2.0;
    let outer = radius as f64 + half;
    let inner = (radius as f64 - half).max(0.0);
    let (outer_sq, inner_sq) = (outer * outer, inner * inner);

    let reach = outer.ceil() as i64;
    let (cx, cy) = (c.x as i64, c.y as i64);
    let x0 = (cx - reach).max(0);
    let x1 = (cx + reach).min(w as i64 - 1);
    let y0 = (cy - reach).max(0);
    let y1 = (cy + reach).min(h as i64 - 1);

    for y in y0..=y1 {
        let dy = (y - cy) as i128;
        for x in x0..=x1 {
            let dx = (x - cx) as i128;
            let d_sq = (dx * dx + dy * dy) as f64;
            if d_sq >= inner_sq && d_sq <= outer_sq {
                frame.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

fn draw_text(frame: &mut RgbImage, at: Point, text: &str, color: Rgb<u8>) {
    let mut cx = at.x;
    for ch in text.chars() {
        let glyph = char_glyph(ch);
        for (row, &bits) in glyph.iter().enumerate() {
            for col in 0..3 {
                if bits & (1 << (2 - col)) == 0 {
                    continue;
                }
                for sy in 0..FONT_SCALE {
                    for sx in 0..FONT_SCALE {
                        set_pixel(
                            frame,
                            cx + col * FONT_SCALE + sx,
                            at.y + row as i32 * FONT_SCALE + sy,
                            color,
                        );
                    }
                }
            }
        }
        cx += 4 * FONT_SCALE; // 3 wide + 1 gap
    }
}

fn text_width(text: &str) -> i32 {
    text.chars().count() as i32 * 4 * FONT_SCALE
}

fn set_pixel(frame: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < frame.width() && (y as u32) < frame.height() {
        frame.put_pixel(x as u32, y as u32, color);
    }
}

// Minimal 3×5 bitmap font. Unknown characters render as blanks.
fn char_glyph(c: char) -> [u8; 5] {
    match c.to_ascii_lowercase() {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'o' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'w' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        _ => [0; 5],
    }
}

// ─── Display sinks ──────────────────────────────────────────────────────────

/// Where annotated frames go. Write-only, apart from the user input a
/// window can report back.
pub trait DisplaySink {
    /// Present one frame. `frame` is the raw camera image; sinks that show
    /// pixels call `rasterize` on their own copy.
    fn show(&mut self, frame: &RgbImage, overlay: &Overlay);

    /// Pointer events since the last poll.
    fn poll_events(&mut self) -> Vec<PointerEvent> {
        Vec::new()
    }

    /// The user asked to stop (closed the window, pressed q).
    fn quit_requested(&self) -> bool {
        false
    }

    fn close(&mut self) {}
}

/// Writes every `every`-th annotated frame as `frame_<index>.png`.
pub struct SnapshotSink {
    dir: PathBuf,
    every: u64,
    written: u64,
}

impl SnapshotSink {
    pub fn new(dir: impl Into<PathBuf>, every: u64) -> DrumResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| DrumError::Io {
            path: dir.clone(),
            source,
        })?;
        info!("Snapshots every {} frames → {:?}", every.max(1), dir);
        Ok(Self {
            dir,
            every: every.max(1),
            written: 0,
        })
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl DisplaySink for SnapshotSink {
    fn show(&mut self, frame: &RgbImage, overlay: &Overlay) {
        if overlay.frame_index % self.every != 0 {
            return;
        }
        let mut annotated = frame.clone();
        rasterize(&mut annotated, overlay);
        let path = self.dir.join(format!("frame_{:06}.png", overlay.frame_index));
        match annotated.save(&path) {
            Ok(()) => {
                self.written += 1;
                debug!("Snapshot {:?}", path);
            }
            Err(e) => warn!("Snapshot {:?} failed: {}", path, e),
        }
    }

    fn close(&mut self) {
        info!("Snapshots: {} written to {:?}", self.written, self.dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PointerEvent;

    fn blank() -> RgbImage {
        RgbImage::new(200, 150)
    }

    fn names() -> Vec<String> {
        vec!["snare".into(), "hi_hat".into()]
    }

    #[test]
    fn test_status_color_follows_phase() {
        let frame = blank();
        let mut s = Session::new(names(), 200, 150);
        let o = Overlay::build(&s, &[]);
        assert_eq!(o.status, "Select: snare");
        assert_eq!(o.status_color, STATUS_ZONES);

        for (cx, rx) in [(50, 70), (150, 170)] {
            s.handle_pointer(PointerEvent::Down(Point::new(cx, 60)), &frame);
            s.handle_pointer(PointerEvent::Move(Point::new(rx, 60)), &frame);
            s.handle_pointer(PointerEvent::Up(Point::new(rx, 60)), &frame);
        }
        let o = Overlay::build(&s, &[]);
        assert_eq!(o.status_color, STATUS_COLORS);
        assert_eq!(o.phase, PhaseKind::Colors);
    }

    #[test]
    fn test_zones_and_preview_become_shapes() {
        let frame = blank();
        let mut s = Session::new(names(), 200, 150);
        s.handle_pointer(PointerEvent::Down(Point::new(50, 60)), &frame);
        s.handle_pointer(PointerEvent::Move(Point::new(70, 60)), &frame);
        s.handle_pointer(PointerEvent::Up(Point::new(70, 60)), &frame);
        s.handle_pointer(PointerEvent::Down(Point::new(150, 60)), &frame);
        s.handle_pointer(PointerEvent::Move(Point::new(160, 60)), &frame);

        let o = Overlay::build(&s, &[]);
        let circles: Vec<_> = o
            .shapes
            .iter()
            .filter_map(|sh| match sh {
                Shape::Circle { radius, color, .. } => Some((*radius, *color)),
                _ => None,
            })
            .collect();
        assert_eq!(circles, vec![(20, ZONE_COLOR), (10, PREVIEW_COLOR)]);
        assert!(o
            .shapes
            .iter()
            .any(|sh| matches!(sh, Shape::Text { text, .. } if text == "snare")));
    }

    #[test]
    fn test_rasterize_ring_and_text() {
        let mut frame = blank();
        let overlay = Overlay {
            shapes: vec![
                Shape::Circle {
                    center: Point::new(100, 75),
                    radius: 30,
                    color: ZONE_COLOR,
                    thickness: 2,
                },
                Shape::Text {
                    at: Point::new(0, 0),
                    text: "1".into(),
                    color: STATUS_COLORS,
                },
            ],
            status: String::new(),
            status_color: STATUS_COLORS,
            phase: PhaseKind::Zones,
            frame_index: 0,
            hits: Vec::new(),
        };
        rasterize(&mut frame, &overlay);

        assert_eq!(*frame.get_pixel(130, 75), ZONE_COLOR);
        assert_eq!(*frame.get_pixel(100, 75), Rgb([0, 0, 0]));
        // Top row of '1' is the middle column only
        assert_eq!(*frame.get_pixel(2, 0), STATUS_COLORS);
        assert_eq!(*frame.get_pixel(0, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_clipped_shapes_do_not_panic() {
        let mut frame = RgbImage::new(10, 10);
        draw_ring(&mut frame, Point::new(-5, -5), 40, 3, ZONE_COLOR);
        draw_text(&mut frame, Point::new(8, 8), "crash_cymbal", ZONE_COLOR);
    }

    #[test]
    fn test_huge_ring_only_touches_frame_pixels() {
        let mut frame = RgbImage::new(32, 24);
        // Circle through the frame: centered far left, passing x = 10
        draw_ring(&mut frame, Point::new(-5990, 12), 6000, 2, ZONE_COLOR);
        assert_eq!(*frame.get_pixel(10, 12), ZONE_COLOR);
        assert_eq!(*frame.get_pixel(20, 12), Rgb([0, 0, 0]));
        assert_eq!(*frame.get_pixel(0, 12), Rgb([0, 0, 0]));

        // A ring enclosing the whole frame draws nothing
        let mut frame = RgbImage::new(32, 24);
        draw_ring(&mut frame, Point::new(16, 12), 6000, 4, ZONE_COLOR);
        assert!(frame.pixels().all(|p| *p == Rgb([0, 0, 0])));

        // Extreme center and radius stay in range
        draw_ring(&mut frame, Point::new(i32::MIN, i32::MAX), u32::MAX, 4, ZONE_COLOR);
        assert!(frame.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_snapshot_every_nth_frame() {
        let dir = std::env::temp_dir().join(format!("stick-drums-snap-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let mut sink = SnapshotSink::new(&dir, 2).unwrap();
        let s = Session::new(names(), 20, 20);
        let frame = RgbImage::new(20, 20);
        for i in 0..5 {
            let mut o = Overlay::build(&s, &[]);
            o.frame_index = i;
            sink.show(&frame, &o);
        }
        assert_eq!(sink.written(), 3);
        assert!(dir.join("frame_000004.png").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
