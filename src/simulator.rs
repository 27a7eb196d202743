use crate::frame_source::FrameSource;
use crate::pointer_script::{PointerKind, PointerScript, ScriptedPointer};
use crate::types::{Point, StickSide};
use image::{Rgb, RgbImage};
use log::{debug, info};

/// Left stick tip color (orange).
pub const LEFT_TIP: Rgb<u8> = Rgb([255, 128, 0]);
/// Right stick tip color (cyan).
pub const RIGHT_TIP: Rgb<u8> = Rgb([0, 200, 255]);

const BACKDROP: Rgb<u8> = Rgb([30, 30, 30]);
const DRUM_HEAD: Rgb<u8> = Rgb([90, 90, 90]);
const DRUM_RIM: Rgb<u8> = Rgb([140, 140, 140]);

/// Frames a stick spends on the drum head per strike.
const STRIKE_CONTACT_FRAMES: u32 = 3;
/// Frames back at rest after each strike.
const STRIKE_RECOVER_FRAMES: u32 = 5;

/// Synthetic camera: a drum kit seen from above with two colored stick
/// tips playing a scripted pattern. Exercises the whole pipeline without
/// a camera, including calibration via `calibration_script`.
///
/// Drum heads and backdrop are grey (zero saturation) so they never match
/// a stick color. Each frame also carries a few single-pixel specks of the
/// left stick's color that the mask opening must reject.
pub struct Simulator {
    width: u32,
    height: u32,
    drums: Vec<SimDrum>,
    gestures: Vec<Gesture>,
    gesture_idx: usize,
    frame_in_gesture: u32,
    repeat: bool,
    frames_emitted: u64,
    /// LCG state for speck placement (deterministic across runs)
    noise: u32,
}

/// Where the simulator draws one drum head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimDrum {
    pub center: Point,
    pub radius: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Both sticks at rest.
    Rest { frames: u32 },
    /// Each stick given a drum strikes it once, then returns to rest.
    Strike {
        left: Option<usize>,
        right: Option<usize>,
    },
    /// One stick held on a drum for a long time (must still count once).
    Linger {
        stick: StickSide,
        drum: usize,
        frames: u32,
    },
}

impl Gesture {
    fn frames(&self) -> u32 {
        match *self {
            Gesture::Rest { frames } | Gesture::Linger { frames, .. } => frames,
            Gesture::Strike { .. } => STRIKE_CONTACT_FRAMES + STRIKE_RECOVER_FRAMES,
        }
    }

    /// Hits this gesture should produce.
    fn hits(&self) -> usize {
        match *self {
            Gesture::Rest { .. } => 0,
            Gesture::Strike { left, right } => left.is_some() as usize + right.is_some() as usize,
            Gesture::Linger { .. } => 1,
        }
    }
}

impl Simulator {
    /// Lay out `drum_count` drums on a `width`×`height` frame: two rows in
    /// the upper two thirds, sticks resting along the bottom.
    pub fn new(width: u32, height: u32, drum_count: usize) -> Self {
        let drums = layout(width, height, drum_count);
        let gestures = demo_sequence(drum_count);
        Self {
            width,
            height,
            drums,
            gestures,
            gesture_idx: 0,
            frame_in_gesture: 0,
            repeat: false,
            frames_emitted: 0,
            noise: 0x2545_f491,
        }
    }

    /// Loop the playing part of the demo forever instead of ending the stream.
    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn drums(&self) -> &[SimDrum] {
        &self.drums
    }

    pub fn rest_position(&self, stick: StickSide) -> Point {
        let y = self.height as i32 - self.tip_half() as i32 - 4;
        match stick {
            StickSide::Left => Point::new(self.width as i32 / 4, y),
            StickSide::Right => Point::new(3 * self.width as i32 / 4, y),
        }
    }

    /// Hits one pass of the demo should produce once calibrated.
    pub fn expected_hits(&self) -> usize {
        self.gestures.iter().map(Gesture::hits).sum()
    }

    /// Frames of the opening rest, during which calibration happens.
    pub fn setup_frames(&self) -> u64 {
        match self.gestures.first() {
            Some(Gesture::Rest { frames }) => *frames as u64,
            _ => 0,
        }
    }

    /// Total frames in one pass of the demo.
    pub fn total_frames(&self) -> u64 {
        self.gestures.iter().map(|g| g.frames() as u64).sum()
    }

    /// Pointer events that calibrate every zone and both stick colors during
    /// the opening rest period.
    ///
    /// Each zone is a press on the drum center, a drag to its rim and a
    /// release, one frame apart. Stick colors are picked from the resting
    /// tips afterwards, left first.
    pub fn calibration_script(&self) -> PointerScript {
        let mut events = Vec::new();
        let mut frame = 1u64;
        for d in &self.drums {
            let rim = Point::new(d.center.x + d.radius as i32, d.center.y);
            events.push(ScriptedPointer::new(frame, PointerKind::Down, d.center));
            events.push(ScriptedPointer::new(frame + 1, PointerKind::Move, rim));
            events.push(ScriptedPointer::new(frame + 2, PointerKind::Up, rim));
            frame += 3;
        }
        for stick in [StickSide::Left, StickSide::Right] {
            events.push(ScriptedPointer::new(
                frame,
                PointerKind::Down,
                self.rest_position(stick),
            ));
            events.push(ScriptedPointer::new(
                frame,
                PointerKind::Up,
                self.rest_position(stick),
            ));
            frame += 1;
        }
        PointerScript::new(events)
    }

    fn tip_half(&self) -> u32 {
        let r = self.drums.iter().map(|d| d.radius).min().unwrap_or(10);
        (r * 3 / 10).max(3)
    }

    /// Stick tip centers for the current frame.
    fn tip_positions(&self, gesture: &Gesture, f: u32) -> (Point, Point) {
        let mut left = self.rest_position(StickSide::Left);
        let mut right = self.rest_position(StickSide::Right);
        let center = |i: usize| self.drums.get(i).map(|d| d.center);

        match *gesture {
            Gesture::Rest { .. } => {}
            Gesture::Strike { left: l, right: r } => {
                if f < STRIKE_CONTACT_FRAMES {
                    if let Some(c) = l.and_then(center) {
                        left = c;
                    }
                    if let Some(c) = r.and_then(center) {
                        right = c;
                    }
                }
            }
            Gesture::Linger { stick, drum, frames } => {
                // Last frames back at rest so the zone releases
                if f + STRIKE_RECOVER_FRAMES < frames {
                    if let Some(c) = center(drum) {
                        match stick {
                            StickSide::Left => left = c,
                            StickSide::Right => right = c,
                        }
                    }
                }
            }
        }
        (left, right)
    }

    fn render(&mut self, left: Point, right: Point) -> RgbImage {
        let mut frame = RgbImage::from_pixel(self.width, self.height, BACKDROP);
        for d in &self.drums {
            fill_disk(&mut frame, d.center, d.radius + 2, DRUM_RIM);
            fill_disk(&mut frame, d.center, d.radius, DRUM_HEAD);
        }

        let half = self.tip_half() as i32;
        fill_square(&mut frame, left, half, LEFT_TIP);
        fill_square(&mut frame, right, half, RIGHT_TIP);

        let specks = if self.width == 0 || self.height == 0 { 0 } else { 6 };
        for _ in 0..specks {
            let x = self.next_noise() % self.width;
            let y = self.next_noise() % self.height;
            // Keep specks off the tips so they stay isolated
            let p = Point::new(x as i32, y as i32);
            if p.distance(left) > (half * 3) as f64 && p.distance(right) > (half * 3) as f64 {
                frame.put_pixel(x, y, LEFT_TIP);
            }
        }
        frame
    }

    fn next_noise(&mut self) -> u32 {
        self.noise = self.noise.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.noise >> 8
    }
}

impl FrameSource for Simulator {
    fn next_frame(&mut self) -> Option<RgbImage> {
        while self
            .gestures
            .get(self.gesture_idx)
            .is_some_and(|g| self.frame_in_gesture >= g.frames())
        {
            self.gesture_idx += 1;
            self.frame_in_gesture = 0;
            if let Some(g) = self.gestures.get(self.gesture_idx) {
                debug!("  sim gesture {:?}", g);
            }
        }

        if self.gesture_idx >= self.gestures.len() {
            if !self.repeat || self.gestures.len() < 2 {
                info!("Simulator demo complete after {} frames", self.frames_emitted);
                return None;
            }
            // Skip the calibration rest on repeat
            self.gesture_idx = 1;
            self.frame_in_gesture = 0;
        }

        let gesture = self.gestures[self.gesture_idx];
        let (left, right) = self.tip_positions(&gesture, self.frame_in_gesture);
        self.frame_in_gesture += 1;
        self.frames_emitted += 1;
        Some(self.render(left, right))
    }
}

/// Rest for calibration, strike every drum alternating sticks, a two-stick
/// strike on the first and last drums, then a long linger.
fn demo_sequence(drum_count: usize) -> Vec<Gesture> {
    // 3 frames per zone + 2 color picks + slack
    let setup = 3 * drum_count as u32 + 6;
    let mut g = vec![Gesture::Rest { frames: setup }];
    for i in 0..drum_count {
        g.push(if i % 2 == 0 {
            Gesture::Strike {
                left: Some(i),
                right: None,
            }
        } else {
            Gesture::Strike {
                left: None,
                right: Some(i),
            }
        });
    }
    if drum_count >= 2 {
        g.push(Gesture::Strike {
            left: Some(0),
            right: Some(drum_count - 1),
        });
        g.push(Gesture::Linger {
            stick: StickSide::Right,
            drum: 1,
            frames: 30,
        });
    }
    g.push(Gesture::Rest { frames: 5 });
    g
}

fn layout(width: u32, height: u32, n: usize) -> Vec<SimDrum> {
    if n == 0 {
        return Vec::new();
    }
    let rows = if n == 1 { 1 } else { 2 };
    let cols = n.div_ceil(rows) as u32;
    let cell_w = width / cols;
    let cell_h = (height * 2 / 3) / rows as u32;
    let radius = (cell_w.min(cell_h) * 35 / 100).max(4);

    (0..n)
        .map(|i| {
            let row = (i as u32) / cols;
            let col = (i as u32) % cols;
            SimDrum {
                center: Point::new(
                    (col * cell_w + cell_w / 2) as i32,
                    (row * cell_h + cell_h / 2) as i32,
                ),
                radius,
            }
        })
        .collect()
}

fn fill_disk(frame: &mut RgbImage, c: Point, r: u32, px: Rgb<u8>) {
    let r = r as i32;
    for y in (c.y - r)..=(c.y + r) {
        for x in (c.x - r)..=(c.x + r) {
            let (dx, dy) = (x - c.x, y - c.y);
            if dx * dx + dy * dy <= r * r {
                put(frame, x, y, px);
            }
        }
    }
}

fn fill_square(frame: &mut RgbImage, c: Point, half: i32, px: Rgb<u8>) {
    for y in (c.y - half)..=(c.y + half) {
        for x in (c.x - half)..=(c.x + half) {
            put(frame, x, y, px);
        }
    }
}

fn put(frame: &mut RgbImage, x: i32, y: i32, px: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < frame.width() && (y as u32) < frame.height() {
        frame.put_pixel(x as u32, y as u32, px);
    }
}
