//! The session context: which setup phase we are in and everything that
//! phase owns. Owned by the coordinator and mutated only between frames.

use crate::frame_analyzer::FrameAnalyzer;
use crate::hit_detector::HitDetector;
use crate::stick_calibrator::{StickCalibrator, StickColors};
use crate::types::{HitEvent, Point, PointerEvent, SessionClock};
use crate::zone::Zone;
use crate::zone_calibrator::{ZoneCalibrator, ZoneStep};
use image::RgbImage;
use log::{info, trace, warn};

/// Zones are committed; waiting for both stick colors.
pub struct ColorPhase {
    zones: Vec<Zone>,
    sticks: StickCalibrator,
}

/// Fully calibrated; hit detection runs every frame.
pub struct PlayingPhase {
    zones: Vec<Zone>,
    colors: StickColors,
    detector: HitDetector,
}

impl PlayingPhase {
    pub fn colors(&self) -> &StickColors {
        &self.colors
    }

    pub fn detector(&self) -> &HitDetector {
        &self.detector
    }
}

/// Calibration phases. Each variant owns exactly the state that is valid in
/// it, so hit detection cannot run before zones and colors both exist.
pub enum Phase {
    Zones(ZoneCalibrator),
    Colors(ColorPhase),
    Playing(PlayingPhase),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Zones,
    Colors,
    Playing,
}

pub struct Session {
    phase: Phase,
    analyzer: FrameAnalyzer,
    clock: SessionClock,
    width: u32,
    height: u32,
    frame_index: u64,
}

impl Session {
    /// Start zone setup for `drum_names` (kit order) on `width`×`height` frames.
    pub fn new(drum_names: Vec<String>, width: u32, height: u32) -> Self {
        Self::with_clock(drum_names, width, height, SessionClock::new())
    }

    pub fn with_clock(drum_names: Vec<String>, width: u32, height: u32, clock: SessionClock) -> Self {
        Self {
            phase: Phase::Zones(ZoneCalibrator::new(drum_names, width, height)),
            analyzer: FrameAnalyzer::new(),
            clock,
            width,
            height,
            frame_index: 0,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn kind(&self) -> PhaseKind {
        match self.phase {
            Phase::Zones(_) => PhaseKind::Zones,
            Phase::Colors(_) => PhaseKind::Colors,
            Phase::Playing(_) => PhaseKind::Playing,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.kind() == PhaseKind::Playing
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frames_processed(&self) -> u64 {
        self.frame_index
    }

    /// Zones committed so far.
    pub fn zones(&self) -> &[Zone] {
        match &self.phase {
            Phase::Zones(cal) => cal.zones(),
            Phase::Colors(p) => &p.zones,
            Phase::Playing(p) => &p.zones,
        }
    }

    /// The zone currently being dragged out.
    pub fn preview(&self) -> Option<(Point, u32)> {
        match &self.phase {
            Phase::Zones(cal) => cal.preview(),
            _ => None,
        }
    }

    /// Status line shown to the operator.
    pub fn status_text(&self) -> String {
        match &self.phase {
            Phase::Zones(cal) => format!("Select: {}", cal.current_drum().unwrap_or("")),
            Phase::Colors(_) => "Click to select drumstick colors".to_string(),
            Phase::Playing(_) => "Playing mode".to_string(),
        }
    }

    /// Route one pointer event to the active calibrator. `frame` is the
    /// frame on screen when the event happened (sampled for stick colors).
    pub fn handle_pointer(&mut self, event: PointerEvent, frame: &RgbImage) {
        trace!("Pointer {:?}", event);
        match &mut self.phase {
            Phase::Zones(cal) => {
                if cal.handle(event) == ZoneStep::Completed {
                    self.finish_zones();
                }
            }
            Phase::Colors(p) => {
                if let PointerEvent::Down(at) = event {
                    p.sticks.click(frame, at);
                    if p.sticks.is_complete() {
                        self.finish_colors();
                    }
                }
            }
            Phase::Playing(_) => {}
        }
    }

    /// Run hit detection on one frame. Returns no hits unless fully
    /// calibrated; the frame counter advances either way.
    pub fn process_frame(&mut self, frame: &RgbImage) -> Vec<HitEvent> {
        let frame_index = self.frame_index;
        self.frame_index += 1;

        let Phase::Playing(p) = &mut self.phase else {
            return Vec::new();
        };
        if frame.dimensions() != (self.width, self.height) {
            warn!(
                "Frame {} is {:?}, session is {}x{}; skipping detection",
                frame_index,
                frame.dimensions(),
                self.width,
                self.height
            );
            return Vec::new();
        }

        let Some(masks) =
            self.analyzer
                .analyze(frame, Some(&p.colors.left), Some(&p.colors.right))
        else {
            return Vec::new();
        };
        p.detector
            .evaluate(&p.zones, &masks, frame_index, self.clock.now_us())
    }

    fn take_phase(&mut self) -> Phase {
        std::mem::replace(
            &mut self.phase,
            Phase::Zones(ZoneCalibrator::new(Vec::new(), 0, 0)),
        )
    }

    fn finish_zones(&mut self) {
        if let Phase::Zones(cal) = self.take_phase() {
            info!("Zone setup complete; click the left then the right stick tip");
            self.phase = Phase::Colors(ColorPhase {
                zones: cal.into_zones(),
                sticks: StickCalibrator::new(),
            });
        }
    }

    fn finish_colors(&mut self) {
        match self.take_phase() {
            Phase::Colors(ColorPhase { zones, sticks }) => match sticks.colors() {
                Some(colors) => {
                    info!("Stick colors set; playing with {} zones", zones.len());
                    let detector = HitDetector::new(zones.len());
                    self.phase = Phase::Playing(PlayingPhase {
                        zones,
                        colors,
                        detector,
                    });
                }
                None => self.phase = Phase::Colors(ColorPhase { zones, sticks }),
            },
            other => self.phase = other,
        }
    }
}
