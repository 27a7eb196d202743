//! End-to-end integration tests for the stick drums pipeline.
//!
//! These tests exercise the full data flow:
//!   Simulator → Coordinator (calibration, detection, dispatch) → hit channel → assertions
//!
//! The simulator renders a kit with two colored stick tips and supplies the
//! pointer script that calibrates zones and colors during its opening rest.

use crossbeam_channel::{bounded, Receiver};
use image::RgbImage;
use std::cell::Cell;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use stick_drums::coordinator::{Coordinator, ExitReason, RunSummary};
use stick_drums::hit_logger::HitLogger;
use stick_drums::kit::DrumKit;
use stick_drums::overlay::{DisplaySink, Overlay};
use stick_drums::pointer_script::{PointerKind, PointerScript, ScriptedPointer};
use stick_drums::session::PhaseKind;
use stick_drums::simulator::Simulator;
use stick_drums::sound_bank::SoundBank;
use stick_drums::types::{HitEvent, Point};
use stick_drums::voice::{TimedVoice, VoiceDispatcher};

// ─── Helpers ───────────────────────────────────────────────────────────────

fn kit() -> DrumKit {
    DrumKit::default()
}

/// Coordinator over a calibrated simulator run, with `voices` timed voices
/// playing silent sounds of `sound`.
fn pipeline(voices: usize, sound: Duration) -> (Coordinator, Simulator, Receiver<HitEvent>) {
    let kit = kit();
    let sim = Simulator::new(320, 240, kit.drums.len());
    let reference = Simulator::new(320, 240, kit.drums.len());
    let (tx, rx) = bounded(256);
    let coord = Coordinator::new(
        Box::new(sim),
        VoiceDispatcher::new(TimedVoice::pool(voices)),
        SoundBank::silent(&kit, sound),
        kit.names(),
    )
    .with_pointer(Box::new(reference.calibration_script()))
    .with_hit_sender(tx);
    (coord, reference, rx)
}

fn drain(rx: &Receiver<HitEvent>) -> Vec<HitEvent> {
    rx.try_iter().collect()
}

/// Records what it was shown; asks to quit after `quit_after` frames.
struct Recorder {
    phases: Rc<Cell<Option<PhaseKind>>>,
    shown: Rc<Cell<u64>>,
    quit_after: Option<u64>,
    closed: Rc<Cell<bool>>,
}

impl DisplaySink for Recorder {
    fn show(&mut self, _frame: &RgbImage, overlay: &Overlay) {
        self.phases.set(Some(overlay.phase));
        self.shown.set(self.shown.get() + 1);
    }

    fn quit_requested(&self) -> bool {
        self.quit_after.is_some_and(|n| self.shown.get() >= n)
    }

    fn close(&mut self) {
        self.closed.set(true);
    }
}

// ─── Full demo ──────────────────────────────────────────────────────────────

#[test]
fn test_full_demo_hits_every_drum_once_in_order() {
    let (mut coord, sim, rx) = pipeline(16, Duration::from_millis(300));
    let summary: RunSummary = coord.run();
    drop(coord);

    assert_eq!(summary.exit, ExitReason::EndOfStream);
    assert_eq!(summary.frames, sim.total_frames());
    assert_eq!(summary.hits as usize, sim.expected_hits());
    assert_eq!(summary.played, summary.hits);
    assert_eq!(summary.dropped, 0);

    let hits = drain(&rx);
    let zones: Vec<usize> = hits.iter().map(|h| h.zone_index).collect();
    // Each drum in kit order, then first+last together, then a long linger on drum 1
    assert_eq!(zones, vec![0, 1, 2, 3, 4, 5, 6, 0, 6, 1]);

    let names = kit().names();
    for h in &hits {
        assert_eq!(h.drum, names[h.zone_index]);
    }
    // The two-stick strike lands on one frame
    assert_eq!(hits[7].frame_index, hits[8].frame_index);
    // Frame indices never go backwards
    assert!(hits.windows(2).all(|w| w[0].frame_index <= w[1].frame_index));
}

#[test]
fn test_no_hits_during_calibration() {
    let (mut coord, sim, rx) = pipeline(16, Duration::from_millis(300));
    coord.run();
    drop(coord);

    let setup = sim.setup_frames();
    let hits = drain(&rx);
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.frame_index >= setup));
}

#[test]
fn test_uncalibrated_run_never_hits() {
    let kit = kit();
    let sim = Simulator::new(320, 240, kit.drums.len());
    let mut coord = Coordinator::new(
        Box::new(sim),
        VoiceDispatcher::new(TimedVoice::pool(8)),
        SoundBank::silent(&kit, Duration::from_millis(300)),
        kit.names(),
    );
    let summary = coord.run();
    assert_eq!(summary.hits, 0);
    assert!(!coord.session().unwrap().is_playing());
}

#[test]
fn test_zones_only_never_hits() {
    // Calibrate zones but never pick stick colors
    let kit = kit();
    let sim = Simulator::new(320, 240, kit.drums.len());
    let mut events = Vec::new();
    for (i, d) in sim.drums().iter().enumerate() {
        let f = 1 + 3 * i as u64;
        let rim = Point::new(d.center.x + d.radius as i32, d.center.y);
        events.push(ScriptedPointer::new(f, PointerKind::Down, d.center));
        events.push(ScriptedPointer::new(f + 1, PointerKind::Move, rim));
        events.push(ScriptedPointer::new(f + 2, PointerKind::Up, rim));
    }
    let mut coord = Coordinator::new(
        Box::new(sim),
        VoiceDispatcher::new(TimedVoice::pool(8)),
        SoundBank::silent(&kit, Duration::from_millis(300)),
        kit.names(),
    )
    .with_pointer(Box::new(PointerScript::new(events)));

    let summary = coord.run();
    assert_eq!(summary.hits, 0);
    let session = coord.session().unwrap();
    assert_eq!(session.kind(), PhaseKind::Colors);
    assert_eq!(session.zones().len(), 7);
}

// ─── Voice pool ─────────────────────────────────────────────────────────────

#[test]
fn test_single_long_voice_drops_overflow() {
    let (mut coord, sim, rx) = pipeline(1, Duration::from_secs(30));
    let summary = coord.run();
    drop(coord);

    let expected = sim.expected_hits() as u64;
    assert_eq!(summary.hits, expected);
    assert_eq!(summary.played, 1);
    assert_eq!(summary.dropped, expected - 1);
    // Consumers still see every hit, played or not
    assert_eq!(drain(&rx).len() as u64, expected);
}

// ─── Exit paths ─────────────────────────────────────────────────────────────

#[test]
fn test_display_quit_stops_and_tears_down() {
    let (coord, _sim, _rx) = pipeline(8, Duration::from_millis(300));
    let closed = Rc::new(Cell::new(false));
    let shown = Rc::new(Cell::new(0));
    let phases = Rc::new(Cell::new(None));
    let mut coord = coord.with_display(Box::new(Recorder {
        phases: phases.clone(),
        shown: shown.clone(),
        quit_after: Some(10),
        closed: closed.clone(),
    }));

    let summary = coord.run();
    assert_eq!(summary.exit, ExitReason::Quit);
    assert_eq!(summary.frames, 10);
    assert_eq!(shown.get(), 10);
    assert!(closed.get());
    // Still calibrating at frame 10
    assert_eq!(phases.get(), Some(PhaseKind::Zones));
}

#[test]
fn test_quit_signal_mid_run() {
    let (coord, _sim, _rx) = pipeline(8, Duration::from_millis(300));
    let (quit_tx, quit_rx) = bounded::<()>(1);
    let mut coord = coord.with_quit(quit_rx).with_fps(200);

    let signaller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        let _ = quit_tx.send(());
    });
    let summary = coord.run();
    signaller.join().unwrap();

    assert_eq!(summary.exit, ExitReason::Quit);
    assert!(summary.frames > 0);
}

#[test]
fn test_overlay_reaches_playing_phase() {
    let (coord, _sim, _rx) = pipeline(8, Duration::from_millis(300));
    let phases = Rc::new(Cell::new(None));
    let mut coord = coord.with_display(Box::new(Recorder {
        phases: phases.clone(),
        shown: Rc::new(Cell::new(0)),
        quit_after: None,
        closed: Rc::new(Cell::new(false)),
    }));
    coord.run();
    assert_eq!(phases.get(), Some(PhaseKind::Playing));
}

// ─── Hit consumers ──────────────────────────────────────────────────────────

#[test]
fn test_hit_log_written_from_consumer_thread() {
    let root = std::env::temp_dir().join(format!("stick-drums-it-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&root);

    let kit = kit();
    let sim = Simulator::new(320, 240, kit.drums.len());
    let script = sim.calibration_script();
    let expected = sim.expected_hits();

    let (tx, rx) = bounded::<HitEvent>(1024);
    let logger = HitLogger::new(rx, &root, kit.names()).unwrap();
    let dir = logger.session_dir().to_path_buf();
    let handle = thread::spawn(move || logger.run().unwrap());

    let mut coord = Coordinator::new(
        Box::new(sim),
        VoiceDispatcher::new(TimedVoice::pool(8)),
        SoundBank::silent(&kit, Duration::from_millis(300)),
        kit.names(),
    )
    .with_pointer(Box::new(script))
    .with_hit_sender(tx);
    coord.run();
    // Teardown releases the sender, so the logger finishes
    let logged = handle.join().unwrap();
    assert_eq!(logged as usize, expected);

    let text = std::fs::read_to_string(dir.join("hits.jsonl")).unwrap();
    assert_eq!(text.lines().count(), expected + 1);
    assert!(text.lines().next().unwrap().contains("\"stick-drums\""));

    drop(coord);
    let _ = std::fs::remove_dir_all(&root);
}
