use crate::frame_source::FrameSource;
use crate::overlay::{DisplaySink, Overlay};
use crate::pointer_script::{NoPointer, PointerSource};
use crate::session::Session;
use crate::sound_bank::SoundBank;
use crate::types::{HitEvent, SessionClock};
use crate::voice::VoiceDispatcher;
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use log::{debug, info, trace, warn};
use std::time::{Duration, Instant};

/// Why the frame loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The frame source ran out or failed.
    EndOfStream,
    /// Quit signal from Ctrl-C or a display.
    Quit,
    /// The configured frame limit was reached.
    FrameLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub hits: u64,
    pub played: u64,
    pub dropped: u64,
    pub exit: ExitReason,
}

/// The coordinator owns the session and drives the per-frame loop:
/// acquire a frame, route pointer input to calibration, detect hits,
/// dispatch them to voices, fan them out to consumers and render the
/// overlay.
///
/// Everything for one frame finishes before the next frame is acquired.
/// The session is created on the first frame, sized to it. Hit consumers
/// (logger, OSC) get events through bounded channels with `try_send`, so a
/// slow consumer loses hits rather than stalling the loop.
pub struct Coordinator {
    source: Box<dyn FrameSource>,
    pointer: Box<dyn PointerSource>,
    displays: Vec<Box<dyn DisplaySink>>,
    dispatcher: VoiceDispatcher,
    bank: SoundBank,
    drum_names: Vec<String>,
    hit_txs: Vec<Sender<HitEvent>>,
    quit_rx: Option<Receiver<()>>,
    frame_interval: Option<Duration>,
    max_frames: Option<u64>,
    clock: SessionClock,
    session: Option<Session>,
    closed: bool,
}

impl Coordinator {
    pub fn new(
        source: Box<dyn FrameSource>,
        dispatcher: VoiceDispatcher,
        bank: SoundBank,
        drum_names: Vec<String>,
    ) -> Self {
        Self {
            source,
            pointer: Box::new(NoPointer),
            displays: Vec::new(),
            dispatcher,
            bank,
            drum_names,
            hit_txs: Vec::new(),
            quit_rx: None,
            frame_interval: None,
            max_frames: None,
            clock: SessionClock::new(),
            session: None,
            closed: false,
        }
    }

    pub fn with_pointer(mut self, pointer: Box<dyn PointerSource>) -> Self {
        self.pointer = pointer;
        self
    }

    pub fn with_display(mut self, display: Box<dyn DisplaySink>) -> Self {
        self.displays.push(display);
        self
    }

    /// Add a consumer that receives every hit.
    pub fn with_hit_sender(mut self, tx: Sender<HitEvent>) -> Self {
        self.hit_txs.push(tx);
        self
    }

    pub fn with_quit(mut self, rx: Receiver<()>) -> Self {
        self.quit_rx = Some(rx);
        self
    }

    /// Pace the loop to `fps` frames per second. Sources that block on a
    /// device do not need this; replayed and synthetic sources do.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.frame_interval = (fps > 0).then(|| Duration::from_secs_f64(1.0 / fps as f64));
        self
    }

    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn with_clock(mut self, clock: SessionClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Run until the source ends or quit is requested. Teardown runs on
    /// every exit path.
    pub fn run(&mut self) -> RunSummary {
        info!(
            "Coordinator running ({} drums, {} voices, {} display(s), {} hit consumer(s))",
            self.drum_names.len(),
            self.dispatcher.voice_count(),
            self.displays.len(),
            self.hit_txs.len()
        );

        let mut frames: u64 = 0;
        let mut hits_total: u64 = 0;
        let mut played: u64 = 0;

        let exit = loop {
            if self.quit_signalled() {
                break ExitReason::Quit;
            }
            if self.max_frames.is_some_and(|max| frames >= max) {
                break ExitReason::FrameLimit;
            }

            let started = Instant::now();
            let Some(frame) = self.source.next_frame() else {
                break ExitReason::EndOfStream;
            };

            let session = self.session.get_or_insert_with(|| {
                let (w, h) = frame.dimensions();
                info!("Session started on {}x{} frames", w, h);
                Session::with_clock(self.drum_names.clone(), w, h, self.clock.clone())
            });

            // Pointer input that arrived before this frame
            let mut events = self.pointer.poll(session.frames_processed());
            for display in &mut self.displays {
                events.extend(display.poll_events());
            }
            for event in events {
                session.handle_pointer(event, &frame);
            }

            let hits = session.process_frame(&frame);
            frames += 1;

            if !hits.is_empty() {
                hits_total += hits.len() as u64;
                for hit in &hits {
                    debug!("{}", hit);
                }
                played += self.dispatcher.dispatch(&hits, &self.bank).len() as u64;
                for hit in &hits {
                    for tx in &self.hit_txs {
                        match tx.try_send(hit.clone()) {
                            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
                            Err(TrySendError::Full(_)) => warn!("Hit consumer lagging; dropped {}", hit.drum),
                        }
                    }
                }
            }

            let overlay = Overlay::build(session, &hits);
            for display in &mut self.displays {
                display.show(&frame, &overlay);
            }
            if self.displays.iter().any(|d| d.quit_requested()) {
                info!("Quit requested from display");
                break ExitReason::Quit;
            }

            if frames % 300 == 0 {
                trace!(
                    "Coordinator: {} frames, {} hits, {}/{} voices busy",
                    frames,
                    hits_total,
                    self.dispatcher.busy_count(),
                    self.dispatcher.voice_count()
                );
            }

            if let Some(interval) = self.frame_interval {
                if let Some(rest) = interval.checked_sub(started.elapsed()) {
                    std::thread::sleep(rest);
                }
            }
        };

        self.teardown();
        let summary = RunSummary {
            frames,
            hits: hits_total,
            played,
            dropped: self.dispatcher.dropped(),
            exit,
        };
        info!(
            "Coordinator shutting down ({:?}) after {} frames: {} hits, {} played, {} dropped",
            summary.exit, summary.frames, summary.hits, summary.played, summary.dropped
        );
        summary
    }

    fn quit_signalled(&self) -> bool {
        match &self.quit_rx {
            Some(rx) => match rx.try_recv() {
                Ok(()) => {
                    info!("Quit signal received");
                    true
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
            },
            None => false,
        }
    }

    /// Close the source and displays and release hit consumers. Idempotent.
    pub fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.source.close();
        for display in &mut self.displays {
            display.close();
        }
        // Consumer threads end once their sender is gone
        self.hit_txs.clear();
        debug!("Coordinator teardown complete");
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}
