use stick_drums::console_display::ConsoleDisplay;
use stick_drums::coordinator::{Coordinator, RunSummary};
use stick_drums::error::DrumResult;
use stick_drums::frame_source::{FrameSource, ImageSequence};
use stick_drums::hit_logger::HitLogger;
use stick_drums::kit::DrumKit;
use stick_drums::osc_sender::OscSender;
use stick_drums::overlay::SnapshotSink;
use stick_drums::pointer_script::{NoPointer, PointerScript, PointerSource};
use stick_drums::simulator::Simulator;
use stick_drums::sound_bank::SoundBank;
use stick_drums::types::{HitEvent, SessionClock};
use stick_drums::voice::{TimedVoice, Voice, VoiceDispatcher};

use clap::Parser;
use crossbeam_channel::bounded;
use log::{error, info, warn};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "stick-drums")]
#[command(about = "Play drums by striking marked zones with colored sticks in front of a camera")]
struct Cli {
    /// Replay a directory of PNG/JPEG frames instead of the simulator
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Simulator frame width
    #[arg(long, default_value_t = 320, value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,

    /// Simulator frame height
    #[arg(long, default_value_t = 240, value_parser = clap::value_parser!(u32).range(1..))]
    height: u32,

    /// Loop the simulator demo until quit
    #[arg(long)]
    repeat: bool,

    /// Kit file (JSON); defaults to the built-in seven-piece kit
    #[arg(long)]
    kit: Option<PathBuf>,

    /// Directory relative sound paths are resolved against
    #[arg(long)]
    sounds_dir: Option<PathBuf>,

    /// Voice pool size (overrides the kit file)
    #[arg(long)]
    voices: Option<usize>,

    /// Use silent placeholder sounds; no WAV files or audio device needed
    #[arg(long)]
    no_sound: bool,

    /// Pointer script (JSONL) to replay; the simulator calibrates itself by default
    #[arg(long)]
    script: Option<PathBuf>,

    /// Enable console display (terminal dashboard)
    #[arg(long)]
    console: bool,

    /// Console display refresh rate (Hz)
    #[arg(long, default_value_t = 5)]
    display_hz: u32,

    /// Write annotated frames as PNG to this directory
    #[arg(long)]
    snapshots: Option<PathBuf>,

    /// Snapshot every Nth frame
    #[arg(long, default_value_t = 30)]
    snapshot_every: u64,

    /// Open a window showing the annotated frames (mouse calibrates zones)
    #[arg(long)]
    window: bool,

    /// Frame rate the loop is paced to (0 = as fast as possible)
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Enable hit logging
    #[arg(long)]
    log_hits: bool,

    /// Output directory for logged sessions
    #[arg(long, default_value = "./sessions")]
    output_dir: PathBuf,

    /// Enable OSC output
    #[arg(long)]
    osc: bool,

    /// OSC target address
    #[arg(long, default_value = "127.0.0.1:9000")]
    osc_target: String,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(summary) => info!(
            "Done: {} frames, {} hits ({} played, {} dropped)",
            summary.frames, summary.hits, summary.played, summary.dropped
        ),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> DrumResult<RunSummary> {
    // ─── Kit and sounds ─────────────────────────────────────────────
    let mut kit = match &cli.kit {
        Some(path) => DrumKit::load(path)?,
        None => DrumKit::default(),
    };
    if let Some(dir) = &cli.sounds_dir {
        kit = kit.with_base_dir(dir.clone());
    }
    if let Some(voices) = cli.voices {
        kit = kit.with_voices(voices);
    }
    let names = kit.names();

    info!("═══════════════════════════════════════════════");
    info!("  STICK DRUMS v{}", env!("CARGO_PKG_VERSION"));
    info!("  Kit: {}", names.join(", "));
    info!("  Voices: {}", kit.voices);
    info!(
        "  Source: {}",
        match &cli.frames {
            Some(dir) => format!("frames from {:?}", dir),
            None => format!("SIMULATOR {}x{}", cli.width, cli.height),
        }
    );
    if cli.window { info!("  UI: Window"); }
    if cli.console { info!("  UI: Console"); }
    info!("═══════════════════════════════════════════════");

    let bank = if cli.no_sound {
        SoundBank::silent(&kit, Duration::from_millis(300))
    } else {
        SoundBank::load(&kit)?
    };

    // ─── Voices ─────────────────────────────────────────────────────
    let clock = SessionClock::new();
    // The output stream must outlive the coordinator
    #[cfg(feature = "audio")]
    let audio = if cli.no_sound {
        None
    } else {
        Some(stick_drums::audio_output::CpalOutput::start(kit.voices)?)
    };
    #[cfg(feature = "audio")]
    let voices: Vec<Box<dyn Voice>> = match &audio {
        Some(out) => out.voices(),
        None => TimedVoice::pool_on(kit.voices, &clock),
    };
    #[cfg(not(feature = "audio"))]
    let voices: Vec<Box<dyn Voice>> = TimedVoice::pool_on(kit.voices, &clock);

    // ─── Frame source and pointer input ─────────────────────────────
    let (source, pointer, (width, height)): (Box<dyn FrameSource>, Box<dyn PointerSource>, _) =
        match &cli.frames {
            Some(dir) => {
                let seq = ImageSequence::open(dir)?;
                let size = seq.dimensions()?;
                let pointer: Box<dyn PointerSource> = match &cli.script {
                    Some(path) => Box::new(PointerScript::load(path)?),
                    None => Box::new(NoPointer),
                };
                (Box::new(seq) as Box<dyn FrameSource>, pointer, size)
            }
            None => {
                let sim = Simulator::new(cli.width, cli.height, names.len()).with_repeat(cli.repeat);
                let pointer: Box<dyn PointerSource> = match &cli.script {
                    Some(path) => Box::new(PointerScript::load(path)?),
                    None if cli.window => Box::new(NoPointer),
                    None => Box::new(sim.calibration_script()),
                };
                info!("Simulator: {} hits expected per pass", sim.expected_hits());
                (Box::new(sim) as Box<dyn FrameSource>, pointer, (cli.width, cli.height))
            }
        };

    let mut coord = Coordinator::new(source, VoiceDispatcher::new(voices), bank, names.clone())
        .with_pointer(pointer)
        .with_fps(cli.fps)
        .with_max_frames(cli.max_frames)
        .with_clock(clock);

    // ─── Displays ───────────────────────────────────────────────────
    if cli.console {
        coord = coord.with_display(Box::new(ConsoleDisplay::new(
            names.clone(),
            cli.display_hz,
            cli.fps.max(1),
        )));
    }
    if let Some(dir) = &cli.snapshots {
        coord = coord.with_display(Box::new(SnapshotSink::new(dir, cli.snapshot_every)?));
    }
    if cli.window {
        #[cfg(feature = "window")]
        {
            let win = stick_drums::window::DrumWindow::open("Stick Drums", width, height)?;
            coord = coord.with_display(Box::new(win));
        }
        #[cfg(not(feature = "window"))]
        {
            warn!("--window requires the 'window' feature ({}x{} frames); running without it", width, height);
        }
    }

    // ─── Quit signal ────────────────────────────────────────────────
    let (quit_tx, quit_rx) = bounded::<()>(1);
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = quit_tx.try_send(());
    }) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }
    coord = coord.with_quit(quit_rx);

    let mut handles = Vec::new();

    // ─── Hit logger ─────────────────────────────────────────────────
    if cli.log_hits {
        let (tx, rx) = bounded::<HitEvent>(4096);
        let logger = HitLogger::new(rx, &cli.output_dir, names.clone())?;
        coord = coord.with_hit_sender(tx);
        handles.push(thread::Builder::new().name("logger".into()).spawn(move || {
            if let Err(e) = logger.run() {
                error!("Hit logger stopped: {}", e);
            }
        }));
    }

    // ─── OSC sender ─────────────────────────────────────────────────
    if cli.osc {
        let (tx, rx) = bounded::<HitEvent>(1024);
        coord = coord.with_hit_sender(tx);
        let target = cli.osc_target.clone();
        handles.push(thread::Builder::new().name("osc".into()).spawn(move || {
            OscSender::new(rx, target).run();
        }));
    }

    // ─── Coordinator (main thread) ──────────────────────────────────
    info!("Running. Press Ctrl+C to stop.");
    let summary = coord.run();
    drop(coord);
    #[cfg(feature = "audio")]
    drop(audio);

    for h in handles {
        match h {
            Ok(h) => {
                let _ = h.join();
            }
            Err(e) => warn!("Consumer thread failed to start: {}", e),
        }
    }
    Ok(summary)
}
