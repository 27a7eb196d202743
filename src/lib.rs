pub mod color;
pub mod console_display;
pub mod coordinator;
pub mod error;
pub mod frame_analyzer;
pub mod frame_source;
pub mod hit_detector;
pub mod hit_logger;
pub mod kit;
pub mod osc_sender;
pub mod overlay;
pub mod pointer_script;
pub mod session;
pub mod simulator;
pub mod sound_bank;
pub mod stick_calibrator;
pub mod types;
pub mod voice;
pub mod zone;
pub mod zone_calibrator;

#[cfg(feature = "audio")]
pub mod audio_output;

#[cfg(feature = "window")]
pub mod window;
