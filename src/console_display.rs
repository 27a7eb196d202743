use crate::overlay::{DisplaySink, Overlay};
use crate::session::PhaseKind;
use crate::types::HitEvent;
use image::RgbImage;
use std::collections::VecDeque;
use std::io::{self, Write};

const RECENT_HITS: usize = 6;

/// Renders a live ASCII dashboard of the session in the terminal.
pub struct ConsoleDisplay {
    /// Redraw every this many frames
    skip: u64,
    drums: Vec<String>,
    counts: Vec<u64>,
    recent: VecDeque<HitEvent>,
    frames: u64,
}

impl ConsoleDisplay {
    /// `update_hz` redraws per second at the given camera rate.
    pub fn new(drums: Vec<String>, update_hz: u32, fps: u32) -> Self {
        let skip = if update_hz == 0 {
            30
        } else {
            (fps / update_hz).max(1) as u64
        };
        let counts = vec![0; drums.len()];
        Self {
            skip,
            drums,
            counts,
            recent: VecDeque::with_capacity(RECENT_HITS),
            frames: 0,
        }
    }

    pub fn hit_counts(&self) -> &[u64] {
        &self.counts
    }

    fn record(&mut self, hits: &[HitEvent]) {
        for hit in hits {
            if let Some(c) = self.counts.get_mut(hit.zone_index) {
                *c += 1;
            }
            if self.recent.len() == RECENT_HITS {
                self.recent.pop_front();
            }
            self.recent.push_back(hit.clone());
        }
    }

    fn render(&self, overlay: &Overlay) -> String {
        let mut out = String::new();
        // Clear screen and move cursor home
        out.push_str("\x1b[2J\x1b[H");
        out.push_str("╔══════════════════════════════════════════════════════════╗\n");
        out.push_str("║  STICK DRUMS : Live Monitor                              ║\n");
        out.push_str("╠══════════════════════════════════════════════════════════╣\n");
        out.push_str(&row(&format!("Frame: {}", overlay.frame_index)));
        out.push_str(&row(&format!("Status: {}", overlay.status)));

        if overlay.phase == PhaseKind::Playing {
            out.push_str(&row(""));
            out.push_str(&row("Hits:"));
            let max = self.counts.iter().copied().max().unwrap_or(0).max(1);
            for (name, &n) in self.drums.iter().zip(&self.counts) {
                let bar = make_bar(n as f32 / max as f32, 24);
                out.push_str(&row(&format!("  {:>12}: {} {}", name, bar, n)));
            }
            out.push_str(&row(""));
            out.push_str(&row("Recent:"));
            for hit in self.recent.iter().rev() {
                let secs = hit.timestamp_us as f64 / 1_000_000.0;
                out.push_str(&row(&format!(
                    "  {:>8.2}s  frame {:>6}  {}",
                    secs, hit.frame_index, hit.drum
                )));
            }
        }
        out.push_str("╚══════════════════════════════════════════════════════════╝\n");
        out
    }
}

impl DisplaySink for ConsoleDisplay {
    fn show(&mut self, _frame: &RgbImage, overlay: &Overlay) {
        self.record(&overlay.hits);
        self.frames += 1;
        if self.frames % self.skip != 0 {
            return;
        }
        let mut stdout = io::stdout();
        let _ = stdout.write_all(self.render(overlay).as_bytes());
        let _ = stdout.flush();
    }
}

/// One dashboard line padded to the box width (char count, not byte count).
fn row(text: &str) -> String {
    let body: String = text.chars().take(56).collect();
    let pad = 56 - body.chars().count();
    format!("║  {}{}║\n", body, " ".repeat(pad))
}

fn make_bar(val: f32, width: usize) -> String {
    let filled = ((val * width as f32).round() as usize).min(width);
    let empty = width - filled;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn overlay(phase: PhaseKind, hits: Vec<HitEvent>) -> Overlay {
        Overlay {
            shapes: Vec::new(),
            status: "Playing mode".into(),
            status_color: Rgb([0, 255, 0]),
            phase,
            frame_index: 42,
            hits,
        }
    }

    fn hit(zone_index: usize, drum: &str) -> HitEvent {
        HitEvent {
            zone_index,
            drum: drum.into(),
            frame_index: 42,
            timestamp_us: 1_500_000,
        }
    }

    #[test]
    fn test_counts_hits_per_drum() {
        let mut c = ConsoleDisplay::new(vec!["snare".into(), "hi_hat".into()], 1, 30);
        c.record(&[hit(0, "snare"), hit(1, "hi_hat"), hit(0, "snare")]);
        assert_eq!(c.hit_counts(), &[2, 1]);
    }

    #[test]
    fn test_render_lines_have_fixed_width() {
        let mut c = ConsoleDisplay::new(vec!["snare".into(), "crash_cymbal".into()], 1, 30);
        c.record(&[hit(1, "crash_cymbal")]);
        let text = c.render(&overlay(PhaseKind::Playing, Vec::new()));
        assert!(text.contains("crash_cymbal"));
        assert!(text.contains("Playing mode"));
        for line in text.lines().skip(1) {
            assert_eq!(line.chars().count(), 60, "line {:?}", line);
        }
    }

    #[test]
    fn test_bar_clamps() {
        assert_eq!(make_bar(2.0, 4), "[████]");
        assert_eq!(make_bar(0.0, 2), "[░░]");
    }
}
