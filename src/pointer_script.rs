//! Scripted pointer input: replays recorded clicks and drags at given frames.
//!
//! One JSON object per line:
//! `{"frame": 12, "kind": "down", "x": 160, "y": 120}`.
//! Blank lines and lines starting with `#` are skipped. Works with any
//! `BufRead`: files, in-memory buffers, stdin.

use crate::error::{DrumError, DrumResult};
use crate::types::{Point, PointerEvent};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Delivers the pointer events that arrived before a given frame.
pub trait PointerSource {
    /// Drain events due at or before `frame_index`, in arrival order.
    fn poll(&mut self, frame_index: u64) -> Vec<PointerEvent>;
}

/// No pointer input at all.
pub struct NoPointer;

impl PointerSource for NoPointer {
    fn poll(&mut self, _frame_index: u64) -> Vec<PointerEvent> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    Down,
    Move,
    Up,
}

/// One line of a pointer script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedPointer {
    pub frame: u64,
    pub kind: PointerKind,
    pub x: i32,
    pub y: i32,
}

impl ScriptedPointer {
    pub fn new(frame: u64, kind: PointerKind, at: Point) -> Self {
        Self {
            frame,
            kind,
            x: at.x,
            y: at.y,
        }
    }

    pub fn event(&self) -> PointerEvent {
        let p = Point::new(self.x, self.y);
        match self.kind {
            PointerKind::Down => PointerEvent::Down(p),
            PointerKind::Move => PointerEvent::Move(p),
            PointerKind::Up => PointerEvent::Up(p),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PointerScript {
    pending: VecDeque<ScriptedPointer>,
}

impl PointerScript {
    /// Events are replayed in frame order; events for the same frame keep
    /// their file order.
    pub fn new(mut events: Vec<ScriptedPointer>) -> Self {
        events.sort_by_key(|e| e.frame);
        Self {
            pending: events.into(),
        }
    }

    pub fn load(path: &Path) -> DrumResult<Self> {
        let file = File::open(path).map_err(|source| DrumError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse a whole script. Any malformed line fails the load.
    pub fn from_reader<R: BufRead>(reader: R) -> DrumResult<Self> {
        let mut events = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| DrumError::Script {
                line: i + 1,
                message: format!("read line: {}", e),
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let ev: ScriptedPointer =
                serde_json::from_str(trimmed).map_err(|e| DrumError::Script {
                    line: i + 1,
                    message: e.to_string(),
                })?;
            events.push(ev);
        }
        Ok(Self::new(events))
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl PointerSource for PointerScript {
    fn poll(&mut self, frame_index: u64) -> Vec<PointerEvent> {
        let mut out = Vec::new();
        while self.pending.front().is_some_and(|e| e.frame <= frame_index) {
            if let Some(e) = self.pending.pop_front() {
                out.push(e.event());
            }
        }
        out
    }
}
