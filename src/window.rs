//! Desktop window display using `minifb`.
//!
//! The window is exactly frame-sized, so mouse coordinates are frame
//! coordinates. Mouse button state is diffed between frames to produce
//! down/move/up events; `q` or Escape (or closing the window) asks to quit.

use crate::error::{DrumError, DrumResult};
use crate::overlay::{rasterize, DisplaySink, Overlay};
use crate::types::{Point, PointerEvent};
use image::RgbImage;
use log::{info, warn};
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

pub struct DrumWindow {
    window: Window,
    buf: Vec<u32>,
    width: usize,
    height: usize,
    was_down: bool,
    last_pos: Option<Point>,
    quit: bool,
}

impl DrumWindow {
    pub fn open(title: &str, width: u32, height: u32) -> DrumResult<Self> {
        let (w, h) = (width as usize, height as usize);
        let window = Window::new(
            title,
            w,
            h,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| DrumError::Display(e.to_string()))?;
        info!("Window open: {}x{}", width, height);

        Ok(Self {
            window,
            buf: vec![0; w * h],
            width: w,
            height: h,
            was_down: false,
            last_pos: None,
            quit: false,
        })
    }
}

impl DisplaySink for DrumWindow {
    fn show(&mut self, frame: &RgbImage, overlay: &Overlay) {
        let mut annotated = frame.clone();
        rasterize(&mut annotated, overlay);
        for (dst, px) in self.buf.iter_mut().zip(annotated.pixels()) {
            let [r, g, b] = px.0;
            *dst = 0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32;
        }
        if let Err(e) = self
            .window
            .update_with_buffer(&self.buf, self.width, self.height)
        {
            warn!("Window update failed: {}", e);
            self.quit = true;
        }

        if !self.window.is_open()
            || self.window.is_key_pressed(Key::Q, KeyRepeat::No)
            || self.window.is_key_pressed(Key::Escape, KeyRepeat::No)
        {
            self.quit = true;
        }
    }

    fn poll_events(&mut self) -> Vec<PointerEvent> {
        let mut events = Vec::new();
        let pos = self
            .window
            .get_mouse_pos(MouseMode::Discard)
            .map(|(x, y)| Point::new(x as i32, y as i32));
        let down = self.window.get_mouse_down(MouseButton::Left);

        match (self.was_down, down, pos) {
            (false, true, Some(p)) => events.push(PointerEvent::Down(p)),
            (true, true, Some(p)) if Some(p) != self.last_pos => {
                events.push(PointerEvent::Move(p))
            }
            // Released outside the window: finish at the last known spot
            (true, false, p) => {
                if let Some(p) = p.or(self.last_pos) {
                    events.push(PointerEvent::Up(p));
                }
            }
            _ => {}
        }

        self.was_down = down;
        if pos.is_some() {
            self.last_pos = pos;
        }
        events
    }

    fn quit_requested(&self) -> bool {
        self.quit
    }

    fn close(&mut self) {
        info!("Window closed");
    }
}
