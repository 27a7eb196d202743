//! Interactive zone setup: click a drum's center, drag out its radius,
//! release to commit, once per drum name in kit order.

use crate::types::{Point, PointerEvent};
use crate::zone::Zone;
use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneState {
    AwaitingClick,
    /// Pointer is down; `radius` is the live preview, not yet committed.
    Dragging { center: Point, radius: u32 },
    Done,
}

/// What a pointer event did to the calibrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneStep {
    Ignored,
    Started,
    Resized(u32),
    /// A zone was committed; more names remain.
    Committed,
    /// The last zone was committed.
    Completed,
}

pub struct ZoneCalibrator {
    names: Vec<String>,
    zones: Vec<Zone>,
    state: ZoneState,
    width: u32,
    height: u32,
}

impl ZoneCalibrator {
    /// `names` is the fixed, ordered drum set; zone masks are sized to
    /// `width`×`height`.
    pub fn new(names: Vec<String>, width: u32, height: u32) -> Self {
        let state = if names.is_empty() {
            ZoneState::Done
        } else {
            ZoneState::AwaitingClick
        };
        Self {
            names,
            zones: Vec::new(),
            state,
            width,
            height,
        }
    }

    pub fn state(&self) -> ZoneState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ZoneState::Done
    }

    /// The drum whose zone is being defined, if any remain.
    pub fn current_drum(&self) -> Option<&str> {
        self.names.get(self.zones.len()).map(String::as_str)
    }

    /// Center and radius of the zone being dragged out.
    pub fn preview(&self) -> Option<(Point, u32)> {
        match self.state {
            ZoneState::Dragging { center, radius } => Some((center, radius)),
            _ => None,
        }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn into_zones(self) -> Vec<Zone> {
        self.zones
    }

    pub fn handle(&mut self, event: PointerEvent) -> ZoneStep {
        match (self.state, event) {
            (ZoneState::AwaitingClick, PointerEvent::Down(p)) => {
                if self.current_drum().is_none() {
                    return ZoneStep::Ignored;
                }
                self.state = ZoneState::Dragging { center: p, radius: 0 };
                ZoneStep::Started
            }
            (ZoneState::Dragging { center, .. }, PointerEvent::Move(q)) => {
                let radius = center.distance(q) as u32;
                self.state = ZoneState::Dragging { center, radius };
                ZoneStep::Resized(radius)
            }
            (ZoneState::Dragging { center, radius }, PointerEvent::Up(_)) => {
                self.commit(center, radius)
            }
            _ => ZoneStep::Ignored,
        }
    }

    fn commit(&mut self, center: Point, radius: u32) -> ZoneStep {
        let Some(name) = self.current_drum().map(str::to_owned) else {
            self.state = ZoneState::Done;
            return ZoneStep::Ignored;
        };

        if radius == 0 {
            debug!("Zone '{}' committed with zero radius; it will never fire", name);
        }
        info!("Zone '{}' set: center={} radius={}", name, center, radius);
        self.zones
            .push(Zone::new(name, center, radius, self.width, self.height));

        if self.zones.len() == self.names.len() {
            self.state = ZoneState::Done;
            info!("All {} zones defined", self.zones.len());
            ZoneStep::Completed
        } else {
            self.state = ZoneState::AwaitingClick;
            ZoneStep::Committed
        }
    }
}
