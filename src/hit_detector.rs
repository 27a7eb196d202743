use crate::frame_analyzer::StickMasks;
use crate::types::HitEvent;
use crate::zone::Zone;
use log::{debug, trace};

/// Stick-mask pixels inside one zone for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Occupancy {
    pub left: u32,
    pub right: u32,
}

/// Enter/release pixel counts for one zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub hit: f64,
    pub release: f64,
}

impl Thresholds {
    pub fn for_zone(zone: &Zone) -> Self {
        Self {
            hit: zone.hit_threshold(),
            release: zone.release_threshold(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Rising edge: emit one hit.
    Hit,
    /// Both sticks left the zone; re-arm without emitting.
    Release,
    Hold,
}

/// Per-zone latch: true from a hit until both sticks have left the zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HitState {
    pub is_active: bool,
}

impl HitState {
    /// Advance the latch by one frame.
    ///
    ///   - Either stick above `hit` while inactive → `Hit`
    ///   - Both sticks below `release` → inactive (`Release` if it was active)
    ///   - Anything in between → `Hold`
    pub fn update(&mut self, occ: Occupancy, th: Thresholds) -> Transition {
        let entered = occ.left as f64 > th.hit || occ.right as f64 > th.hit;
        let left_zone = (occ.left as f64) < th.release && (occ.right as f64) < th.release;

        if entered && !self.is_active {
            self.is_active = true;
            Transition::Hit
        } else if left_zone {
            let was_active = self.is_active;
            self.is_active = false;
            if was_active {
                Transition::Release
            } else {
                Transition::Hold
            }
        } else {
            Transition::Hold
        }
    }
}

/// Converts per-zone stick occupancy into discrete hit events.
///
/// # Hysteresis
///
/// Each zone has two thresholds derived from its area: a stick must cover
/// more than 5% of the zone to strike it, and both sticks must drop below
/// 2.5% before the zone can be struck again. A stick resting on the rim
/// sits inside the band and neither re-triggers nor releases.
///
/// Either stick can strike any zone. The event does not record which one.
///
/// Zones are independent: one frame can strike several zones, and events
/// come out in zone (kit) order. Zero-radius zones never fire.
pub struct HitDetector {
    states: Vec<HitState>,
}

impl HitDetector {
    /// One inactive latch per zone.
    pub fn new(zone_count: usize) -> Self {
        Self {
            states: vec![HitState::default(); zone_count],
        }
    }

    pub fn is_active(&self, zone_index: usize) -> bool {
        self.states.get(zone_index).is_some_and(|s| s.is_active)
    }

    /// Evaluate every zone against this frame's masks.
    pub fn evaluate(
        &mut self,
        zones: &[Zone],
        masks: &StickMasks,
        frame_index: u64,
        timestamp_us: u64,
    ) -> Vec<HitEvent> {
        if self.states.len() < zones.len() {
            self.states.resize(zones.len(), HitState::default());
        }

        let mut hits = Vec::new();
        for (i, zone) in zones.iter().enumerate() {
            if zone.is_degenerate() {
                continue;
            }
            let occ = Occupancy {
                left: zone.count_overlap(&masks.left),
                right: zone.count_overlap(&masks.right),
            };
            match self.states[i].update(occ, Thresholds::for_zone(zone)) {
                Transition::Hit => {
                    debug!(
                        "Hit '{}' (L={} R={} > {:.1})",
                        zone.name,
                        occ.left,
                        occ.right,
                        zone.hit_threshold()
                    );
                    hits.push(HitEvent {
                        zone_index: i,
                        drum: zone.name.clone(),
                        frame_index,
                        timestamp_us,
                    });
                }
                Transition::Release => {
                    trace!("Release '{}'", zone.name);
                }
                Transition::Hold => {}
            }
        }
        hits
    }
}
