//! Tempo map with optional linear interpolation between markers.
//!
//! Markers are stored in insertion order. "Next" is an order relation on x,
//! so every mutation ends with [`TempoMap::reindex_next_links`].

use crate::control::BoundedInt;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

static MARKER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Lowest tempo a marker can hold.
pub const MIN_BPM: i32 = 20;
/// Highest tempo a marker can hold.
pub const MAX_BPM: i32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerId(u64);

impl MarkerId {
    pub fn new() -> Self {
        Self(MARKER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for MarkerId {
    fn default() -> Self {
        Self::new()
    }
}

/// A tempo change at a grid position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoMarker {
    pub id: MarkerId,
    pub bpm: BoundedInt,
    pub x: f64,
    /// Interpolate toward the next marker.
    pub connected: bool,
    next: Option<MarkerId>,
}

impl TempoMarker {
    /// The marker this one interpolates toward, if connected.
    pub fn next(&self) -> Option<MarkerId> {
        self.next
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TempoMap {
    markers: Vec<TempoMarker>,
}

impl TempoMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(&self) -> &[TempoMarker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn get(&self, id: MarkerId) -> Option<&TempoMarker> {
        self.markers.iter().find(|m| m.id == id)
    }

    fn get_mut(&mut self, id: MarkerId) -> Option<&mut TempoMarker> {
        self.markers.iter_mut().find(|m| m.id == id)
    }

    /// Adds a marker. The bpm clamps to 20-300.
    pub fn insert(&mut self, bpm: i32, x: f64, connected: bool) -> MarkerId {
        let marker = TempoMarker {
            id: MarkerId::new(),
            bpm: BoundedInt::new(bpm, MIN_BPM, MAX_BPM),
            x,
            connected,
            next: None,
        };
        let id = marker.id;
        debug!(marker = id.as_u64(), bpm = marker.bpm.value(), x, "tempo marker added");
        self.markers.push(marker);
        self.reindex_next_links();
        id
    }

    pub fn delete(&mut self, id: MarkerId) -> Option<TempoMarker> {
        let pos = self.markers.iter().position(|m| m.id == id)?;
        let removed = self.markers.remove(pos);
        self.reindex_next_links();
        debug!(marker = id.as_u64(), "tempo marker deleted");
        Some(removed)
    }

    /// Moves a marker to `x`.
    ///
    /// # Returns
    ///
    /// true if the position changed
    pub fn move_to(&mut self, id: MarkerId, x: f64) -> bool {
        let Some(marker) = self.get_mut(id) else {
            return false;
        };
        if marker.x == x {
            return false;
        }
        marker.x = x;
        self.reindex_next_links();
        true
    }

    /// Flips the `connected` flag, returning the new value.
    pub fn toggle_connected(&mut self, id: MarkerId) -> Option<bool> {
        let marker = self.get_mut(id)?;
        marker.connected = !marker.connected;
        let connected = marker.connected;
        self.reindex_next_links();
        Some(connected)
    }

    /// Steps a marker's bpm by `amount` in the direction of `delta`.
    pub fn adjust_bpm(&mut self, id: MarkerId, delta: i32, amount: i32) -> Option<i32> {
        let marker = self.get_mut(id)?;
        Some(marker.bpm.step(delta, amount))
    }

    /// Recomputes every connected marker's successor: the marker with the
    /// smallest x strictly greater than its own.
    pub fn reindex_next_links(&mut self) {
        let positions: Vec<(MarkerId, f64)> = self.markers.iter().map(|m| (m.id, m.x)).collect();
        for marker in &mut self.markers {
            marker.next = if marker.connected {
                positions
                    .iter()
                    .filter(|(_, x)| *x > marker.x)
                    .fold(None::<(MarkerId, f64)>, |best, &(id, x)| match best {
                        Some((_, bx)) if bx <= x => best,
                        _ => Some((id, x)),
                    })
                    .map(|(id, _)| id)
            } else {
                None
            };
        }
    }

    /// Tempo in effect at `x`.
    ///
    /// Uses the nearest marker at or before `x`; if it is connected and has
    /// a successor, the bpm is interpolated linearly between the two.
    /// Returns `fallback` when no marker precedes `x`.
    pub fn effective_tempo(&self, x: f64, fallback: f64) -> f64 {
        let mut nearest: Option<&TempoMarker> = None;
        for marker in self.markers.iter().filter(|m| m.x <= x) {
            match nearest {
                Some(best) if x - best.x <= x - marker.x => {}
                _ => nearest = Some(marker),
            }
        }
        let Some(marker) = nearest else {
            return fallback;
        };
        let bpm = marker.bpm.value() as f64;
        match marker.next.and_then(|id| self.get(id)) {
            Some(next) if marker.connected => {
                let distance = x - marker.x;
                let segment = next.x - marker.x;
                bpm + (distance / segment) * (next.bpm.value() as f64 - bpm)
            }
            _ => bpm,
        }
    }
}
