//! Trackball motion to arrow keys
//!
//! Sums REL_Y deltas; crossing the threshold in either direction yields one
//! synthetic up or down key press and clears the sum.

use super::event::InputEvent;
use super::keycodes::{EV_REL, EV_SYN, KEY_DOWN, KEY_UP, REL_Y};

#[derive(Debug)]
pub struct TrackballAccumulator {
    sum: i32,
    threshold: i32,
}

impl TrackballAccumulator {
    pub fn new(threshold: i32) -> Self {
        Self { sum: 0, threshold }
    }

    /// Feed one event; returns a key to press and release
    ///
    /// EV_SYN leaves the sum alone, any other non-REL event clears it.
    pub fn process(&mut self, ev: &InputEvent) -> Option<u16> {
        match ev.kind {
            EV_SYN => None,
            EV_REL if ev.code == REL_Y => {
                self.sum += ev.value;
                if self.sum > self.threshold {
                    self.sum = 0;
                    Some(KEY_DOWN)
                } else if self.sum < -self.threshold {
                    self.sum = 0;
                    Some(KEY_UP)
                } else {
                    None
                }
            }
            EV_REL => None,
            _ => {
                self.sum = 0;
                None
            }
        }
    }
}
