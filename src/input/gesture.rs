//! Swipe recognition on multi-touch screens
//!
//! Accumulates ABS_MT position deltas (scaled to framebuffer pixels) between
//! sync points and turns a long enough swipe into one of the four logical
//! keys: down = volume-down, up = volume-up, right = power, left = back.

use log::{debug, trace};

use super::event::InputEvent;
use super::evdev::AbsAxes;
use super::keycodes::{
    ABS_MT_POSITION_X, ABS_MT_POSITION_Y, BTN_TOUCH, EV_ABS, EV_KEY, EV_SYN, KEY_BACK, KEY_POWER,
    KEY_VOLUMEDOWN, KEY_VOLUMEUP, SYN_MT_REPORT,
};
use crate::constants::{
    swipe_threshold_px, DEFAULT_MIN_SWIPE_X_PX, DEFAULT_MIN_SWIPE_Y_PX, SWIPE_X_INCHES,
    SWIPE_Y_INCHES,
};

/// Minimum swipe lengths in framebuffer pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwipeThresholds {
    pub min_dx: i32,
    pub min_dy: i32,
}

impl SwipeThresholds {
    /// Derive from display density (dpi); None or 0 selects the fallbacks
    pub fn from_density(dpi: Option<u32>, fallback: SwipeThresholds) -> Self {
        match dpi {
            Some(dpi) if dpi > 0 => Self {
                min_dx: swipe_threshold_px(SWIPE_X_INCHES, dpi),
                min_dy: swipe_threshold_px(SWIPE_Y_INCHES, dpi),
            },
            _ => fallback,
        }
    }
}

impl Default for SwipeThresholds {
    fn default() -> Self {
        Self {
            min_dx: DEFAULT_MIN_SWIPE_X_PX,
            min_dy: DEFAULT_MIN_SWIPE_Y_PX,
        }
    }
}

/// Per-gesture touch state
#[derive(Debug)]
pub struct GestureRecognizer {
    thresholds: SwipeThresholds,
    fb_width: i32,
    fb_height: i32,
    /// Position reported since the last sync
    in_touch: bool,
    dx: i32,
    dy: i32,
    last_x: Option<i32>,
    last_y: Option<i32>,
    /// BTN_TOUCH contacts currently down
    contacts: u32,
    /// Device maxima, queried once on the first ABS event
    max_x: Option<i32>,
    max_y: Option<i32>,
    axes_queried: bool,
}

impl GestureRecognizer {
    pub fn new(thresholds: SwipeThresholds, fb_width: u32, fb_height: u32) -> Self {
        Self {
            thresholds,
            fb_width: fb_width as i32,
            fb_height: fb_height as i32,
            in_touch: false,
            dx: 0,
            dy: 0,
            last_x: None,
            last_y: None,
            contacts: 0,
            max_x: None,
            max_y: None,
            axes_queried: false,
        }
    }

    /// Feed one event; returns the key a completed swipe maps to
    pub fn process(&mut self, ev: &InputEvent, axes: &dyn AbsAxes) -> Option<u16> {
        match (ev.kind, ev.code) {
            (EV_KEY, BTN_TOUCH) => {
                if ev.value != 0 {
                    self.contacts += 1;
                } else {
                    self.contacts = self.contacts.saturating_sub(1);
                }
                if self.contacts == 0 {
                    self.reset();
                }
                None
            }
            (EV_ABS, ABS_MT_POSITION_X) => {
                self.query_axes(axes);
                self.in_touch = true;
                let x = scale(ev.value, self.max_x, self.fb_width);
                if let Some(prev) = self.last_x {
                    self.dx = self.dx.saturating_add(x.saturating_sub(prev));
                }
                self.last_x = Some(x);
                None
            }
            (EV_ABS, ABS_MT_POSITION_Y) => {
                self.query_axes(axes);
                self.in_touch = true;
                let y = scale(ev.value, self.max_y, self.fb_height);
                if let Some(prev) = self.last_y {
                    self.dy = self.dy.saturating_add(y.saturating_sub(prev));
                }
                self.last_y = Some(y);
                None
            }
            (EV_SYN, code) => self.sync(code),
            _ => None,
        }
    }

    fn sync(&mut self, code: u16) -> Option<u16> {
        if !self.in_touch && code == SYN_MT_REPORT {
            self.reset();
            return None;
        }
        self.in_touch = false;
        trace!("swipe: dx={} dy={}", self.dx, self.dy);

        let t = self.thresholds;
        let key = if self.dy > t.min_dy {
            KEY_VOLUMEDOWN
        } else if self.dy < -t.min_dy {
            KEY_VOLUMEUP
        } else if self.dx > t.min_dx {
            KEY_POWER
        } else if self.dx < -t.min_dx {
            KEY_BACK
        } else {
            return None;
        };
        debug!("swipe recognised (dx={}, dy={}) -> key {}", self.dx, self.dy, key);
        self.reset();
        Some(key)
    }

    fn query_axes(&mut self, axes: &dyn AbsAxes) {
        if self.axes_queried {
            return;
        }
        self.axes_queried = true;
        self.max_x = axes.abs_max(ABS_MT_POSITION_X).filter(|&m| m > 0);
        self.max_y = axes.abs_max(ABS_MT_POSITION_Y).filter(|&m| m > 0);
        if self.max_x.is_none() || self.max_y.is_none() {
            debug!("touch maxima unknown, treating positions as pixels");
        }
    }

    /// Clear accumulated deltas and last positions
    pub fn reset(&mut self) {
        self.dx = 0;
        self.dy = 0;
        self.last_x = None;
        self.last_y = None;
    }
}

/// Map a raw axis value into framebuffer pixels
///
/// Unknown maxima or framebuffer size leave the value as is.
fn scale(value: i32, max: Option<i32>, extent: i32) -> i32 {
    match max {
        Some(max) if extent > 0 => {
            let px = value as i64 * extent as i64 / max as i64;
            px.clamp(i32::MIN as i64, i32::MAX as i64) as i32
        }
        _ => value,
    }
}
