//! Global constants for recovery-input
//!
//! Consolidates timing and threshold constants
//! to eliminate magic numbers throughout the codebase.

use std::time::Duration;

// ============================================================================
// Timing Constants
// ============================================================================

/// A key held this long from its down edge counts as a long press
pub const LONG_PRESS_MS: u64 = 750;

/// Total time `wait_key` waits for input before giving up
/// (extended while a USB cable is connected)
pub const WAIT_KEY_TIMEOUT_SECS: u64 = 120;

/// Condition-variable slice used by `wait_key`; every wake re-checks
/// the volumes-changed flag and the USB cable
pub const WAIT_KEY_SLICE: Duration = Duration::from_secs(1);

/// Upper bound for the USB probe cache; the waiter must still notice a
/// cable change within one slice
pub const MAX_USB_PROBE_TTL_MS: u64 = 999;

// ============================================================================
// Queue / Table Sizes
// ============================================================================

/// Default capacity of the foreground key FIFO
pub const KEY_QUEUE_CAPACITY: usize = 256;

/// Maximum number of input devices opened at init
pub const MAX_INPUT_DEVICES: usize = 16;

/// Maximum number of descriptors the event loop watches
/// (input devices + control socket listener and clients + mount watcher)
pub const MAX_EVENT_SOURCES: usize = 32;

/// Pause before polling again after a failed poll(2)
pub const POLL_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Number of input_event records drained per readiness notification
pub const INPUT_READ_BATCH: usize = 64;

/// Control socket read buffer size (one command per read)
pub const CONTROL_READ_BUFFER: usize = 256;

// ============================================================================
// Policy Constants
// ============================================================================

/// Consecutive power registrations that trigger a reboot
pub const POWER_PRESSES_TO_REBOOT: u32 = 7;

/// Consecutive alternating volume registrations that mount /system
pub const ALTERNATE_PRESSES_TO_MOUNT: u32 = 7;

/// Trackball REL_Y sum that synthesizes an up/down key
pub const TRACKBALL_THRESHOLD: i32 = 3;

// ============================================================================
// Gesture Constants
// ============================================================================

/// Horizontal swipe length in inches
pub const SWIPE_X_INCHES: f32 = 0.5;

/// Vertical swipe length in inches
pub const SWIPE_Y_INCHES: f32 = 0.3;

/// Horizontal swipe threshold when display density is unknown
pub const DEFAULT_MIN_SWIPE_X_PX: i32 = 100;

/// Vertical swipe threshold when display density is unknown
pub const DEFAULT_MIN_SWIPE_Y_PX: i32 = 80;

// ============================================================================
// Paths
// ============================================================================

/// android_usb gadget state ("CONNECTED" / "CONFIGURED" / "DISCONNECTED")
pub const USB_STATE_PATH: &str = "/sys/class/android_usb/android0/state";

/// System property holding the display density in dpi
pub const LCD_DENSITY_PROPERTY: &str = "ro.sf.lcd_density";

/// Default control socket (leading '@' = abstract namespace)
pub const CONTROL_SOCKET_NAME: &str = "@recovery";

/// Mount table; POLLPRI fires whenever it changes
pub const MOUNTS_PATH: &str = "/proc/self/mounts";

/// Derive a swipe threshold in pixels from a display density
#[inline]
pub fn swipe_threshold_px(inches: f32, dpi: u32) -> i32 {
    (inches * dpi as f32).round() as i32
}
