//! evdev event and keycode constants
//!
//! Consolidates the Linux input event codes the recovery console uses.
//! Values are from <linux/input-event-codes.h>.

// ============================================================================
// Event Types
// ============================================================================

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_REL: u16 = 0x02;
pub const EV_ABS: u16 = 0x03;

// ============================================================================
// Event Codes
// ============================================================================

/// End of a full event packet
pub const SYN_REPORT: u16 = 0;

/// End of one contact in a type-A multi-touch packet
pub const SYN_MT_REPORT: u16 = 2;

/// Relative horizontal motion
pub const REL_X: u16 = 0x00;

/// Relative vertical motion (trackball)
pub const REL_Y: u16 = 0x01;

/// Multi-touch contact X position
pub const ABS_MT_POSITION_X: u16 = 0x35;

/// Multi-touch contact Y position
pub const ABS_MT_POSITION_Y: u16 = 0x36;

// ============================================================================
// Keys
// ============================================================================

/// Up arrow key
pub const KEY_UP: u16 = 103;

/// Down arrow key
pub const KEY_DOWN: u16 = 108;

/// Volume down key
pub const KEY_VOLUMEDOWN: u16 = 114;

/// Volume up key
pub const KEY_VOLUMEUP: u16 = 115;

/// Power key
pub const KEY_POWER: u16 = 116;

/// Back key
pub const KEY_BACK: u16 = 158;

/// Synthetic touch contact button
pub const BTN_TOUCH: u16 = 0x14a;

/// Highest valid key code
pub const KEY_MAX: u16 = 0x2ff;

// ============================================================================
// Helper Functions
// ============================================================================

/// Check if keycode is one of the volume keys
#[inline]
pub const fn is_volume_key(keycode: u16) -> bool {
    keycode == KEY_VOLUMEUP || keycode == KEY_VOLUMEDOWN
}

/// Short name for log lines
pub fn key_name(keycode: u16) -> &'static str {
    match keycode {
        KEY_UP => "up",
        KEY_DOWN => "down",
        KEY_VOLUMEDOWN => "volume-down",
        KEY_VOLUMEUP => "volume-up",
        KEY_POWER => "power",
        KEY_BACK => "back",
        BTN_TOUCH => "touch",
        _ => "key",
    }
}
