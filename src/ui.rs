//! Collaborator interfaces
//!
//! The dispatcher does not draw anything or touch partitions itself. It
//! calls out through these traits, which the enclosing program implements.

use anyhow::Result;

/// Screen-side operations: text log, dialog, framebuffer geometry
///
/// Called from the event thread (dialog, toggle) and from the long-press
/// timer, so implementations need interior mutability.
pub trait RecoveryUi: Send + Sync {
    /// Show or hide the text log
    fn show_text(&self, visible: bool);
    fn is_text_visible(&self) -> bool;
    /// Append a line to the text log
    fn print(&self, text: &str);

    /// Show an informational dialog
    fn dialog_show_info(&self, text: &str);
    fn dialog_dismiss(&self);
    fn dialog_showing(&self) -> bool;
    /// Whether a key press may dismiss the current dialog
    fn dialog_dismissable(&self) -> bool;

    fn fb_width(&self) -> u32;
    fn fb_height(&self) -> u32;
}

/// Device-side side effects triggered by key chords
pub trait SystemActions: Send + Sync {
    /// Ask the volume manager to unmount every volume
    fn unmount_all(&self);
    /// Mount a partition by its mount point
    fn mount(&self, mount_point: &str) -> Result<()>;
    /// Restart the device
    fn reboot(&self) -> Result<()>;
}
