//! Stdout renderer
//!
//! Stands in for the graphical recovery screen: the text log goes to
//! stdout, dialogs are logged and remembered.

use log::info;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use recovery_input::RecoveryUi;

/// Framebuffer geometry as "width,height"
const FB_SIZE_PATH: &str = "/sys/class/graphics/fb0/virtual_size";

pub struct ConsoleUi {
    text_visible: AtomicBool,
    dialog: Mutex<Option<String>>,
    width: u32,
    height: u32,
}

impl ConsoleUi {
    pub fn new() -> Self {
        let (width, height) = framebuffer_size(Path::new(FB_SIZE_PATH)).unwrap_or((0, 0));
        info!("Framebuffer {}x{}", width, height);
        Self {
            text_visible: AtomicBool::new(true),
            dialog: Mutex::new(None),
            width,
            height,
        }
    }

    fn dialog(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.dialog
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for ConsoleUi {
    fn default() -> Self {
        Self::new()
    }
}

impl RecoveryUi for ConsoleUi {
    fn show_text(&self, visible: bool) {
        info!("Text log {}", if visible { "shown" } else { "hidden" });
        self.text_visible.store(visible, Ordering::Relaxed);
    }

    fn is_text_visible(&self) -> bool {
        self.text_visible.load(Ordering::Relaxed)
    }

    fn print(&self, text: &str) {
        if !self.is_text_visible() {
            return;
        }
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", text);
        let _ = out.flush();
    }

    fn dialog_show_info(&self, text: &str) {
        info!("Dialog: {}", text);
        *self.dialog() = Some(text.to_string());
    }

    fn dialog_dismiss(&self) {
        if self.dialog().take().is_some() {
            info!("Dialog dismissed");
        }
    }

    fn dialog_showing(&self) -> bool {
        self.dialog().is_some()
    }

    /// Info dialogs stay up until their owner dismisses them
    fn dialog_dismissable(&self) -> bool {
        false
    }

    fn fb_width(&self) -> u32 {
        self.width
    }

    fn fb_height(&self) -> u32 {
        self.height
    }
}

fn framebuffer_size(path: &Path) -> Option<(u32, u32)> {
    let contents = std::fs::read_to_string(path).ok()?;
    parse_size(&contents)
}

fn parse_size(contents: &str) -> Option<(u32, u32)> {
    let (w, h) = contents.trim().split_once(',')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}
