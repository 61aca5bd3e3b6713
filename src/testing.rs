//! In-memory collaborators for unit tests

use anyhow::{bail, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::ui::{RecoveryUi, SystemActions};
use crate::usb::CableProbe;

pub struct NoCable;

impl CableProbe for NoCable {
    fn connected(&self) -> bool {
        false
    }
}

pub struct FakeUi {
    text_visible: AtomicBool,
    dialog: Mutex<Option<String>>,
    dismissable: AtomicBool,
    printed: Mutex<Vec<String>>,
    width: u32,
    height: u32,
}

impl Default for FakeUi {
    fn default() -> Self {
        Self::with_size(480, 800)
    }
}

impl FakeUi {
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            text_visible: AtomicBool::new(false),
            dialog: Mutex::new(None),
            dismissable: AtomicBool::new(true),
            printed: Mutex::new(Vec::new()),
            width,
            height,
        }
    }

    pub fn set_dismissable(&self, dismissable: bool) {
        self.dismissable.store(dismissable, Ordering::SeqCst);
    }

    pub fn dialog_text(&self) -> Option<String> {
        self.dialog.lock().unwrap().clone()
    }

    pub fn printed(&self) -> Vec<String> {
        self.printed.lock().unwrap().clone()
    }
}

impl RecoveryUi for FakeUi {
    fn show_text(&self, visible: bool) {
        self.text_visible.store(visible, Ordering::SeqCst);
    }

    fn is_text_visible(&self) -> bool {
        self.text_visible.load(Ordering::SeqCst)
    }

    fn print(&self, text: &str) {
        self.printed.lock().unwrap().push(text.to_string());
    }

    fn dialog_show_info(&self, text: &str) {
        *self.dialog.lock().unwrap() = Some(text.to_string());
    }

    fn dialog_dismiss(&self) {
        *self.dialog.lock().unwrap() = None;
    }

    fn dialog_showing(&self) -> bool {
        self.dialog.lock().unwrap().is_some()
    }

    fn dialog_dismissable(&self) -> bool {
        self.dismissable.load(Ordering::SeqCst)
    }

    fn fb_width(&self) -> u32 {
        self.width
    }

    fn fb_height(&self) -> u32 {
        self.height
    }
}

#[derive(Default)]
pub struct FakeSystem {
    unmounts: AtomicUsize,
    reboots: AtomicUsize,
    mounted: Mutex<Vec<String>>,
    fail_mount: AtomicBool,
}

impl FakeSystem {
    pub fn unmounts(&self) -> usize {
        self.unmounts.load(Ordering::SeqCst)
    }

    pub fn reboots(&self) -> usize {
        self.reboots.load(Ordering::SeqCst)
    }

    pub fn mounted(&self) -> Vec<String> {
        self.mounted.lock().unwrap().clone()
    }

    pub fn set_fail_mount(&self, fail: bool) {
        self.fail_mount.store(fail, Ordering::SeqCst);
    }
}

impl SystemActions for FakeSystem {
    fn unmount_all(&self) {
        self.unmounts.fetch_add(1, Ordering::SeqCst);
    }

    fn mount(&self, mount_point: &str) -> Result<()> {
        if self.fail_mount.load(Ordering::SeqCst) {
            bail!("mount {} refused", mount_point);
        }
        self.mounted.lock().unwrap().push(mount_point.to_string());
        Ok(())
    }

    fn reboot(&self) -> Result<()> {
        self.reboots.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
