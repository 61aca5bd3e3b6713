//! Key pipeline
//!
//! A key is *registered* when it is pressed and then released with no other
//! key pressed or released in between. Registered keys go through the
//! policy, which may toggle the text log, reboot, mount /system, or queue
//! the key for the foreground.
//!
//! Held state is tracked for every key so the policy can ask what else is
//! down when a key registers.

use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, PoisonError};

use super::long_press::LongPressTimer;
use super::policy::{KeyAction, KeyPolicy};
use super::queue::{KeyEdge, KeyQueue};
use crate::input::keycodes::{key_name, KEY_MAX};
use crate::ui::{RecoveryUi, SystemActions};

/// Queue a key unless a dialog is up
///
/// A showing dialog swallows the key; if it may be dismissed, the key
/// dismisses it.
pub fn enqueue_key(queue: &KeyQueue, ui: &dyn RecoveryUi, code: u16) {
    if ui.dialog_showing() {
        if ui.dialog_dismissable() {
            debug!("key {} dismisses dialog", code);
            ui.dialog_dismiss();
        }
        return;
    }
    queue.enqueue(code);
}

pub struct KeyPipeline<P: KeyPolicy> {
    queue: Arc<KeyQueue>,
    policy: Arc<Mutex<P>>,
    ui: Arc<dyn RecoveryUi>,
    system: Arc<dyn SystemActions>,
    timer: LongPressTimer,
    /// Mount point for `MountSystem`; None disables the action
    system_mount: Option<String>,
}

impl<P: KeyPolicy> KeyPipeline<P> {
    pub fn new(
        queue: Arc<KeyQueue>,
        policy: Arc<Mutex<P>>,
        ui: Arc<dyn RecoveryUi>,
        system: Arc<dyn SystemActions>,
        timer: LongPressTimer,
        system_mount: Option<String>,
    ) -> Self {
        Self {
            queue,
            policy,
            ui,
            system,
            timer,
            system_mount,
        }
    }

    pub fn queue(&self) -> &Arc<KeyQueue> {
        &self.queue
    }

    /// Queue a key on behalf of a translator (swipes)
    pub fn enqueue(&self, code: u16) {
        enqueue_key(&self.queue, self.ui.as_ref(), code);
    }

    /// Feed one key edge
    pub fn process_key(&mut self, code: u16, down: bool) {
        if code > KEY_MAX {
            return;
        }
        let long_press = match self.queue.key_edge(code, down) {
            KeyEdge::Pressed { count } => {
                self.timer.schedule(code, count);
                return;
            }
            KeyEdge::Released => return,
            KeyEdge::Registered { long_press } => long_press,
        };

        let action = {
            let mut policy = self.policy.lock().unwrap_or_else(PoisonError::into_inner);
            policy.next_check_key_is_long(long_press);
            policy.check_key(code, self.queue.as_ref())
        };
        debug!(
            "registered {} ({}){} -> {:?}",
            key_name(code),
            code,
            if long_press { " long" } else { "" },
            action
        );
        self.apply(action, code);
    }

    /// Synthesize a full press and release
    pub fn tap(&mut self, code: u16) {
        self.process_key(code, true);
        self.process_key(code, false);
    }

    fn apply(&self, action: KeyAction, code: u16) {
        match action {
            KeyAction::Ignore => {}
            KeyAction::Toggle => self.ui.show_text(!self.ui.is_text_visible()),
            KeyAction::Reboot => {
                info!("rebooting on key request");
                self.system.unmount_all();
                if let Err(e) = self.system.reboot() {
                    error!("reboot failed: {:#}", e);
                }
            }
            KeyAction::Enqueue => self.enqueue(code),
            KeyAction::MountSystem => match &self.system_mount {
                Some(mount_point) => match self.system.mount(mount_point) {
                    Ok(()) => self.ui.print(&format!("Mounted {}.", mount_point)),
                    Err(e) => warn!("failed to mount {}: {:#}", mount_point, e),
                },
                None => debug!("mount-system disabled"),
            },
        }
    }
}
