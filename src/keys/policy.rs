//! Key policy
//!
//! Decides what a registered key does. Devices replace `DefaultPolicy` with
//! their own implementation of `KeyPolicy`.

use log::info;

use super::queue::KeyQueue;
use crate::constants::{ALTERNATE_PRESSES_TO_MOUNT, POWER_PRESSES_TO_REBOOT};
use crate::input::keycodes::{is_volume_key, KEY_POWER, KEY_VOLUMEUP};

/// Outcome of `KeyPolicy::check_key`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Ignore,
    /// Toggle text log visibility
    Toggle,
    /// Unmount everything and restart
    Reboot,
    /// Hand the key to the foreground
    Enqueue,
    /// Mount the system partition
    MountSystem,
}

/// Read access to which keys are currently held
pub trait HeldKeys {
    fn is_pressed(&self, code: u16) -> bool;
}

impl HeldKeys for KeyQueue {
    fn is_pressed(&self, code: u16) -> bool {
        KeyQueue::is_pressed(self, code)
    }
}

/// Device hooks around key registration
///
/// `check_key` and `next_check_key_is_long` run on the event thread;
/// `key_long_press` runs on the long-press timer thread.
pub trait KeyPolicy: Send {
    /// Called once per registered key, right before `check_key`
    fn next_check_key_is_long(&mut self, _is_long_press: bool) {}

    fn check_key(&mut self, key: u16, held: &dyn HeldKeys) -> KeyAction;

    /// A key has been held past the long-press threshold
    fn key_long_press(&mut self, _key: u16) {}
}

/// Policy for devices with power, volume-up and volume-down keys
///
/// - Hold power and press volume-up to toggle the text log.
/// - Press power seven times in a row to reboot.
/// - Alternate volume-up and volume-down seven times to mount /system.
#[derive(Debug, Default)]
pub struct DefaultPolicy {
    last_key: Option<u16>,
    consecutive_power: u32,
    consecutive_alternate: u32,
}

impl DefaultPolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyPolicy for DefaultPolicy {
    fn check_key(&mut self, key: u16, held: &dyn HeldKeys) -> KeyAction {
        if held.is_pressed(KEY_POWER) && key == KEY_VOLUMEUP {
            return KeyAction::Toggle;
        }

        if key == KEY_POWER {
            self.consecutive_power += 1;
            if self.consecutive_power >= POWER_PRESSES_TO_REBOOT {
                info!("power pressed {} times, rebooting", self.consecutive_power);
                return KeyAction::Reboot;
            }
        } else {
            self.consecutive_power = 0;
        }

        let alternates = is_volume_key(key)
            && match self.last_key {
                None => true,
                Some(last) => is_volume_key(last) && last != key,
            };
        if alternates {
            self.consecutive_alternate += 1;
            if self.consecutive_alternate >= ALTERNATE_PRESSES_TO_MOUNT {
                self.consecutive_alternate = 0;
                return KeyAction::MountSystem;
            }
        } else {
            self.consecutive_alternate = 0;
        }
        self.last_key = Some(key);

        KeyAction::Enqueue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::keycodes::{KEY_BACK, KEY_VOLUMEDOWN};

    struct Held(Option<u16>);

    impl HeldKeys for Held {
        fn is_pressed(&self, code: u16) -> bool {
            self.0 == Some(code)
        }
    }

    const NOTHING: Held = Held(None);

    #[test]
    fn test_seven_powers_reboot() {
        let mut p = DefaultPolicy::new();
        for _ in 0..6 {
            assert_eq!(p.check_key(KEY_POWER, &NOTHING), KeyAction::Enqueue);
        }
        assert_eq!(p.check_key(KEY_POWER, &NOTHING), KeyAction::Reboot);
    }

    #[test]
    fn test_other_key_resets_power_count() {
        let mut p = DefaultPolicy::new();
        for _ in 0..6 {
            p.check_key(KEY_POWER, &NOTHING);
        }
        assert_eq!(p.check_key(KEY_VOLUMEDOWN, &NOTHING), KeyAction::Enqueue);
        for _ in 0..6 {
            assert_eq!(p.check_key(KEY_POWER, &NOTHING), KeyAction::Enqueue);
        }
    }

    #[test]
    fn test_alternating_volume_mounts_system() {
        let mut p = DefaultPolicy::new();
        let seq = [
            KEY_VOLUMEUP,
            KEY_VOLUMEDOWN,
            KEY_VOLUMEUP,
            KEY_VOLUMEDOWN,
            KEY_VOLUMEUP,
            KEY_VOLUMEDOWN,
        ];
        for key in seq {
            assert_eq!(p.check_key(key, &NOTHING), KeyAction::Enqueue);
        }
        assert_eq!(p.check_key(KEY_VOLUMEUP, &NOTHING), KeyAction::MountSystem);
        // Counter cleared after firing
        assert_eq!(p.check_key(KEY_VOLUMEDOWN, &NOTHING), KeyAction::Enqueue);
    }

    #[test]
    fn test_broken_alternation_resets() {
        let mut p = DefaultPolicy::new();
        for key in [KEY_VOLUMEUP, KEY_VOLUMEDOWN, KEY_VOLUMEUP, KEY_VOLUMEDOWN] {
            p.check_key(key, &NOTHING);
        }
        // Repeated volume-down breaks the chain
        p.check_key(KEY_VOLUMEDOWN, &NOTHING);
        let mut results = Vec::new();
        for key in [KEY_VOLUMEUP, KEY_VOLUMEDOWN, KEY_VOLUMEUP, KEY_VOLUMEDOWN, KEY_VOLUMEUP] {
            results.push(p.check_key(key, &NOTHING));
        }
        assert!(results.iter().all(|&a| a == KeyAction::Enqueue));
    }

    #[test]
    fn test_power_held_volume_up_toggles() {
        let mut p = DefaultPolicy::new();
        assert_eq!(p.check_key(KEY_VOLUMEUP, &Held(Some(KEY_POWER))), KeyAction::Toggle);
        // Volume-down while power is held is an ordinary key
        assert_eq!(
            p.check_key(KEY_VOLUMEDOWN, &Held(Some(KEY_POWER))),
            KeyAction::Enqueue
        );
    }

    #[test]
    fn test_unrelated_keys_enqueue() {
        let mut p = DefaultPolicy::new();
        assert_eq!(p.check_key(KEY_BACK, &NOTHING), KeyAction::Enqueue);
    }
}
