//! recovery-input - input event dispatcher for a recovery console
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────── event thread ──────────────────────────┐
//! │  evdev fds ─┐                                                    │
//! │  control  ──┼─► EventLoop ─► gesture ─► trackball ─► KeyPipeline │
//! │  mounts   ──┘                                    │               │
//! └──────────────────────────────────────────────────┼───────────────┘
//!                                                    ▼
//!        long-press timer ─► KeyPolicy         KeyQueue ◄─ wait_key()
//!                                                      (foreground)
//! ```
//!
//! The renderer, volume manager and reboot primitive stay outside: the
//! dispatcher reaches them through [`RecoveryUi`] and [`SystemActions`].

pub mod config;
pub mod constants;
pub mod control;
pub mod dispatcher;
pub mod event_loop;
pub mod input;
pub mod keys;
pub mod properties;
pub mod ui;
pub mod usb;
pub mod volumes;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use dispatcher::{resolve_thresholds, Dispatcher, Sources};
pub use event_loop::{EventLoop, EventLoopError};
pub use keys::{
    DefaultPolicy, HeldKeys, KeyAction, KeyInput, KeyPolicy, KeyQueue, CANCEL, NO_KEY, REFRESH,
};
pub use ui::{RecoveryUi, SystemActions};
pub use usb::{CableProbe, UsbCable};
