//! Foreground key queue
//!
//! Bounded FIFO shared by the event thread (producer), the long-press
//! timer and the foreground thread (consumer, blocked in `wait_key`).
//! One mutex guards the queue, the held-key table and press tracking.

use log::{debug, trace};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::constants::{KEY_QUEUE_CAPACITY, WAIT_KEY_SLICE, WAIT_KEY_TIMEOUT_SECS};
use crate::input::keycodes::KEY_MAX;
use crate::usb::CableProbe;

/// Integer form of `KeyInput::TimedOut`
pub const NO_KEY: i32 = -1;
/// Integer form of `KeyInput::Cancelled`
pub const CANCEL: i32 = -2;
/// Integer form of `KeyInput::Refresh`
pub const REFRESH: i32 = -3;

/// What `wait_key` hands back to the foreground
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// A registered key code
    Key(u16),
    /// The set of mounted volumes changed; redraw
    Refresh,
    /// `cancel_wait_key` was called
    Cancelled,
    /// No key within the timeout and no USB cable attached
    TimedOut,
}

impl KeyInput {
    /// Integer protocol: key codes as-is, sentinels negative
    pub fn code(self) -> i32 {
        match self {
            KeyInput::Key(code) => code as i32,
            KeyInput::Refresh => REFRESH,
            KeyInput::Cancelled => CANCEL,
            KeyInput::TimedOut => NO_KEY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Queued {
    Key(u16),
    Cancel,
}

/// Result of recording one key edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEdge {
    /// Down edge; `count` identifies this press for the long-press check
    Pressed { count: u64 },
    /// Clean release of the most recently pressed key
    Registered { long_press: bool },
    /// Release that does not register (another key moved in between)
    Released,
}

/// `wait_key` timing
#[derive(Debug, Clone, Copy)]
pub struct WaitConfig {
    /// Give up after this long unless a USB cable is present
    pub timeout: Duration,
    /// Re-check interval for the volume flag and the cable
    pub slice: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(WAIT_KEY_TIMEOUT_SECS),
            slice: WAIT_KEY_SLICE,
        }
    }
}

struct Inner {
    /// Held state per key code
    pressed: Vec<bool>,
    queue: VecDeque<Queued>,
    /// Most recent key that went down and has not gone up
    last_down: Option<u16>,
    /// Incremented on every down edge
    down_count: u64,
    /// Set by the timer when `last_down` has been held long enough
    long_press: bool,
}

pub struct KeyQueue {
    inner: Mutex<Inner>,
    cond: Condvar,
    capacity: usize,
    volumes_changed: AtomicBool,
    wait: WaitConfig,
    cable: Box<dyn CableProbe>,
}

impl KeyQueue {
    pub fn new(capacity: usize, wait: WaitConfig, cable: Box<dyn CableProbe>) -> Self {
        let capacity = if capacity == 0 {
            KEY_QUEUE_CAPACITY
        } else {
            capacity
        };
        Self {
            inner: Mutex::new(Inner {
                pressed: vec![false; KEY_MAX as usize + 1],
                queue: VecDeque::with_capacity(capacity),
                last_down: None,
                down_count: 0,
                long_press: false,
            }),
            cond: Condvar::new(),
            capacity,
            volumes_changed: AtomicBool::new(false),
            wait,
            cable,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push a key for the foreground. Never blocks; drops when full.
    pub fn enqueue(&self, code: u16) -> bool {
        let mut inner = self.lock();
        if inner.queue.len() >= self.capacity {
            debug!("key queue full, dropping key {}", code);
            return false;
        }
        inner.queue.push_back(Queued::Key(code));
        self.cond.notify_one();
        true
    }

    /// Make a pending (or the next) `wait_key` return `Cancelled`
    ///
    /// Queued even when the queue is full, but at most one cancel is pending.
    pub fn cancel_wait_key(&self) {
        let mut inner = self.lock();
        if !inner.queue.iter().any(|q| matches!(q, Queued::Cancel)) {
            inner.queue.push_back(Queued::Cancel);
        }
        self.cond.notify_one();
    }

    /// Drop every queued key
    pub fn flush(&self) {
        self.lock().queue.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_pressed(&self, code: u16) -> bool {
        self.lock()
            .pressed
            .get(code as usize)
            .copied()
            .unwrap_or(false)
    }

    /// Set the volumes-changed bit and wake the waiter
    pub fn notify_volumes_changed(&self) {
        self.volumes_changed.store(true, Ordering::SeqCst);
        let _inner = self.lock();
        self.cond.notify_all();
    }

    fn take_volumes_changed(&self) -> bool {
        self.volumes_changed.swap(false, Ordering::SeqCst)
    }

    /// Block until a key, a volume change, cancellation, or timeout
    ///
    /// The timeout does not expire while a USB cable is connected.
    pub fn wait_key(&self) -> KeyInput {
        let slice = self.wait.slice.max(Duration::from_millis(1));
        let mut slices_left = self.wait.timeout.as_millis().div_ceil(slice.as_millis());
        let mut inner = self.lock();

        loop {
            if self.take_volumes_changed() {
                return KeyInput::Refresh;
            }
            if let Some(item) = inner.queue.pop_front() {
                return match item {
                    Queued::Key(code) => KeyInput::Key(code),
                    Queued::Cancel => KeyInput::Cancelled,
                };
            }

            if slices_left == 0 {
                drop(inner);
                let connected = self.cable.connected();
                inner = self.lock();
                if !connected && inner.queue.is_empty() {
                    if self.take_volumes_changed() {
                        return KeyInput::Refresh;
                    }
                    return KeyInput::TimedOut;
                }
                trace!("wait_key: USB connected, extending wait");
            } else {
                slices_left -= 1;
            }

            let deadline = Instant::now() + slice;
            while inner.queue.is_empty() && !self.volumes_changed.load(Ordering::SeqCst) {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                inner = self
                    .cond
                    .wait_timeout(inner, deadline - now)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
            }
        }
    }

    /// Record a key edge and decide whether the release registers
    pub(crate) fn key_edge(&self, code: u16, down: bool) -> KeyEdge {
        let mut inner = self.lock();
        if let Some(slot) = inner.pressed.get_mut(code as usize) {
            *slot = down;
        }
        if down {
            inner.down_count += 1;
            inner.last_down = Some(code);
            inner.long_press = false;
            KeyEdge::Pressed {
                count: inner.down_count,
            }
        } else {
            let registered = inner.last_down == Some(code);
            inner.last_down = None;
            if registered {
                KeyEdge::Registered {
                    long_press: inner.long_press,
                }
            } else {
                KeyEdge::Released
            }
        }
    }

    /// Timer check: is press `count` of `code` still held?
    ///
    /// Marks the press as long when it is.
    pub(crate) fn confirm_long_press(&self, code: u16, count: u64) -> bool {
        let mut inner = self.lock();
        if inner.last_down == Some(code) && inner.down_count == count {
            inner.long_press = true;
            true
        } else {
            false
        }
    }
}
