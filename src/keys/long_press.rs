//! Long-press detection
//!
//! Every down edge schedules a check `delay` later, keyed by
//! (code, down_count). One timer thread serves all checks: every press uses
//! the same delay, so checks arrive in deadline order and a FIFO suffices.
//! A check whose press was released (or superseded) finds a different
//! down_count and does nothing.

use anyhow::{Context, Result};
use log::{debug, trace};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use super::policy::KeyPolicy;
use super::queue::KeyQueue;

struct PendingCheck {
    deadline: Instant,
    code: u16,
    count: u64,
}

/// Handle to the long-press timer thread
///
/// The thread exits once every handle is dropped and the pending checks
/// have run.
pub struct LongPressTimer {
    tx: Sender<PendingCheck>,
    delay: Duration,
}

impl LongPressTimer {
    pub fn spawn<P: KeyPolicy + 'static>(
        delay: Duration,
        queue: Arc<KeyQueue>,
        policy: Arc<Mutex<P>>,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<PendingCheck>();
        thread::Builder::new()
            .name("long-press".into())
            .spawn(move || {
                for check in rx {
                    let now = Instant::now();
                    if check.deadline > now {
                        thread::sleep(check.deadline - now);
                    }
                    if queue.confirm_long_press(check.code, check.count) {
                        debug!("long press: key {}", check.code);
                        policy
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .key_long_press(check.code);
                    } else {
                        trace!("stale long-press check for key {}", check.code);
                    }
                }
            })
            .context("Failed to spawn long-press timer thread")?;
        Ok(Self { tx, delay })
    }

    /// Schedule a check for press number `count` of `code`
    pub fn schedule(&self, code: u16, count: u64) {
        let check = PendingCheck {
            deadline: Instant::now() + self.delay,
            code,
            count,
        };
        if self.tx.send(check).is_err() {
            debug!("long-press timer gone, key {} not timed", code);
        }
    }
}
