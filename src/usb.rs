//! USB cable presence
//!
//! The android_usb gadget exposes its state as text in sysfs. The first
//! byte is 'C' for both CONNECTED and CONFIGURED.

use log::{debug, warn};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::constants::MAX_USB_PROBE_TTL_MS;

/// Answers "is a USB cable plugged in right now?"
pub trait CableProbe: Send + Sync {
    fn connected(&self) -> bool;
}

/// Probe backed by the android_usb sysfs state file
pub struct UsbCable {
    path: PathBuf,
    ttl: Duration,
    /// Last probe result and when it was taken
    cache: Mutex<Option<(Instant, bool)>>,
}

impl UsbCable {
    /// `ttl_ms` caches results; clamped below one second so that `wait_key`
    /// still sees a change within one wake slice
    pub fn new<P: AsRef<Path>>(path: P, ttl_ms: u64) -> Self {
        let ttl_ms = if ttl_ms > MAX_USB_PROBE_TTL_MS {
            warn!(
                "usb_probe_ttl_ms={} too large, clamping to {}",
                ttl_ms, MAX_USB_PROBE_TTL_MS
            );
            MAX_USB_PROBE_TTL_MS
        } else {
            ttl_ms
        };
        Self {
            path: path.as_ref().to_path_buf(),
            ttl: Duration::from_millis(ttl_ms),
            cache: Mutex::new(None),
        }
    }

    fn probe(&self) -> bool {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) => {
                debug!("failed to open {}: {}", self.path.display(), e);
                return false;
            }
        };
        let mut buf = [0u8; 1];
        matches!(file.read(&mut buf), Ok(1) if buf[0] == b'C')
    }
}

impl CableProbe for UsbCable {
    fn connected(&self) -> bool {
        if self.ttl.is_zero() {
            return self.probe();
        }
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some((at, value)) = *cache {
            if at.elapsed() < self.ttl {
                return value;
            }
        }
        let value = self.probe();
        *cache = Some((Instant::now(), value));
        value
    }
}
