//! Mount table watcher
//!
//! The kernel flags /proc/self/mounts with POLLPRI (and POLLERR) whenever a
//! mount or unmount happens in our namespace. Each change wakes the
//! foreground with a refresh.

use anyhow::{Context, Result};
use log::{debug, info};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use std::sync::Arc;

use crate::event_loop::{Callback, Disposition, Registrar, POLLNVAL, POLLPRI};
use crate::keys::KeyQueue;

/// Events to register the watcher for
pub const MOUNT_EVENTS: i16 = POLLPRI;

pub struct MountWatcher {
    file: File,
}

impl MountWatcher {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_CLOEXEC)
            .open(path)
            .with_context(|| format!("Cannot open mount table {}", path.display()))?;
        info!("Watching {} for volume changes", path.display());
        Ok(Self { file })
    }

    pub fn into_callback<C: 'static>(self, queue: Arc<KeyQueue>) -> Callback<C> {
        // The registration owns the file; dropping the callback closes it
        let file = self.file;
        Box::new(move |_ctx: &mut C, _registrar: &mut Registrar<C>, revents| {
            let _keep = &file;
            if revents & POLLNVAL != 0 {
                return Disposition::Remove;
            }
            if revents & POLLPRI != 0 {
                debug!("mount table changed");
                queue.notify_volumes_changed();
            }
            Disposition::Keep
        })
    }
}

impl AsRawFd for MountWatcher {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}
