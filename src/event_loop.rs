//! Event multiplexer
//!
//! A fixed-capacity table of descriptors, each with its own callback.
//! `wait_and_dispatch` blocks in poll(2) and hands every ready descriptor's
//! revents to its callback. Callbacks own whatever the descriptor belongs
//! to (device, socket client), so dropping a registration closes it.
//!
//! Callbacks receive a shared context `C` plus a `Registrar` through which
//! they can add new descriptors (accepted socket clients). Additions take
//! effect after the current dispatch pass.

use log::{debug, trace, warn};
use std::os::unix::io::RawFd;
use std::time::Duration;
use thiserror::Error;

use crate::constants::MAX_EVENT_SOURCES;

pub use libc::{POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLPRI};

/// What a callback wants done with its registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    Remove,
}

pub type Callback<C> = Box<dyn FnMut(&mut C, &mut Registrar<C>, i16) -> Disposition + Send>;

#[derive(Debug, Error)]
pub enum EventLoopError {
    #[error("event table full ({0} descriptors)")]
    TableFull(usize),
    #[error("descriptor {0} already registered")]
    Duplicate(RawFd),
    #[error("poll failed: {0}")]
    Poll(std::io::Error),
}

struct Source<C> {
    fd: RawFd,
    events: i16,
    callback: Callback<C>,
}

/// Registrations queued from inside a callback
pub struct Registrar<C> {
    pending: Vec<Source<C>>,
}

impl<C> Default for Registrar<C> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl<C> Registrar<C> {
    pub fn register(&mut self, fd: RawFd, events: i16, callback: Callback<C>) {
        self.pending.push(Source {
            fd,
            events,
            callback,
        });
    }
}

pub struct EventLoop<C> {
    sources: Vec<Source<C>>,
    capacity: usize,
}

impl<C> Default for EventLoop<C> {
    fn default() -> Self {
        Self::with_capacity(MAX_EVENT_SOURCES)
    }
}

impl<C> EventLoop<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sources: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn contains(&self, fd: RawFd) -> bool {
        self.sources.iter().any(|s| s.fd == fd)
    }

    /// Watch `fd` for `events`
    ///
    /// On error the callback (and whatever it owns) is dropped.
    pub fn register(
        &mut self,
        fd: RawFd,
        events: i16,
        callback: Callback<C>,
    ) -> Result<(), EventLoopError> {
        if self.sources.len() >= self.capacity {
            return Err(EventLoopError::TableFull(self.capacity));
        }
        if self.contains(fd) {
            return Err(EventLoopError::Duplicate(fd));
        }
        trace!("register fd {} events {:#x}", fd, events);
        self.sources.push(Source {
            fd,
            events,
            callback,
        });
        Ok(())
    }

    /// Stop watching `fd`, dropping its callback. Returns false if unknown.
    pub fn unregister(&mut self, fd: RawFd) -> bool {
        match self.sources.iter().position(|s| s.fd == fd) {
            Some(idx) => {
                trace!("unregister fd {}", fd);
                self.sources.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Block until something is ready (or `timeout`), then dispatch
    ///
    /// Returns how many callbacks ran. An interrupted poll returns Ok(0).
    pub fn wait_and_dispatch(
        &mut self,
        ctx: &mut C,
        timeout: Option<Duration>,
    ) -> Result<usize, EventLoopError> {
        let mut fds: Vec<libc::pollfd> = self
            .sources
            .iter()
            .map(|s| libc::pollfd {
                fd: s.fd,
                events: s.events,
                revents: 0,
            })
            .collect();
        let timeout_ms = match timeout {
            Some(t) => t.as_millis().min(i32::MAX as u128) as libc::c_int,
            None => -1,
        };

        let ret = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
        if ret < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                return Ok(0);
            }
            return Err(EventLoopError::Poll(err));
        }
        if ret == 0 {
            return Ok(0);
        }

        let mut registrar = Registrar::default();
        let mut finished = Vec::new();
        let mut dispatched = 0;
        // `sources` is untouched until the pass completes, so indices line up
        for (source, pfd) in self.sources.iter_mut().zip(fds.iter()) {
            if pfd.revents == 0 {
                continue;
            }
            dispatched += 1;
            if pfd.revents & POLLNVAL != 0 {
                warn!("fd {} is not open, dropping it", source.fd);
                finished.push(source.fd);
                continue;
            }
            if (source.callback)(ctx, &mut registrar, pfd.revents) == Disposition::Remove {
                finished.push(source.fd);
            }
        }

        for fd in finished {
            self.unregister(fd);
        }
        for source in registrar.pending {
            let fd = source.fd;
            if let Err(e) = self.register(fd, source.events, source.callback) {
                warn!("cannot watch fd {}: {}", fd, e);
            }
        }
        debug_assert!(self.sources.len() <= self.capacity);
        if dispatched > 0 {
            trace!("dispatched {} of {} sources", dispatched, self.sources.len());
        }
        Ok(dispatched)
    }
}

impl<C> Drop for EventLoop<C> {
    fn drop(&mut self) {
        if !self.sources.is_empty() {
            debug!("event loop dropped with {} sources", self.sources.len());
        }
    }
}
