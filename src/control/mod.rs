//! Control socket
//!
//! Cooperating processes connect to a local stream socket and send
//! one-line commands that show or dismiss the on-screen dialog. A name
//! starting with '@' is bound in the abstract namespace; anything else is a
//! filesystem path.
//!
//! The listener and its clients live in the event loop. A client that
//! disconnects (or errors) also takes down any dialog it may have raised.

pub mod command;

pub use command::{parse_command, ControlCommand};

use anyhow::{Context, Result};
use log::{debug, info, trace, warn};
use std::io::{ErrorKind, Read};
use std::os::linux::net::SocketAddrExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::{SocketAddr, UnixListener, UnixStream};
use std::path::PathBuf;
use std::sync::Arc;

use crate::constants::CONTROL_READ_BUFFER;
use crate::event_loop::{Callback, Disposition, Registrar, POLLERR, POLLHUP, POLLIN};
use crate::ui::RecoveryUi;

/// Bound, listening control socket
pub struct ControlSocket {
    listener: UnixListener,
    /// Filesystem path to unlink on drop
    path: Option<PathBuf>,
}

impl ControlSocket {
    pub fn bind(name: &str) -> Result<Self> {
        let (listener, path) = match name.strip_prefix('@') {
            Some(abstract_name) => {
                let addr = SocketAddr::from_abstract_name(abstract_name.as_bytes())
                    .with_context(|| format!("Invalid abstract socket name {}", name))?;
                let listener = UnixListener::bind_addr(&addr)
                    .with_context(|| format!("Failed to bind control socket {}", name))?;
                (listener, None)
            }
            None => {
                let path = PathBuf::from(name);
                let _ = std::fs::remove_file(&path);
                let listener = UnixListener::bind(&path)
                    .with_context(|| format!("Failed to bind control socket {}", name))?;
                (listener, Some(path))
            }
        };
        listener
            .set_nonblocking(true)
            .context("Failed to make control socket non-blocking")?;
        info!("Control socket listening on {}", name);
        Ok(Self { listener, path })
    }

    /// Event loop callback for the listener
    ///
    /// Each accepted client is registered with its own callback.
    pub fn into_callback<C: 'static>(self, ui: Arc<dyn RecoveryUi>) -> Callback<C> {
        Box::new(move |_ctx: &mut C, registrar: &mut Registrar<C>, _revents| {
            self.accept_pending(&ui, registrar);
            Disposition::Keep
        })
    }

    fn accept_pending<C: 'static>(&self, ui: &Arc<dyn RecoveryUi>, registrar: &mut Registrar<C>) {
        loop {
            match self.listener.accept() {
                Ok((stream, _)) => {
                    if let Err(e) = stream.set_nonblocking(true) {
                        warn!("control client: {}", e);
                        continue;
                    }
                    debug!("control client connected (fd {})", stream.as_raw_fd());
                    let client = ControlClient::new(stream, ui.clone());
                    registrar.register(client.fd(), POLLIN, client.into_callback());
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("control socket accept failed: {}", e);
                    break;
                }
            }
        }
    }
}

impl AsRawFd for ControlSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.listener.as_raw_fd()
    }
}

impl Drop for ControlSocket {
    fn drop(&mut self) {
        if let Some(path) = &self.path {
            let _ = std::fs::remove_file(path);
        }
    }
}

struct ControlClient {
    stream: UnixStream,
    ui: Arc<dyn RecoveryUi>,
}

impl ControlClient {
    fn new(stream: UnixStream, ui: Arc<dyn RecoveryUi>) -> Self {
        Self { stream, ui }
    }

    fn fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    fn into_callback<C: 'static>(mut self) -> Callback<C> {
        Box::new(move |_ctx: &mut C, _registrar: &mut Registrar<C>, revents| {
            self.on_ready(revents)
        })
    }

    fn on_ready(&mut self, revents: i16) -> Disposition {
        if revents & POLLIN == 0 {
            if revents & (POLLHUP | POLLERR) != 0 {
                return self.disconnect();
            }
            return Disposition::Keep;
        }

        let mut buf = [0u8; CONTROL_READ_BUFFER];
        let n = match self.stream.read(&mut buf) {
            Ok(0) => return self.disconnect(),
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                return Disposition::Keep
            }
            Err(e) => {
                debug!("control client read failed: {}", e);
                return self.disconnect();
            }
        };

        trace!("control message {:?}", String::from_utf8_lossy(&buf[..n]));
        match parse_command(&buf[..n]) {
            Some(ControlCommand::DialogShow(text)) => self.ui.dialog_show_info(&text),
            Some(ControlCommand::DialogDismiss) => self.ui.dialog_dismiss(),
            None => debug!("ignoring control message"),
        }
        Disposition::Keep
    }

    /// Client gone: drop any dialog it raised. The stream closes when the
    /// registration (and this client) is dropped.
    fn disconnect(&self) -> Disposition {
        debug!("control client disconnected (fd {})", self.fd());
        self.ui.dialog_dismiss();
        Disposition::Remove
    }
}
