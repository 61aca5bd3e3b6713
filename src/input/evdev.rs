//! evdev device access
//!
//! Open /dev/input/eventN nodes directly and read raw `input_event` records.
//! No libinput here: recovery needs the untranslated stream (touch positions,
//! trackball deltas, BTN_TOUCH) and must run without udev.

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use nix::errno::Errno;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

use super::event::{InputEvent, INPUT_EVENT_SIZE};
use super::keycodes::{EV_ABS, EV_KEY, EV_REL};
use crate::constants::INPUT_READ_BATCH;

// EVIOCGBIT(0, len): supported event types
nix::ioctl_read_buf!(eviocgbit_types, b'E', 0x20, u8);

/// Source of absolute-axis ranges (EVIOCGABS)
///
/// Implemented by `InputDevice`; tests provide fixed ranges.
pub trait AbsAxes {
    /// Maximum reported value for `axis`, None if the device cannot tell
    fn abs_max(&self, axis: u16) -> Option<i32>;
}

/// Outcome of draining a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Some (possibly zero) records were appended
    Ok(usize),
    /// The device is gone (ENODEV, or EOF on a pipe)
    Gone,
}

/// An opened evdev node
pub struct InputDevice {
    file: File,
    path: PathBuf,
    /// Bytes of a record split across reads
    partial: Vec<u8>,
}

impl InputDevice {
    /// Open an evdev node read-only, non-blocking
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_CLOEXEC)
            .open(path)
            .with_context(|| format!("Cannot open input device {}", path.display()))?;
        Ok(Self::from_file(file, path))
    }

    /// Wrap an already-open descriptor (must be non-blocking)
    pub fn from_file<P: AsRef<Path>>(file: File, label: P) -> Self {
        Self {
            file,
            path: label.as_ref().to_path_buf(),
            partial: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check the EVIOCGBIT type mask for keys, relative or absolute axes
    pub fn has_usable_events(&self) -> bool {
        let mut bits = [0u8; 4];
        match unsafe { eviocgbit_types(self.file.as_raw_fd(), &mut bits) } {
            Ok(len) if len > 0 => {
                let mask = bits[0];
                [EV_KEY, EV_REL, EV_ABS]
                    .iter()
                    .any(|&ty| mask & (1 << ty) != 0)
            }
            Ok(_) => false,
            Err(e) => {
                debug!("EVIOCGBIT failed on {}: {}", self.path.display(), e);
                false
            }
        }
    }

    /// Read every record currently available, appending to `out`
    ///
    /// Transient errors are returned to the caller; the device stays usable.
    pub fn read_events(&mut self, out: &mut Vec<InputEvent>) -> Result<ReadStatus, Errno> {
        let mut buf = [0u8; INPUT_READ_BATCH * INPUT_EVENT_SIZE];
        let before = out.len();
        loop {
            match nix::unistd::read(self.file.as_raw_fd(), &mut buf) {
                Ok(0) => {
                    if out.len() > before {
                        return Ok(ReadStatus::Ok(out.len() - before));
                    }
                    return Ok(ReadStatus::Gone);
                }
                Ok(n) => {
                    self.partial.extend_from_slice(&buf[..n]);
                    let whole = self.partial.len() / INPUT_EVENT_SIZE * INPUT_EVENT_SIZE;
                    out.extend(
                        self.partial[..whole]
                            .chunks_exact(INPUT_EVENT_SIZE)
                            .filter_map(InputEvent::from_bytes),
                    );
                    self.partial.drain(..whole);
                    if n < buf.len() {
                        return Ok(ReadStatus::Ok(out.len() - before));
                    }
                }
                Err(Errno::EAGAIN) => return Ok(ReadStatus::Ok(out.len() - before)),
                Err(Errno::EINTR) => continue,
                Err(Errno::ENODEV) => return Ok(ReadStatus::Gone),
                Err(e) => return Err(e),
            }
        }
    }
}

impl AbsAxes for InputDevice {
    fn abs_max(&self, axis: u16) -> Option<i32> {
        let mut info = libc::input_absinfo {
            value: 0,
            minimum: 0,
            maximum: 0,
            fuzz: 0,
            flat: 0,
            resolution: 0,
        };
        // EVIOCGABS(axis) = _IOR('E', 0x40 + axis, struct input_absinfo)
        let cmd = nix::request_code_read!(
            b'E',
            0x40 + axis as u32,
            std::mem::size_of::<libc::input_absinfo>()
        );
        match ioctl_with_mut_arg(self.file.as_raw_fd(), cmd, &mut info, "EVIOCGABS") {
            Ok(()) => Some(info.maximum),
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }
}

impl AsRawFd for InputDevice {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

/// Execute an ioctl command with a mutable argument.
fn ioctl_with_mut_arg<T>(
    fd: RawFd,
    cmd: nix::sys::ioctl::ioctl_num_type,
    arg: &mut T,
    cmd_name: &str,
) -> Result<()> {
    let ret = unsafe { libc::ioctl(fd, cmd as _, arg as *mut T) };
    if ret < 0 {
        Err(anyhow!(
            "{} failed on fd {}: {}",
            cmd_name,
            fd,
            std::io::Error::last_os_error()
        ))
    } else {
        Ok(())
    }
}

/// Scan `dir` for event* nodes and open the usable ones
///
/// Devices that fail to open or report no key/rel/abs events are skipped.
/// At most `limit` devices are returned.
pub fn scan_devices(dir: &Path, limit: usize) -> Result<Vec<InputDevice>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| anyhow!("Cannot scan {}: {}", dir.display(), e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("event"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut devices = Vec::new();
    for path in paths {
        if devices.len() >= limit {
            warn!(
                "Input device limit ({}) reached, skipping {}",
                limit,
                path.display()
            );
            continue;
        }
        match InputDevice::open(&path) {
            Ok(device) if device.has_usable_events() => {
                debug!("Input device added: {}", path.display());
                devices.push(device);
            }
            Ok(_) => debug!("Ignoring {} (no key/rel/abs events)", path.display()),
            Err(e) => warn!("{:#}", e),
        }
    }

    info!("evdev: {} input devices opened", devices.len());
    Ok(devices)
}
