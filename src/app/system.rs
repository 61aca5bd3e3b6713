//! Host side effects: unmount, mount, reboot

use anyhow::{bail, Context, Result};
use log::{info, warn};
use nix::mount::{umount2, MntFlags};
use nix::sys::reboot::{reboot, RebootMode};
use std::path::PathBuf;
use std::process::Command;

use recovery_input::SystemActions;

pub struct LinuxSystem {
    /// Volumes released before a reboot
    volumes: Vec<PathBuf>,
}

impl LinuxSystem {
    pub fn new(volumes: Vec<PathBuf>) -> Self {
        Self { volumes }
    }
}

impl SystemActions for LinuxSystem {
    fn unmount_all(&self) {
        nix::unistd::sync();
        for volume in &self.volumes {
            match umount2(volume, MntFlags::MNT_DETACH) {
                Ok(()) => info!("Unmounted {}", volume.display()),
                Err(e) => warn!("Failed to unmount {}: {}", volume.display(), e),
            }
        }
    }

    /// Mount through mount(8) so fstab supplies device and options
    fn mount(&self, mount_point: &str) -> Result<()> {
        let status = Command::new("mount")
            .arg(mount_point)
            .status()
            .context("Failed to run mount")?;
        if !status.success() {
            bail!("mount {} exited with {}", mount_point, status);
        }
        info!("Mounted {}", mount_point);
        Ok(())
    }

    fn reboot(&self) -> Result<()> {
        nix::unistd::sync();
        reboot(RebootMode::RB_AUTOBOOT).context("reboot(2) failed")?;
        Ok(())
    }
}
