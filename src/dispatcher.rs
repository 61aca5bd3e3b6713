//! Dispatcher
//!
//! Owns the key queue and the event thread. Startup order:
//! 1. derive swipe thresholds from the display density
//! 2. register every input device with the event loop
//! 3. register the control socket (and the mount watcher)
//! 4. spawn the event thread
//!
//! The foreground thread talks to the dispatcher only through the queue
//! methods below. Everything else runs on the event thread.

use anyhow::{Context, Result};
use log::{debug, error, info, trace, warn};
use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;
use std::os::unix::net::UnixStream;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::config::Config;
use crate::constants::{MAX_INPUT_DEVICES, POLL_ERROR_BACKOFF};
use crate::control::ControlSocket;
use crate::event_loop::{Callback, Disposition, EventLoop, EventLoopError, Registrar, POLLIN};
use crate::input::keycodes::{EV_SYN, KEY_MAX};
use crate::input::{
    scan_devices, AbsAxes, GestureRecognizer, InputDevice, InputEvent, ReadStatus,
    SwipeThresholds, TrackballAccumulator,
};
use crate::keys::{enqueue_key, KeyInput, KeyPipeline, KeyPolicy, KeyQueue, LongPressTimer};
use crate::properties::Properties;
use crate::ui::{RecoveryUi, SystemActions};
use crate::usb::UsbCable;
use crate::volumes::{MountWatcher, MOUNT_EVENTS};

/// Kernel autorepeat; not an edge
const KEY_REPEAT: i32 = 2;

/// Descriptors the event thread will watch
#[derive(Default)]
pub struct Sources {
    pub devices: Vec<InputDevice>,
    pub control: Option<ControlSocket>,
    pub mounts: Option<MountWatcher>,
}

impl Sources {
    /// Open everything the configuration asks for
    ///
    /// Missing pieces are logged and left out; the dispatcher still runs.
    pub fn open(config: &Config) -> Self {
        let devices = scan_devices(&config.input.device_dir, MAX_INPUT_DEVICES)
            .unwrap_or_else(|e| {
                warn!("{:#}", e);
                Vec::new()
            });

        let control = if config.control.enabled {
            ControlSocket::bind(&config.control.socket)
                .map_err(|e| warn!("{:#}", e))
                .ok()
        } else {
            None
        };

        let mounts = if config.volumes.watch_mounts {
            MountWatcher::open(&config.volumes.mounts_path)
                .map_err(|e| warn!("{:#}", e))
                .ok()
        } else {
            None
        };

        Self {
            devices,
            control,
            mounts,
        }
    }
}

/// Swipe thresholds from the configured or reported display density
pub fn resolve_thresholds(config: &Config) -> SwipeThresholds {
    let gesture = &config.gesture;
    let density = if gesture.density > 0 {
        Some(gesture.density)
    } else {
        Properties::new(config.system.property_files.as_slice()).density(&gesture.density_property)
    };
    let thresholds = SwipeThresholds::from_density(density, gesture.fallback());
    match density {
        Some(dpi) => info!(
            "Swipe thresholds {}x{} px ({} dpi)",
            thresholds.min_dx, thresholds.min_dy, dpi
        ),
        None => info!(
            "Swipe thresholds {}x{} px (density unknown)",
            thresholds.min_dx, thresholds.min_dy
        ),
    }
    thresholds
}

/// Event thread state
struct EventContext<P: KeyPolicy> {
    pipeline: KeyPipeline<P>,
    gesture: GestureRecognizer,
    trackball: TrackballAccumulator,
    stopping: bool,
}

impl<P: KeyPolicy> EventContext<P> {
    fn on_input_event(&mut self, ev: &InputEvent, axes: &dyn AbsAxes) {
        if let Some(key) = self.gesture.process(ev, axes) {
            debug!("swipe -> key {}", key);
            self.pipeline.enqueue(key);
        }

        if ev.kind == EV_SYN {
            return;
        }
        if let Some(key) = self.trackball.process(ev) {
            trace!("trackball -> key {}", key);
            self.pipeline.tap(key);
        }

        if ev.is_key() && ev.code <= KEY_MAX && ev.value != KEY_REPEAT {
            self.pipeline.process_key(ev.code, ev.value != 0);
        }
    }
}

fn device_callback<P: KeyPolicy + 'static>(mut device: InputDevice) -> Callback<EventContext<P>> {
    let mut events = Vec::new();
    Box::new(move |ctx: &mut EventContext<P>, _registrar, _revents| {
        events.clear();
        let status = device.read_events(&mut events);
        for ev in &events {
            ctx.on_input_event(ev, &device);
        }
        match status {
            Ok(ReadStatus::Ok(_)) => Disposition::Keep,
            Ok(ReadStatus::Gone) => {
                info!("Input device removed: {}", device.path().display());
                Disposition::Remove
            }
            Err(e) => {
                warn!("read from {} failed: {}", device.path().display(), e);
                Disposition::Keep
            }
        }
    })
}

/// Wakes the event thread so it can exit
fn stop_callback<P: KeyPolicy + 'static>(mut wake: UnixStream) -> Callback<EventContext<P>> {
    Box::new(
        move |ctx: &mut EventContext<P>, _registrar: &mut Registrar<EventContext<P>>, _revents| {
            let mut buf = [0u8; 8];
            let _ = wake.read(&mut buf);
            ctx.stopping = true;
            Disposition::Remove
        },
    )
}

/// Event thread body: dispatch until `stopped`, riding out poll failures
fn run_until_stopped<C>(
    ctx: &mut C,
    stopped: impl Fn(&C) -> bool,
    mut step: impl FnMut(&mut C) -> Result<usize, EventLoopError>,
) {
    while !stopped(ctx) {
        if let Err(e) = step(ctx) {
            error!("Event loop: {}", e);
            thread::sleep(POLL_ERROR_BACKOFF);
        }
    }
}

/// The running input dispatcher
pub struct Dispatcher {
    queue: Arc<KeyQueue>,
    ui: Arc<dyn RecoveryUi>,
    wake: Option<UnixStream>,
    thread: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Open the configured sources and start
    pub fn init<P: KeyPolicy + 'static>(
        config: &Config,
        ui: Arc<dyn RecoveryUi>,
        system: Arc<dyn SystemActions>,
        policy: P,
    ) -> Result<Self> {
        let thresholds = resolve_thresholds(config);
        let sources = Sources::open(config);
        Self::start(config, thresholds, sources, ui, system, policy)
    }

    /// Start over already-opened sources
    pub fn start<P: KeyPolicy + 'static>(
        config: &Config,
        thresholds: SwipeThresholds,
        sources: Sources,
        ui: Arc<dyn RecoveryUi>,
        system: Arc<dyn SystemActions>,
        policy: P,
    ) -> Result<Self> {
        let cable = UsbCable::new(&config.wait.usb_state_path, config.wait.usb_probe_ttl_ms);
        let queue = Arc::new(KeyQueue::new(
            config.input.queue_capacity,
            config.wait.wait_config(),
            Box::new(cable),
        ));
        let policy = Arc::new(Mutex::new(policy));
        let timer = LongPressTimer::spawn(config.input.long_press(), queue.clone(), policy.clone())?;
        let pipeline = KeyPipeline::new(
            queue.clone(),
            policy,
            ui.clone(),
            system,
            timer,
            config.system.mount_target(),
        );

        let mut ctx = EventContext {
            pipeline,
            gesture: GestureRecognizer::new(thresholds, ui.fb_width(), ui.fb_height()),
            trackball: TrackballAccumulator::new(config.input.trackball_threshold),
            stopping: false,
        };

        let mut event_loop: EventLoop<EventContext<P>> = EventLoop::new();
        let (wake_tx, wake_rx) = UnixStream::pair().context("Failed to create wake socket")?;
        wake_rx
            .set_nonblocking(true)
            .context("Failed to configure wake socket")?;
        event_loop.register(wake_rx.as_raw_fd(), POLLIN, stop_callback(wake_rx))?;

        let device_count = sources.devices.len();
        for device in sources.devices {
            let fd = device.as_raw_fd();
            let path = device.path().display().to_string();
            if let Err(e) = event_loop.register(fd, POLLIN, device_callback(device)) {
                warn!("Cannot watch {}: {}", path, e);
            }
        }
        if let Some(control) = sources.control {
            let fd = control.as_raw_fd();
            if let Err(e) = event_loop.register(fd, POLLIN, control.into_callback(ui.clone())) {
                warn!("Cannot watch control socket: {}", e);
            }
        }
        if let Some(mounts) = sources.mounts {
            let fd = mounts.as_raw_fd();
            if let Err(e) = event_loop.register(fd, MOUNT_EVENTS, mounts.into_callback(queue.clone()))
            {
                warn!("Cannot watch mount table: {}", e);
            }
        }
        info!(
            "Dispatcher starting: {} input devices, {} sources",
            device_count,
            event_loop.len()
        );

        let thread = thread::Builder::new()
            .name("input-events".into())
            .spawn(move || {
                run_until_stopped(&mut ctx, |ctx| ctx.stopping, |ctx| {
                    event_loop.wait_and_dispatch(ctx, None)
                });
                debug!("event thread exiting");
            })
            .context("Failed to spawn event thread")?;

        Ok(Self {
            queue,
            ui,
            wake: Some(wake_tx),
            thread: Some(thread),
        })
    }

    /// Block until a key (or refresh, cancel, timeout)
    pub fn wait_key(&self) -> KeyInput {
        self.queue.wait_key()
    }

    pub fn cancel_wait_key(&self) {
        self.queue.cancel_wait_key();
    }

    pub fn flush_keys(&self) {
        self.queue.flush();
    }

    pub fn is_key_pressed(&self, code: u16) -> bool {
        self.queue.is_pressed(code)
    }

    /// Queue a key as if it had been registered (a dialog may swallow it)
    pub fn enqueue_key(&self, code: u16) {
        enqueue_key(&self.queue, self.ui.as_ref(), code);
    }

    pub fn notify_volumes_changed(&self) {
        self.queue.notify_volumes_changed();
    }

    /// Shared handle to the key queue (for cancelling from other threads)
    pub fn queue(&self) -> Arc<KeyQueue> {
        self.queue.clone()
    }

    /// Stop the event thread and wait for it
    pub fn shutdown(&mut self) {
        if let Some(mut wake) = self.wake.take() {
            if let Err(e) = wake.write_all(&[1]) {
                warn!("Failed to wake event thread: {}", e);
            }
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Event thread panicked");
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
