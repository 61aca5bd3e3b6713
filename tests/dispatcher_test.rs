//! End-to-end dispatcher tests
//!
//! Socket pairs stand in for evdev nodes: the dispatcher reads raw
//! `input_event` records from them exactly as it would from /dev/input.
//! EVIOCGABS fails on a socket, so touch positions are taken as pixels.

use anyhow::Result;
use std::fs::File;
use std::io::Write;
use std::os::fd::OwnedFd;
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use recovery_input::control::ControlSocket;
use recovery_input::input::keycodes::{
    ABS_MT_POSITION_X, ABS_MT_POSITION_Y, BTN_TOUCH, KEY_BACK, KEY_DOWN, KEY_POWER, KEY_UP,
    KEY_VOLUMEUP, REL_Y, SYN_REPORT,
};
use recovery_input::input::{InputDevice, InputEvent, SwipeThresholds};
use recovery_input::keys::KeyAction;
use recovery_input::{
    Config, DefaultPolicy, Dispatcher, HeldKeys, KeyInput, KeyPolicy, RecoveryUi, Sources,
    SystemActions,
};

#[derive(Default)]
struct TestUi {
    text_visible: AtomicBool,
    dialog: Mutex<Option<String>>,
}

impl TestUi {
    fn dialog(&self) -> Option<String> {
        self.dialog.lock().unwrap().clone()
    }
}

impl RecoveryUi for TestUi {
    fn show_text(&self, visible: bool) {
        self.text_visible.store(visible, Ordering::SeqCst);
    }
    fn is_text_visible(&self) -> bool {
        self.text_visible.load(Ordering::SeqCst)
    }
    fn print(&self, _text: &str) {}
    fn dialog_show_info(&self, text: &str) {
        *self.dialog.lock().unwrap() = Some(text.to_string());
    }
    fn dialog_dismiss(&self) {
        *self.dialog.lock().unwrap() = None;
    }
    fn dialog_showing(&self) -> bool {
        self.dialog.lock().unwrap().is_some()
    }
    fn dialog_dismissable(&self) -> bool {
        true
    }
    fn fb_width(&self) -> u32 {
        1080
    }
    fn fb_height(&self) -> u32 {
        1920
    }
}

#[derive(Default)]
struct TestSystem {
    reboots: AtomicUsize,
    unmounts: AtomicUsize,
}

impl SystemActions for TestSystem {
    fn unmount_all(&self) {
        self.unmounts.fetch_add(1, Ordering::SeqCst);
    }
    fn mount(&self, _mount_point: &str) -> Result<()> {
        Ok(())
    }
    fn reboot(&self) -> Result<()> {
        self.reboots.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Counts long presses, enqueues everything
#[derive(Clone, Default)]
struct CountingPolicy {
    long_presses: Arc<AtomicUsize>,
}

impl KeyPolicy for CountingPolicy {
    fn check_key(&mut self, _key: u16, _held: &dyn HeldKeys) -> KeyAction {
        KeyAction::Enqueue
    }

    fn key_long_press(&mut self, _key: u16) {
        self.long_presses.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeDevice {
    writer: UnixStream,
}

impl FakeDevice {
    fn new(label: &str) -> (Self, InputDevice) {
        let (reader, writer) = UnixStream::pair().unwrap();
        reader.set_nonblocking(true).unwrap();
        let device = InputDevice::from_file(File::from(OwnedFd::from(reader)), label);
        (Self { writer }, device)
    }

    fn send(&mut self, events: &[InputEvent]) {
        let mut bytes = Vec::new();
        for ev in events {
            bytes.extend_from_slice(&ev.to_bytes());
        }
        self.writer.write_all(&bytes).unwrap();
    }

    fn tap(&mut self, code: u16) {
        self.send(&[
            InputEvent::key(code, true),
            InputEvent::syn(SYN_REPORT),
            InputEvent::key(code, false),
            InputEvent::syn(SYN_REPORT),
        ]);
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.wait.timeout_secs = 1;
    config.wait.usb_state_path = "/nonexistent/android_usb/state".into();
    config.input.long_press_ms = 100;
    config
}

fn start<P: KeyPolicy + 'static>(
    config: &Config,
    sources: Sources,
    policy: P,
) -> (Dispatcher, Arc<TestUi>, Arc<TestSystem>) {
    let ui = Arc::new(TestUi::default());
    let system = Arc::new(TestSystem::default());
    let dispatcher = Dispatcher::start(
        config,
        SwipeThresholds::default(),
        sources,
        ui.clone(),
        system.clone(),
        policy,
    )
    .unwrap();
    (dispatcher, ui, system)
}

fn with_device<P: KeyPolicy + 'static>(
    policy: P,
) -> (Dispatcher, FakeDevice, Arc<TestUi>, Arc<TestSystem>) {
    let (fake, device) = FakeDevice::new("fake-event0");
    let sources = Sources {
        devices: vec![device],
        ..Default::default()
    };
    let (dispatcher, ui, system) = start(&test_config(), sources, policy);
    (dispatcher, fake, ui, system)
}

fn eventually(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_clean_press_is_delivered() {
    let (dispatcher, mut dev, _ui, _system) = with_device(DefaultPolicy::new());
    dev.tap(KEY_DOWN);
    assert_eq!(dispatcher.wait_key(), KeyInput::Key(KEY_DOWN));
}

#[test]
fn test_seven_power_presses_reboot() {
    let (dispatcher, mut dev, _ui, system) = with_device(DefaultPolicy::new());
    for _ in 0..7 {
        dev.tap(KEY_POWER);
    }
    eventually("reboot", || system.reboots.load(Ordering::SeqCst) == 1);
    assert_eq!(system.unmounts.load(Ordering::SeqCst), 1);

    // The seventh press rebooted instead of being queued
    for _ in 0..6 {
        assert_eq!(dispatcher.wait_key(), KeyInput::Key(KEY_POWER));
    }
    assert_eq!(dispatcher.wait_key(), KeyInput::TimedOut);
}

#[test]
fn test_trackball_motion_makes_arrow_key() {
    let (dispatcher, mut dev, _ui, _system) = with_device(DefaultPolicy::new());
    for _ in 0..4 {
        dev.send(&[InputEvent::rel(REL_Y, 1), InputEvent::syn(SYN_REPORT)]);
    }
    assert_eq!(dispatcher.wait_key(), KeyInput::Key(KEY_DOWN));

    for _ in 0..4 {
        dev.send(&[InputEvent::rel(REL_Y, -1)]);
    }
    assert_eq!(dispatcher.wait_key(), KeyInput::Key(KEY_UP));
}

#[test]
fn test_horizontal_swipe_is_power() {
    let (dispatcher, mut dev, _ui, _system) = with_device(DefaultPolicy::new());
    dev.send(&[
        InputEvent::key(BTN_TOUCH, true),
        InputEvent::abs(ABS_MT_POSITION_X, 0),
        InputEvent::abs(ABS_MT_POSITION_Y, 500),
        InputEvent::syn(SYN_REPORT),
        InputEvent::abs(ABS_MT_POSITION_X, 4096),
        InputEvent::abs(ABS_MT_POSITION_Y, 500),
        InputEvent::syn(SYN_REPORT),
        InputEvent::key(BTN_TOUCH, false),
        InputEvent::syn(SYN_REPORT),
    ]);
    assert_eq!(dispatcher.wait_key(), KeyInput::Key(KEY_POWER));
}

#[test]
fn test_swipe_left_and_up() {
    let (dispatcher, mut dev, _ui, _system) = with_device(DefaultPolicy::new());
    dev.send(&[
        InputEvent::key(BTN_TOUCH, true),
        InputEvent::abs(ABS_MT_POSITION_X, 600),
        InputEvent::syn(SYN_REPORT),
        InputEvent::abs(ABS_MT_POSITION_X, 300),
        InputEvent::syn(SYN_REPORT),
        InputEvent::key(BTN_TOUCH, false),
        InputEvent::syn(SYN_REPORT),
        InputEvent::key(BTN_TOUCH, true),
        InputEvent::abs(ABS_MT_POSITION_Y, 900),
        InputEvent::syn(SYN_REPORT),
        InputEvent::abs(ABS_MT_POSITION_Y, 700),
        InputEvent::syn(SYN_REPORT),
        InputEvent::key(BTN_TOUCH, false),
        InputEvent::syn(SYN_REPORT),
    ]);
    // BTN_TOUCH is an ordinary key to the pipeline as well
    assert_eq!(dispatcher.wait_key(), KeyInput::Key(KEY_BACK));
    assert_eq!(dispatcher.wait_key(), KeyInput::Key(BTN_TOUCH));
    assert_eq!(dispatcher.wait_key(), KeyInput::Key(KEY_VOLUMEUP));
    assert_eq!(dispatcher.wait_key(), KeyInput::Key(BTN_TOUCH));
}

#[test]
fn test_short_swipe_is_ignored() {
    let (dispatcher, mut dev, _ui, _system) = with_device(DefaultPolicy::new());
    dev.send(&[
        InputEvent::key(BTN_TOUCH, true),
        InputEvent::abs(ABS_MT_POSITION_X, 100),
        InputEvent::syn(SYN_REPORT),
        InputEvent::abs(ABS_MT_POSITION_X, 150),
        InputEvent::syn(SYN_REPORT),
        InputEvent::key(BTN_TOUCH, false),
        InputEvent::syn(SYN_REPORT),
    ]);
    assert_eq!(dispatcher.wait_key(), KeyInput::Key(BTN_TOUCH));
    assert_eq!(dispatcher.wait_key(), KeyInput::TimedOut);
}

#[test]
fn test_power_chord_toggles_text() {
    let (dispatcher, mut dev, ui, _system) = with_device(DefaultPolicy::new());
    dev.send(&[InputEvent::key(KEY_POWER, true)]);
    eventually("power held", || dispatcher.is_key_pressed(KEY_POWER));
    dev.tap(KEY_VOLUMEUP);
    dev.send(&[InputEvent::key(KEY_POWER, false)]);
    eventually("text shown", || ui.is_text_visible());
    eventually("power released", || !dispatcher.is_key_pressed(KEY_POWER));
    assert_eq!(dispatcher.wait_key(), KeyInput::TimedOut);
}

#[test]
fn test_long_press_fires_once() {
    let policy = CountingPolicy::default();
    let long_presses = policy.long_presses.clone();
    let (dispatcher, mut dev, _ui, _system) = with_device(policy);

    dev.send(&[InputEvent::key(KEY_POWER, true)]);
    thread::sleep(Duration::from_millis(300));
    dev.send(&[InputEvent::key(KEY_POWER, false)]);
    assert_eq!(dispatcher.wait_key(), KeyInput::Key(KEY_POWER));
    assert_eq!(long_presses.load(Ordering::SeqCst), 1);

    dev.tap(KEY_POWER);
    assert_eq!(dispatcher.wait_key(), KeyInput::Key(KEY_POWER));
    thread::sleep(Duration::from_millis(300));
    assert_eq!(long_presses.load(Ordering::SeqCst), 1);
}

#[test]
fn test_volume_change_wakes_waiter() {
    let (dispatcher, _dev, _ui, _system) = with_device(DefaultPolicy::new());
    let dispatcher = Arc::new(dispatcher);
    let notifier = {
        let dispatcher = dispatcher.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            dispatcher.notify_volumes_changed();
        })
    };
    let start = Instant::now();
    assert_eq!(dispatcher.wait_key(), KeyInput::Refresh);
    assert!(start.elapsed() < Duration::from_secs(1));
    notifier.join().unwrap();

    dispatcher.notify_volumes_changed();
    assert_eq!(dispatcher.wait_key(), KeyInput::Refresh);
    assert_eq!(dispatcher.wait_key(), KeyInput::TimedOut);
}

#[test]
fn test_cancel_and_flush() {
    let (dispatcher, mut dev, _ui, _system) = with_device(DefaultPolicy::new());
    dev.tap(KEY_UP);
    dev.tap(KEY_DOWN);
    eventually("two keys", || dispatcher.queue().len() == 2);
    dispatcher.flush_keys();
    dispatcher.cancel_wait_key();
    assert_eq!(dispatcher.wait_key(), KeyInput::Cancelled);
    assert_eq!(dispatcher.wait_key().code(), recovery_input::NO_KEY);
}

#[test]
fn test_removed_device_does_not_stop_dispatcher() {
    let (fake_a, dev_a) = FakeDevice::new("a");
    let (mut fake_b, dev_b) = FakeDevice::new("b");
    let sources = Sources {
        devices: vec![dev_a, dev_b],
        ..Default::default()
    };
    let (dispatcher, _ui, _system) = start(&test_config(), sources, DefaultPolicy::new());
    drop(fake_a);
    fake_b.tap(KEY_DOWN);
    assert_eq!(dispatcher.wait_key(), KeyInput::Key(KEY_DOWN));
}

#[test]
fn test_control_socket_dialog() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recovery.sock");
    let control = ControlSocket::bind(path.to_str().unwrap()).unwrap();
    let (fake, device) = FakeDevice::new("fake-event0");
    let sources = Sources {
        devices: vec![device],
        control: Some(control),
        mounts: None,
    };
    let (dispatcher, ui, _system) = start(&test_config(), sources, DefaultPolicy::new());
    let mut fake = fake;

    let mut client = UnixStream::connect(&path).unwrap();
    client.write_all(b"dialog show Hello world\n").unwrap();
    eventually("dialog shown", || ui.dialog().is_some());
    assert_eq!(ui.dialog().as_deref(), Some("Hello world"));

    // A key dismisses the dismissable dialog and is dropped
    fake.tap(KEY_DOWN);
    eventually("dialog dismissed", || ui.dialog().is_none());
    assert_eq!(dispatcher.wait_key(), KeyInput::TimedOut);

    client.write_all(b"dialog show again").unwrap();
    eventually("dialog shown again", || ui.dialog().is_some());
    client.write_all(b"bogus command").unwrap();
    drop(client);
    eventually("dismissed on disconnect", || ui.dialog().is_none());
}
