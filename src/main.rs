//! recovery-input - drive the recovery input dispatcher from a console
//!
//! Reads keys, touch swipes and trackball motion from /dev/input, applies
//! the default key policy and logs every key the foreground receives.

mod app;

use anyhow::Result;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use recovery_input::input::keycodes::key_name;
use recovery_input::{Config, DefaultPolicy, Dispatcher, KeyInput, RecoveryUi};

use app::console::ConsoleUi;
use app::system::LinuxSystem;

/// Print help message
fn print_help() {
    println!(
        r#"recovery-input {} - recovery console input dispatcher

USAGE:
    recovery-input [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information
    --print-config          Print the effective configuration and exit

CONFIG:
    $RECOVERY_INPUT_CONFIG
    ~/.config/recovery-input/config.toml
    /etc/recovery-input/config.toml

KEYS:
    power + volume-up       Toggle the text log
    power x7                Reboot
    volume-up/down x7       Mount the system partition (alternating)

CONTROL:
    echo "dialog show Installing..." | socat - ABSTRACT-CONNECT:recovery
    echo "dialog dismiss" | socat - ABSTRACT-CONNECT:recovery
"#,
        env!("CARGO_PKG_VERSION")
    );
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Check command line arguments
    let args: Vec<String> = std::env::args().collect();

    // --help
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    // --version
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("recovery-input {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::load();

    // --print-config
    if args.iter().any(|a| a == "--print-config") {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    if let Some(unknown) = args.iter().skip(1).find(|a| a.starts_with('-')) {
        warn!("Ignoring unknown option {}", unknown);
    }

    info!("recovery-input starting...");
    app::setup_signal_handlers();

    let ui = Arc::new(ConsoleUi::new());
    let system = Arc::new(LinuxSystem::new(vec![PathBuf::from(
        &config.system.system_mount_point,
    )]));
    let mut dispatcher = Dispatcher::init(&config, ui.clone(), system, DefaultPolicy::new())?;
    app::spawn_shutdown_watcher(dispatcher.queue())?;

    // Notify systemd that we're ready
    let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Ready]);

    while !app::shutdown_requested() {
        match dispatcher.wait_key() {
            KeyInput::Key(code) => {
                info!("Key {} ({})", key_name(code), code);
                ui.print(&format!("key: {} ({})", key_name(code), code));
            }
            KeyInput::Refresh => {
                info!("Mounted volumes changed");
                ui.print("volumes changed");
            }
            KeyInput::Cancelled => debug!("wait cancelled"),
            KeyInput::TimedOut => debug!("no key within timeout"),
        }
    }

    let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Stopping]);
    dispatcher.shutdown();
    info!("recovery-input exiting");
    Ok(())
}
