//! Binary-side glue: the stdout console, host system actions and signals

pub mod console;
pub mod system;

use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use recovery_input::KeyQueue;

/// Global flag for shutdown requested via signal (SIGTERM/SIGINT/SIGHUP)
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// How often the watcher looks at the shutdown flag
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Check if shutdown was requested (SIGTERM, SIGINT, or SIGHUP)
pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Relaxed)
}

/// Set up signal handlers for graceful shutdown (call once at startup)
///
/// Handles SIGTERM (systemd stop), SIGINT (Ctrl+C), and SIGHUP (terminal hangup).
pub fn setup_signal_handlers() {
    unsafe {
        libc::signal(
            libc::SIGTERM,
            shutdown_signal_handler as *const () as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGINT,
            shutdown_signal_handler as *const () as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGHUP,
            shutdown_signal_handler as *const () as libc::sighandler_t,
        );
    }
}

extern "C" fn shutdown_signal_handler(_signo: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
}

/// Cancel the foreground wait once a shutdown signal arrives
///
/// The handler itself may not take locks, so a small thread turns the flag
/// into a `cancel_wait_key`.
pub fn spawn_shutdown_watcher(queue: Arc<KeyQueue>) -> std::io::Result<()> {
    thread::Builder::new()
        .name("shutdown-watch".into())
        .spawn(move || {
            while !shutdown_requested() {
                thread::sleep(SHUTDOWN_POLL);
            }
            info!("Shutdown requested");
            queue.cancel_wait_key();
        })
        .map(|_| ())
}
