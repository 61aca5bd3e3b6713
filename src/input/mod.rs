//! Input handling
//!
//! Raw evdev access and the translators that run on the event thread.
//! - Device discovery and record reading (evdev)
//! - Swipe recognition on touch screens (gesture)
//! - Trackball motion to arrow keys (trackball)

pub mod event;
pub mod evdev;
pub mod gesture;
pub mod keycodes;
pub mod trackball;

pub use event::{InputEvent, INPUT_EVENT_SIZE};
pub use evdev::{scan_devices, AbsAxes, InputDevice, ReadStatus};
pub use gesture::{GestureRecognizer, SwipeThresholds};
pub use trackball::TrackballAccumulator;
