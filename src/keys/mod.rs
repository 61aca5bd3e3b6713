//! Key handling: held state, registration, policy and the foreground queue

pub mod long_press;
pub mod pipeline;
pub mod policy;
pub mod queue;

pub use long_press::LongPressTimer;
pub use pipeline::{enqueue_key, KeyPipeline};
pub use policy::{DefaultPolicy, HeldKeys, KeyAction, KeyPolicy};
pub use queue::{KeyInput, KeyQueue, WaitConfig, CANCEL, NO_KEY, REFRESH};
