//! Raw kernel input events
//!
//! `struct input_event` as read from /dev/input/eventN.

use std::mem;

use super::keycodes::{EV_ABS, EV_KEY, EV_REL, EV_SYN};

/// One `struct input_event` record (24 bytes on 64-bit ABIs)
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InputEvent {
    pub time: libc::timeval,
    /// Event type (EV_*)
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

/// Size of one record on the wire
pub const INPUT_EVENT_SIZE: usize = mem::size_of::<InputEvent>();

impl InputEvent {
    /// Build an event with a zero timestamp (synthetic events, tests)
    pub fn new(kind: u16, code: u16, value: i32) -> Self {
        Self {
            time: libc::timeval {
                tv_sec: 0,
                tv_usec: 0,
            },
            kind,
            code,
            value,
        }
    }

    pub fn key(code: u16, down: bool) -> Self {
        Self::new(EV_KEY, code, down as i32)
    }

    pub fn rel(code: u16, value: i32) -> Self {
        Self::new(EV_REL, code, value)
    }

    pub fn abs(code: u16, value: i32) -> Self {
        Self::new(EV_ABS, code, value)
    }

    pub fn syn(code: u16) -> Self {
        Self::new(EV_SYN, code, 0)
    }

    /// Decode one record. Returns None if `buf` is shorter than a record.
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < INPUT_EVENT_SIZE {
            return None;
        }
        // SAFETY: length checked above; InputEvent is plain old data and
        // every bit pattern is valid for it.
        Some(unsafe { std::ptr::read_unaligned(buf.as_ptr() as *const InputEvent) })
    }

    /// Encode as the kernel would deliver it
    pub fn to_bytes(&self) -> [u8; INPUT_EVENT_SIZE] {
        let mut out = [0u8; INPUT_EVENT_SIZE];
        // SAFETY: out is exactly size_of::<InputEvent>() bytes.
        unsafe {
            std::ptr::write_unaligned(out.as_mut_ptr() as *mut InputEvent, *self);
        }
        out
    }

    #[inline]
    pub fn is_key(&self) -> bool {
        self.kind == EV_KEY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::keycodes::{ABS_MT_POSITION_X, KEY_POWER};

    #[test]
    fn test_decode_kernel_record() {
        let ev = InputEvent::abs(ABS_MT_POSITION_X, 4096);
        let bytes = ev.to_bytes();
        let decoded = InputEvent::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.kind, EV_ABS);
        assert_eq!(decoded.code, ABS_MT_POSITION_X);
        assert_eq!(decoded.value, 4096);
    }

    #[test]
    fn test_short_buffer_rejected() {
        let bytes = InputEvent::key(KEY_POWER, true).to_bytes();
        assert!(InputEvent::from_bytes(&bytes[..INPUT_EVENT_SIZE - 1]).is_none());
    }
}
