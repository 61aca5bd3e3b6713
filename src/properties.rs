//! System properties
//!
//! Android exposes properties through bionic. Everywhere else we read the
//! `key=value` files the property service would have loaded; later files
//! override earlier ones.

use log::{debug, trace};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct Properties {
    files: Vec<PathBuf>,
}

impl Properties {
    pub fn new<P: AsRef<Path>>(files: &[P]) -> Self {
        Self {
            files: files.iter().map(|p| p.as_ref().to_path_buf()).collect(),
        }
    }

    /// Look up `name`; None if unset or empty
    pub fn get(&self, name: &str) -> Option<String> {
        if let Some(value) = system_property_get(name) {
            return Some(value);
        }
        let mut found = None;
        for path in &self.files {
            let contents = match std::fs::read_to_string(path) {
                Ok(c) => c,
                Err(e) => {
                    trace!("property file {}: {}", path.display(), e);
                    continue;
                }
            };
            if let Some(value) = lookup(&contents, name) {
                found = Some(value.to_string());
            }
        }
        found.filter(|v| !v.is_empty())
    }

    /// Display density in dpi; missing, malformed or zero gives None
    pub fn density(&self, name: &str) -> Option<u32> {
        let raw = self.get(name)?;
        match raw.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(dpi) => Some(dpi),
            Err(_) => {
                debug!("{}={:?} is not a density", name, raw);
                None
            }
        }
    }
}

/// Last assignment of `name` in a property file
fn lookup<'a>(contents: &'a str, name: &str) -> Option<&'a str> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
        .last()
}

#[cfg(target_os = "android")]
fn system_property_get(name: &str) -> Option<String> {
    use std::ffi::{CStr, CString};
    use std::os::raw::{c_char, c_int};

    const PROP_VALUE_MAX: usize = 92;

    extern "C" {
        fn __system_property_get(name: *const c_char, value: *mut c_char) -> c_int;
    }

    let name = CString::new(name).ok()?;
    let mut value = [0 as c_char; PROP_VALUE_MAX];
    let len = unsafe { __system_property_get(name.as_ptr(), value.as_mut_ptr()) };
    if len <= 0 {
        return None;
    }
    let value = unsafe { CStr::from_ptr(value.as_ptr()) };
    Some(value.to_string_lossy().into_owned())
}

#[cfg(not(target_os = "android"))]
fn system_property_get(_name: &str) -> Option<String> {
    None
}
