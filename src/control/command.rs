//! Control command language
//!
//! One command per message, fields separated by whitespace:
//!
//! ```text
//! dialog show <text...>
//! dialog dismiss
//! ```
//!
//! The words after `dialog show` are re-joined with single spaces to form
//! the dialog text.

/// A recognised control command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    DialogShow(String),
    DialogDismiss,
}

/// Parse one message; unknown or malformed input yields None
pub fn parse_command(raw: &[u8]) -> Option<ControlCommand> {
    let end = raw
        .iter()
        .rposition(|&b| !matches!(b, b'\r' | b'\n' | 0))
        .map(|i| i + 1)
        .unwrap_or(0);
    // Stop at an embedded NUL like a C string would
    let raw = &raw[..end];
    let raw = match raw.iter().position(|&b| b == 0) {
        Some(nul) => &raw[..nul],
        None => raw,
    };
    let line = String::from_utf8_lossy(raw);

    let mut fields = line.split_whitespace();
    let (object, verb) = (fields.next()?, fields.next()?);
    if object != "dialog" {
        return None;
    }
    match verb {
        "show" => {
            let words: Vec<&str> = fields.collect();
            if words.is_empty() {
                return None;
            }
            Some(ControlCommand::DialogShow(words.join(" ")))
        }
        "dismiss" => Some(ControlCommand::DialogDismiss),
        _ => None,
    }
}
