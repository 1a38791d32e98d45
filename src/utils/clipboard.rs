//! Host clipboard access.

use base64::{engine::general_purpose::STANDARD, Engine};
use std::io::{IsTerminal, Write};

use crate::core::CoreError;

/// Writes UTF-8 plain text to the host clipboard.
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), CoreError>;
}

/// Sets the clipboard through the terminal with an OSC 52 escape sequence.
///
/// Works over SSH and inside multiplexers that forward OSC 52. Fails with
/// [`CoreError::ClipboardUnavailable`] when stdout is not a terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct Osc52Clipboard;

impl Osc52Clipboard {
    /// The escape sequence that asks the terminal to store `text`.
    pub fn sequence(text: &str) -> String {
        format!("\x1b]52;c;{}\x07", STANDARD.encode(text.as_bytes()))
    }
}

impl Clipboard for Osc52Clipboard {
    fn write_text(&self, text: &str) -> Result<(), CoreError> {
        let mut stdout = std::io::stdout();
        if !stdout.is_terminal() {
            return Err(CoreError::ClipboardUnavailable(
                "stdout is not a terminal".to_string(),
            ));
        }
        stdout
            .write_all(Self::sequence(text).as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| CoreError::ClipboardUnavailable(e.to_string()))
    }
}
