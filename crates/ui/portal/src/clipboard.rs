//! Copy to the system clipboard through the terminal (OSC 52).

use std::io::{self, Write};

use base64::{Engine as _, engine::general_purpose::STANDARD};

/// Escape sequence asking the terminal to put `text` on the clipboard.
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text.as_bytes()))
}

/// Writes the OSC 52 sequence for `text` to `out`. Terminals without OSC 52
/// support ignore it.
pub fn copy_to(out: &mut impl Write, text: &str) -> io::Result<()> {
    out.write_all(osc52_sequence(text).as_bytes())?;
    out.flush()
}

pub fn copy(text: &str) -> io::Result<()> {
    copy_to(&mut io::stdout(), text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sequence_wraps_base64_payload() {
        assert_eq!(osc52_sequence("PEM"), "\x1b]52;c;UEVN\x07");
    }

    #[test]
    fn copy_writes_sequence() {
        let mut out = Vec::new();
        copy_to(&mut out, "-----BEGIN CERTIFICATE-----").unwrap();
        let written = String::from_utf8(out).unwrap();
        assert!(written.starts_with("\x1b]52;c;"));
        assert!(written.ends_with('\x07'));
    }
}
