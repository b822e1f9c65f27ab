//! Byte-to-text decoding for subprocess output.
//!
//! Toolchains on Windows often write in the console code page rather than
//! UTF-8. The encoding is configured explicitly; nothing is sniffed.

use anyhow::{anyhow, bail};
use encoding_rs::{Encoding, REPLACEMENT, UTF_16BE, UTF_16LE, UTF_8};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineDecoder {
    encoding: &'static Encoding,
}

impl Default for LineDecoder {
    fn default() -> Self {
        LineDecoder { encoding: UTF_8 }
    }
}

impl LineDecoder {
    pub fn new(encoding: &'static Encoding) -> Self {
        LineDecoder { encoding }
    }

    /// Look up a WHATWG label such as `"windows-1252"` or `"shift_jis"`.
    ///
    /// Output is split into lines on the `\n` byte before decoding, so
    /// only ASCII-compatible encodings are accepted.
    pub fn try_for_label(label: &str) -> anyhow::Result<Self> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| anyhow!("unknown output encoding '{}'", label))?;
        if encoding == UTF_16LE || encoding == UTF_16BE || encoding == REPLACEMENT {
            bail!(
                "output encoding '{}' ({}) is not ASCII-compatible and cannot be split into lines",
                label,
                encoding.name()
            );
        }
        Ok(Self::new(encoding))
    }

    /// Like [`try_for_label`](Self::try_for_label) but falls back to UTF-8
    /// (with a warning) for unknown labels. `None` means UTF-8.
    pub fn for_label(label: Option<&str>) -> Self {
        match label {
            None => Self::default(),
            Some(l) => Self::try_for_label(l).unwrap_or_else(|e| {
                log::warn!("{}; decoding as UTF-8", e);
                Self::default()
            }),
        }
    }

    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Decode one line. A trailing `\n` / `\r\n` is dropped.
    ///
    /// Never fails: when the configured encoding rejects the bytes, strict
    /// UTF-8 is tried, and failing that the replacement-character rendition
    /// is returned.
    pub fn decode(&self, bytes: &[u8]) -> String {
        let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        let (text, had_errors) = self.encoding.decode_without_bom_handling(bytes);
        if !had_errors {
            return text.into_owned();
        }
        if self.encoding != UTF_8 {
            if let Ok(utf8) = std::str::from_utf8(bytes) {
                log::warn!(
                    "output is not valid {}; decoded as UTF-8 instead",
                    self.encoding.name()
                );
                return utf8.to_string();
            }
        }
        log::warn!(
            "undecodable bytes in {} output replaced",
            self.encoding.name()
        );
        text.into_owned()
    }
}
