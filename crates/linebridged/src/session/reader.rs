//! Line reader that accepts `\n`, `\r` and `\r\n` terminators.

use std::io::{self, BufRead};

/// Longest line accepted from a client.
pub(crate) const MAX_LINE_BYTES: usize = 64 * 1024;

pub(crate) struct LineReader<R> {
    inner: R,
    skip_newline: bool,
}

impl<R: BufRead> LineReader<R> {
    pub(crate) const fn new(inner: R) -> Self {
        Self {
            inner,
            skip_newline: false,
        }
    }

    /// Returns the next line without its terminator, or `None` at end of
    /// input. A final unterminated line is still returned.
    pub(crate) fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = Vec::new();
        loop {
            let available = match self.inner.fill_buf() {
                Ok(available) => available,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(error),
            };
            if available.is_empty() {
                return if line.is_empty() {
                    Ok(None)
                } else {
                    decode(line).map(Some)
                };
            }

            let mut consumed = 0;
            if self.skip_newline {
                self.skip_newline = false;
                if available.first() == Some(&b'\n') {
                    consumed = 1;
                }
            }
            let rest = available.get(consumed..).unwrap_or_default();
            match rest.iter().position(|byte| *byte == b'\n' || *byte == b'\r') {
                Some(index) => {
                    line.extend_from_slice(rest.get(..index).unwrap_or_default());
                    self.skip_newline = rest.get(index) == Some(&b'\r');
                    self.inner.consume(consumed + index + 1);
                    return decode(line).map(Some);
                }
                None => {
                    line.extend_from_slice(rest);
                    let length = available.len();
                    self.inner.consume(length);
                }
            }
            if line.len() > MAX_LINE_BYTES {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("line exceeds {MAX_LINE_BYTES} bytes"),
                ));
            }
        }
    }
}

fn decode(line: Vec<u8>) -> io::Result<String> {
    String::from_utf8(line).map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))
}
