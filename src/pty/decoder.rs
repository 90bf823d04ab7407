// src/pty/decoder.rs

/// Incremental UTF-8 decoder for terminal output.
///
/// A read can end in the middle of a multibyte character. Those trailing bytes
/// are held back and prepended to the next chunk; anything that is genuinely
/// malformed becomes U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
  pending: Vec<u8>,
}

impl Utf8Decoder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Decodes `chunk`, returning every complete character seen so far.
  pub fn decode(&mut self, chunk: &[u8]) -> String {
    self.pending.extend_from_slice(chunk);
    let split = self.pending.len() - incomplete_suffix_len(&self.pending);
    let text = String::from_utf8_lossy(&self.pending[..split]).into_owned();
    self.pending.drain(..split);
    text
  }

  /// Flushes held-back bytes at end of stream.
  pub fn finish(&mut self) -> String {
    let text = String::from_utf8_lossy(&self.pending).into_owned();
    self.pending.clear();
    text
  }
}

/// Length of a trailing sequence that is a valid but unfinished character start.
fn incomplete_suffix_len(bytes: &[u8]) -> usize {
  let len = bytes.len();
  for back in 1..=len.min(3) {
    let byte = bytes[len - back];
    if byte & 0b1100_0000 == 0b1000_0000 {
      continue;
    }
    let width = match byte {
      0xC2..=0xDF => 2,
      0xE0..=0xEF => 3,
      0xF0..=0xF4 => 4,
      _ => return 0,
    };
    return if width > back { back } else { 0 };
  }
  0
}
