//! Console output for Gator commands.
//!
//! Commands never print directly: they write through a [`Renderer`] so the
//! same code can target stdout or a captured buffer.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crate::Result;

/// Width of the separator line printed between posts.
pub const SEPARATOR_WIDTH: usize = 40;

/// Line-oriented writer for command output.
pub struct Renderer {
    out: Box<dyn Write + Send + Sync>,
}

impl Renderer {
    /// Create a renderer writing to `out`.
    pub fn new(out: Box<dyn Write + Send + Sync>) -> Self {
        Self { out }
    }

    /// Create a renderer writing to standard output.
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Create a renderer writing to a shared in-memory buffer.
    pub fn buffered() -> (Self, OutputBuffer) {
        let buffer = OutputBuffer::default();
        (Self::new(Box::new(buffer.clone())), buffer)
    }

    /// Write one line.
    pub fn line(&mut self, text: impl AsRef<str>) -> Result<()> {
        writeln!(self.out, "{}", text.as_ref())?;
        Ok(())
    }

    /// Write a bulleted list entry.
    pub fn item(&mut self, text: impl AsRef<str>) -> Result<()> {
        writeln!(self.out, "* {}", text.as_ref())?;
        Ok(())
    }

    /// Write an indented `label: value` pair.
    pub fn field(&mut self, label: &str, value: impl AsRef<str>) -> Result<()> {
        writeln!(self.out, "  {label}: {}", value.as_ref())?;
        Ok(())
    }

    /// Write a separator line.
    pub fn separator(&mut self) -> Result<()> {
        writeln!(self.out, "{}", "=".repeat(SEPARATOR_WIDTH))?;
        Ok(())
    }

    /// Flush buffered output.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer").finish_non_exhaustive()
    }
}

/// Cloneable in-memory sink; all clones share the same bytes.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl OutputBuffer {
    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        let bytes = self.inner.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Written lines.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// Discard everything written so far.
    pub fn clear(&self) {
        if let Ok(mut bytes) = self.inner.lock() {
            bytes.clear();
        }
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("output buffer poisoned"))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_output() {
        let (mut ui, buffer) = Renderer::buffered();
        ui.line("Feeds:").unwrap();
        ui.item("Blog").unwrap();
        ui.field("Link", "https://example.com").unwrap();

        assert_eq!(
            buffer.lines(),
            vec!["Feeds:", "* Blog", "  Link: https://example.com"]
        );
    }

    #[test]
    fn test_separator_and_clear() {
        let (mut ui, buffer) = Renderer::buffered();
        ui.separator().unwrap();
        assert_eq!(buffer.contents().trim_end().len(), SEPARATOR_WIDTH);

        buffer.clear();
        assert!(buffer.contents().is_empty());
    }
}
