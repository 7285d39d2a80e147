use std::io::{self, Write};

use anyhow::{Context, Result};

use super::KeyOutputSink;

/// Simulation sink: echoes characters to a writer and erases with `"\b \b"`.
pub struct ConsoleSink<W: Write + Send> {
    out: W,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> KeyOutputSink for ConsoleSink<W> {
    fn name(&self) -> &'static str {
        "console"
    }

    fn emit_char(&mut self, c: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.out
            .write_all(c.encode_utf8(&mut buf).as_bytes())
            .context("failed to write character to console")?;
        self.out.flush().context("failed to flush console")
    }

    fn emit_backspace(&mut self) -> Result<()> {
        self.out
            .write_all(b"\x08 \x08")
            .context("failed to write backspace to console")?;
        self.out.flush().context("failed to flush console")
    }
}
