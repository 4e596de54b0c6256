//! Observation sink for PRN (and the MUL result).
//!
//! The CPU never touches stdout itself; it hands each emitted byte to an
//! [`Output`] supplied by the caller.

use std::io::Write;

/// A write-only channel for values the program emits.
pub trait Output {
    /// Emit one value. Values arrive in program order.
    fn emit(&mut self, value: u8) -> std::io::Result<()>;
}

/// Collects raw values; handy for tests and embedders.
impl Output for Vec<u8> {
    fn emit(&mut self, value: u8) -> std::io::Result<()> {
        self.push(value);
        Ok(())
    }
}

/// Writes each value in decimal, one per line.
#[derive(Debug)]
pub struct LineOutput<W: Write> {
    writer: W,
}

impl<W: Write> LineOutput<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Output for LineOutput<W> {
    fn emit(&mut self, value: u8) -> std::io::Result<()> {
        writeln!(self.writer, "{}", value)?;
        self.writer.flush()
    }
}
