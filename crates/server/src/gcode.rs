use std::io::{self, Write};
use std::sync::Mutex;

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("G-code link I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("G-code writer lock poisoned")]
    Poisoned,
}

/// Where G-code lines end up. The printer serial link lives behind this.
pub trait GcodeSink: Send + Sync {
    fn send(&self, line: &str) -> Result<(), SinkError>;
}

/// Writes each line to the log instead of a printer.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl GcodeSink for LogSink {
    fn send(&self, line: &str) -> Result<(), SinkError> {
        info!(gcode = line, "Sending G-code");
        Ok(())
    }
}

/// Newline-terminated lines to any writer, typically the printer's serial
/// device opened as a file. Each line is flushed before `send` returns.
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer) }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> GcodeSink for WriterSink<W> {
    fn send(&self, line: &str) -> Result<(), SinkError> {
        let mut writer = self.writer.lock().map_err(|_| SinkError::Poisoned)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
