// Result log (CSV)
// (c) 2024 Ross Younger

use std::{fs::File, io::Write, path::Path};

use chrono::{DateTime, Local};

use crate::{run::SpeedTestResult, settings::TimestampFormat};

/// First line of every result log
pub const HEADER: &str = "Time,Download (Mbps),Upload (Mbps)";

/// One row of the result log
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunLogRecord {
    /// When the run finished
    pub timestamp: DateTime<Local>,
    /// None if not measured
    pub download_mbps: Option<f64>,
    /// None if not measured
    pub upload_mbps: Option<f64>,
}

impl RunLogRecord {
    /// Standard constructor. Sentinel values in the result become blank fields.
    #[must_use]
    pub fn new(timestamp: DateTime<Local>, result: &SpeedTestResult) -> Self {
        Self {
            timestamp,
            download_mbps: result.download(),
            upload_mbps: result.upload(),
        }
    }

    /// Formats the row, without line terminator
    #[must_use]
    pub fn render(&self, format: TimestampFormat) -> String {
        let field = |v: Option<f64>| v.map_or_else(String::new, |v| v.to_string());
        format!(
            "{},{},{}",
            self.timestamp.format(format.pattern()),
            field(self.download_mbps),
            field(self.upload_mbps)
        )
    }
}

/// Append-only writer for the result log.
///
/// The header is written when the log is opened. Each row is written with a single write call
/// of a complete line; nothing already written is ever touched again.
#[derive(Debug)]
pub struct ResultLog<W: Write> {
    writer: W,
    format: TimestampFormat,
    rows: usize,
}

impl ResultLog<File> {
    /// Creates a new result log file. It is an error if the file already exists.
    pub fn create(path: &Path, format: TimestampFormat) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .append(true)
            .create_new(true)
            .open(path)?;
        Self::new(file, format)
    }
}

impl<W: Write> ResultLog<W> {
    /// Wraps a writer, emitting the header line
    pub fn new(writer: W, format: TimestampFormat) -> std::io::Result<Self> {
        let mut new1 = Self {
            writer,
            format,
            rows: 0,
        };
        new1.write_line(HEADER)?;
        Ok(new1)
    }

    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        self.writer.write_all(buf.as_bytes())?;
        self.writer.flush()
    }

    /// Appends one row
    pub fn append(&mut self, record: &RunLogRecord) -> std::io::Result<()> {
        self.write_line(&record.render(self.format))?;
        self.rows += 1;
        Ok(())
    }

    /// Number of rows appended (not counting the header)
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Gives up the underlying writer
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}
