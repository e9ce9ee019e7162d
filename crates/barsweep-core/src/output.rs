//! Streaming JSON / JSONL writers for scan outcomes.
//!
//! Records are written as soon as they are produced so a long batch can be
//! followed live. In JSON mode the records form a single array which is
//! opened by the first record and closed by [`OutputWriter::finish`].

use serde::Serialize;
use std::io::{self, Write};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One JSON array holding every record
    #[default]
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Incrementally serializes records to a writer.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    records: usize,
    finished: bool,
}

impl<W: Write> OutputWriter<W> {
    /// Create a new output writer. `pretty` only affects JSON format.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            records: 0,
            finished: false,
        }
    }

    /// Write one record and flush it through.
    pub fn write_record<T: Serialize>(&mut self, record: &T) -> io::Result<()> {
        if self.finished {
            return Err(io::Error::other("output already finished"));
        }

        match self.format {
            OutputFormat::Json => {
                let separator = if self.records == 0 { "[" } else { "," };
                if self.pretty {
                    writeln!(self.writer, "{separator}")?;
                    serde_json::to_writer_pretty(&mut self.writer, record)
                        .map_err(io::Error::other)?;
                } else {
                    write!(self.writer, "{separator}")?;
                    serde_json::to_writer(&mut self.writer, record).map_err(io::Error::other)?;
                }
            }
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, record).map_err(io::Error::other)?;
                writeln!(self.writer)?;
            }
        }

        self.records += 1;
        self.writer.flush()
    }

    /// Close the output. In JSON mode this terminates the array (an empty
    /// batch produces `[]`). Calling it twice is a no-op.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        if self.format == OutputFormat::Json {
            match (self.records, self.pretty) {
                (0, _) => writeln!(self.writer, "[]")?,
                (_, true) => writeln!(self.writer, "\n]")?,
                (_, false) => writeln!(self.writer, "]")?,
            }
        }
        self.finished = true;
        self.writer.flush()
    }

    /// Number of records written so far.
    pub fn records_written(&self) -> usize {
        self.records
    }

    /// Finish the output and return the underlying writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.finish()?;
        Ok(self.writer)
    }
}
