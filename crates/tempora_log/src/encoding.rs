//! JSON encoding of whole event logs.
//!
//! A log is either one JSON array of event records or JSON Lines (one record
//! per line). Records can be read raw, for validation, or as typed events.

use crate::event::{Event, RecordError};
use serde_json::Value;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
/// On-disk layout of a log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// A single JSON array
    Json,
    /// One JSON object per line
    #[default]
    JsonLines,
}

impl LogFormat {
    /// Guess the layout from a path extension (`.json` vs anything else)
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::Json,
            _ => Self::JsonLines,
        }
    }
}

/// Encoding errors
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    /// Underlying reader or writer failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON
    #[error("malformed JSON at line {line}: {source}")]
    Json {
        /// 1-based line (1 for a whole-array log, 0 when writing)
        line: usize,
        /// Parser failure
        #[source]
        source: serde_json::Error,
    },
    /// Top-level JSON value is not an array of records
    #[error("expected a JSON array of event records")]
    NotAnArray,
    /// A record could not be read as an event
    #[error("record {index}: {source}")]
    Record {
        /// 0-based position in the log
        index: usize,
        /// Why the record was rejected
        #[source]
        source: RecordError,
    },
}

/// Reader for event logs
pub struct LogReader<R> {
    reader: R,
}

impl LogReader<BufReader<std::fs::File>> {
    /// Open a log file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EncodingError> {
        let file = std::fs::File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> LogReader<R> {
    /// Create a new reader
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read every raw record, detecting the layout from the first
    /// non-whitespace byte (`[` means a JSON array).
    ///
    /// # Errors
    ///
    /// Returns error on I/O failure or malformed JSON
    pub fn read_records(mut self) -> Result<Vec<Value>, EncodingError> {
        let mut text = String::new();
        self.reader.read_to_string(&mut text)?;

        let records = if text.trim_start().starts_with('[') {
            match serde_json::from_str::<Value>(&text)
                .map_err(|source| EncodingError::Json { line: 1, source })?
            {
                Value::Array(items) => items,
                _ => return Err(EncodingError::NotAnArray),
            }
        } else {
            let mut items = Vec::new();
            for (idx, line) in text.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let value = serde_json::from_str(line)
                    .map_err(|source| EncodingError::Json { line: idx + 1, source })?;
                items.push(value);
            }
            items
        };

        tracing::debug!(records = records.len(), "read event log");
        Ok(records)
    }

    /// Read every record as a typed event
    ///
    /// # Errors
    ///
    /// Returns error on malformed JSON or on the first record that is not an event
    pub fn read_events(self) -> Result<Vec<Event>, EncodingError> {
        self.read_records()?
            .iter()
            .enumerate()
            .map(|(index, record)| {
                Event::from_record(record).map_err(|source| EncodingError::Record { index, source })
            })
            .collect()
    }
}

/// Writer for event logs
pub struct LogWriter<W> {
    writer: W,
    format: LogFormat,
}

impl<W: Write> LogWriter<W> {
    /// Create a new writer
    pub fn new(writer: W, format: LogFormat) -> Self {
        Self { writer, format }
    }

    /// Write all events in the writer's format
    ///
    /// # Errors
    ///
    /// Returns error if writing fails
    pub fn write_events(&mut self, events: &[Event]) -> Result<(), EncodingError> {
        match self.format {
            LogFormat::Json => {
                serde_json::to_writer_pretty(&mut self.writer, events)
                    .map_err(|source| EncodingError::Json { line: 0, source })?;
                self.writer.write_all(b"\n")?;
            }
            LogFormat::JsonLines => {
                for event in events {
                    serde_json::to_writer(&mut self.writer, event)
                        .map_err(|source| EncodingError::Json { line: 0, source })?;
                    self.writer.write_all(b"\n")?;
                }
            }
        }
        Ok(())
    }

    /// Flush the writer
    ///
    /// # Errors
    ///
    /// Returns error if flushing fails
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }

    /// Consume and return the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}
