//! Reporting sinks
//!
//! The core only produces `TrimSummary` values; sinks decide how they look.

pub mod json;
pub mod table;

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::core::summary::TrimSummary;

pub use json::JsonSink;
pub use table::TableSink;

/// Receives one summary per pass.
pub trait ReportSink {
    fn emit(&mut self, summary: &TrimSummary) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human readable tables
    #[default]
    Table,
    /// One JSON document per pass, one per line
    Json,
}

/// Build a sink writing to `output` (appending) or stdout.
pub fn open_sink(format: OutputFormat, output: Option<&Path>) -> io::Result<Box<dyn ReportSink>> {
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(OpenOptions::new().create(true).append(true).open(path)?),
        None => Box::new(io::stdout()),
    };
    Ok(match format {
        OutputFormat::Table => Box::new(TableSink::new(writer)),
        OutputFormat::Json => Box::new(JsonSink::new(writer)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    #[test]
    fn test_file_output_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passes.jsonl");

        for _ in 0..2 {
            let mut sink = open_sink(OutputFormat::Json, Some(&path)).unwrap();
            sink.emit(&TrimSummary::suppressed(Local::now())).unwrap();
        }

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
