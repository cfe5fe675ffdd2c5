//! JSON-lines sink for pipelines

use std::io::{self, Write};

use super::ReportSink;
use crate::core::summary::TrimSummary;

pub struct JsonSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for JsonSink<W> {
    fn emit(&mut self, summary: &TrimSummary) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, summary)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}
