//! Structured trace of every invocation decision.
//!
//! A batch run has no interactive console, so each stage of a request
//! (resolution, matching, coercion, invocation) is written down as a
//! [`TraceRecord`]. The [`TraceSink`] is acquired once per chain run and lent
//! to one step at a time through a [`StepTrace`] guard, which flushes the
//! step's records when it goes out of scope on every exit path.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Request,
    Resolve,
    Match,
    Coerce,
    Invoke,
    Failure,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceRecord {
    pub at: DateTime<Utc>,
    pub step: usize,
    pub stage: Stage,
    pub message: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
}

#[derive(Debug)]
enum Destination {
    Buffered,
    File { path: PathBuf, writer: BufWriter<File> },
}

/// Owner of the trace for one chain run.
#[derive(Debug)]
pub struct TraceSink {
    destination: Destination,
    pending: Vec<TraceRecord>,
    flushed: Vec<TraceRecord>,
    steps: usize,
}

impl TraceSink {
    /// Records are re-emitted through `tracing` when each step ends.
    pub fn buffered() -> Self {
        Self { destination: Destination::Buffered, pending: Vec::new(), flushed: Vec::new(), steps: 0 }
    }
    /// Records are appended to `path` as JSON lines when each step ends.
    pub fn to_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            destination: Destination::File { path, writer: BufWriter::new(file) },
            pending: Vec::new(),
            flushed: Vec::new(),
            steps: 0,
        })
    }
    pub fn path(&self) -> Option<&Path> {
        match &self.destination {
            Destination::Buffered => None,
            Destination::File { path, .. } => Some(path),
        }
    }
    /// Lends the sink to the next chain step.
    pub fn begin_step(&mut self) -> StepTrace<'_> {
        self.steps += 1;
        StepTrace { step: self.steps, sink: self, finished: false }
    }
    /// Every record of the steps ended so far, in order, including those
    /// whose write to the trace file failed.
    pub fn records(&self) -> &[TraceRecord] {
        &self.flushed
    }
    pub fn steps(&self) -> usize {
        self.steps
    }
    fn flush(&mut self) -> Result<()> {
        let written = match &mut self.destination {
            Destination::Buffered => {
                for r in &self.pending {
                    let fields = Value::Object(r.fields.clone());
                    info!(target: "invoker::trace", step = r.step, stage = ?r.stage, %fields, "{}", r.message);
                }
                Ok(())
            }
            Destination::File { writer, .. } => write_lines(writer, &self.pending),
        };
        self.flushed.append(&mut self.pending);
        written
    }
}

fn write_lines(writer: &mut BufWriter<File>, records: &[TraceRecord]) -> Result<()> {
    for r in records {
        serde_json::to_writer(&mut *writer, r)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// The trace as seen by one chain step. Dropping it flushes the step.
#[derive(Debug)]
pub struct StepTrace<'s> {
    step: usize,
    sink: &'s mut TraceSink,
    finished: bool,
}

impl StepTrace<'_> {
    pub fn step(&self) -> usize {
        self.step
    }
    pub fn record(&mut self, stage: Stage, message: impl Into<String>) {
        self.record_with(stage, message, Map::new());
    }
    pub fn record_with(&mut self, stage: Stage, message: impl Into<String>, fields: Map<String, Value>) {
        self.sink.pending.push(TraceRecord {
            at: Utc::now(),
            step: self.step,
            stage,
            message: message.into(),
            fields,
        });
    }
    /// Flushes the step now so that I/O errors reach the caller.
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        self.sink.flush()
    }
}

impl Drop for StepTrace<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.finished = true;
            if let Err(e) = self.sink.flush() {
                warn!(error = %e, step = self.step, "trace flush failed");
            }
        }
    }
}

/// Builds a field map for [`StepTrace::record_with`].
#[macro_export]
macro_rules! fields {
    ($($key:literal => $value:expr),* $(,)?) => {{
        let mut map = ::serde_json::Map::new();
        $( map.insert($key.to_owned(), ::serde_json::json!($value)); )*
        map
    }};
}
