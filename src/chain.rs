//! Splitting of a flat command line into calls, and running them in order.
//!
//! ```text
//! [ -invokeLog <path> ] <entry-marker> <call> [ -next <call> ]*
//! ```
//!
//! Calls run strictly one after another. The first call that fails stops the
//! chain: later calls never run, earlier side effects are kept, and the exit
//! code is non-zero.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use tracing::{error, info};

use crate::datatype::ParsedValue;
use crate::error::{InvokeError, Result};
use crate::executor::{InvocationRequest, Invoker};
use crate::fields;
use crate::trace::{Stage, TraceSink};

pub const NEXT_MARKER: &str = "-next";
pub const LOG_OPTION: &str = "-invokeLog";

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

// A leading dash either starts a negative number or a host option. Numbers
// are plain decimals; exponent forms such as `-1e5` count as options.
fn is_option(token: &str) -> bool {
    token.starts_with('-') && (token.contains(['e', 'E']) || BigDecimal::from_str(token).is_err())
}

/// Finds the trace file requested with `-invokeLog <path>`, if any.
pub fn log_path(tokens: &[String]) -> Option<&str> {
    let at = tokens.iter().position(|t| t == LOG_OPTION)?;
    tokens.get(at + 1).map(String::as_str)
}

/// The calls of one command line, each still as raw tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    calls: Vec<Vec<String>>,
}

impl Chain {
    /// Everything after `entry_marker`, split on `-next`. An unrecognized
    /// option ends the stream; the call it interrupts is kept.
    pub fn parse(tokens: &[String], entry_marker: &str) -> Result<Chain> {
        let start = tokens
            .iter()
            .position(|t| t == entry_marker)
            .filter(|at| at + 1 < tokens.len())
            .ok_or_else(|| InvokeError::InvalidCommandLine("nothing to invoke".into()))?;

        let mut calls = Vec::new();
        let mut current = Vec::new();
        for token in &tokens[start + 1..] {
            if token == NEXT_MARKER {
                calls.push(std::mem::take(&mut current));
            } else if is_option(token) {
                break;
            } else {
                current.push(token.clone());
            }
        }
        calls.push(current);
        Ok(Chain { calls })
    }
    pub fn calls(&self) -> &[Vec<String>] {
        &self.calls
    }
    pub fn len(&self) -> usize {
        self.calls.len()
    }
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Runs the calls in order until one fails. Each call gets its own trace
    /// step, flushed before the next call starts.
    pub fn run(&self, invoker: &Invoker, sink: &mut TraceSink) -> ChainReport {
        let mut report = ChainReport::default();
        for call in &self.calls {
            let mut step = sink.begin_step();
            let outcome = InvocationRequest::from_tokens(call).and_then(|request| invoker.execute(&request, &mut step));
            match outcome {
                Ok(value) => {
                    if let Err(e) = step.finish() {
                        error!(error = %e, "trace flush failed");
                        report.failure = Some(e);
                        return report;
                    }
                    report.results.push(value);
                }
                Err(e) => {
                    step.record_with(
                        Stage::Failure,
                        format!("Call aborted the chain:  {e}"),
                        fields! { "kind" => e.kind(), "call" => call },
                    );
                    drop(step);
                    error!(error = %e, "invocation failed, chain aborted");
                    report.failure = Some(e);
                    return report;
                }
            }
        }
        report
    }
}

/// What happened to a chain: the values of the calls that completed and,
/// when the chain stopped early, why.
#[derive(Debug, Default)]
pub struct ChainReport {
    pub results: Vec<Option<ParsedValue>>,
    pub failure: Option<InvokeError>,
}

impl ChainReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() { EXIT_SUCCESS } else { EXIT_FAILURE }
    }
}

/// Runs a whole command line and maps the outcome to an exit code. The trace
/// goes to the `-invokeLog` file when one is given, otherwise to `tracing`.
pub fn run(invoker: &Invoker, tokens: &[String], entry_marker: &str) -> i32 {
    let mut sink = match log_path(tokens) {
        Some(path) => match TraceSink::to_file(path) {
            Ok(sink) => sink,
            Err(e) => {
                error!(error = %e, path, "cannot open trace file");
                return EXIT_FAILURE;
            }
        },
        None => TraceSink::buffered(),
    };
    run_with(invoker, tokens, entry_marker, &mut sink).exit_code()
}

/// Like [`run`] but with a caller supplied trace sink.
pub fn run_with(invoker: &Invoker, tokens: &[String], entry_marker: &str, sink: &mut TraceSink) -> ChainReport {
    let chain = match Chain::parse(tokens, entry_marker) {
        Ok(chain) => chain,
        Err(e) => {
            let mut step = sink.begin_step();
            step.record_with(Stage::Failure, "Nothing to invoke", fields! { "kind" => e.kind(), "tokens" => tokens });
            drop(step);
            error!(error = %e, "invalid command line");
            return ChainReport { results: Vec::new(), failure: Some(e) };
        }
    };
    info!(calls = chain.len(), "running chain");
    chain.run(invoker, sink)
}
