//! Display formatting for run results.
//!
//! Raw API payloads carry timestamps as seconds since the epoch. Formatting produces
//! new `Display*` values whose timestamps are strings, so a payload can only be
//! formatted once.

use crate::model::{ProcResult, ProcessArgument, RunResult};
use serde::Serialize;
use time::{OffsetDateTime, UtcOffset};

/// Rendered in place of a timestamp the backend has not filled in yet.
pub const MISSING_TIMESTAMP: &str = "-";
/// Rendered for a timestamp outside the representable calendar range.
pub const INVALID_TIMESTAMP: &str = "invalid";

/// Timezone used to turn epoch timestamps into calendar strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampFormat {
    offset: UtcOffset,
}

impl TimestampFormat {
    /// Use the machine's local offset, falling back to UTC when it cannot be determined.
    ///
    /// Call this before any threads are spawned; the lookup refuses to run in a
    /// multi-threaded process on some platforms.
    pub fn local() -> Self {
        Self {
            offset: UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        }
    }

    pub fn utc() -> Self {
        Self {
            offset: UtcOffset::UTC,
        }
    }

    #[cfg(test)]
    pub fn fixed(offset: UtcOffset) -> Self {
        Self { offset }
    }
}

impl Default for TimestampFormat {
    fn default() -> Self {
        Self::utc()
    }
}

/// Format seconds since the epoch as `YYYY-MM-DD HH:MM:SS` in the configured offset.
pub fn to_date_time_string(seconds: Option<f64>, fmt: &TimestampFormat) -> String {
    let Some(seconds) = seconds else {
        return MISSING_TIMESTAMP.to_string();
    };
    // Wire format is seconds; go through milliseconds before building the datetime.
    let millis = (seconds * 1000.0).round();
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return INVALID_TIMESTAMP.to_string();
    }
    let nanos = (millis as i64) as i128 * 1_000_000;
    let Ok(utc) = OffsetDateTime::from_unix_timestamp_nanos(nanos) else {
        return INVALID_TIMESTAMP.to_string();
    };
    // Keep clear of the calendar edges so shifting the offset cannot overflow.
    if utc.year().abs() >= 9999 {
        return INVALID_TIMESTAMP.to_string();
    }
    utc.to_offset(fmt.offset)
        .format(time::macros::format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| INVALID_TIMESTAMP.to_string())
}

/// A process result ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayProc {
    pub id: Option<i64>,
    pub proc_name: String,
    pub run_order: Option<i64>,
    pub result: String,
    pub arguments: Vec<ProcessArgument>,
    pub arguments_str: String,
    pub timestamp_start: String,
    pub timestamp_stop: String,
}

/// A run result ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRun {
    pub id: Option<i64>,
    pub description: String,
    pub environment_name: Option<String>,
    pub status: String,
    pub timestamp_start: String,
    pub timestamp_stop: String,
    pub proc_results: Vec<DisplayProc>,
}

impl DisplayRun {
    pub fn result_lines(&self) -> Vec<String> {
        to_proc_result_strings(&self.proc_results)
    }
}

pub fn format_proc(proc_result: &ProcResult, fmt: &TimestampFormat) -> DisplayProc {
    DisplayProc {
        id: proc_result.id,
        proc_name: proc_result.proc_name.clone(),
        run_order: proc_result.run_order,
        result: proc_result.result.clone(),
        arguments: proc_result.arguments.clone(),
        arguments_str: proc_result.arguments_str.clone(),
        timestamp_start: to_date_time_string(proc_result.timestamp_start, fmt),
        timestamp_stop: to_date_time_string(proc_result.timestamp_stop, fmt),
    }
}

pub fn format_run(run: &RunResult, fmt: &TimestampFormat) -> DisplayRun {
    DisplayRun {
        id: run.id,
        description: run.description.clone(),
        environment_name: run.environment_name.clone(),
        status: run.status.clone(),
        timestamp_start: to_date_time_string(run.timestamp_start, fmt),
        timestamp_stop: to_date_time_string(run.timestamp_stop, fmt),
        proc_results: run
            .proc_results
            .iter()
            .map(|p| format_proc(p, fmt))
            .collect(),
    }
}

/// Anything that names a process and carries its result text.
pub trait ProcOutcome {
    fn proc_name(&self) -> &str;
    fn result(&self) -> &str;
}

impl ProcOutcome for ProcResult {
    fn proc_name(&self) -> &str {
        &self.proc_name
    }
    fn result(&self) -> &str {
        &self.result
    }
}

impl ProcOutcome for DisplayProc {
    fn proc_name(&self) -> &str {
        &self.proc_name
    }
    fn result(&self) -> &str {
        &self.result
    }
}

/// One `"proc_name: result"` line per process, in order.
pub fn to_proc_result_strings<P: ProcOutcome>(proc_results: &[P]) -> Vec<String> {
    proc_results
        .iter()
        .map(|p| format!("{}: {}", p.proc_name(), p.result()))
        .collect()
}
