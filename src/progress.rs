//! Ingestion progress reporting.
//!
//! Every resolved fetch in a batch emits one event with a monotonically
//! increasing `completed` count, so callers can render "completed / total".
//! Progress goes to **stderr** so stdout stays parseable for scripts.

use std::io::Write;

/// A single progress event for an ingestion batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestProgressEvent {
    /// The batch is about to fetch `total` validated URLs.
    Started { total: u64 },
    /// One URL resolved (successfully or not).
    Fetched {
        url: String,
        completed: u64,
        total: u64,
        ok: bool,
    },
}

/// Receives progress events from the corpus manager.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: IngestProgressEvent);
}

/// Human-friendly progress on stderr: "ingest  3 / 5 urls  ok  https://…".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: IngestProgressEvent) {
        let line = match &event {
            IngestProgressEvent::Started { total } => {
                format!("ingest  processing {} urls...\n", total)
            }
            IngestProgressEvent::Fetched {
                url,
                completed,
                total,
                ok,
            } => {
                let status = if *ok { "ok" } else { "failed" };
                format!(
                    "ingest  {} / {} urls  {}  {}\n",
                    completed, total, status, url
                )
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: IngestProgressEvent) {
        let obj = match &event {
            IngestProgressEvent::Started { total } => serde_json::json!({
                "event": "progress",
                "phase": "started",
                "total": total
            }),
            IngestProgressEvent::Fetched {
                url,
                completed,
                total,
                ok,
            } => serde_json::json!({
                "event": "progress",
                "phase": "fetched",
                "url": url,
                "completed": completed,
                "total": total,
                "ok": ok
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: IngestProgressEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_map_to_reporters() {
        // Smoke: every mode builds a reporter that accepts events.
        for mode in [ProgressMode::Off, ProgressMode::Human, ProgressMode::Json] {
            mode.reporter().report(IngestProgressEvent::Started { total: 0 });
        }
    }

    #[test]
    fn progress_mode_parses_from_cli_values() {
        use clap::ValueEnum;
        assert_eq!(ProgressMode::from_str("json", true), Ok(ProgressMode::Json));
        assert_eq!(ProgressMode::from_str("Human", true), Ok(ProgressMode::Human));
        assert!(ProgressMode::from_str("loud", true).is_err());
    }
}
