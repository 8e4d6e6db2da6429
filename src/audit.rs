use chrono::{DateTime, Local, Utc};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Severity of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Debug,
    Information,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Debug => write!(f, "DBG"),
            Severity::Information => write!(f, "INF"),
            Severity::Error => write!(f, "ERR"),
        }
    }
}

/// One append-only audit record. No identity beyond insertion order.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AuditEvent {
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

enum Backend {
    /// Log file named from the wall clock at sink construction; created
    /// lazily on the first write.
    File { path: PathBuf, file: Option<File> },
    /// Events retained in memory, for test assertions.
    Memory(Vec<AuditEvent>),
}

/// Append-only audit sink shared by all pipeline stages.
///
/// `log` is best-effort and never fails the caller; a sink that cannot write
/// drops the event. Writes from concurrent stages serialize on an internal
/// mutex, so lines never interleave.
pub struct AuditSink {
    backend: Mutex<Backend>,
}

impl AuditSink {
    /// File-backed sink writing to `<dir>/organizer-YYYYMMDD-HHMMSS.log`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let name = Local::now().format("organizer-%Y%m%d-%H%M%S.log").to_string();
        Self {
            backend: Mutex::new(Backend::File {
                path: dir.into().join(name),
                file: None,
            }),
        }
    }

    /// In-memory sink retaining events for inspection.
    pub fn in_memory() -> Self {
        Self {
            backend: Mutex::new(Backend::Memory(Vec::new())),
        }
    }

    /// Append one event. Best-effort: I/O failures are swallowed.
    pub fn log(&self, severity: Severity, text: impl Into<String>) {
        let event = AuditEvent {
            severity,
            timestamp: Utc::now(),
            text: text.into(),
        };

        let mut backend = match self.backend.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };

        match &mut *backend {
            Backend::File { path, file } => {
                if file.is_none() {
                    *file = OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(path.as_path())
                        .ok();
                }
                if let Some(f) = file {
                    let _ = writeln!(
                        f,
                        "{} [{}] {}",
                        event.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                        event.severity,
                        event.text
                    );
                }
            }
            Backend::Memory(events) => events.push(event),
        }
    }

    pub fn debug(&self, text: impl Into<String>) {
        self.log(Severity::Debug, text);
    }

    pub fn info(&self, text: impl Into<String>) {
        self.log(Severity::Information, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.log(Severity::Error, text);
    }

    /// Snapshot of retained events. Empty for file-backed sinks.
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.backend.lock() {
            Ok(guard) => match &*guard {
                Backend::Memory(events) => events.clone(),
                Backend::File { .. } => Vec::new(),
            },
            Err(_) => Vec::new(),
        }
    }

    /// Count of retained events at the given severity. Zero for file-backed
    /// sinks.
    pub fn count(&self, severity: Severity) -> usize {
        self.events()
            .iter()
            .filter(|e| e.severity == severity)
            .count()
    }
}
