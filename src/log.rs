//! Injected log sink. The core never owns a subscriber; callers supply one.

/// Severity of a log line emitted by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Info,
    Warn,
    Error,
}

/// A collaborator that the orchestrator and scheduler emit messages to.
///
/// Default methods forward to [`LogSink::log`] so implementers only have to
/// provide one method, but may override individual levels.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);

    fn trace(&self, message: &str) {
        self.log(LogLevel::Trace, message);
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// A sink that discards everything. Used when no `log` option is supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl LogSink for NullLog {
    fn log(&self, _level: LogLevel, _message: &str) {}
}

#[cfg(test)]
pub(crate) struct CollectingLog {
    pub lines: std::sync::Mutex<Vec<(LogLevel, String)>>,
}

#[cfg(test)]
impl Default for CollectingLog {
    fn default() -> Self {
        Self {
            lines: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
impl LogSink for CollectingLog {
    fn log(&self, level: LogLevel, message: &str) {
        self.lines.lock().unwrap().push((level, message.to_owned()));
    }
}
