use std::sync::Mutex;
use tracing::{error, warn};

/// Where a reported problem happened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub repo_name: String,
    pub commit_id: String,
    pub file: Option<String>,
    pub locale: Option<String>,
}

impl ErrorContext {
    pub fn new(repo_name: &str, commit_id: &str) -> Self {
        Self {
            repo_name: repo_name.to_string(),
            commit_id: commit_id.to_string(),
            ..Self::default()
        }
    }

    pub fn file(mut self, file: &str) -> Self {
        self.file = Some(file.to_string());
        self
    }

    pub fn locale(mut self, locale: &str) -> Self {
        self.locale = Some(locale.to_string());
        self
    }
}

/// Receives non-fatal problems; processing continues after a report
pub trait ErrorReporter: Send + Sync {
    fn report_warning(&self, message: &str, context: &ErrorContext);
    fn report_error(&self, message: &str, context: &ErrorContext);
}

/// Reports through `tracing`
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report_warning(&self, message: &str, context: &ErrorContext) {
        warn!(
            repo = %context.repo_name,
            commit = %context.commit_id,
            file = context.file.as_deref(),
            locale = context.locale.as_deref(),
            "{}",
            message
        );
    }

    fn report_error(&self, message: &str, context: &ErrorContext) {
        error!(
            repo = %context.repo_name,
            commit = %context.commit_id,
            file = context.file.as_deref(),
            locale = context.locale.as_deref(),
            "{}",
            message
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Keeps every report in memory
#[derive(Default)]
pub struct CollectingReporter {
    reports: Mutex<Vec<(Severity, String, ErrorContext)>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(Severity, String, ErrorContext)> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn push(&self, severity: Severity, message: &str, context: &ErrorContext) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push((severity, message.to_string(), context.clone()));
        }
    }
}

impl ErrorReporter for CollectingReporter {
    fn report_warning(&self, message: &str, context: &ErrorContext) {
        self.push(Severity::Warning, message, context);
    }

    fn report_error(&self, message: &str, context: &ErrorContext) {
        self.push(Severity::Error, message, context);
    }
}
