//! Reporter writing to the terminal.

use std::io::{self, Write};

use crossterm::style::Stylize;
use relfetch_core::Reporter;

use super::theme::Icons;

/// How messages are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Colored lines with icons.
    Terminal,
    /// GitHub Actions workflow commands for warnings and errors.
    Actions,
}

impl OutputMode {
    /// `Actions` when running inside a GitHub Actions job.
    pub fn detect() -> Self {
        if std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true") {
            Self::Actions
        } else {
            Self::Terminal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Writes status to stderr.
#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    mode: OutputMode,
    icons: Icons,
}

impl ConsoleReporter {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            icons: Icons::default(),
        }
    }

    fn render(&self, severity: Severity, msg: &str) -> String {
        match (self.mode, severity) {
            (OutputMode::Actions, Severity::Warning) => {
                format!("::warning::{}", escape_data(msg))
            }
            (OutputMode::Actions, Severity::Error) => format!("::error::{}", escape_data(msg)),
            (OutputMode::Actions, Severity::Info) => msg.to_string(),
            (OutputMode::Actions, Severity::Success) => format!("{} {msg}", self.icons.success),
            (OutputMode::Terminal, Severity::Info) => format!("  {} {msg}", self.icons.info),
            (OutputMode::Terminal, Severity::Success) => {
                format!("{} {}", self.icons.success.green(), msg.green())
            }
            (OutputMode::Terminal, Severity::Warning) => {
                format!("{} {}", self.icons.warning.yellow(), msg.yellow())
            }
            (OutputMode::Terminal, Severity::Error) => {
                format!("{} {}", self.icons.error.red(), msg.red())
            }
        }
    }

    fn emit(&self, severity: Severity, msg: &str) {
        let line = self.render(severity, msg);
        // stderr going away is not worth failing the install over
        let _ = writeln!(io::stderr().lock(), "{line}");
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(OutputMode::detect())
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        let line = match self.mode {
            OutputMode::Terminal => format!("{} {}", title.bold(), "─".repeat(40).dark_grey()),
            OutputMode::Actions => title.to_string(),
        };
        let _ = writeln!(io::stderr().lock(), "{line}");
    }

    fn info(&self, msg: &str) {
        self.emit(Severity::Info, msg);
    }

    fn success(&self, msg: &str) {
        self.emit(Severity::Success, msg);
    }

    fn warning(&self, msg: &str) {
        self.emit(Severity::Warning, msg);
    }

    fn error(&self, msg: &str) {
        self.emit(Severity::Error, msg);
    }
}

/// Escape a message for a workflow command so it stays on one line.
fn escape_data(msg: &str) -> String {
    msg.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
