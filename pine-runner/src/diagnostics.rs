use serde::{Deserialize, Serialize};

/// Which layer produced the diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Syntax,
    Validation,
    Runtime,
}

/// Severity used across validation and runtime diagnostics. Errors block
/// execution; warnings and info do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Structured, line-addressed message surfaced to users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// 1-based line number.
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn validation_error(line: usize, message: impl Into<String>, suggestion: Option<String>) -> Self {
        Self {
            kind: DiagnosticKind::Validation,
            severity: Severity::Error,
            line,
            column: None,
            message: message.into(),
            suggestion,
        }
    }

    pub fn validation_warning(line: usize, message: impl Into<String>, suggestion: Option<String>) -> Self {
        Self {
            kind: DiagnosticKind::Validation,
            severity: Severity::Warning,
            line,
            column: None,
            message: message.into(),
            suggestion,
        }
    }

    pub fn runtime_error(line: usize, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Runtime,
            severity: Severity::Error,
            line,
            column: None,
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error
    }
}
