//! Pine script runner: validate, translate, and execute a recognized
//! subset of Pine against OHLCV bars, producing chart-ready plot series.
//!
//! The pipeline is `validate_script` -> `translate` -> `execute`. The
//! whole run is a pure function of `(source, bars)`: repeated calls give
//! identical results, including `math.random` (fixed-seed RNG per run).

pub mod ast;
pub mod color;
pub mod diagnostics;
pub mod eval;
pub mod lexer;
pub mod metrics;
pub mod parser;
pub mod result;
pub mod validate;
pub mod value;

use thiserror::Error;

pub use series_core::{generate_mock_ohlc, Bar, BarSeries, SeriesError};

pub use crate::diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use crate::eval::execute;
pub use crate::metrics::{last_metrics, set_debug_mode, ExecutionMetrics};
pub use crate::parser::translate;
pub use crate::result::{PlotKind, PlotResult, PlotStyle};
pub use crate::validate::validate_script;
pub use crate::value::Value;

#[derive(Debug, Error)]
pub enum RunnerError {
    /// Blocking validation diagnostics; message is the newline-joined
    /// `Line N: message` list with suggestion bullets.
    #[error("{}", format_diagnostics(.0))]
    Validation(Vec<Diagnostic>),
    #[error("Runtime Error: {message}")]
    Runtime { line: usize, message: String },
    #[error(transparent)]
    Series(#[from] SeriesError),
}

fn format_diagnostics(diags: &[Diagnostic]) -> String {
    let mut out = String::new();
    for d in diags {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("Line {}: {}", d.line, d.message));
        if let Some(s) = &d.suggestion {
            out.push_str(&format!("\n  - {s}"));
        }
    }
    out
}

/// Validate and run a script against the given bars.
///
/// Blocking validation errors reject the run before execution; warnings
/// are logged and execution proceeds. On success every returned
/// [`PlotResult`] has `bars.len()` values, in sink call order.
pub fn run_pine_script(source: &str, bars: &[Bar]) -> Result<Vec<PlotResult>, RunnerError> {
    let start_ms = metrics::now_ms();

    let diags = validate_script(source);
    let blocking: Vec<Diagnostic> = diags.iter().filter(|d| d.is_blocking()).cloned().collect();
    if !blocking.is_empty() {
        return Err(RunnerError::Validation(blocking));
    }
    for warn in diags.iter().filter(|d| !d.is_blocking()) {
        log::debug!("validation: line {}: {}", warn.line, warn.message);
    }

    let script = translate(source);
    if metrics::debug_enabled() {
        log::debug!(
            "translated v{} script: {} statements, title {:?}",
            script.version,
            script.stmts.len(),
            script.title
        );
    }

    let series = BarSeries::from_bars(bars)?;
    let results =
        execute(&script, &series).map_err(|e| RunnerError::Runtime {
            line: e.line,
            message: e.message,
        })?;

    let end_ms = metrics::now_ms();
    metrics::record(ExecutionMetrics {
        start_ms,
        end_ms,
        elapsed_ms: end_ms.saturating_sub(start_ms),
        bar_count: bars.len(),
        result_count: results.len(),
        script_version: script.version,
    });
    if metrics::debug_enabled() {
        log::debug!(
            "executed over {} bars: {} results in {}ms",
            bars.len(),
            results.len(),
            end_ms.saturating_sub(start_ms)
        );
    }

    Ok(results)
}
