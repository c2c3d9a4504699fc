//! JSON report adapter implementing ReportPort.
//!
//! Writes the full `BacktestResult` as pretty-printed JSON. An output path of
//! `-` writes to stdout.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Default)]
pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(result: &BacktestResult) -> Result<String, BacktestError> {
        serde_json::to_string_pretty(result).map_err(|e| BacktestError::Report {
            reason: format!("failed to serialize result: {e}"),
        })
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), BacktestError> {
        let json = Self::render(result)?;

        if output_path == "-" {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
            return Ok(());
        }

        let path = Path::new(output_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| BacktestError::Report {
                reason: format!("failed to create {}: {e}", parent.display()),
            })?;
        }
        fs::write(path, json).map_err(|e| BacktestError::Report {
            reason: format!("failed to write {}: {e}", path.display()),
        })?;
        tracing::info!(path = %path.display(), "report written");
        Ok(())
    }
}
