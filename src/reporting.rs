use crate::types::ScanResult;
use crate::utils::time::now_iso8601;
use crate::{Result, ScanError};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// JSON document written by `--output`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_time: String,
    pub total_results: usize,
    pub results: Vec<ScanResult>,
}

impl ScanReport {
    /// Keep everything, or only the vulnerable hosts.
    pub fn from_results(results: &[ScanResult], vulnerable_only: bool) -> Self {
        let results: Vec<ScanResult> = results
            .iter()
            .filter(|r| !vulnerable_only || r.is_vulnerable())
            .cloned()
            .collect();

        Self {
            scan_time: now_iso8601(),
            total_results: results.len(),
            results,
        }
    }
}

pub async fn save_results(results: &[ScanResult], path: &Path, vulnerable_only: bool) -> Result<()> {
    debug!("Generating JSON report: {}", path.display());

    let report = ScanReport::from_results(results, vulnerable_only);
    let json_data = serde_json::to_string_pretty(&report)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await
            .map_err(|e| ScanError::Reporting(format!("Failed to create output directory: {}", e)))?;
    }

    fs::write(path, json_data).await
        .map_err(|e| ScanError::Reporting(format!("Failed to write JSON report: {}", e)))?;

    info!("Saved {} result(s) to {}", report.total_results, path.display());
    Ok(())
}

/// Counts used by the summary and the exit status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub total: usize,
    pub vulnerable: usize,
    pub safe: usize,
    pub errors: usize,
}

impl ScanSummary {
    pub fn from_results(results: &[ScanResult]) -> Self {
        let vulnerable = results.iter().filter(|r| r.is_vulnerable()).count();
        let safe = results.iter().filter(|r| r.is_safe()).count();

        Self {
            total: results.len(),
            vulnerable,
            safe,
            errors: results.len() - vulnerable - safe,
        }
    }
}

/// Process exit status: 1 when any host is vulnerable, 0 otherwise.
pub fn exit_code(results: &[ScanResult]) -> i32 {
    if results.iter().any(|r| r.is_vulnerable()) {
        1
    } else {
        0
    }
}
