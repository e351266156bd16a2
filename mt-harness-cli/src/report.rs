//! Run report generation
//!
//! Summarizes every test case of a run as a plain text table or as JSON.

use crate::config::{ReportConfig, ReportFormat};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use mt_harness::{format_sim_time, CaseHistory, History, SimTime};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;

/// Final state of one test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Passed,
    Failed,
}

/// Result of running one test case, as seen by the CLI
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    pub id: String,
    /// Error message of the failing instant, if any
    pub error: Option<String>,
}

impl CaseOutcome {
    pub fn passed(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            error: None,
        }
    }

    pub fn failed(id: impl Into<String>, error: impl ToString) -> Self {
        Self {
            id: id.into(),
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CaseReport {
    pub id: String,
    pub status: CaseStatus,
    pub instants: usize,
    pub first_time: Option<SimTime>,
    pub last_time: Option<SimTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<CaseHistory>,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub generated_at: String,
    pub harness_version: String,
    pub passed: usize,
    pub failed: usize,
    pub total_instants: usize,
    pub cases: Vec<CaseReport>,
}

impl Report {
    /// Collect the outcomes of a run together with the recorded history
    pub fn build(
        outcomes: &[CaseOutcome],
        history: &History,
        include_samples: bool,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let cases: Vec<CaseReport> = outcomes
            .iter()
            .map(|outcome| {
                let recorded = history.case(&outcome.id);
                CaseReport {
                    id: outcome.id.clone(),
                    status: if outcome.error.is_some() {
                        CaseStatus::Failed
                    } else {
                        CaseStatus::Passed
                    },
                    instants: recorded.map(|c| c.len()).unwrap_or(0),
                    first_time: recorded.and_then(|c| c.keys().next().copied()),
                    last_time: recorded.and_then(|c| c.keys().next_back().copied()),
                    error: outcome.error.clone(),
                    samples: if include_samples { recorded.cloned() } else { None },
                }
            })
            .collect();

        let failed = cases
            .iter()
            .filter(|c| c.status == CaseStatus::Failed)
            .count();

        Self {
            generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            harness_version: mt_harness::VERSION.to_string(),
            passed: cases.len() - failed,
            failed,
            total_instants: cases.iter().map(|c| c.instants).sum(),
            cases,
        }
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Txt => Ok(self.render_txt()),
            ReportFormat::Json => {
                serde_json::to_string_pretty(self).context("Failed to serialize JSON report")
            }
        }
    }

    fn render_txt(&self) -> String {
        let mut out = String::new();
        let time = |t: Option<SimTime>| t.map(format_sim_time).unwrap_or_else(|| "-".to_string());

        // Writing into a String cannot fail
        let _ = writeln!(out, "Metamorphic Test Report");
        let _ = writeln!(out, "Generated: {}", self.generated_at);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:<16} {:<8} {:>9} {:>14} {:>14}",
            "TEST CASE", "STATUS", "INSTANTS", "FIRST", "LAST"
        );
        for case in &self.cases {
            let status = match case.status {
                CaseStatus::Passed => "passed",
                CaseStatus::Failed => "FAILED",
            };
            let _ = writeln!(
                out,
                "{:<16} {:<8} {:>9} {:>14} {:>14}",
                case.id,
                status,
                case.instants,
                time(case.first_time),
                time(case.last_time)
            );
            if let Some(error) = &case.error {
                let _ = writeln!(out, "  -> {}", error);
            }
        }
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Total: {} passed, {} failed, {} instants",
            self.passed, self.failed, self.total_instants
        );
        out
    }
}

/// Render the report and write it to the configured file or stdout
pub fn write_report(
    outcomes: &[CaseOutcome],
    history: &History,
    config: &ReportConfig,
) -> Result<()> {
    let report = Report::build(outcomes, history, config.include_samples, Utc::now());
    let rendered = report.render(config.format)?;

    match &config.output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write report: {:?}", path))?;
            log::info!("Report written to {:?}", path);
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mt_harness::{PortValue, Sample};
    use std::collections::BTreeMap;

    fn history() -> History {
        let mut history = History::new();
        for (time, value) in [(0, 0.0), (1500, 1.0)] {
            let sample = Sample {
                inputs: [("in_ir1".to_string(), Some(PortValue::Number(value)))]
                    .into_iter()
                    .collect(),
                outputs: BTreeMap::new(),
            };
            history.record("sim1", time, sample);
        }
        history.begin_case("sim2");
        history
    }

    fn outcomes() -> Vec<CaseOutcome> {
        vec![
            CaseOutcome::passed("sim1"),
            CaseOutcome::failed("sim2", "relation 'alarm' violated"),
        ]
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_build_summarizes_cases() {
        let report = Report::build(&outcomes(), &history(), false, fixed_time());
        assert_eq!(report.passed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total_instants, 2);
        assert_eq!(report.generated_at, "2024-03-01T12:00:00Z");

        assert_eq!(report.cases[0].first_time, Some(0));
        assert_eq!(report.cases[0].last_time, Some(1500));
        assert_eq!(report.cases[1].instants, 0);
        assert_eq!(report.cases[1].first_time, None);
        assert!(report.cases[0].samples.is_none());
    }

    #[test]
    fn test_txt_report() {
        let report = Report::build(&outcomes(), &history(), false, fixed_time());
        let text = report.render(ReportFormat::Txt).unwrap();
        assert!(text.contains("00:00:01.500"));
        assert!(text.contains("FAILED"));
        assert!(text.contains("  -> relation 'alarm' violated"));
        assert!(text.contains("Total: 1 passed, 1 failed, 2 instants"));
    }

    #[test]
    fn test_json_report_with_samples() {
        let report = Report::build(&outcomes(), &history(), true, fixed_time());
        let json: serde_json::Value =
            serde_json::from_str(&report.render(ReportFormat::Json).unwrap()).unwrap();

        assert_eq!(json["failed"], 1);
        assert_eq!(json["cases"][0]["status"], "passed");
        assert_eq!(json["cases"][1]["status"], "failed");
        assert_eq!(json["cases"][0]["samples"]["1500"]["inputs"]["in_ir1"], 1.0);
        assert!(json["cases"][0].get("error").is_none());
    }

    #[test]
    fn test_write_report_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let config = ReportConfig {
            format: ReportFormat::Txt,
            output: Some(path.clone()),
            include_samples: false,
        };
        write_report(&outcomes(), &history(), &config).unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert!(text.starts_with("Metamorphic Test Report"));
    }
}
