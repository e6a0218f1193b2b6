//! Pipeline state and merge semantics.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Overall audit verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditStatus {
    Pass,
    Fail,
}

impl AuditStatus {
    pub fn is_pass(self) -> bool {
        self == AuditStatus::Pass
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditStatus::Pass => write!(f, "PASS"),
            AuditStatus::Fail => write!(f, "FAIL"),
        }
    }
}

impl FromStr for AuditStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PASS" => Ok(AuditStatus::Pass),
            "FAIL" => Ok(AuditStatus::Fail),
            _ => Err(format!("Unknown audit status: {}", s)),
        }
    }
}

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    Warning,
}

impl Severity {
    /// Case-insensitive parse; anything unrecognized is a warning.
    pub fn from_lenient(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "CRITICAL" => Severity::Critical,
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

/// One flagged violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceIssue {
    pub category: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// What the ingestion stage reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestionStatus {
    #[default]
    Pending,
    Completed,
    /// Indexing succeeded but there is nothing to audit.
    Skipped { reason: String },
    Failed { reason: String },
}

/// The record threaded through one audit run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub video_url: String,
    pub video_id: String,
    pub video_metadata: BTreeMap<String, Value>,
    /// `None` until ingestion has run; an empty string means no evidence.
    pub transcript: Option<String>,
    pub ocr_text: Vec<String>,
    /// Append-only within a run.
    pub compliance_findings: Vec<ComplianceIssue>,
    pub final_status: Option<AuditStatus>,
    pub final_report: String,
    /// Append-only within a run.
    pub errors: Vec<String>,
    pub ingestion: IngestionStatus,
}

impl PipelineState {
    /// Create the initial state for an audit request.
    pub fn new(video_url: impl Into<String>, video_id: impl Into<String>) -> Self {
        Self {
            video_url: video_url.into(),
            video_id: video_id.into(),
            video_metadata: BTreeMap::new(),
            transcript: None,
            ocr_text: Vec::new(),
            compliance_findings: Vec::new(),
            final_status: None,
            final_report: String::new(),
            errors: Vec::new(),
            ingestion: IngestionStatus::Pending,
        }
    }

    /// Transcript text, empty when absent.
    pub fn transcript_text(&self) -> &str {
        self.transcript.as_deref().unwrap_or("")
    }

    /// Apply a stage's partial update.
    ///
    /// List fields (`errors`, `compliance_findings`) are appended; scalar fields present in
    /// the update overwrite the current value.
    pub fn merge(&mut self, update: StateUpdate) {
        if let Some(metadata) = update.video_metadata {
            self.video_metadata = metadata;
        }
        if let Some(transcript) = update.transcript {
            self.transcript = Some(transcript);
        }
        if let Some(ocr_text) = update.ocr_text {
            self.ocr_text = ocr_text;
        }
        if let Some(status) = update.final_status {
            self.final_status = Some(status);
        }
        if let Some(report) = update.final_report {
            self.final_report = report;
        }
        if let Some(ingestion) = update.ingestion {
            self.ingestion = ingestion;
        }
        self.compliance_findings.extend(update.compliance_findings);
        self.errors.extend(update.errors);
    }

    /// Ensure the state is terminal: a status is always present, and a report always explains it.
    pub fn finalize(&mut self) {
        if self.final_status.is_none() {
            self.final_status = Some(AuditStatus::Fail);
        }
        if self.final_report.is_empty() {
            self.final_report = if self.errors.is_empty() {
                super::NO_REPORT.to_string()
            } else {
                format!("Audit did not complete: {}", self.errors.join("; "))
            };
        }
    }

    /// Final status, treating an unset status as a failure.
    pub fn status(&self) -> AuditStatus {
        self.final_status.unwrap_or(AuditStatus::Fail)
    }

    /// Number of critical findings.
    pub fn critical_count(&self) -> usize {
        self.compliance_findings
            .iter()
            .filter(|f| f.severity == Severity::Critical)
            .count()
    }
}

/// A partial state produced by one stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub video_metadata: Option<BTreeMap<String, Value>>,
    pub transcript: Option<String>,
    pub ocr_text: Option<Vec<String>>,
    pub compliance_findings: Vec<ComplianceIssue>,
    pub final_status: Option<AuditStatus>,
    pub final_report: Option<String>,
    pub errors: Vec<String>,
    pub ingestion: Option<IngestionStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(category: &str) -> ComplianceIssue {
        ComplianceIssue {
            category: category.to_string(),
            description: "desc".to_string(),
            severity: Severity::Critical,
            timestamp: None,
        }
    }

    #[test]
    fn test_lists_are_appended() {
        let mut state = PipelineState::new("url", "vid");
        state.merge(StateUpdate {
            errors: vec!["ingest failed".into()],
            compliance_findings: vec![issue("A")],
            ..Default::default()
        });
        state.merge(StateUpdate {
            errors: vec!["audit failed".into()],
            compliance_findings: vec![issue("B")],
            ..Default::default()
        });

        assert_eq!(state.errors, vec!["ingest failed", "audit failed"]);
        let categories: Vec<_> = state.compliance_findings.iter().map(|f| f.category.as_str()).collect();
        assert_eq!(categories, vec!["A", "B"]);
    }

    #[test]
    fn test_scalars_overwrite_only_when_present() {
        let mut state = PipelineState::new("url", "vid");
        state.merge(StateUpdate {
            transcript: Some("hello".into()),
            ocr_text: Some(vec!["SALE".into()]),
            final_status: Some(AuditStatus::Fail),
            ..Default::default()
        });
        state.merge(StateUpdate {
            final_status: Some(AuditStatus::Pass),
            final_report: Some("ok".into()),
            ..Default::default()
        });

        assert_eq!(state.transcript_text(), "hello");
        assert_eq!(state.ocr_text, vec!["SALE"]);
        assert_eq!(state.final_status, Some(AuditStatus::Pass));
        assert_eq!(state.final_report, "ok");
        assert_eq!(state.video_url, "url");
    }

    #[test]
    fn test_finalize_guarantees_status_and_report() {
        let mut state = PipelineState::new("url", "vid");
        state.errors.push("boom".into());
        state.finalize();
        assert_eq!(state.final_status, Some(AuditStatus::Fail));
        assert!(state.final_report.contains("boom"));

        let mut done = PipelineState::new("url", "vid");
        done.final_status = Some(AuditStatus::Pass);
        done.final_report = "clean".into();
        done.finalize();
        assert_eq!(done.final_status, Some(AuditStatus::Pass));
        assert_eq!(done.final_report, "clean");
    }

    #[test]
    fn test_status_and_severity_parsing() {
        assert_eq!("pass".parse::<AuditStatus>().unwrap(), AuditStatus::Pass);
        assert_eq!(" FAIL ".parse::<AuditStatus>().unwrap(), AuditStatus::Fail);
        assert!("maybe".parse::<AuditStatus>().is_err());

        assert_eq!(Severity::from_lenient("critical"), Severity::Critical);
        assert_eq!(Severity::from_lenient("Warning"), Severity::Warning);
        assert_eq!(Severity::from_lenient("HIGH"), Severity::Warning);
    }

    #[test]
    fn test_state_serializes_uppercase_enums() {
        let mut state = PipelineState::new("url", "vid");
        state.final_status = Some(AuditStatus::Pass);
        state.compliance_findings.push(issue("Claim Validation"));

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["final_status"], "PASS");
        assert_eq!(json["compliance_findings"][0]["severity"], "CRITICAL");
        assert_eq!(json["ingestion"]["status"], "pending");
    }
}
