//! Parsing of the model's compliance verdict.

use super::state::{AuditStatus, ComplianceIssue, Severity};
use crate::error::{GuardianError, Result};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::warn;

/// Report text used when the model omits one.
pub const NO_REPORT: &str = "No report generated";

/// A structured audit verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub compliance_results: Vec<ComplianceIssue>,
    pub status: AuditStatus,
    pub final_report: String,
}

/// Text of a loosely typed field. Strings pass through, other values keep their JSON form.
fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn issue_from_object(issue: &Map<String, Value>) -> ComplianceIssue {
    let timestamp = match issue.get("timestamp") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    ComplianceIssue {
        category: text_field(issue.get("category"))
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "Uncategorized".to_string()),
        description: text_field(issue.get("description")).unwrap_or_default(),
        severity: issue
            .get("severity")
            .and_then(Value::as_str)
            .map(Severity::from_lenient)
            .unwrap_or(Severity::Warning),
        timestamp,
    }
}

fn code_fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)```[ \t]*(?:json)?[ \t]*\r?\n?(.*?)```").expect("valid fence regex"))
}

/// Contents of the first fenced code block, or the whole text when there is none.
pub fn strip_code_fence(text: &str) -> &str {
    match code_fence_regex().captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => text.trim(),
    }
}

/// Parse a model response into a [`Verdict`].
///
/// Missing or mistyped keys take defaults (no findings, `FAIL`, a placeholder report) and
/// findings that are not objects are dropped. Only text that is not a JSON object after
/// fence stripping is a [`GuardianError::VerdictParse`].
pub fn parse_verdict(response: &str) -> Result<Verdict> {
    let body = strip_code_fence(response);
    let value: Value =
        serde_json::from_str(body).map_err(|e| GuardianError::VerdictParse(e.to_string()))?;
    let Value::Object(verdict) = value else {
        return Err(GuardianError::VerdictParse(
            "expected a JSON object at the top level".to_string(),
        ));
    };

    let status = verdict
        .get("status")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or(AuditStatus::Fail);

    let compliance_results = match verdict.get("compliance_results") {
        Some(Value::Array(items)) => {
            let issues: Vec<ComplianceIssue> = items
                .iter()
                .filter_map(Value::as_object)
                .map(issue_from_object)
                .collect();
            if issues.len() < items.len() {
                warn!("Dropped {} malformed findings", items.len() - issues.len());
            }
            issues
        }
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            warn!("Ignoring compliance_results of unexpected shape: {}", other);
            Vec::new()
        }
    };

    Ok(Verdict {
        compliance_results,
        status,
        final_report: text_field(verdict.get("final_report"))
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| NO_REPORT.to_string()),
    })
}
