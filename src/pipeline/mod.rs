//! The two-stage audit pipeline: ingestion, then retrieval-augmented auditing.
//!
//! Each stage returns a [`StageOutcome`]; the orchestrator turns it into a
//! [`StateUpdate`] and merges it into the running [`PipelineState`].

mod audit;
mod ingest;
mod state;
mod verdict;

pub use audit::ComplianceAuditor;
pub use ingest::IngestionStage;
pub use state::{
    AuditStatus, ComplianceIssue, IngestionStatus, PipelineState, Severity, StateUpdate,
};
pub use verdict::{parse_verdict, strip_code_fence, Verdict, NO_REPORT};

use crate::error::GuardianError;
use crate::video_indexer::Evidence;

/// Why the audit is skipped after a job that indexed no speech.
const NO_TRANSCRIPT: &str = "indexing produced no transcript";

/// Result of running one stage.
#[derive(Debug)]
pub enum StageOutcome<T> {
    /// The stage produced its output.
    Completed(T),
    /// The stage had nothing to do; the string says why.
    Skipped(String),
    /// The stage failed. Never propagated past the stage boundary.
    Failed(GuardianError),
}

impl<T> StageOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, StageOutcome::Completed(_))
    }
}

impl From<StageOutcome<Evidence>> for StateUpdate {
    fn from(outcome: StageOutcome<Evidence>) -> Self {
        match outcome {
            StageOutcome::Completed(evidence) => {
                let ingestion = if evidence.has_transcript() {
                    IngestionStatus::Completed
                } else {
                    IngestionStatus::Skipped {
                        reason: NO_TRANSCRIPT.to_string(),
                    }
                };
                StateUpdate {
                    video_metadata: Some(evidence.video_metadata),
                    transcript: Some(evidence.transcript),
                    ocr_text: Some(evidence.ocr_text),
                    ingestion: Some(ingestion),
                    ..Default::default()
                }
            }
            StageOutcome::Skipped(reason) => StateUpdate {
                transcript: Some(String::new()),
                ocr_text: Some(Vec::new()),
                ingestion: Some(IngestionStatus::Skipped { reason }),
                ..Default::default()
            },
            StageOutcome::Failed(err) => {
                let reason = err.to_string();
                StateUpdate {
                    transcript: Some(String::new()),
                    ocr_text: Some(Vec::new()),
                    final_status: Some(AuditStatus::Fail),
                    errors: vec![reason.clone()],
                    ingestion: Some(IngestionStatus::Failed { reason }),
                    ..Default::default()
                }
            }
        }
    }
}

impl From<StageOutcome<Verdict>> for StateUpdate {
    fn from(outcome: StageOutcome<Verdict>) -> Self {
        match outcome {
            StageOutcome::Completed(verdict) => StateUpdate {
                compliance_findings: verdict.compliance_results,
                final_status: Some(verdict.status),
                final_report: Some(verdict.final_report),
                ..Default::default()
            },
            StageOutcome::Skipped(reason) => StateUpdate {
                final_status: Some(AuditStatus::Fail),
                final_report: Some(format!("Audit skipped: {}", reason)),
                ..Default::default()
            },
            StageOutcome::Failed(err) => {
                let reason = err.to_string();
                StateUpdate {
                    final_status: Some(AuditStatus::Fail),
                    final_report: Some(format!("Audit failed: {}", reason)),
                    errors: vec![reason],
                    ..Default::default()
                }
            }
        }
    }
}
