//! Retrieval-augmented compliance auditor.

use super::verdict::{parse_verdict, Verdict};
use super::{IngestionStatus, PipelineState, StageOutcome};
use crate::config::Prompts;
use crate::error::Result;
use crate::rag::{format_rules_for_prompt, ChatModel, RuleRetriever};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Number of policy passages retrieved per audit.
pub const DEFAULT_TOP_K: usize = 3;

/// Judges evidence against retrieved policy rules.
pub struct ComplianceAuditor {
    retriever: Arc<dyn RuleRetriever>,
    model: Arc<dyn ChatModel>,
    prompts: Prompts,
    top_k: usize,
}

impl ComplianceAuditor {
    pub fn new(retriever: Arc<dyn RuleRetriever>, model: Arc<dyn ChatModel>) -> Self {
        Self {
            retriever,
            model,
            prompts: Prompts::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Use custom prompt templates.
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set how many policy passages to retrieve.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Audit the evidence in `state`.
    ///
    /// Without a transcript the audit is skipped and neither retrieval nor the model is
    /// called. Failures are returned as [`StageOutcome::Failed`], never raised.
    #[instrument(skip(self, state), fields(video_id = %state.video_id))]
    pub async fn run(&self, state: &PipelineState) -> StageOutcome<Verdict> {
        if state.transcript_text().trim().is_empty() {
            let reason = match &state.ingestion {
                IngestionStatus::Skipped { reason } => reason.clone(),
                _ => "video processing failed (no transcript)".to_string(),
            };
            warn!("[Auditor] Skipping audit: {}", reason);
            return StageOutcome::Skipped(reason);
        }

        match self.audit(state).await {
            Ok(verdict) => {
                info!(
                    "[Auditor] Verdict {} with {} finding(s)",
                    verdict.status,
                    verdict.compliance_results.len()
                );
                StageOutcome::Completed(verdict)
            }
            Err(e) => {
                error!("[Auditor] Audit failed: {}", e);
                StageOutcome::Failed(e)
            }
        }
    }

    async fn audit(&self, state: &PipelineState) -> Result<Verdict> {
        let transcript = state.transcript_text();
        let query = format!("{} {}", transcript, state.ocr_text.join(" "));

        let passages = self.retriever.retrieve(&query, self.top_k).await?;
        debug!("Using {} policy passages", passages.len());

        let mut vars = HashMap::new();
        vars.insert("rules".to_string(), format_rules_for_prompt(&passages));
        vars.insert(
            "metadata".to_string(),
            serde_json::to_string(&state.video_metadata)?,
        );
        vars.insert("transcript".to_string(), transcript.to_string());
        vars.insert("ocr".to_string(), serde_json::to_string(&state.ocr_text)?);

        let system = self.prompts.render_with_custom(&self.prompts.audit.system, &vars);
        let user = self.prompts.render_with_custom(&self.prompts.audit.user, &vars);

        let response = self.model.complete(&system, &user).await?;

        parse_verdict(&response).inspect_err(|_| {
            debug!("Unparseable model response: {}", response);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GuardianError;
    use crate::pipeline::{AuditStatus, Severity};
    use crate::testing::{FakeModel, FakeRetriever};

    const PILL_VERDICT: &str = r#"```json
{"compliance_results":[{"category":"Claim Validation","severity":"CRITICAL","description":"Unverified cure claim"}],"status":"FAIL","final_report":"1 critical violation found"}
```"#;

    fn evidence_state(transcript: &str, ocr: &[&str]) -> PipelineState {
        let mut state = PipelineState::new("https://youtu.be/dQw4w9WgXcQ", "vid_1");
        state.transcript = Some(transcript.to_string());
        state.ocr_text = ocr.iter().map(|s| s.to_string()).collect();
        state
            .video_metadata
            .insert("platform".to_string(), serde_json::json!("youtube"));
        state
    }

    fn auditor(retriever: &Arc<FakeRetriever>, model: &Arc<FakeModel>) -> ComplianceAuditor {
        ComplianceAuditor::new(retriever.clone(), model.clone())
    }

    #[tokio::test]
    async fn test_empty_transcript_skips_without_calls() {
        let retriever = Arc::new(FakeRetriever::with_rules(&["rule"]));
        let model = Arc::new(FakeModel::replying(PILL_VERDICT));

        for transcript in [None, Some(""), Some("   ")] {
            let mut state = evidence_state("", &["Logo"]);
            state.transcript = transcript.map(str::to_string);

            let outcome = auditor(&retriever, &model).run(&state).await;
            assert!(matches!(outcome, StageOutcome::Skipped(_)));
        }

        assert_eq!(retriever.calls(), 0);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_skip_reason_comes_from_ingestion() {
        let retriever = Arc::new(FakeRetriever::default());
        let model = Arc::new(FakeModel::replying("{}"));
        let mut state = evidence_state("", &[]);
        state.ingestion = IngestionStatus::Skipped {
            reason: "indexing produced no transcript".into(),
        };

        let StageOutcome::Skipped(reason) = auditor(&retriever, &model).run(&state).await else {
            panic!("expected skip");
        };
        assert_eq!(reason, "indexing produced no transcript");
    }

    #[tokio::test]
    async fn test_pill_claim_is_flagged() {
        let retriever = Arc::new(FakeRetriever::with_rules(&[
            "Medical claims must be substantiated by clinical evidence.",
        ]));
        let model = Arc::new(FakeModel::replying(PILL_VERDICT));
        let state = evidence_state("Our pill cures everything", &["No side effects"]);

        let outcome = auditor(&retriever, &model).run(&state).await;

        let StageOutcome::Completed(verdict) = outcome else {
            panic!("expected verdict");
        };
        assert_eq!(verdict.status, AuditStatus::Fail);
        assert_eq!(verdict.compliance_results.len(), 1);
        assert_eq!(verdict.compliance_results[0].severity, Severity::Critical);
        assert_eq!(retriever.calls(), 1);
        assert_eq!(model.calls(), 1);

        let query = retriever.last_query.lock().unwrap().clone().unwrap();
        assert_eq!(query, "Our pill cures everything No side effects");

        let prompts = model.prompts.lock().unwrap();
        let (system, user) = &prompts[0];
        assert!(system.contains("Medical claims must be substantiated"));
        assert!(!system.contains("{{rules}}"));
        assert!(user.contains("Our pill cures everything"));
        assert!(user.contains("No side effects"));
        assert!(user.contains("youtube"));
    }

    #[tokio::test]
    async fn test_clean_video_passes() {
        let retriever = Arc::new(FakeRetriever::with_rules(&["rule"]));
        let model = Arc::new(FakeModel::replying(
            r#"{"compliance_results":[],"status":"PASS","final_report":"No issues"}"#,
        ));

        let outcome = auditor(&retriever, &model)
            .run(&evidence_state("Welcome to our channel", &[]))
            .await;

        let StageOutcome::Completed(verdict) = outcome else {
            panic!("expected verdict");
        };
        assert_eq!(verdict.status, AuditStatus::Pass);
        assert!(verdict.compliance_results.is_empty());
    }

    #[tokio::test]
    async fn test_top_k_is_passed_to_retriever() {
        let retriever = Arc::new(FakeRetriever::with_rules(&["a", "b", "c", "d"]));
        let model = Arc::new(FakeModel::replying("{}"));

        auditor(&retriever, &model)
            .with_top_k(2)
            .run(&evidence_state("hello", &[]))
            .await;

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].0.contains("a\n\nb"));
        assert!(!prompts[0].0.contains("\n\nc"));
    }

    #[tokio::test]
    async fn test_unparseable_response_fails_stage() {
        let retriever = Arc::new(FakeRetriever::with_rules(&["rule"]));
        let model = Arc::new(FakeModel::replying("The video looks compliant to me."));

        let outcome = auditor(&retriever, &model).run(&evidence_state("hello", &[])).await;
        assert!(matches!(outcome, StageOutcome::Failed(GuardianError::VerdictParse(_))));
    }

    #[tokio::test]
    async fn test_service_errors_fail_stage() {
        let failing_retriever = Arc::new(FakeRetriever {
            fail: true,
            ..Default::default()
        });
        let model = Arc::new(FakeModel::replying("{}"));
        let outcome = auditor(&failing_retriever, &model).run(&evidence_state("hello", &[])).await;
        assert!(matches!(outcome, StageOutcome::Failed(GuardianError::Retrieval(_))));
        assert_eq!(model.calls(), 0);

        let retriever = Arc::new(FakeRetriever::with_rules(&["rule"]));
        let model = Arc::new(FakeModel::erroring("rate limited"));
        let outcome = auditor(&retriever, &model).run(&evidence_state("hello", &[])).await;
        assert!(matches!(outcome, StageOutcome::Failed(GuardianError::OpenAI(_))));
    }
}
