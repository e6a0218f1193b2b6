//! Audit command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::pipeline::PipelineState;
use anyhow::Result;
use uuid::Uuid;

/// Run the audit command. Returns whether the video passed.
pub async fn run_audit(
    url: &str,
    video_id: Option<String>,
    json: bool,
    settings: Settings,
) -> Result<bool> {
    if let Err(e) = preflight::check(Operation::Audit, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'brand-guardian doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let video_id = video_id.unwrap_or_else(generate_video_id);
    let orchestrator = Orchestrator::new(&settings)?;

    let spinner = (!json).then(|| {
        Output::spinner(&format!("Auditing {} (indexing can take several minutes)...", url))
    });
    let state = orchestrator.run(url, &video_id).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print_report(&state);
    }

    Ok(state.status().is_pass())
}

/// A job name for runs without an explicit `--video-id`.
fn generate_video_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("vid_{}", &id[..8])
}

fn print_report(state: &PipelineState) {
    Output::header("Compliance Audit");
    Output::kv("Video", &state.video_url);
    Output::kv("Job", &state.video_id);
    if let Some(duration) = state.video_metadata.get("duration") {
        Output::kv("Duration", &duration.to_string());
    }

    Output::status(state.status());

    if !state.compliance_findings.is_empty() {
        Output::header(&format!(
            "Findings ({}, {} critical)",
            state.compliance_findings.len(),
            state.critical_count()
        ));
        for issue in &state.compliance_findings {
            Output::finding(issue);
        }
    }

    Output::header("Report");
    println!("{}", state.final_report);

    if !state.errors.is_empty() {
        Output::header("Errors");
        for error in &state.errors {
            Output::error(error);
        }
    }
    println!();
}
