//! Doctor command - verify tools, credentials and the policy knowledge base.

use crate::cli::Output;
use crate::config::Settings;
use crate::knowledge::KnowledgeBaseIngestor;
use crate::vector_store::{PolicyStore, SqlitePolicyStore};
use console::style;
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Health {
    Ok,
    Warning,
    Error,
}

/// Outcome of one diagnostic.
#[derive(Debug)]
struct Check {
    name: &'static str,
    health: Health,
    detail: String,
    hint: Option<String>,
}

impl Check {
    fn new(name: &'static str, health: Health, detail: impl Into<String>) -> Self {
        Self {
            name,
            health,
            detail: detail.into(),
            hint: None,
        }
    }

    fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn print(&self) {
        let icon = match self.health {
            Health::Ok => style("✓").green(),
            Health::Warning => style("!").yellow(),
            Health::Error => style("✗").red(),
        };
        println!("  {} {} - {}", icon, style(self.name).bold(), self.detail);
        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostics. Returns `true` when no check failed outright.
pub async fn run_doctor(settings: &Settings) -> anyhow::Result<bool> {
    Output::header("Brand Guardian Doctor");
    println!();

    let sections = [
        ("External Tools", vec![check_ytdlp().await]),
        ("OpenAI", vec![check_openai_api_key()]),
        ("Azure Video Indexer", check_video_indexer(settings)),
        ("Knowledge Base", check_knowledge_base(settings).await),
    ];

    let mut errors = 0;
    let mut warnings = 0;
    for (title, checks) in &sections {
        println!("{}", style(title).bold());
        for check in checks {
            check.print();
            match check.health {
                Health::Error => errors += 1,
                Health::Warning => warnings += 1,
                Health::Ok => {}
            }
        }
        println!();
    }

    if errors > 0 {
        Output::error(&format!("{} problem(s) must be fixed before auditing.", errors));
    } else if warnings > 0 {
        Output::warning(&format!("Ready, with {} warning(s).", warnings));
    } else {
        Output::success("Ready to audit.");
    }

    Ok(errors == 0)
}

async fn check_ytdlp() -> Check {
    let hint = if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else {
        "Install with: pip install yt-dlp"
    };

    match Command::new("yt-dlp").arg("--version").output().await {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
            Check::new("yt-dlp", Health::Ok, version)
        }
        Ok(_) => Check::new("yt-dlp", Health::Error, "installed but not working").hint(hint),
        Err(_) => Check::new("yt-dlp", Health::Error, "not found").hint(hint),
    }
}

fn check_openai_api_key() -> Check {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => {
            Check::new("OPENAI_API_KEY", Health::Ok, format!("set ({})", mask(&key)))
        }
        _ => Check::new("OPENAI_API_KEY", Health::Error, "not set")
            .hint("Set with: export OPENAI_API_KEY='sk-...'"),
    }
}

fn check_video_indexer(settings: &Settings) -> Vec<Check> {
    let vi = &settings.video_indexer;
    let creds = &settings.credentials;

    let missing = vi.missing_fields();
    let account = if missing.is_empty() {
        Check::new(
            "Account",
            Health::Ok,
            format!("{} in {} ({})", vi.account_name, vi.location, vi.account_id),
        )
    } else {
        Check::new("Account", Health::Error, format!("missing {}", missing.join(", "))).hint(
            "Set AZURE_VI_ACCOUNT_ID, AZURE_VI_LOCATION, AZURE_SUBSCRIPTION_ID, \
             AZURE_RESOURCE_GROUP and AZURE_VI_NAME",
        )
    };

    let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    let credentials = if has(&creds.arm_token) {
        Check::new("Credentials", Health::Ok, "pre-issued ARM token")
    } else if has(&creds.tenant_id) && has(&creds.client_id) && has(&creds.client_secret) {
        Check::new(
            "Credentials",
            Health::Ok,
            format!(
                "service principal {}",
                creds.client_id.as_deref().unwrap_or_default()
            ),
        )
    } else {
        Check::new("Credentials", Health::Error, "not configured").hint(
            "Set AZURE_ARM_TOKEN, or AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET",
        )
    };

    let token_reuse = if vi.refresh_margin_seconds == 0 {
        "new token every poll".to_string()
    } else {
        format!("token reused until {}s before expiry", vi.refresh_margin_seconds)
    };
    let polling = Check::new(
        "Polling",
        Health::Ok,
        format!(
            "every {}s for up to {}s, {}",
            vi.poll_interval().as_secs(),
            vi.max_poll_seconds,
            token_reuse
        ),
    );

    vec![account, credentials, polling]
}

async fn check_knowledge_base(settings: &Settings) -> Vec<Check> {
    let db_path = settings.sqlite_path();
    let index = if !db_path.exists() {
        Check::new("Policy index", Health::Warning, "not created yet")
            .hint("Run: brand-guardian ingest")
    } else {
        match SqlitePolicyStore::new(&db_path) {
            Ok(store) => match store.chunk_count().await {
                Ok(0) => Check::new("Policy index", Health::Warning, "empty")
                    .hint("Run: brand-guardian ingest"),
                Ok(n) => Check::new(
                    "Policy index",
                    Health::Ok,
                    format!("{} chunks in {}", n, db_path.display()),
                ),
                Err(e) => Check::new("Policy index", Health::Error, e.to_string()),
            },
            Err(e) => Check::new("Policy index", Health::Error, e.to_string()),
        }
    };

    let kb_dir = settings.knowledge_base_dir();
    let documents = match KnowledgeBaseIngestor::find_pdfs(&kb_dir) {
        Ok(pdfs) if !pdfs.is_empty() => Check::new(
            "Policy PDFs",
            Health::Ok,
            format!("{} in {}", pdfs.len(), kb_dir.display()),
        ),
        Ok(_) => Check::new("Policy PDFs", Health::Warning, format!("none in {}", kb_dir.display()))
            .hint("Add brand and regulatory guideline PDFs to this directory"),
        Err(_) => Check::new(
            "Policy PDFs",
            Health::Warning,
            format!("{} does not exist", kb_dir.display()),
        )
        .hint("Create it, or point knowledge_base.data_dir at your guidelines"),
    };

    vec![index, documents]
}

/// Show only the ends of a secret.
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 11 {
        return "***".to_string();
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
