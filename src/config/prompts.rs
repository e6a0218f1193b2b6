//! Prompt templates for Brand Guardian.
//!
//! Prompts can be customized by placing an `audit.toml` file in the custom prompts directory.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub audit: AuditPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the compliance verdict.
///
/// `system` receives `{{rules}}`; `user` receives `{{metadata}}`, `{{transcript}}` and `{{ocr}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditPrompts {
    pub system: String,
    pub user: String,
}

impl Default for AuditPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a Senior Brand Compliance Auditor.

OFFICIAL REGULATORY RULES:
{{rules}}

INSTRUCTIONS:
1. Analyze the Transcript and OCR text below.
2. Identify ANY violations of the rules.
3. Return strictly JSON in the following format:

{
    "compliance_results": [
        {
            "category": "Claim Validation",
            "severity": "CRITICAL",
            "description": "Explanation of the violation..."
        }
    ],
    "status": "FAIL",
    "final_report": "Summary of findings..."
}

Severity must be either "CRITICAL" or "WARNING".
If no violations are found, set "status" to "PASS" and "compliance_results" to []."#
                .to_string(),

            user: r#"VIDEO_METADATA: {{metadata}}
TRANSCRIPT: {{transcript}}
ON-SCREEN TEXT (OCR): {{ocr}}"#
                .to_string(),
        }
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("valid placeholder regex"))
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let audit_path = custom_path.join("audit.toml");
            if audit_path.exists() {
                let content = std::fs::read_to_string(&audit_path)?;
                prompts.audit = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Substitution is single-pass: placeholders inside substituted values are left alone.
    /// Unknown placeholders are kept verbatim.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        placeholder_regex()
            .replace_all(template, |caps: &Captures| {
                vars.get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.audit.system.contains("{{rules}}"));
        assert!(prompts.audit.user.contains("{{transcript}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_render_does_not_expand_values() {
        let mut vars = HashMap::new();
        vars.insert("transcript".to_string(), "say {{rules}}".to_string());
        vars.insert("rules".to_string(), "SECRET".to_string());

        let result = Prompts::render("T: {{transcript}} / {{missing}}", &vars);
        assert_eq!(result, "T: say {{rules}} / {{missing}}");
    }

    #[test]
    fn test_custom_variables_are_overridden() {
        let mut custom = HashMap::new();
        custom.insert("brand".to_string(), "Acme".to_string());
        custom.insert("rules".to_string(), "custom".to_string());
        let prompts = Prompts::load(None, Some(&custom)).unwrap();

        let mut vars = HashMap::new();
        vars.insert("rules".to_string(), "retrieved".to_string());

        let result = prompts.render_with_custom("{{brand}}: {{rules}}", &vars);
        assert_eq!(result, "Acme: retrieved");
    }

    #[test]
    fn test_load_custom_audit_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("audit.toml"),
            "system = \"Custom auditor {{rules}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.audit.system, "Custom auditor {{rules}}");
        // unspecified fields keep defaults
        assert!(prompts.audit.user.contains("{{ocr}}"));
    }
}
