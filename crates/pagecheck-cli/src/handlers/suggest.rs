//! Handler for `pagecheck suggest`

use crate::commands::SuggestArgs;
use crate::error::{CliError, CliResult};
use pagecheck::llm::{FixSuggester, LlmConfig, Suggestion};
use pagecheck::TestReport;
use std::fmt::Write as _;
use tracing::info;

/// Model configuration for the arguments; a key is required
pub fn llm_config(args: &SuggestArgs) -> CliResult<LlmConfig> {
    let config = LlmConfig::default()
        .with_base_url(args.base_url.clone())
        .with_model(args.model.clone())
        .with_api_key(args.api_key.clone());
    if !config.has_api_key() {
        return Err(CliError::config(
            "no API key: pass --api-key or set OPENAI_API_KEY",
        ));
    }
    Ok(config)
}

/// Ask for fixes for the failures recorded in the report file
pub async fn execute_suggest(args: &SuggestArgs) -> CliResult<Vec<Suggestion>> {
    let config = llm_config(args)?;
    let report = TestReport::from_json(&std::fs::read_to_string(&args.report)?)?;
    let failures = report.failures();
    info!(failures = failures.len(), limit = args.limit, "requesting suggestions");
    let suggester = FixSuggester::from_config(&config);
    Ok(suggester.suggest_all(&failures, args.limit).await)
}

/// Text rendering of suggestions
#[must_use]
pub fn render_suggestions(suggestions: &[Suggestion]) -> String {
    if suggestions.is_empty() {
        return "No failed checks to fix.\n".to_string();
    }
    let mut out = String::new();
    for suggestion in suggestions {
        let failure = &suggestion.failure;
        let _ = writeln!(out, "### {} / {} ###", failure.item, failure.test);
        let _ = writeln!(out, "Category: {}", failure.category);
        let _ = writeln!(out, "Failure: {}", failure.reason);
        let _ = writeln!(out, "Code: {}", failure.code_snippet);
        match (&suggestion.fix, &suggestion.error) {
            (Some(fix), _) => {
                let _ = writeln!(out, "{}", fix.trim_end());
            }
            (None, Some(error)) => {
                let _ = writeln!(out, "No suggestion: {error}");
            }
            (None, None) => {}
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pagecheck::{Category, FailureDigest};
    use std::path::PathBuf;

    fn args(api_key: Option<&str>) -> SuggestArgs {
        SuggestArgs {
            report: PathBuf::from("report.json"),
            limit: 5,
            model: "gpt-4".into(),
            base_url: "http://127.0.0.1:9".into(),
            api_key: api_key.map(str::to_string),
        }
    }

    #[test]
    fn test_key_required() {
        assert!(matches!(llm_config(&args(None)), Err(CliError::Config { .. })));
        assert!(matches!(llm_config(&args(Some(" "))), Err(CliError::Config { .. })));
        assert!(llm_config(&args(Some("sk-1"))).unwrap().has_api_key());
    }

    #[test]
    fn test_render() {
        let failure = FailureDigest {
            category: Category::Buttons,
            item: "Button 1".into(),
            test: "Label Test".into(),
            reason: "The button has no visible text, title or value".into(),
            code_snippet: "<button></button>".into(),
        };
        let text = render_suggestions(&[
            Suggestion {
                failure: failure.clone(),
                fix: Some("Suggested Fix:\n\nAdd a label.\n".into()),
                error: None,
            },
            Suggestion {
                failure,
                fix: None,
                error: Some("API error 429: slow down".into()),
            },
        ]);
        assert!(text.starts_with("### Button 1 / Label Test ###\nCategory: buttons\n"));
        assert!(text.contains("Suggested Fix:\n\nAdd a label.\n\n"));
        assert!(text.contains("No suggestion: API error 429: slow down"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_suggestions(&[]), "No failed checks to fix.\n");
    }
}
