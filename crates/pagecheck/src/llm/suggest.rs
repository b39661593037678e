//! Fix suggestion for failed checks.

use super::client::{ChatMessage, LlmClient, LlmClientError, LlmConfig};
use crate::report::FailureDigest;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// System prompt for fix requests
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant skilled in debugging HTML code snippets.";

/// Build the user prompt for one failure
#[must_use]
pub fn fix_prompt(digest: &FailureDigest) -> String {
    format!(
        "Here is a bug in the code:\n\n\
         Code:\n{code}\n\n\
         Failed Test: {test}\n\
         Failure: {reason}\n\n\
         Category: {category}\n\
         Item: {item}\n\n\
         Can you suggest a fix for the above code?\n\n\
         Please format your response as follows:\n\
         Suggested Fix:\n\n<Your suggestion here>\n\
         Example:\n\
         Suggested Fix:\n\nRefactor the function to handle edge cases properly. Update the error handling mechanism.",
        code = digest.code_snippet,
        test = digest.test,
        reason = digest.reason,
        category = digest.category,
        item = digest.item,
    )
}

/// A failure paired with the model's answer or the error that prevented one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// The failure asked about
    pub failure: FailureDigest,
    /// Suggested fix text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
    /// Why no fix is available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Asks a model how to fix failed checks
#[derive(Debug, Clone)]
pub struct FixSuggester {
    client: LlmClient,
}

impl FixSuggester {
    /// Suggester over an existing client
    #[must_use]
    pub const fn new(client: LlmClient) -> Self {
        Self { client }
    }

    /// Suggester for a configuration
    #[must_use]
    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(LlmClient::new(config))
    }

    /// Suggested fix for one failure
    pub async fn suggest(&self, digest: &FailureDigest) -> Result<String, LlmClientError> {
        info!(item = %digest.item, test = %digest.test, "requesting fix suggestion");
        self.client
            .complete(vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(fix_prompt(digest)),
            ])
            .await
    }

    /// Suggestions for up to `limit` failures, one request at a time.
    ///
    /// A failed request is recorded on its suggestion and does not stop
    /// the rest.
    pub async fn suggest_all(&self, failures: &[FailureDigest], limit: usize) -> Vec<Suggestion> {
        let mut suggestions = Vec::new();
        for failure in failures.iter().take(limit) {
            let suggestion = match self.suggest(failure).await {
                Ok(fix) => Suggestion {
                    failure: failure.clone(),
                    fix: Some(fix),
                    error: None,
                },
                Err(err) => {
                    warn!(item = %failure.item, error = %err, "fix suggestion failed");
                    Suggestion {
                        failure: failure.clone(),
                        fix: None,
                        error: Some(err.to_string()),
                    }
                }
            };
            suggestions.push(suggestion);
        }
        suggestions
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::report::Category;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn digest(item: &str) -> FailureDigest {
        FailureDigest {
            category: Category::Links,
            item: item.into(),
            test: "Broken-Link Test".into(),
            reason: "Status Code: 404".into(),
            code_snippet: r#"<a href="404.html">Another Broken Link</a>"#.into(),
        }
    }

    mod prompt_tests {
        use super::*;

        #[test]
        fn test_prompt_layout() {
            let prompt = fix_prompt(&digest("Link 1"));
            assert!(prompt.starts_with("Here is a bug in the code:\n\nCode:\n<a href=\"404.html\">"));
            assert!(prompt.contains("Failed Test: Broken-Link Test\n"));
            assert!(prompt.contains("Category: links\nItem: Link 1\n\n"));
            assert!(prompt.contains("Suggested Fix:\n\n<Your suggestion here>"));
        }
    }

    mod suggest_tests {
        use super::*;

        #[tokio::test]
        async fn test_suggest_all_respects_limit_and_records_errors() {
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = calls.clone();
            let app = Router::new().route(
                "/v1/chat/completions",
                post(move |Json(body): Json<serde_json::Value>| {
                    let counter = counter.clone();
                    async move {
                        let n = counter.fetch_add(1, Ordering::SeqCst);
                        assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
                        if n == 0 {
                            Ok(Json(serde_json::json!({
                                "choices": [{"message": {"role": "assistant", "content": "Suggested Fix:\n\nPoint href at an existing page."}}]
                            })))
                        } else {
                            Err((StatusCode::TOO_MANY_REQUESTS, "slow down"))
                        }
                    }
                }),
            );
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            let suggester =
                FixSuggester::from_config(&LlmConfig::default().with_base_url(format!("http://{addr}")));
            let failures = vec![digest("Link 1"), digest("Link 2"), digest("Link 3")];
            let suggestions = suggester.suggest_all(&failures, 2).await;
            assert_eq!(suggestions.len(), 2);
            assert!(suggestions[0].fix.as_deref().unwrap().contains("existing page"));
            assert!(suggestions[1].error.as_deref().unwrap().contains("429"));
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }
    }
}
