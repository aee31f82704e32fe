//! Natural-language explanations for mistakes via an OpenAI-compatible chat API

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::error::{ExplanationError, WorkerError};
use crate::model::Mistake;

const SYSTEM_PROMPT: &str = "You are a chess expert analyzing mistakes in chess games. \
     Provide clear, concise explanations.";

const MAX_TOKENS: u32 = 150;
const TEMPERATURE: f32 = 0.7;

/// Produces an explanation for one mistake.
#[async_trait]
pub trait Explainer: Send + Sync {
    async fn explain(&self, mistake: &Mistake) -> Result<String, ExplanationError>;
}

#[derive(Clone, Debug)]
pub struct ExplainerConfig {
    /// Empty key means enrichment is disabled
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

pub struct OpenAiExplainer {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiExplainer {
    pub fn new(config: &ExplainerConfig) -> Result<Self, WorkerError> {
        let client = Client::builder()
            .user_agent("CaissaAnalytics/0.1")
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| WorkerError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
        })
    }
}

/// Build the configured explainer, or None when no API key is set.
pub fn from_config(config: &ExplainerConfig) -> Result<Option<Arc<dyn Explainer>>, WorkerError> {
    if config.api_key.trim().is_empty() {
        info!("OPENAI_API_KEY not set - mistake explanations disabled");
        return Ok(None);
    }
    info!(model = %config.model, "Mistake explanations enabled");
    Ok(Some(Arc::new(OpenAiExplainer::new(config)?)))
}

pub fn build_prompt(mistake: &Mistake) -> String {
    format!(
        "Analyze this chess mistake:\n\n\
         Move: {san} (move {number})\n\
         Position (FEN): {fen}\n\
         Evaluation before: {before:.2} pawns\n\
         Evaluation after: {after:.2} pawns\n\
         Evaluation drop: {drop:.2} pawns\n\n\
         Provide a brief tactical/strategic explanation of why this move was a mistake. \
         Keep it concise (2-3 sentences).",
        san = mistake.move_san,
        number = mistake.move_number(),
        fen = mistake.fen_before,
        before = f64::from(mistake.eval_before) / 100.0,
        after = f64::from(mistake.eval_after) / 100.0,
        drop = f64::from(mistake.eval_drop) / 100.0,
    )
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Pull the first choice's text out of a chat-completions body.
pub fn parse_completion(body: &str) -> Result<String, ExplanationError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| ExplanationError::Malformed(e.to_string()))?;

    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ExplanationError::Malformed("no completion text".into()));
    }
    Ok(text)
}

#[async_trait]
impl Explainer for OpenAiExplainer {
    async fn explain(&self, mistake: &Mistake) -> Result<String, ExplanationError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(mistake) },
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExplanationError::Transport(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ExplanationError::RateLimited);
        }

        let text = resp
            .text()
            .await
            .map_err(|e| ExplanationError::Transport(format!("Body read error: {e}")))?;

        if !status.is_success() {
            return Err(ExplanationError::Service {
                status: status.as_u16(),
                body: text.chars().take(200).collect(),
            });
        }

        parse_completion(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn mistake() -> Mistake {
        Mistake {
            id: 1,
            game_id: 1,
            move_index: 5,
            move_san: "Qh5".into(),
            eval_before: 35,
            eval_after: -250,
            eval_drop: 285,
            fen_before: "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2".into(),
            explanation: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_prompt_carries_move_context() {
        let prompt = build_prompt(&mistake());
        assert!(prompt.contains("Move: Qh5 (move 6)"));
        assert!(prompt.contains("Evaluation before: 0.35 pawns"));
        assert!(prompt.contains("Evaluation after: -2.50 pawns"));
        assert!(prompt.contains("Evaluation drop: 2.85 pawns"));
        assert!(prompt.contains("4p3/4P3"));
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Drops the knight.  "}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "Drops the knight.");
    }

    #[test]
    fn test_parse_completion_malformed() {
        assert!(matches!(
            parse_completion(r#"{"choices":[]}"#),
            Err(ExplanationError::Malformed(_))
        ));
        assert!(matches!(
            parse_completion(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(ExplanationError::Malformed(_))
        ));
        assert!(matches!(
            parse_completion("<html>"),
            Err(ExplanationError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_key_disables_explainer() {
        let config = ExplainerConfig {
            api_key: "  ".into(),
            model: "gpt-4o-mini".into(),
            base_url: "https://api.openai.com/v1".into(),
            request_timeout: Duration::from_secs(30),
        };
        assert!(from_config(&config).unwrap().is_none());
    }
}
