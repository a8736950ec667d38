use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, instrument};

/// Text generation collaborator: prompt in, summary out.
///
/// Implementations do not retry; a failure propagates to the caller as-is.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 120,
        }
    }
}

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Gemini `generateContent` client.
pub struct GeminiSummarizer {
    http: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiSummarizer {
    pub fn new(cfg: &GeminiConfig) -> Result<Self> {
        let api_key = cfg
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("GEMINI_API_KEY is not set; pass --no-ai to skip the summary"))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            http,
            api_key,
            model: cfg.model.clone(),
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

fn response_text(resp: GenerateResponse) -> Option<String> {
    let text: String = resp
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    #[instrument(skip_all, fields(model = %self.model, prompt_chars = prompt.chars().count()))]
    async fn summarize(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = json!({ "contents": [ { "parts": [ { "text": prompt } ] } ] });
        // Key travels in a header; URLs are dropped from errors so they never echo it.
        let resp: GenerateResponse = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?
            .error_for_status()
            .map_err(reqwest::Error::without_url)?
            .json()
            .await
            .map_err(reqwest::Error::without_url)?;
        let text = response_text(resp).ok_or_else(|| anyhow!("gemini returned no text"))?;
        info!(summary_chars = text.chars().count(), "summary generated");
        Ok(text)
    }
}

/// Placeholder summary for runs without a text generator.
#[derive(Debug, Default, Clone)]
pub struct OfflineSummarizer;

pub const OFFLINE_SUMMARY: &str = "(AI summary skipped: report generated offline)";

#[async_trait]
impl Summarizer for OfflineSummarizer {
    async fn summarize(&self, _prompt: &str) -> Result<String> {
        Ok(OFFLINE_SUMMARY.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_candidate_parts() {
        let resp: GenerateResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [ { "text": "Prices " }, { "text": "vary." } ], "role": "model" } },
                { "content": { "parts": [ { "text": "ignored" } ] } }
            ]
        }))
        .unwrap();
        assert_eq!(response_text(resp).as_deref(), Some("Prices vary."));
    }

    #[test]
    fn empty_response_has_no_text() {
        let resp: GenerateResponse = serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert!(response_text(resp).is_none());
        let resp: GenerateResponse =
            serde_json::from_value(json!({ "candidates": [ { "finishReason": "SAFETY" } ] })).unwrap();
        assert!(response_text(resp).is_none());
    }

    #[test]
    fn gemini_requires_a_key() {
        assert!(GeminiSummarizer::new(&GeminiConfig::default()).is_err());
        let cfg = GeminiConfig {
            api_key: Some("k".into()),
            ..GeminiConfig::default()
        };
        assert!(GeminiSummarizer::new(&cfg).is_ok());
    }

    #[tokio::test]
    async fn request_errors_do_not_carry_the_key() {
        let cfg = GeminiConfig {
            api_key: Some("SECRET-KEY-123".into()),
            endpoint: "http://127.0.0.1:1/v1beta".into(),
            timeout_secs: 5,
            ..GeminiConfig::default()
        };
        let err = GeminiSummarizer::new(&cfg)
            .unwrap()
            .summarize("hello")
            .await
            .unwrap_err();
        let text = format!("{err:#} {err:?}");
        assert!(!text.contains("SECRET-KEY-123"), "{text}");
    }

    #[tokio::test]
    async fn offline_summarizer_is_a_fixed_placeholder() {
        let s = OfflineSummarizer;
        assert_eq!(s.summarize("anything").await.unwrap(), OFFLINE_SUMMARY);
    }
}
