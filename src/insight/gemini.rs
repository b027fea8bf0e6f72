//! A client for the Gemini `generateContent` REST endpoint.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::article::Article;
use crate::config::InsightConfig;

use super::TextInsight;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const SUMMARY_INSTRUCTION: &str =
    "You are a professional news editor. Provide concise, accurate summaries.";
const SUGGESTION_INSTRUCTION: &str = "You are a search assistant.";

pub struct GeminiInsight {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiInsight {
    pub fn new(api_key: impl Into<String>, cfg: &InsightConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(cfg.timeout.into())
            .build()
            .context("could not create an HTTP client")?;
        let endpoint = format!(
            "{}/{}:generateContent",
            cfg.base_url.trim_end_matches('/'),
            urlencoding::encode(&cfg.model),
        );

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint,
        })
    }

    async fn generate(&self, instruction: &str, prompt: String) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part {
                    text: instruction.into(),
                }],
            }),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("the request to Gemini failed")?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            return Err(error_from_response(status, &body));
        }

        let response: GenerateContentResponse = response
            .json()
            .await
            .context("could not parse the Gemini response")?;

        Ok(response.text())
    }
}

#[async_trait]
impl TextInsight for GeminiInsight {
    #[instrument(level = "DEBUG", skip_all, fields(article_id = %article.id))]
    async fn summarize(&self, article: &Article) -> Result<String> {
        let prompt = format!(
            "Summarize the following news article in 3 concise bullet points for a busy reader:\n\
            Title: {}\n\
            Description: {}\n\
            Content: {}",
            article.title, article.description, article.content,
        );

        self.generate(SUMMARY_INSTRUCTION, prompt).await
    }

    #[instrument(level = "DEBUG", skip(self))]
    async fn suggest(&self, prefix: &str) -> Result<Vec<String>> {
        let prompt = format!(
            "Provide 5 news-related search term suggestions based on the prefix: \"{prefix}\". \
            Return only the terms separated by commas."
        );
        let text = self.generate(SUGGESTION_INSTRUCTION, prompt).await?;
        debug!(%text, "Received suggestions");

        Ok(split_suggestions(&text))
    }
}

fn split_suggestions(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Into::into)
        .collect()
}

fn error_from_response(status: StatusCode, body: &str) -> anyhow::Error {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .ok()
        .and_then(|wrapper| {
            let message = wrapper.error.message?;

            Some(match wrapper.error.status {
                Some(status) => format!("{status}: {message}"),
                None => message,
            })
        })
        .unwrap_or_else(|| body.to_owned());

    anyhow!("Gemini returned {status}: {message}")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,

    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// The text of the first candidate; empty when the model produced none.
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}
