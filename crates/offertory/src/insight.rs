//! Free-text ledger analysis from a text-generation service.
//!
//! The ledger is flattened into one line per donation and sent, together
//! with a fixed advisor persona, to a [`TextGenerator`]. The
//! [`InsightRequester`] never fails: any problem with the call yields
//! [`APOLOGY`] instead of prose.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::Config;
use crate::donation::DonationRecord;
use crate::error::{Error, Result};

/// Returned to the user whenever the analysis cannot be produced.
pub const APOLOGY: &str = "AI 分析暫時無法使用。";

/// Request placed before the ledger summary.
pub const ADVISOR_REQUEST: &str =
    "身為教會財務顧問，請根據以下奉獻數據進行簡單的現狀分析，並提供一些對於教會事工發展的專業建議：";

/// System persona for the model.
pub const ANALYST_PERSONA: &str =
    "你是一位資深的非營利組織財務分析師，擅長用溫暖且專業的語氣給予教會建議。請使用繁體中文回答。";

/// Longest error body kept in [`Error::InsightStatus`].
const MAX_ERROR_BODY: usize = 512;

/// What is sent to the text-generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System instruction (persona and style).
    pub system: String,
    /// User content: the request followed by the ledger summary.
    pub contents: String,
}

impl Prompt {
    /// Build the analysis prompt for a set of records.
    #[must_use]
    pub fn for_records(records: &[DonationRecord]) -> Self {
        Self {
            system: ANALYST_PERSONA.to_string(),
            contents: format!("{ADVISOR_REQUEST}\n\n{}", ledger_summary(records)),
        }
    }
}

/// One line per record: `<date> <category> <amount>`.
#[must_use]
pub fn ledger_summary(records: &[DonationRecord]) -> String {
    records
        .iter()
        .map(|r| format!("{} {} {}", r.date.format("%Y-%m-%d"), r.category, r.amount.normalize()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A service that turns a prompt into prose.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for the prompt. A single attempt; no retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be reached, refuses the
    /// request, or answers with something unusable.
    async fn generate(&self, prompt: &Prompt) -> Result<String>;
}

/// Asks a [`TextGenerator`] for an analysis of the ledger.
#[derive(Debug)]
pub struct InsightRequester<G> {
    generator: G,
}

impl<G: TextGenerator> InsightRequester<G> {
    /// Wrap a generator.
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Analyze the records, returning prose or [`APOLOGY`].
    pub async fn analyze(&self, records: &[DonationRecord]) -> String {
        let prompt = Prompt::for_records(records);
        debug!("Requesting analysis of {} records", records.len());

        match self.generator.generate(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                error!("Analysis request returned no text");
                APOLOGY.to_string()
            }
            Err(e) => {
                error!("Analysis request failed: {}", e);
                APOLOGY.to_string()
            }
        }
    }
}

/// [`TextGenerator`] backed by the Gemini `generateContent` REST API.
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiGenerator {
    /// Create a generator for the given endpoint and model.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
        })
    }

    /// Create a generator from the `[insight]` configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.insight.endpoint.clone(),
            config.insight.model.clone(),
            config.api_key(),
            config.insight_timeout(),
        )
    }

    /// The `generateContent` URL for the configured model.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or(Error::MissingCredential)?;

        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &prompt.system,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: &prompt.contents,
                }],
            }],
        };

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::InsightStatus {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        extract_text(&body)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Pull the prose out of a `generateContent` response body.
fn extract_text(body: &str) -> Result<String> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| Error::insight_response(format!("unexpected body: {e}")))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(Error::insight_response("no text in response"));
    }
    Ok(text)
}
