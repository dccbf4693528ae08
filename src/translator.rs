use crate::config::TranslationConfig;
use crate::language::Language;
use crate::retry::{with_retry_if, RetryConfig};
use crate::validator::MarkupValidator;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::warn;

/// Something that turns one source text into its translation.
///
/// The checkpoint loop only depends on this trait, so tests can drive it with
/// a local stub instead of a network service.
#[allow(async_fn_in_trait)]
pub trait Translator {
    async fn translate(&self, text: &str) -> Result<String>;
}

/// OpenAI Chat Completion request for translation
#[derive(Debug, Serialize)]
struct TranslationRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Non-success HTTP status returned by the language-model API.
#[derive(Debug, Error)]
#[error("OpenAI API error during translation ({status}): {body}")]
pub struct ApiStatusError {
    pub status: reqwest::StatusCode,
    pub body: String,
}

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 2000;

/// Build the system prompt for translation
fn build_system_prompt(source: Language, target: Language) -> String {
    format!(
        "You are a professional translator specializing in translating {} content to {} \
         with a focus on HR technology and business contexts.",
        source.name(),
        target.name()
    )
}

/// Build the user prompt for a single text entry
fn build_user_prompt(text: &str, source: Language, target: Language) -> String {
    format!(
        r#"Translate the following {source} text to {target}. Requirements:
1. Use natural, professional, and easy-to-understand tone for business audience
2. Make it sound human and polished, aligned with HR/technology context
3. Maintain clarity, smooth flow, and correct technical meaning
4. Avoid robotic language
5. Output ONLY the {target} translation, nothing else
6. IMPORTANT: Keep all HTML tags exactly as they are in the original text
7. Do NOT remove, add, or modify any HTML tags (<br>, <strong>, <p>, <h1>, <h2>, <h3>, <h4>, <div>, <span>, etc.)
8. Translate only the text content inside and between the HTML tags
9. Preserve all attributes, styles, and structure of HTML tags

{text}"#,
        source = source.name(),
        target = target.name(),
        text = text
    )
}

static FENCE_OPEN: OnceLock<Regex> = OnceLock::new();
static FENCE_CLOSE: OnceLock<Regex> = OnceLock::new();

/// Remove a surrounding markdown code fence (e.g. ```` ```html ````) from model output.
pub fn strip_code_fences(text: &str) -> String {
    let open = FENCE_OPEN.get_or_init(|| Regex::new(r"^```[a-zA-Z]*\n?").expect("static pattern"));
    let close = FENCE_CLOSE.get_or_init(|| Regex::new(r"```$").expect("static pattern"));

    let cleaned = open.replace(text.trim(), "");
    let cleaned = close.replace(cleaned.trim(), "");
    cleaned.trim().to_string()
}

/// Translator backed by an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiTranslator {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    source: Language,
    target: Language,
    retry: RetryConfig,
}

impl OpenAiTranslator {
    pub fn new(client: reqwest::Client, config: &TranslationConfig) -> Self {
        Self {
            client,
            api_url: config.openai_api_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            source: config.source_language,
            target: config.target_language,
            retry: RetryConfig::translation(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn build_request(&self, text: &str) -> TranslationRequest {
        TranslationRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: build_system_prompt(self.source, self.target),
                },
                Message {
                    role: "user".to_string(),
                    content: build_user_prompt(text, self.source, self.target),
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }
}

impl Translator for OpenAiTranslator {
    /// Translate one entry. An empty answer is returned as an empty string;
    /// deciding what to do with it is up to the caller.
    async fn translate(&self, text: &str) -> Result<String> {
        let request = self.build_request(text);

        let raw = with_retry_if(
            &self.retry,
            &format!("Translation to {}", self.target.name()),
            || async {
                let response = self
                    .client
                    .post(&self.api_url)
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .header("Content-Type", "application/json")
                    .json(&request)
                    .send()
                    .await
                    .context("Failed to send translation request to OpenAI API")?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
                    return Err(anyhow::Error::new(ApiStatusError { status, body }));
                }

                let chat_response: ChatResponse = response
                    .json()
                    .await
                    .context("Failed to parse OpenAI translation response")?;

                Ok(chat_response
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .unwrap_or_default())
            },
            is_retryable_error,
        )
        .await?;

        let translated = strip_code_fences(&raw);

        if !translated.is_empty() {
            let validation = MarkupValidator::validate(text, &translated);
            if validation.has_errors() {
                warn!("⚠ Translation markup errors: {:?}", validation.errors);
            }
            if validation.has_warnings() {
                warn!("⚠ Translation markup warnings: {:?}", validation.warnings);
            }
        }

        Ok(translated)
    }
}

/// Retry 429 and 5xx responses plus transport failures; other 4xx fail fast.
fn is_retryable_error(error: &anyhow::Error) -> bool {
    match error.downcast_ref::<ApiStatusError>() {
        Some(api) => api.status.as_u16() == 429 || api.status.is_server_error(),
        None => true,
    }
}
