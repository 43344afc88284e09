use crate::config::Config;
use crate::error::TranslationError;
use crate::i18n::{LanguageRegistry, StringMap, TranslationMetrics, TranslationValidator};
use crate::retry::{with_backoff, RetryConfig};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Key used by [`BatchTranslationClient::translate`] for its one-entry batch.
const SINGLE_KEY: &str = "single";

/// Gemini generateContent request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

impl GenerateRequest {
    fn new(prompt: String) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_p: 0.95,
                max_output_tokens: 8192,
            },
        }
    }
}

/// Build the translation prompt for one chunk
fn build_prompt(language_name: &str, chunk_json: &str) -> String {
    format!(
        r#"You are a professional translator. Translate the following JSON object values from English to {language}.

IMPORTANT RULES:
1. Only translate the VALUES, keep the KEYS exactly the same
2. Maintain any placeholders like {{name}}, {{count}}, etc.
3. Return ONLY valid JSON, no explanations
4. Keep the same JSON structure
5. Translate naturally, considering context
6. If a value contains "|" for pluralization, translate both parts

JSON to translate:
{json}

Return only the translated JSON object:"#,
        language = language_name,
        json = chunk_json
    )
}

/// Remove a surrounding Markdown code fence (```json ... ``` or ``` ... ```).
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Extract and parse the translated JSON object from a provider response body.
fn parse_response(body: &str) -> Result<StringMap, TranslationError> {
    let response: GenerateResponse = serde_json::from_str(body)?;

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content.parts.into_iter().next())
        .map(|part| part.text)
        .ok_or_else(|| {
            TranslationError::Parse("response contained no candidate text".to_string())
        })?;

    serde_json::from_str(strip_code_fence(&text)).map_err(|e| {
        TranslationError::Parse(format!(
            "translated text is not a JSON object of strings: {}",
            e
        ))
    })
}

/// Client for the Gemini `generateContent` endpoint.
///
/// Inputs are split into chunks of at most `batch_size`, sent one after
/// another with a pause in between, and each chunk is retried with backoff.
/// Holds only immutable provider settings; every call is independent.
pub struct BatchTranslationClient {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    batch_size: usize,
    batch_delay: Duration,
    retry: RetryConfig,
    metrics: Arc<TranslationMetrics>,
}

impl BatchTranslationClient {
    pub fn new(config: &Config) -> Result<Self, TranslationError> {
        if config.api_key.trim().is_empty() {
            return Err(TranslationError::Config("API key is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TranslationError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            batch_size: config.batch_size.max(1),
            batch_delay: config.batch_delay,
            retry: config.retry_config(),
            metrics: Arc::new(TranslationMetrics::new()),
        })
    }

    /// Count provider calls into a shared metrics instance.
    pub fn with_metrics(mut self, metrics: Arc<TranslationMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Translate one string.
    ///
    /// Returns `None` when the provider answered without the value.
    pub async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<Option<String>, TranslationError> {
        let mut single = StringMap::new();
        single.insert(SINGLE_KEY.to_string(), text.to_string());

        let mut translated = self.translate_batch(&single, target_language).await?;
        Ok(translated.remove(SINGLE_KEY))
    }

    /// Translate every value of `strings`, keeping the keys.
    ///
    /// Chunks run sequentially in key order. The first chunk that exhausts its
    /// retries aborts the whole call with that chunk's last error.
    pub async fn translate_batch(
        &self,
        strings: &StringMap,
        target_language: &str,
    ) -> Result<StringMap, TranslationError> {
        if strings.is_empty() {
            return Ok(StringMap::new());
        }

        let entries: Vec<(&String, &String)> = strings.iter().collect();
        let chunks: Vec<_> = entries.chunks(self.batch_size).collect();
        let total_chunks = chunks.len();
        let language_name = display_name(target_language);

        info!(
            "Translating {} strings to {} in {} chunk(s)",
            strings.len(),
            language_name,
            total_chunks
        );

        let mut merged = StringMap::new();
        for (index, chunk) in chunks.into_iter().enumerate() {
            if index > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }

            let chunk: StringMap = chunk
                .iter()
                .map(|(key, text)| ((*key).clone(), (*text).clone()))
                .collect();

            debug!(
                "Translating chunk {}/{} ({} strings)",
                index + 1,
                total_chunks,
                chunk.len()
            );
            merged.extend(self.translate_chunk(&chunk, &language_name).await?);
        }

        Ok(merged)
    }

    async fn translate_chunk(
        &self,
        chunk: &StringMap,
        language_name: &str,
    ) -> Result<StringMap, TranslationError> {
        let prompt = build_prompt(language_name, &serde_json::to_string_pretty(chunk)?);

        let parsed = with_backoff(
            &self.retry,
            &format!("Translation to {}", language_name),
            || self.send(&prompt),
            TranslationError::is_rate_limit,
        )
        .await?;

        // Only keys that were asked for
        let translated: StringMap = parsed
            .into_iter()
            .filter(|(key, _)| chunk.contains_key(key))
            .collect();

        let validation = TranslationValidator::validate_batch(chunk, &translated);
        if validation.has_warnings() {
            warn!(
                "Translation validation warnings for {}: {:?}",
                language_name, validation.warnings
            );
        }

        Ok(translated)
    }

    /// One provider attempt, counted in the metrics.
    async fn send(&self, prompt: &str) -> Result<StringMap, TranslationError> {
        self.metrics.record_api_call();
        let result = self.send_request(prompt).await;
        if result.is_err() {
            self.metrics.record_api_failure();
        }
        result
    }

    async fn send_request(&self, prompt: &str) -> Result<StringMap, TranslationError> {
        let request = GenerateRequest::new(prompt.to_string());

        let response = self
            .client
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TranslationError::RateLimited);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(TranslationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        parse_response(&body)
    }
}

/// English name of a language code, or the code itself.
fn display_name(code: &str) -> String {
    LanguageRegistry::get()
        .get_by_code(code)
        .map(|lang| lang.name.to_string())
        .unwrap_or_else(|| code.to_string())
}
