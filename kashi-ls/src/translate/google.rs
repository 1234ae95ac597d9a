//! Google translate endpoint client
//!
//! Uses the public `translate_a/single` endpoint: `dt=t` for translation and
//! language detection, `dt=rm` for romanization. Romanization is retried
//! with exponential backoff because the endpoint sheds load intermittently.

use kashi_common::{Error, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

const GOOGLE_BASE_URL: &str = "https://translate.googleapis.com/translate_a/single";
const USER_AGENT: &str = "kashi/0.1.0 (+https://github.com/kashi/kashi)";
const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 500;

pub struct GoogleClient {
    http: reqwest::Client,
}

impl GoogleClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Translation(format!("google client: {e}")))?;
        Ok(Self { http })
    }

    /// Translate one text into the target language
    pub async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let data = self
            .call(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target_lang),
                ("dt", "t"),
                ("q", text),
            ])
            .await?;

        // data[0] is an array of [translated_segment, original_segment, ...]
        let translated = data
            .get(0)
            .and_then(Value::as_array)
            .map(|segments| {
                segments
                    .iter()
                    .filter_map(|seg| seg.get(0).and_then(Value::as_str))
                    .collect::<String>()
            })
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| text.to_string());

        Ok(translated)
    }

    /// Translate a batch, preserving order and length
    pub async fn translate_batch(&self, texts: &[String], target_lang: &str) -> Result<Vec<String>> {
        let futures = texts.iter().map(|text| self.translate(text, target_lang));
        futures::future::try_join_all(futures).await
    }

    /// Romanize a batch, preserving order and length
    ///
    /// Latin-script input is returned untouched. Individual failures fall
    /// back to the original text after the retry budget is exhausted.
    pub async fn romanize_texts(&self, texts: &[String]) -> Result<Vec<String>> {
        let context: String = texts.join(" ");
        if is_purely_latin_script(&context) {
            return Ok(texts.to_vec());
        }

        let source_lang = self.detect_language(&context).await;

        let mut romanized = Vec::with_capacity(texts.len());
        for text in texts {
            if is_purely_latin_script(text) {
                romanized.push(text.clone());
                continue;
            }
            romanized.push(self.romanize_one(text, &source_lang).await);
        }
        Ok(romanized)
    }

    /// Best-effort language detection; "auto" when it fails
    async fn detect_language(&self, context: &str) -> String {
        let result = self
            .call(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", "en"),
                ("dt", "t"),
                ("q", context),
            ])
            .await;

        match result {
            Ok(data) => data
                .get(2)
                .and_then(Value::as_str)
                .unwrap_or("auto")
                .to_string(),
            Err(e) => {
                warn!(error = %e, "Language detection failed, using auto");
                "auto".to_string()
            }
        }
    }

    async fn romanize_one(&self, text: &str, source_lang: &str) -> String {
        let mut delay_ms = RETRY_DELAY_MS;
        for attempt in 1..=MAX_RETRIES {
            let result = self
                .call(&[
                    ("client", "gtx"),
                    ("sl", source_lang),
                    ("tl", "en"),
                    ("hl", "en"),
                    ("dt", "rm"),
                    ("q", text),
                ])
                .await;

            match result {
                Ok(data) => {
                    // data[0][0][3] carries the romanized form
                    if let Some(romanized) = data
                        .get(0)
                        .and_then(|v| v.get(0))
                        .and_then(|v| v.get(3))
                        .and_then(Value::as_str)
                    {
                        return romanized.to_string();
                    }
                    return text.to_string();
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Romanization attempt failed");
                    if attempt < MAX_RETRIES {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms *= 2;
                    }
                }
            }
        }
        text.to_string()
    }

    async fn call(&self, query: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .http
            .get(GOOGLE_BASE_URL)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Translation(format!("google translate: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Translation(format!(
                "google translate returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Translation(format!("google translate payload: {e}")))
    }
}

/// True when the text contains no characters needing romanization
fn is_purely_latin_script(text: &str) -> bool {
    text.chars().all(|c| {
        c.is_ascii()
            || matches!(c, '\u{00C0}'..='\u{024F}') // Latin-1 supplement + extended
            || matches!(c, '\u{2000}'..='\u{206F}') // general punctuation
    })
}
