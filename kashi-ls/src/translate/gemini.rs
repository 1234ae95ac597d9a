//! Gemini translation engine
//!
//! Batches a whole document into a single generateContent call and demands a
//! JSON array back. The contract with the caller is strict: the returned
//! vector has the same length and order as the input.

use kashi_common::{Error, Result};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const USER_AGENT: &str = "kashi/0.1.0 (+https://github.com/kashi/kashi)";

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Translation(format!("gemini client: {e}")))?;
        Ok(Self {
            http,
            api_key,
            model,
        })
    }

    /// Translate a batch of lines, preserving order and length
    pub async fn translate_batch(&self, texts: &[String], target_lang: &str) -> Result<Vec<String>> {
        let prompt = format!(
            "Translate the following song lyric lines into the language with \
             BCP-47 code \"{target_lang}\". Keep the poetic register. Respond \
             with ONLY a JSON array of strings, one translated line per input \
             line, in the same order.\n\n{}",
            serde_json::to_string(texts)
                .map_err(|e| Error::Translation(format!("encode lines: {e}")))?
        );
        self.generate_lines(&prompt, texts.len()).await
    }

    /// Romanize a batch of lines, preserving order and length
    pub async fn romanize_batch(&self, texts: &[String]) -> Result<Vec<String>> {
        let prompt = format!(
            "Romanize the following song lyric lines (Latin transliteration, \
             keep word boundaries natural). Respond with ONLY a JSON array of \
             strings, one romanized line per input line, in the same order.\n\n{}",
            serde_json::to_string(texts)
                .map_err(|e| Error::Translation(format!("encode lines: {e}")))?
        );
        self.generate_lines(&prompt, texts.len()).await
    }

    async fn generate_lines(&self, prompt: &str, expected_len: usize) -> Result<Vec<String>> {
        let url = format!(
            "{GEMINI_BASE_URL}/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {"response_mime_type": "application/json"}
        });

        debug!(model = %self.model, lines = expected_len, "Dispatching Gemini batch");

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Translation(format!("gemini: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Translation(format!(
                "gemini returned {}",
                response.status()
            )));
        }

        let payload: GeminiResponse = response
            .json()
            .await
            .map_err(|e| Error::Translation(format!("gemini payload: {e}")))?;

        let text = payload
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| Error::Translation("gemini returned no candidates".to_string()))?;

        let lines: Vec<String> = serde_json::from_str(text.trim())
            .map_err(|e| Error::Translation(format!("gemini emitted non-JSON lines: {e}")))?;

        if lines.len() != expected_len {
            return Err(Error::Translation(format!(
                "gemini returned {} lines for {} inputs",
                lines.len(),
                expected_len
            )));
        }

        Ok(lines)
    }
}
