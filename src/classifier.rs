//! Client for the external text-classification service.
//!
//! The service is an OpenAI-compatible chat-completions endpoint. Callers get
//! the raw message content back; interpreting it is up to them.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use regex::Regex;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ClassifierError;

/// Narrow interface to the classification service.
#[cfg_attr(test, mockall::automock)]
pub trait TextClassifier: Send + Sync {
    /// Sends `instructions` as the system message and `payload` as the user message.
    fn complete(&self, instructions: &str, payload: &str) -> Result<String, ClassifierError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`. `None` disables the classifier.
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    /// Extra attempts after the first one.
    pub max_retries: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            endpoint: None,
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
            max_retries: 1,
        }
    }
}

/// Classifier used when no endpoint is configured. Every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledClassifier;

impl TextClassifier for DisabledClassifier {
    fn complete(&self, _instructions: &str, _payload: &str) -> Result<String, ClassifierError> {
        Err(ClassifierError::NotConfigured)
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct HttpClassifier {
    client: Client,
    url: String,
    config: ClassifierConfig,
}

impl HttpClassifier {
    pub fn new(endpoint: &str, config: ClassifierConfig) -> Result<Self, ClassifierError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        let url = format!("{}/chat/completions", endpoint.trim_end_matches('/'));
        Ok(HttpClassifier {
            client,
            url,
            config,
        })
    }

    fn send_once(&self, instructions: &str, payload: &str) -> Result<String, ClassifierError> {
        let body = json!({
            "model": self.config.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": instructions },
                { "role": "user", "content": payload },
            ],
        });

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json()?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ClassifierError::EmptyResponse)
    }
}

impl TextClassifier for HttpClassifier {
    fn complete(&self, instructions: &str, payload: &str) -> Result<String, ClassifierError> {
        with_retries(self.config.max_retries, || {
            let start = Instant::now();
            let result = self.send_once(instructions, payload);
            debug!(
                "Classifier request to {} finished in {:.2}s ok={}",
                self.url,
                start.elapsed().as_secs_f32(),
                result.is_ok()
            );
            result
        })
    }
}

/// Runs `call` once, then up to `max_retries` more times while the error is retryable.
pub fn with_retries<F>(max_retries: u32, mut call: F) -> Result<String, ClassifierError>
where
    F: FnMut() -> Result<String, ClassifierError>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match call() {
            Ok(content) => {
                if attempt > 1 {
                    info!("Classifier call succeeded on attempt {}", attempt);
                }
                return Ok(content);
            }
            Err(e) if e.is_retryable() && attempt <= max_retries => {
                warn!("Classifier attempt {} failed: {}; retrying", attempt, e);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Builds the classifier for a config: HTTP when an endpoint is set, disabled otherwise.
pub fn classifier_from_config(
    config: &ClassifierConfig,
) -> Result<Box<dyn TextClassifier>, ClassifierError> {
    match config.endpoint.as_deref().map(str::trim) {
        Some(endpoint) if !endpoint.is_empty() => {
            Ok(Box::new(HttpClassifier::new(endpoint, config.clone())?))
        }
        _ => Ok(Box::new(DisabledClassifier)),
    }
}

fn code_fence() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)\s*```").ok())
        .as_ref()
}

/// Pulls a JSON value out of raw model output.
///
/// Accepts bare JSON, JSON inside a Markdown code fence, or JSON surrounded by
/// prose (the outermost `{..}` or `[..]` span).
pub fn extract_json(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }
    if let Some(inner) = code_fence()
        .and_then(|re| re.captures(trimmed))
        .and_then(|c| c.get(1))
    {
        if let Ok(value) = serde_json::from_str(inner.as_str()) {
            return Some(value);
        }
    }
    [('{', '}'), ('[', ']')].iter().find_map(|(open, close)| {
        let start = trimmed.find(*open)?;
        let end = trimmed.rfind(*close)?;
        if end <= start {
            return None;
        }
        serde_json::from_str(&trimmed[start..=end]).ok()
    })
}
