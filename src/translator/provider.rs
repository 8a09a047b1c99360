use super::error::TranslateError;
use crate::constants::{
    SYSTEM_PROMPT, USER_PROMPT_TO_CHINESE, USER_PROMPT_TO_VIETNAMESE,
};
use crate::state::Settings;
use crate::vault::Credential;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub target_is_chinese: bool,
}

impl TranslationRequest {
    pub fn user_prompt(&self) -> String {
        let instruction = if self.target_is_chinese {
            USER_PROMPT_TO_CHINESE
        } else {
            USER_PROMPT_TO_VIETNAMESE
        };
        format!("{}\n{}", instruction, self.text)
    }
}

/// One outbound translation call. Implementations must not retry.
pub trait TranslationProvider: Send + Sync {
    fn id(&self) -> &'static str;
    fn translate(
        &self,
        request: &TranslationRequest,
        credential: &Credential,
    ) -> Result<String, TranslateError>;
}

pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create(settings: &Settings) -> Box<dyn TranslationProvider> {
        Box::new(
            GroqProvider::new(settings.endpoint.clone(), settings.model.clone()).with_timeouts(
                Duration::from_millis(settings.connect_timeout_ms),
                Duration::from_millis(settings.read_timeout_ms),
            ),
        )
    }
}

/// OpenAI-compatible chat completions endpoint (Groq by default).
#[derive(Clone)]
pub struct GroqProvider {
    endpoint: String,
    model: String,
    connect_timeout: Duration,
    /// Bounds each socket read and the request as a whole.
    read_timeout: Duration,
}

impl GroqProvider {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            connect_timeout: Duration::from_millis(crate::constants::CONNECT_TIMEOUT_MS_DEFAULT),
            read_timeout: Duration::from_millis(crate::constants::READ_TIMEOUT_MS_DEFAULT),
        }
    }

    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    fn request_body(&self, request: &TranslationRequest) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": request.user_prompt()}
            ]
        })
    }
}

pub(crate) fn parse_completion(json: &serde_json::Value) -> Result<String, TranslateError> {
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| {
            TranslateError::Upstream(
                "Unexpected response format: missing choices[0].message.content".to_string(),
            )
        })?
        .trim();
    if content.is_empty() {
        return Err(TranslateError::Upstream("Provider returned empty content".to_string()));
    }
    Ok(content.to_string())
}

fn map_ureq_error(err: ureq::Error) -> TranslateError {
    match err {
        ureq::Error::Status(401, _) | ureq::Error::Status(403, _) => {
            TranslateError::Upstream("Provider rejected the API key".to_string())
        }
        ureq::Error::Status(code, _) => {
            TranslateError::Upstream(format!("Provider returned HTTP {}", code))
        }
        ureq::Error::Transport(t) => {
            let msg = t.to_string();
            if msg.contains("timed out") || msg.contains("timeout") {
                TranslateError::Timeout
            } else {
                TranslateError::Upstream(msg)
            }
        }
    }
}

impl TranslationProvider for GroqProvider {
    fn id(&self) -> &'static str {
        "groq"
    }

    fn translate(
        &self,
        request: &TranslationRequest,
        credential: &Credential,
    ) -> Result<String, TranslateError> {
        let start = Instant::now();
        let agent = ureq::builder()
            .timeout_connect(self.connect_timeout)
            .timeout_read(self.read_timeout)
            .timeout(self.read_timeout)
            .build();

        let resp = agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json")
            .set("Authorization", &format!("Bearer {}", credential.expose()))
            .send_json(self.request_body(request))
            .map_err(|e| {
                let mapped = map_ureq_error(e);
                warn!("Translation request failed: {}", mapped);
                mapped
            })?;

        let json: serde_json::Value = resp.into_json().map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                TranslateError::Timeout
            } else {
                TranslateError::Upstream(format!("Failed to parse provider response: {}", e))
            }
        })?;

        let text = parse_completion(&json)?;
        debug!(
            "Translation via {} ({}) took {} ms",
            self.id(),
            self.model,
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}
