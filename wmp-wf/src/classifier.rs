//! Verdict classifier adapter
//!
//! The image classifier is an external service that answers with a small
//! integer verdict. Responses are decoded through [`Verdict::decode`]; any
//! response that is not a well-formed verdict is an error, never a guessed
//! default. Calls are not retried.

use async_trait::async_trait;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use wmp_common::config::ClassifierConfig;

const USER_AGENT: &str = concat!("wmp-wf/", env!("CARGO_PKG_VERSION"));

/// Classifier errors
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),

    #[error("Classifier returned status {0}: {1}")]
    Status(u16, String),

    #[error("Unparseable classifier response: {0}")]
    Unparseable(String),
}

impl From<ClassifierError> for wmp_common::Error {
    fn from(err: ClassifierError) -> Self {
        wmp_common::Error::ExternalService(err.to_string())
    }
}

/// Question asked of the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassifierTask {
    /// 0 = clean, 1 = unclean
    Cleanliness,
    /// 0 = no issue, anything else = issue detected
    ManholeIssue,
    /// 1 = fixed, anything else = not fixed
    ManholeFixed,
}

impl ClassifierTask {
    /// Path segment appended to the classifier base URL
    pub fn path(&self) -> &'static str {
        match self {
            ClassifierTask::Cleanliness => "cleanliness",
            ClassifierTask::ManholeIssue => "manhole-issue",
            ClassifierTask::ManholeFixed => "manhole-fixed",
        }
    }
}

impl fmt::Display for ClassifierTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Content submitted for classification
#[derive(Debug, Clone)]
pub enum Payload {
    Image(Vec<u8>),
    Text(String),
}

/// Decoded classifier output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Verdict(pub i64);

impl Verdict {
    pub const CLEAN: Verdict = Verdict(0);
    pub const UNCLEAN: Verdict = Verdict(1);
    pub const NO_ISSUE: Verdict = Verdict(0);
    pub const FIXED: Verdict = Verdict(1);

    /// Decode a raw response body
    ///
    /// Accepted shapes: `{"verdict": 1}`, `{"verdict": "1"}`, and bare text
    /// such as `1` or `1,0.93`, where the first comma-separated token is the
    /// verdict.
    pub fn decode(body: &str) -> Result<Verdict, ClassifierError> {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Err(ClassifierError::Unparseable("empty body".to_string()));
        }

        if trimmed.starts_with('{') {
            let value: Value = serde_json::from_str(trimmed)
                .map_err(|e| ClassifierError::Unparseable(e.to_string()))?;
            return match value.get("verdict") {
                Some(Value::Number(n)) => n
                    .as_i64()
                    .map(Verdict)
                    .ok_or_else(|| ClassifierError::Unparseable(format!("non-integer verdict {}", n))),
                Some(Value::String(s)) => Self::decode_token(s),
                Some(other) => Err(ClassifierError::Unparseable(format!(
                    "verdict has unexpected type: {}",
                    other
                ))),
                None => Err(ClassifierError::Unparseable("missing verdict field".to_string())),
            };
        }

        let first = trimmed.split(',').next().unwrap_or(trimmed);
        Self::decode_token(first)
    }

    fn decode_token(token: &str) -> Result<Verdict, ClassifierError> {
        token
            .trim()
            .parse::<i64>()
            .map(Verdict)
            .map_err(|_| ClassifierError::Unparseable(format!("'{}' is not an integer", token)))
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External classifier contract
#[async_trait]
pub trait VerdictClassifier: Send + Sync {
    async fn classify(&self, task: ClassifierTask, payload: Payload) -> Result<Verdict, ClassifierError>;
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

/// HTTP classifier client
pub struct HttpClassifier {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, task: ClassifierTask) -> String {
        format!("{}/{}", self.base_url, task.path())
    }
}

#[async_trait]
impl VerdictClassifier for HttpClassifier {
    async fn classify(&self, task: ClassifierTask, payload: Payload) -> Result<Verdict, ClassifierError> {
        let request = match &payload {
            Payload::Image(bytes) => ClassifyRequest {
                image: Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
                text: None,
            },
            Payload::Text(text) => ClassifyRequest { image: None, text: Some(text) },
        };

        tracing::debug!(task = %task, "Querying classifier");

        let response = self
            .http_client
            .post(self.endpoint(task))
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(ClassifierError::Status(status.as_u16(), body));
        }

        let verdict = Verdict::decode(&body)?;
        tracing::info!(task = %task, verdict = verdict.0, "Classifier verdict");
        Ok(verdict)
    }
}
