//! OpenAI-compatible chat-completions client.
//!
//! Speaks the `/chat/completions` wire format with strict `json_schema`
//! response formatting for the structured calls and data-URL image parts
//! for the vision call. The base URL is configurable so any compatible
//! gateway works.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ChatClient, InferenceError, StructuredRequest};

/// HTTP client for an OpenAI-compatible inference backend.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenAiClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        temperature: f32,
        timeout_secs: u64,
    ) -> Result<Self, InferenceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| InferenceError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature,
            client,
            timeout_secs,
        })
    }

    fn post_chat(&self, body: &ChatRequest<'_>) -> Result<String, InferenceError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    InferenceError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    InferenceError::Timeout(self.timeout_secs)
                } else {
                    InferenceError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(InferenceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| InferenceError::MalformedResponse("empty choices array".into()))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl ChatClient for OpenAiClient {
    fn complete_structured(
        &self,
        request: &StructuredRequest<'_>,
    ) -> Result<Value, InferenceError> {
        let _span = tracing::info_span!(
            "complete_structured",
            model = %self.model,
            schema = request.schema_name,
        )
        .entered();

        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![
                json!({ "role": "system", "content": request.system }),
                json!({ "role": "user", "content": request.user }),
            ],
            response_format: Some(json!({
                "type": "json_schema",
                "json_schema": {
                    "name": request.schema_name,
                    "strict": true,
                    "schema": request.schema,
                }
            })),
        };

        let content = self.post_chat(&body)?;
        serde_json::from_str(&content).map_err(|e| {
            InferenceError::MalformedResponse(format!("structured output is not JSON: {e}"))
        })
    }

    fn complete_vision(
        &self,
        instruction: &str,
        image_data_url: &str,
    ) -> Result<String, InferenceError> {
        let _span = tracing::info_span!(
            "complete_vision",
            model = %self.model,
            payload_len = image_data_url.len(),
        )
        .entered();

        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![json!({
                "role": "user",
                "content": [
                    { "type": "text", "text": instruction },
                    { "type": "image_url", "image_url": { "url": image_data_url } },
                ]
            })],
            response_format: None,
        };

        self.post_chat(&body)
    }
}

// ──────────────────────────────────────────────
// Mock clients (testing)
// ──────────────────────────────────────────────

/// Scripted backend for tests: fixed structured reply, fixed vision reply.
#[cfg(test)]
pub struct MockChatClient {
    pub structured_reply: std::sync::Mutex<Vec<Value>>,
    pub vision_reply: String,
    pub calls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockChatClient {
    /// Replies with `value` on every structured call.
    pub fn structured(value: Value) -> Self {
        Self {
            structured_reply: std::sync::Mutex::new(vec![value]),
            vision_reply: String::new(),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Replies in order, repeating the last value once the script runs out.
    pub fn scripted(values: Vec<Value>) -> Self {
        Self {
            structured_reply: std::sync::Mutex::new(values),
            vision_reply: String::new(),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_vision_reply(mut self, text: &str) -> Self {
        self.vision_reply = text.to_string();
        self
    }

    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl ChatClient for MockChatClient {
    fn complete_structured(
        &self,
        request: &StructuredRequest<'_>,
    ) -> Result<Value, InferenceError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("structured:{}:{}", request.schema_name, request.user));
        let mut script = self.structured_reply.lock().unwrap();
        if script.len() > 1 {
            Ok(script.remove(0))
        } else {
            Ok(script[0].clone())
        }
    }

    fn complete_vision(
        &self,
        instruction: &str,
        _image_data_url: &str,
    ) -> Result<String, InferenceError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("vision:{instruction}"));
        Ok(self.vision_reply.clone())
    }
}

/// Backend that fails every call — exercises the fail-soft paths.
#[cfg(test)]
pub struct FailingChatClient;

#[cfg(test)]
impl ChatClient for FailingChatClient {
    fn complete_structured(
        &self,
        _request: &StructuredRequest<'_>,
    ) -> Result<Value, InferenceError> {
        Err(InferenceError::Connection("http://unreachable".into()))
    }

    fn complete_vision(
        &self,
        _instruction: &str,
        _image_data_url: &str,
    ) -> Result<String, InferenceError> {
        Err(InferenceError::Connection("http://unreachable".into()))
    }
}
