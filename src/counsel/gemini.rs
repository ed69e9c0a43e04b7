//! Gemini REST client.
//!
//! Talks to the `generateContent` and `streamGenerateContent` endpoints
//! directly. The API key and model come from `AppConfig`.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::sse::SseDecoder;
use super::{ChatRequest, ChatService, CounselError, TextStream};
use crate::models::ChatRole;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const TEMPERATURE: f32 = 0.7;
const TOP_K: u32 = 40;

/// Client for the Gemini generative-language API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Point the client at a different server, e.g. a local stand-in.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, method: &str, query: &str) -> String {
        format!(
            "{}/{}:{}?{}key={}",
            self.base_url, self.model, method, query, self.api_key
        )
    }

    async fn post(
        &self,
        url: String,
        request: &ChatRequest,
    ) -> Result<reqwest::Response, CounselError> {
        let response = self
            .client
            .post(url)
            .json(&GenerateContentRequest::from(request))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(map_http_error(status, body))
        }
    }
}

#[async_trait]
impl ChatService for GeminiClient {
    async fn generate(&self, request: ChatRequest) -> Result<String, CounselError> {
        let response = self.post(self.url("generateContent", ""), &request).await?;
        let parsed: GenerateContentResponse = response.json().await?;
        parsed.text().ok_or(CounselError::EmptyResponse)
    }

    async fn generate_stream(&self, request: ChatRequest) -> Result<TextStream, CounselError> {
        let response = self
            .post(self.url("streamGenerateContent", "alt=sse&"), &request)
            .await?;
        Ok(decode_stream(
            response
                .bytes_stream()
                .map(|chunk| chunk.map(|b| b.to_vec()))
                .boxed(),
        ))
    }
}

struct StreamState {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    ready: VecDeque<Result<String, CounselError>>,
    done: bool,
}

impl StreamState {
    fn accept(&mut self, data: String) {
        match serde_json::from_str::<GenerateContentResponse>(&data) {
            Ok(chunk) => {
                if let Some(text) = chunk.text().filter(|t| !t.is_empty()) {
                    self.ready.push_back(Ok(text));
                }
            }
            Err(e) => self.ready.push_back(Err(CounselError::Decode(e))),
        }
    }
}

/// Turn an SSE body into text fragments in arrival order.
fn decode_stream(body: BoxStream<'static, reqwest::Result<Vec<u8>>>) -> TextStream {
    let state = StreamState {
        body,
        decoder: SseDecoder::new(),
        ready: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    for data in state.decoder.push(&chunk) {
                        state.accept(data);
                    }
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(CounselError::Http(e)), state));
                }
                None => {
                    state.done = true;
                    if let Some(data) = state.decoder.finish() {
                        state.accept(data);
                    }
                }
            }
        }
    })
    .boxed()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

impl From<&ChatRequest> for GenerateContentRequest {
    fn from(request: &ChatRequest) -> Self {
        let mut contents: Vec<Content> = request
            .history
            .iter()
            .map(|turn| Content::text(Some(gemini_role(turn.role)), &turn.text))
            .collect();
        contents.push(Content::text(Some("user"), &request.message));

        Self {
            contents,
            system_instruction: request
                .system_instruction
                .as_deref()
                .map(|text| Content::text(None, text)),
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_k: TOP_K,
            },
        }
    }
}

fn gemini_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "model",
    }
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&'static str>, text: &str) -> Self {
        Self {
            role,
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn text(self) -> Option<String> {
        let parts = self
            .candidates?
            .into_iter()
            .next()?
            .content?
            .parts
            .unwrap_or_default();
        let text: String = parts.into_iter().filter_map(|p| p.text).collect();
        Some(text)
    }
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    parts: Option<Vec<PartResponse>>,
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

fn map_http_error(status: StatusCode, body: String) -> CounselError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    let retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    CounselError::Api {
        status: status.as_u16(),
        message,
        retryable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counsel::Turn;

    #[test]
    fn request_body_uses_gemini_roles_and_camel_case() {
        let request = ChatRequest {
            system_instruction: Some("be kind".into()),
            history: vec![
                Turn::new(ChatRole::User, "hi"),
                Turn::new(ChatRole::Assistant, "welcome"),
            ],
            message: "help".into(),
        };
        let body = serde_json::to_value(GenerateContentRequest::from(&request)).unwrap();

        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "help");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be kind");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["generationConfig"]["topK"], 40);
    }

    #[test]
    fn response_text_joins_parts() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"a"},{"text":"b"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.text(), Some("ab".to_string()));
    }

    #[test]
    fn missing_candidates_yield_none() {
        let parsed: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.text(), None);
    }

    #[test]
    fn maps_api_errors() {
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"code":429,"message":"slow down","status":"RESOURCE_EXHAUSTED"}}"#
                .to_string(),
        );
        match err {
            CounselError::Api {
                status,
                message,
                retryable,
            } => {
                assert_eq!(status, 429);
                assert_eq!(message, "RESOURCE_EXHAUSTED: slow down");
                assert!(retryable);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn maps_plain_text_errors() {
        let err = map_http_error(StatusCode::BAD_REQUEST, "nope".to_string());
        assert!(matches!(
            err,
            CounselError::Api { status: 400, ref message, retryable: false } if message == "nope"
        ));
    }
}
