//! Dharma counsel: the chat collaborator boundary.
//!
//! The language model is an external service behind [`ChatService`]. A
//! [`ChatSession`] is the opaque per-conversation handle; it fixes the
//! persona at creation, keeps the history, and never fails: transport
//! problems become a fixed apology. [`Counselor`] pairs a session with the
//! visible [`Transcript`].

mod counselor;
pub mod gemini;
pub mod sse;
pub mod transcript;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use thiserror::Error;
use uuid::Uuid;

use crate::models::ChatRole;

pub use counselor::Counselor;
pub use gemini::GeminiClient;
pub use transcript::{RequestTicket, Transcript, TranscriptError};

/// Persona for the counselor: a wise, compassionate monk.
pub const MONK_INSTRUCTION: &str = "당신은 지혜롭고 자비로운 불교 스님(법사)입니다. \
사용자의 고민을 경청하고, 초기 불교 경전이나 대승 불교의 가르침, 선(Zen) 이야기를 바탕으로 위로와 조언을 해주세요. \
말투는 항상 공손하고 온화한 '하십시오'체를 사용하세요. \
답변은 너무 길지 않게, 핵심을 꿰뚫는 통찰을 제공하되 따뜻함을 잃지 마세요. \
가능하다면 관련된 경전 구절을 인용하여 깊이를 더해주세요.";

/// First message shown in a new conversation.
pub const GREETING: &str =
    "어서 오십시오, 불자님. 무엇이 마음을 어지럽히고 있습니까? 편안하게 말씀해 주십시오.";

/// Reply used when the service fails.
pub const APOLOGY: &str =
    "지금은 깊은 명상 중이라 답변을 드리기 어렵습니다. 잠시 후 다시 시도해 주세요.";

/// Reply used when no API key is configured.
pub const NOT_CONNECTED: &str =
    "현재 마음의 연결(API Key)이 원활하지 않습니다. 설정에서 API 키를 확인해주세요.";

/// Reply used when the service answers with no text.
pub const SILENT_REPLY: &str = "말씀을 듣는 중에 잠시 명상에 잠겼습니다.";

/// Characters per fragment when a fixed reply is streamed.
const FALLBACK_FRAGMENT_CHARS: usize = 5;

/// Errors talking to the language model.
#[derive(Debug, Error)]
pub enum CounselError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Response contained no text")]
    EmptyResponse,
}

/// Lazily produced reply fragments, in arrival order. Finite and not
/// restartable.
pub type TextStream = BoxStream<'static, Result<String, CounselError>>;

/// One prior exchange in a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: ChatRole,
    pub text: String,
}

impl Turn {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// A single request to the language model.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub system_instruction: Option<String>,
    pub history: Vec<Turn>,
    pub message: String,
}

impl ChatRequest {
    /// A one-off prompt with no persona and no history.
    pub fn prompt(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// A hosted language model.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn generate(&self, request: ChatRequest) -> Result<String, CounselError>;

    async fn generate_stream(&self, request: ChatRequest) -> Result<TextStream, CounselError>;
}

/// Text handed back by a session.
///
/// Only model output belongs in the conversation history; notices stand in
/// for it when the service is missing, silent or failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Model(String),
    Notice(String),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Self::Model(text) | Self::Notice(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Model(text) | Self::Notice(text) => text,
        }
    }

    pub fn is_model(&self) -> bool {
        matches!(self, Self::Model(_))
    }
}

/// Opaque handle for one conversation.
///
/// Cloning shares the same conversation. The system instruction is fixed at
/// creation. [`reply`](Self::reply) and [`reply_streaming`](Self::reply_streaming)
/// leave the history alone so a caller can decide whether the exchange
/// counts; [`send`](Self::send) and [`send_streaming`](Self::send_streaming)
/// record it straight away.
#[derive(Clone)]
pub struct ChatSession {
    id: Uuid,
    service: Option<Arc<dyn ChatService>>,
    system_instruction: Arc<str>,
    history: Arc<Mutex<Vec<Turn>>>,
}

impl ChatSession {
    /// Open a conversation. Without a service every reply is [`NOT_CONNECTED`].
    pub fn open(service: Option<Arc<dyn ChatService>>, system_instruction: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            service,
            system_instruction: Arc::from(system_instruction),
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_connected(&self) -> bool {
        self.service.is_some()
    }

    pub fn history(&self) -> Vec<Turn> {
        self.history.lock().expect("history lock poisoned").clone()
    }

    /// Append one answered exchange to the history.
    pub fn remember(&self, prompt: &str, reply: &str) {
        let mut history = self.history.lock().expect("history lock poisoned");
        history.push(Turn::new(ChatRole::User, prompt));
        history.push(Turn::new(ChatRole::Assistant, reply));
    }

    fn chat_request(&self, text: &str) -> ChatRequest {
        ChatRequest {
            system_instruction: Some(self.system_instruction.to_string()),
            history: self.history(),
            message: text.to_string(),
        }
    }

    /// Ask for the whole reply without recording the exchange.
    pub async fn reply(&self, text: &str) -> Reply {
        let Some(service) = &self.service else {
            return Reply::Notice(NOT_CONNECTED.to_string());
        };

        match service.generate(self.chat_request(text)).await {
            Ok(reply) if reply.trim().is_empty() => Reply::Notice(SILENT_REPLY.to_string()),
            Ok(reply) => Reply::Model(reply),
            Err(e) => {
                tracing::error!(session = %self.id, "Counsel request failed: {}", e);
                Reply::Notice(APOLOGY.to_string())
            }
        }
    }

    /// Ask for the reply as fragments without recording the exchange.
    ///
    /// A failure to start streams the apology in small pieces; a mid-stream
    /// failure yields it as a final notice and ends the stream.
    pub async fn reply_streaming(&self, text: &str) -> BoxStream<'static, Reply> {
        let Some(service) = self.service.clone() else {
            return fixed_fragments(NOT_CONNECTED);
        };

        let inner = match service.generate_stream(self.chat_request(text)).await {
            Ok(inner) => inner,
            Err(e) => {
                tracing::error!(session = %self.id, "Counsel stream failed to start: {}", e);
                return fixed_fragments(APOLOGY);
            }
        };

        let session = self.id;
        stream::unfold(Some(inner), move |state| async move {
            let mut inner = state?;
            match inner.next().await? {
                Ok(fragment) => Some((Reply::Model(fragment), Some(inner))),
                Err(e) => {
                    tracing::error!(%session, "Counsel stream broke: {}", e);
                    Some((Reply::Notice(APOLOGY.to_string()), None))
                }
            }
        })
        .boxed()
    }

    /// Send a message, wait for the whole reply and record the exchange.
    pub async fn send(&self, text: &str) -> String {
        let reply = self.reply(text).await;
        if reply.is_model() {
            self.remember(text, reply.text());
        }
        reply.into_text()
    }

    /// Send a message and receive the reply as fragments. The exchange is
    /// added to the history once the stream ends, unless a notice was part
    /// of it.
    pub async fn send_streaming(&self, text: &str) -> BoxStream<'static, String> {
        let state = Recording {
            inner: self.reply_streaming(text).await,
            session: self.clone(),
            prompt: text.to_string(),
            reply: Some(String::new()),
        };

        stream::unfold(state, |mut state| async move {
            match state.inner.next().await {
                Some(part) => {
                    match &part {
                        Reply::Model(text) => {
                            if let Some(reply) = state.reply.as_mut() {
                                reply.push_str(text);
                            }
                        }
                        Reply::Notice(_) => state.reply = None,
                    }
                    Some((part.into_text(), state))
                }
                None => {
                    if let Some(reply) = state.reply.take().filter(|r| !r.trim().is_empty()) {
                        state.session.remember(&state.prompt, &reply);
                    }
                    None
                }
            }
        })
        .boxed()
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

struct Recording {
    inner: BoxStream<'static, Reply>,
    session: ChatSession,
    prompt: String,
    /// `None` once a notice was streamed.
    reply: Option<String>,
}

/// Stream a fixed notice in small pieces so it reads like a live answer.
fn fixed_fragments(text: &str) -> BoxStream<'static, Reply> {
    let chars: Vec<char> = text.chars().collect();
    let pieces: Vec<Reply> = chars
        .chunks(FALLBACK_FRAGMENT_CHARS)
        .map(|chunk| Reply::Notice(chunk.iter().collect()))
        .collect();
    stream::iter(pieces).boxed()
}
