use std::sync::Mutex;

use futures::StreamExt;

use super::transcript::{Transcript, TranscriptError};
use super::{ChatSession, GREETING, SILENT_REPLY};
use crate::models::ChatMessage;

/// A chat session paired with the transcript the user sees.
///
/// At most one request is in flight. A reply that arrives after its request
/// was abandoned is dropped instead of being written over a newer exchange.
#[derive(Debug)]
pub struct Counselor {
    session: ChatSession,
    transcript: Mutex<Transcript>,
}

impl Counselor {
    pub fn new(session: ChatSession) -> Self {
        Self {
            session,
            transcript: Mutex::new(Transcript::with_greeting(GREETING)),
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.transcript().messages().to_vec()
    }

    pub fn is_pending(&self) -> bool {
        self.transcript().is_pending()
    }

    /// Forget the pending request, if any.
    pub fn abandon(&self) {
        self.transcript().abandon();
    }

    /// Send a message and record the whole reply.
    ///
    /// The exchange joins the session history only if the transcript
    /// accepted the reply.
    pub async fn ask(&self, text: &str) -> Result<ChatMessage, TranscriptError> {
        let ticket = self.transcript().begin(text)?;
        let prompt = text.trim();
        let reply = self.session.reply(prompt).await;

        let mut transcript = self.transcript();
        let message = transcript.complete(ticket, reply.text())?;
        if reply.is_model() {
            self.session.remember(prompt, reply.text());
        }
        Ok(message)
    }

    /// Send a message and record the reply as it streams in.
    ///
    /// `on_fragment` sees each fragment that made it into the transcript.
    /// Consumption stops as soon as the request is abandoned.
    pub async fn ask_streaming<F>(
        &self,
        text: &str,
        mut on_fragment: F,
    ) -> Result<ChatMessage, TranscriptError>
    where
        F: FnMut(&str),
    {
        let ticket = self.transcript().begin(text)?;
        let prompt = text.trim();
        let mut parts = self.session.reply_streaming(prompt).await;
        let mut answered = true;
        let mut streamed = false;

        while let Some(part) = parts.next().await {
            if !self.transcript().push_fragment(ticket, part.text()) {
                return Err(TranscriptError::Superseded);
            }
            answered &= part.is_model();
            streamed = true;
            on_fragment(part.text());
        }

        let mut transcript = self.transcript();
        let message = transcript.finish(ticket, SILENT_REPLY)?;
        if answered && streamed && !message.text.trim().is_empty() {
            self.session.remember(prompt, &message.text);
        }
        Ok(message)
    }

    fn transcript(&self) -> std::sync::MutexGuard<'_, Transcript> {
        self.transcript.lock().expect("transcript lock poisoned")
    }
}
