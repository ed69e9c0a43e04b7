//! The visible conversation, guarded against out-of-order replies.
//!
//! Each request gets a [`RequestTicket`] carrying the generation it was
//! issued for. Only the ticket of the pending generation may add assistant
//! text; anything else is a late reply to an abandoned request and is
//! dropped.

use thiserror::Error;

use crate::models::ChatMessage;

/// Why the transcript refused an operation.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("A reply is already pending")]
    Busy,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Request was superseded by a newer one")]
    Superseded,
}

/// Proof of which request a reply belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    generation: u64,
}

impl RequestTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    generation: u64,
    pending: Option<u64>,
    /// Index of the assistant entry being streamed for the pending request.
    slot: Option<usize>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an assistant greeting.
    pub fn with_greeting(text: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::assistant(text)],
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.pending == Some(ticket.generation)
    }

    /// Append the user's message and open a new request.
    ///
    /// Rejected while another request is pending; nothing is queued.
    pub fn begin(&mut self, text: &str) -> Result<RequestTicket, TranscriptError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TranscriptError::EmptyMessage);
        }
        if self.pending.is_some() {
            return Err(TranscriptError::Busy);
        }

        self.generation += 1;
        self.pending = Some(self.generation);
        self.slot = None;
        self.messages.push(ChatMessage::user(text));

        Ok(RequestTicket {
            generation: self.generation,
        })
    }

    /// Give up on the pending request. Its reply will be discarded and any
    /// partially streamed text is removed.
    pub fn abandon(&mut self) {
        let Some(generation) = self.pending.take() else {
            return;
        };
        if let Some(index) = self.slot.take() {
            self.messages.remove(index);
        }
        tracing::debug!(generation, "Abandoned pending counsel request");
    }

    /// Append streamed text to the assistant entry of this request.
    ///
    /// Returns false, changing nothing, when the ticket is stale.
    pub fn push_fragment(&mut self, ticket: RequestTicket, fragment: &str) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        match self.slot {
            Some(index) => self.messages[index].text.push_str(fragment),
            None => {
                self.messages.push(ChatMessage::assistant(fragment));
                self.slot = Some(self.messages.len() - 1);
            }
        }
        true
    }

    /// Record the full reply for this request and close it.
    pub fn complete(
        &mut self,
        ticket: RequestTicket,
        text: impl Into<String>,
    ) -> Result<ChatMessage, TranscriptError> {
        if !self.is_current(ticket) {
            tracing::debug!(
                generation = ticket.generation,
                current = self.generation,
                "Discarding stale counsel reply"
            );
            return Err(TranscriptError::Superseded);
        }

        self.pending = None;
        let index = match self.slot.take() {
            Some(index) => {
                self.messages[index].text = text.into();
                index
            }
            None => {
                self.messages.push(ChatMessage::assistant(text));
                self.messages.len() - 1
            }
        };
        Ok(self.messages[index].clone())
    }

    /// Close a streamed request. If nothing was streamed, `fallback` becomes
    /// the reply.
    pub fn finish(
        &mut self,
        ticket: RequestTicket,
        fallback: &str,
    ) -> Result<ChatMessage, TranscriptError> {
        if !self.is_current(ticket) {
            return Err(TranscriptError::Superseded);
        }
        match self.slot.take() {
            Some(index) => {
                self.pending = None;
                Ok(self.messages[index].clone())
            }
            None => self.complete(ticket, fallback),
        }
    }
}
