//! Deterministic scripted backend.
//!
//! Replays a fixed queue of replies in order, then reports itself
//! unavailable. Used for `play --offline` (where every turn exercises the
//! deterministic fallback paths) and for tests that need exact control
//! over what the "service" says.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ChatRequest, GenerativeClient, LlmError};

/// A generative client that replays canned replies.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedClient {
    /// A client with no replies: every call returns `Unavailable`.
    ///
    /// This is the `--offline` configuration — the engine's fallback
    /// parser and mechanical messages carry the whole session.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A client that returns the given replies in order.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
        }
    }

    /// Append a reply to the end of the queue.
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies
            .lock()
            .expect("scripted reply queue poisoned")
            .push_back(reply.into());
    }

    /// Number of replies still queued.
    pub fn remaining(&self) -> usize {
        self.replies
            .lock()
            .expect("scripted reply queue poisoned")
            .len()
    }
}

#[async_trait]
impl GenerativeClient for ScriptedClient {
    async fn chat(&self, _request: ChatRequest) -> Result<String, LlmError> {
        let mut queue = self
            .replies
            .lock()
            .map_err(|_| LlmError::Unavailable("reply queue poisoned".to_string()))?;
        queue
            .pop_front()
            .ok_or_else(|| LlmError::Unavailable("no scripted replies left".to_string()))
    }
}
