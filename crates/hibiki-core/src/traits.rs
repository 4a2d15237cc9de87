use crate::{error::HibikiError, message::ChatPage};
use async_trait::async_trait;

/// Chat transport trait — the platform.
///
/// The watch loop talks to the broadcast platform (YouTube Live in
/// this repo) exclusively through this seam, so tests can run it
/// against scripted pages.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Human-readable transport name.
    fn name(&self) -> &str;

    /// Resolve the chat id of the currently active broadcast.
    /// `Ok(None)` means no broadcast is live right now.
    async fn resolve_chat_id(&self) -> Result<Option<String>, HibikiError>;

    /// Fetch one page of messages. The cursor is the opaque token
    /// from the previous page, or `None` for the first fetch.
    async fn fetch_page(
        &self,
        chat_id: &str,
        cursor: Option<&str>,
    ) -> Result<ChatPage, HibikiError>;

    /// Post a message into the chat.
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), HibikiError>;
}

/// Generative text service trait — the voice.
///
/// Prompt in, short text out, or failure. Nothing else crosses this
/// boundary.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Human-readable generator name.
    fn name(&self) -> &str;

    /// Whether this generator requires an API key to function.
    fn requires_api_key(&self) -> bool;

    /// Generate one reply for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String, HibikiError>;

    /// Check if the generator is available and ready.
    async fn is_available(&self) -> bool;
}
