pub mod telegram;

use async_trait::async_trait;
use teloxide::types::{ChatId, MessageId};
use teloxide::RequestError;

/// Something that can remove a message from a chat.
///
/// Implemented by `teloxide::Bot`; tests swap in a recording fake.
#[async_trait]
pub trait MessageDeleter: Send + Sync {
    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId)
        -> Result<(), RequestError>;
}
