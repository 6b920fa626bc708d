use std::collections::HashSet;
use std::convert::Infallible;
use std::ops::ControlFlow;
use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::debug;

use crate::filter::{should_delete, ServiceMessage};
use crate::platform::MessageDeleter;

/// Chats where cleanup is active. Fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    chats: HashSet<ChatId>,
}

impl AllowList {
    pub fn new(chat_ids: &[i64]) -> Self {
        Self {
            chats: chat_ids.iter().copied().map(ChatId).collect(),
        }
    }

    pub fn contains(&self, chat_id: ChatId) -> bool {
        self.chats.contains(&chat_id)
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }
}

/// Handler chain: new messages only, allow-listed chats only, service
/// notifications only, then a best-effort delete.
pub fn schema(allow_list: AllowList) -> UpdateHandler<Infallible> {
    Update::filter_message()
        .filter_map(move |msg: Message| {
            if allow_list.contains(msg.chat.id) {
                Some(ServiceMessage::from(&msg))
            } else {
                debug!("From {} not allowed chat", msg.chat.id);
                None
            }
        })
        .filter(|msg: ServiceMessage| {
            let delete = should_delete(&msg);
            if !delete {
                debug!("Message {} in chat {} kept", msg.message_id.0, msg.chat_id);
            }
            delete
        })
        .endpoint(delete_service_message)
}

/// A failed delete is logged and dropped: the message stays and is never retried.
async fn delete_service_message(
    msg: ServiceMessage,
    deleter: Arc<dyn MessageDeleter>,
) -> Result<(), Infallible> {
    match deleter.delete_message(msg.chat_id, msg.message_id).await {
        Ok(()) => debug!(
            "Deleted message {} in {} chat {}",
            msg.message_id.0, msg.chat_kind, msg.chat_id
        ),
        Err(e) => debug!(
            "Failed to delete message {} in chat {}: {}",
            msg.message_id.0, msg.chat_id, e
        ),
    }
    Ok(())
}

/// Feeds webhook updates through the handler chain.
pub struct Cleaner {
    handler: UpdateHandler<Infallible>,
    deleter: Arc<dyn MessageDeleter>,
}

impl Cleaner {
    pub fn new(allow_list: AllowList, deleter: Arc<dyn MessageDeleter>) -> Self {
        Self {
            handler: schema(allow_list),
            deleter,
        }
    }

    /// Returns `true` when the update reached the delete endpoint.
    pub async fn feed_update(&self, update: Update) -> bool {
        let update_id = update.id.0;
        match self
            .handler
            .dispatch(dptree::deps![update, self.deleter.clone()])
            .await
        {
            ControlFlow::Break(_) => true,
            ControlFlow::Continue(_) => {
                debug!("Update {} skipped", update_id);
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use teloxide::types::MessageId;
    use teloxide::{ApiError, RequestError};

    /// Records every delete call; optionally fails them all.
    #[derive(Default)]
    pub(crate) struct RecordingDeleter {
        pub calls: Mutex<Vec<(ChatId, MessageId)>>,
        pub fail: bool,
    }

    impl RecordingDeleter {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn calls(&self) -> Vec<(ChatId, MessageId)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageDeleter for RecordingDeleter {
        async fn delete_message(
            &self,
            chat_id: ChatId,
            message_id: MessageId,
        ) -> Result<(), RequestError> {
            self.calls.lock().unwrap().push((chat_id, message_id));
            if self.fail {
                Err(RequestError::Api(ApiError::MessageCantBeDeleted))
            } else {
                Ok(())
            }
        }
    }

    fn group(id: i64) -> Value {
        json!({"id": id, "title": "Test", "type": "group"})
    }

    fn supergroup(id: i64) -> Value {
        json!({"id": id, "title": "Test", "type": "supergroup"})
    }

    fn private(id: i64) -> Value {
        json!({"id": id, "first_name": "Alice", "type": "private"})
    }

    fn user(id: i64) -> Value {
        json!({"id": id, "is_bot": false, "first_name": "Alice"})
    }

    /// A `message` update in `chat` with `extra` fields merged into the message.
    fn message_update(chat: Value, extra: Value) -> Update {
        let mut message = json!({
            "message_id": 5,
            "date": 1700000000,
            "chat": chat,
            "from": user(1),
        });
        if let Value::Object(fields) = extra {
            for (key, value) in fields {
                message[key.as_str()] = value;
            }
        }
        serde_json::from_str(&json!({"update_id": 1, "message": message}).to_string()).unwrap()
    }

    fn new_member() -> Value {
        json!({"new_chat_members": [user(2)]})
    }

    fn cleaner(allowed: &[i64], deleter: Arc<RecordingDeleter>) -> Cleaner {
        Cleaner::new(AllowList::new(allowed), deleter)
    }

    #[test]
    fn test_allow_list_lookup() {
        let list = AllowList::new(&[100, -1001, 100]);
        assert_eq!(list.len(), 2);
        assert!(list.contains(ChatId(100)));
        assert!(list.contains(ChatId(-1001)));
        assert!(!list.contains(ChatId(200)));
        assert!(AllowList::default().is_empty());
    }

    #[tokio::test]
    async fn test_unlisted_chat_is_never_touched() {
        let deleter = Arc::new(RecordingDeleter::default());
        let cleaner = cleaner(&[100], deleter.clone());

        let handled = cleaner.feed_update(message_update(group(200), new_member())).await;

        assert!(!handled);
        assert!(deleter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_new_member_deleted() {
        let deleter = Arc::new(RecordingDeleter::default());
        let cleaner = cleaner(&[100], deleter.clone());

        let handled = cleaner.feed_update(message_update(group(100), new_member())).await;

        assert!(handled);
        assert_eq!(deleter.calls(), vec![(ChatId(100), MessageId(5))]);
    }

    #[tokio::test]
    async fn test_left_member_deleted() {
        let deleter = Arc::new(RecordingDeleter::default());
        let cleaner = cleaner(&[-1001], deleter.clone());

        let update = message_update(supergroup(-1001), json!({"left_chat_member": user(2)}));
        assert!(cleaner.feed_update(update).await);
        assert_eq!(deleter.calls(), vec![(ChatId(-1001), MessageId(5))]);
    }

    #[tokio::test]
    async fn test_ordinary_message_kept() {
        let deleter = Arc::new(RecordingDeleter::default());
        let cleaner = cleaner(&[100], deleter.clone());

        let update = message_update(group(100), json!({"text": "hello"}));
        assert!(!cleaner.feed_update(update).await);
        assert!(deleter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_private_chat_kept_even_when_listed() {
        let deleter = Arc::new(RecordingDeleter::default());
        let cleaner = cleaner(&[100], deleter.clone());

        let update = message_update(private(100), new_member());
        assert!(!cleaner.feed_update(update).await);
        assert!(deleter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_is_swallowed() {
        let deleter = Arc::new(RecordingDeleter::failing());
        let cleaner = cleaner(&[100], deleter.clone());

        let handled = cleaner.feed_update(message_update(group(100), new_member())).await;

        assert!(handled);
        assert_eq!(deleter.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_update_without_message_ignored() {
        let deleter = Arc::new(RecordingDeleter::default());
        let cleaner = cleaner(&[-100], deleter.clone());

        let update: Update = serde_json::from_str(&json!({
            "update_id": 3,
            "edited_message": {
                "message_id": 9,
                "date": 1700000000,
                "edit_date": 1700000100,
                "chat": group(-100),
                "from": user(1),
                "text": "edited"
            }
        })
        .to_string())
        .unwrap();

        assert!(!cleaner.feed_update(update).await);
        assert!(deleter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pinned_update_deleted() {
        let deleter = Arc::new(RecordingDeleter::default());
        let cleaner = cleaner(&[-100], deleter.clone());

        let update = message_update(
            group(-100),
            json!({
                "pinned_message": {
                    "message_id": 4,
                    "date": 1699999999,
                    "chat": group(-100),
                    "from": user(1),
                    "text": "read the rules"
                }
            }),
        );

        assert!(cleaner.feed_update(update).await);
        assert_eq!(deleter.calls(), vec![(ChatId(-100), MessageId(5))]);
    }
}
