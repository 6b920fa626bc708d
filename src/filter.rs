use teloxide::types::{ChatId, Message, MessageId};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl std::fmt::Display for ChatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatKind::Private => write!(f, "private"),
            ChatKind::Group => write!(f, "group"),
            ChatKind::Supergroup => write!(f, "supergroup"),
            ChatKind::Channel => write!(f, "channel"),
        }
    }
}

/// The parts of an incoming message the cleanup decision looks at.
///
/// Flags are plain booleans: a field the update omits is simply `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub chat_kind: ChatKind,
    pub has_new_participant: bool,
    pub has_left_participant: bool,
    pub has_pinned_message: bool,
}

impl From<&Message> for ServiceMessage {
    fn from(msg: &Message) -> Self {
        let chat_kind = if msg.chat.is_private() {
            ChatKind::Private
        } else if msg.chat.is_supergroup() {
            ChatKind::Supergroup
        } else if msg.chat.is_channel() {
            ChatKind::Channel
        } else {
            ChatKind::Group
        };

        Self {
            chat_id: msg.chat.id,
            message_id: msg.id,
            chat_kind,
            has_new_participant: msg
                .new_chat_members()
                .is_some_and(|members| !members.is_empty()),
            has_left_participant: msg.left_chat_member().is_some(),
            has_pinned_message: msg.pinned_message().is_some(),
        }
    }
}

/// Decide whether a message is a service notification that should be removed.
///
/// Private chats are never touched, even when the message would otherwise match.
pub fn should_delete(msg: &ServiceMessage) -> bool {
    if msg.chat_kind == ChatKind::Private {
        debug!("should_delete: private chat");
        return false;
    }
    if msg.has_new_participant {
        debug!("should_delete: new chat participant");
        return true;
    }
    if msg.has_left_participant {
        debug!("should_delete: left chat participant");
        return true;
    }
    if msg.has_pinned_message {
        debug!("should_delete: pinned message");
        return true;
    }
    false
}
