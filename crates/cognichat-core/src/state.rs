//! UI-agnostic chat thread types
//!
//! A [`MessageThread`] is the transient message list behind one open
//! conversation view. It is owned by the presentation layer, not by the
//! [`ConversationStore`](crate::ConversationStore), and is dropped with the view.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};

use crate::store::{ConversationEntry, ConversationId};

/// The simulated assistant reply appended after every user message
pub const CANNED_REPLY: &str = "这是对你问题的回复。在实际应用中，这里会显示AI的响应内容。";

const DEMO_TRIGGER: &str = "14-Meter Spear";

const DEMO_QUESTION: &str =
    "古代攻城的时候，有个5*12米的长方形洞洞，士兵需要拿着14米的枪，他能否穿过这个门呢?";

const DEMO_ANSWER: &str = "分析士兵无法携带14米长枪穿过洞洞。

这个问题是在问士兵能否拿着14米长的枪穿过5*12米的长方形洞洞。

要解决这个问题，我需要确定最长的物体能否穿过这个长方形开口。几何学上，能穿过长方形开口的最长物体的长度等于该长方形的对角线长度。

计算对角线长度：
√(5² + 12²) = √(25 + 144) = √169 = 13米

由于长方形洞洞的对角线长度为13米，而士兵的枪长14米，所以士兵无法直接穿枪穿过洞洞。即使以最佳角度斜着穿过，枪的长度也超过了洞洞最大通过长度13米，因此士兵无法通过。

答案是：不能，士兵无法拿着14米长的枪穿过这个5*12米的洞洞。";

static NEXT_THREAD_TOKEN: AtomicU64 = AtomicU64::new(1);

/// A chat message in a conversation view
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Local::now(),
        }
    }

    /// Short wall-clock time shown next to the sender
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// Identifies one view instance of a thread. Reopening a conversation yields a new token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadToken(u64);

impl ThreadToken {
    fn next() -> Self {
        Self(NEXT_THREAD_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

/// A reply waiting for its timer. Only the thread that issued it accepts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReply {
    pub token: ThreadToken,
    pub conversation: ConversationId,
    pub content: String,
}

#[derive(Debug)]
pub struct MessageThread {
    token: ThreadToken,
    conversation: ConversationId,
    title: String,
    messages: Vec<ChatMessage>,
    pending: usize,
}

impl MessageThread {
    /// Open a fresh view of `entry`
    pub fn open(entry: &ConversationEntry) -> Self {
        let messages = if entry.title().contains(DEMO_TRIGGER) {
            vec![
                ChatMessage::new(ChatRole::User, DEMO_QUESTION),
                ChatMessage::new(ChatRole::Assistant, DEMO_ANSWER),
            ]
        } else {
            Vec::new()
        };

        Self {
            token: ThreadToken::next(),
            conversation: entry.id(),
            title: entry.title().to_string(),
            messages,
            pending: 0,
        }
    }

    pub fn token(&self) -> ThreadToken {
        self.token
    }

    pub fn conversation(&self) -> ConversationId {
        self.conversation
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Replies sent for but not yet delivered
    pub fn pending_replies(&self) -> usize {
        self.pending
    }

    /// Append a user message and return the reply to schedule.
    ///
    /// Blank input is ignored and returns `None`.
    pub fn send(&mut self, text: &str) -> Option<PendingReply> {
        if text.trim().is_empty() {
            return None;
        }

        self.messages.push(ChatMessage::new(ChatRole::User, text));
        self.pending += 1;

        Some(PendingReply {
            token: self.token,
            conversation: self.conversation,
            content: CANNED_REPLY.to_string(),
        })
    }

    /// Append a reply issued by this thread. Returns `false` and drops the
    /// reply when it belongs to another view.
    pub fn deliver(&mut self, reply: PendingReply) -> bool {
        if reply.token != self.token {
            return false;
        }

        self.messages
            .push(ChatMessage::new(ChatRole::Assistant, reply.content));
        self.pending = self.pending.saturating_sub(1);
        true
    }
}
