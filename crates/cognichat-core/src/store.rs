//! Conversation list and selection model
//!
//! The store is the single source of truth for which conversations exist, in
//! what order the sidebar shows them, and which one is open. It owns no UI:
//! consumers read the state through accessors and learn about changes by
//! subscribing to [`StoreEvent`]s.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

/// Titles the store is seeded with at startup, in display order
pub const DEMO_TITLES: [&str; 9] = [
    "Can a Soldier Carry a 14-Meter Spear Through a 5x12-Meter Hole?",
    "Arranging 7 people in a mountain-shaped formation",
    "Animated Weather Card UI with CSS",
    "Troubleshooting Video Cover Generation",
    "Custom Drawer Component for Content",
    "Friendly Assistance Offered",
    "Friendly Assistance Offered1",
    "Friendly Assistance Offered2",
    "Friendly Assistance Offered3",
];

/// Title given to conversations created from the UI
pub const DEFAULT_TITLE: &str = "新对话";

const EVENT_CAPACITY: usize = 64;

// Process-wide so ids stay unique across every store instance.
static NEXT_CONVERSATION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque conversation identifier. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationId(u64);

impl ConversationId {
    fn next() -> Self {
        Self(NEXT_CONVERSATION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conv-{}", self.0)
    }
}

/// A conversation as shown in the sidebar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationEntry {
    id: ConversationId,
    title: String,
    is_favorite: bool,
}

impl ConversationEntry {
    fn new(title: impl Into<String>) -> Self {
        Self {
            id: ConversationId::next(),
            title: title.into(),
            is_favorite: false,
        }
    }

    pub fn id(&self) -> ConversationId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_favorite(&self) -> bool {
        self.is_favorite
    }
}

/// Change notification published after every applied mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Created { id: ConversationId },
    Deleted { id: ConversationId, was_selected: bool },
    FavoriteToggled { id: ConversationId, is_favorite: bool },
    Selected { id: ConversationId },
}

pub struct ConversationStore {
    entries: Vec<ConversationEntry>,
    selected: Option<ConversationId>,
    events: broadcast::Sender<StoreEvent>,
}

impl ConversationStore {
    /// Empty store with nothing selected
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: Vec::new(),
            selected: None,
            events,
        }
    }

    /// Store holding one entry per title, in the given order
    pub fn from_titles<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut store = Self::new();
        store.entries = titles.into_iter().map(ConversationEntry::new).collect();
        store
    }

    /// Store seeded with the demo conversations
    pub fn with_demo_seed() -> Self {
        Self::from_titles(DEMO_TITLES)
    }

    /// Subscribe to change events. Events published before this call are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn selected_id(&self) -> Option<ConversationId> {
        self.selected
    }

    /// The selected entry, or `None` when nothing is selected or the selected id
    /// does not name an entry.
    pub fn selected(&self) -> Option<&ConversationEntry> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn get(&self, id: ConversationId) -> Option<&ConversationEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn position(&self, id: ConversationId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Create a conversation at the front of the list and select it
    pub fn create(&mut self, title: &str) -> ConversationEntry {
        let entry = ConversationEntry::new(title);
        let id = entry.id;
        self.entries.insert(0, entry.clone());
        self.selected = Some(id);
        tracing::debug!(%id, title, "conversation created");
        self.publish(StoreEvent::Created { id });
        entry
    }

    /// Remove a conversation. Unknown ids are ignored.
    pub fn delete(&mut self, id: ConversationId) {
        let was_selected = self.selected == Some(id);
        if was_selected {
            self.selected = None;
        }

        let Some(index) = self.position(id) else {
            return;
        };
        self.entries.remove(index);
        tracing::debug!(%id, was_selected, "conversation deleted");
        self.publish(StoreEvent::Deleted { id, was_selected });
    }

    /// Flip the favorite flag. Unknown ids are ignored.
    pub fn toggle_favorite(&mut self, id: ConversationId) {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            return;
        };
        entry.is_favorite = !entry.is_favorite;
        let is_favorite = entry.is_favorite;
        tracing::debug!(%id, is_favorite, "favorite toggled");
        self.publish(StoreEvent::FavoriteToggled { id, is_favorite });
    }

    /// Make `id` the active conversation.
    ///
    /// The id is not validated: callers pass ids taken from [`entries`](Self::entries).
    pub fn select(&mut self, id: ConversationId) {
        self.selected = Some(id);
        tracing::debug!(%id, "conversation selected");
        self.publish(StoreEvent::Selected { id });
    }

    fn publish(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}
