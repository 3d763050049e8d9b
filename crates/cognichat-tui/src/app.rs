use std::path::PathBuf;
use std::time::Duration;

use cognichat_core::{
    Config, ConversationId, ConversationStore, MessageThread, PendingReply, StoreEvent,
};
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::ListState;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::mpsc;

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Sidebar,
    Chat,
}

/// Entries of the per-row action menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Favorite,
    Delete,
}

impl RowAction {
    pub fn all() -> [RowAction; 2] {
        [RowAction::Favorite, RowAction::Delete]
    }

    pub fn label(&self, is_favorite: bool) -> &'static str {
        match self {
            RowAction::Favorite if is_favorite => "Unfavorite",
            RowAction::Favorite => "Favorite",
            RowAction::Delete => "Delete",
        }
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Conversations
    pub store: ConversationStore,
    store_events: broadcast::Receiver<StoreEvent>,
    pub sidebar_state: ListState,
    pub show_sidebar: bool,

    // Open conversation view
    pub thread: Option<MessageThread>,
    pub chat_input: String,
    pub chat_cursor: usize, // cursor position in chat_input, in chars
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of message area for scroll calculations
    pub chat_width: u16,  // Width of message area for wrap calculations
    pub chat_follow: bool, // stick to the newest message on redraw

    // Popups
    pub show_action_menu: bool,
    pub action_menu_state: ListState,
    pub show_help: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub new_chat_area: Option<Rect>,
    pub sidebar_area: Option<Rect>,
    pub chat_area: Option<Rect>,

    // Settings
    pub default_title: String,
    pub reply_delay: Duration,
    pub config_path: Option<PathBuf>,
    reply_tx: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        store: ConversationStore,
        config: &Config,
        reply_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let store_events = store.subscribe();

        let mut sidebar_state = ListState::default();
        if !store.is_empty() {
            sidebar_state.select(Some(0));
        }

        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: FocusPane::Sidebar,

            store,
            store_events,
            sidebar_state,
            show_sidebar: config.show_sidebar(),

            thread: None,
            chat_input: String::new(),
            chat_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_follow: true,

            show_action_menu: false,
            action_menu_state: ListState::default(),
            show_help: false,

            animation_frame: 0,

            new_chat_area: None,
            sidebar_area: None,
            chat_area: None,

            default_title: config.default_title().to_string(),
            reply_delay: config.reply_delay(),
            config_path: None,
            reply_tx,
        }
    }

    pub fn reply_sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.reply_tx.clone()
    }

    /// Id of the sidebar row under the cursor
    pub fn cursor_id(&self) -> Option<ConversationId> {
        self.sidebar_state
            .selected()
            .and_then(|i| self.store.entries().get(i))
            .map(|e| e.id())
    }

    // Store commands

    pub fn new_conversation(&mut self) {
        let title = self.default_title.clone();
        self.store.create(&title);
        self.sync_store();
        self.show_action_menu = false;
        self.focus = FocusPane::Chat;
        self.input_mode = InputMode::Editing;
    }

    pub fn select_at_cursor(&mut self) {
        if let Some(id) = self.cursor_id() {
            self.store.select(id);
            self.sync_store();
        }
    }

    pub fn toggle_favorite_at_cursor(&mut self) {
        if let Some(id) = self.cursor_id() {
            self.store.toggle_favorite(id);
            self.sync_store();
        }
    }

    pub fn delete_at_cursor(&mut self) {
        if let Some(id) = self.cursor_id() {
            self.store.delete(id);
            self.sync_store();
        }
    }

    /// Apply queued store events to shell-local state, then make sure the
    /// open thread matches the store's selection.
    pub fn sync_store(&mut self) {
        loop {
            match self.store_events.try_recv() {
                Ok(event) => self.apply_store_event(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "store events lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        self.clamp_cursor();
        self.sync_thread();
    }

    fn apply_store_event(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::Created { id } | StoreEvent::Selected { id } => {
                if let Some(pos) = self.store.position(id) {
                    self.sidebar_state.select(Some(pos));
                }
            }
            StoreEvent::Deleted { .. } => {
                self.show_action_menu = false;
            }
            StoreEvent::FavoriteToggled { .. } => {}
        }
    }

    fn clamp_cursor(&mut self) {
        let len = self.store.len();
        if len == 0 {
            self.sidebar_state.select(None);
        } else {
            let i = self.sidebar_state.selected().unwrap_or(0);
            self.sidebar_state.select(Some(i.min(len - 1)));
        }
    }

    /// Tear down the open thread when the selection moved away from it, and
    /// open a fresh one for the new selection.
    fn sync_thread(&mut self) {
        let selected = self.store.selected();
        let current = self.thread.as_ref().map(|t| t.conversation());

        if selected.map(|e| e.id()) == current {
            return;
        }

        self.thread = selected.map(MessageThread::open);
        self.chat_input.clear();
        self.chat_cursor = 0;
        self.chat_scroll = 0;

        if self.thread.is_none() {
            self.input_mode = InputMode::Normal;
            if self.show_sidebar {
                self.focus = FocusPane::Sidebar;
            }
        } else {
            self.scroll_chat_to_bottom();
        }
    }

    // Chat

    /// Send the input line on the open thread. Returns the reply to schedule.
    pub fn submit_message(&mut self) -> Option<PendingReply> {
        let thread = self.thread.as_mut()?;
        let reply = thread.send(&self.chat_input)?;
        self.chat_input.clear();
        self.chat_cursor = 0;
        self.scroll_chat_to_bottom();
        Some(reply)
    }

    pub fn deliver_reply(&mut self, reply: PendingReply) {
        let delivered = self
            .thread
            .as_mut()
            .is_some_and(|thread| thread.deliver(reply.clone()));

        if delivered {
            self.scroll_chat_to_bottom();
        } else {
            tracing::debug!(conversation = %reply.conversation, "reply for closed view dropped");
        }
    }

    pub fn is_waiting_for_reply(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| t.pending_replies() > 0)
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_waiting_for_reply() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll the thread so the newest message (or "Thinking...") is visible,
    /// and keep following new content until the user scrolls by hand.
    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_follow = true;
        let Some(thread) = self.thread.as_ref() else {
            return;
        };

        // Use actual chat width for wrap calculation, default to 50 before the first draw
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in thread.messages() {
            total_lines += 1; // Sender line
            for line in msg.content.lines() {
                total_lines += wrapped_rows(line, wrap_width);
            }
            total_lines += 1; // Blank line after message
        }

        if thread.pending_replies() > 0 {
            total_lines += 2;
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    pub fn scroll_chat_down(&mut self, rows: u16) {
        self.chat_follow = false;
        self.chat_scroll = self.chat_scroll.saturating_add(rows);
    }

    pub fn scroll_chat_up(&mut self, rows: u16) {
        self.chat_follow = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(rows);
    }

    pub fn scroll_chat_to_top(&mut self) {
        self.chat_follow = false;
        self.chat_scroll = 0;
    }

    /// Record the drawn size of the message area. While following, the
    /// scroll is recomputed against it.
    pub fn set_chat_viewport(&mut self, width: u16, height: u16) {
        self.chat_width = width;
        self.chat_height = height;
        if self.chat_follow {
            self.scroll_chat_to_bottom();
        }
    }

    // Sidebar navigation

    pub fn sidebar_nav_down(&mut self) {
        let len = self.store.len();
        if len > 0 {
            let i = self.sidebar_state.selected().unwrap_or(0);
            self.sidebar_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn sidebar_nav_up(&mut self) {
        if !self.store.is_empty() {
            let i = self.sidebar_state.selected().unwrap_or(0);
            self.sidebar_state.select(Some(i.saturating_sub(1)));
        }
    }

    pub fn sidebar_nav_first(&mut self) {
        if !self.store.is_empty() {
            self.sidebar_state.select(Some(0));
        }
    }

    pub fn sidebar_nav_last(&mut self) {
        let len = self.store.len();
        if len > 0 {
            self.sidebar_state.select(Some(len - 1));
        }
    }

    pub fn toggle_sidebar(&mut self) {
        self.show_sidebar = !self.show_sidebar;
        if !self.show_sidebar {
            self.focus = FocusPane::Chat;
            self.show_action_menu = false;
        }
    }

    // Action menu

    pub fn open_action_menu(&mut self) {
        if self.cursor_id().is_some() {
            self.action_menu_state.select(Some(0));
            self.show_action_menu = true;
        }
    }

    pub fn action_menu_nav_down(&mut self) {
        let len = RowAction::all().len();
        let i = self.action_menu_state.selected().unwrap_or(0);
        self.action_menu_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn action_menu_nav_up(&mut self) {
        let i = self.action_menu_state.selected().unwrap_or(0);
        self.action_menu_state.select(Some(i.saturating_sub(1)));
    }

    pub fn apply_row_action(&mut self, action: RowAction) {
        self.show_action_menu = false;
        match action {
            RowAction::Favorite => self.toggle_favorite_at_cursor(),
            RowAction::Delete => self.delete_at_cursor(),
        }
    }

    pub fn apply_selected_row_action(&mut self) {
        let action = self
            .action_menu_state
            .selected()
            .and_then(|i| RowAction::all().get(i).copied());
        match action {
            Some(action) => self.apply_row_action(action),
            None => self.show_action_menu = false,
        }
    }
}

/// Terminal rows a line takes when wrapped at `width` columns. Measured in
/// display columns, so CJK text counts two per character. A wrapped row can
/// end one column short when a wide character does not fit, hence `width - 1`.
fn wrapped_rows(line: &str, width: usize) -> u16 {
    let columns = Line::from(line).width();
    if columns == 0 {
        return 1;
    }
    columns.div_ceil(width.saturating_sub(1).max(1)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use cognichat_core::DEFAULT_TITLE;

    fn app_with(titles: &[&str]) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = ConversationStore::from_titles(titles.iter().copied());
        (App::new(store, &Config::new(), tx), rx)
    }

    #[test]
    fn test_new_app_has_no_open_thread() {
        let (app, _rx) = app_with(&["A", "B"]);
        assert!(app.thread.is_none());
        assert_eq!(app.sidebar_state.selected(), Some(0));
        assert_eq!(app.focus, FocusPane::Sidebar);
    }

    #[test]
    fn test_empty_store_has_no_cursor() {
        let (app, _rx) = app_with(&[]);
        assert_eq!(app.sidebar_state.selected(), None);
        assert_eq!(app.cursor_id(), None);
    }

    #[test]
    fn test_new_conversation_opens_thread_at_top() {
        let (mut app, _rx) = app_with(&["A", "B"]);
        app.sidebar_nav_down();
        app.new_conversation();

        let first = &app.store.entries()[0];
        assert_eq!(first.title(), DEFAULT_TITLE);
        assert_eq!(app.sidebar_state.selected(), Some(0));
        assert_eq!(app.thread.as_ref().map(|t| t.conversation()), Some(first.id()));
        assert_eq!(app.focus, FocusPane::Chat);
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[test]
    fn test_select_other_conversation_replaces_thread() {
        let (mut app, _rx) = app_with(&["A", "B"]);
        app.select_at_cursor();
        app.chat_input = "hello".to_string();
        assert!(app.submit_message().is_some());
        let first_token = app.thread.as_ref().map(|t| t.token());

        app.sidebar_nav_down();
        app.select_at_cursor();
        app.sidebar_nav_up();
        app.select_at_cursor();

        let thread = app.thread.as_ref().expect("thread open");
        assert_eq!(thread.title(), "A");
        assert!(thread.messages().is_empty());
        assert_ne!(Some(thread.token()), first_token);
    }

    #[test]
    fn test_reselecting_open_conversation_keeps_thread() {
        let (mut app, _rx) = app_with(&["A"]);
        app.select_at_cursor();
        app.chat_input = "keep me".to_string();
        app.submit_message();
        app.select_at_cursor();
        assert_eq!(app.thread.as_ref().map(|t| t.messages().len()), Some(1));
    }

    #[test]
    fn test_delete_open_conversation_drops_thread() {
        let (mut app, _rx) = app_with(&["A", "B", "C"]);
        app.sidebar_nav_last();
        app.select_at_cursor();
        assert!(app.thread.is_some());

        app.delete_at_cursor();
        assert!(app.thread.is_none());
        assert_eq!(app.store.selected_id(), None);
        assert_eq!(app.sidebar_state.selected(), Some(1));
        assert_eq!(app.focus, FocusPane::Sidebar);
    }

    #[test]
    fn test_delete_other_keeps_thread() {
        let (mut app, _rx) = app_with(&["A", "B"]);
        app.select_at_cursor();
        app.sidebar_nav_down();
        app.delete_at_cursor();
        assert_eq!(app.thread.as_ref().map(|t| t.title()), Some("A"));
    }

    #[test]
    fn test_deliver_reply_after_navigation_is_dropped() {
        let (mut app, _rx) = app_with(&["A", "B"]);
        app.select_at_cursor();
        app.chat_input = "question".to_string();
        let reply = app.submit_message().expect("reply");

        app.sidebar_nav_down();
        app.select_at_cursor();
        app.deliver_reply(reply);

        assert!(app.thread.as_ref().is_some_and(|t| t.messages().is_empty()));
    }

    #[test]
    fn test_deliver_reply_appends_to_open_thread() {
        let (mut app, _rx) = app_with(&["A"]);
        app.select_at_cursor();
        app.chat_input = "question".to_string();
        let reply = app.submit_message().expect("reply");
        assert!(app.is_waiting_for_reply());
        assert!(app.chat_input.is_empty());

        app.deliver_reply(reply);
        assert!(!app.is_waiting_for_reply());
        assert_eq!(app.thread.as_ref().map(|t| t.messages().len()), Some(2));
    }

    #[test]
    fn test_favorite_from_action_menu() {
        let (mut app, _rx) = app_with(&["A", "B"]);
        app.sidebar_nav_down();
        app.open_action_menu();
        assert!(app.show_action_menu);
        app.apply_selected_row_action();

        assert!(!app.show_action_menu);
        assert!(app.store.entries()[1].is_favorite());
        assert_eq!(app.store.selected_id(), None);
    }

    #[test]
    fn test_delete_from_action_menu() {
        let (mut app, _rx) = app_with(&["A", "B"]);
        app.open_action_menu();
        app.action_menu_nav_down();
        app.apply_selected_row_action();
        let titles: Vec<_> = app.store.entries().iter().map(|e| e.title()).collect();
        assert_eq!(titles, vec!["B"]);
    }

    #[test]
    fn test_hiding_sidebar_moves_focus_to_chat() {
        let (mut app, _rx) = app_with(&["A"]);
        app.toggle_sidebar();
        assert!(!app.show_sidebar);
        assert_eq!(app.focus, FocusPane::Chat);
    }

    #[test]
    fn test_wrapped_rows_measure_display_columns() {
        assert_eq!(wrapped_rows("", 20), 1);
        assert_eq!(wrapped_rows("short", 20), 1);
        // 30 CJK characters are 60 columns
        let cjk = "洞".repeat(30);
        assert_eq!(wrapped_rows(&cjk, 21), 3);
        assert!(wrapped_rows(&cjk, 52) >= 2);
    }

    #[test]
    fn test_manual_scroll_stops_following() {
        let (mut app, _rx) = app_with(&["A"]);
        app.select_at_cursor();
        assert!(app.chat_follow);
        app.scroll_chat_up(1);
        assert!(!app.chat_follow);
        app.set_chat_viewport(40, 10);
        app.scroll_chat_to_bottom();
        assert!(app.chat_follow);
    }
}
