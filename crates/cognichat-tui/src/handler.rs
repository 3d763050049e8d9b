use std::time::Duration;

use cognichat_core::PendingReply;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tokio::sync::mpsc;

use crate::app::{App, FocusPane, InputMode, RowAction};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => app.scroll_chat_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply(reply) => app.deliver_reply(reply),
    }
    app.sync_store();
}

/// Fire the simulated reply once after `delay`. The timer cannot be cancelled;
/// a reply for a view that is gone by then is dropped on delivery.
pub fn schedule_reply(tx: mpsc::UnboundedSender<AppEvent>, reply: PendingReply, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = tx.send(AppEvent::Reply(reply));
    });
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('n') => {
                app.new_conversation();
                return;
            }
            _ => {}
        }
    }

    if app.show_help {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') | KeyCode::Enter) {
            app.show_help = false;
        }
        return;
    }

    if app.show_action_menu {
        handle_action_menu(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_action_menu(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('m') | KeyCode::Char('.') => {
            app.show_action_menu = false;
        }
        KeyCode::Char('j') | KeyCode::Down => app.action_menu_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.action_menu_nav_up(),
        KeyCode::Enter => app.apply_selected_row_action(),
        KeyCode::Char('f') => app.apply_row_action(RowAction::Favorite),
        KeyCode::Char('d') => app.apply_row_action(RowAction::Delete),
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Char('n') => app.new_conversation(),
        KeyCode::Char('b') => app.toggle_sidebar(),

        KeyCode::Tab | KeyCode::BackTab => {
            app.focus = match app.focus {
                FocusPane::Sidebar => FocusPane::Chat,
                FocusPane::Chat if app.show_sidebar => FocusPane::Sidebar,
                FocusPane::Chat => FocusPane::Chat,
            };
        }

        _ => match app.focus {
            FocusPane::Sidebar => handle_sidebar_normal(app, key),
            FocusPane::Chat => handle_chat_normal(app, key),
        },
    }
}

fn handle_sidebar_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.sidebar_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.sidebar_nav_up(),
        KeyCode::Char('g') | KeyCode::Home => app.sidebar_nav_first(),
        KeyCode::Char('G') | KeyCode::End => app.sidebar_nav_last(),

        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => app.select_at_cursor(),

        KeyCode::Char('f') => app.toggle_favorite_at_cursor(),
        KeyCode::Char('d') | KeyCode::Delete => app.delete_at_cursor(),
        KeyCode::Char('m') | KeyCode::Char('.') => app.open_action_menu(),

        _ => {}
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    if app.thread.is_none() {
        // Welcome pane
        if key.code == KeyCode::Enter {
            app.new_conversation();
        }
        return;
    }

    match key.code {
        KeyCode::Char('i') | KeyCode::Char('a') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
            app.chat_cursor = app.chat_input.chars().count();
        }
        KeyCode::Char('j') | KeyCode::Down => app.scroll_chat_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::Char('g') | KeyCode::Home => app.scroll_chat_to_top(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_chat_to_bottom(),
        KeyCode::Esc | KeyCode::Char('h') | KeyCode::Left => {
            if app.show_sidebar {
                app.focus = FocusPane::Sidebar;
            }
        }
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            if let Some(reply) = app.submit_message() {
                schedule_reply(app.reply_sender(), reply, app.reply_delay);
            }
        }
        KeyCode::Backspace => {
            if app.chat_cursor > 0 {
                app.chat_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if app.chat_cursor < app.chat_input.chars().count() {
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.chat_cursor = app.chat_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.chat_input.chars().count();
            app.chat_cursor = (app.chat_cursor + 1).min(char_count);
        }
        KeyCode::Home => app.chat_cursor = 0,
        KeyCode::End => app.chat_cursor = app.chat_input.chars().count(),
        KeyCode::Char(c) => {
            if app.thread.is_some() {
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.insert(byte_pos, c);
                app.chat_cursor += 1;
            }
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_new_chat = app.new_chat_area.is_some_and(|r| point_in_rect(x, y, r));
    let in_sidebar = app.sidebar_area.is_some_and(|r| point_in_rect(x, y, r));
    let in_chat = app.chat_area.is_some_and(|r| point_in_rect(x, y, r));

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if in_new_chat {
                app.new_conversation();
            } else if in_sidebar {
                app.focus = FocusPane::Sidebar;
                app.input_mode = InputMode::Normal;
                if let Some(area) = app.sidebar_area {
                    // First row sits below the top border
                    let row = y.saturating_sub(area.y + 1) as usize + app.sidebar_state.offset();
                    if y > area.y && row < app.store.len() {
                        app.sidebar_state.select(Some(row));
                        app.select_at_cursor();
                    }
                }
            } else if in_chat && app.thread.is_some() {
                app.focus = FocusPane::Chat;
            }
        }
        MouseEventKind::ScrollDown => {
            if in_sidebar {
                app.sidebar_nav_down();
            } else if in_chat {
                app.scroll_chat_down(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if in_sidebar {
                app.sidebar_nav_up();
            } else if in_chat {
                app.scroll_chat_up(3);
            }
        }
        _ => {}
    }
}
