use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use cognichat_core::{ChatRole, MessageThread};
use unicode_width::UnicodeWidthChar;
use crate::app::{App, FocusPane, InputMode, RowAction};

const SIDEBAR_WIDTH: u16 = 36;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let detail_area = if app.show_sidebar {
        let [sidebar_area, detail_area] = Layout::horizontal([
            Constraint::Length(SIDEBAR_WIDTH.min(body_area.width / 2)),
            Constraint::Min(0),
        ])
        .areas(body_area);
        render_sidebar(app, frame, sidebar_area);
        detail_area
    } else {
        app.new_chat_area = None;
        app.sidebar_area = None;
        body_area
    };

    if app.thread.is_some() {
        render_chat(app, frame, detail_area);
    } else {
        render_welcome(app, frame, detail_area);
    }

    render_footer(app, frame, footer_area);

    // Render popups (in order of priority)
    if app.show_help {
        render_help(app, frame, area);
    } else if app.show_action_menu {
        render_action_menu(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let favorites = app.store.entries().iter().filter(|e| e.is_favorite()).count();
    let counts = if favorites > 0 {
        format!(" [{} chats, {} starred]", app.store.len(), favorites)
    } else {
        format!(" [{} chats]", app.store.len())
    };

    let title = Line::from(vec![
        Span::styled(" CogniChat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(counts, Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" INSERT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |k: &'static str, label: &'static str| {
        [Span::styled(k, key_style), Span::styled(label, label_style)]
    };

    let mut hints: Vec<Span> = Vec::new();
    if app.show_action_menu {
        hints.extend(hint(" j/k ", " nav "));
        hints.extend(hint(" Enter ", " apply "));
        hints.extend(hint(" Esc ", " close "));
    } else {
        match (app.input_mode, app.focus) {
            (InputMode::Editing, _) => {
                hints.extend(hint(" Enter ", " send "));
                hints.extend(hint(" Esc ", " stop typing "));
                hints.extend(hint(" C-n ", " new chat "));
            }
            (InputMode::Normal, FocusPane::Sidebar) => {
                hints.extend(hint(" j/k ", " nav "));
                hints.extend(hint(" Enter ", " open "));
                hints.extend(hint(" n ", " new "));
                hints.extend(hint(" f ", " star "));
                hints.extend(hint(" d ", " delete "));
                hints.extend(hint(" m ", " menu "));
            }
            (InputMode::Normal, FocusPane::Chat) => {
                if app.thread.is_some() {
                    hints.extend(hint(" i ", " type "));
                    hints.extend(hint(" j/k ", " scroll "));
                } else {
                    hints.extend(hint(" Enter ", " new chat "));
                }
            }
        }
        if app.input_mode == InputMode::Normal {
            hints.extend(hint(" Tab ", " focus "));
            hints.extend(hint(" b ", " sidebar "));
            hints.extend(hint(" ? ", " help "));
            hints.extend(hint(" q ", " quit "));
        }
    }

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_sidebar(app: &mut App, frame: &mut Frame, area: Rect) {
    let [new_chat_area, list_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(area);

    app.new_chat_area = Some(new_chat_area);
    app.sidebar_area = Some(list_area);

    let new_chat = Paragraph::new(Line::from(vec![
        Span::styled(" + ", Style::default().fg(Color::Green).bold()),
        Span::raw("New chat"),
    ]));
    frame.render_widget(new_chat, new_chat_area);

    let focused = app.focus == FocusPane::Sidebar;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Recents ");

    let selected_id = app.store.selected_id();
    let items: Vec<ListItem> = app
        .store
        .entries()
        .iter()
        .map(|entry| {
            let star = if entry.is_favorite() { "★ " } else { "  " };
            let style = if Some(entry.id()) == selected_id {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::styled(star, Style::default().fg(Color::Yellow)),
                Span::styled(entry.title().to_string(), style),
            ]))
        })
        .collect();

    let mut list = List::new(items).block(block).highlight_symbol("> ");
    if focused {
        list = list.highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    }

    frame.render_stateful_widget(list, list_area, &mut app.sidebar_state);
}

fn message_lines(thread: &MessageThread, animation_frame: u8) -> Text<'static> {
    let mut lines: Vec<Line> = Vec::new();

    for msg in thread.messages() {
        let (label, color) = match msg.role {
            ChatRole::User => ("You", Color::Cyan),
            ChatRole::Assistant => ("CogniChat", Color::Yellow),
        };
        lines.push(Line::from(vec![
            Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("  {}", msg.time_label()),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        for line in msg.content.lines() {
            lines.push(Line::from(line.to_string()));
        }
        lines.push(Line::default());
    }

    if thread.pending_replies() > 0 {
        lines.push(Line::from(Span::styled(
            "CogniChat",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    Text::from(lines)
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_area = Some(chat_area);
    app.set_chat_viewport(
        chat_area.width.saturating_sub(2),
        chat_area.height.saturating_sub(2),
    );

    let Some(thread) = app.thread.as_ref() else {
        return;
    };

    let chat_focused = app.focus == FocusPane::Chat && app.input_mode == InputMode::Normal;
    let border_color = if chat_focused { Color::Cyan } else { Color::DarkGray };

    let is_favorite = app
        .store
        .get(thread.conversation())
        .is_some_and(|e| e.is_favorite());
    let title = if is_favorite {
        format!(" ★ {} ", thread.title())
    } else {
        format!(" {} ", thread.title())
    };

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let chat_text = if thread.messages().is_empty() && thread.pending_replies() == 0 {
        Text::from(Span::styled(
            "Say something to start the conversation...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        message_lines(thread, app.animation_frame)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, chat_area);

    // Message input at the bottom - highlight when editing
    let editing = app.input_mode == InputMode::Editing;
    let input_border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(" Message (i to type, Enter to send) ");

    // Inner width = total width - 2 (for borders)
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = visible_input(&app.chat_input, app.chat_cursor, inner_width);

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, input_area);

    if editing && inner_width > 0 {
        frame.set_cursor_position((input_area.x + 1 + cursor_x as u16, input_area.y + 1));
    }
}

/// The part of `input` that fits in `width` columns with the cursor (a char
/// index) in view, plus the cursor's column inside that part. Wide characters
/// take two columns.
fn visible_input(input: &str, cursor: usize, width: usize) -> (String, usize) {
    if width == 0 {
        return (String::new(), 0);
    }
    let chars: Vec<char> = input.chars().collect();
    let cursor = cursor.min(chars.len());
    let columns = |c: &char| c.width().unwrap_or(0);

    // Scroll left until the text before the cursor and the cursor cell fit
    let mut start = cursor;
    let mut used = 1;
    while start > 0 {
        let w = columns(&chars[start - 1]);
        if used + w > width {
            break;
        }
        used += w;
        start -= 1;
    }
    let cursor_x: usize = chars[start..cursor].iter().map(columns).sum();

    let mut visible = String::new();
    let mut filled = 0;
    for c in &chars[start..] {
        let w = columns(c);
        if filled + w > width {
            break;
        }
        filled += w;
        visible.push(*c);
    }
    (visible, cursor_x)
}

fn render_welcome(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = None;

    let focused = app.focus == FocusPane::Chat;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [_, content_area, _] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(5),
        Constraint::Min(0),
    ])
    .areas(inner);

    let welcome = Paragraph::new(vec![
        Line::from(Span::styled(
            "Welcome to CogniChat",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Pick a conversation from the sidebar, or start a new one",
            Style::default().fg(Color::Gray),
        )),
        Line::default(),
        Line::from(vec![
            Span::styled(" n ", Style::default().bg(Color::Blue).fg(Color::White)),
            Span::raw(" New chat"),
        ]),
    ])
    .centered()
    .wrap(Wrap { trim: true });

    frame.render_widget(welcome, content_area);
}

fn centered_popup(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    popup
}

fn render_action_menu(app: &mut App, frame: &mut Frame, area: Rect) {
    let Some(entry) = app.cursor_id().and_then(|id| app.store.get(id)) else {
        return;
    };
    let is_favorite = entry.is_favorite();
    let title: String = entry.title().chars().take(24).collect();

    let popup_area = centered_popup(area, 30, RowAction::all().len() as u16 + 2);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ", title));

    let items: Vec<ListItem> = RowAction::all()
        .iter()
        .map(|action| {
            let style = match action {
                RowAction::Delete => Style::default().fg(Color::Red),
                RowAction::Favorite => Style::default().fg(Color::Yellow),
            };
            ListItem::new(format!(" {} ", action.label(is_favorite))).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.action_menu_state);
}

fn render_help(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let row = |k: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::styled(format!(" {:<10}", k), key_style),
            Span::raw(desc),
        ])
    };

    let mut lines = vec![
        row("n, C-n", "new chat"),
        row("j/k", "move in sidebar / scroll messages"),
        row("Enter", "open conversation"),
        row("f", "star / unstar"),
        row("d", "delete"),
        row("m", "row menu"),
        row("i", "type a message"),
        row("Tab", "switch pane"),
        row("b", "show / hide sidebar"),
        row("q, C-c", "quit"),
        Line::default(),
    ];

    let config_line = match &app.config_path {
        Some(path) => format!(" Config: {}", path.display()),
        None => " Config: defaults".to_string(),
    };
    lines.push(Line::from(Span::styled(config_line, Style::default().fg(Color::DarkGray))));

    let popup_area = centered_popup(area, 60, lines.len() as u16 + 2);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" CogniChat Help (Esc to close) ");

    let help = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(help, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use cognichat_core::{Config, ConversationStore};
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;

    fn draw(app: &mut App) -> String {
        draw_sized(app, 100, 30)
    }

    fn draw_sized(app: &mut App, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn app_with(titles: &[&str]) -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(ConversationStore::from_titles(titles.iter().copied()), &Config::new(), tx)
    }

    #[test]
    fn test_renders_sidebar_and_welcome() {
        let mut app = app_with(&["Alpha chat", "Beta chat"]);
        let screen = draw(&mut app);
        assert!(screen.contains("New chat"));
        assert!(screen.contains("Recents"));
        assert!(screen.contains("Alpha chat"));
        assert!(screen.contains("Welcome to CogniChat"));
        assert!(app.sidebar_area.is_some());
    }

    #[test]
    fn test_renders_open_thread() {
        let mut app = app_with(&["Alpha chat"]);
        app.select_at_cursor();
        app.chat_input = "draft".to_string();
        app.submit_message();
        let screen = draw(&mut app);
        assert!(screen.contains("You"));
        assert!(screen.contains("draft"));
        assert!(screen.contains("Thinking"));
        assert!(!screen.contains("Welcome to CogniChat"));
    }

    #[test]
    fn test_hidden_sidebar_is_not_drawn() {
        let mut app = app_with(&["Alpha chat"]);
        app.toggle_sidebar();
        let screen = draw(&mut app);
        assert!(!screen.contains("Recents"));
        assert!(app.sidebar_area.is_none());
    }

    #[test]
    fn test_action_menu_popup() {
        let mut app = app_with(&["Alpha chat"]);
        app.open_action_menu();
        let screen = draw(&mut app);
        assert!(screen.contains("Favorite"));
        assert!(screen.contains("Delete"));
    }

    #[test]
    fn test_thinking_visible_after_send_in_demo_conversation() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(ConversationStore::with_demo_seed(), &Config::new(), tx);
        draw_sized(&mut app, 90, 24);

        app.select_at_cursor();
        assert_eq!(app.thread.as_ref().map(|t| t.messages().len()), Some(2));
        draw_sized(&mut app, 90, 24);

        app.chat_input = "hello".to_string();
        assert!(app.submit_message().is_some());
        let screen = draw_sized(&mut app, 90, 24);
        assert!(screen.contains("hello"));
        assert!(screen.contains("Thinking"));
    }

    #[test]
    fn test_first_open_scrolls_against_drawn_size() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(ConversationStore::with_demo_seed(), &Config::new(), tx);
        app.select_at_cursor();
        assert_eq!(app.chat_width, 0);

        draw_sized(&mut app, 90, 24);
        assert_eq!((app.chat_width, app.chat_height), (52, 17));
        let drawn = app.chat_scroll;
        assert!(drawn > 0);
        app.scroll_chat_to_bottom();
        assert_eq!(app.chat_scroll, drawn);
    }

    #[test]
    fn test_manual_scroll_is_kept_on_redraw() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(ConversationStore::with_demo_seed(), &Config::new(), tx);
        app.select_at_cursor();
        draw_sized(&mut app, 90, 24);
        app.scroll_chat_to_top();
        draw_sized(&mut app, 90, 24);
        assert_eq!(app.chat_scroll, 0);
    }

    #[test]
    fn test_visible_input_counts_wide_characters() {
        assert_eq!(visible_input("你好", 2, 10), ("你好".to_string(), 4));
        assert_eq!(visible_input("abc", 1, 10), ("abc".to_string(), 1));
    }

    #[test]
    fn test_visible_input_scrolls_to_cursor() {
        assert_eq!(visible_input("你好世界", 4, 5), ("世界".to_string(), 4));
        assert_eq!(visible_input("abcdef", 6, 4), ("def".to_string(), 3));
    }
}
