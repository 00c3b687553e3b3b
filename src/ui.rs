//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).
//!
//! ## For contributors
//!
//! * The layout is a three-row split: a summary box on top, the scrollable
//!   list of recently notified posts, and a one-line status bar.
//! * Colours and styles are defined inline.
//! * [`ratatui`] is the TUI framework; see its docs for widget details.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::App;
use crate::cycle::display_time;

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let [summary_area, main_area, status_area] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_summary(app, frame, summary_area);
    draw_post_list(app, frame, main_area);
    draw_status_bar(app, frame, status_area);
}

fn draw_summary(app: &App, frame: &mut Frame, area: Rect) {
    let st = &app.status;

    let (state_label, state_color) = if st.is_running {
        ("RUNNING", Color::Green)
    } else {
        ("STOPPED", Color::Red)
    };
    let source = st.source.map(|k| k.describe()).unwrap_or("none");
    let last_check = st
        .last_check
        .map(display_time)
        .unwrap_or_else(|| "never".into());

    let lines = vec![
        Line::from(vec![
            Span::styled(state_label, Style::default().fg(state_color).add_modifier(Modifier::BOLD)),
            Span::raw(format!("  page {}  source {}  every {}s", st.page_id, source, st.check_interval_secs)),
        ]),
        Line::from(vec![
            Span::styled("Last checked: ", Style::default().fg(Color::DarkGray)),
            Span::raw(last_check),
            Span::styled("  next start: ", Style::default().fg(Color::DarkGray)),
            Span::raw(app.next_source.describe()),
        ]),
    ];

    let summary = Paragraph::new(lines).block(Block::default().title(" pagewatch ").borders(Borders::ALL));
    frame.render_widget(summary, area);
}

/// Render the scrollable list of recently notified posts.
fn draw_post_list(app: &mut App, frame: &mut Frame, area: Rect) {
    let list_items: Vec<ListItem> = app
        .status
        .recent_posts
        .iter()
        .map(|post| {
            let date_str = post
                .created_at
                .map(display_time)
                .unwrap_or_else(|| "no date".into());

            let line = Line::from(vec![
                Span::styled(format!("{:<22}", date_str), Style::default().fg(Color::DarkGray)),
                Span::raw(" "),
                Span::styled(&post.header, Style::default().fg(Color::White)),
                Span::raw("  "),
                Span::styled(format!("[{}]", post.id), Style::default().fg(Color::Cyan)),
            ]);

            ListItem::new(line)
        })
        .collect();

    let list = List::new(list_items)
        .block(Block::default().title(" Recent posts ").borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let message = app.notice.as_deref().unwrap_or(&app.status.status_message);
    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(message, Style::default().fg(Color::Yellow)),
        Span::raw("  s: start/stop  m: source  r: check  q: quit"),
    ]));
    frame.render_widget(status, area);
}
