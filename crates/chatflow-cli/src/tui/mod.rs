//! Terminal chat view: header with status, message scrollback, input line.

mod app;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthStr;

use app::ChatApp;
use chatflow_models::Role;
use crate::relay::RelayClient;

const MODEL_LABEL: &str = "Gemini 2.5 Flash";
const ASSISTANT_LABEL: &str = "Gemini";
const PLACEHOLDER: &str = "Ask anything...";
const FOOTER_NOTE: &str = "Gemini may provide inaccurate info. Verification recommended.";

pub async fn run(relay_url: String) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = ChatApp::new(RelayClient::new(relay_url));
    let res = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut ChatApp,
) -> Result<()> {
    loop {
        terminal.draw(|f| render(f, app))?;

        if event::poll(app.poll_timeout())?
            && let Event::Key(key) = event::read()?
        {
            match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(());
                }
                KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    app.clear();
                }
                KeyCode::Esc => {
                    app.cancel_streaming();
                }
                KeyCode::Enter => {
                    app.submit();
                }
                KeyCode::Backspace if app.input_enabled() => {
                    app.delete_char();
                }
                KeyCode::Left => {
                    app.move_cursor_left();
                }
                KeyCode::Right => {
                    app.move_cursor_right();
                }
                KeyCode::Char(c) if app.input_enabled() => {
                    app.enter_char(c);
                }
                _ => {}
            }
        }

        app.drain_relay_events();
        app.reveal_if_due();
    }
}

fn render(f: &mut Frame, app: &ChatApp) {
    let chunks = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(1),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .split(f.area());

    render_header(f, chunks[0], app);
    render_messages(f, chunks[1], app);
    render_input(f, chunks[2], app);
    render_footer(f, chunks[3]);
}

fn render_header(f: &mut Frame, area: Rect, app: &ChatApp) {
    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            MODEL_LABEL,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!(
                "{}  (Enter send, Ctrl+L clear, Esc cancel, Ctrl+C quit)",
                app.status_label()
            ),
            Style::default().fg(Color::DarkGray),
        )),
    ]);
    f.render_widget(header, area);
}

fn render_messages(f: &mut Frame, area: Rect, app: &ChatApp) {
    if app.session.conversation().is_empty() {
        let empty = Paragraph::new(vec![
            Line::raw(""),
            Line::from(Span::styled(
                "How can I help you today?",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "Ready to stream powerful insights from Gemini.",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .alignment(Alignment::Center);
        f.render_widget(empty, area);
        return;
    }

    let lines = message_lines(app);
    let total = visual_rows(&lines, area.width);
    let scroll = total.saturating_sub(area.height);
    let messages = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(messages, area);
}

fn message_lines(app: &ChatApp) -> Vec<Line<'static>> {
    let turns = app.session.conversation().turns();
    let streaming = app.session.is_streaming();
    let mut lines = Vec::new();

    for (i, turn) in turns.iter().enumerate() {
        let (label, color) = match turn.role {
            Role::User => ("You", Color::Green),
            Role::Assistant => (ASSISTANT_LABEL, Color::Cyan),
        };
        lines.push(Line::from(Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));

        let mut content = turn.content.clone();
        // Block cursor on the message still being revealed
        if streaming && i == turns.len() - 1 && turn.role == Role::Assistant {
            content.push('▌');
        }
        for raw in content.split('\n') {
            lines.push(Line::raw(raw.to_string()));
        }
        lines.push(Line::raw(""));
    }

    lines
}

/// Rows the lines occupy after wrapping, for bottom-anchored scrolling.
fn visual_rows(lines: &[Line], width: u16) -> u16 {
    if width == 0 {
        return 0;
    }
    lines
        .iter()
        .map(|line| {
            let w = line.width() as u16;
            if w == 0 { 1 } else { w.div_ceil(width) }
        })
        .sum()
}

fn render_input(f: &mut Frame, area: Rect, app: &ChatApp) {
    let enabled = app.input_enabled();
    let border_style = if enabled {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default().borders(Borders::ALL).style(border_style);
    let inner = block.inner(area);
    f.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    if app.input.is_empty() {
        let placeholder = Paragraph::new(PLACEHOLDER).style(Style::default().fg(Color::DarkGray));
        f.render_widget(placeholder, inner);
    } else {
        let cursor_col = app.input_before_cursor().width() as u16;
        let scroll = cursor_col.saturating_sub(inner.width.saturating_sub(1));
        let input = Paragraph::new(app.input.as_str())
            .style(Style::default().fg(Color::Yellow))
            .scroll((0, scroll));
        f.render_widget(input, inner);
    }

    if enabled {
        let cursor_col = app.input_before_cursor().width() as u16;
        let visible_col = cursor_col.min(inner.width.saturating_sub(1));
        f.set_cursor_position(Position::new(inner.x + visible_col, inner.y));
    }
}

fn render_footer(f: &mut Frame, area: Rect) {
    let footer = Paragraph::new(FOOTER_NOTE)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(footer, area);
}
