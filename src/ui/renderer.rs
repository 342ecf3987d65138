use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::core::message::Message;
use crate::core::session::ChatSession;

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const ACCENT: Color = Color::Green;

/// Scroll position of the transcript, in wrapped rows from the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollState {
    pub offset: u16,
    /// Follow new messages. Cleared when the user scrolls up, restored when
    /// they scroll back to the bottom.
    pub auto_scroll: bool,
    /// Largest valid offset as of the last draw.
    pub max_offset: u16,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            offset: 0,
            auto_scroll: true,
            max_offset: 0,
        }
    }
}

impl ScrollState {
    pub fn scroll_up(&mut self, rows: u16) {
        self.offset = self.offset.saturating_sub(rows);
        self.auto_scroll = self.offset >= self.max_offset;
    }

    pub fn scroll_down(&mut self, rows: u16) {
        self.offset = self.offset.saturating_add(rows).min(self.max_offset);
        self.auto_scroll = self.offset >= self.max_offset;
    }

    /// Recomputes bounds for a new content height and pins to the bottom
    /// when following.
    pub fn fit(&mut self, content_rows: u16, viewport_rows: u16) {
        self.max_offset = content_rows.saturating_sub(viewport_rows);
        if self.auto_scroll {
            self.offset = self.max_offset;
        } else {
            self.offset = self.offset.min(self.max_offset);
        }
    }
}

/// Per-frame values that do not live in the session.
pub struct ViewContext<'a> {
    pub model: &'a str,
    pub tick: usize,
}

fn message_lines(message: &Message) -> Vec<Line<'_>> {
    let (name_style, text_style, alignment) = if message.is_human() {
        (
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            Style::default().fg(ACCENT),
            Alignment::Right,
        )
    } else {
        (
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::BOLD),
            Style::default().fg(Color::White),
            Alignment::Left,
        )
    };

    let mut lines = vec![Line::from(vec![
        Span::styled(message.sender_name(), name_style),
        Span::styled(
            format!(" · {}", message.timestamp().format("%H:%M")),
            Style::default().fg(Color::DarkGray),
        ),
    ])
    .alignment(alignment)];

    for content_line in message.text().lines() {
        lines.push(Line::from(Span::styled(content_line, text_style)).alignment(alignment));
    }
    lines.push(Line::from(""));
    lines
}

pub fn build_display_lines(session: &ChatSession) -> Vec<Line<'_>> {
    session.messages().iter().flat_map(message_lines).collect()
}

/// Wraps `lines` to `width` columns at spaces, breaking words wider than a
/// row. The transcript is drawn from these rows without further wrapping, so
/// the scroll bounds are computed from exactly what ends up on screen.
pub fn prewrap_lines(lines: &[Line], width: u16) -> Vec<Line<'static>> {
    let mut rows = RowWrapper::new(usize::from(width.max(1)));
    for line in lines {
        rows.begin(line.alignment);
        for span in &line.spans {
            for (i, word) in span.content.split(' ').enumerate() {
                if i > 0 {
                    rows.push_space(span.style);
                }
                rows.push_word(word, span.style);
            }
        }
        rows.emit();
    }
    rows.out
}

struct RowWrapper {
    width: usize,
    alignment: Option<Alignment>,
    current: Vec<Span<'static>>,
    used: usize,
    /// The source line has already spilled onto another row.
    wrapped: bool,
    out: Vec<Line<'static>>,
}

impl RowWrapper {
    fn new(width: usize) -> Self {
        Self {
            width,
            alignment: None,
            current: Vec::new(),
            used: 0,
            wrapped: false,
            out: Vec::new(),
        }
    }

    fn begin(&mut self, alignment: Option<Alignment>) {
        self.alignment = alignment;
        self.wrapped = false;
    }

    fn push_space(&mut self, style: Style) {
        if self.used == 0 && self.wrapped {
            return;
        }
        if self.used >= self.width {
            self.break_row();
            return;
        }
        self.append(" ", style, 1);
    }

    fn push_word(&mut self, word: &str, style: Style) {
        if word.is_empty() {
            return;
        }
        let word_width = UnicodeWidthStr::width(word);
        if self.used > 0 && self.used + word_width > self.width {
            self.break_row();
        }
        if self.used + word_width <= self.width {
            self.append(word, style, word_width);
            return;
        }

        let mut buf = [0u8; 4];
        for ch in word.chars() {
            let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
            if self.used > 0 && self.used + ch_width > self.width {
                self.break_row();
            }
            self.append(ch.encode_utf8(&mut buf), style, ch_width);
        }
    }

    fn append(&mut self, text: &str, style: Style, columns: usize) {
        self.used += columns;
        if let Some(last) = self.current.last_mut() {
            if last.style == style {
                last.content.to_mut().push_str(text);
                return;
            }
        }
        self.current.push(Span::styled(text.to_string(), style));
    }

    fn break_row(&mut self) {
        if let Some(last) = self.current.last_mut() {
            let kept = last.content.trim_end_matches(' ').len();
            last.content.to_mut().truncate(kept);
        }
        self.emit();
        self.wrapped = true;
    }

    fn emit(&mut self) {
        let mut row = Line::from(std::mem::take(&mut self.current));
        row.alignment = self.alignment;
        self.out.push(row);
        self.used = 0;
    }
}

pub fn typing_indicator(session: &ChatSession, tick: usize) -> Option<String> {
    session.is_composing().then(|| {
        let frame = SPINNER_FRAMES[tick % SPINNER_FRAMES.len()];
        format!("{frame} {} is typing…", session.assistant().name)
    })
}

pub fn draw(f: &mut Frame, session: &ChatSession, scroll: &mut ScrollState, view: &ViewContext) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(f.area());

    draw_header(f, chunks[0], view);
    draw_transcript(f, chunks[1], session, scroll);

    if let Some(indicator) = typing_indicator(session, view.tick) {
        f.render_widget(
            Paragraph::new(indicator).style(Style::default().fg(Color::DarkGray)),
            chunks[2],
        );
    }

    draw_input(f, chunks[3], session);
}

fn draw_header(f: &mut Frame, area: Rect, view: &ViewContext) {
    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            "AI Chatbot",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("Chat with a conversational AI model ({})", view.model),
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .alignment(Alignment::Center);
    f.render_widget(header, area);
}

fn draw_transcript(f: &mut Frame, area: Rect, session: &ChatSession, scroll: &mut ScrollState) {
    let rows = prewrap_lines(&build_display_lines(session), area.width);
    scroll.fit(u16::try_from(rows.len()).unwrap_or(u16::MAX), area.height);

    let transcript = Paragraph::new(rows).scroll((scroll.offset, 0));
    f.render_widget(transcript, area);
}

fn draw_input(f: &mut Frame, area: Rect, session: &ChatSession) {
    let composing = session.is_composing();
    let (title, style) = if composing {
        (
            "Waiting for a reply…",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        (
            "Type your message (Enter to send, Ctrl+C to quit)",
            Style::default().fg(Color::Yellow),
        )
    };

    let input = Paragraph::new(session.input())
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(input, area);

    if !composing {
        let inner_width = area.width.saturating_sub(2);
        let typed = u16::try_from(UnicodeWidthStr::width(session.input())).unwrap_or(u16::MAX);
        f.set_cursor_position((area.x + 1 + typed.min(inner_width), area.y + 1));
    }
}
