//! Full-screen terminal window: input area, output area, Translate and Copy
//! controls.

use ratatui::crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::SetTitle;
use ratatui::layout::{Alignment, Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use ratatui::{DefaultTerminal, Frame};
use std::time::{Duration, Instant};
use textwrap::core::display_width;
use tracing::{info, warn};

use crate::shell::clipboard::Clipboard;
use crate::shell::controller::ShellController;
use crate::shell::state::{COPY_LABEL, ERROR_TAG};

/// Window title
pub const WINDOW_TITLE: &str = "AI Translator (JP -> EN)";

/// How often the loop wakes up to drain worker events and redraw
const FRAME_INTERVAL: Duration = Duration::from_millis(50);

/// Which part of the window receives keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    /// Input area
    Input,
    /// Translate button
    Translate,
    /// Copy button
    Copy,
}

impl Focus {
    /// Focus after `Tab`
    fn next(self) -> Self {
        match self {
            Focus::Input => Focus::Translate,
            Focus::Translate => Focus::Copy,
            Focus::Copy => Focus::Input,
        }
    }

    /// Focus after `Shift+Tab`
    fn prev(self) -> Self {
        match self {
            Focus::Input => Focus::Copy,
            Focus::Translate => Focus::Input,
            Focus::Copy => Focus::Translate,
        }
    }
}

/// Editable multi-line text with a cursor counted in chars
#[derive(Debug, Default)]
struct InputBuffer {
    /// Current text
    text: String,
    /// Cursor offset in chars
    cursor: usize,
}

impl InputBuffer {
    /// Current text
    fn text(&self) -> &str {
        &self.text
    }

    /// Byte offset of the cursor
    fn byte_index(&self) -> usize {
        self.text
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    /// Insert `c` at the cursor
    fn insert_char(&mut self, c: char) {
        let at = self.byte_index();
        self.text.insert(at, c);
        self.cursor += 1;
    }

    /// Insert `s` at the cursor, e.g. a paste
    fn insert_str(&mut self, s: &str) {
        let clean = s.replace("\r\n", "\n").replace('\r', "\n");
        let at = self.byte_index();
        self.text.insert_str(at, &clean);
        self.cursor += clean.chars().count();
    }

    /// Delete the char before the cursor
    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index();
        self.text.remove(at);
    }

    /// Delete the char under the cursor
    fn delete(&mut self) {
        let at = self.byte_index();
        if at < self.text.len() {
            self.text.remove(at);
        }
    }

    /// Move one char left
    fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Move one char right
    fn move_right(&mut self) {
        if self.cursor < self.text.chars().count() {
            self.cursor += 1;
        }
    }

    /// Move to the start
    fn move_home(&mut self) {
        self.cursor = 0;
    }

    /// Move to the end
    fn move_end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    /// Row and column of the cursor once the text is wrapped to `width`
    fn cursor_position(&self, width: usize) -> (usize, usize) {
        let before = &self.text[..self.byte_index()];
        let rows = wrap_lines(before, width);
        let row = rows.len().saturating_sub(1);
        // Wrapping drops trailing spaces, but the cursor sits after them.
        let last_line = before.rsplit('\n').next().unwrap_or("");
        let trailing = last_line.len() - last_line.trim_end_matches(' ').len();
        let col = rows.last().map(|r| display_width(r)).unwrap_or(0) + trailing;
        if width > 0 && col >= width {
            (row + 1, 0)
        } else {
            (row, col)
        }
    }
}

/// Split `text` into rows no wider than `width` terminal cells.
///
/// Hard line breaks are kept; empty lines stay as empty rows. Words move to
/// the next row whole unless they alone are wider than `width`.
pub fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }

    let mut rows = Vec::new();
    for line in text.split('\n') {
        if line.is_empty() {
            rows.push(String::new());
            continue;
        }
        rows.extend(
            textwrap::wrap(line, textwrap::Options::new(width))
                .into_iter()
                .map(|row| row.into_owned()),
        );
    }
    rows
}

/// The interactive window and its key bindings
pub struct TranslatorWindow<C: Clipboard> {
    /// Request state and workers
    controller: ShellController,
    /// Copy target
    clipboard: C,
    /// Source text being edited
    input: InputBuffer,
    /// Part receiving keys
    focus: Focus,
    /// Copy failure shown on the help line
    notice: Option<String>,
    /// Set by `Esc` or `Ctrl+C`
    should_quit: bool,
}

impl<C: Clipboard> TranslatorWindow<C> {
    /// Create a window around `controller`
    pub fn new(controller: ShellController, clipboard: C) -> Self {
        Self {
            controller,
            clipboard,
            input: InputBuffer::default(),
            focus: Focus::Input,
            notice: None,
            should_quit: false,
        }
    }

    /// Take over the terminal and run until the user quits
    pub fn run(mut self) -> anyhow::Result<()> {
        let mut terminal = ratatui::try_init()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnableBracketedPaste, SetTitle(WINDOW_TITLE))?;
        info!("Window opened");

        let result = self.event_loop(&mut terminal);

        if let Err(e) = execute!(stdout, DisableBracketedPaste) {
            warn!("Failed to disable bracketed paste: {}", e);
        }
        ratatui::restore();
        result
    }

    /// Draw, poll input, drain worker events, until quit
    fn event_loop(&mut self, terminal: &mut DefaultTerminal) -> anyhow::Result<()> {
        while !self.should_quit {
            self.controller.pump();
            terminal.draw(|frame| self.render(frame))?;

            if event::poll(FRAME_INTERVAL)? {
                self.handle_event(event::read()?);
            }
        }
        Ok(())
    }

    /// Dispatch one terminal event
    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Paste(text) => {
                if self.focus == Focus::Input {
                    self.input.insert_str(&text);
                }
            }
            _ => {}
        }
    }

    /// Global shortcuts first, then the focused part
    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press && key.kind != KeyEventKind::Repeat {
            return;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => self.should_quit = true,
                KeyCode::Char('t') => self.translate(),
                KeyCode::Char('y') => self.copy(),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            _ => match self.focus {
                Focus::Input => self.edit_input(key.code),
                Focus::Translate => {
                    if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                        self.translate();
                    }
                }
                Focus::Copy => {
                    if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                        self.copy();
                    }
                }
            },
        }
    }

    /// Editing keys for the input area
    fn edit_input(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(c) => self.input.insert_char(c),
            KeyCode::Enter => self.input.insert_char('\n'),
            KeyCode::Backspace => self.input.backspace(),
            KeyCode::Delete => self.input.delete(),
            KeyCode::Left => self.input.move_left(),
            KeyCode::Right => self.input.move_right(),
            KeyCode::Home => self.input.move_home(),
            KeyCode::End => self.input.move_end(),
            _ => {}
        }
    }

    /// Submit the input
    fn translate(&mut self) {
        if self.controller.submit(self.input.text()) {
            self.notice = None;
        }
    }

    /// Copy the output, remembering any failure
    fn copy(&mut self) {
        match self.controller.copy(&mut self.clipboard, Instant::now()) {
            Ok(()) => self.notice = None,
            Err(e) => {
                warn!("Copy failed: {:#}", e);
                self.notice = Some(format!("{:#}", e));
            }
        }
    }

    /// Draw the whole window
    fn render(&self, frame: &mut Frame) {
        let [title_area, input_area, output_area, controls_area, help_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Percentage(40),
            Constraint::Fill(1),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        frame.render_widget(
            Paragraph::new(WINDOW_TITLE.bold()).alignment(Alignment::Center),
            title_area,
        );
        self.render_input(frame, input_area);
        self.render_output(frame, output_area);
        self.render_controls(frame, controls_area);
        self.render_help(frame, help_area);
    }

    /// Input area with the cursor placed after wrapping
    fn render_input(&self, frame: &mut Frame, area: Rect) {
        let block = Block::bordered()
            .title(" Japanese Input: ")
            .border_style(self.border_style(Focus::Input));
        let inner = block.inner(area);
        let width = inner.width as usize;
        let height = inner.height as usize;

        let rows = wrap_lines(self.input.text(), width);
        let (cursor_row, cursor_col) = self.input.cursor_position(width);
        let skip = (cursor_row + 1).saturating_sub(height);
        let lines: Vec<Line> = rows.into_iter().skip(skip).map(Line::from).collect();

        frame.render_widget(Paragraph::new(lines).block(block), area);

        if self.focus == Focus::Input && height > 0 {
            frame.set_cursor_position(Position::new(
                inner.x + cursor_col as u16,
                inner.y + (cursor_row - skip) as u16,
            ));
        }
    }

    /// Output area, following the newest text
    fn render_output(&self, frame: &mut Frame, area: Rect) {
        let block = Block::bordered().title(" English Output: ");
        let inner = block.inner(area);
        let height = inner.height as usize;

        // Follow the newest text.
        let rows = wrap_lines(self.controller.state().output(), inner.width as usize);
        let skip = rows.len().saturating_sub(height);
        let lines: Vec<Line> = rows
            .into_iter()
            .skip(skip)
            .map(|row| match row.find(ERROR_TAG) {
                Some(at) => {
                    let error = row[at..].to_string();
                    let mut text = row;
                    text.truncate(at);
                    Line::from(vec![
                        Span::raw(text),
                        Span::styled(error, Style::default().fg(Color::Red)),
                    ])
                }
                None => Line::from(row),
            })
            .collect();

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    /// Translate and Copy buttons
    fn render_controls(&self, frame: &mut Frame, area: Rect) {
        let state = self.controller.state();
        let copy_label = state.copy_label(Instant::now());
        let [translate_area, copy_area] = Layout::horizontal([
            Constraint::Fill(1),
            Constraint::Length(COPY_LABEL.len() as u16 + 4),
        ])
        .areas(area);

        let translate_style = if state.submit_enabled() {
            Style::default()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        frame.render_widget(
            Paragraph::new(Span::styled(state.submit_label(), translate_style))
                .alignment(Alignment::Center)
                .block(Block::bordered().border_style(self.border_style(Focus::Translate))),
            translate_area,
        );
        frame.render_widget(
            Paragraph::new(copy_label)
                .alignment(Alignment::Center)
                .block(Block::bordered().border_style(self.border_style(Focus::Copy))),
            copy_area,
        );
    }

    /// Key hints or the copy failure
    fn render_help(&self, frame: &mut Frame, area: Rect) {
        let line = match &self.notice {
            Some(notice) => Line::from(format!("Copy failed: {}", notice)).red(),
            None => Line::from(
                "Tab focus · Enter activate · Ctrl+T translate · Ctrl+Y copy · Esc quit",
            )
            .dark_gray(),
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    /// Highlight the focused part
    fn border_style(&self, target: Focus) -> Style {
        if self.focus == target {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        }
    }
}
