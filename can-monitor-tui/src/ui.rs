//! Render loop and scroll state machine
//!
//! The render loop runs on its own cadence: draw a snapshot of the live
//! table, poll for a key with a short timeout, apply the key to the
//! viewport, clamp. It is a sampling consumer - it only ever needs the
//! latest snapshot, never every intermediate update.
//!
//! The scroll state machine (`ScrollCommand` + `ViewportState`) is kept
//! free of terminal I/O so its transitions are testable in isolation.

use crate::config::UiConfig;
use crate::state::{self, LiveTable};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::Terminal;
use std::io;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// What a key press means to the scroll state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollCommand {
    LineDown,
    LineUp,
    PageForward,
    PageBack,
    Quit,
}

/// Map a key event to its scroll command
///
/// Unmapped keys return None and are inert - never an error.
pub fn command_for(key: &KeyEvent) -> Option<ScrollCommand> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(ScrollCommand::Quit);
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(ScrollCommand::Quit),
        KeyCode::Down => Some(ScrollCommand::LineDown),
        KeyCode::Up => Some(ScrollCommand::LineUp),
        KeyCode::Right | KeyCode::PageDown | KeyCode::Char(' ') => Some(ScrollCommand::PageForward),
        KeyCode::Left | KeyCode::PageUp => Some(ScrollCommand::PageBack),
        _ => None,
    }
}

/// Scroll offset over the virtual content; private to the render loop
#[derive(Debug, Default)]
pub struct ViewportState {
    offset: usize,
}

impl ViewportState {
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Apply one command; `page` is the current viewport height
    pub fn apply(&mut self, command: ScrollCommand, page: usize) {
        match command {
            ScrollCommand::LineDown => self.offset = self.offset.saturating_add(1),
            ScrollCommand::LineUp => self.offset = self.offset.saturating_sub(1),
            ScrollCommand::PageForward => self.offset = self.offset.saturating_add(page),
            ScrollCommand::PageBack => self.offset = self.offset.saturating_sub(page),
            ScrollCommand::Quit => {}
        }
    }

    /// Clamp to `[0, max(0, virtual_height - viewport_height)]`
    ///
    /// Runs after every tick. The virtual height is a configured constant,
    /// not the live row count - rows past the table are simply blank.
    pub fn clamp(&mut self, virtual_height: usize, viewport_height: usize) {
        self.offset = self.offset.min(virtual_height.saturating_sub(viewport_height));
    }
}

/// The footer's last-key display: printable char plus numeric code
///
/// Non-character keys collapse to '0', like the unprintable-key
/// normalization in classic curses monitors.
fn key_label(key: &KeyEvent) -> (char, u32) {
    match key.code {
        KeyCode::Char(c) => (c, c as u32),
        _ => ('0', '0' as u32),
    }
}

/// The interactive monitor view
pub struct MonitorApp {
    table: Arc<LiveTable>,
    fault: Arc<OnceLock<String>>,
    config: UiConfig,
    viewport: ViewportState,
    viewport_height: usize,
    last_key: (char, u32),
    should_quit: bool,
}

impl MonitorApp {
    pub fn new(table: Arc<LiveTable>, fault: Arc<OnceLock<String>>, config: UiConfig) -> Self {
        Self {
            table,
            fault,
            config,
            viewport: ViewportState::default(),
            viewport_height: 0,
            last_key: ('0', '0' as u32),
            should_quit: false,
        }
    }

    /// Run the render loop until a quit key or a bus fault
    pub fn run(mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick = Duration::from_millis(self.config.tick_ms);

        loop {
            terminal.draw(|f| self.draw(f))?;

            // Poll with a short timeout: a timeout is a no-op tick that
            // still re-renders, so counts and deltas keep moving on screen
            // even without input.
            if event::poll(tick)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(&key);
                    }
                }
            }

            self.viewport
                .clamp(self.config.virtual_height, self.viewport_height);

            if self.should_quit || self.fault.get().is_some() {
                break;
            }
        }

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        Ok(())
    }

    fn handle_key(&mut self, key: &KeyEvent) {
        self.last_key = key_label(key);
        match command_for(key) {
            Some(ScrollCommand::Quit) => self.should_quit = true,
            Some(command) => self.viewport.apply(command, self.viewport_height),
            None => {}
        }
    }

    fn draw(&mut self, f: &mut ratatui::Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // title bar
                Constraint::Length(2), // column header
                Constraint::Min(0),    // table body
                Constraint::Length(1), // status bar
            ])
            .split(f.area());

        self.viewport_height = chunks[2].height as usize;

        let title = Paragraph::new(self.config.title.as_str())
            .style(Style::default().add_modifier(Modifier::REVERSED));
        f.render_widget(title, chunks[0]);

        let header_lines: Vec<Line> = state::header_lines().iter().map(|l| Line::from(*l)).collect();
        f.render_widget(Paragraph::new(header_lines), chunks[1]);

        let body = Paragraph::new(self.body_lines()).scroll((self.viewport.offset() as u16, 0));
        f.render_widget(body, chunks[2]);

        let (ch, code) = self.last_key;
        let status = format!(
            "Press 'q' to quit | {} / {} | '{}' ({})",
            self.viewport.offset(),
            self.config.virtual_height,
            ch,
            code
        );
        let footer =
            Paragraph::new(status).style(Style::default().add_modifier(Modifier::REVERSED));
        f.render_widget(footer, chunks[3]);
    }

    /// One line per record, one line per decoded signal, ascending id
    fn body_lines(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for record in self.table.snapshot() {
            lines.push(Line::from(record.row()));
            for signal in &record.signals {
                lines.push(Line::from(state::signal_row(signal)));
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_command_mapping() {
        assert_eq!(command_for(&key(KeyCode::Char('q'))), Some(ScrollCommand::Quit));
        assert_eq!(command_for(&key(KeyCode::Esc)), Some(ScrollCommand::Quit));
        assert_eq!(
            command_for(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(ScrollCommand::Quit)
        );
        assert_eq!(command_for(&key(KeyCode::Down)), Some(ScrollCommand::LineDown));
        assert_eq!(command_for(&key(KeyCode::Up)), Some(ScrollCommand::LineUp));
        assert_eq!(command_for(&key(KeyCode::Right)), Some(ScrollCommand::PageForward));
        assert_eq!(command_for(&key(KeyCode::PageDown)), Some(ScrollCommand::PageForward));
        assert_eq!(command_for(&key(KeyCode::Char(' '))), Some(ScrollCommand::PageForward));
        assert_eq!(command_for(&key(KeyCode::Left)), Some(ScrollCommand::PageBack));
        assert_eq!(command_for(&key(KeyCode::PageUp)), Some(ScrollCommand::PageBack));
        assert_eq!(command_for(&key(KeyCode::Char('x'))), None);
        assert_eq!(command_for(&key(KeyCode::Enter)), None);
    }

    #[test]
    fn test_page_forward_saturates_at_bound() {
        let mut viewport = ViewportState::default();
        let (virtual_height, page) = (100, 10);

        // Far more pages than the content holds
        for _ in 0..50 {
            viewport.apply(ScrollCommand::PageForward, page);
            viewport.clamp(virtual_height, page);
        }
        assert_eq!(viewport.offset(), 90);

        // One more page forward stays pinned
        viewport.apply(ScrollCommand::PageForward, page);
        viewport.clamp(virtual_height, page);
        assert_eq!(viewport.offset(), 90);
    }

    #[test]
    fn test_scroll_up_saturates_at_zero() {
        let mut viewport = ViewportState::default();
        viewport.apply(ScrollCommand::LineUp, 10);
        viewport.clamp(100, 10);
        assert_eq!(viewport.offset(), 0);

        viewport.apply(ScrollCommand::PageBack, 10);
        viewport.clamp(100, 10);
        assert_eq!(viewport.offset(), 0);
    }

    #[test]
    fn test_line_scrolling() {
        let mut viewport = ViewportState::default();
        viewport.apply(ScrollCommand::LineDown, 10);
        viewport.apply(ScrollCommand::LineDown, 10);
        viewport.apply(ScrollCommand::LineUp, 10);
        viewport.clamp(100, 10);
        assert_eq!(viewport.offset(), 1);
    }

    #[test]
    fn test_clamp_when_viewport_exceeds_content() {
        let mut viewport = ViewportState::default();
        viewport.apply(ScrollCommand::PageForward, 50);
        // Viewport taller than the virtual content: the only valid offset is 0
        viewport.clamp(20, 50);
        assert_eq!(viewport.offset(), 0);
    }

    #[test]
    fn test_key_label() {
        assert_eq!(key_label(&key(KeyCode::Char('q'))), ('q', 113));
        assert_eq!(key_label(&key(KeyCode::Down)), ('0', 48));
    }
}
