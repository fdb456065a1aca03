use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};
use std::path::{Path, PathBuf};

use crate::actions::Action;
use crate::backend::Session;
use crate::keys::{KeyMap, CUSTOM_KEY, KILL_KEY};
use crate::switcher::SwitchTarget;

/// Starts a new session in a zoxide-picked directory
pub const ZOXIDE_KEY: char = 'z';

/// Theme colors
pub struct Theme {
    pub fg: Color,
    pub accent: Color,
    pub dim: Color,
    pub success: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: Color::Rgb(220, 220, 220),
            accent: Color::Rgb(217, 119, 87),
            dim: Color::Rgb(100, 100, 100),
            success: Color::Rgb(80, 200, 120),
            error: Color::Rgb(220, 53, 69),
        }
    }
}

/// Input mode for the picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Naming,
    Killing,
}

/// Picker state
pub struct App {
    /// Sessions that have a key, in discovery order
    pub sessions: Vec<Session>,
    /// Sessions past the end of the key table; not selectable but still taken names
    pub hidden: Vec<Session>,
    pub keys: KeyMap,
    /// Directory new sessions start in
    pub cwd: PathBuf,
    /// Current message to display (info or error)
    pub message: Option<String>,
    pub theme: Theme,
    pub input_mode: InputMode,
    /// Text input buffer for custom names
    pub input_buffer: String,
    /// Pending action queue
    pub pending_actions: Vec<Action>,
}

impl App {
    pub fn new(keys: KeyMap, cwd: PathBuf) -> Self {
        Self {
            sessions: Vec::new(),
            hidden: Vec::new(),
            keys,
            cwd,
            message: None,
            theme: Theme::default(),
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            pending_actions: Vec::new(),
        }
    }

    /// Take pending actions (drains the queue)
    pub fn take_pending_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.pending_actions)
    }

    /// Handle an action and return whether to quit
    pub fn handle_action(&mut self, action: Action) -> Result<bool> {
        match action {
            Action::KeyPress(key) => self.handle_key(key),
            Action::SessionsUpdated(mut sessions) => {
                let capacity = self.keys.capacity();
                self.hidden = sessions.split_off(capacity.min(sessions.len()));
                self.sessions = sessions;
                Ok(false)
            }
            Action::Error(msg) => {
                self.message = Some(msg);
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    /// Session bound to `key`, if any
    pub fn session_for_key(&self, key: char) -> Option<&Session> {
        self.keys
            .index_for_key(key)
            .and_then(|i| self.sessions.get(i))
    }

    /// Name for a new session in `dir`: its basename, suffixed if already taken
    pub fn new_session_name(&self, dir: &Path) -> String {
        let base: String = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
            .chars()
            .map(|c| if is_name_char(c) { c } else { '-' })
            .collect();
        let base = if base.trim_matches('-').is_empty() {
            "main".to_string()
        } else {
            base
        };

        let taken = |name: &str| {
            self.sessions
                .iter()
                .chain(&self.hidden)
                .any(|s| s.name == name)
        };
        let mut name = base.clone();
        let mut n = 2;
        while taken(&name) {
            name = format!("{}-{}", base, n);
            n += 1;
        }
        name
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(true);
        }

        // Clear message on any key press
        if self.message.is_some() && self.input_mode == InputMode::Normal {
            self.message = None;
        }

        match self.input_mode {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::Naming => self.handle_naming_key(key),
            InputMode::Killing => self.handle_killing_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Esc => return Ok(true),
            KeyCode::Enter => {
                let name = self.new_session_name(&self.cwd);
                self.pending_actions
                    .push(Action::Select(SwitchTarget::new_session(name, &self.cwd)));
            }
            KeyCode::Char(CUSTOM_KEY) => {
                self.input_mode = InputMode::Naming;
                self.input_buffer.clear();
            }
            KeyCode::Char(KILL_KEY) => {
                if !self.sessions.is_empty() {
                    self.input_mode = InputMode::Killing;
                }
            }
            KeyCode::Char(ZOXIDE_KEY) => self.pending_actions.push(Action::PickDirectory),
            KeyCode::Char(c) => {
                if let Some(name) = self.session_for_key(c).map(|s| s.name.clone()) {
                    self.pending_actions
                        .push(Action::Select(SwitchTarget::attach(name)));
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_naming_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Enter => {
                if !self.input_buffer.is_empty() {
                    let name = std::mem::take(&mut self.input_buffer);
                    self.pending_actions
                        .push(Action::Select(SwitchTarget::new_session(name, &self.cwd)));
                }
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Esc => {
                self.input_buffer.clear();
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Char(c) => {
                if is_name_char(c) {
                    self.input_buffer.push(c);
                }
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_killing_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            KeyCode::Char(c) => {
                if let Some(name) = self.session_for_key(c).map(|s| s.name.clone()) {
                    self.pending_actions.push(Action::KillSession(name));
                    self.input_mode = InputMode::Normal;
                }
            }
            _ => {}
        }
        Ok(false)
    }

    pub fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Session list
                Constraint::Length(3), // Footer/status
            ])
            .split(frame.area());

        self.render_header(frame, chunks[0]);
        self.render_session_list(frame, chunks[1]);
        self.render_footer(frame, chunks[2]);

        if self.input_mode == InputMode::Naming {
            self.render_name_dialog(frame);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let mut count = format!("│ {} sessions", self.sessions.len());
        if !self.hidden.is_empty() {
            count.push_str(&format!(" (+{} hidden)", self.hidden.len()));
        }
        let title = Paragraph::new(Line::from(vec![
            Span::styled(
                " zpick ",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(count, Style::default().fg(self.theme.dim)),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.dim)),
        );
        frame.render_widget(title, area);
    }

    fn render_session_list(&self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = if self.sessions.is_empty() {
            vec![ListItem::new(Line::from(Span::styled(
                "  No sessions running. Press Enter to start one here.",
                Style::default().fg(self.theme.dim),
            )))]
        } else {
            let key_color = if self.input_mode == InputMode::Killing {
                self.theme.error
            } else {
                self.theme.accent
            };
            let width = self.sessions.iter().map(|s| s.name.len()).max().unwrap_or(0);

            self.sessions
                .iter()
                .enumerate()
                .map(|(i, session)| {
                    let (icon, color) = if session.active() {
                        ("● ", self.theme.success)
                    } else {
                        ("○ ", self.theme.dim)
                    };
                    ListItem::new(Line::from(vec![
                        Span::styled(
                            format!(" {} ", self.keys.key_for_index(i)),
                            Style::default().fg(key_color).add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(icon, Style::default().fg(color)),
                        Span::styled(
                            format!("{:<width$}  ", session.name, width = width),
                            Style::default().fg(self.theme.fg),
                        ),
                        Span::styled(&session.started_in, Style::default().fg(self.theme.dim)),
                    ]))
                })
                .collect()
        };

        let list = List::new(items).block(
            Block::default()
                .title(" Sessions ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.dim)),
        );
        frame.render_widget(list, area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let content = if let Some(ref msg) = self.message {
            Line::from(Span::styled(
                format!(" {} ", msg),
                Style::default().fg(self.theme.error),
            ))
        } else if self.input_mode == InputMode::Killing {
            Line::from(Span::styled(
                " Kill which session? Press its key, Esc to cancel ",
                Style::default().fg(self.theme.error),
            ))
        } else {
            Line::from(Span::styled(
                format!(
                    " key: Attach │ Enter: New here │ {}: Custom name │ {}: Kill │ {}: zoxide │ Esc: Quit ",
                    CUSTOM_KEY, KILL_KEY, ZOXIDE_KEY
                ),
                Style::default().fg(self.theme.dim),
            ))
        };

        let footer = Paragraph::new(content).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.dim)),
        );
        frame.render_widget(footer, area);
    }

    fn render_name_dialog(&self, frame: &mut Frame) {
        let area = centered_rect(50, 20, frame.area());

        frame.render_widget(Clear, area);

        let block = Block::default()
            .title(" New Session ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.accent));

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Session name:",
                Style::default().fg(self.theme.fg),
            )),
            Line::from(Span::styled(
                format!("▶ {}_", self.input_buffer),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press Enter to create, Esc to cancel",
                Style::default().fg(self.theme.dim),
            )),
        ];

        frame.render_widget(Paragraph::new(text), inner);
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Helper function to create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
