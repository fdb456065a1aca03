use crossterm::event::KeyEvent;

use crate::backend::Session;
use crate::switcher::SwitchTarget;

/// Actions that can be dispatched through the picker
#[derive(Debug, Clone)]
pub enum Action {
    /// A key was pressed
    KeyPress(KeyEvent),
    /// Sessions were (re)discovered
    SessionsUpdated(Vec<Session>),
    /// An error occurred
    Error(String),
    /// Hand this target to the parent shell and exit
    Select(SwitchTarget),
    /// Kill a session, then refresh
    KillSession(String),
    /// Choose a directory with zoxide and start a session there
    PickDirectory,
}
