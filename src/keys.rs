//! Single-keystroke selectors for the picker
//!
//! Sessions are addressed by position. `c` (custom name) and `k` (kill mode)
//! are reserved and never map to a session.

/// Opens the custom session name prompt
pub const CUSTOM_KEY: char = 'c';
/// Enters kill mode
pub const KILL_KEY: char = 'k';
/// Returned for positions with no key
pub const NO_KEY: char = '?';

const DIGITS_FIRST: &[u8] = b"123456789abdefghijlmnopqrstuvwxy";
const LETTERS_FIRST: &[u8] = b"abdefghijlmnopqrstuvwxy123456789";

/// Order in which keys are handed out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyMode {
    #[default]
    Numbers,
    Letters,
}

impl KeyMode {
    /// `letters` selects letters first; anything else means numbers first
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("letters") {
            KeyMode::Letters
        } else {
            KeyMode::Numbers
        }
    }

    fn table(self) -> &'static [u8] {
        match self {
            KeyMode::Numbers => DIGITS_FIRST,
            KeyMode::Letters => LETTERS_FIRST,
        }
    }
}

/// Maps list positions to keys and back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyMap {
    mode: KeyMode,
}

impl KeyMap {
    pub fn new(mode: KeyMode) -> Self {
        Self { mode }
    }

    /// Build from a mode name such as `numbers` or `letters`
    pub fn load(name: &str) -> Self {
        Self::new(KeyMode::from_name(name))
    }

    pub fn mode(&self) -> KeyMode {
        self.mode
    }

    /// Maximum number of sessions one picker screen can address
    pub fn capacity(&self) -> usize {
        self.mode.table().len()
    }

    pub fn key_for_index(&self, index: usize) -> char {
        self.mode
            .table()
            .get(index)
            .map_or(NO_KEY, |&b| char::from(b))
    }

    pub fn index_for_key(&self, key: char) -> Option<usize> {
        if !key.is_ascii() {
            return None;
        }
        self.mode.table().iter().position(|&b| char::from(b) == key)
    }
}
