use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::slot::SlotIndex;

/// Keys that address slots, in slot order
pub const SLOT_KEYS: [char; 10] = ['1', '2', '3', '4', '5', '6', '7', '8', '9', '0'];

/// What a key press asks the frontend to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Hit(SlotIndex),
    Start,
    TogglePause,
    Stop,
    Dismiss,
    CycleDifficulty,
    Quit,
}

/// Label shown on a slot, if it has a key
pub fn slot_key(slot: SlotIndex) -> Option<char> {
    SLOT_KEYS.get(slot).copied()
}

pub fn command_for(key: KeyEvent, grid_size: usize) -> Option<Command> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Command::Quit);
    }

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => Some(Command::Quit),
        KeyCode::Char('s') => Some(Command::Start),
        KeyCode::Char('p') | KeyCode::Char(' ') => Some(Command::TogglePause),
        KeyCode::Char('x') => Some(Command::Stop),
        KeyCode::Char('d') => Some(Command::CycleDifficulty),
        KeyCode::Enter => Some(Command::Dismiss),
        KeyCode::Char(c) => SLOT_KEYS
            .iter()
            .position(|k| *k == c)
            .filter(|slot| *slot < grid_size)
            .map(Command::Hit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn digits_map_to_slots() {
        assert_eq!(command_for(key(KeyCode::Char('1')), 9), Some(Command::Hit(0)));
        assert_eq!(command_for(key(KeyCode::Char('9')), 9), Some(Command::Hit(8)));
        assert_eq!(command_for(key(KeyCode::Char('0')), 10), Some(Command::Hit(9)));
    }

    #[test]
    fn digits_beyond_grid_are_ignored() {
        assert_eq!(command_for(key(KeyCode::Char('5')), 4), None);
        assert_eq!(command_for(key(KeyCode::Char('0')), 9), None);
    }

    #[test]
    fn control_keys() {
        assert_eq!(command_for(key(KeyCode::Char('s')), 9), Some(Command::Start));
        assert_eq!(command_for(key(KeyCode::Char('p')), 9), Some(Command::TogglePause));
        assert_eq!(command_for(key(KeyCode::Char('x')), 9), Some(Command::Stop));
        assert_eq!(command_for(key(KeyCode::Enter), 9), Some(Command::Dismiss));
        assert_eq!(command_for(key(KeyCode::Esc), 9), Some(Command::Quit));
        assert_eq!(
            command_for(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), 9),
            Some(Command::Quit)
        );
    }

    #[test]
    fn every_slot_of_the_largest_grid_has_a_key() {
        assert_eq!(SLOT_KEYS.len(), crate::config::MAX_GRID);
    }

    #[test]
    fn slot_labels() {
        assert_eq!(slot_key(0), Some('1'));
        assert_eq!(slot_key(9), Some('0'));
        assert_eq!(slot_key(10), None);
    }
}
