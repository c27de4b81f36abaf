//! Keyboard bindings.

use nannou::prelude::*;

/// Actions that can be triggered by key presses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    ShowHelp,
    ToggleListening,
    Relight,
    RequestPermission,
    NextDevice,
}

pub fn parse_key(key: Key) -> Option<Action> {
    match key {
        Key::Q => Some(Action::Quit),
        Key::H => Some(Action::ShowHelp),
        Key::Space => Some(Action::ToggleListening),
        Key::R => Some(Action::Relight),
        Key::P => Some(Action::RequestPermission),
        Key::Tab => Some(Action::NextDevice),
        _ => None,
    }
}
