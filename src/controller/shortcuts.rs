use egui::{Key, Modifiers};

use super::ToolMode;
use crate::store::ZOrderMove;

/// Editor commands bound to the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    SetTool(ToolMode),
    DeleteSelection,
    DuplicateSelection,
    ClearSelection,
    SelectAll,
    Undo,
    Redo,
    Reorder(ZOrderMove),
    Nudge { dx: i8, dy: i8, large: bool },
    Escape,
}

/// `command` is ctrl on Windows/Linux and cmd on macOS
pub fn action_for_key(key: Key, modifiers: Modifiers) -> Option<ShortcutAction> {
    use ShortcutAction as A;

    let nudge = |dx, dy| A::Nudge {
        dx,
        dy,
        large: modifiers.shift,
    };

    let action = match key {
        Key::Delete | Key::Backspace => A::DeleteSelection,
        Key::Escape => A::Escape,

        Key::J if modifiers.command => A::DuplicateSelection,
        Key::D if modifiers.command => A::ClearSelection,
        Key::A if modifiers.command => A::SelectAll,
        Key::Z if modifiers.command && modifiers.shift => A::Redo,
        Key::Z if modifiers.command => A::Undo,
        Key::Y if modifiers.command => A::Redo,
        Key::CloseBracket if modifiers.command && modifiers.shift => A::Reorder(ZOrderMove::ToFront),
        Key::CloseBracket if modifiers.command => A::Reorder(ZOrderMove::Forward),
        Key::OpenBracket if modifiers.command && modifiers.shift => A::Reorder(ZOrderMove::ToBack),
        Key::OpenBracket if modifiers.command => A::Reorder(ZOrderMove::Backward),

        Key::ArrowLeft if !modifiers.command => nudge(-1, 0),
        Key::ArrowRight if !modifiers.command => nudge(1, 0),
        Key::ArrowUp if !modifiers.command => nudge(0, -1),
        Key::ArrowDown if !modifiers.command => nudge(0, 1),

        Key::V if modifiers.is_none() => A::SetTool(ToolMode::Select),
        Key::H if modifiers.is_none() => A::SetTool(ToolMode::Hand),
        Key::R if modifiers.is_none() => A::SetTool(ToolMode::Rectangle),
        Key::O if modifiers.is_none() => A::SetTool(ToolMode::Ellipse),

        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_j_duplicates_and_plain_j_does_nothing() {
        assert_eq!(
            action_for_key(Key::J, Modifiers::COMMAND),
            Some(ShortcutAction::DuplicateSelection)
        );
        assert_eq!(action_for_key(Key::J, Modifiers::NONE), None);
    }

    #[test]
    fn shift_bracket_goes_all_the_way() {
        assert_eq!(
            action_for_key(Key::CloseBracket, Modifiers::COMMAND | Modifiers::SHIFT),
            Some(ShortcutAction::Reorder(ZOrderMove::ToFront))
        );
        assert_eq!(
            action_for_key(Key::OpenBracket, Modifiers::COMMAND),
            Some(ShortcutAction::Reorder(ZOrderMove::Backward))
        );
    }

    #[test]
    fn tool_keys_ignore_modified_presses() {
        assert_eq!(
            action_for_key(Key::H, Modifiers::NONE),
            Some(ShortcutAction::SetTool(ToolMode::Hand))
        );
        assert_eq!(action_for_key(Key::V, Modifiers::COMMAND), None);
    }
}
