use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Application-level bindings, listed in the order they are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalAction {
    Quit,
    Help,
    Refresh,
    Namespace,
    Back,
    Enter,
    ResourceType,
    Scale,
    Restart,
}

pub struct KeyBinding {
    pub action: GlobalAction,
    pub keys: &'static [&'static str],
    pub help: &'static str,
}

pub const GLOBAL_BINDINGS: [KeyBinding; 9] = [
    KeyBinding {
        action: GlobalAction::Quit,
        keys: &["q", "ctrl+c"],
        help: "quit",
    },
    KeyBinding {
        action: GlobalAction::Help,
        keys: &["?"],
        help: "toggle help",
    },
    KeyBinding {
        action: GlobalAction::Refresh,
        keys: &["r"],
        help: "refresh",
    },
    KeyBinding {
        action: GlobalAction::Namespace,
        keys: &["n"],
        help: "pick namespace",
    },
    KeyBinding {
        action: GlobalAction::Back,
        keys: &["esc"],
        help: "back",
    },
    KeyBinding {
        action: GlobalAction::Enter,
        keys: &["enter"],
        help: "open selection",
    },
    KeyBinding {
        action: GlobalAction::ResourceType,
        keys: &["t"],
        help: "pick resource type",
    },
    KeyBinding {
        action: GlobalAction::Scale,
        keys: &["s"],
        help: "scale workload",
    },
    KeyBinding {
        action: GlobalAction::Restart,
        keys: &["R"],
        help: "restart workload",
    },
];

pub fn map_global_key(key: KeyEvent) -> Option<GlobalAction> {
    let signature = key_signature(key)?;
    GLOBAL_BINDINGS
        .iter()
        .find(|binding| binding.keys.contains(&signature.as_str()))
        .map(|binding| binding.action)
}

pub fn is_ctrl_c(key: KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Printable input for text editors: plain or shifted characters only.
pub fn text_input_char(key: KeyEvent) -> Option<char> {
    match key.code {
        KeyCode::Char(c) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            Some(c)
        }
        _ => None,
    }
}

/// Canonical key name. Characters keep their case, so shift is folded into
/// the character itself (`G`, `?`, `R`).
pub fn key_signature(key: KeyEvent) -> Option<String> {
    let key_name = match key.code {
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Tab => "tab".to_string(),
        KeyCode::BackTab => "backtab".to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Delete => "delete".to_string(),
        KeyCode::Esc => "esc".to_string(),
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Home => "home".to_string(),
        KeyCode::End => "end".to_string(),
        KeyCode::PageUp => "pageup".to_string(),
        KeyCode::PageDown => "pagedown".to_string(),
        KeyCode::F(n) => format!("f{n}"),
        _ => return None,
    };

    let mut parts = Vec::new();
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        parts.push("ctrl".to_string());
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        parts.push("alt".to_string());
    }
    if key.modifiers.contains(KeyModifiers::SHIFT) && !matches!(key.code, KeyCode::Char(_)) {
        parts.push("shift".to_string());
    }
    parts.push(key_name);
    Some(parts.join("+"))
}

#[cfg(test)]
mod tests {
    use super::{GlobalAction, is_ctrl_c, key_signature, map_global_key, text_input_char};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    #[test]
    fn maps_quit_from_q_and_ctrl_c() {
        let q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_global_key(q), Some(GlobalAction::Quit));
        assert_eq!(map_global_key(ctrl_c), Some(GlobalAction::Quit));
        assert!(is_ctrl_c(ctrl_c));
    }

    #[test]
    fn restart_requires_uppercase_r() {
        let lower = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE);
        let upper = KeyEvent::new(KeyCode::Char('R'), KeyModifiers::SHIFT);
        assert_eq!(map_global_key(lower), Some(GlobalAction::Refresh));
        assert_eq!(map_global_key(upper), Some(GlobalAction::Restart));
    }

    #[test]
    fn plain_c_is_not_global() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);
        assert_eq!(map_global_key(key), None);
    }

    #[test]
    fn maps_navigation_bindings() {
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        let t = KeyEvent::new(KeyCode::Char('t'), KeyModifiers::NONE);
        let n = KeyEvent::new(KeyCode::Char('n'), KeyModifiers::NONE);
        assert_eq!(map_global_key(esc), Some(GlobalAction::Back));
        assert_eq!(map_global_key(enter), Some(GlobalAction::Enter));
        assert_eq!(map_global_key(t), Some(GlobalAction::ResourceType));
        assert_eq!(map_global_key(n), Some(GlobalAction::Namespace));
    }

    #[test]
    fn signature_keeps_character_case() {
        let key = KeyEvent::new(KeyCode::Char('G'), KeyModifiers::SHIFT);
        assert_eq!(key_signature(key), Some("G".to_string()));
        let key = KeyEvent::new(KeyCode::Tab, KeyModifiers::SHIFT);
        assert_eq!(key_signature(key), Some("shift+tab".to_string()));
        let key = KeyEvent::new(KeyCode::Char('p'), KeyModifiers::CONTROL | KeyModifiers::ALT);
        assert_eq!(key_signature(key), Some("ctrl+alt+p".to_string()));
    }

    #[test]
    fn text_input_rejects_control_chords() {
        let plain = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        let shifted = KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT);
        let ctrl = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL);
        assert_eq!(text_input_char(plain), Some('a'));
        assert_eq!(text_input_char(shifted), Some('A'));
        assert_eq!(text_input_char(ctrl), None);
    }
}
