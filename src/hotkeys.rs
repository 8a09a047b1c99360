use crate::runtime::AppEvent;
use crate::state::Settings;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HotkeyAction {
    Translate,
    Repair,
}

impl HotkeyAction {
    pub fn event(self) -> AppEvent {
        match self {
            HotkeyAction::Translate => AppEvent::TranslateHotkey,
            HotkeyAction::Repair => AppEvent::RepairHotkey,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub error: Option<String>,
    pub formatted: Option<String>,
}

impl ValidationResult {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(message.into()),
            formatted: None,
        }
    }
}

#[derive(Debug)]
pub enum HotkeyError {
    Invalid { action: HotkeyAction, message: String },
    Conflict(String),
    Manager(String),
    Register { action: HotkeyAction, message: String },
}

impl fmt::Display for HotkeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HotkeyError::Invalid { action, message } => {
                write!(f, "Invalid {:?} hotkey: {}", action, message)
            }
            HotkeyError::Conflict(hotkey) => {
                write!(f, "Translate and repair share the hotkey '{}'", hotkey)
            }
            HotkeyError::Manager(message) => {
                write!(f, "Global hotkeys unavailable: {}", message)
            }
            HotkeyError::Register { action, message } => {
                write!(f, "Failed to register {:?} hotkey: {}", action, message)
            }
        }
    }
}

impl std::error::Error for HotkeyError {}

const VALID_MODIFIERS: [&str; 11] = [
    "CommandOrControl", "CmdOrCtrl", "Command", "Cmd", "Control", "Ctrl",
    "Alt", "Option", "Shift", "Super", "Meta",
];

/// Validates a hotkey string format
pub fn validate_hotkey_format(key: &str) -> ValidationResult {
    let key = key.trim();
    if key.is_empty() {
        return ValidationResult::invalid("Hotkey cannot be empty");
    }

    let parts: Vec<&str> = key.split('+').map(|s| s.trim()).collect();
    let Some((key_part, modifier_parts)) = parts.split_last() else {
        return ValidationResult::invalid("Hotkey cannot be empty");
    };
    if modifier_parts.is_empty() {
        return ValidationResult::invalid(
            "Hotkey must include at least one modifier (e.g., Ctrl, Shift, Alt)",
        );
    }

    for modifier in modifier_parts {
        if !VALID_MODIFIERS.iter().any(|m| m.eq_ignore_ascii_case(modifier)) {
            return ValidationResult::invalid(format!(
                "Invalid modifier: '{}'. Valid modifiers: Ctrl, Shift, Alt, Command, etc.",
                modifier
            ));
        }
    }

    if key_part.is_empty() {
        return ValidationResult::invalid("Missing key after modifiers");
    }

    ValidationResult {
        valid: true,
        error: None,
        formatted: Some(format_hotkey(key)),
    }
}

/// Formats a hotkey string to a consistent format
fn format_hotkey(key: &str) -> String {
    key.split('+')
        .map(|part| part.trim())
        .map(|part| match part.to_lowercase().as_str() {
            "ctrl" | "control" => "Ctrl".to_string(),
            "cmdorctrl" | "commandorcontrol" => "CommandOrControl".to_string(),
            "cmd" | "command" => "Command".to_string(),
            "alt" | "option" => "Alt".to_string(),
            "shift" => "Shift".to_string(),
            "meta" | "super" => "Super".to_string(),
            _ => {
                let mut chars = part.chars();
                match chars.next() {
                    None => String::new(),
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join("+")
}

/// Normalizes a hotkey for comparison (lowercase, consistent separator)
fn normalize_hotkey(key: &str) -> String {
    format_hotkey(key).to_lowercase().replace(' ', "")
}

/// Checks both bindings and returns them formatted, keyed by action.
pub fn resolve_bindings(settings: &Settings) -> Result<Vec<(HotkeyAction, String)>, HotkeyError> {
    let mut bindings = Vec::new();
    for (action, raw) in [
        (HotkeyAction::Translate, &settings.hotkey_translate),
        (HotkeyAction::Repair, &settings.hotkey_repair),
    ] {
        let validation = validate_hotkey_format(raw);
        match validation.formatted {
            Some(formatted) if validation.valid => bindings.push((action, formatted)),
            _ => {
                return Err(HotkeyError::Invalid {
                    action,
                    message: validation.error.unwrap_or_else(|| "Invalid hotkey".to_string()),
                })
            }
        }
    }

    if let Some(conflict) = detect_conflicts(&bindings) {
        return Err(HotkeyError::Conflict(conflict));
    }
    Ok(bindings)
}

/// Returns the first hotkey bound to more than one action.
pub fn detect_conflicts(bindings: &[(HotkeyAction, String)]) -> Option<String> {
    let mut seen = std::collections::HashSet::new();
    bindings
        .iter()
        .find(|(_, hotkey)| !seen.insert(normalize_hotkey(hotkey)))
        .map(|(_, hotkey)| hotkey.clone())
}

/// Keeps the OS registrations alive; dropping it unregisters the hotkeys.
#[cfg(not(any(target_os = "android", target_os = "ios")))]
pub struct HotkeyRegistration {
    _manager: global_hotkey::GlobalHotKeyManager,
}

/// Registers both bindings and forwards presses to the event loop from a
/// bridge thread. Must be called on the main thread on macOS.
#[cfg(not(any(target_os = "android", target_os = "ios")))]
pub fn register_hotkeys(
    settings: &Settings,
    events: std::sync::mpsc::Sender<AppEvent>,
) -> Result<HotkeyRegistration, HotkeyError> {
    use global_hotkey::hotkey::HotKey;
    use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
    use std::collections::HashMap;
    use tracing::{debug, info};

    let bindings = resolve_bindings(settings)?;
    let manager = GlobalHotKeyManager::new().map_err(|e| HotkeyError::Manager(e.to_string()))?;

    let mut actions: HashMap<u32, HotkeyAction> = HashMap::new();
    for (action, formatted) in bindings {
        let hotkey: HotKey = formatted.parse().map_err(|e: global_hotkey::hotkey::HotKeyParseError| {
            HotkeyError::Invalid {
                action,
                message: e.to_string(),
            }
        })?;
        manager.register(hotkey).map_err(|e| HotkeyError::Register {
            action,
            message: e.to_string(),
        })?;
        info!("Registered {:?} hotkey: {}", action, formatted);
        actions.insert(hotkey.id(), action);
    }

    std::thread::Builder::new()
        .name("hotkey-bridge".to_string())
        .spawn(move || {
            let receiver = GlobalHotKeyEvent::receiver();
            while let Ok(event) = receiver.recv() {
                if event.state != HotKeyState::Pressed {
                    continue;
                }
                let Some(action) = actions.get(&event.id).copied() else {
                    continue;
                };
                debug!("{:?} hotkey pressed", action);
                if events.send(action.event()).is_err() {
                    break;
                }
            }
        })
        .map_err(|e| HotkeyError::Manager(e.to_string()))?;

    Ok(HotkeyRegistration { _manager: manager })
}
