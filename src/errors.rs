use crate::hotkeys::HotkeyError;
use crate::translator::TranslateError;
use crate::vault::CredentialError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Application-wide error categories reported to the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    /// Translation provider errors (network, auth rejection, bad response)
    Translation(String),

    /// Credential storage errors (config file unwritable, etc.)
    Credential(String),

    /// Hotkey registration/validation errors
    Hotkey(String),

    /// Settings storage errors
    Storage(String),

    /// Clipboard access errors
    Clipboard(String),

    /// Generic errors that don't fit other categories
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Translation(msg) => write!(f, "Translation Error: {}", msg),
            AppError::Credential(msg) => write!(f, "Credential Error: {}", msg),
            AppError::Hotkey(msg) => write!(f, "Hotkey Error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage Error: {}", msg),
            AppError::Clipboard(msg) => write!(f, "Clipboard Error: {}", msg),
            AppError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Returns a user-friendly title for the error
    pub fn title(&self) -> &str {
        match self {
            AppError::Translation(_) => "Translation Failed",
            AppError::Credential(_) => "API Key Problem",
            AppError::Hotkey(_) => "Hotkey Problem",
            AppError::Storage(_) => "Storage Error",
            AppError::Clipboard(_) => "Clipboard Error",
            AppError::Other(_) => "Error",
        }
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        match self {
            AppError::Translation(msg)
            | AppError::Credential(msg)
            | AppError::Hotkey(msg)
            | AppError::Storage(msg)
            | AppError::Clipboard(msg)
            | AppError::Other(msg) => msg,
        }
    }
}

impl From<TranslateError> for AppError {
    fn from(error: TranslateError) -> Self {
        match error {
            TranslateError::NoCredential => AppError::Credential(error.to_string()),
            other => AppError::Translation(other.to_string()),
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(error: CredentialError) -> Self {
        AppError::Credential(error.to_string())
    }
}

impl From<HotkeyError> for AppError {
    fn from(error: HotkeyError) -> Self {
        AppError::Hotkey(error.to_string())
    }
}

/// Error event payload sent to the renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub error: AppError,
    pub timestamp: u64,
    pub context: Option<String>,
}

impl ErrorEvent {
    pub fn new(error: AppError) -> Self {
        Self {
            error,
            timestamp: crate::util::now_ms(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}
