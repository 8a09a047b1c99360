use crate::alignment::PhoneticProvider;
use crate::constants::{
  CONNECT_TIMEOUT_MS_DEFAULT,
  CONNECT_TIMEOUT_MS_RANGE,
  DEFAULT_ENDPOINT,
  DEFAULT_HOTKEY_REPAIR,
  DEFAULT_HOTKEY_TRANSLATE,
  DEFAULT_MODEL,
  READ_TIMEOUT_MS_DEFAULT,
  READ_TIMEOUT_MS_RANGE,
};
use crate::guard::FailureGuard;
use crate::translator::TranslationClient;
use crate::vault::CredentialVault;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub hotkey_translate: String,
  pub hotkey_repair: String,
  pub model: String,
  pub endpoint: String,
  pub connect_timeout_ms: u64,
  pub read_timeout_ms: u64,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      hotkey_translate: DEFAULT_HOTKEY_TRANSLATE.to_string(),
      hotkey_repair: DEFAULT_HOTKEY_REPAIR.to_string(),
      model: DEFAULT_MODEL.to_string(),
      endpoint: DEFAULT_ENDPOINT.to_string(),
      connect_timeout_ms: CONNECT_TIMEOUT_MS_DEFAULT,
      read_timeout_ms: READ_TIMEOUT_MS_DEFAULT,
    }
  }
}

impl Settings {
  pub fn normalize(&mut self) {
    if self.hotkey_translate.trim().is_empty() {
      self.hotkey_translate = DEFAULT_HOTKEY_TRANSLATE.to_string();
    }
    if self.hotkey_repair.trim().is_empty() {
      self.hotkey_repair = DEFAULT_HOTKEY_REPAIR.to_string();
    }
    if self.model.trim().is_empty() {
      self.model = DEFAULT_MODEL.to_string();
    }
    if self.endpoint.trim().is_empty() {
      self.endpoint = DEFAULT_ENDPOINT.to_string();
    }
    self.connect_timeout_ms = self
      .connect_timeout_ms
      .clamp(CONNECT_TIMEOUT_MS_RANGE.0, CONNECT_TIMEOUT_MS_RANGE.1);
    self.read_timeout_ms = self
      .read_timeout_ms
      .clamp(READ_TIMEOUT_MS_RANGE.0, READ_TIMEOUT_MS_RANGE.1);
  }
}

pub fn load_settings(path: &Path) -> Settings {
  let mut settings = match fs::read_to_string(path) {
    Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
      warn!("Invalid settings file {}: {}. Using defaults.", path.display(), e);
      Settings::default()
    }),
    Err(_) => Settings::default(),
  };
  settings.normalize();
  settings
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), String> {
  let raw = serde_json::to_string_pretty(settings)
    .map_err(|e| format!("Failed to serialize settings: {}", e))?;
  fs::write(path, raw).map_err(|e| format!("Failed to write settings: {}", e))
}

/// Identifier of one hotkey-triggered translation cycle. Travels with every
/// translation popup so the renderer's close acks can be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
  Idle,
  Loading,
  Displaying,
  Failed,
  CredentialRepair,
  /// Key saved; the confirmation notice is showing.
  Confirmed,
}

#[derive(Debug, Clone)]
pub(crate) struct ActiveSession {
  pub(crate) id: SessionId,
  pub(crate) source_text: String,
  pub(crate) source_is_chinese: bool,
  pub(crate) translated_text: String,
  pub(crate) loading: bool,
}

impl ActiveSession {
  /// The Chinese side of the popup, whichever of source/translation it is.
  pub(crate) fn chinese_text(&self) -> &str {
    if self.source_is_chinese {
      &self.source_text
    } else {
      &self.translated_text
    }
  }
}

/// Everything the orchestrator mutates, in one place.
pub(crate) struct AppState {
  pub(crate) vault: CredentialVault,
  pub(crate) client: TranslationClient,
  pub(crate) phonetics: Arc<dyn PhoneticProvider>,
  pub(crate) guard: FailureGuard,
  pub(crate) active: Option<ActiveSession>,
  pub(crate) phase: SessionPhase,
  pub(crate) next_session: u64,
}

impl AppState {
  pub(crate) fn new(
    vault: CredentialVault,
    client: TranslationClient,
    phonetics: Arc<dyn PhoneticProvider>,
  ) -> Self {
    Self {
      vault,
      client,
      phonetics,
      guard: FailureGuard::default(),
      active: None,
      phase: SessionPhase::Idle,
      next_session: 0,
    }
  }

  pub(crate) fn allocate_session_id(&mut self) -> SessionId {
    self.next_session += 1;
    SessionId(self.next_session)
  }

  pub(crate) fn is_active(&self, id: SessionId) -> bool {
    self.active.as_ref().map(|s| s.id) == Some(id)
  }
}
