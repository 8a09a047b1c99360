//! Hotkey-triggered translation sessions.
//!
//! At most one session is live. Each session gets a fresh [`SessionId`];
//! a finished request is applied only if its id still names the active
//! session, so a closed popup or a newer hotkey press silently drops late
//! results. Close acks from the renderer carry the id too, and only close
//! the session they name. The blocking provider call happens in [`PendingRequest::execute`],
//! off the event loop.

use crate::alignment::{annotate, contains_ideograph, AlignmentResult, PhoneticProvider};
use crate::clipboard::ClipboardSource;
use crate::constants::{
    MSG_INVALID_KEY_FORMAT, MSG_KEY_SAVED, MSG_KEY_SAVE_FAILED, MSG_TRANSLATION_FAILED,
};
use crate::errors::{AppError, ErrorEvent};
use crate::popup::{PopupContent, PopupHost, TranslationView};
use crate::state::{ActiveSession, AppState, SessionId, SessionPhase};
use crate::translator::{TranslateError, TranslationClient};
use crate::util::normalize_clipboard_text;
use crate::vault::{Credential, CredentialError, CredentialVault};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutput {
    pub translated: String,
    /// Alignment of the Chinese side (source or translation).
    pub segments: AlignmentResult,
}

#[derive(Debug)]
pub struct Completion {
    pub id: SessionId,
    pub outcome: Result<TranslationOutput, TranslateError>,
}

/// Work item handed to a worker thread.
pub struct PendingRequest {
    pub id: SessionId,
    text: String,
    source_is_chinese: bool,
    client: TranslationClient,
    phonetics: Arc<dyn PhoneticProvider>,
}

impl PendingRequest {
    pub fn execute(self) -> Completion {
        let outcome = self
            .client
            .translate(&self.text, !self.source_is_chinese)
            .map(|translated| {
                let chinese = if self.source_is_chinese {
                    self.text.as_str()
                } else {
                    translated.as_str()
                };
                let segments = annotate(chinese, self.phonetics.as_ref());
                TranslationOutput {
                    translated,
                    segments,
                }
            });
        Completion {
            id: self.id,
            outcome,
        }
    }
}

pub struct Orchestrator {
    state: AppState,
    popup: Box<dyn PopupHost>,
    clipboard: Box<dyn ClipboardSource>,
}

impl Orchestrator {
    pub fn new(
        vault: CredentialVault,
        client: TranslationClient,
        phonetics: Arc<dyn PhoneticProvider>,
        popup: Box<dyn PopupHost>,
        clipboard: Box<dyn ClipboardSource>,
    ) -> Self {
        Self {
            state: AppState::new(vault, client, phonetics),
            popup,
            clipboard,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn failure_count(&self) -> u32 {
        self.state.guard.count()
    }

    pub fn has_credential(&self) -> bool {
        self.state.client.has_credential()
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.state.active.as_ref().map(|s| s.id)
    }

    /// Tears down whatever the popup shows and forgets the active session.
    fn dismiss(&mut self) {
        if self.state.phase != SessionPhase::Idle {
            let closing = self.active_session();
            self.popup.close(closing);
        }
        self.state.active = None;
        self.state.phase = SessionPhase::Idle;
    }

    fn render(&mut self, segments: AlignmentResult, error: Option<String>) {
        let Some(session) = self.state.active.as_ref() else {
            return;
        };
        let vietnamese_text = if session.source_is_chinese {
            session.translated_text.clone()
        } else {
            session.source_text.clone()
        };
        let view = TranslationView {
            session_id: session.id,
            source_text: session.source_text.clone(),
            translated_text: session.translated_text.clone(),
            source_is_chinese: session.source_is_chinese,
            chinese_segments: segments.segments().to_vec(),
            vietnamese_text,
            loading: session.loading,
            error,
        };
        self.popup.show(&PopupContent::Translation(view));
    }

    fn report(&mut self, error: AppError, context: &str) {
        error!("{}: {}", error.title(), error.message());
        self.popup.report(&ErrorEvent::new(error).with_context(context));
    }

    /// Starts a session from the clipboard. Returns the request to run, or
    /// `None` when the clipboard holds no text.
    pub fn on_translate_hotkey(&mut self) -> Option<PendingRequest> {
        let raw = match self.clipboard.read_text() {
            Ok(raw) => raw,
            Err(e) => {
                self.report(AppError::Clipboard(e), "Reading clipboard");
                return None;
            }
        };
        let text = normalize_clipboard_text(&raw)?;

        self.dismiss();
        let id = self.state.allocate_session_id();
        let source_is_chinese = contains_ideograph(&text);
        info!(
            "Session {} started ({} chars, {})",
            id.0,
            text.chars().count(),
            if source_is_chinese { "zh -> vi" } else { "vi -> zh" }
        );

        self.state.active = Some(ActiveSession {
            id,
            source_text: text.clone(),
            source_is_chinese,
            translated_text: String::new(),
            loading: true,
        });
        self.state.phase = SessionPhase::Loading;
        let chinese = if source_is_chinese { text.as_str() } else { "" };
        self.render(AlignmentResult::plain(chinese), None);

        Some(PendingRequest {
            id,
            text,
            source_is_chinese,
            client: self.state.client.clone(),
            phonetics: self.state.phonetics.clone(),
        })
    }

    pub fn complete(&mut self, completion: Completion) {
        if !self.state.is_active(completion.id) {
            debug!("Dropping stale result for session {}", completion.id.0);
            return;
        }

        match completion.outcome {
            Ok(output) => {
                self.state.guard.record_success();
                if let Some(session) = self.state.active.as_mut() {
                    session.translated_text = output.translated;
                    session.loading = false;
                }
                self.state.phase = SessionPhase::Displaying;
                self.render(output.segments, None);
            }
            Err(err) if !err.is_upstream() => {
                info!("{}, opening key form", err);
                self.open_repair();
            }
            Err(err) => {
                let escalate = self.state.guard.record_failure();
                warn!(
                    "Session {} failed ({} consecutive)",
                    completion.id.0,
                    self.state.guard.count()
                );
                self.report(err.into(), "Translating clipboard text");
                if escalate {
                    self.open_repair();
                    return;
                }
                let chinese = match self.state.active.as_mut() {
                    Some(session) => {
                        session.loading = false;
                        if session.source_is_chinese {
                            session.source_text.clone()
                        } else {
                            String::new()
                        }
                    }
                    None => String::new(),
                };
                self.state.phase = SessionPhase::Failed;
                self.render(
                    AlignmentResult::plain(&chinese),
                    Some(MSG_TRANSLATION_FAILED.to_string()),
                );
            }
        }
    }

    /// The renderer reports a closed popup. `session` is the id the closed
    /// translation popup carried, `None` for the key form or a notice. Acks
    /// that do not match what is on screen are stale and ignored.
    pub fn on_popup_closed(&mut self, session: Option<SessionId>) {
        if session != self.active_session() {
            debug!(
                "Ignoring close ack for {:?}, active is {:?}",
                session,
                self.active_session()
            );
            return;
        }
        if let Some(id) = session {
            debug!("Popup closed during session {}", id.0);
        }
        self.state.active = None;
        self.state.phase = SessionPhase::Idle;
    }

    pub fn open_repair(&mut self) {
        self.dismiss();
        self.state.phase = SessionPhase::CredentialRepair;
        self.popup.show(&PopupContent::CredentialForm { error: None });
    }

    pub fn submit_credential(&mut self, raw: &str) -> Result<(), CredentialError> {
        let credential = match Credential::parse_user_input(raw) {
            Ok(credential) => credential,
            Err(err) => {
                info!("Rejected API key input: {}", err);
                self.show_form_error(MSG_INVALID_KEY_FORMAT);
                return Err(err);
            }
        };

        if let Err(err) = self.state.vault.save(&credential) {
            self.report(err.clone().into(), "Saving API key");
            self.show_form_error(MSG_KEY_SAVE_FAILED);
            return Err(err);
        }

        self.state.client.set_credential(credential);
        self.state.guard.reset();
        self.dismiss();
        self.state.phase = SessionPhase::Confirmed;
        self.popup.show(&PopupContent::Notice {
            message: MSG_KEY_SAVED.to_string(),
        });
        Ok(())
    }

    fn show_form_error(&mut self, message: &str) {
        self.state.active = None;
        self.state.phase = SessionPhase::CredentialRepair;
        self.popup.show(&PopupContent::CredentialForm {
            error: Some(message.to_string()),
        });
    }

    /// Copies the Chinese side of the displayed translation back to the
    /// clipboard. Returns whether anything was copied.
    pub fn copy_chinese(&mut self) -> bool {
        let Some(session) = self.state.active.as_ref() else {
            return false;
        };
        if session.loading {
            return false;
        }
        let text = session.chinese_text().to_string();
        if !contains_ideograph(&text) {
            return false;
        }
        match self.clipboard.write_text(&text) {
            Ok(()) => true,
            Err(e) => {
                self.report(AppError::Clipboard(e), "Copying Chinese text");
                false
            }
        }
    }
}
