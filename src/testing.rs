//! In-memory stand-ins for the host collaborators, shared by unit tests.

use crate::alignment::PinyinProvider;
use crate::clipboard::ClipboardSource;
use crate::errors::{AppError, ErrorEvent};
use crate::popup::{PopupContent, PopupHost, TranslationView};
use crate::session::Orchestrator;
use crate::state::SessionId;
use crate::translator::{TranslateError, TranslationClient, TranslationProvider, TranslationRequest};
use crate::vault::{Credential, CredentialVault, MachineIdentity};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub(crate) struct FakeClipboard {
    pub(crate) text: Arc<Mutex<String>>,
    pub(crate) written: Arc<Mutex<Vec<String>>>,
    pub(crate) locked: Arc<Mutex<bool>>,
}

impl FakeClipboard {
    pub(crate) fn set(&self, text: &str) {
        *self.text.lock().unwrap() = text.to_string();
    }
}

impl ClipboardSource for FakeClipboard {
    fn read_text(&mut self) -> Result<String, String> {
        if *self.locked.lock().unwrap() {
            return Err("clipboard is locked by another application".to_string());
        }
        Ok(self.text.lock().unwrap().clone())
    }

    fn write_text(&mut self, text: &str) -> Result<(), String> {
        if *self.locked.lock().unwrap() {
            return Err("clipboard is locked by another application".to_string());
        }
        self.written.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Shown {
    Popup(PopupContent),
    Closed(Option<SessionId>),
    Error(AppError),
}

#[derive(Clone, Default)]
pub(crate) struct RecordingPopup {
    pub(crate) log: Arc<Mutex<Vec<Shown>>>,
}

impl RecordingPopup {
    /// Last popup change, skipping reported errors.
    pub(crate) fn last(&self) -> Option<Shown> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|entry| !matches!(entry, Shown::Error(_)))
            .cloned()
    }

    pub(crate) fn errors(&self) -> Vec<AppError> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|entry| match entry {
                Shown::Error(error) => Some(error.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn last_view(&self) -> TranslationView {
        match self.last() {
            Some(Shown::Popup(PopupContent::Translation(view))) => view,
            other => panic!("expected translation popup, got {:?}", other),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

impl PopupHost for RecordingPopup {
    fn show(&mut self, content: &PopupContent) {
        self.log.lock().unwrap().push(Shown::Popup(content.clone()));
    }

    fn close(&mut self, session: Option<SessionId>) {
        self.log.lock().unwrap().push(Shown::Closed(session));
    }

    fn report(&mut self, event: &ErrorEvent) {
        self.log.lock().unwrap().push(Shown::Error(event.error.clone()));
    }
}

/// Answers from a table; anything missing is an upstream failure.
#[derive(Default)]
pub(crate) struct TableProvider {
    pub(crate) answers: HashMap<String, String>,
}

impl TranslationProvider for TableProvider {
    fn id(&self) -> &'static str {
        "table"
    }

    fn translate(
        &self,
        request: &TranslationRequest,
        _credential: &Credential,
    ) -> Result<String, TranslateError> {
        self.answers
            .get(&request.text)
            .cloned()
            .ok_or_else(|| TranslateError::Upstream("HTTP 500".to_string()))
    }
}

pub(crate) struct Harness {
    pub(crate) orchestrator: Orchestrator,
    pub(crate) clipboard: FakeClipboard,
    pub(crate) popup: RecordingPopup,
    pub(crate) config_path: std::path::PathBuf,
    pub(crate) _dir: tempfile::TempDir,
}

pub(crate) fn identity() -> MachineIdentity {
    MachineIdentity::new("test-host", "tester")
}

pub(crate) fn harness(answers: &[(&str, &str)], credential: Option<&str>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    let provider = TableProvider {
        answers: answers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    };
    let client = TranslationClient::new(
        Arc::new(provider),
        credential.and_then(Credential::new),
    );
    let clipboard = FakeClipboard::default();
    let popup = RecordingPopup::default();
    let orchestrator = Orchestrator::new(
        CredentialVault::with_identity(config_path.clone(), identity()),
        client,
        Arc::new(PinyinProvider),
        Box::new(popup.clone()),
        Box::new(clipboard.clone()),
    );
    Harness {
        orchestrator,
        clipboard,
        popup,
        config_path,
        _dir: dir,
    }
}

pub(crate) fn inline(view: &TranslationView) -> String {
    view.chinese_segments
        .iter()
        .map(|seg| {
            if seg.annotation.is_empty() {
                seg.ch.to_string()
            } else {
                format!("{}({})", seg.ch, seg.annotation)
            }
        })
        .collect()
}
