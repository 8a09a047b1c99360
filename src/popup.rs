use crate::alignment::AnnotatedChar;
use crate::errors::ErrorEvent;
use crate::state::SessionId;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationView {
    pub session_id: SessionId,
    pub source_text: String,
    pub translated_text: String,
    pub source_is_chinese: bool,
    /// The Chinese side, one entry per character, pinyin on ideographs.
    pub chinese_segments: Vec<AnnotatedChar>,
    pub vietnamese_text: String,
    pub loading: bool,
    pub error: Option<String>,
}

/// Structured payload for the single transient popup. Rendering is up to
/// the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PopupContent {
    Translation(TranslationView),
    CredentialForm { error: Option<String> },
    Notice { message: String },
}

pub trait PopupHost: Send {
    /// Shows `content`, replacing whatever the popup currently shows.
    fn show(&mut self, content: &PopupContent);
    /// `session` names the translation being closed, `None` for the key
    /// form and notices.
    fn close(&mut self, session: Option<SessionId>);
    /// Surfaces a failure that has no place in the popup itself.
    fn report(&mut self, event: &ErrorEvent);
}

#[derive(Serialize)]
#[serde(tag = "event", content = "payload")]
enum HostMessage<'a> {
    #[serde(rename = "popup:show")]
    Show(&'a PopupContent),
    #[serde(rename = "popup:close")]
    Close { session: Option<SessionId> },
    #[serde(rename = "app:error")]
    Error(&'a ErrorEvent),
}

/// Writes one JSON line per call to stdout for an external renderer.
pub struct StdioPopupHost<W: Write + Send = io::Stdout> {
    out: W,
}

impl StdioPopupHost<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write + Send> StdioPopupHost<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn send(&mut self, message: &HostMessage<'_>) {
        let line = match serde_json::to_string(message) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialize popup message: {}", e);
                return;
            }
        };
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            warn!("Failed to write popup message: {}", e);
        }
    }
}

impl<W: Write + Send> PopupHost for StdioPopupHost<W> {
    fn show(&mut self, content: &PopupContent) {
        self.send(&HostMessage::Show(content));
    }

    fn close(&mut self, session: Option<SessionId>) {
        self.send(&HostMessage::Close { session });
    }

    fn report(&mut self, event: &ErrorEvent) {
        self.send(&HostMessage::Error(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    fn lines(host: StdioPopupHost<Vec<u8>>) -> Vec<serde_json::Value> {
        String::from_utf8(host.into_inner())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn show_and_close_are_json_lines() {
        let mut host = StdioPopupHost::with_writer(Vec::new());
        host.show(&PopupContent::CredentialForm { error: None });
        host.show(&PopupContent::Notice {
            message: "ok".to_string(),
        });
        host.close(Some(SessionId(7)));
        host.close(None);

        let out = lines(host);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0]["event"], "popup:show");
        assert_eq!(out[0]["payload"]["kind"], "credential-form");
        assert_eq!(out[1]["payload"]["message"], "ok");
        assert_eq!(out[2]["event"], "popup:close");
        assert_eq!(out[2]["payload"]["session"], 7);
        assert!(out[3]["payload"]["session"].is_null());
    }

    #[test]
    fn translation_payload_shape() {
        let mut host = StdioPopupHost::with_writer(Vec::new());
        let content = PopupContent::Translation(TranslationView {
            session_id: SessionId(3),
            source_text: "你好".to_string(),
            translated_text: String::new(),
            source_is_chinese: true,
            chinese_segments: Vec::new(),
            vietnamese_text: String::new(),
            loading: true,
            error: None,
        });
        host.show(&content);

        let out = lines(host);
        assert_eq!(out[0]["payload"]["kind"], "translation");
        assert_eq!(out[0]["payload"]["source_text"], "你好");
        assert_eq!(out[0]["payload"]["loading"], true);
        assert_eq!(out[0]["payload"]["session_id"], 3);
    }

    #[test]
    fn error_events_use_app_error_channel() {
        let mut host = StdioPopupHost::with_writer(Vec::new());
        host.report(&ErrorEvent::new(AppError::Hotkey("taken".to_string())));
        let out = lines(host);
        assert_eq!(out[0]["event"], "app:error");
        assert_eq!(out[0]["payload"]["error"]["type"], "Hotkey");
    }
}
