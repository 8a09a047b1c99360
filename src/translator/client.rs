use super::error::TranslateError;
use super::provider::{TranslationProvider, TranslationRequest};
use crate::vault::Credential;
use std::sync::Arc;

/// Stateless per call; clones share the provider and snapshot the credential.
#[derive(Clone)]
pub struct TranslationClient {
    provider: Arc<dyn TranslationProvider>,
    credential: Option<Credential>,
}

impl TranslationClient {
    pub fn new(provider: Arc<dyn TranslationProvider>, credential: Option<Credential>) -> Self {
        Self {
            provider,
            credential,
        }
    }

    pub fn set_credential(&mut self, credential: Credential) {
        self.credential = Some(credential);
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub fn translate(&self, text: &str, target_is_chinese: bool) -> Result<String, TranslateError> {
        let credential = self.credential.as_ref().ok_or(TranslateError::NoCredential)?;
        let request = TranslationRequest {
            text: text.to_string(),
            target_is_chinese,
        };
        self.provider.translate(&request, credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(TranslationRequest, String)>>,
    }

    impl TranslationProvider for Recording {
        fn id(&self) -> &'static str {
            "recording"
        }

        fn translate(
            &self,
            request: &TranslationRequest,
            credential: &Credential,
        ) -> Result<String, TranslateError> {
            self.calls
                .lock()
                .unwrap()
                .push((request.clone(), credential.expose().to_string()));
            Ok(format!("<{}>", request.text))
        }
    }

    #[test]
    fn refuses_without_credential() {
        let provider = Arc::new(Recording::default());
        let client = TranslationClient::new(provider.clone(), None);
        assert_eq!(client.translate("hi", true), Err(TranslateError::NoCredential));
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn sends_exactly_one_request_with_direction() {
        let provider = Arc::new(Recording::default());
        let client = TranslationClient::new(provider.clone(), Credential::new("gsk_a"));
        assert_eq!(client.translate("Xin chào", true).unwrap(), "<Xin chào>");

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.target_is_chinese);
        assert_eq!(calls[0].1, "gsk_a");
    }

    #[test]
    fn set_credential_replaces_key_for_later_calls() {
        let provider = Arc::new(Recording::default());
        let mut client = TranslationClient::new(provider.clone(), None);
        assert!(!client.has_credential());
        client.set_credential(Credential::new("gsk_new").unwrap());
        client.translate("你好", false).unwrap();
        assert_eq!(provider.calls.lock().unwrap()[0].1, "gsk_new");
    }
}
