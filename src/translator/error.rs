use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    NoCredential,
    Upstream(String),
    Timeout,
}

impl TranslateError {
    /// Failures that count towards credential repair.
    pub fn is_upstream(&self) -> bool {
        matches!(self, TranslateError::Upstream(_) | TranslateError::Timeout)
    }
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslateError::NoCredential => write!(f, "No API key configured"),
            TranslateError::Upstream(message) => {
                write!(f, "Translation provider failed: {}", message)
            }
            TranslateError::Timeout => write!(f, "Translation provider timed out"),
        }
    }
}

impl std::error::Error for TranslateError {}
