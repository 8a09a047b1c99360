use crate::constants::FAILURE_THRESHOLD;

/// Counts consecutive translation failures.
///
/// Escalation is level-triggered: once the count reaches the threshold,
/// every further failure reports it again until a success or a credential
/// reset clears the count. Re-opening the repair form is harmless.
#[derive(Debug, Clone)]
pub struct FailureGuard {
    consecutive: u32,
    threshold: u32,
}

impl Default for FailureGuard {
    fn default() -> Self {
        Self::new(FAILURE_THRESHOLD)
    }
}

impl FailureGuard {
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive: 0,
            threshold: threshold.max(1),
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    /// Returns true when the caller should escalate to credential repair.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        self.consecutive >= self.threshold
    }

    pub fn reset(&mut self) {
        self.consecutive = 0;
    }

    pub fn count(&self) -> u32 {
        self.consecutive
    }
}
