/// Behavior of `check_limit` when the counter store cannot be reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageFailurePolicy {
    /// Admit the request and log a warning.
    #[default]
    FailOpen,
    /// Deny the request and log a warning.
    FailClosed,
}

impl StorageFailurePolicy {
    /// Decision returned while storage is unavailable.
    #[must_use]
    pub fn admits(&self) -> bool {
        matches!(self, Self::FailOpen)
    }
}
