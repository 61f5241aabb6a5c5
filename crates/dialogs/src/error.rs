use parley_channels::ChannelError;

/// Errors that abort a turn.
#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    /// A step ran without a field an earlier step of the same run must have
    /// set. The working profile was replaced or shared behind the dialog's
    /// back, so the turn stops here instead of filling in defaults.
    #[error("{field} property does not exist in user profile: {profile}")]
    MissingProfileField { field: &'static str, profile: String },

    #[error("step '{step}' expected a {expected} result, got {actual}")]
    UnexpectedResult {
        step: &'static str,
        expected: &'static str,
        actual: String,
    },

    #[error("no prompt registered as '{0}'")]
    UnknownPrompt(String),

    #[error("session storage failed: {0}")]
    Storage(#[from] anyhow::Error),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl DialogError {
    /// Structural invariant violations: the dialog found state it could not
    /// have produced itself, usually because another conversation wrote to
    /// the same profile.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::MissingProfileField { .. } | Self::UnexpectedResult { .. }
        )
    }
}
