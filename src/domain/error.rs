use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("proxy returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("remote error: {0}")]
    Remote(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl DashboardError {
    /// Short text shown in notifications and failed-panel placeholders.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => "proxy unreachable".to_owned(),
            Self::Status { status, message } if message.is_empty() => format!("HTTP {status}"),
            Self::Status { status, message } => format!("HTTP {status}: {message}"),
            Self::Remote(message) | Self::Validation(message) | Self::Unavailable(message) => {
                message.clone()
            }
            Self::Decode(_) => "unexpected response".to_owned(),
        }
    }
}
