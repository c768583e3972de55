use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackLevel {
    Success,
    Error,
}

/// Outcome of a user-triggered mutation, meant for a toast or status line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feedback {
    pub level: FeedbackLevel,
    pub message: String,
}

impl Feedback {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FeedbackLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FeedbackLevel::Error,
            message: message.into(),
        }
    }
}

/// Presentation layers implement this to surface mutation outcomes.
pub trait FeedbackSink: Send + Sync {
    fn notify(&self, feedback: Feedback);
}
