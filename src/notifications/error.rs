//! Error types for the notification system

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// The connection never registered or has already disconnected
    UnknownConnection(String),
}

impl fmt::Display for NotificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationError::UnknownConnection(id) => {
                write!(f, "Unknown connection: {id}")
            }
        }
    }
}

impl std::error::Error for NotificationError {}

impl crate::core::error_handling::ContextualError for NotificationError {
    fn is_user_actionable(&self) -> bool {
        false // Transport-level, the client reconnects
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}

impl NotificationError {
    pub fn code(&self) -> &'static str {
        match self {
            NotificationError::UnknownConnection(_) => "unknown_connection",
        }
    }
}
