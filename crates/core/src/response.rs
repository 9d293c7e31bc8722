//! Outbound pages.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Status;

/// The single response of a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UssdResponse {
    /// Whether the session continues.
    pub status: Status,
    /// Text shown to the subscriber.
    pub body: String,
}

impl UssdResponse {
    /// Response with an explicit status.
    pub fn new(status: Status, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A page that keeps the session open.
    pub fn con(body: impl Into<String>) -> Self {
        Self::new(Status::Continue, body)
    }

    /// A page that ends the session.
    pub fn end(body: impl Into<String>) -> Self {
        Self::new(Status::End, body)
    }

    /// Whether this page ends the session.
    pub fn is_end(&self) -> bool {
        self.status == Status::End
    }

    /// Status and body, for transports that write them separately.
    pub fn into_parts(self) -> (Status, String) {
        (self.status, self.body)
    }
}

/// Wire form: `CON <body>` or `END <body>`.
impl fmt::Display for UssdResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format() {
        assert_eq!(UssdResponse::con("Menu").to_string(), "CON Menu");
        let end = UssdResponse::end("Bye");
        assert!(end.is_end());
        assert_eq!(end.to_string(), "END Bye");
        assert_eq!(end.into_parts(), (Status::End, "Bye".to_string()));
    }
}
