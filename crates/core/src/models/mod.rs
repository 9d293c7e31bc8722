//! Shared domain models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status tag carried by every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// The session stays open and expects more input.
    #[serde(rename = "CON")]
    Continue,
    /// The session is finished.
    End,
}

impl Status {
    /// Wire tag for the status (`CON` or `END`).
    pub fn tag(&self) -> &'static str {
        match self {
            Status::Continue => "CON",
            Status::End => "END",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A selectable menu entry such as `98: More`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Code the subscriber types to pick the entry.
    pub value: String,
    /// Text shown next to the code.
    pub label: String,
}

impl Choice {
    /// Menu entry selected by `value`.
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Render with a custom template where `{value}` and `{label}` are substituted.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{value}", &self.value)
            .replace("{label}", &self.label)
    }

    /// Rendered length in characters.
    pub fn len(&self) -> usize {
        self.to_string().chars().count()
    }

    /// Whether the code is unset.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.label.is_empty()
    }

    /// Whether the given input selects this entry.
    pub fn matches(&self, input: &str) -> bool {
        self.value == input
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.value, self.label)
    }
}
