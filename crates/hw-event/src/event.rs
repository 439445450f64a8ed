// event.rs — Intercepted operation data model.
//
// An Event is one file-mutating operation the host is about to perform
// (pre) or has just performed (post). It is created once per pipeline run
// and shared read-only with every hook task of that run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MalformedEventError;

/// Whether the operation is about to happen or has already happened.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Before the host applies the operation. Blocks are meaningful here.
    Pre,
    /// After the host applied the operation.
    Post,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pre => "pre",
            Phase::Post => "post",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = MalformedEventError;

    /// Accepts the native names plus the `PreToolUse`/`PostToolUse` event
    /// names some hosts send.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre" | "PreToolUse" => Ok(Phase::Pre),
            "post" | "PostToolUse" => Ok(Phase::Post),
            other => Err(MalformedEventError::UnknownPhase {
                value: other.to_string(),
            }),
        }
    }
}

/// One intercepted operation.
///
/// There are no setters: the builder methods consume `self`, so once an
/// `Event` is handed to the pipeline it cannot change. Serialization uses
/// camelCase keys because that is the shape external hook processes read
/// on stdin.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    phase: Phase,
    tool_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_content: Option<String>,
}

impl Event {
    /// Create an event for `tool_name` in the given phase.
    ///
    /// Callers constructing events directly (tests, embedded hosts) are
    /// trusted; untrusted payloads go through [`crate::normalize`].
    pub fn new(phase: Phase, tool_name: impl Into<String>) -> Self {
        Self {
            phase,
            tool_name: tool_name.into(),
            file_path: None,
            content: None,
            previous_content: None,
        }
    }

    /// Set the target file path and return self (builder pattern).
    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Set the new content and return self.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Set the previous content and return self.
    ///
    /// Only meaningful for post-phase events; ignored for pre.
    pub fn with_previous_content(mut self, content: impl Into<String>) -> Self {
        if self.phase == Phase::Post {
            self.previous_content = Some(content.into());
        }
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn previous_content(&self) -> Option<&str> {
        self.previous_content.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_parses_native_and_host_names() {
        assert_eq!("pre".parse::<Phase>().unwrap(), Phase::Pre);
        assert_eq!("post".parse::<Phase>().unwrap(), Phase::Post);
        assert_eq!("PreToolUse".parse::<Phase>().unwrap(), Phase::Pre);
        assert_eq!("PostToolUse".parse::<Phase>().unwrap(), Phase::Post);
        assert!(matches!(
            "during".parse::<Phase>(),
            Err(MalformedEventError::UnknownPhase { .. })
        ));
    }

    #[test]
    fn previous_content_dropped_for_pre_phase() {
        let event = Event::new(Phase::Pre, "edit").with_previous_content("old");
        assert!(event.previous_content().is_none());

        let event = Event::new(Phase::Post, "edit").with_previous_content("old");
        assert_eq!(event.previous_content(), Some("old"));
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let event = Event::new(Phase::Post, "write")
            .with_file_path("/src/a.rs")
            .with_content("new")
            .with_previous_content("old");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["phase"], "post");
        assert_eq!(json["toolName"], "write");
        assert_eq!(json["filePath"], "/src/a.rs");
        assert_eq!(json["previousContent"], "old");
    }

    #[test]
    fn absent_fields_are_omitted() {
        let json = serde_json::to_string(&Event::new(Phase::Pre, "write")).unwrap();
        assert!(!json.contains("filePath"));
        assert!(!json.contains("content"));
    }
}
