// intake.rs — Event intake and normalization.
//
// Turns an untyped host payload into a validated Event. Two payload shapes
// are accepted:
//
//   native:  { "phase": "pre", "toolName": "write", "filePath": "...",
//              "content": "...", "previousContent": "..." }
//   host:    { "hook_event_name": "PreToolUse", "tool_name": "Write",
//              "tool_input": { "file_path": "...", "content": "..." } }
//
// Top-level keys win over `tool_input` keys. `null` counts as absent.

use serde_json::{Map, Value};

use crate::error::MalformedEventError;
use crate::event::{Event, Phase};

/// Validate a parsed payload and produce an [`Event`].
pub fn normalize(raw: &Value) -> Result<Event, MalformedEventError> {
    let obj = raw.as_object().ok_or(MalformedEventError::NotAnObject)?;
    let tool_input = obj.get("tool_input").and_then(Value::as_object);

    let phase_raw = first_string(obj, &["phase", "hook_event_name"], "phase")?
        .ok_or(MalformedEventError::MissingField { field: "phase" })?;
    let phase: Phase = phase_raw.parse()?;

    let tool_name = first_string(obj, &["toolName", "tool_name"], "toolName")?
        .ok_or(MalformedEventError::MissingField { field: "toolName" })?;
    if tool_name.trim().is_empty() {
        return Err(MalformedEventError::EmptyToolName);
    }

    let file_path = match first_string(obj, &["filePath", "file_path"], "filePath")? {
        Some(path) => Some(path),
        None => match tool_input {
            Some(input) => first_string(input, &["file_path"], "filePath")?,
            None => None,
        },
    };

    let content = match first_string(obj, &["content"], "content")? {
        Some(content) => Some(content),
        None => match tool_input {
            Some(input) => first_string(input, &["content", "new_string"], "content")?,
            None => None,
        },
    };

    let previous_content = first_string(
        obj,
        &["previousContent", "previous_content"],
        "previousContent",
    )?;

    let mut event = Event::new(phase, tool_name);
    if let Some(path) = file_path {
        event = event.with_file_path(path);
    }
    if let Some(content) = content {
        event = event.with_content(content);
    }
    if let Some(previous) = previous_content {
        if phase == Phase::Pre {
            tracing::debug!("dropping previousContent on a pre-phase event");
        } else {
            event = event.with_previous_content(previous);
        }
    }

    Ok(event)
}

impl Event {
    /// Parse and normalize a payload from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, MalformedEventError> {
        let raw: Value = serde_json::from_str(text)?;
        normalize(&raw)
    }

    /// Parse and normalize a payload from raw bytes, as read off a pipe.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, MalformedEventError> {
        Self::from_json_str(std::str::from_utf8(bytes)?)
    }

    /// Normalize an already-parsed payload.
    pub fn from_value(raw: &Value) -> Result<Self, MalformedEventError> {
        normalize(raw)
    }
}

/// Return the first non-null value among `keys`, which must be a string.
fn first_string(
    obj: &Map<String, Value>,
    keys: &[&str],
    field: &'static str,
) -> Result<Option<String>, MalformedEventError> {
    for key in keys {
        match obj.get(*key) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) => return Ok(Some(s.clone())),
            Some(_) => return Err(MalformedEventError::NotAString { field }),
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn native_payload_is_accepted() {
        let event = normalize(&json!({
            "phase": "post",
            "toolName": "edit",
            "filePath": "/src/lib.rs",
            "content": "fn a() {}",
            "previousContent": "fn b() {}"
        }))
        .unwrap();

        assert_eq!(event.phase(), Phase::Post);
        assert_eq!(event.tool_name(), "edit");
        assert_eq!(event.file_path(), Some("/src/lib.rs"));
        assert_eq!(event.content(), Some("fn a() {}"));
        assert_eq!(event.previous_content(), Some("fn b() {}"));
    }

    #[test]
    fn host_payload_with_tool_input_is_accepted() {
        let event = normalize(&json!({
            "hook_event_name": "PreToolUse",
            "tool_name": "Edit",
            "tool_input": { "file_path": "/x.js", "new_string": "let a = 1;" }
        }))
        .unwrap();

        assert_eq!(event.phase(), Phase::Pre);
        assert_eq!(event.tool_name(), "Edit");
        assert_eq!(event.file_path(), Some("/x.js"));
        assert_eq!(event.content(), Some("let a = 1;"));
    }

    #[test]
    fn file_path_is_optional_and_null_means_absent() {
        let event = normalize(&json!({
            "phase": "pre", "toolName": "write", "filePath": null
        }))
        .unwrap();
        assert!(event.file_path().is_none());
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        assert!(matches!(
            Event::from_json_slice(b"\xff\xfe{}"),
            Err(MalformedEventError::InvalidUtf8(_))
        ));
        let event = Event::from_json_slice(br#"{"phase":"pre","toolName":"write"}"#).unwrap();
        assert_eq!(event.tool_name(), "write");
    }

    #[test]
    fn rejects_non_object() {
        assert!(matches!(
            normalize(&json!(["pre", "write"])),
            Err(MalformedEventError::NotAnObject)
        ));
    }

    #[test]
    fn rejects_unknown_phase() {
        let err = normalize(&json!({ "phase": "later", "toolName": "write" })).unwrap_err();
        assert!(matches!(err, MalformedEventError::UnknownPhase { value } if value == "later"));
    }

    #[test]
    fn rejects_missing_phase_and_tool() {
        assert!(matches!(
            normalize(&json!({ "toolName": "write" })),
            Err(MalformedEventError::MissingField { field: "phase" })
        ));
        assert!(matches!(
            normalize(&json!({ "phase": "pre" })),
            Err(MalformedEventError::MissingField { field: "toolName" })
        ));
    }

    #[test]
    fn rejects_empty_tool_name() {
        assert!(matches!(
            normalize(&json!({ "phase": "pre", "toolName": "   " })),
            Err(MalformedEventError::EmptyToolName)
        ));
    }

    #[test]
    fn rejects_non_string_fields() {
        assert!(matches!(
            normalize(&json!({ "phase": "pre", "toolName": "write", "filePath": 42 })),
            Err(MalformedEventError::NotAString { field: "filePath" })
        ));
        assert!(matches!(
            normalize(&json!({ "phase": "pre", "toolName": 7 })),
            Err(MalformedEventError::NotAString { field: "toolName" })
        ));
        assert!(matches!(
            normalize(&json!({ "phase": "pre", "toolName": "write", "content": {"a": 1} })),
            Err(MalformedEventError::NotAString { field: "content" })
        ));
    }

    #[test]
    fn previous_content_on_pre_event_is_dropped() {
        let event = normalize(&json!({
            "phase": "pre", "toolName": "edit", "previousContent": "old"
        }))
        .unwrap();
        assert!(event.previous_content().is_none());
    }

    #[test]
    fn invalid_json_text_is_malformed() {
        assert!(matches!(
            Event::from_json_str("{not json"),
            Err(MalformedEventError::InvalidJson(_))
        ));
    }
}
