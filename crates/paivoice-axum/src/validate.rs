//! Request field validation.
//!
//! Handlers receive the body as raw JSON so that type errors surface as
//! 400s with the daemon's own error shape, not the framework's. Text
//! fields are sanitised before the length rules apply: a field that
//! sanitises down to nothing is invalid, and one that stays over the
//! limit after sanitisation is too long.

use serde_json::Value;

use paivoice_core::{MAX_FIELD_LEN, ProsodyOverride, VoiceError, sanitize};

fn invalid(field: &'static str, reason: String) -> VoiceError {
    VoiceError::InvalidInput { field, reason }
}

/// Validate and sanitise a text field.
///
/// Missing and `null` take the default; non-strings are rejected.
pub fn text_field(
    body: &Value,
    field: &'static str,
    display: &str,
    default: &str,
) -> Result<String, VoiceError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(default.to_string()),
        Some(Value::String(raw)) => {
            let clean = sanitize(raw);
            if clean.is_empty() {
                return Err(invalid(field, format!("Invalid {display}")));
            }
            if clean.chars().count() > MAX_FIELD_LEN {
                return Err(invalid(field, format!("{display} too long")));
            }
            Ok(clean)
        }
        Some(_) => Err(invalid(field, format!("Invalid {display}"))),
    }
}

/// Optional string field; non-strings are rejected, blank strings are
/// treated as absent.
pub fn optional_string(body: &Value, field: &'static str) -> Result<Option<String>, VoiceError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.trim().to_string())),
        Some(Value::String(_)) => Ok(None),
        Some(_) => Err(invalid(field, format!("Invalid {field}"))),
    }
}

/// Optional boolean field.
pub fn optional_bool(body: &Value, field: &'static str) -> Result<Option<bool>, VoiceError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(invalid(field, format!("Invalid {field}"))),
    }
}

/// Optional number field.
pub fn optional_number(body: &Value, field: &'static str) -> Result<Option<f32>, VoiceError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64().map(|v| v as f32)),
        Some(_) => Err(invalid(field, format!("Invalid {field}"))),
    }
}

/// Optional `voice_settings` object.
pub fn voice_settings(body: &Value) -> Result<ProsodyOverride, VoiceError> {
    match body.get("voice_settings") {
        None | Some(Value::Null) => Ok(ProsodyOverride::default()),
        Some(value @ Value::Object(_)) => serde_json::from_value(value.clone())
            .map_err(|_| invalid("voice_settings", "Invalid voice_settings".to_string())),
        Some(_) => Err(invalid(
            "voice_settings",
            "Invalid voice_settings".to_string(),
        )),
    }
}
