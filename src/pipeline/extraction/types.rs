use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ExtractionError;

// ═══════════════════════════════════════════════════════════
// Wire format
// ═══════════════════════════════════════════════════════════

/// Body of the OCR service's detect response.
#[derive(Debug, Deserialize)]
pub struct DetectResponse {
    pub success: bool,
    #[serde(default)]
    pub parsed: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    pub detected_type: Option<String>,
    #[serde(default)]
    pub decision_reason: Option<String>,
    #[serde(default)]
    pub warning: Option<String>,
}

/// Document classification reported alongside the fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Passport,
    DrivingLicense,
    Other(String),
}

impl DocumentKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "passport" => Self::Passport,
            "driving_license" | "driving_licence" => Self::DrivingLicense,
            _ => Self::Other(raw.to_string()),
        }
    }
}

/// Informational metadata. Never influences field mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentMeta {
    pub detected_type: Option<DocumentKind>,
    pub decision_reason: Option<String>,
    /// e.g. "Low detection confidence - results may be unreliable"
    pub warning: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// ExtractedFields
// ═══════════════════════════════════════════════════════════

/// Raw fields as returned by the service, keyed by the service's own names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedFields {
    fields: BTreeMap<String, String>,
    pub meta: DocumentMeta,
}

impl ExtractedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_meta(mut self, meta: DocumentMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Convert the service's `parsed` object. Strings are kept, numbers and
    /// booleans are stringified, `null` and nested values are treated as absent.
    pub fn from_json_map(map: serde_json::Map<String, Value>) -> Self {
        let fields = map
            .into_iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    Value::Null | Value::Array(_) | Value::Object(_) => return None,
                };
                Some((key, value))
            })
            .collect();
        Self {
            fields,
            meta: DocumentMeta::default(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExtractedFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            meta: DocumentMeta::default(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Response interpretation
// ═══════════════════════════════════════════════════════════

/// Interpret an HTTP status + body from the detect endpoint.
///
/// - non-2xx status → `Unavailable`
/// - body not `{success: bool, ...}` → `Unavailable`
/// - `success: false` → `RecognitionFailed`
/// - `success: true` without a `parsed` object → `Unavailable`
pub fn interpret_response(status: u16, body: &str) -> Result<ExtractedFields, ExtractionError> {
    if !(200..300).contains(&status) {
        return Err(ExtractionError::Unavailable(format!(
            "HTTP {status}: {}",
            truncate(body, 200)
        )));
    }

    let response: DetectResponse = serde_json::from_str(body)
        .map_err(|e| ExtractionError::Unavailable(format!("unexpected response body: {e}")))?;

    if !response.success {
        return Err(ExtractionError::RecognitionFailed);
    }

    let parsed = response.parsed.ok_or_else(|| {
        ExtractionError::Unavailable("response missing parsed fields".into())
    })?;

    let meta = DocumentMeta {
        detected_type: response.detected_type.as_deref().map(DocumentKind::parse),
        decision_reason: response.decision_reason,
        warning: response.warning,
    };
    Ok(ExtractedFields::from_json_map(parsed).with_meta(meta))
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_yields_fields_and_meta() {
        let body = r#"{
            "success": true,
            "detected_type": "passport",
            "decision_reason": "Passport wins with 3 votes vs 1",
            "warning": null,
            "parsed": {"givenNames": "Ana", "surname": "Lee", "dateOfBirth": "13/04/1990"}
        }"#;
        let fields = interpret_response(200, body).unwrap();
        assert_eq!(fields.get("givenNames"), Some("Ana"));
        assert_eq!(fields.get("surname"), Some("Lee"));
        assert_eq!(fields.len(), 3);
        assert_eq!(fields.meta.detected_type, Some(DocumentKind::Passport));
        assert!(fields.meta.warning.is_none());
    }

    #[test]
    fn success_false_is_recognition_failure() {
        assert_eq!(
            interpret_response(200, r#"{"success": false}"#).unwrap_err(),
            ExtractionError::RecognitionFailed
        );
    }

    #[test]
    fn server_error_is_unavailable() {
        let err = interpret_response(500, r#"{"detail": "Invalid image file"}"#).unwrap_err();
        assert!(matches!(err, ExtractionError::Unavailable(msg) if msg.contains("500")));
    }

    #[test]
    fn wrong_shape_is_unavailable() {
        for body in ["", "not json", "[]", r#"{"ok": true}"#, r#"{"success": "yes"}"#] {
            assert!(
                matches!(
                    interpret_response(200, body),
                    Err(ExtractionError::Unavailable(_))
                ),
                "body {body:?} should be Unavailable"
            );
        }
    }

    #[test]
    fn success_without_parsed_is_unavailable() {
        assert!(matches!(
            interpret_response(200, r#"{"success": true}"#),
            Err(ExtractionError::Unavailable(_))
        ));
    }

    #[test]
    fn non_string_values_are_coerced_or_dropped() {
        let body = r#"{"success": true, "parsed": {
            "passportNumber": 12345678,
            "sex": null,
            "address": "",
            "nested": {"a": 1}
        }}"#;
        let fields = interpret_response(200, body).unwrap();
        assert_eq!(fields.get("passportNumber"), Some("12345678"));
        assert_eq!(fields.get("address"), Some(""));
        assert_eq!(fields.get("sex"), None);
        assert_eq!(fields.get("nested"), None);
    }

    #[test]
    fn document_kind_parsing() {
        assert_eq!(DocumentKind::parse("driving_license"), DocumentKind::DrivingLicense);
        assert_eq!(DocumentKind::parse("Passport"), DocumentKind::Passport);
        assert_eq!(
            DocumentKind::parse("id_card"),
            DocumentKind::Other("id_card".into())
        );
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let err = interpret_response(502, &body).unwrap_err();
        let ExtractionError::Unavailable(msg) = err else {
            panic!("expected Unavailable");
        };
        assert!(msg.chars().count() < 220);
    }
}
