//! Request body matchers.
//!
//! MockServer distinguishes body matchers with a `type` discriminator and a
//! sibling payload field (`json`, `regex`, `string`, `parameters`,
//! `base64Bytes`). Modeling them as a sum type makes invalid combinations
//! (two payload fields populated at once) unrepresentable.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Strictness of JSON body matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    /// Every field of the incoming body must match.
    Strict,
    /// Fields not present in the matcher are ignored on the incoming body.
    OnlyMatchingFields,
}

/// One `{name, values}` pair of a PARAMETERS body matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub values: Vec<String>,
}

impl Parameter {
    /// Build a parameter, rejecting entries without any non-empty value.
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Result<Self> {
        let name = name.into();
        let values: Vec<String> = values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if name.trim().is_empty() || values.is_empty() {
            return Err(Error::EmptyParameters { name });
        }
        Ok(Self { name, values })
    }

    /// Parse a `name=value[,value2]` line, the form parameter sets are
    /// entered in.
    pub fn parse(line: &str) -> Result<Self> {
        let (name, rest) = line.split_once('=').ok_or_else(|| Error::EmptyParameters {
            name: line.trim().to_string(),
        })?;
        Self::new(
            name.trim(),
            rest.split(',').map(str::to_string).collect(),
        )
    }
}

/// Polymorphic request body matcher.
///
/// Serializes to MockServer's wire shape, e.g.
/// `{"type": "JSON", "json": {...}, "matchType": "STRICT"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BodyMatcher {
    #[serde(rename = "JSON")]
    Json {
        json: serde_json::Value,
        #[serde(rename = "matchType", skip_serializing_if = "Option::is_none")]
        match_type: Option<MatchType>,
    },
    #[serde(rename = "REGEX")]
    Regex {
        regex: String,
        /// Set when the pattern was force-accepted without compiling.
        /// Never serialized; downstream consumers check [`Self::is_unverified`].
        #[serde(skip, default)]
        unverified: bool,
    },
    #[serde(rename = "STRING")]
    Text { string: String },
    #[serde(rename = "PARAMETERS")]
    Parameters { parameters: Vec<Parameter> },
    /// Base64-encoded raw bytes. Response side only, produced by the
    /// compression transform.
    #[serde(rename = "BINARY")]
    Binary {
        #[serde(rename = "base64Bytes")]
        base64_bytes: String,
        #[serde(rename = "contentType", skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
    },
}

impl BodyMatcher {
    /// Build a JSON matcher from raw text. Malformed JSON is rejected; the
    /// caller decides whether to degrade to [`BodyMatcher::exact_string`]
    /// instead, preserving the literal text.
    pub fn json(text: &str, match_type: Option<MatchType>) -> Result<Self> {
        let json = serde_json::from_str(text)
            .map_err(|e| Error::invalid_json("request body", text, e))?;
        Ok(BodyMatcher::Json { json, match_type })
    }

    /// Build a JSON matcher from an already-parsed value.
    pub fn json_value(json: serde_json::Value, match_type: Option<MatchType>) -> Self {
        BodyMatcher::Json { json, match_type }
    }

    /// Build a REGEX matcher, validating the pattern by compiling it.
    /// `context` names where the pattern is used ("request body",
    /// "path matching", ...) so the error reads well.
    pub fn regex(pattern: &str, context: &str) -> Result<Self> {
        regex::Regex::new(pattern).map_err(|source| Error::InvalidRegex {
            pattern: pattern.to_string(),
            context: context.to_string(),
            source,
        })?;
        Ok(BodyMatcher::Regex {
            regex: pattern.to_string(),
            unverified: false,
        })
    }

    /// Force-accept a pattern without compiling it. The result is tagged as
    /// unverified so serializers and reviewers can surface it.
    pub fn regex_unchecked(pattern: impl Into<String>) -> Self {
        BodyMatcher::Regex {
            regex: pattern.into(),
            unverified: true,
        }
    }

    /// Build an exact STRING matcher. This is also the explicit fallback
    /// for text that failed JSON parsing.
    pub fn exact_string(text: impl Into<String>) -> Self {
        BodyMatcher::Text { string: text.into() }
    }

    /// Build a PARAMETERS matcher. At least one parameter is required.
    pub fn parameters(parameters: Vec<Parameter>) -> Result<Self> {
        if parameters.is_empty() {
            return Err(Error::EmptyParameters {
                name: String::new(),
            });
        }
        Ok(BodyMatcher::Parameters { parameters })
    }

    /// Wrap raw bytes as a BINARY payload.
    pub fn binary(bytes: &[u8], content_type: Option<String>) -> Self {
        BodyMatcher::Binary {
            base64_bytes: BASE64.encode(bytes),
            content_type,
        }
    }

    /// Whether this matcher carries a regex that was never compiled.
    pub fn is_unverified(&self) -> bool {
        matches!(self, BodyMatcher::Regex { unverified: true, .. })
    }

    /// The wire discriminator for this variant.
    pub fn kind(&self) -> &'static str {
        match self {
            BodyMatcher::Json { .. } => "JSON",
            BodyMatcher::Regex { .. } => "REGEX",
            BodyMatcher::Text { .. } => "STRING",
            BodyMatcher::Parameters { .. } => "PARAMETERS",
            BodyMatcher::Binary { .. } => "BINARY",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_matcher_preserves_value_fidelity() {
        let matcher = BodyMatcher::json(r#"{"a":1,"b":[true,null]}"#, None).unwrap();
        match &matcher {
            BodyMatcher::Json { json: value, .. } => {
                assert_eq!(*value, json!({"a": 1, "b": [true, null]}));
            }
            other => panic!("unexpected variant: {other:?}"),
        }

        // Re-encoding reproduces an equivalent structured value.
        let wire = serde_json::to_value(&matcher).unwrap();
        assert_eq!(wire["type"], "JSON");
        assert_eq!(wire["json"], json!({"a": 1, "b": [true, null]}));
    }

    #[test]
    fn test_json_matcher_rejects_malformed_input() {
        let err = BodyMatcher::json("{not json", Some(MatchType::Strict)).unwrap_err();
        assert!(matches!(err, Error::InvalidJson { .. }));
        assert!(err.to_string().contains("{not json"));
    }

    #[test]
    fn test_json_matcher_rejects_long_multibyte_input() {
        // Malformed input longer than the display limit, with multi-byte
        // chars straddling the truncation point.
        let input = "€".repeat(40);
        let err = BodyMatcher::json(&input, None).unwrap_err();
        assert!(matches!(err, Error::InvalidJson { .. }));
        assert!(err.to_string().contains("€"));
    }

    #[test]
    fn test_match_type_on_the_wire() {
        let matcher =
            BodyMatcher::json(r#"{"id": 7}"#, Some(MatchType::OnlyMatchingFields)).unwrap();
        let wire = serde_json::to_value(&matcher).unwrap();
        assert_eq!(wire["matchType"], "ONLY_MATCHING_FIELDS");

        let matcher = BodyMatcher::json(r#"{"id": 7}"#, None).unwrap();
        let wire = serde_json::to_value(&matcher).unwrap();
        assert!(wire.get("matchType").is_none());
    }

    #[test]
    fn test_regex_matcher_validates_pattern() {
        let matcher = BodyMatcher::regex(r"^(foo|bar)-\d{3}$", "request body").unwrap();
        assert!(!matcher.is_unverified());

        let err = BodyMatcher::regex("[a-", "request body").unwrap_err();
        match &err {
            Error::InvalidRegex { pattern, context, .. } => {
                assert_eq!(pattern, "[a-");
                assert_eq!(context, "request body");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("[a-"));
    }

    #[test]
    fn test_regex_unchecked_is_tagged() {
        let matcher = BodyMatcher::regex_unchecked("[a-");
        assert!(matcher.is_unverified());

        // The tag stays local: the wire shape is a plain REGEX matcher.
        let wire = serde_json::to_value(&matcher).unwrap();
        assert_eq!(wire, json!({"type": "REGEX", "regex": "[a-"}));
    }

    #[test]
    fn test_parameter_rejects_empty_values() {
        let err = Parameter::new("role", vec!["  ".to_string(), String::new()]).unwrap_err();
        assert!(matches!(err, Error::EmptyParameters { name } if name == "role"));

        assert!(Parameter::new("", vec!["x".to_string()]).is_err());
    }

    #[test]
    fn test_parameter_parse_line() {
        let p = Parameter::parse("role=admin, user").unwrap();
        assert_eq!(p.name, "role");
        assert_eq!(p.values, vec!["admin".to_string(), "user".to_string()]);

        assert!(Parameter::parse("no-equals-sign").is_err());
    }

    #[test]
    fn test_parameters_matcher_requires_entries() {
        assert!(BodyMatcher::parameters(vec![]).is_err());

        let matcher =
            BodyMatcher::parameters(vec![Parameter::parse("user=alice").unwrap()]).unwrap();
        let wire = serde_json::to_value(&matcher).unwrap();
        assert_eq!(
            wire,
            json!({
                "type": "PARAMETERS",
                "parameters": [{"name": "user", "values": ["alice"]}]
            })
        );
    }

    #[test]
    fn test_binary_wire_shape() {
        let matcher = BodyMatcher::binary(b"hello", Some("text/plain".to_string()));
        let wire = serde_json::to_value(&matcher).unwrap();
        assert_eq!(
            wire,
            json!({
                "type": "BINARY",
                "base64Bytes": "aGVsbG8=",
                "contentType": "text/plain"
            })
        );
    }

    #[test]
    fn test_string_matcher_wire_shape() {
        let matcher = BodyMatcher::exact_string("raw text");
        let wire = serde_json::to_value(&matcher).unwrap();
        assert_eq!(wire, json!({"type": "STRING", "string": "raw text"}));
    }

    #[test]
    fn test_deserialize_by_discriminator() {
        let matcher: BodyMatcher =
            serde_json::from_str(r#"{"type": "REGEX", "regex": "^a+$"}"#).unwrap();
        assert!(matches!(matcher, BodyMatcher::Regex { ref regex, .. } if regex == "^a+$"));

        let matcher: BodyMatcher =
            serde_json::from_str(r#"{"type": "JSON", "json": {"k": 1}, "matchType": "STRICT"}"#)
                .unwrap();
        assert!(
            matches!(matcher, BodyMatcher::Json { match_type: Some(MatchType::Strict), .. })
        );
    }
}
