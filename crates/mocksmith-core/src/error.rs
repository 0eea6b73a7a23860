//! Error types for expectation construction and transformation.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while building or transforming expectations.
///
/// Every variant is recoverable: construction errors are fixed by retrying
/// with corrected input, and transform errors leave the expectation in its
/// previous state.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid JSON for {context}: {source} (content: {content})")]
    InvalidJson {
        context: String,
        /// Offending input, truncated for display.
        content: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid regex pattern '{pattern}' for {context}: {source}")]
    InvalidRegex {
        pattern: String,
        context: String,
        #[source]
        source: regex::Error,
    },

    #[error("parameter '{name}' has no non-empty values")]
    EmptyParameters { name: String },

    #[error("invalid match count {value}: must be a positive integer")]
    InvalidCount { value: i64 },

    #[error("invalid progressive policy (base={base}, step={step}, cap={cap}): {reason}")]
    InvalidPolicy {
        base: u64,
        step: u64,
        cap: u64,
        reason: &'static str,
    },

    #[error("unsupported compression algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("failed to encode {context}: {source}")]
    BodyEncode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("compression failed: {0}")]
    Compression(#[from] std::io::Error),

    #[error("validation error in {field}: {message}")]
    Validation { field: String, message: String },

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("failed to parse YAML configuration: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

impl Error {
    /// Build an [`Error::InvalidJson`] with the content truncated to a
    /// displayable length.
    pub(crate) fn invalid_json(
        context: impl Into<String>,
        content: &str,
        source: serde_json::Error,
    ) -> Self {
        let mut content = content.to_string();
        if content.len() > 100 {
            // Truncation point must land on a char boundary.
            let mut cut = 100;
            while !content.is_char_boundary(cut) {
                cut -= 1;
            }
            content.truncate(cut);
            content.push_str("...");
        }
        Error::InvalidJson {
            context: context.into(),
            content,
            source,
        }
    }

    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_json_truncates_content() {
        let long = "x".repeat(500);
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::invalid_json("request body", &long, source);
        match err {
            Error::InvalidJson { content, .. } => {
                assert_eq!(content.len(), 103); // 100 chars + "..."
                assert!(content.ends_with("..."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_json_truncates_on_char_boundary() {
        // 40 three-byte chars: byte 100 falls inside a char.
        let multibyte = "€".repeat(40);
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::invalid_json("request body", &multibyte, source);
        match err {
            Error::InvalidJson { content, .. } => {
                assert!(content.ends_with("..."));
                assert_eq!(content.trim_end_matches("..."), "€".repeat(33));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_messages_name_the_offender() {
        let source = regex::Regex::new("[a-").unwrap_err();
        let err = Error::InvalidRegex {
            pattern: "[a-".to_string(),
            context: "request body".to_string(),
            source,
        };
        let msg = err.to_string();
        assert!(msg.contains("[a-"));
        assert!(msg.contains("request body"));

        let err = Error::UnsupportedAlgorithm("brotli".to_string());
        assert!(err.to_string().contains("brotli"));
    }
}
