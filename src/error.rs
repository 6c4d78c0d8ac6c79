//! Structured error types for the sheet engine.
//!
//! Layout itself is best-effort and never fails on odd input. The variants
//! here cover the real error sources: request parsing, the measurement
//! surface, and logo loading on the caller side.

use thiserror::Error;

/// The unified error type returned by all public API functions.
#[derive(Debug, Error)]
pub enum SheetError {
    /// JSON input failed to parse as a valid sheet request.
    #[error("Failed to parse sheet request: {source}{}", format_hint(.hint))]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },
    /// The measurement surface could not serve a font. Every computed
    /// layout depends on it, so this is never recovered from.
    #[error("Font error: {0}")]
    Font(String),
    /// A logo could not be read or decoded.
    #[error("Image error: {0}")]
    Image(String),
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for SheetError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the sheet request schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        SheetError::Parse { source: e, hint }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_carries_hint() {
        let err: SheetError = serde_json::from_str::<serde_json::Value>("{ \"a\": 1, }")
            .unwrap_err()
            .into();
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to parse sheet request"));
        assert!(msg.contains("trailing commas"));
    }

    #[test]
    fn test_font_error_display() {
        let err = SheetError::Font("unsupported font family 'Comic'".to_string());
        assert_eq!(err.to_string(), "Font error: unsupported font family 'Comic'");
    }
}
