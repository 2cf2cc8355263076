//! Mapping of engine error text onto [`JsErrorType`]

use crate::JsErrorType;
use once_cell::sync::Lazy;
use regex::Regex;

static ERROR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(?:Uncaught )?((?:[A-Za-z_$][\w$]*)?Error)(?::\s?(.*))?$")
        .expect("error pattern is a valid regex")
});

/// Parse JavaScript error text and convert to [`JsErrorType`]
pub fn parse_js_error(error_message: &str) -> JsErrorType {
    let trimmed = error_message.trim();

    let Some(captures) = ERROR_PATTERN.captures(trimmed) else {
        return JsErrorType::Thrown(trimmed.to_string());
    };

    let error_type = &captures[1];
    let message = captures
        .get(2)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    match error_type {
        "TypeError" => JsErrorType::TypeError(message),
        "RangeError" => JsErrorType::RangeError(message),
        "ReferenceError" => JsErrorType::ReferenceError(message),
        "SyntaxError" => JsErrorType::SyntaxError(message),
        "EvalError" => JsErrorType::EvalError(message),
        "URIError" => JsErrorType::UriError(message),
        "Error" => JsErrorType::Error(message),
        name => JsErrorType::Custom {
            name: name.to_string(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_errors() {
        assert_eq!(
            parse_js_error("TypeError: x is not a function"),
            JsErrorType::TypeError("x is not a function".to_string())
        );
        assert_eq!(
            parse_js_error("ReferenceError: nope is not defined"),
            JsErrorType::ReferenceError("nope is not defined".to_string())
        );
        assert_eq!(parse_js_error("Error: boom"), JsErrorType::Error("boom".to_string()));
        assert_eq!(parse_js_error("URIError: bad"), JsErrorType::UriError("bad".to_string()));
    }

    #[test]
    fn test_custom_error() {
        assert_eq!(
            parse_js_error("ValidationError: missing field"),
            JsErrorType::Custom {
                name: "ValidationError".to_string(),
                message: "missing field".to_string(),
            }
        );
    }

    #[test]
    fn test_error_without_message() {
        assert_eq!(parse_js_error("RangeError"), JsErrorType::RangeError(String::new()));
    }

    #[test]
    fn test_thrown_values() {
        assert_eq!(parse_js_error("42"), JsErrorType::Thrown("42".to_string()));
        assert_eq!(
            parse_js_error("something went wrong"),
            JsErrorType::Thrown("something went wrong".to_string())
        );
    }

    #[test]
    fn test_message_accessor() {
        assert_eq!(parse_js_error("TypeError: bad").message(), "bad");
        assert_eq!(parse_js_error("DataError: worse").message(), "worse");
    }
}
