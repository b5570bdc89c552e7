use serde::Deserialize;
use serde_json::Value;

/// The error body the backend sends with non-2xx responses.
///
/// `detail` is usually a string, but validation failures carry a list of
/// objects; only the string form is surfaced to the operator.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub detail: Value,
}

impl ApiErrorResponse {
    /// Extracts a non-empty string `detail` from a raw response body.
    pub fn detail_from_body(body: &str) -> Option<String> {
        let parsed: ApiErrorResponse = serde_json::from_str(body).ok()?;
        match parsed.detail {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_string_details_are_extracted() {
        assert_eq!(
            ApiErrorResponse::detail_from_body(r#"{"detail":"Bot already running"}"#).as_deref(),
            Some("Bot already running")
        );
        assert_eq!(ApiErrorResponse::detail_from_body(r#"{"detail":[{"loc":["body"]}]}"#), None);
        assert_eq!(ApiErrorResponse::detail_from_body(r#"{"detail":"  "}"#), None);
        assert_eq!(ApiErrorResponse::detail_from_body("<html>502</html>"), None);
        assert_eq!(ApiErrorResponse::detail_from_body(r#"{"message":"x"}"#), None);
    }
}
