use serde_json::Value;

/// Normalizes a payload delivered by one of the interception points.
///
/// Text is decoded as JSON, objects and arrays pass through unchanged and
/// everything else (including undecodable text) yields `None`.
pub fn parse_payload(raw: Option<&Value>) -> Option<Value> {
    match raw? {
        Value::String(text) => parse_body(text),
        value @ (Value::Object(_) | Value::Array(_)) => Some(value.clone()),
        Value::Null | Value::Bool(_) | Value::Number(_) => None,
    }
}

/// Decodes a raw response body. Malformed input is "no data", not an error.
pub fn parse_body(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(e) => {
            tracing::trace!(error = %e, body_len = text.len(), "Payload is not JSON");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_and_null_yield_none() {
        assert!(parse_payload(None).is_none());
        assert!(parse_payload(Some(&Value::Null)).is_none());
    }

    #[test]
    fn text_is_decoded() {
        let raw = json!(r#"{"listing":{"listing":{"ads":[]}}}"#);
        let parsed = parse_payload(Some(&raw)).unwrap();
        assert!(parsed.pointer("/listing/listing/ads").is_some());
    }

    #[test]
    fn malformed_text_yields_none() {
        assert!(parse_payload(Some(&json!("{not json"))).is_none());
        assert!(parse_payload(Some(&json!(""))).is_none());
        assert!(parse_payload(Some(&json!("null"))).is_none());
    }

    #[test]
    fn structured_values_pass_through() {
        let obj = json!({"data": [1, 2]});
        assert_eq!(parse_payload(Some(&obj)), Some(obj.clone()));
        let arr = json!([{"id": 1}]);
        assert_eq!(parse_payload(Some(&arr)), Some(arr.clone()));
    }

    #[test]
    fn scalars_yield_none() {
        assert!(parse_payload(Some(&json!(42))).is_none());
        assert!(parse_payload(Some(&json!(true))).is_none());
    }

    #[test]
    fn body_with_scalar_json_is_kept() {
        // A scalar body decodes; extraction simply finds nothing in it.
        assert_eq!(parse_body("5"), Some(json!(5)));
    }
}
