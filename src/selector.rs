//! # Selector resolver.
//!
//! Extracts a nested value from a resolved module value by walking a selector
//! chain (`module::foo::bar` → `["foo", "bar"]`).
//!
//! ## Rules
//! - An empty chain returns the value unchanged.
//! - Every step needs an object (key lookup) or an array (decimal index).
//! - A missing key or index yields `null`; selecting *into* that `null` fails.
//! - Failures name the module and the remaining, unreachable part of the chain.

use serde_json::Value;

use crate::error::ResolveError;

/// Separator between the module part of a specifier and each selector token.
pub const SELECTOR_SEPARATOR: &str = "::";

/// Applies `chain` to `value`, returning the selected (cloned) value.
///
/// # Example
/// ```
/// use modvisor::select;
/// use serde_json::json;
///
/// let value = json!({"foo": {"bar": 42}});
/// let chain = vec!["foo".to_string(), "bar".to_string()];
/// assert_eq!(select("m", &value, &chain).unwrap(), json!(42));
/// ```
pub fn select(module: &str, value: &Value, chain: &[String]) -> Result<Value, ResolveError> {
    let mut current = value;
    for (step, key) in chain.iter().enumerate() {
        current = match current {
            Value::Object(map) => map.get(key).unwrap_or(&Value::Null),
            Value::Array(items) => key
                .parse::<usize>()
                .ok()
                .and_then(|idx| items.get(idx))
                .unwrap_or(&Value::Null),
            _ => {
                return Err(ResolveError::Shape {
                    module: module.to_string(),
                    path: chain[step..].join(SELECTOR_SEPARATOR),
                });
            }
        };
    }
    Ok(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chain(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn empty_chain_is_identity() {
        let value = json!({"a": 1});
        assert_eq!(select("m", &value, &[]).unwrap(), value);

        let scalar = json!(0);
        assert_eq!(select("m", &scalar, &[]).unwrap(), scalar);
    }

    #[test]
    fn walks_nested_objects() {
        let value = json!({"foo": {"bar": 42}});
        assert_eq!(select("m", &value, &chain(&["foo", "bar"])).unwrap(), json!(42));
    }

    #[test]
    fn indexes_arrays() {
        let value = json!({"items": ["a", "b"]});
        assert_eq!(select("m", &value, &chain(&["items", "1"])).unwrap(), json!("b"));
        assert_eq!(select("m", &value, &chain(&["items", "7"])).unwrap(), Value::Null);
        assert_eq!(select("m", &value, &chain(&["items", "x"])).unwrap(), Value::Null);
    }

    #[test]
    fn null_intermediate_names_remaining_path() {
        let value = json!({"foo": null});
        let err = select("module3", &value, &chain(&["foo", "bar"])).unwrap_err();
        match err {
            ResolveError::Shape { module, path } => {
                assert_eq!(module, "module3");
                assert_eq!(path, "bar");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn scalar_root_fails_with_full_chain() {
        let err = select("m", &json!("text"), &chain(&["a", "b"])).unwrap_err();
        assert_eq!(err.to_string(), "module 'm' has no property 'a::b'");
    }

    #[test]
    fn missing_key_then_deeper_step_fails() {
        let value = json!({"foo": {}});
        assert_eq!(select("m", &value, &chain(&["foo", "nope"])).unwrap(), Value::Null);
        let err = select("m", &value, &chain(&["foo", "nope", "deeper"])).unwrap_err();
        assert!(matches!(err, ResolveError::Shape { ref path, .. } if path == "deeper"));
    }
}
