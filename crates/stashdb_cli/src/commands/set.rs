//! Set command implementation.

use serde_json::Value;
use stashdb_core::Storage;

/// Parses a command-line value: JSON when it parses, a plain string
/// otherwise.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Runs the set command.
pub async fn run(storage: &Storage, path: &str, raw: &str) -> Result<(), Box<dyn std::error::Error>> {
    storage.set_nested_async(path, parse_value(raw)).await?;

    let outcome = storage.save().await;
    match outcome.report() {
        Some(report) if report.is_clean() => {
            println!("Saved {path}");
            Ok(())
        }
        Some(report) => Err(format!("save incomplete: {report}").into()),
        None => Err("another save is in flight".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_or_string() {
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value(r#"{"a":[1]}"#), json!({"a": [1]}));
        assert_eq!(parse_value("steve"), json!("steve"));
    }
}
