//! Get command implementation.

use stashdb_core::Storage;

/// Runs the get command, printing the value as pretty JSON.
pub async fn run(storage: &Storage, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    match storage.get_nested_async(path).await? {
        Some(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        None => Err(format!("no value at {path:?}").into()),
    }
}
