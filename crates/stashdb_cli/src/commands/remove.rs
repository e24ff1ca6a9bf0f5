//! Remove command implementation.

use stashdb_core::Storage;

/// Runs the remove command.
pub async fn run(storage: &Storage, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !storage.remove(key).await {
        return Err(format!("failed to remove {key:?}").into());
    }
    println!("Removed {key}");
    Ok(())
}
