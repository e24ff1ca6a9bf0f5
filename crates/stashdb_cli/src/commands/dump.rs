//! Dump command implementation.

use stashdb_core::Storage;

/// Runs the dump command.
pub async fn run(storage: &Storage, output: &str) -> Result<(), Box<dyn std::error::Error>> {
    let values = storage.load_all_data_strict().await?;

    match output {
        "yaml" => print!("{}", serde_yaml::to_string(&values)?),
        _ => println!("{}", serde_json::to_string_pretty(&values)?),
    }

    Ok(())
}
