//! Inspect command implementation.

use crate::target::Target;
use serde::Serialize;
use stashdb_codec::encode_value;
use stashdb_core::Storage;
use stashdb_storage::StorageBackend;

/// Storage inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// File or database path.
    pub path: String,
    /// Storage kind.
    pub kind: String,
    /// Number of stored keys.
    pub key_count: usize,
    /// Total encoded size of every value in bytes.
    pub total_size: usize,
    /// Per-key statistics.
    pub keys: Vec<KeyStats>,
}

/// Statistics for a single key.
#[derive(Debug, Serialize)]
pub struct KeyStats {
    /// The key.
    pub key: String,
    /// Encoded value size in bytes.
    pub size: usize,
    /// Number of chunks the backend holds for the key.
    pub chunks: usize,
}

/// Runs the inspect command.
pub async fn run(
    storage: &Storage,
    target: &Target,
    output: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let values = storage.load_all_data_strict().await?;

    let mut keys = Vec::with_capacity(values.len());
    for (key, value) in &values {
        let size = encode_value(value, storage.codec())?.len();
        let chunks = storage.backend().read_chunks(key).await?.len();
        keys.push(KeyStats {
            key: key.clone(),
            size,
            chunks,
        });
    }

    let result = InspectResult {
        path: target.path().display().to_string(),
        kind: storage.kind().to_string(),
        key_count: keys.len(),
        total_size: keys.iter().map(|k| k.size).sum(),
        keys,
    };

    match output {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("stashdb Storage Inspection");
    println!("==========================");
    println!();
    println!("Path: {}", result.path);
    println!("Kind: {}", result.kind);
    println!();
    println!("Keys:       {}", result.key_count);
    println!("Total size: {}", format_size(result.total_size));

    if !result.keys.is_empty() {
        println!();
        for key in &result.keys {
            println!(
                "  {:<24} {:>10}  {} chunk(s)",
                key.key,
                format_size(key.size),
                key.chunks
            );
        }
    }
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(12), "12 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
