//! Benchmark utilities.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Value};

/// Generate a random alphanumeric string of the specified length.
pub fn random_text(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate a player-record-like value whose JSON form is roughly `size` bytes.
pub fn record_value(size: usize) -> Value {
    let mut rng = rand::thread_rng();
    json!({
        "name": random_text(12),
        "level": rng.gen_range(1..100),
        "position": {"x": rng.gen_range(-1000..1000), "y": 64, "z": rng.gen_range(-1000..1000)},
        "notes": random_text(size.saturating_sub(80)),
    })
}

/// Generate `count` keyed records of roughly `size` bytes each.
pub fn generate_records(count: usize, size: usize) -> Vec<(String, Value)> {
    (0..count)
        .map(|i| (format!("player_{i}"), record_value(size)))
        .collect()
}
