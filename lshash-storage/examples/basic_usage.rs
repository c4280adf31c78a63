//! Basic Hash Table Usage Example
//!
//! Opens a set of hash tables, files a few vectors into buckets and reads
//! them back.
//!
//! Run with:
//!   cargo run --example basic_usage
//!
//! Pick a backend with a JSON config (defaults to in-memory):
//!   LSHASH_STORAGE='{"redis": {"host": "127.0.0.1"}}' cargo run --example basic_usage
//!
//! Log levels follow `RUST_LOG`, e.g. `RUST_LOG=lshash_storage=debug`.

use lshash_storage::storage::{Entry, HashKey, HashTables, StorageConfig};
use serde_json::json;
use tracing_subscriber::EnvFilter;

const NUM_TABLES: u32 = 3;

/// Toy hash: one sign bit per table-rotated component.
fn hash(vector: &[f64], table_index: u32) -> String {
    let offset = table_index as usize;
    (0..vector.len())
        .map(|i| if vector[(i + offset) % vector.len()] >= 0.0 { '1' } else { '0' })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== LSHash Storage: Basic Usage ===\n");

    let config = match std::env::var("LSHASH_STORAGE") {
        Ok(raw) => StorageConfig::from_value(serde_json::from_str(&raw)?)?,
        Err(_) => StorageConfig::default(),
    };
    let tables = HashTables::open(&config, NUM_TABLES).await?;
    tables.clean_all().await?;
    println!("✓ Opened {} {} tables\n", tables.len(), config.kind());

    // === Index ===
    println!("--- Indexing vectors ---");
    let items = [
        (vec![1.0, 2.0, 3.0], json!("app1")),
        (vec![4.0, 5.0, 6.0], json!("app2")),
        (vec![-1.0, 0.5, -2.0], json!({"name": "app3", "tags": ["beta"]})),
    ];

    for (vector, extra_data) in &items {
        for table in tables.iter() {
            let key = HashKey::new(hash(vector, table.table_index()))?;
            table
                .append_val(&key, &Entry::new(vector.clone(), extra_data.clone()))
                .await?;
        }
        println!("  Indexed {vector:?}");
    }
    println!();

    // === Query ===
    println!("--- Querying [0.9, 1.1, 2.0] ---");
    let query = [0.9, 1.1, 2.0];
    for table in tables.iter() {
        let key = HashKey::new(hash(&query, table.table_index()))?;
        let bucket = table.get_list(&key).await?;
        println!("  Table {} bucket {key}: {} candidates", table.table_index(), bucket.len());
        for entry in &bucket {
            println!("    - {:?} {}", entry.vector, entry.extra_data);
        }
    }
    println!();

    // === Inspect ===
    for table in tables.iter() {
        println!("  Table {} keys: {:?}", table.table_index(), table.keys().await?);
    }

    tables.clean_all().await?;
    tables.close().await?;
    println!("\n✓ Cleaned and closed");

    Ok(())
}
