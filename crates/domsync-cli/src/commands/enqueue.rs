//! Enqueue command implementation.

use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::{Map, Value};

use domsync_core::{Payload, TableName};

use crate::config;
use crate::output;

#[derive(Args, Debug)]
pub struct EnqueueArgs {
    /// Target table (e.g., players)
    pub table: String,

    /// JSON file with the record (use - for stdin)
    #[arg(long)]
    pub json: Option<String>,

    /// Set a field (repeatable). Values are parsed as JSON, else taken as strings.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

pub async fn run(args: EnqueueArgs, queue_dir: &Path) -> Result<()> {
    let table = TableName::new(&args.table).context("Invalid table name")?;

    // Read base JSON if provided
    let base: Value = if let Some(ref path) = args.json {
        if path == "-" {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            serde_json::from_str(&buf).context("Invalid JSON from stdin")?
        } else {
            let content = std::fs::read_to_string(path).context("Failed to read JSON file")?;
            serde_json::from_str(&content).context("Invalid JSON in file")?
        }
    } else {
        Value::Object(Map::new())
    };

    let Value::Object(mut fields) = base else {
        bail!("Record must be a JSON object");
    };
    for assignment in &args.set {
        let (key, value) = parse_assignment(assignment)?;
        fields.insert(key, value);
    }

    if fields.is_empty() {
        bail!("Empty record. Pass --json or --set.");
    }

    let queue = config::open_queue(queue_dir).await?;
    let id = queue
        .enqueue(table.clone(), Payload::from_map(fields))
        .await
        .context("Failed to queue operation")?;

    println!("{}", id);
    output::success(&format!("Queued operation #{} for {}", id, table));

    Ok(())
}

fn parse_assignment(assignment: &str) -> Result<(String, Value)> {
    let (key, raw) = assignment
        .split_once('=')
        .with_context(|| format!("Expected KEY=VALUE, got '{}'", assignment))?;
    if key.is_empty() {
        bail!("Empty field name in '{}'", assignment);
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}
