use std::collections::BTreeSet;
use std::fs;

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::cli::ImportArgs;
use crate::commands::open_store;
use crate::schema::parse_items;
use crate::store::{Cell, Row, record_from_row};
use crate::util::{now_utc_string, sha256_file};

pub fn run(args: ImportArgs) -> Result<()> {
    let (mut store, config) = open_store(&args.store)?;

    let digest = sha256_file(&args.input)?;
    let import_key = format!("import_sha256:{digest}");
    if let Some(imported_at) = store.metadata(&import_key)? {
        if !args.force {
            bail!(
                "{} was already imported at {imported_at}; pass --force to import it again",
                args.input.display()
            );
        }
        warn!(path = %args.input.display(), imported_at = %imported_at, "re-importing identical file");
    }

    let raw = fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let value: Value = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", args.input.display()))?;

    let header = config.columns.data_header();
    let (rows, ignored) = rows_from_json(&value, &header)?;
    if !ignored.is_empty() {
        warn!(columns = ?ignored, "ignoring columns not present in the Data sheet");
    }

    let records: Vec<_> = rows
        .iter()
        .map(|row| record_from_row(&header, row.clone()))
        .collect();
    let items = parse_items(&config.tables.data, &records, &config.columns)
        .context("input does not match the configured Data columns")?;
    let groups: BTreeSet<i64> = items.iter().map(|item| item.group_id).collect();

    let imported_at = now_utc_string();
    store
        .append_rows_recording(
            &config.tables.data,
            &rows,
            &[(import_key.as_str(), imported_at.as_str())],
        )
        .with_context(|| format!("failed to append rows to {}", config.tables.data))?;

    info!(
        path = %args.input.display(),
        rows = rows.len(),
        groups = groups.len(),
        sha256 = %digest,
        "import completed"
    );
    Ok(())
}

/// Lays out each JSON object as a row in `header` order.
///
/// Returns the rows plus any keys that have no column in `header`.
fn rows_from_json(value: &Value, header: &[String]) -> Result<(Vec<Row>, BTreeSet<String>)> {
    let Value::Array(entries) = value else {
        bail!("expected a JSON array of objects");
    };

    let mut rows = Vec::with_capacity(entries.len());
    let mut ignored = BTreeSet::new();
    for (index, entry) in entries.iter().enumerate() {
        let Value::Object(object) = entry else {
            bail!("entry {} is not a JSON object", index + 1);
        };
        ignored.extend(
            object
                .keys()
                .filter(|key| !header.contains(*key))
                .cloned(),
        );
        rows.push(row_from_object(object, header, index)?);
    }
    Ok((rows, ignored))
}

fn row_from_object(object: &Map<String, Value>, header: &[String], index: usize) -> Result<Row> {
    header
        .iter()
        .map(|column| match object.get(column) {
            None | Some(Value::Null) => Ok(Cell::Empty),
            Some(Value::Bool(flag)) => Ok(Cell::Text(flag.to_string())),
            Some(Value::String(text)) => Ok(Cell::Text(text.clone())),
            Some(Value::Number(number)) => number
                .as_i64()
                .map(Cell::Int)
                .or_else(|| number.as_f64().map(Cell::Real))
                .with_context(|| format!("entry {}: {column} is out of range", index + 1)),
            Some(_) => bail!("entry {}: {column} must be a scalar value", index + 1),
        })
        .collect()
}
