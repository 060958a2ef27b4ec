//! Loading the combined results JSON into a `Dataset`

use crate::dataset::{Cell, ColumnDef, ColumnKind, Dataset, INDEX_COLUMN};
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use log::{debug, info};
use serde_json::{Map, Value};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Location of the results file inside a results directory
pub const RESULTS_FILE: &str = "Summarised_results/combined_results.json";

/// Presentation order of the eleven base columns
pub const BASE_COLUMN_ORDER: [usize; 11] = [0, 4, 8, 6, 9, 1, 7, 5, 10, 2, 3];

/// Column presentation order for a table with `n` source columns.
///
/// Extra parameter columns (source position 11 and up) are each inserted at
/// position 3, so the last extra column ends up first.
pub fn column_order(n: usize) -> Vec<usize> {
    let mut order = BASE_COLUMN_ORDER.to_vec();
    for i in BASE_COLUMN_ORDER.len()..n {
        order.insert(3, i);
    }
    order
}

/// Resolve a results directory or a direct file path to the JSON file to load
pub fn resolve_results_path(path: &Path) -> Result<PathBuf> {
    let candidate = if path.is_dir() {
        path.join(RESULTS_FILE)
    } else {
        path.to_path_buf()
    };

    if candidate.exists() {
        return Ok(candidate);
    }

    let gz = PathBuf::from(format!("{}.gz", candidate.display()));
    if gz.exists() {
        return Ok(gz);
    }

    anyhow::bail!("Results file not found: {}", candidate.display())
}

/// Load a dataset from a results directory or JSON file (optionally gzipped)
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let path = resolve_results_path(path)?;
    info!("Loading results: {}", path.display());

    let raw = std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = if path.extension().map(|e| e == "gz").unwrap_or(false) {
        let mut decoder = GzDecoder::new(&raw[..]);
        let mut decompressed = String::new();
        decoder
            .read_to_string(&mut decompressed)
            .with_context(|| format!("Failed to decompress {}", path.display()))?;
        decompressed
    } else {
        String::from_utf8(raw).with_context(|| format!("{} is not valid UTF-8", path.display()))?
    };

    let dataset = parse_dataset(&text).with_context(|| format!("Invalid results file: {}", path.display()))?;
    info!(
        "Loaded {} regions with {} columns",
        dataset.len(),
        dataset.columns().len()
    );
    Ok(dataset)
}

/// Parse results JSON in pandas "columns" or "records" layout
pub fn parse_dataset(json: &str) -> Result<Dataset> {
    let value: Value = serde_json::from_str(json).context("Failed to parse JSON")?;

    let (names, rows) = match value {
        Value::Object(map) => columns_layout(map)?,
        Value::Array(records) => records_layout(records)?,
        _ => anyhow::bail!("Expected a JSON object or array at top level"),
    };

    if names.len() < BASE_COLUMN_ORDER.len() {
        anyhow::bail!(
            "Expected at least {} columns, found {}",
            BASE_COLUMN_ORDER.len(),
            names.len()
        );
    }

    let order = column_order(names.len());
    debug!("Column order: {:?}", order);

    let columns: Vec<ColumnDef> = order
        .iter()
        .map(|&i| {
            let kind = declare_kind(&names[i], rows.iter().map(|r| &r[i]));
            ColumnDef::new(names[i].clone(), kind)
        })
        .collect();

    let cells: Vec<Vec<Cell>> = rows
        .iter()
        .map(|row| {
            order
                .iter()
                .zip(&columns)
                .map(|(&i, col)| to_cell(&row[i], col.kind))
                .collect()
        })
        .collect();

    Ok(Dataset::new(columns, cells)?)
}

/// `{"col": {"0": v, "1": v}, ...}`; row order follows the first column's keys
fn columns_layout(map: Map<String, Value>) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
    let mut names = Vec::with_capacity(map.len());
    let mut columns = Vec::with_capacity(map.len());
    for (name, column) in map {
        match column {
            Value::Object(values) => columns.push(values),
            _ => anyhow::bail!("Column '{}' is not an object of row values", name),
        }
        names.push(name);
    }

    let row_keys: Vec<String> = columns
        .first()
        .map(|c| c.keys().cloned().collect())
        .unwrap_or_default();

    let rows = row_keys
        .iter()
        .map(|key| {
            columns
                .iter()
                .map(|c| c.get(key).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Ok((names, rows))
}

/// `[{"col": v, ...}, ...]`; columns in order of first appearance
fn records_layout(records: Vec<Value>) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
    let mut names: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(records.len());
    for (i, record) in records.into_iter().enumerate() {
        let Value::Object(obj) = record else {
            anyhow::bail!("Record {} is not an object", i);
        };
        for key in obj.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let rows = objects
        .iter()
        .map(|obj| {
            names
                .iter()
                .map(|n| obj.get(n).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Ok((names, rows))
}

/// Declare a column's kind from every value in it, not just the first
fn declare_kind<'a>(name: &str, values: impl Iterator<Item = &'a Value>) -> ColumnKind {
    if name == INDEX_COLUMN {
        return ColumnKind::Categorical;
    }

    let (mut ints, mut floats, mut texts) = (0usize, 0usize, 0usize);
    for value in values {
        match value {
            Value::Null => {}
            Value::Number(n) if n.is_i64() || n.is_u64() => ints += 1,
            Value::Number(_) => floats += 1,
            _ => texts += 1,
        }
    }

    match (ints, floats, texts) {
        (_, _, t) if t > 0 => ColumnKind::Text,
        (i, 0, 0) if i > 0 => ColumnKind::Integer,
        _ => ColumnKind::Float,
    }
}

fn to_cell(value: &Value, kind: ColumnKind) -> Cell {
    match (value, kind) {
        (Value::Null, _) => Cell::Blank,
        (Value::Number(n), ColumnKind::Integer) => n
            .as_i64()
            .map(Cell::Integer)
            .or_else(|| n.as_f64().map(Cell::Float))
            .unwrap_or(Cell::Blank),
        (Value::Number(n), ColumnKind::Float) => n.as_f64().map(Cell::Float).unwrap_or(Cell::Blank),
        (Value::String(s), _) => Cell::Text(s.clone()),
        (other, _) => Cell::Text(other.to_string()),
    }
}
