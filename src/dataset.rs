//! In-memory table of per-region statistics
//!
//! A `Dataset` is built once per session and never mutated afterwards. Every row
//! carries a stable `id` equal to its position in the source file; that id is the
//! only key used to correlate table rows, selections and chart bars.

use crate::error::DashboardError;
use serde::Serialize;
use std::collections::HashSet;

/// Column holding the region label (chart x-axis category)
pub const INDEX_COLUMN: &str = "index";
/// Column appended at load time holding the row id
pub const ID_COLUMN: &str = "id";
/// Name prefix of confidence-interval columns
pub const CONF_INT_PREFIX: &str = "Conf_Int";

/// Columns that must be present for the chart to be derivable
pub const REQUIRED_COLUMNS: [&str; 7] = [
    INDEX_COLUMN,
    "Mean",
    "Std_dev",
    "Min",
    "Max",
    "Voxels",
    "Excluded_Voxels",
];

/// Declared type of a column, fixed when the dataset is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Float,
    Integer,
    Categorical,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A single table cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Float(f64),
    Integer(i64),
    Text(String),
    Blank,
}

impl Cell {
    /// Numeric view of the cell, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Float(v) => Some(*v),
            Cell::Integer(v) => Some(*v as f64),
            Cell::Text(_) | Cell::Blank => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Blank => true,
            Cell::Text(s) => s.is_empty(),
            Cell::Float(v) => v.is_nan(),
            Cell::Integer(_) => false,
        }
    }

    /// Text as the table renders it (two decimals for floats)
    pub fn display(&self) -> String {
        match self {
            Cell::Float(v) => format!("{:.2}", v),
            Cell::Integer(v) => v.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Blank => String::new(),
        }
    }
}

static BLANK: Cell = Cell::Blank;

/// One region of interest
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: usize,
    /// Region label, may repeat across rows
    pub index: String,
    cells: Vec<Cell>,
}

impl Row {
    pub fn cell(&self, column: usize) -> &Cell {
        self.cells.get(column).unwrap_or(&BLANK)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

/// Immutable, ordered collection of rows with a fixed column schema
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<ColumnDef>,
    rows: Vec<Row>,
}

impl Dataset {
    /// Build a dataset from already-ordered columns and row cells.
    ///
    /// Row ids are assigned from position and written to an `id` column, which is
    /// appended if the source does not already have one. Fails if a required
    /// column is missing.
    pub fn new(mut columns: Vec<ColumnDef>, rows: Vec<Vec<Cell>>) -> Result<Self, DashboardError> {
        for required in REQUIRED_COLUMNS {
            if !columns.iter().any(|c| c.name == required) {
                return Err(DashboardError::UnknownColumn(required.to_string()));
            }
        }

        let id_col = match columns.iter().position(|c| c.name == ID_COLUMN) {
            Some(pos) => {
                columns[pos].kind = ColumnKind::Integer;
                pos
            }
            None => {
                columns.push(ColumnDef::new(ID_COLUMN, ColumnKind::Integer));
                columns.len() - 1
            }
        };
        let index_col = columns
            .iter()
            .position(|c| c.name == INDEX_COLUMN)
            .ok_or_else(|| DashboardError::UnknownColumn(INDEX_COLUMN.to_string()))?;

        let width = columns.len();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(id, mut cells)| {
                cells.resize(width, Cell::Blank);
                cells[id_col] = Cell::Integer(id as i64);
                let index = cells[index_col].display();
                Row { id, index, cells }
            })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Row by id; ids equal positions so this is a direct lookup
    pub fn row(&self, id: usize) -> Option<&Row> {
        self.rows.get(id)
    }

    pub fn contains_id(&self, id: usize) -> bool {
        id < self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, DashboardError> {
        self.column_index(name)
            .ok_or_else(|| DashboardError::UnknownColumn(name.to_string()))
    }

    /// First `Conf_Int*` column by column order
    pub fn confidence_interval_column(&self) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.starts_with(CONF_INT_PREFIX))
    }

    /// Number of distinct region labels (the table's page size)
    pub fn distinct_index_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.index.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("index", ColumnKind::Categorical),
            ColumnDef::new("Mean", ColumnKind::Float),
            ColumnDef::new("Std_dev", ColumnKind::Float),
            ColumnDef::new("Conf_Int_95", ColumnKind::Float),
            ColumnDef::new("Min", ColumnKind::Float),
            ColumnDef::new("Max", ColumnKind::Float),
            ColumnDef::new("Voxels", ColumnKind::Integer),
            ColumnDef::new("Excluded_Voxels", ColumnKind::Integer),
        ]
    }

    pub fn row(label: &str, mean: f64, ci: f64, voxels: i64, excluded: i64) -> Vec<Cell> {
        vec![
            Cell::Text(label.to_string()),
            Cell::Float(mean),
            Cell::Float(mean / 10.0),
            Cell::Float(ci),
            Cell::Float(mean - 5.0),
            Cell::Float(mean + 5.0),
            Cell::Integer(voxels),
            Cell::Integer(excluded),
        ]
    }

    /// Three regions: voxels [100, 200, 150], excluded [10, 20, 0]
    pub fn three_rows() -> Dataset {
        Dataset::new(
            columns(),
            vec![
                row("Caudate", 10.0, 1.5, 100, 10),
                row("Putamen", 20.0, 2.5, 200, 20),
                row("Thalamus", 15.0, 0.5, 150, 0),
            ],
        )
        .unwrap()
    }

    /// `n` rows cycling through five labels
    pub fn many_rows(n: usize) -> Dataset {
        let labels = ["Caudate", "Putamen", "Thalamus", "Insula", "Cuneus"];
        let rows = (0..n)
            .map(|i| row(labels[i % labels.len()], i as f64, 1.0, 100, i as i64))
            .collect();
        Dataset::new(columns(), rows).unwrap()
    }
}
