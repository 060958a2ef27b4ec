//! Row filter expressions for the table view
//!
//! Supports a subset of Dash's `filter_query` syntax:
//!
//! ```text
//! {Mean} > 10 && {index} contains Cereb
//! {Excluded_Voxels} eq 0 and {Param_a} is blank
//! ```

use crate::dataset::{Cell, Dataset, Row};
use crate::error::DashboardError;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    IsBlank,
}

/// Symbolic and word forms; longer symbols first so `>=` wins over `>`
const OPERATORS: [(&str, FilterOp); 15] = [
    ("is blank", FilterOp::IsBlank),
    ("contains", FilterOp::Contains),
    (">=", FilterOp::Ge),
    ("<=", FilterOp::Le),
    ("!=", FilterOp::Ne),
    ("==", FilterOp::Eq),
    ("=", FilterOp::Eq),
    (">", FilterOp::Gt),
    ("<", FilterOp::Lt),
    ("eq", FilterOp::Eq),
    ("ne", FilterOp::Ne),
    ("lt", FilterOp::Lt),
    ("le", FilterOp::Le),
    ("gt", FilterOp::Gt),
    ("ge", FilterOp::Ge),
];

#[derive(Debug, Clone, PartialEq)]
struct Clause {
    column: usize,
    op: FilterOp,
    operand: String,
}

/// A parsed filter bound to a dataset's columns
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    source: String,
    clauses: Vec<Clause>,
}

impl Filter {
    /// Parse `query` and resolve its column references against `dataset`
    pub fn parse(query: &str, dataset: &Dataset) -> Result<Self, DashboardError> {
        let mut clauses = Vec::new();
        for part in split_clauses(query) {
            let part = part.trim();
            if part.is_empty() {
                return Err(DashboardError::InvalidFilter(format!("empty clause in '{}'", query)));
            }
            clauses.push(parse_clause(part, dataset)?);
        }
        Ok(Self {
            source: query.trim().to_string(),
            clauses,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// All clauses must hold
    pub fn matches(&self, row: &Row) -> bool {
        self.clauses.iter().all(|c| c.matches(row.cell(c.column)))
    }
}

const SEPARATORS: [&str; 2] = ["&&", " and "];

/// Split on `&&` and ` and `, except inside a quoted value
fn split_clauses(query: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    let mut start = 0;
    let mut i = 0;

    while let Some(c) = query[i..].chars().next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if (c == '"' || c == '\'') && opens_value(prev) => quote = Some(c),
            None => {
                if let Some(sep) = SEPARATORS.iter().find(|sep| query[i..].starts_with(**sep)) {
                    parts.push(&query[start..i]);
                    i += sep.len();
                    start = i;
                    prev = None;
                    continue;
                }
            }
        }
        prev = Some(c);
        i += c.len_utf8();
    }
    parts.push(&query[start..]);
    parts
}

/// A quote only starts a value after whitespace or an operator, so `O'Brien` stays literal
fn opens_value(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, '=' | '<' | '>'),
    }
}

fn parse_clause(part: &str, dataset: &Dataset) -> Result<Clause, DashboardError> {
    let invalid = |msg: &str| DashboardError::InvalidFilter(format!("{} in '{}'", msg, part));

    let rest = part
        .strip_prefix('{')
        .ok_or_else(|| invalid("expected '{column}'"))?;
    let close = rest.find('}').ok_or_else(|| invalid("unclosed '{'"))?;
    let name = rest[..close].trim();
    let column = dataset.require_column(name)?;
    let rest = rest[close + 1..].trim_start();

    let (op, operand) = OPERATORS
        .iter()
        .find_map(|(token, op)| {
            let tail = rest.strip_prefix(token)?;
            let is_word = token.chars().all(|c| c.is_ascii_alphabetic() || c == ' ');
            if is_word && !(tail.is_empty() || tail.starts_with(char::is_whitespace)) {
                return None;
            }
            Some((*op, tail.trim()))
        })
        .ok_or_else(|| invalid("unknown operator"))?;

    let operand = unquote(operand);
    if op != FilterOp::IsBlank && operand.is_empty() {
        return Err(invalid("missing value"));
    }

    Ok(Clause {
        column,
        op,
        operand: operand.to_string(),
    })
}

fn unquote(s: &str) -> &str {
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

impl Clause {
    fn matches(&self, cell: &Cell) -> bool {
        match self.op {
            FilterOp::IsBlank => return cell.is_blank(),
            FilterOp::Contains => return !cell.is_blank() && cell.display().contains(&self.operand),
            _ => {}
        }

        if cell.is_blank() {
            return self.op == FilterOp::Ne;
        }

        let ordering = match (cell.as_f64(), self.operand.parse::<f64>()) {
            (Some(value), Ok(target)) => value.partial_cmp(&target),
            _ => Some(cell.display().as_str().cmp(self.operand.as_str())),
        };
        let Some(ordering) = ordering else {
            return false;
        };

        match self.op {
            FilterOp::Eq => ordering == Ordering::Equal,
            FilterOp::Ne => ordering != Ordering::Equal,
            FilterOp::Lt => ordering == Ordering::Less,
            FilterOp::Le => ordering != Ordering::Greater,
            FilterOp::Gt => ordering == Ordering::Greater,
            FilterOp::Ge => ordering != Ordering::Less,
            FilterOp::Contains | FilterOp::IsBlank => unreachable!(),
        }
    }
}
