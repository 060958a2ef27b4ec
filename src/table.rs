//! Table view over the dataset: sort, filter, pagination, row removal and styling
//!
//! The view never mutates the dataset. It keeps the ordered list of visible row
//! ids, recomputed whenever sort, filter or removals change.

use crate::dataset::{Cell, ColumnKind, Dataset, Row};
use crate::error::DashboardError;
use crate::filter::Filter;
use crate::selection::SelectionState;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeSet;

pub const ZEBRA_BACKGROUND: &str = "rgb(248, 248, 248)";
pub const HIGHLIGHT_BACKGROUND: &str = "#D2F3FF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One entry of a (possibly multi-column) sort, highest priority first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub column_id: String,
    pub direction: SortDirection,
}

#[cfg(test)]
impl SortKey {
    pub fn asc(column: &str) -> Self {
        Self {
            column_id: column.to_string(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            column_id: column.to_string(),
            direction: SortDirection::Desc,
        }
    }
}

/// Numeric display format understood by the host table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NumberFormat {
    pub precision: u8,
    /// "f" fixed-point, "d" decimal integer
    pub scheme: &'static str,
}

/// Column definition handed to the rendering surface
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    pub id: String,
    pub deletable: bool,
    pub selectable: bool,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<NumberFormat>,
}

impl ColumnSpec {
    fn for_kind(name: &str, kind: ColumnKind) -> Self {
        let (kind_name, format) = match kind {
            ColumnKind::Float => ("numeric", Some(NumberFormat { precision: 2, scheme: "f" })),
            ColumnKind::Integer => ("numeric", Some(NumberFormat { precision: 2, scheme: "d" })),
            ColumnKind::Categorical | ColumnKind::Text => ("text", None),
        };
        Self {
            name: name.to_string(),
            id: name.to_string(),
            deletable: true,
            selectable: true,
            kind: kind_name,
            format,
        }
    }
}

/// Background colours used by the styling rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub zebra: String,
    pub highlight: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            zebra: ZEBRA_BACKGROUND.to_string(),
            highlight: HIGHLIGHT_BACKGROUND.to_string(),
        }
    }
}

/// Declarative conditional style, in the order the host applies them
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "when", rename_all = "snake_case")]
pub enum StyleRule {
    OddRow { background: String },
    RowId { id: usize, background: String },
}

/// Resolved background for one row on the current page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowStyle {
    pub row_index: usize,
    pub id: usize,
    pub background: Option<String>,
}

/// Styling rule: zebra stripe on odd rows, highlight for selected rows
/// (highlight wins). Only the rows listed in `page_ids` are styled.
pub fn style_rules(page_ids: &[usize], selection: &SelectionState, palette: &Palette) -> Vec<StyleRule> {
    let mut rules = vec![StyleRule::OddRow {
        background: palette.zebra.clone(),
    }];
    rules.extend(
        page_ids
            .iter()
            .filter(|&&id| selection.contains(id))
            .map(|&id| StyleRule::RowId {
                id,
                background: palette.highlight.clone(),
            }),
    );
    rules
}

pub fn row_styles(page_ids: &[usize], selection: &SelectionState, palette: &Palette) -> Vec<RowStyle> {
    page_ids
        .iter()
        .enumerate()
        .map(|(row_index, &id)| {
            let background = if selection.contains(id) {
                Some(palette.highlight.clone())
            } else if row_index % 2 == 1 {
                Some(palette.zebra.clone())
            } else {
                None
            };
            RowStyle {
                row_index,
                id,
                background,
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct TableView {
    filter: Option<Filter>,
    sort_keys: Vec<SortKey>,
    sort: Vec<(usize, SortDirection)>,
    removed: BTreeSet<usize>,
    page: usize,
    page_size: usize,
    visible: Vec<usize>,
}

impl TableView {
    pub fn new(dataset: &Dataset) -> Self {
        let mut view = Self {
            filter: None,
            sort_keys: Vec::new(),
            sort: Vec::new(),
            removed: BTreeSet::new(),
            page: 0,
            page_size: dataset.distinct_index_count().max(1),
            visible: Vec::new(),
        };
        view.refresh(dataset);
        view
    }

    pub fn column_specs(dataset: &Dataset) -> Vec<ColumnSpec> {
        dataset
            .columns()
            .iter()
            .map(|c| ColumnSpec::for_kind(&c.name, c.kind))
            .collect()
    }

    /// Replace the filter; an empty query clears it
    pub fn set_filter(&mut self, dataset: &Dataset, query: &str) -> Result<(), DashboardError> {
        self.filter = if query.trim().is_empty() {
            None
        } else {
            Some(Filter::parse(query, dataset)?)
        };
        self.refresh(dataset);
        Ok(())
    }

    pub fn filter_query(&self) -> Option<&str> {
        self.filter.as_ref().map(|f| f.source())
    }

    pub fn set_sort(&mut self, dataset: &Dataset, keys: Vec<SortKey>) -> Result<(), DashboardError> {
        let sort = keys
            .iter()
            .map(|k| dataset.require_column(&k.column_id).map(|c| (c, k.direction)))
            .collect::<Result<Vec<_>, DashboardError>>()?;
        self.sort = sort;
        self.sort_keys = keys;
        self.refresh(dataset);
        Ok(())
    }

    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort_keys
    }

    /// Hide a row from the view. The dataset keeps it.
    pub fn remove_row(&mut self, dataset: &Dataset, id: usize) -> Result<(), DashboardError> {
        if !dataset.contains_id(id) {
            return Err(DashboardError::UnknownRow(id));
        }
        self.removed.insert(id);
        self.refresh(dataset);
        Ok(())
    }

    pub fn is_removed(&self, id: usize) -> bool {
        self.removed.contains(&id)
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.min(self.page_count().saturating_sub(1));
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.visible.len().div_ceil(self.page_size).max(1)
    }

    /// Ids of every row passing filter and removals, in sorted order
    pub fn visible_ids(&self) -> &[usize] {
        &self.visible
    }

    /// Ids on the current page
    pub fn page_ids(&self) -> &[usize] {
        let start = (self.page * self.page_size).min(self.visible.len());
        let end = (start + self.page_size).min(self.visible.len());
        &self.visible[start..end]
    }

    pub fn is_visible(&self, id: usize) -> bool {
        self.visible.contains(&id)
    }

    /// Selection restricted to rows the view currently shows (any page)
    pub fn derived_selection(&self, selection: &SelectionState) -> SelectionState {
        selection.restricted_to(|id| self.is_visible(id))
    }

    /// Current page as records keyed by column name
    pub fn page_records(&self, dataset: &Dataset) -> Vec<Map<String, Value>> {
        self.page_ids()
            .iter()
            .filter_map(|&id| dataset.row(id))
            .map(|row| {
                dataset
                    .columns()
                    .iter()
                    .zip(row.cells())
                    .map(|(col, cell)| {
                        let value = serde_json::to_value(cell).unwrap_or(Value::Null);
                        (col.name.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }

    fn refresh(&mut self, dataset: &Dataset) {
        let mut ids: Vec<usize> = dataset
            .rows()
            .iter()
            .filter(|r| !self.removed.contains(&r.id))
            .filter(|r| self.filter.as_ref().map_or(true, |f| f.matches(r)))
            .map(|r| r.id)
            .collect();

        if !self.sort.is_empty() {
            // Stable sort: equal keys keep dataset (id) order
            ids.sort_by(|&a, &b| match (dataset.row(a), dataset.row(b)) {
                (Some(ra), Some(rb)) => compare_rows(ra, rb, &self.sort),
                _ => a.cmp(&b),
            });
        }

        self.visible = ids;
        self.set_page(self.page);
    }
}

fn compare_rows(a: &Row, b: &Row, sort: &[(usize, SortDirection)]) -> Ordering {
    for &(column, direction) in sort {
        let ordering = compare_cells(a.cell(column), b.cell(column), direction);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Blanks sort last in both directions
fn compare_cells(a: &Cell, b: &Cell, direction: SortDirection) -> Ordering {
    match (a.is_blank(), b.is_blank()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    let ordering = match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.display().cmp(&b.display()),
    };

    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}
