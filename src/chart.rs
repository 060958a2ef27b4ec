//! Bar chart derivation from the selected rows
//!
//! `derive_chart` is a pure function of (dataset, selection, statistic). An empty
//! selection yields no chart at all; the caller decides what to show instead.

use crate::dataset::{Dataset, Row};
use crate::error::DashboardError;
use crate::selection::SelectionState;
use crate::statistic::Statistic;
use serde::Serialize;
use serde_json::{json, Value};

pub const CHART_TITLE: &str = "Interactive barchart";
pub const X_AXIS_LABEL: &str = "Region of interest";
/// Bar width grows with the number of bars
pub const BAR_WIDTH_PER_ROW: f64 = 0.09;
pub const ERROR_CAP_WIDTH: u32 = 35;
pub const ERROR_BAR_THICKNESS: u32 = 2;

/// Declarative description of the bar chart; rendering is the host's job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub statistic: Statistic,
    /// Row id behind each bar
    pub ids: Vec<usize>,
    pub categories: Vec<String>,
    /// NaN for blank cells (serialised as null)
    pub values: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_values: Option<Vec<f64>>,
    pub bar_width: f64,
    pub error_cap_width: u32,
    pub title: &'static str,
    pub x_axis_label: &'static str,
    pub y_axis_label: &'static str,
}

/// Result of a derivation: the chart (if any) and recoverable conditions met on the way
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub chart: Option<ChartSpec>,
    pub notices: Vec<DashboardError>,
}

pub fn derive_chart(dataset: &Dataset, selection: &SelectionState, statistic: Statistic) -> Derivation {
    let mut notices = Vec::new();

    let resolved = selection.resolve(dataset);
    notices.extend(resolved.notice());
    let rows = resolved.rows;
    if rows.is_empty() {
        return Derivation { chart: None, notices };
    }

    let values = match statistic_values(dataset, &rows, statistic) {
        Ok(values) => values,
        Err(e) => {
            notices.push(e);
            return Derivation { chart: None, notices };
        }
    };

    let error_values = if statistic == Statistic::Mean {
        match dataset.confidence_interval_column() {
            Some(col) => Some(column_values(&rows, col)),
            None => {
                notices.push(DashboardError::MissingConfidenceIntervalColumn);
                None
            }
        }
    } else {
        None
    };

    let chart = ChartSpec {
        statistic,
        ids: rows.iter().map(|r| r.id).collect(),
        categories: rows.iter().map(|r| r.index.clone()).collect(),
        values,
        error_values,
        bar_width: BAR_WIDTH_PER_ROW * rows.len() as f64,
        error_cap_width: ERROR_CAP_WIDTH,
        title: CHART_TITLE,
        x_axis_label: X_AXIS_LABEL,
        y_axis_label: statistic.axis_label(),
    };

    Derivation {
        chart: Some(chart),
        notices,
    }
}

fn statistic_values(dataset: &Dataset, rows: &[&Row], statistic: Statistic) -> Result<Vec<f64>, DashboardError> {
    let column = dataset.require_column(statistic.column())?;
    if statistic != Statistic::ExcludedVoxels {
        return Ok(column_values(rows, column));
    }

    let voxels = dataset.require_column(Statistic::Voxels.column())?;
    Ok(rows
        .iter()
        .map(|r| {
            let excluded = r.cell(column).as_f64().unwrap_or(f64::NAN);
            let kept = r.cell(voxels).as_f64().unwrap_or(f64::NAN);
            excluded_percentage(excluded, kept)
        })
        .collect())
}

fn column_values(rows: &[&Row], column: usize) -> Vec<f64> {
    rows.iter()
        .map(|r| r.cell(column).as_f64().unwrap_or(f64::NAN))
        .collect()
}

/// Share of voxels excluded, as a percentage of all voxels in the region
pub fn excluded_percentage(excluded: f64, voxels: f64) -> f64 {
    let total = excluded + voxels;
    if total == 0.0 {
        0.0
    } else {
        excluded / total * 100.0
    }
}

impl ChartSpec {
    /// Plotly figure JSON for the host page
    pub fn to_figure(&self, background: &str, height: u32) -> Value {
        let mut trace = json!({
            "type": "bar",
            "x": self.categories,
            "y": self.values,
            "customdata": self.ids,
            "width": self.bar_width,
        });
        if let Some(errors) = &self.error_values {
            trace["error_y"] = json!({
                "type": "data",
                "array": errors,
                "thickness": ERROR_BAR_THICKNESS,
                "width": self.error_cap_width,
            });
        }

        json!({
            "data": [trace],
            "layout": {
                "title": self.title,
                "height": height,
                "xaxis": { "title": self.x_axis_label },
                "yaxis": { "title": self.y_axis_label },
                "plot_bgcolor": background,
                "paper_bgcolor": background,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::{columns, row, three_rows};
    use crate::dataset::{Cell, ColumnDef, ColumnKind};

    fn all(ds: &Dataset) -> SelectionState {
        (0..ds.len()).collect()
    }

    fn round2(v: f64) -> f64 {
        (v * 100.0).round() / 100.0
    }

    #[test]
    fn test_excluded_voxels_percentage() {
        let ds = three_rows();
        let derivation = derive_chart(&ds, &all(&ds), Statistic::ExcludedVoxels);
        let chart = derivation.chart.unwrap();

        let rounded: Vec<f64> = chart.values.iter().map(|v| round2(*v)).collect();
        assert_eq!(rounded, vec![9.09, 9.09, 0.0]);
        assert!((chart.bar_width - 0.27).abs() < 1e-9);
        assert_eq!(chart.y_axis_label, "Percentage of voxels excluded");
        assert_eq!(chart.error_values, None);
        assert!(derivation.notices.is_empty());
    }

    #[test]
    fn test_single_row_mean_with_error_bars() {
        let ds = three_rows();
        let sel: SelectionState = [1].into_iter().collect();
        let chart = derive_chart(&ds, &sel, Statistic::Mean).chart.unwrap();

        assert_eq!(chart.categories, vec!["Putamen".to_string()]);
        assert_eq!(chart.values, vec![20.0]);
        assert_eq!(chart.error_values, Some(vec![2.5]));
        assert_eq!(chart.error_cap_width, 35);
        assert_eq!(chart.title, "Interactive barchart");
        assert_eq!(chart.x_axis_label, "Region of interest");
        assert_eq!(chart.y_axis_label, "Mean");
    }

    #[test]
    fn test_only_first_conf_int_column_used() {
        let mut cols = columns();
        cols.push(ColumnDef::new("Conf_Int_99", ColumnKind::Float));
        let mut r = row("Insula", 4.0, 0.4, 10, 1);
        r.push(crate::dataset::Cell::Float(9.9));
        let ds = Dataset::new(cols, vec![r]).unwrap();

        let chart = derive_chart(&ds, &all(&ds), Statistic::Mean).chart.unwrap();
        assert_eq!(chart.error_values, Some(vec![0.4]));
    }

    #[test]
    fn test_missing_conf_int_still_renders() {
        let cols: Vec<ColumnDef> = columns().into_iter().filter(|c| c.name != "Conf_Int_95").collect();
        let rows = vec![vec![
            crate::dataset::Cell::Text("Insula".to_string()),
            crate::dataset::Cell::Float(3.0),
        ]];
        let ds = Dataset::new(cols, rows).unwrap();

        let derivation = derive_chart(&ds, &all(&ds), Statistic::Mean);
        let chart = derivation.chart.unwrap();
        assert_eq!(chart.values, vec![3.0]);
        assert_eq!(chart.error_values, None);
        assert_eq!(derivation.notices, vec![DashboardError::MissingConfidenceIntervalColumn]);
    }

    #[test]
    fn test_direct_statistics_have_no_error_bars() {
        let ds = three_rows();
        for (stat, expected) in [
            (Statistic::StdDev, vec![1.0, 2.0, 1.5]),
            (Statistic::Min, vec![5.0, 15.0, 10.0]),
            (Statistic::Max, vec![15.0, 25.0, 20.0]),
            (Statistic::Voxels, vec![100.0, 200.0, 150.0]),
        ] {
            let chart = derive_chart(&ds, &all(&ds), stat).chart.unwrap();
            assert_eq!(chart.values, expected, "{}", stat);
            assert_eq!(chart.error_values, None);
            assert_eq!(chart.y_axis_label, stat.label());
        }
    }

    #[test]
    fn test_empty_selection_yields_no_chart() {
        let ds = three_rows();
        let derivation = derive_chart(&ds, &SelectionState::new(), Statistic::Mean);
        assert!(derivation.chart.is_none());
        assert!(derivation.notices.is_empty());
    }

    #[test]
    fn test_stale_ids_dropped() {
        let ds = three_rows();
        let sel: SelectionState = [0, 12].into_iter().collect();
        let derivation = derive_chart(&ds, &sel, Statistic::Voxels);
        let chart = derivation.chart.unwrap();
        assert_eq!(chart.ids, vec![0]);
        assert!((chart.bar_width - 0.09).abs() < 1e-12);
        assert_eq!(derivation.notices, vec![DashboardError::StaleSelection(vec![12])]);

        let only_stale: SelectionState = [12].into_iter().collect();
        assert!(derive_chart(&ds, &only_stale, Statistic::Voxels).chart.is_none());
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let mut blank_mean = row("Insula", 0.0, 1.0, 50, 5);
        blank_mean[1] = Cell::Blank;
        let ds = Dataset::new(
            columns(),
            vec![row("Caudate", 10.0, 1.5, 100, 10), blank_mean, row("Thalamus", 15.0, 0.5, 150, 0)],
        )
        .unwrap();
        let sel: SelectionState = [0, 1, 2].into_iter().collect();
        let first = derive_chart(&ds, &sel, Statistic::Mean);
        let second = derive_chart(&ds, &sel, Statistic::Mean);

        // NaN != NaN, so compare what the host receives
        let first_json = serde_json::to_value(&first.chart).unwrap();
        assert_eq!(first_json, serde_json::to_value(&second.chart).unwrap());
        assert_eq!(first_json["values"][1], Value::Null);
        assert_eq!(first.notices, second.notices);
    }

    #[test]
    fn test_excluded_percentage_zero_total() {
        assert_eq!(excluded_percentage(0.0, 0.0), 0.0);
        assert_eq!(excluded_percentage(50.0, 50.0), 50.0);
    }

    #[test]
    fn test_figure_json() {
        let ds = three_rows();
        let chart = derive_chart(&ds, &all(&ds), Statistic::Mean).chart.unwrap();
        let figure = chart.to_figure("#f8f8f8", 500);

        assert_eq!(figure["data"][0]["type"], "bar");
        assert_eq!(figure["data"][0]["error_y"]["width"], 35);
        assert_eq!(figure["data"][0]["x"][2], "Thalamus");
        assert_eq!(figure["layout"]["yaxis"]["title"], "Mean");
        assert_eq!(figure["layout"]["paper_bgcolor"], "#f8f8f8");

        let chart = derive_chart(&ds, &all(&ds), Statistic::Max).chart.unwrap();
        assert!(chart.to_figure("#fff", 500)["data"][0].get("error_y").is_none());
    }
}
