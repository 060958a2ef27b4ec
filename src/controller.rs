//! Dashboard session: owns all mutable state and sequences recomputation
//!
//! Each UI event is applied, then table styling is recomputed exactly once and
//! the chart is re-derived only when the effective selection or the statistic
//! changed. Events are handled to completion one at a time.

use crate::chart::{derive_chart, ChartSpec};
use crate::dataset::Dataset;
use crate::error::DashboardError;
use crate::selection::SelectionState;
use crate::statistic::{Statistic, StatisticOption};
use crate::table::{row_styles, style_rules, ColumnSpec, Palette, RowStyle, SortKey, StyleRule, TableView};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User interaction delivered by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardEvent {
    ToggleRow { id: usize },
    /// Full set of checked rows, as the host table reports it
    SetSelectedRows { ids: Vec<usize> },
    ClearSelection,
    /// Raw dropdown value; validated here
    SetStatistic { statistic: String },
    SetFilter { query: String },
    SetSort { keys: Vec<SortKey> },
    SetPage { page: usize },
    RemoveRow { id: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No effective selection, no chart
    Idle,
    /// At least one selected row visible, chart shown
    Selected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", content = "chart", rename_all = "snake_case")]
pub enum ChartUpdate {
    Unchanged,
    Redraw(ChartSpec),
    Hide,
}

/// What the host must redraw after one event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Update {
    pub styles: Vec<RowStyle>,
    pub style_rules: Vec<StyleRule>,
    pub chart: ChartUpdate,
    pub phase: Phase,
    /// Recoverable conditions met while handling the event
    pub notices: Vec<String>,
}

/// Full view state, for the initial page load
#[derive(Debug, Clone, Serialize)]
pub struct DashboardState {
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Map<String, Value>>,
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub selected: Vec<usize>,
    pub filter: Option<String>,
    pub sort: Vec<SortKey>,
    pub statistic: Statistic,
    pub statistic_options: Vec<StatisticOption>,
    pub styles: Vec<RowStyle>,
    pub style_rules: Vec<StyleRule>,
    pub chart: Option<ChartSpec>,
    pub phase: Phase,
}

pub struct Dashboard {
    dataset: Dataset,
    view: TableView,
    /// Checked rows, including ones currently hidden by the filter
    selection: SelectionState,
    statistic: Statistic,
    palette: Palette,
    chart: Option<ChartSpec>,
    /// Inputs the current chart was derived from
    derived_from: (SelectionState, Statistic),
    style_revision: u64,
    chart_revision: u64,
}

impl Dashboard {
    pub fn new(dataset: Dataset, statistic: Statistic, palette: Palette) -> Self {
        let view = TableView::new(&dataset);
        Self {
            dataset,
            view,
            selection: SelectionState::new(),
            statistic,
            palette,
            chart: None,
            derived_from: (SelectionState::new(), statistic),
            style_revision: 0,
            chart_revision: 0,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn statistic(&self) -> Statistic {
        self.statistic
    }

    #[cfg(test)]
    pub fn chart(&self) -> Option<&ChartSpec> {
        self.chart.as_ref()
    }

    pub fn phase(&self) -> Phase {
        if self.chart.is_some() {
            Phase::Selected
        } else {
            Phase::Idle
        }
    }

    /// Number of times table styling has been recomputed
    pub fn style_revision(&self) -> u64 {
        self.style_revision
    }

    /// Number of times the chart has been derived
    pub fn chart_revision(&self) -> u64 {
        self.chart_revision
    }

    /// Selection the chart is built from: checked rows the view still shows
    pub fn effective_selection(&self) -> SelectionState {
        self.view.derived_selection(&self.selection)
    }

    /// Apply one event and recompute what depends on it.
    ///
    /// A rejected event leaves all state untouched and triggers no recomputation.
    pub fn handle(&mut self, event: DashboardEvent) -> Result<Update, DashboardError> {
        debug!("Handling event: {:?}", event);
        let mut notices = Vec::new();

        match event {
            DashboardEvent::ToggleRow { id } => {
                if !self.dataset.contains_id(id) || self.view.is_removed(id) {
                    return Err(DashboardError::UnknownRow(id));
                }
                self.selection.toggle(id);
            }
            DashboardEvent::SetSelectedRows { ids } => {
                let (known, stale): (Vec<usize>, Vec<usize>) = ids
                    .into_iter()
                    .partition(|&id| self.dataset.contains_id(id) && !self.view.is_removed(id));
                if !stale.is_empty() {
                    notices.push(DashboardError::StaleSelection(stale));
                }
                self.selection = known.into_iter().collect();
            }
            DashboardEvent::ClearSelection => self.selection.clear(),
            DashboardEvent::SetStatistic { statistic } => {
                self.statistic = statistic.parse()?;
            }
            DashboardEvent::SetFilter { query } => self.view.set_filter(&self.dataset, &query)?,
            DashboardEvent::SetSort { keys } => self.view.set_sort(&self.dataset, keys)?,
            DashboardEvent::SetPage { page } => self.view.set_page(page),
            DashboardEvent::RemoveRow { id } => {
                self.view.remove_row(&self.dataset, id)?;
                self.selection.deselect(id);
            }
        }

        let (styles, rules) = self.restyle();
        let chart = self.rederive(&mut notices);

        for notice in &notices {
            warn!("{}", notice);
        }

        Ok(Update {
            styles,
            style_rules: rules,
            chart,
            phase: self.phase(),
            notices: notices.iter().map(|n| n.to_string()).collect(),
        })
    }

    fn restyle(&mut self) -> (Vec<RowStyle>, Vec<StyleRule>) {
        self.style_revision += 1;
        let page = self.view.page_ids();
        (
            row_styles(page, &self.selection, &self.palette),
            style_rules(page, &self.selection, &self.palette),
        )
    }

    fn rederive(&mut self, notices: &mut Vec<DashboardError>) -> ChartUpdate {
        let inputs = (self.effective_selection(), self.statistic);
        if inputs == self.derived_from {
            return ChartUpdate::Unchanged;
        }

        let update = if inputs.0.is_empty() {
            // Nothing to plot; the deriver is not invoked
            match self.chart.take() {
                Some(_) => ChartUpdate::Hide,
                None => ChartUpdate::Unchanged,
            }
        } else {
            self.chart_revision += 1;
            let derivation = derive_chart(&self.dataset, &inputs.0, inputs.1);
            debug!(
                "Chart derived for {} rows ({})",
                inputs.0.len(),
                inputs.1
            );
            notices.extend(derivation.notices);
            self.chart = derivation.chart;
            match &self.chart {
                Some(chart) => ChartUpdate::Redraw(chart.clone()),
                None => ChartUpdate::Hide,
            }
        };

        self.derived_from = inputs;
        update
    }

    pub fn state(&self) -> DashboardState {
        let page = self.view.page_ids();
        DashboardState {
            columns: TableView::column_specs(&self.dataset),
            rows: self.view.page_records(&self.dataset),
            page: self.view.page(),
            page_count: self.view.page_count(),
            page_size: self.view.page_size(),
            selected: self.selection.ids().collect(),
            filter: self.view.filter_query().map(str::to_string),
            sort: self.view.sort_keys().to_vec(),
            statistic: self.statistic,
            statistic_options: Statistic::options(),
            styles: row_styles(page, &self.selection, &self.palette),
            style_rules: style_rules(page, &self.selection, &self.palette),
            chart: self.chart.clone(),
            phase: self.phase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::{many_rows, three_rows};
    use crate::table::HIGHLIGHT_BACKGROUND;

    fn dashboard() -> Dashboard {
        Dashboard::new(three_rows(), Statistic::Mean, Palette::default())
    }

    fn toggle(id: usize) -> DashboardEvent {
        DashboardEvent::ToggleRow { id }
    }

    fn redrawn(update: &Update) -> &ChartSpec {
        match &update.chart {
            ChartUpdate::Redraw(chart) => chart,
            other => panic!("expected redraw, got {:?}", other),
        }
    }

    #[test]
    fn test_starts_idle() {
        let d = dashboard();
        assert_eq!(d.phase(), Phase::Idle);
        assert!(d.chart().is_none());
        assert_eq!(d.chart_revision(), 0);
    }

    #[test]
    fn test_one_toggle_one_recomputation() {
        let mut d = dashboard();
        let update = d.handle(toggle(1)).unwrap();

        assert_eq!(d.style_revision(), 1);
        assert_eq!(d.chart_revision(), 1);
        assert_eq!(update.phase, Phase::Selected);
        assert_eq!(redrawn(&update).categories, vec!["Putamen".to_string()]);
        assert_eq!(update.styles[1].background.as_deref(), Some(HIGHLIGHT_BACKGROUND));
    }

    #[test]
    fn test_idle_selected_idle_cycle() {
        let mut d = dashboard();
        d.handle(toggle(0)).unwrap();
        let update = d.handle(toggle(2)).unwrap();
        assert_eq!(redrawn(&update).ids, vec![0, 2]);

        d.handle(toggle(0)).unwrap();
        let update = d.handle(toggle(2)).unwrap();
        assert_eq!(update.chart, ChartUpdate::Hide);
        assert_eq!(update.phase, Phase::Idle);
        assert_eq!(d.chart_revision(), 3);
    }

    #[test]
    fn test_statistic_change_redraws() {
        let mut d = dashboard();
        d.handle(DashboardEvent::SetSelectedRows { ids: vec![0, 1, 2] }).unwrap();
        let update = d
            .handle(DashboardEvent::SetStatistic {
                statistic: "Excluded_Voxels".to_string(),
            })
            .unwrap();
        let chart = redrawn(&update);
        assert_eq!(chart.y_axis_label, "Percentage of voxels excluded");
        assert_eq!(d.statistic(), Statistic::ExcludedVoxels);
    }

    #[test]
    fn test_statistic_change_while_idle_does_not_derive() {
        let mut d = dashboard();
        let update = d
            .handle(DashboardEvent::SetStatistic {
                statistic: "Max".to_string(),
            })
            .unwrap();
        assert_eq!(update.chart, ChartUpdate::Unchanged);
        assert_eq!(d.chart_revision(), 0);
        assert_eq!(d.style_revision(), 1);
    }

    #[test]
    fn test_invalid_statistic_rejected_without_side_effects() {
        let mut d = dashboard();
        d.handle(toggle(0)).unwrap();
        let err = d
            .handle(DashboardEvent::SetStatistic {
                statistic: "Median".to_string(),
            })
            .unwrap_err();
        assert_eq!(err, DashboardError::InvalidStatistic("Median".to_string()));
        assert_eq!(d.statistic(), Statistic::Mean);
        assert_eq!(d.style_revision(), 1);
        assert_eq!(d.chart_revision(), 1);
    }

    #[test]
    fn test_page_change_keeps_chart() {
        let mut d = Dashboard::new(many_rows(12), Statistic::Mean, Palette::default());
        d.handle(toggle(3)).unwrap();
        let update = d.handle(DashboardEvent::SetPage { page: 1 }).unwrap();
        assert_eq!(update.chart, ChartUpdate::Unchanged);
        assert_eq!(update.styles.len(), 5);
        assert_eq!(update.styles[0].id, 5);
        // Selected row 3 is not on page 1
        assert_eq!(update.style_rules.len(), 1);
        assert_eq!(d.chart_revision(), 1);
    }

    #[test]
    fn test_filter_hides_selected_rows_from_chart() {
        let mut d = dashboard();
        d.handle(DashboardEvent::SetSelectedRows { ids: vec![0, 1] }).unwrap();

        let update = d
            .handle(DashboardEvent::SetFilter {
                query: "{Mean} > 12".to_string(),
            })
            .unwrap();
        assert_eq!(redrawn(&update).ids, vec![1]);
        // Row 0 is still checked
        assert!(d.selection().contains(0));

        let update = d
            .handle(DashboardEvent::SetFilter {
                query: "{Mean} > 100".to_string(),
            })
            .unwrap();
        assert_eq!(update.chart, ChartUpdate::Hide);
        assert_eq!(d.phase(), Phase::Idle);

        let update = d
            .handle(DashboardEvent::SetFilter { query: String::new() })
            .unwrap();
        assert_eq!(redrawn(&update).ids, vec![0, 1]);
    }

    #[test]
    fn test_sort_does_not_rederive() {
        let mut d = dashboard();
        d.handle(toggle(2)).unwrap();
        let update = d
            .handle(DashboardEvent::SetSort {
                keys: vec![SortKey::desc("Mean")],
            })
            .unwrap();
        assert_eq!(update.chart, ChartUpdate::Unchanged);
        let ids: Vec<usize> = update.styles.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 0]);
        assert_eq!(update.styles[1].background.as_deref(), Some(HIGHLIGHT_BACKGROUND));
    }

    #[test]
    fn test_remove_row_deselects() {
        let mut d = dashboard();
        d.handle(DashboardEvent::SetSelectedRows { ids: vec![0, 1] }).unwrap();
        let update = d.handle(DashboardEvent::RemoveRow { id: 0 }).unwrap();
        assert_eq!(redrawn(&update).ids, vec![1]);
        assert!(!d.selection().contains(0));
        assert_eq!(d.dataset().len(), 3);

        assert_eq!(d.handle(toggle(0)), Err(DashboardError::UnknownRow(0)));
    }

    #[test]
    fn test_stale_ids_reported() {
        let mut d = dashboard();
        let update = d
            .handle(DashboardEvent::SetSelectedRows { ids: vec![1, 42] })
            .unwrap();
        assert_eq!(redrawn(&update).ids, vec![1]);
        assert_eq!(update.notices.len(), 1);
        assert!(update.notices[0].contains("42"));
    }

    #[test]
    fn test_event_json_shape() {
        let event: DashboardEvent = serde_json::from_str(r#"{"type": "toggle_row", "id": 4}"#).unwrap();
        assert_eq!(event, toggle(4));
        let event: DashboardEvent =
            serde_json::from_str(r#"{"type": "set_sort", "keys": [{"column_id": "Mean", "direction": "desc"}]}"#)
                .unwrap();
        assert_eq!(
            event,
            DashboardEvent::SetSort {
                keys: vec![SortKey::desc("Mean")]
            }
        );
    }

    #[test]
    fn test_state_snapshot() {
        let mut d = dashboard();
        d.handle(toggle(1)).unwrap();
        let state = d.state();
        assert_eq!(state.rows.len(), 3);
        assert_eq!(state.selected, vec![1]);
        assert_eq!(state.phase, Phase::Selected);
        assert_eq!(state.statistic_options.len(), 6);
        assert!(state.chart.is_some());
    }
}
