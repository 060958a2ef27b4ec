//! The statistic plotted on the bar chart

use crate::error::DashboardError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Statistic chosen in the dropdown above the chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Statistic {
    #[default]
    Mean,
    #[serde(rename = "Std_dev")]
    StdDev,
    Min,
    Max,
    Voxels,
    #[serde(rename = "Excluded_Voxels")]
    ExcludedVoxels,
}

/// One dropdown entry as sent to the page
#[derive(Debug, Clone, Serialize)]
pub struct StatisticOption {
    pub label: &'static str,
    pub value: &'static str,
}

impl Statistic {
    /// Dropdown order
    pub const ALL: [Statistic; 6] = [
        Statistic::Mean,
        Statistic::StdDev,
        Statistic::Min,
        Statistic::Max,
        Statistic::Voxels,
        Statistic::ExcludedVoxels,
    ];

    /// Dataset column holding this statistic
    pub fn column(self) -> &'static str {
        match self {
            Statistic::Mean => "Mean",
            Statistic::StdDev => "Std_dev",
            Statistic::Min => "Min",
            Statistic::Max => "Max",
            Statistic::Voxels => "Voxels",
            Statistic::ExcludedVoxels => "Excluded_Voxels",
        }
    }

    /// Human-readable label shown in the dropdown
    pub fn label(self) -> &'static str {
        match self {
            Statistic::Mean => "Mean",
            Statistic::StdDev => "Standard deviation",
            Statistic::Min => "Minimum",
            Statistic::Max => "Maximum",
            Statistic::Voxels => "Voxels",
            Statistic::ExcludedVoxels => "Excluded voxels (percentage)",
        }
    }

    /// Y-axis title; differs from the label only for the excluded-voxel percentage
    pub fn axis_label(self) -> &'static str {
        match self {
            Statistic::ExcludedVoxels => "Percentage of voxels excluded",
            other => other.label(),
        }
    }

    pub fn options() -> Vec<StatisticOption> {
        Self::ALL
            .iter()
            .map(|s| StatisticOption {
                label: s.label(),
                value: s.column(),
            })
            .collect()
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.column())
    }
}

impl FromStr for Statistic {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|stat| stat.column() == s.trim())
            .ok_or_else(|| DashboardError::InvalidStatistic(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_mean() {
        assert_eq!(Statistic::default(), Statistic::Mean);
    }

    #[test]
    fn test_parse_known_values() {
        assert_eq!("Std_dev".parse::<Statistic>().unwrap(), Statistic::StdDev);
        assert_eq!(" Excluded_Voxels ".parse::<Statistic>().unwrap(), Statistic::ExcludedVoxels);
    }

    #[test]
    fn test_parse_rejects_labels_and_unknowns() {
        // Labels are for display only; the value is the column name
        assert_eq!(
            "Standard deviation".parse::<Statistic>(),
            Err(DashboardError::InvalidStatistic("Standard deviation".to_string()))
        );
        assert!("Median".parse::<Statistic>().is_err());
    }

    #[test]
    fn test_axis_label_override() {
        assert_eq!(Statistic::ExcludedVoxels.axis_label(), "Percentage of voxels excluded");
        assert_eq!(Statistic::StdDev.axis_label(), "Standard deviation");
    }

    #[test]
    fn test_serde_uses_column_names() {
        let json = serde_json::to_string(&Statistic::ExcludedVoxels).unwrap();
        assert_eq!(json, "\"Excluded_Voxels\"");
        let back: Statistic = serde_json::from_str("\"Max\"").unwrap();
        assert_eq!(back, Statistic::Max);
        assert_eq!(Statistic::options().len(), 6);
    }
}
