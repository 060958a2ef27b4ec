//! Error conditions raised by the dashboard core

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DashboardError {
    #[error("invalid statistic '{0}'; expected one of Mean, Std_dev, Min, Max, Voxels, Excluded_Voxels")]
    InvalidStatistic(String),

    #[error("selection references rows not present in the dataset: {0:?}")]
    StaleSelection(Vec<usize>),

    #[error("no Conf_Int* column in dataset; error bars omitted")]
    MissingConfidenceIntervalColumn,

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("unknown row id {0}")]
    UnknownRow(usize),

    #[error("invalid filter expression: {0}")]
    InvalidFilter(String),
}
