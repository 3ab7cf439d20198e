//! Imputation module for handling missing values.
//!
//! Statistical imputation (median, mean, mode) plus row dropping for the
//! `Drop` strategies.

mod statistical;

pub use statistical::StatisticalImputer;
