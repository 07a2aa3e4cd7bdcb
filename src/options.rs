//! Training options the search engine reads directly.
//!
//! Only the slice of the trainer's configuration the driver itself needs
//! lives here: the feature-binarization defaults that seed fixed
//! quantization axes, partitioning parameters for the two evaluation modes,
//! and the metric-direction contract of the metric library.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::PlainOptions;

/// How borders between feature bins are selected during quantization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BorderSelectionType {
    /// Borders at quantile medians.
    Median,
    /// Greedy selection maximizing the log-sum of bucket weights.
    GreedyLogSum,
    /// Mix of uniform and quantile borders.
    UniformAndQuantiles,
    /// Borders minimizing bucket entropy.
    MinEntropy,
    /// Selection maximizing the log-sum of bucket sizes.
    MaxLogSum,
    /// Evenly spaced borders.
    Uniform,
}

impl FromStr for BorderSelectionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Median" => Ok(Self::Median),
            "GreedyLogSum" => Ok(Self::GreedyLogSum),
            "UniformAndQuantiles" => Ok(Self::UniformAndQuantiles),
            "MinEntropy" => Ok(Self::MinEntropy),
            "MaxLogSum" => Ok(Self::MaxLogSum),
            "Uniform" => Ok(Self::Uniform),
            other => Err(Error::config(format!(
                "unknown feature border type: '{other}'"
            ))),
        }
    }
}

impl fmt::Display for BorderSelectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Median => "Median",
            Self::GreedyLogSum => "GreedyLogSum",
            Self::UniformAndQuantiles => "UniformAndQuantiles",
            Self::MinEntropy => "MinEntropy",
            Self::MaxLogSum => "MaxLogSum",
            Self::Uniform => "Uniform",
        };
        f.write_str(name)
    }
}

/// How missing feature values are handled during quantization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NanMode {
    /// Missing values are an error.
    Forbidden,
    /// Missing values sort below every present value.
    Min,
    /// Missing values sort above every present value.
    Max,
}

impl FromStr for NanMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Forbidden" => Ok(Self::Forbidden),
            "Min" => Ok(Self::Min),
            "Max" => Ok(Self::Max),
            other => Err(Error::config(format!("unknown nan mode: '{other}'"))),
        }
    }
}

impl fmt::Display for NanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Forbidden => "Forbidden",
            Self::Min => "Min",
            Self::Max => "Max",
        };
        f.write_str(name)
    }
}

/// Float-feature binarization settings.
///
/// These seed the singleton value sets for quantization axes the search
/// space leaves fixed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinarizationOptions {
    /// Number of feature bins.
    pub border_count: u32,
    /// Border selection algorithm.
    pub border_type: BorderSelectionType,
    /// Missing-value handling.
    pub nan_mode: NanMode,
}

impl Default for BinarizationOptions {
    fn default() -> Self {
        Self {
            border_count: 254,
            border_type: BorderSelectionType::GreedyLogSum,
            nan_mode: NanMode::Min,
        }
    }
}

/// The base training options a search starts from.
///
/// Immutable for the duration of a search. `plain` is the flat option map
/// the driver clones per grid and mutates per candidate before handing it
/// to the options parser.
#[derive(Clone, Debug, Default)]
pub struct BaseOptions {
    /// Flat option map (everything the trainer understands).
    pub plain: PlainOptions,
    /// Defaults for quantization axes that are not part of the grid.
    pub binarization: BinarizationOptions,
    /// Total thread budget; the trainer pool is sized one below it because
    /// the calling thread acts as the last worker.
    pub num_threads: u32,
    /// Whether training snapshots were requested. Snapshots cannot be
    /// combined with a parameter search.
    pub save_snapshot: bool,
}

/// Parameters for a single train/test split.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainTestSplitParams {
    /// Fraction of objects that goes into the train part.
    pub train_part: f64,
    /// Keep class proportions between the parts.
    pub stratified: bool,
    /// Shuffle objects before splitting.
    pub shuffle: bool,
    /// Seed for shuffling and partitioning.
    pub partition_rand_seed: u64,
}

impl Default for TrainTestSplitParams {
    fn default() -> Self {
        Self {
            train_part: 0.8,
            stratified: false,
            shuffle: true,
            partition_rand_seed: 0,
        }
    }
}

/// Parameters for cross-validation runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationParams {
    /// Number of folds.
    pub fold_count: u32,
    /// Train on the fold and evaluate on the rest.
    pub inverted: bool,
    /// Keep class proportions between folds.
    pub stratified: bool,
    /// Shuffle objects before partitioning.
    pub shuffle: bool,
    /// Seed for shuffling and partitioning.
    pub partition_rand_seed: u64,
}

impl Default for CrossValidationParams {
    fn default() -> Self {
        Self {
            fold_count: 5,
            inverted: false,
            stratified: false,
            shuffle: true,
            partition_rand_seed: 0,
        }
    }
}

/// What value a metric considers best, as reported by the metric library.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricBestValue {
    /// Smaller is better.
    Min,
    /// Larger is better.
    Max,
    /// Best at a fixed target value.
    FixedValue(f64),
    /// No usable ordering.
    Undefined,
}

/// Comparison sign for best-candidate selection: `+1` for minimized
/// metrics, `-1` for maximized ones, so that `sign * value` is always
/// minimized.
///
/// # Errors
///
/// Returns [`Error::Config`] for metrics that are neither minimized nor
/// maximized; those cannot drive a parameter search.
pub fn metric_sign(best_value: MetricBestValue) -> Result<f64> {
    match best_value {
        MetricBestValue::Min => Ok(1.0),
        MetricBestValue::Max => Ok(-1.0),
        MetricBestValue::FixedValue(_) | MetricBestValue::Undefined => Err(Error::config(
            "metric for parameter search must be minimized or maximized",
        )),
    }
}
