//! The contract between the search driver and the training system.
//!
//! The engine never trains a model itself. Everything expensive — data
//! shuffling, feature quantization, train/test splitting, training,
//! cross-validation, metric construction — is delegated through
//! [`TrainingBackend`]. The associated types keep the engine independent of
//! how the trainer represents datasets, quantized features and its typed
//! options tree.

use rayon::ThreadPool;

use crate::error::Result;
use crate::options::{BinarizationOptions, CrossValidationParams, MetricBestValue, TrainTestSplitParams};
use crate::value::PlainOptions;

/// Fold-averaged metric trajectories from one cross-validation run.
///
/// One instance per evaluated metric; the first entry always describes the
/// primary metric.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CvResult {
    /// Metric description, e.g. `"Logloss"`.
    pub metric: String,
    /// Mean train-side metric per boosting iteration.
    pub average_train: Vec<f64>,
    /// Mean held-out metric per boosting iteration.
    pub average_test: Vec<f64>,
    /// Standard deviation of the train-side metric per iteration.
    pub stddev_train: Vec<f64>,
    /// Standard deviation of the held-out metric per iteration.
    pub stddev_test: Vec<f64>,
}

/// External collaborators of the search driver.
///
/// Implementations wrap a concrete training system. All methods receive the
/// shared worker pool the driver sized from
/// [`BaseOptions::num_threads`](crate::BaseOptions::num_threads); the driver
/// itself evaluates candidates sequentially and never touches the pool.
///
/// Failures should use [`Error::Data`](crate::Error::Data) for violated data
/// preconditions and [`Error::Trainer`](crate::Error::Trainer) for training
/// or cross-validation failures; both abort the search unchanged.
pub trait TrainingBackend {
    /// Raw training dataset.
    type Data;
    /// Handle to quantized training data. Cloning must be cheap (a handle,
    /// not a deep copy): the driver keeps one per best candidate.
    type Quantized: Clone;
    /// Train/test providers produced by the splitter.
    type Split;
    /// The trainer's typed options tree.
    type Options;

    /// Converts a flat option map into the typed options tree.
    fn parse_options(&self, plain: &PlainOptions) -> Result<Self::Options>;

    /// Returns a shuffled copy of the dataset.
    fn shuffle(&mut self, data: &Self::Data, seed: u64) -> Result<Self::Data>;

    /// Whether the dataset carries an explicit object ordering. Ordered
    /// data cannot be split for a parameter search.
    fn is_ordered(&self, data: &Self::Data) -> bool;

    /// Quantizes the dataset with the given binarization settings.
    fn quantize(
        &mut self,
        data: &Self::Data,
        options: &Self::Options,
        binarization: &BinarizationOptions,
        pool: &ThreadPool,
    ) -> Result<Self::Quantized>;

    /// Splits quantized data into train/test providers.
    fn split(
        &mut self,
        quantized: &Self::Quantized,
        params: &TrainTestSplitParams,
        pool: &ThreadPool,
    ) -> Result<Self::Split>;

    /// Trains on the split and returns the best test-side value of the
    /// primary metric over all boosting iterations.
    fn evaluate_train_test(
        &mut self,
        options: &Self::Options,
        split: &Self::Split,
        pool: &ThreadPool,
    ) -> Result<f64>;

    /// Cross-validates on quantized data. The returned vector holds one
    /// entry per metric, the primary metric first.
    fn cross_validate(
        &mut self,
        options: &Self::Options,
        quantized: &Self::Quantized,
        params: &CrossValidationParams,
        pool: &ThreadPool,
    ) -> Result<Vec<CvResult>>;

    /// Direction of the primary metric under these options.
    fn metric_best_value(&self, options: &Self::Options) -> Result<MetricBestValue>;

    /// Human-readable description of the primary metric, used for logging.
    fn metric_description(&self, _options: &Self::Options) -> String {
        "loss".to_string()
    }
}
