//! Hyperparameter search for gradient-boosted tree trainers.
//!
//! Given a search space over training options — including the feature
//! quantization settings — this crate enumerates candidate configurations,
//! has a training backend evaluate each one, and reports the best candidate
//! under the primary metric's own direction. It supports:
//!
//! - Exhaustive grid search over one grid or a list of grids
//! - Randomized search: a fixed number of uniform draws, without
//!   replacement by default
//! - Deferred-random values resolved through caller-supplied generators
//! - Reuse of quantized training data across candidates that share
//!   quantization settings
//!
//! # Search spaces
//!
//! A search space is a JSON object mapping option names to arrays of
//! candidate values (or an array of such objects for a grid list):
//!
//! ```
//! let space = serde_json::json!({
//!     "border_count": [32, 64, 128],
//!     "learning_rate": [0.03, 0.1],
//!     "depth": [4, 6, 8],
//! });
//! # let _ = space;
//! ```
//!
//! The three feature-quantization axes (`border_count`/`max_bin`,
//! `feature_border_type`, `nan_mode`) are recognized by name. Candidates
//! that only differ in non-quantization options reuse the previously
//! quantized data, so ordering the traversal by quantization settings —
//! which the enumeration does by construction — keeps requantization down
//! to one run per distinct setting.
//!
//! # Evaluation
//!
//! Every expensive step goes through the [`TrainingBackend`] trait: options
//! parsing, shuffling, quantization, splitting, training and
//! cross-validation. [`grid_search`] and [`randomized_search`] drive a
//! backend either in cross-validation mode or on a single train/test split
//! (see [`SearchOptions`]), and return [`BestOptionValues`]: the winning
//! options spread over per-type maps plus optional CV statistics.
//!
//! # Determinism
//!
//! With fixed partition seeds and no registered random generators, the
//! candidate sequence, the sampled index set and the chosen best are fully
//! reproducible.

mod backend;
mod error;
mod evaluate;
mod logger;
mod options;
mod product;
mod random;
mod search;
mod space;
mod value;

pub use backend::{CvResult, TrainingBackend};
pub use error::{Error, Result};
pub use evaluate::QuantizationParams;
pub use options::{
    metric_sign, BaseOptions, BinarizationOptions, BorderSelectionType, CrossValidationParams,
    MetricBestValue, NanMode, TrainTestSplitParams,
};
pub use product::{CandidateIterator, GridIterator, ProductEnumerator, SampledGridIterator};
pub use random::{
    is_random_distribution_ref, GeneratorRegistry, RANDOM_DISTRIBUTION_PREFIX,
};
pub use search::{grid_search, randomized_search, BestOptionValues, SearchOptions};
pub use space::QuantizationGridInfo;
pub use value::{ParamValue, PlainOptions};
