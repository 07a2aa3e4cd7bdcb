//! The search driver and its public entry points.
//!
//! [`grid_search`] walks every candidate of every grid; [`randomized_search`]
//! samples a fixed number of candidates from one grid. Both evaluate
//! candidates sequentially through [`CandidateEvaluator`], track the best
//! under metric-direction-aware comparison and report it as typed option
//! maps.

use std::collections::BTreeMap;

use rayon::ThreadPool;
use serde_json::Value;

use crate::backend::{CvResult, TrainingBackend};
use crate::error::{Error, Result};
use crate::evaluate::{CandidateEvaluator, EvalMode, QuantizationParams};
use crate::logger::{log_final_quality, log_grid_header, SearchLogger};
use crate::options::{BaseOptions, CrossValidationParams, TrainTestSplitParams};
use crate::product::{CandidateIterator, GridIterator, SampledGridIterator};
use crate::random::GeneratorRegistry;
use crate::space::{parse_param_grid, ParsedGrid, QuantizationGridInfo};
use crate::value::{ParamValue, PlainOptions};

/// Flags shared by both entry points.
#[derive(Clone, Copy, Debug)]
pub struct SearchOptions {
    /// Evaluate candidates on a train/test split instead of cross-validation.
    pub use_train_test: bool,
    /// Attach cross-validation statistics for the best candidate to the result.
    pub return_cv_stat: bool,
    /// Logging period in candidates; zero or negative disables logging.
    pub verbose: i32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            use_train_test: false,
            return_cv_stat: false,
            verbose: 1,
        }
    }
}

/// The best candidate of a finished search, as typed option maps.
///
/// Quantization axes appear only when the grid actually enumerated them,
/// under the alias the grid used.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BestOptionValues {
    /// Boolean options by name.
    pub bool_options: BTreeMap<String, bool>,
    /// Signed integer options by name.
    pub int_options: BTreeMap<String, i64>,
    /// Unsigned integer options by name.
    pub uint_options: BTreeMap<String, u64>,
    /// Floating-point options by name.
    pub double_options: BTreeMap<String, f64>,
    /// String options by name.
    pub string_options: BTreeMap<String, String>,
    /// Cross-validation trajectories for the best candidate, when requested.
    pub cv_results: Vec<CvResult>,
}

impl BestOptionValues {
    /// Distributes the named options of the winning candidate over the
    /// typed maps, replacing previous contents.
    fn set_from_plain(&mut self, plain: &PlainOptions, names: &[String]) -> Result<()> {
        self.bool_options.clear();
        self.int_options.clear();
        self.uint_options.clear();
        self.double_options.clear();
        self.string_options.clear();
        for name in names {
            let value = plain.get(name).ok_or_else(|| {
                Error::internal(format!("best candidate lost option '{name}'"))
            })?;
            match value {
                ParamValue::Bool(v) => {
                    self.bool_options.insert(name.clone(), *v);
                }
                ParamValue::Int(v) => {
                    self.int_options.insert(name.clone(), *v);
                }
                ParamValue::UInt(v) => {
                    self.uint_options.insert(name.clone(), *v);
                }
                ParamValue::Float(v) => {
                    self.double_options.insert(name.clone(), *v);
                }
                ParamValue::Str(v) => {
                    self.string_options.insert(name.clone(), v.clone());
                }
            }
        }
        Ok(())
    }

    /// Adds the quantization axes the grid enumerated, under their grid names.
    fn set_quantization(&mut self, params: &QuantizationParams, info: &QuantizationGridInfo) {
        if info.bin_count_in_grid {
            self.int_options
                .insert(info.bin_count_name.clone(), params.bin_count);
        }
        if info.border_type_in_grid {
            self.string_options
                .insert(info.border_type_name.clone(), params.border_type.to_string());
        }
        if info.nan_mode_in_grid {
            self.string_options
                .insert(info.nan_mode_name.clone(), params.nan_mode.to_string());
        }
    }
}

/// Best candidate of one grid, with everything needed for reporting and
/// the final quality estimate.
struct GridOutcome<Q> {
    metric: f64,
    sign: f64,
    plain: PlainOptions,
    other_names: Vec<String>,
    info: QuantizationGridInfo,
    quantization: QuantizationParams,
    quantized: Q,
    cv_results: Vec<CvResult>,
}

fn collect_grids(param_grid: &Value) -> Result<Vec<&serde_json::Map<String, Value>>> {
    match param_grid {
        Value::Object(map) => Ok(vec![map]),
        Value::Array(list) => {
            if list.is_empty() {
                return Err(Error::config("empty list of parameter grids"));
            }
            list.iter()
                .map(|entry| {
                    entry.as_object().ok_or_else(|| {
                        Error::config("every parameter grid should be a JSON object")
                    })
                })
                .collect()
        }
        _ => Err(Error::config(
            "parameter grid should be a JSON object or an array of objects",
        )),
    }
}

fn build_pool(base: &BaseOptions) -> Result<ThreadPool> {
    // The calling thread acts as the last worker, so the pool gets one
    // thread fewer than the configured budget.
    let workers = base.num_threads.saturating_sub(1).max(1) as usize;
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| Error::internal(format!("failed to build worker pool: {e}")))
}

fn check_preconditions<B: TrainingBackend>(
    base: &BaseOptions,
    data: &B::Data,
    backend: &B,
    search: &SearchOptions,
) -> Result<()> {
    if base.save_snapshot {
        return Err(Error::config(
            "snapshots are not supported during parameter search",
        ));
    }
    if search.use_train_test && backend.is_ordered(data) {
        return Err(Error::config(
            "parameter search for ordered objects data is not supported",
        ));
    }
    Ok(())
}

/// Shuffle seed and flag of the active evaluation mode.
fn shuffle_request(
    search: &SearchOptions,
    split_params: &TrainTestSplitParams,
    cv_params: &CrossValidationParams,
) -> (bool, u64) {
    if search.use_train_test {
        (split_params.shuffle, split_params.partition_rand_seed)
    } else {
        (cv_params.shuffle, cv_params.partition_rand_seed)
    }
}

/// Runs one tuning loop over a prepared grid and returns its best candidate.
#[allow(clippy::too_many_arguments)]
fn run_grid<B: TrainingBackend, I: CandidateIterator>(
    backend: &mut B,
    data: &B::Data,
    pool: &ThreadPool,
    mode: EvalMode<'_>,
    iterator: &mut I,
    other_names: Vec<String>,
    info: QuantizationGridInfo,
    model_params: &PlainOptions,
    registry: &GeneratorRegistry,
    verbose: i32,
) -> Result<GridOutcome<B::Quantized>> {
    let mut logger = SearchLogger::new(verbose, iterator.total_count());
    let mut evaluator = CandidateEvaluator::new(backend, data, pool, mode);

    let mut best: Option<GridOutcome<B::Quantized>> = None;
    let mut best_metric = 0.0f64;
    let mut best_index = 0u64;
    let mut index = 0u64;
    while let Some(candidate) = iterator.next_candidate() {
        logger.start_candidate();
        let outcome = evaluator.evaluate(&candidate, &other_names, model_params, registry)?;
        if index == 0 {
            // Seed the running best one step beyond the first metric so the
            // first candidate always wins the comparison below.
            best_metric = outcome.metric + outcome.sign;
        }
        let metric = outcome.metric;
        let description = outcome.metric_description.clone();
        if outcome.sign * outcome.metric < outcome.sign * best_metric {
            best_metric = outcome.metric;
            best_index = index;
            best = Some(GridOutcome {
                metric: outcome.metric,
                sign: outcome.sign,
                plain: outcome.plain,
                other_names: other_names.clone(),
                info: info.clone(),
                quantization: outcome.quantization,
                quantized: outcome.quantized,
                cv_results: outcome.cv_results,
            });
        }
        logger.candidate(index, &description, metric, best_metric, best_index);
        index += 1;
    }

    // Unreachable for finite metrics: the first candidate always wins the
    // seeded comparison. NaN metrics reject every comparison and land here.
    best.ok_or_else(|| Error::internal("failed to select a best candidate"))
}

/// Attaches CV statistics to the result: train/test searches estimate the
/// best candidate's quality with one closing cross-validation on its
/// preserved quantized data, CV searches reuse the trace gathered while
/// searching.
fn attach_cv_results<B: TrainingBackend>(
    best_values: &mut BestOptionValues,
    best: GridOutcome<B::Quantized>,
    backend: &mut B,
    cv_params: &CrossValidationParams,
    pool: &ThreadPool,
    search: &SearchOptions,
) -> Result<()> {
    if !(search.return_cv_stat || search.use_train_test) {
        return Ok(());
    }
    if search.use_train_test {
        log_final_quality(search.verbose);
        let options = backend.parse_options(&best.plain)?;
        best_values.cv_results =
            backend.cross_validate(&options, &best.quantized, cv_params, pool)?;
    } else {
        best_values.cv_results = best.cv_results;
    }
    Ok(())
}

fn eval_mode<'p>(
    search: &SearchOptions,
    split_params: &'p TrainTestSplitParams,
    cv_params: &'p CrossValidationParams,
) -> EvalMode<'p> {
    if search.use_train_test {
        EvalMode::TrainTest(split_params)
    } else {
        EvalMode::CrossValidation(cv_params)
    }
}

/// Exhaustively searches one or more parameter grids and returns the best
/// candidate's options.
///
/// `param_grid` is either a JSON object mapping option names to arrays of
/// candidate values, or an array of such objects; with several grids the
/// overall winner is the best grid winner under the metric's direction,
/// earlier grids winning ties.
///
/// # Errors
///
/// [`Error::Config`] for malformed grids, oversized products, snapshots
/// requested or ordered data with train/test evaluation;
/// [`Error::Data`] and [`Error::Trainer`] propagate collaborator failures
/// and abort the search at the failing candidate.
#[allow(clippy::too_many_arguments)]
pub fn grid_search<B: TrainingBackend>(
    param_grid: &Value,
    base: &BaseOptions,
    split_params: &TrainTestSplitParams,
    cv_params: &CrossValidationParams,
    data: &B::Data,
    backend: &mut B,
    search: &SearchOptions,
) -> Result<BestOptionValues> {
    let registry = GeneratorRegistry::new();
    let grids = collect_grids(param_grid)?;
    check_preconditions(base, data, backend, search)?;
    let pool = build_pool(base)?;

    let (shuffle, seed) = shuffle_request(search, split_params, cv_params);
    let shuffled;
    let data = if shuffle {
        shuffled = backend.shuffle(data, seed)?;
        &shuffled
    } else {
        data
    };

    let mut global: Option<GridOutcome<B::Quantized>> = None;
    for (grid_index, grid) in grids.iter().enumerate() {
        if grids.len() > 1 {
            log_grid_header(search.verbose, grid_index);
        }
        let mut model_params = base.plain.clone();
        let ParsedGrid {
            value_sets,
            other_names,
            info,
        } = parse_param_grid(grid, base, &mut model_params, &registry)?;
        let mut iterator = GridIterator::new(value_sets)?;
        let outcome = run_grid(
            backend,
            data,
            &pool,
            eval_mode(search, split_params, cv_params),
            &mut iterator,
            other_names,
            info,
            &model_params,
            &registry,
            search.verbose,
        )?;
        let improves = match &global {
            None => true,
            Some(current) => outcome.sign * outcome.metric < current.sign * current.metric,
        };
        if improves {
            global = Some(outcome);
        }
    }

    let best = global.ok_or_else(|| Error::internal("no grid produced a candidate"))?;
    let mut best_values = BestOptionValues::default();
    best_values.set_from_plain(&best.plain, &best.other_names)?;
    best_values.set_quantization(&best.quantization, &best.info);
    attach_cv_results(&mut best_values, best, backend, cv_params, &pool, search)?;
    Ok(best_values)
}

/// Samples `num_tries` candidates from one parameter grid and returns the
/// best candidate's options.
///
/// With a grid list only the first grid is searched. Values referencing
/// generators from `registry` are resolved to fresh samples at every
/// evaluation; a non-empty registry therefore also allows the sampler to
/// revisit the same index tuple.
///
/// # Errors
///
/// [`Error::Config`] when `num_tries` is zero, plus everything
/// [`grid_search`] reports.
#[allow(clippy::too_many_arguments)]
pub fn randomized_search<B: TrainingBackend>(
    num_tries: u32,
    registry: &GeneratorRegistry,
    param_grid: &Value,
    base: &BaseOptions,
    split_params: &TrainTestSplitParams,
    cv_params: &CrossValidationParams,
    data: &B::Data,
    backend: &mut B,
    search: &SearchOptions,
) -> Result<BestOptionValues> {
    let grids = collect_grids(param_grid)?;
    check_preconditions(base, data, backend, search)?;
    let pool = build_pool(base)?;

    let (shuffle, seed) = shuffle_request(search, split_params, cv_params);
    let shuffled;
    let data = if shuffle {
        shuffled = backend.shuffle(data, seed)?;
        &shuffled
    } else {
        data
    };

    let mut model_params = base.plain.clone();
    let ParsedGrid {
        value_sets,
        other_names,
        info,
    } = parse_param_grid(grids[0], base, &mut model_params, registry)?;
    let mut iterator = SampledGridIterator::new(
        value_sets,
        num_tries,
        !registry.is_empty(),
        seed,
    )?;
    let best = run_grid(
        backend,
        data,
        &pool,
        eval_mode(search, split_params, cv_params),
        &mut iterator,
        other_names,
        info,
        &model_params,
        registry,
        search.verbose,
    )?;

    let mut best_values = BestOptionValues::default();
    best_values.set_from_plain(&best.plain, &best.other_names)?;
    best_values.set_quantization(&best.quantization, &best.info);
    attach_cv_results(&mut best_values, best, backend, cv_params, &pool, search)?;
    Ok(best_values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collect_grids_accepts_object_and_array() {
        let single = json!({"depth": [4, 6]});
        assert_eq!(collect_grids(&single).unwrap().len(), 1);

        let list = json!([{"depth": [4]}, {"depth": [6]}]);
        assert_eq!(collect_grids(&list).unwrap().len(), 2);
    }

    #[test]
    fn test_collect_grids_rejects_other_shapes() {
        assert!(collect_grids(&json!([])).is_err());
        assert!(collect_grids(&json!(["depth"])).is_err());
        assert!(collect_grids(&json!(42)).is_err());
    }

    #[test]
    fn test_best_values_spread_over_typed_maps() {
        let mut plain = PlainOptions::new();
        plain.insert("boost_from_average".into(), ParamValue::Bool(true));
        plain.insert("random_seed".into(), ParamValue::Int(-1));
        plain.insert("depth".into(), ParamValue::UInt(6));
        plain.insert("learning_rate".into(), ParamValue::Float(0.03));
        plain.insert("loss_function".into(), ParamValue::Str("Logloss".into()));

        let names: Vec<String> = plain.keys().cloned().collect();
        let mut best = BestOptionValues::default();
        best.set_from_plain(&plain, &names).unwrap();

        assert_eq!(best.bool_options["boost_from_average"], true);
        assert_eq!(best.int_options["random_seed"], -1);
        assert_eq!(best.uint_options["depth"], 6);
        assert_eq!(best.double_options["learning_rate"], 0.03);
        assert_eq!(best.string_options["loss_function"], "Logloss");
    }
}
