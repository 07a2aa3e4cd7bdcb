//! Per-candidate evaluation.
//!
//! The evaluator owns the only mutable state of a tuning run: the last
//! applied quantization parameters together with the quantized data (and,
//! in train/test mode, the split) they produced. Consecutive candidates
//! that agree on all three quantization axes reuse that state, so the
//! external quantizer runs once per maximal run of equal triples instead of
//! once per candidate.

use rayon::ThreadPool;

use crate::backend::{CvResult, TrainingBackend};
use crate::error::{Error, Result};
use crate::options::{
    metric_sign, BinarizationOptions, BorderSelectionType, CrossValidationParams, NanMode,
    TrainTestSplitParams,
};
use crate::random::GeneratorRegistry;
use crate::value::{ParamValue, PlainOptions};

/// The three quantization axes of one candidate.
///
/// Equality of two of these decides whether cached quantized data can be
/// reused between adjacent candidates.
#[derive(Clone, Debug, PartialEq)]
pub struct QuantizationParams {
    /// Number of feature bins.
    pub bin_count: i64,
    /// Border selection algorithm.
    pub border_type: BorderSelectionType,
    /// Missing-value handling.
    pub nan_mode: NanMode,
}

/// How a candidate gets its metric.
#[derive(Clone, Copy, Debug)]
pub(crate) enum EvalMode<'p> {
    /// Train once on a split, take the best test-side metric value.
    TrainTest(&'p TrainTestSplitParams),
    /// Cross-validate, take the final fold-averaged test metric.
    CrossValidation(&'p CrossValidationParams),
}

/// Everything the driver needs to know about one evaluated candidate.
#[derive(Debug)]
pub(crate) struct EvaluatedCandidate<Q> {
    pub metric: f64,
    /// `+1` when the metric is minimized, `-1` when maximized.
    pub sign: f64,
    pub metric_description: String,
    /// The flat option map this candidate trained with.
    pub plain: PlainOptions,
    pub quantization: QuantizationParams,
    /// Handle to the quantized data this candidate trained on.
    pub quantized: Q,
    /// CV trajectories (cross-validation mode only).
    pub cv_results: Vec<CvResult>,
}

#[allow(clippy::cast_possible_truncation)]
fn bin_count_from(value: &ParamValue) -> Result<i64> {
    match value {
        ParamValue::Int(i) => Ok(*i),
        ParamValue::UInt(u) => i64::try_from(*u)
            .map_err(|_| Error::config(format!("bin count is out of range: {u}"))),
        ParamValue::Float(f) => Ok(*f as i64),
        other => Err(Error::config(format!(
            "bin count must be numeric, got: {other}"
        ))),
    }
}

fn enum_coordinate(value: &ParamValue, axis: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::config(format!("{axis} must be a string, got: {value}")))
}

/// Evaluates candidate tuples against the backend, reusing quantized data
/// across candidates with identical quantization parameters.
pub(crate) struct CandidateEvaluator<'a, B: TrainingBackend> {
    backend: &'a mut B,
    data: &'a B::Data,
    pool: &'a ThreadPool,
    mode: EvalMode<'a>,
    last_params: Option<QuantizationParams>,
    quantized: Option<B::Quantized>,
    split: Option<B::Split>,
}

impl<'a, B: TrainingBackend> CandidateEvaluator<'a, B> {
    pub(crate) fn new(
        backend: &'a mut B,
        data: &'a B::Data,
        pool: &'a ThreadPool,
        mode: EvalMode<'a>,
    ) -> Self {
        Self {
            backend,
            data,
            pool,
            mode,
            last_params: None,
            quantized: None,
            split: None,
        }
    }

    /// Evaluates one candidate tuple.
    ///
    /// `model_params` is the per-grid option map (quantization aliases
    /// already removed); the candidate's non-quantization coordinates are
    /// written into a copy of it under `other_names`, resolving deferred
    /// random placeholders on the way.
    pub(crate) fn evaluate(
        &mut self,
        candidate: &[ParamValue],
        other_names: &[String],
        model_params: &PlainOptions,
        registry: &GeneratorRegistry,
    ) -> Result<EvaluatedCandidate<B::Quantized>> {
        if candidate.len() != 3 + other_names.len() {
            return Err(Error::internal(format!(
                "candidate arity mismatch: got {} coordinates for {} axes",
                candidate.len(),
                3 + other_names.len()
            )));
        }

        let quantization = QuantizationParams {
            bin_count: bin_count_from(&registry.resolve(&candidate[0])?)?,
            border_type: enum_coordinate(&registry.resolve(&candidate[1])?, "feature border type")?
                .parse()?,
            nan_mode: enum_coordinate(&registry.resolve(&candidate[2])?, "nan mode")?.parse()?,
        };

        let mut plain = model_params.clone();
        for (name, value) in other_names.iter().zip(&candidate[3..]) {
            plain.insert(name.clone(), registry.resolve(value)?);
        }
        let options = self.backend.parse_options(&plain)?;

        if self.last_params.as_ref() != Some(&quantization) {
            let border_count = u32::try_from(quantization.bin_count)
                .map_err(|_| Error::config(format!(
                    "bin count must be a positive integer, got: {}",
                    quantization.bin_count
                )))?;
            let binarization = BinarizationOptions {
                border_count,
                border_type: quantization.border_type,
                nan_mode: quantization.nan_mode,
            };
            let quantized = self
                .backend
                .quantize(self.data, &options, &binarization, self.pool)?;
            if let EvalMode::TrainTest(split_params) = self.mode {
                self.split = Some(self.backend.split(&quantized, split_params, self.pool)?);
            }
            self.quantized = Some(quantized);
            self.last_params = Some(quantization.clone());
        }

        let (metric, cv_results) = match self.mode {
            EvalMode::TrainTest(_) => {
                let split = self
                    .split
                    .as_ref()
                    .ok_or_else(|| Error::internal("train/test split missing after quantization"))?;
                let metric = self.backend.evaluate_train_test(&options, split, self.pool)?;
                (metric, Vec::new())
            }
            EvalMode::CrossValidation(cv_params) => {
                let quantized = self
                    .quantized
                    .as_ref()
                    .ok_or_else(|| Error::internal("quantized data missing after quantization"))?;
                let results =
                    self.backend
                        .cross_validate(&options, quantized, cv_params, self.pool)?;
                let metric = results
                    .first()
                    .and_then(|r| r.average_test.last())
                    .copied()
                    .ok_or_else(|| {
                        Error::internal("cross-validation produced no metric trajectory")
                    })?;
                (metric, results)
            }
        };

        let sign = metric_sign(self.backend.metric_best_value(&options)?)?;
        let metric_description = self.backend.metric_description(&options);
        let quantized = self
            .quantized
            .clone()
            .ok_or_else(|| Error::internal("quantized data missing after evaluation"))?;

        Ok(EvaluatedCandidate {
            metric,
            sign,
            metric_description,
            plain,
            quantization,
            quantized,
            cv_results,
        })
    }
}
