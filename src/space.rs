//! Search-space parsing and normalization.
//!
//! A grid arrives as a JSON object mapping option names to arrays of
//! candidate values. Parsing splits it into the three quantization axes
//! (recognized under aliases, defaulted from the base options when absent)
//! followed by every remaining axis in map-iteration order, producing the
//! ordered value sets the product enumerator runs over.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::options::BaseOptions;
use crate::random::{is_random_distribution_ref, GeneratorRegistry};
use crate::value::{ParamValue, PlainOptions};

/// Aliases for the feature-bin-count axis, scanned left to right.
const BIN_COUNT_ALIASES: &[&str] = &["border_count", "max_bin"];
/// Aliases for the border-selection-type axis.
const BORDER_TYPE_ALIASES: &[&str] = &["feature_border_type"];
/// Aliases for the missing-value-handling axis.
const NAN_MODE_ALIASES: &[&str] = &["nan_mode"];

/// Which quantization axes the grid enumerates, and under which names.
///
/// Axes absent from the grid stay fixed at the base options' value and are
/// not reported back among the best option values.
#[derive(Clone, Debug)]
pub struct QuantizationGridInfo {
    /// Bin count was enumerated by the grid.
    pub bin_count_in_grid: bool,
    /// Border type was enumerated by the grid.
    pub border_type_in_grid: bool,
    /// Nan mode was enumerated by the grid.
    pub nan_mode_in_grid: bool,
    /// Name the grid used for the bin-count axis.
    pub bin_count_name: String,
    /// Name the grid used for the border-type axis.
    pub border_type_name: String,
    /// Name the grid used for the nan-mode axis.
    pub nan_mode_name: String,
}

impl Default for QuantizationGridInfo {
    fn default() -> Self {
        Self {
            bin_count_in_grid: false,
            border_type_in_grid: false,
            nan_mode_in_grid: false,
            bin_count_name: BIN_COUNT_ALIASES[0].to_string(),
            border_type_name: BORDER_TYPE_ALIASES[0].to_string(),
            nan_mode_name: NAN_MODE_ALIASES[0].to_string(),
        }
    }
}

/// One grid, normalized for enumeration.
///
/// `value_sets[0..3]` are always the quantization axes (bin count, border
/// type, nan mode); `value_sets[3..]` line up 1:1 with `other_names`.
#[derive(Debug)]
pub struct ParsedGrid {
    /// Ordered candidate value sets, quantization axes first.
    pub value_sets: Vec<Vec<ParamValue>>,
    /// Names of the non-quantization axes, in enumeration order.
    pub other_names: Vec<String>,
    /// Presence record for the quantization axes.
    pub info: QuantizationGridInfo,
}

fn numeric_or_ref(value: &ParamValue) -> bool {
    matches!(
        value,
        ParamValue::Int(_) | ParamValue::UInt(_) | ParamValue::Float(_)
    ) || value.as_str().is_some_and(is_random_distribution_ref)
}

fn string_or_ref(value: &ParamValue) -> bool {
    matches!(value, ParamValue::Str(_))
}

/// Converts one grid entry into typed values, enforcing the axis type rule
/// and generator registration.
fn parse_value_set(
    name: &str,
    values: &Value,
    allowed: fn(&ParamValue) -> bool,
    registry: &GeneratorRegistry,
) -> Result<Vec<ParamValue>> {
    let Value::Array(values) = values else {
        return Err(Error::config(format!(
            "parameter '{name}' should map to an array of values"
        )));
    };
    if values.is_empty() {
        return Err(Error::config(format!(
            "empty set of values for parameter '{name}'"
        )));
    }
    let mut parsed = Vec::with_capacity(values.len());
    for value in values {
        let typed = ParamValue::from_json(value)
            .map_err(|_| Error::config(format!("can't parse parameter '{name}' with value: {value}")))?;
        if !allowed(&typed) {
            return Err(Error::config(format!(
                "can't parse parameter '{name}' with value: {value}"
            )));
        }
        if let Some(reference) = typed.as_str() {
            if is_random_distribution_ref(reference) && !registry.contains(reference) {
                return Err(Error::config(format!(
                    "reference to unknown random distribution generator: '{reference}'"
                )));
            }
        }
        parsed.push(typed);
    }
    Ok(parsed)
}

/// Pulls one quantization axis out of the grid under its first matching
/// alias, or synthesizes a singleton from the base options' value.
///
/// A matched alias is removed from both the grid and the per-candidate
/// option map so it is not re-parsed as an ordinary axis.
fn extract_axis(
    aliases: &[&str],
    fixed_value: ParamValue,
    allowed: fn(&ParamValue) -> bool,
    grid: &mut serde_json::Map<String, Value>,
    model_params: &mut PlainOptions,
    registry: &GeneratorRegistry,
) -> Result<(Vec<ParamValue>, bool, String)> {
    for &alias in aliases {
        let Some(values) = grid.get(alias) else {
            continue;
        };
        let parsed = parse_value_set(alias, values, allowed, registry)?;
        grid.remove(alias);
        model_params.remove(alias);
        return Ok((parsed, true, alias.to_string()));
    }
    Ok((vec![fixed_value], false, aliases[0].to_string()))
}

/// Splits a grid into ordered value sets.
///
/// `model_params` is the per-grid copy of the base option map; matched
/// quantization aliases are removed from it here.
pub(crate) fn parse_param_grid(
    grid: &serde_json::Map<String, Value>,
    base: &BaseOptions,
    model_params: &mut PlainOptions,
    registry: &GeneratorRegistry,
) -> Result<ParsedGrid> {
    let mut grid = grid.clone();
    let mut info = QuantizationGridInfo::default();

    let (bin_counts, bin_in_grid, bin_name) = extract_axis(
        BIN_COUNT_ALIASES,
        ParamValue::UInt(u64::from(base.binarization.border_count)),
        numeric_or_ref,
        &mut grid,
        model_params,
        registry,
    )?;
    info.bin_count_in_grid = bin_in_grid;
    info.bin_count_name = bin_name;

    let (border_types, border_in_grid, border_name) = extract_axis(
        BORDER_TYPE_ALIASES,
        ParamValue::Str(base.binarization.border_type.to_string()),
        string_or_ref,
        &mut grid,
        model_params,
        registry,
    )?;
    info.border_type_in_grid = border_in_grid;
    info.border_type_name = border_name;

    let (nan_modes, nan_in_grid, nan_name) = extract_axis(
        NAN_MODE_ALIASES,
        ParamValue::Str(base.binarization.nan_mode.to_string()),
        string_or_ref,
        &mut grid,
        model_params,
        registry,
    )?;
    info.nan_mode_in_grid = nan_in_grid;
    info.nan_mode_name = nan_name;

    let mut value_sets = vec![bin_counts, border_types, nan_modes];
    let mut other_names = Vec::new();
    for (name, values) in &grid {
        let parsed = parse_value_set(name, values, |_| true, registry)?;
        other_names.push(name.clone());
        value_sets.push(parsed);
    }

    Ok(ParsedGrid {
        value_sets,
        other_names,
        info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn grid_map(value: Value) -> serde_json::Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected a JSON object, got {other}"),
        }
    }

    fn parse(
        grid: Value,
        base: &BaseOptions,
        registry: &GeneratorRegistry,
    ) -> Result<(ParsedGrid, PlainOptions)> {
        let mut model_params = base.plain.clone();
        let parsed = parse_param_grid(&grid_map(grid), base, &mut model_params, registry)?;
        Ok((parsed, model_params))
    }

    #[test]
    fn test_quantization_axes_always_lead() {
        let base = BaseOptions::default();
        let registry = GeneratorRegistry::new();
        let (parsed, _) = parse(
            json!({"learning_rate": [0.03, 0.1]}),
            &base,
            &registry,
        )
        .unwrap();

        assert_eq!(parsed.value_sets.len(), 4);
        assert_eq!(parsed.other_names, vec!["learning_rate"]);
        // Fixed axes collapse to singletons holding the base values.
        assert_eq!(parsed.value_sets[0], vec![ParamValue::UInt(254)]);
        assert_eq!(
            parsed.value_sets[1],
            vec![ParamValue::Str("GreedyLogSum".into())]
        );
        assert_eq!(parsed.value_sets[2], vec![ParamValue::Str("Min".into())]);
        assert!(!parsed.info.bin_count_in_grid);
    }

    #[test]
    fn test_bin_count_alias_is_extracted() {
        let mut base = BaseOptions::default();
        base.plain
            .insert("border_count".into(), ParamValue::UInt(128));
        let registry = GeneratorRegistry::new();
        let (parsed, model_params) = parse(
            json!({"border_count": [32, 64], "depth": [4, 6]}),
            &base,
            &registry,
        )
        .unwrap();

        assert!(parsed.info.bin_count_in_grid);
        assert_eq!(parsed.info.bin_count_name, "border_count");
        assert_eq!(
            parsed.value_sets[0],
            vec![ParamValue::UInt(32), ParamValue::UInt(64)]
        );
        assert_eq!(parsed.other_names, vec!["depth"]);
        // The matched alias must not survive in the per-candidate options.
        assert!(!model_params.contains_key("border_count"));
    }

    #[test]
    fn test_max_bin_alias_is_recognized() {
        let base = BaseOptions::default();
        let registry = GeneratorRegistry::new();
        let (parsed, _) = parse(json!({"max_bin": [16]}), &base, &registry).unwrap();

        assert!(parsed.info.bin_count_in_grid);
        assert_eq!(parsed.info.bin_count_name, "max_bin");
        assert!(parsed.other_names.is_empty());
    }

    #[test]
    fn test_first_alias_wins_over_second() {
        let base = BaseOptions::default();
        let registry = GeneratorRegistry::new();
        let (parsed, _) = parse(
            json!({"border_count": [32], "max_bin": [64]}),
            &base,
            &registry,
        )
        .unwrap();

        // `border_count` claims the axis; `max_bin` stays an ordinary axis.
        assert_eq!(parsed.info.bin_count_name, "border_count");
        assert_eq!(parsed.other_names, vec!["max_bin"]);
    }

    #[test]
    fn test_empty_value_set_is_rejected() {
        let base = BaseOptions::default();
        let registry = GeneratorRegistry::new();
        let err = parse(json!({"border_count": []}), &base, &registry).unwrap_err();
        assert!(matches!(&err, Error::Config(msg) if msg.contains("empty set of values")));

        let err = parse(json!({"depth": []}), &base, &registry).unwrap_err();
        assert!(matches!(&err, Error::Config(msg) if msg.contains("empty set of values")));
    }

    #[test]
    fn test_wrong_axis_type_is_rejected() {
        let base = BaseOptions::default();
        let registry = GeneratorRegistry::new();
        assert!(parse(json!({"border_count": [true]}), &base, &registry).is_err());
        assert!(parse(json!({"feature_border_type": [3]}), &base, &registry).is_err());
        assert!(parse(json!({"depth": [[1, 2]]}), &base, &registry).is_err());
        assert!(parse(json!({"depth": 6}), &base, &registry).is_err());
    }

    #[test]
    fn test_unregistered_generator_reference_is_rejected() {
        let base = BaseOptions::default();
        let registry = GeneratorRegistry::new();
        let err = parse(
            json!({"learning_rate": ["CustomRandomDistributionGenerator_lr"]}),
            &base,
            &registry,
        )
        .unwrap_err();
        assert!(matches!(&err, Error::Config(msg) if msg.contains("unknown random distribution")));
    }

    #[test]
    fn test_registered_generator_reference_is_accepted() {
        let base = BaseOptions::default();
        let mut registry = GeneratorRegistry::new();
        registry.register("CustomRandomDistributionGenerator_lr", || 0.05);
        let (parsed, _) = parse(
            json!({"learning_rate": ["CustomRandomDistributionGenerator_lr"],
                   "border_count": ["CustomRandomDistributionGenerator_lr"]}),
            &base,
            &registry,
        )
        .unwrap();
        assert!(parsed.info.bin_count_in_grid);
        assert_eq!(parsed.other_names, vec!["learning_rate"]);
    }

    #[test]
    fn test_other_axes_follow_map_iteration_order() {
        let base = BaseOptions::default();
        let registry = GeneratorRegistry::new();
        let (parsed, _) = parse(
            json!({"learning_rate": [0.1], "depth": [4], "l2_leaf_reg": [1.0]}),
            &base,
            &registry,
        )
        .unwrap();
        // serde_json maps iterate lexicographically; the order is fixed at
        // parse time for the rest of the search.
        assert_eq!(
            parsed.other_names,
            vec!["depth", "l2_leaf_reg", "learning_rate"]
        );
    }
}
