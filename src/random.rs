//! Deferred-random placeholders and the generator registry.
//!
//! A search space may defer a coordinate to evaluation time by putting a
//! sentinel string into the value set instead of a concrete scalar. Each
//! time a candidate touches such a coordinate, the referenced generator is
//! invoked for a fresh sample, so repeated tuples can still explore
//! different concrete values.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::value::ParamValue;

/// Prefix marking a string value as a reference to a registered generator.
pub const RANDOM_DISTRIBUTION_PREFIX: &str = "CustomRandomDistributionGenerator";

/// Whether a string value refers to a registered random distribution.
#[must_use]
pub fn is_random_distribution_ref(value: &str) -> bool {
    value.starts_with(RANDOM_DISTRIBUTION_PREFIX)
}

type BoxedGenerator = Box<dyn FnMut() -> f64 + Send>;

/// Named sampling closures supplied by the caller.
///
/// Generators are `FnMut` so a closure can step through its own state
/// between samples; each one sits behind a mutex so the registry can be
/// shared by reference for the whole search.
#[derive(Default)]
pub struct GeneratorRegistry {
    generators: HashMap<String, Mutex<BoxedGenerator>>,
}

impl GeneratorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a generator under `name`. The name must carry the
    /// [`RANDOM_DISTRIBUTION_PREFIX`] for grid values to find it.
    pub fn register(&mut self, name: impl Into<String>, generator: impl FnMut() -> f64 + Send + 'static) {
        self.generators
            .insert(name.into(), Mutex::new(Box::new(generator)));
    }

    /// Whether no generators are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Whether `name` is a registered generator.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    /// Resolves one value: distribution references are replaced with a
    /// fresh sample, everything else passes through unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a reference to an unknown generator.
    pub fn resolve(&self, value: &ParamValue) -> Result<ParamValue> {
        if let ParamValue::Str(name) = value {
            if is_random_distribution_ref(name) {
                let generator = self.generators.get(name).ok_or_else(|| {
                    Error::config(format!(
                        "reference to unknown random distribution generator: '{name}'"
                    ))
                })?;
                let mut generator = generator.lock();
                return Ok(ParamValue::Float((*generator)()));
            }
        }
        Ok(value.clone())
    }
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("generators", &self.generators.keys().collect::<Vec<_>>())
            .finish()
    }
}
