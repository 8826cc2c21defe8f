//! Run-time selection of face interpolation schemes.
//!
//! Schemes are looked up by name through a registry built once per
//! process. New schemes are added by registering a constructor function,
//! there is no global side effect at link time.

use crate::error::{Result, WaveError};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Interpolates a cell quantity onto the face between two cells.
pub trait InterpolationScheme: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// `weight` is the linear weight of the owner cell,
    /// 0.5 when the face sits halfway between the two centres.
    fn interpolate(&self, owner: f64, neighbour: f64, weight: f64) -> f64;
}

/// Distance weighted average.
#[derive(Debug, Default, Clone, Copy)]
pub struct Linear;

impl InterpolationScheme for Linear {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn interpolate(&self, owner: f64, neighbour: f64, weight: f64) -> f64 {
        weight * owner + (1.0 - weight) * neighbour
    }
}

/// Plain average, ignores the geometric weight.
#[derive(Debug, Default, Clone, Copy)]
pub struct MidPoint;

impl InterpolationScheme for MidPoint {
    fn name(&self) -> &'static str {
        "midPoint"
    }

    fn interpolate(&self, owner: f64, neighbour: f64, _weight: f64) -> f64 {
        0.5 * (owner + neighbour)
    }
}

/// Weighted harmonic mean, the usual choice for jumps in a diffusivity.
/// Zero if either side is zero or negative.
#[derive(Debug, Default, Clone, Copy)]
pub struct Harmonic;

impl InterpolationScheme for Harmonic {
    fn name(&self) -> &'static str {
        "harmonic"
    }

    fn interpolate(&self, owner: f64, neighbour: f64, weight: f64) -> f64 {
        if owner <= 0.0 || neighbour <= 0.0 {
            return 0.0;
        }
        1.0 / (weight / owner + (1.0 - weight) / neighbour)
    }
}

pub type SchemeConstructor = fn() -> Box<dyn InterpolationScheme>;

#[derive(Debug, Clone, Default)]
pub struct SchemeRegistry {
    constructors: BTreeMap<&'static str, SchemeConstructor>,
}

impl SchemeRegistry {
    pub fn new() -> Self {
        SchemeRegistry {
            constructors: BTreeMap::new(),
        }
    }

    /// Registry holding the schemes shipped with the crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("linear", || Box::new(Linear));
        registry.register("midPoint", || Box::new(MidPoint));
        registry.register("harmonic", || Box::new(Harmonic));
        registry
    }

    /// Add or replace a constructor.
    pub fn register(&mut self, name: &'static str, constructor: SchemeConstructor) {
        self.constructors.insert(name, constructor);
    }

    pub fn lookup(&self, name: &str) -> Result<Box<dyn InterpolationScheme>> {
        match self.constructors.get(name) {
            Some(constructor) => Ok(constructor()),
            None => Err(WaveError::UnknownScheme {
                kind: "interpolation",
                name: name.to_string(),
                available: self.names().map(|n| n.to_string()).collect(),
            }),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.constructors.keys().copied()
    }
}

/// Process wide registry of the built-in schemes.
pub fn registry() -> &'static SchemeRegistry {
    static REGISTRY: OnceLock<SchemeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(SchemeRegistry::with_builtin)
}

pub fn interpolation_scheme(name: &str) -> Result<Box<dyn InterpolationScheme>> {
    registry().lookup(name)
}
