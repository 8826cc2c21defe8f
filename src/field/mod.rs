//! Named cell fields and the store that owns them.

mod dimensions;

pub use dimensions::*;

use crate::domain::*;
use crate::error::{Result, WaveError};
use crate::util::*;
use std::collections::BTreeMap;

/// A named scalar quantity with one value per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Field<const GRID_DIMENSION: usize> {
    name: String,
    dimensions: DimensionSet,
    values: OwnedDomain<GRID_DIMENSION>,
}

impl<const GRID_DIMENSION: usize> Field<GRID_DIMENSION> {
    pub fn new(
        name: impl Into<String>,
        dimensions: DimensionSet,
        values: OwnedDomain<GRID_DIMENSION>,
    ) -> Self {
        Field {
            name: name.into(),
            dimensions,
            values,
        }
    }

    pub fn uniform(
        name: impl Into<String>,
        dimensions: DimensionSet,
        aabb: AABB<GRID_DIMENSION>,
        value: f64,
    ) -> Self {
        Self::new(name, dimensions, OwnedDomain::uniform(aabb, value))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> &DimensionSet {
        &self.dimensions
    }

    pub fn domain(&self) -> &OwnedDomain<GRID_DIMENSION> {
        &self.values
    }

    pub fn values(&self) -> &[f64] {
        self.values.buffer()
    }

    pub fn len(&self) -> usize {
        self.values.buffer().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace all values, the length must match the grid.
    pub fn set_values(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.len() {
            return Err(WaveError::invalid(format!(
                "field {} has {} cells, got {} values",
                self.name,
                self.len(),
                values.len()
            )));
        }
        self.values.buffer_mut().copy_from_slice(values);
        Ok(())
    }

    /// Immutable copy of the current values, used for time history levels.
    pub fn snapshot(&self) -> Vec<f64> {
        self.values.buffer().to_vec()
    }
}

/// Owns every field of a run, keyed by name.
///
/// Only the time loop holds this mutably; other components borrow
/// individual fields for the duration of one call.
#[derive(Debug, Clone, Default)]
pub struct FieldStore<const GRID_DIMENSION: usize> {
    fields: BTreeMap<String, Field<GRID_DIMENSION>>,
}

impl<const GRID_DIMENSION: usize> FieldStore<GRID_DIMENSION> {
    pub fn new() -> Self {
        FieldStore {
            fields: BTreeMap::new(),
        }
    }

    /// Register a field, replacing any field of the same name.
    pub fn insert(&mut self, field: Field<GRID_DIMENSION>) {
        self.fields.insert(field.name().to_string(), field);
    }

    pub fn get(&self, name: &str) -> Result<&Field<GRID_DIMENSION>> {
        self.fields.get(name).ok_or_else(|| self.unknown(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Field<GRID_DIMENSION>> {
        if !self.fields.contains_key(name) {
            return Err(self.unknown(name));
        }
        self.fields.get_mut(name).ok_or_else(|| WaveError::UnknownField {
            name: name.to_string(),
            available: Vec::new(),
        })
    }

    pub fn set(&mut self, name: &str, values: &[f64]) -> Result<()> {
        self.get_mut(name)?.set_values(values)
    }

    pub fn snapshot(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.get(name)?.snapshot())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    fn unknown(&self, name: &str) -> WaveError {
        WaveError::UnknownField {
            name: name.to_string(),
            available: self.names().map(|n| n.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    fn store() -> FieldStore<1> {
        let aabb = AABB::new(matrix![0, 3]);
        let mut store = FieldStore::new();
        store.insert(Field::uniform("h", DIMLESS, aabb, 0.0));
        store.insert(Field::uniform("C", DIM_VELOCITY, aabb, 1.0));
        store
    }

    #[test]
    fn get_and_set() {
        let mut store = store();
        store.set("h", &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(store.get("h").unwrap().values(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(store.get("C").unwrap().dimensions(), &DIM_VELOCITY);
    }

    #[test]
    fn unknown_field() {
        let mut store = store();
        match store.get("U") {
            Err(WaveError::UnknownField { name, available }) => {
                assert_eq!(name, "U");
                assert_eq!(available, vec!["C".to_string(), "h".to_string()]);
            }
            other => panic!("expected UnknownField, got {other:?}"),
        }
        assert!(matches!(
            store.set("p", &[0.0; 4]),
            Err(WaveError::UnknownField { .. })
        ));
    }

    #[test]
    fn wrong_length_is_rejected() {
        let mut store = store();
        assert!(matches!(
            store.set("h", &[1.0]),
            Err(WaveError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn snapshot_is_a_copy() {
        let mut store = store();
        let before = store.snapshot("h").unwrap();
        store.set("h", &[5.0; 4]).unwrap();
        assert_eq!(before, vec![0.0; 4]);
        assert_eq!(store.snapshot("h").unwrap(), vec![5.0; 4]);
    }
}
