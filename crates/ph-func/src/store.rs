//! Bin-indexed parameter store.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ph_core::{Error, Result};
use serde::Serialize;

/// One scalar parameter attached to a bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    /// Stable parameter name.
    pub name: String,
    /// Current value.
    pub value: f64,
    /// Uncertainty estimate (may be `+inf` for degenerate bins).
    pub error: f64,
    /// Initial guess window `(low, high)`. Not enforced on `set`.
    pub bounds: (f64, f64),
    /// Held fixed (excluded from free optimization).
    pub constant: bool,
}

/// Ordered parameters, one per bin.
///
/// Cloning a store yields another handle to the same parameters: a value set
/// through one handle is seen by every other. The number of parameters is fixed
/// at construction.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    inner: Arc<RwLock<Vec<Parameter>>>,
    len: usize,
}

impl ParameterStore {
    /// Take ownership of `params` (in bin order).
    pub fn from_parameters(params: Vec<Parameter>) -> Self {
        let len = params.len();
        Self { inner: Arc::new(RwLock::new(params)), len }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Parameter>>> {
        self.inner.read().map_err(|_| Error::Computation("parameter store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Parameter>>> {
        self.inner.write().map_err(|_| Error::Computation("parameter store lock poisoned".into()))
    }

    fn with<T>(&self, bin: usize, f: impl FnOnce(&Parameter) -> T) -> Result<T> {
        let params = self.read()?;
        params.get(bin).map(f).ok_or_else(|| Error::bin_out_of_range(bin, params.len()))
    }

    fn with_mut(&self, bin: usize, f: impl FnOnce(&mut Parameter)) -> Result<()> {
        let mut params = self.write()?;
        let len = params.len();
        params.get_mut(bin).map(f).ok_or_else(|| Error::bin_out_of_range(bin, len))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value of bin `bin`.
    pub fn get(&self, bin: usize) -> Result<f64> {
        self.with(bin, |p| p.value)
    }

    /// Set the value of bin `bin`. Values are not clamped to the bounds.
    pub fn set(&self, bin: usize, value: f64) -> Result<()> {
        self.with_mut(bin, |p| p.value = value)
    }

    /// Error of bin `bin`.
    pub fn error(&self, bin: usize) -> Result<f64> {
        self.with(bin, |p| p.error)
    }

    /// Set the error of bin `bin`.
    pub fn set_error(&self, bin: usize, error: f64) -> Result<()> {
        self.with_mut(bin, |p| p.error = error)
    }

    /// Whether bin `bin` is held constant.
    pub fn is_constant(&self, bin: usize) -> Result<bool> {
        self.with(bin, |p| p.constant)
    }

    /// Fix (`true`) or release (`false`) bin `bin`.
    pub fn set_constant(&self, bin: usize, constant: bool) -> Result<()> {
        self.with_mut(bin, |p| p.constant = constant)
    }

    /// Name of bin `bin`'s parameter.
    pub fn name(&self, bin: usize) -> Result<String> {
        self.with(bin, |p| p.name.clone())
    }

    /// Bounds of bin `bin`'s parameter.
    pub fn bounds(&self, bin: usize) -> Result<(f64, f64)> {
        self.with(bin, |p| p.bounds)
    }

    /// Copy of all parameters.
    pub fn snapshot(&self) -> Result<Vec<Parameter>> {
        Ok(self.read()?.clone())
    }

    /// Current values in bin order.
    pub fn values(&self) -> Result<Vec<f64>> {
        Ok(self.read()?.iter().map(|p| p.value).collect())
    }

    /// Overwrite all values at once.
    pub fn set_values(&self, values: &[f64]) -> Result<()> {
        let mut params = self.write()?;
        if values.len() != params.len() {
            return Err(Error::Validation(format!(
                "parameter value length mismatch: expected {}, got {}",
                params.len(),
                values.len()
            )));
        }
        for (p, &v) in params.iter_mut().zip(values) {
            p.value = v;
        }
        Ok(())
    }

    /// Bins whose parameters are not constant.
    pub fn free_indices(&self) -> Result<Vec<usize>> {
        Ok(self.read()?.iter().enumerate().filter(|(_, p)| !p.constant).map(|(i, _)| i).collect())
    }

    /// `true` if both handles refer to the same parameters.
    pub fn shares_with(&self, other: &ParameterStore) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn store(n: usize) -> ParameterStore {
        ParameterStore::from_parameters(
            (0..n)
                .map(|i| Parameter {
                    name: format!("p_gamma_bin_{i}"),
                    value: 1.0,
                    error: 0.1,
                    bounds: (0.0, 1000.0),
                    constant: true,
                })
                .collect(),
        )
    }

    #[test]
    fn test_range_contract() {
        let s = store(2);
        assert!(matches!(s.get(2), Err(Error::OutOfRange { index: 2, len: 2, .. })));
        assert!(s.set(5, 1.0).is_err());
        assert!(s.is_constant(2).is_err());
    }

    #[test]
    fn test_no_clamping() {
        let s = store(1);
        s.set(0, 5000.0).unwrap();
        assert_eq!(s.get(0).unwrap(), 5000.0);
        s.set(0, -3.0).unwrap();
        assert_eq!(s.get(0).unwrap(), -3.0);
    }

    #[test]
    fn test_clone_aliases() {
        let a = store(3);
        let b = a.clone();
        assert!(a.shares_with(&b));
        b.set(1, 7.0).unwrap();
        assert_eq!(a.get(1).unwrap(), 7.0);
        assert!(!a.shares_with(&store(3)));
    }

    #[test]
    fn test_free_indices_and_bulk_values() {
        let s = store(4);
        assert!(s.free_indices().unwrap().is_empty());
        s.set_constant(1, false).unwrap();
        s.set_constant(3, false).unwrap();
        assert_eq!(s.free_indices().unwrap(), vec![1, 3]);
        s.set_values(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(s.values().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
        assert!(s.set_values(&[1.0]).is_err());
    }

    #[test]
    fn test_poisoned_lock_surfaces_as_computation() {
        let s = store(3);
        let alias = s.clone();
        let _ = std::thread::spawn(move || {
            let _guard = alias.inner.write().unwrap();
            panic!("writer failed while holding the store");
        })
        .join();
        assert_eq!(s.len(), 3);
        assert!(!s.is_empty());
        assert!(matches!(s.get(0), Err(Error::Computation(_))));
        assert!(matches!(s.values(), Err(Error::Computation(_))));
    }

    proptest! {
        #[test]
        fn prop_set_get_roundtrip(bin in 0usize..8, v in proptest::num::f64::ANY) {
            let s = store(8);
            s.set(bin, v).unwrap();
            let got = s.get(bin).unwrap();
            prop_assert!(got == v || (got.is_nan() && v.is_nan()));
        }
    }
}
