//! Template spec v0: JSON description of a template histogram and the
//! per-bin function built on top of it.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::path::Path;

use ph_binning::{Axis, DataHist};
use ph_core::{Error, Result};
use serde::Deserialize;

use crate::param_hist::ParamHistFunc;

/// Schema identifier accepted by [`FunctionSpecV0`].
pub const PARAMHIST_SPEC_V0: &str = "paramhist_spec_v0";

/// Top-level spec document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionSpecV0 {
    /// Must equal [`PARAMHIST_SPEC_V0`].
    pub schema_version: String,
    /// Function name (prefix of the parameter names).
    pub name: String,
    /// Relative (scale factor) or absolute (bin content) parameters.
    #[serde(default)]
    pub relative: bool,
    /// Template axes, outermost first.
    pub axes: Vec<AxisSpec>,
    /// Template contents in row-major bin order.
    pub contents: Vec<f64>,
    /// Optional per-bin errors. Defaults to `sqrt(|content|)`.
    #[serde(default)]
    pub errors: Option<Vec<f64>>,
    /// Bins released from constant after construction.
    #[serde(default)]
    pub floating: Vec<usize>,
    /// Parameter values applied after construction, keyed by bin.
    #[serde(default)]
    pub values: BTreeMap<usize, f64>,
}

/// Axis given either by `bins`/`min`/`max` or by explicit `edges`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisSpec {
    pub name: String,
    #[serde(default)]
    pub bins: Option<usize>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub edges: Option<Vec<f64>>,
}

impl AxisSpec {
    /// Build the axis.
    pub fn to_axis(&self) -> Result<Axis> {
        match (&self.edges, self.bins, self.min, self.max) {
            (Some(edges), None, None, None) => Axis::variable(self.name.clone(), edges.clone()),
            (None, Some(bins), Some(min), Some(max)) => {
                Axis::uniform(self.name.clone(), bins, min, max)
            }
            _ => Err(Error::Validation(format!(
                "axis '{}' needs either `edges` or all of `bins`, `min`, `max`",
                self.name
            ))),
        }
    }
}

impl FunctionSpecV0 {
    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: Self = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Read and parse a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<()> {
        if self.schema_version != PARAMHIST_SPEC_V0 {
            return Err(Error::Validation(format!(
                "unsupported schema_version '{}', expected '{PARAMHIST_SPEC_V0}'",
                self.schema_version
            )));
        }
        if self.name.is_empty() {
            return Err(Error::Validation("function name must not be empty".into()));
        }
        Ok(())
    }

    /// Template histogram described by the spec.
    pub fn build_template(&self) -> Result<DataHist> {
        let axes = self.axes.iter().map(AxisSpec::to_axis).collect::<Result<Vec<_>>>()?;
        DataHist::from_contents(axes, self.contents.clone(), self.errors.clone())
    }

    /// Build the template and the function, then apply `floating` and `values`.
    pub fn build(&self) -> Result<ParamHistFunc> {
        let hist = self.build_template()?.into_shared();
        let func = ParamHistFunc::new(self.name.clone(), hist, self.relative)?;
        for &bin in &self.floating {
            func.parameters().set_constant(bin, false)?;
        }
        for (&bin, &value) in &self.values {
            func.set_actual(bin, value)?;
        }
        Ok(func)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ph_core::RealFunction;

    const TWO_BIN: &str = r#"{
        "schema_version": "paramhist_spec_v0",
        "name": "bkg",
        "relative": true,
        "axes": [{ "name": "x", "bins": 2, "min": 0.0, "max": 2.0 }],
        "contents": [4.0, 9.0],
        "floating": [1],
        "values": { "1": 2.0 }
    }"#;

    #[test]
    fn test_build_two_bin() {
        let func = FunctionSpecV0::from_json(TWO_BIN).unwrap().build().unwrap();
        assert_eq!(func.name(), "bkg");
        assert!(func.is_relative());
        assert_eq!(func.actual(1).unwrap(), 2.0);
        assert!(func.parameters().is_constant(0).unwrap());
        assert!(!func.parameters().is_constant(1).unwrap());
        assert_eq!(func.evaluate(&[1.5]).unwrap(), 18.0);
    }

    #[test]
    fn test_variable_edges() {
        let json = r#"{
            "schema_version": "paramhist_spec_v0",
            "name": "h",
            "axes": [{ "name": "m", "edges": [0.0, 1.0, 4.0] }],
            "contents": [1.0, 2.0],
            "errors": [0.5, 0.5]
        }"#;
        let func = FunctionSpecV0::from_json(json).unwrap().build().unwrap();
        assert!(!func.is_relative());
        assert_eq!(func.nominal_error(0).unwrap(), 0.5);
    }

    #[test]
    fn test_rejects_bad_documents() {
        let wrong_version = TWO_BIN.replace("paramhist_spec_v0", "v9");
        assert!(matches!(FunctionSpecV0::from_json(&wrong_version), Err(Error::Validation(_))));
        assert!(matches!(FunctionSpecV0::from_json("{"), Err(Error::Json(_))));

        let mixed_axis = TWO_BIN.replace(r#""bins": 2,"#, r#""edges": [0.0, 2.0], "bins": 2,"#);
        assert!(FunctionSpecV0::from_json(&mixed_axis).unwrap().build().is_err());

        let bad_float = TWO_BIN.replace(r#""floating": [1]"#, r#""floating": [7]"#);
        assert!(matches!(
            FunctionSpecV0::from_json(&bad_float).unwrap().build(),
            Err(Error::OutOfRange { .. })
        ));
    }
}
