//! Integration with bin-sum fallback.
//!
//! [`ParamHistFunc`] only integrates analytically over its full observable set.
//! For any other subset the function is a step function in the integrated
//! axes, so summing `value * width` over the matching bins is exact.

use ph_core::{Error, RealFunction, Result};

use crate::param_hist::ParamHistFunc;

/// Integral of `func` over the observables named in `vars`.
///
/// `x` supplies the values of the observables that are not integrated; its
/// entries for integrated observables are ignored. `x` must have one entry per
/// observable unless every observable is integrated, in which case it may be empty.
pub fn integrate(func: &ParamHistFunc, vars: &[&str], x: &[f64]) -> Result<f64> {
    let code = func.analytic_integral_code(vars);
    if code.is_analytic() {
        return func.analytic_integral(code);
    }
    bin_sum_integral(func, vars, x)
}

/// Exact integral by summing bins, independent of the analytic code.
pub fn bin_sum_integral(func: &ParamHistFunc, vars: &[&str], x: &[f64]) -> Result<f64> {
    let observables = func.observables();
    let mut integrated = vec![false; observables.len()];
    for v in vars {
        let k = observables.iter().position(|o| o == v).ok_or_else(|| {
            Error::Validation(format!("'{v}' is not an observable of {}", func.name()))
        })?;
        integrated[k] = true;
    }
    let all = integrated.iter().all(|&b| b);
    if !(x.len() == observables.len() || (all && x.is_empty())) {
        return Err(Error::Index(format!(
            "expected {} observable values, got {}",
            observables.len(),
            x.len()
        )));
    }

    let h = func.template()?;
    let values = func.parameters().values()?;
    if h.axes().len() != observables.len() || h.n_bins() != values.len() {
        return Err(Error::Validation(format!(
            "{}: template has {} axes and {} bins, function has {} observables and {} parameters",
            func.name(),
            h.axes().len(),
            h.n_bins(),
            observables.len(),
            values.len()
        )));
    }
    // Template axis position and axis of each observable.
    let axes = observables
        .iter()
        .map(|o| {
            h.axis_index(o).map(|pos| (pos, &h.axes()[pos])).ok_or_else(|| {
                Error::Validation(format!("{}: template has no axis '{o}'", func.name()))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut fixed = vec![None; h.axes().len()];
    for (k, &(pos, ax)) in axes.iter().enumerate() {
        if integrated[k] {
            continue;
        }
        let c = ax.bin_index(x[k]).ok_or_else(|| {
            Error::Index(format!(
                "value {} outside axis '{}' [{}, {}]",
                x[k],
                ax.name(),
                ax.min(),
                ax.max()
            ))
        })?;
        fixed[pos] = Some(c);
    }

    let mut total = 0.0;
    for (bin, gamma) in values.iter().enumerate() {
        let coords = h.bin_coordinates(bin)?;
        if fixed.iter().zip(&coords).any(|(want, c)| want.is_some_and(|k| k != *c)) {
            continue;
        }
        let mut width = 1.0;
        for (k, &(pos, ax)) in axes.iter().enumerate() {
            if integrated[k] {
                width *= ax.bin_width(coords[pos])?;
            }
        }
        let value = if func.is_relative() { gamma * h.weight(bin)? } else { *gamma };
        total += value * width;
    }
    Ok(total)
}
