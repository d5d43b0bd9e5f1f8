//! gmm_sensitivity — optimal-sensitivity homotopy paths for misspecified GMM.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and, with the `python-bindings`
//! feature, as the PyO3 bridge exposing the path computation to Python via
//! the `_gmm_sensitivity` extension module.
//!
//! Key behaviors
//! -------------
//! - Re-export the core modules: [`sensitivity`] (models, coordinate
//!   transform, path tracing, results) and [`linalg`] (dense helpers on
//!   top of `nalgebra`).
//! - Define the `solve_path` Python function and the `#[pymodule]`
//!   initializer when `python-bindings` is enabled.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work lives in the inner modules; this file only does
//!   FFI glue, input conversion, and error mapping.
//! - Errors from core code are rich Rust types internally and become
//!   Python `ValueError`s at the boundary.
//!
//! Downstream usage
//! ----------------
//! - Rust callers use [`sensitivity::solve_path`] (or the
//!   [`sensitivity::prelude`]) and can ignore the PyO3 items.
//! - Python callers import `_gmm_sensitivity.solve_path(G, Sig, H, B,
//!   norm="inf")`, which returns `(lambdas, sensitivities)` numpy arrays.
//!
//! Testing notes
//! -------------
//! - Numerical behavior is covered by unit tests in the inner modules and by
//!   `tests/integration_sensitivity_path.rs`.

pub mod linalg;
pub mod sensitivity;
pub mod utils;

#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArray1, PyArray2};

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    sensitivity::{MomentModel, NormKind, solve_path},
    utils::{extract_f64_matrix, extract_f64_vector},
};

/// solve_path — Python entry point for the optimal-sensitivity path.
///
/// Parameters
/// ----------
/// - `g`: 2-D array-like, `dg × dk` moment Jacobian.
/// - `sig`: 2-D array-like, `dg × dg` symmetric positive-definite moment
///   covariance.
/// - `h`: 1-D array-like (or float when `dk = 1`), derivative of the
///   functional of interest.
/// - `b`: 2-D array-like, `dg × r` misspecification directions.
/// - `norm`: `"inf"` / `"linf"` / `"max"` for the max-norm ball, `"1"` /
///   `"l1"` for the one-norm ball. Defaults to `"inf"`.
///
/// Returns
/// -------
/// `(lambdas, sensitivities)`
///   A length-n array of path parameters and an `n × dg` array whose rows
///   are the sensitivity vectors at those knots.
///
/// Errors
/// ------
/// - `TypeError` when an input cannot be read as a float64 array.
/// - `ValueError` for invalid shapes, non-finite entries, singular
///   matrices, an unknown `norm`, or a breakdown of the homotopy.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(name = "solve_path", signature = (g, sig, h, b, norm = "inf"))]
fn py_solve_path<'py>(
    py: Python<'py>, g: &Bound<'py, PyAny>, sig: &Bound<'py, PyAny>, h: &Bound<'py, PyAny>,
    b: &Bound<'py, PyAny>, norm: &str,
) -> PyResult<(Bound<'py, PyArray1<f64>>, Bound<'py, PyArray2<f64>>)> {
    let g = extract_f64_matrix(g, "G")?;
    let sig = extract_f64_matrix(sig, "Sig")?;
    let h = extract_f64_vector(h, "H")?;
    let b = extract_f64_matrix(b, "B")?;
    let norm: NormKind = norm.parse()?;

    let model = MomentModel::new(g, sig, h)?;
    let path = solve_path(&model, &b, norm)?;

    let lambdas = path.lambdas().to_owned().into_pyarray(py);
    let sensitivities = path.sensitivities().to_owned().into_pyarray(py);
    Ok((lambdas, sensitivities))
}

/// _gmm_sensitivity — PyO3 module initializer.
///
/// Invoked by Python when importing the compiled extension; registers
/// [`py_solve_path`] as `solve_path`.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _gmm_sensitivity<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_solve_path, m)?)?;
    Ok(())
}
