//! utils — Python input extraction for the PyO3 bindings.
//!
//! Converts numpy arrays, pandas objects (via `to_numpy`) and plain nested
//! sequences into owned `ndarray` containers. Only compiled with the
//! `python-bindings` feature.

#[cfg(feature = "python-bindings")]
use ndarray::{Array1, Array2};

#[cfg(feature = "python-bindings")]
use numpy::{PyReadonlyArray1, PyReadonlyArray2};

#[cfg(feature = "python-bindings")]
use pyo3::{
    exceptions::{PyTypeError, PyValueError},
    prelude::*,
    types::PyAny,
};

/// Extract a 2-D float64 matrix named `name` from a Python object.
///
/// Accepts a 2-D `numpy.ndarray`, anything with a `to_numpy()` method
/// returning one (pandas `DataFrame`), or a sequence of equal-length float
/// sequences.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_matrix<'py>(raw: &Bound<'py, PyAny>, name: &str) -> PyResult<Array2<f64>> {
    if let Ok(arr) = raw.extract::<PyReadonlyArray2<f64>>() {
        return Ok(arr.as_array().to_owned());
    }

    if let Ok(obj) = raw.call_method0("to_numpy") {
        if let Ok(arr) = obj.extract::<PyReadonlyArray2<f64>>() {
            return Ok(arr.as_array().to_owned());
        }
    }

    let rows: Vec<Vec<f64>> = raw.extract().map_err(|_| {
        PyTypeError::new_err(format!(
            "{name} must be a 2-D numpy.ndarray, pandas.DataFrame, or sequence of float64 rows"
        ))
    })?;
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|row| row.len() != n_cols) {
        return Err(PyValueError::new_err(format!("{name} has rows of different lengths")));
    }
    Array2::from_shape_vec((n_rows, n_cols), rows.into_iter().flatten().collect())
        .map_err(|e| PyValueError::new_err(format!("{name}: {e}")))
}

/// Extract a 1-D float64 vector named `name` from a Python object.
///
/// Accepts a 1-D `numpy.ndarray`, a pandas `Series`, a sequence of floats,
/// or a single float (a length-1 vector).
#[cfg(feature = "python-bindings")]
pub fn extract_f64_vector<'py>(raw: &Bound<'py, PyAny>, name: &str) -> PyResult<Array1<f64>> {
    if let Ok(arr) = raw.extract::<PyReadonlyArray1<f64>>() {
        return Ok(arr.as_array().to_owned());
    }

    if let Ok(value) = raw.extract::<f64>() {
        return Ok(Array1::from_elem(1, value));
    }

    if let Ok(obj) = raw.call_method0("to_numpy") {
        if let Ok(arr) = obj.extract::<PyReadonlyArray1<f64>>() {
            return Ok(arr.as_array().to_owned());
        }
    }

    let values: Vec<f64> = raw.extract().map_err(|_| {
        PyTypeError::new_err(format!(
            "{name} must be a 1-D numpy.ndarray, pandas.Series, sequence of float64, or float"
        ))
    })?;
    Ok(Array1::from(values))
}
