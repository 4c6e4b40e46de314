use numpy::ndarray::Array2;
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
use once_cell::sync::Lazy;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::MinerConfig;
use crate::error::MiningError;
use crate::rules::{mine_rules_from_array, streaming, RuleTable, StreamingMiner};

// Streaming miners alive on the Python side, keyed by handle
static MINERS: Lazy<Mutex<HashMap<usize, StreamingMiner>>> = Lazy::new(|| Mutex::new(HashMap::new()));
static NEXT_HANDLE: Lazy<Mutex<usize>> = Lazy::new(|| Mutex::new(0));

/// Columns: item_a, item_b, freq_ab, freq_a, freq_b
type IdColumns<'py> = Bound<'py, PyArray2<i64>>;
/// Columns: support_ab, support_a, support_b, confidence_a_to_b, confidence_b_to_a, lift
type MetricColumns<'py> = Bound<'py, PyArray2<f64>>;

fn to_py_err(err: MiningError) -> PyErr {
    match err {
        MiningError::InvalidMinSupport { .. }
        | MiningError::MalformedInput(_)
        | MiningError::ContractViolation { .. }
        | MiningError::Config(_) => PyValueError::new_err(err.to_string()),
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

fn rule_arrays<'py>(py: Python<'py>, rules: &RuleTable) -> PyResult<(IdColumns<'py>, MetricColumns<'py>)> {
    let n = rules.len();
    let mut ids = Vec::with_capacity(n * 5);
    let mut metrics = Vec::with_capacity(n * 6);

    for rule in rules {
        ids.extend([
            rule.item_a,
            rule.item_b,
            rule.freq_ab as i64,
            rule.freq_a as i64,
            rule.freq_b as i64,
        ]);
        metrics.extend([
            rule.support_ab,
            rule.support_a,
            rule.support_b,
            rule.confidence_a_to_b,
            rule.confidence_b_to_a,
            rule.lift,
        ]);
    }

    let ids = Array2::from_shape_vec((n, 5), ids)
        .map_err(|_| PyValueError::new_err("Failed to create array"))?;
    let metrics = Array2::from_shape_vec((n, 6), metrics)
        .map_err(|_| PyValueError::new_err("Failed to create array"))?;

    Ok((ids.into_pyarray(py), metrics.into_pyarray(py)))
}

fn with_miner<T>(
    handle: usize,
    f: impl FnOnce(&mut StreamingMiner) -> crate::error::Result<T>,
) -> PyResult<T> {
    let mut miners = MINERS
        .lock()
        .map_err(|e| PyRuntimeError::new_err(format!("Lock error: {}", e)))?;

    let miner = miners
        .get_mut(&handle)
        .ok_or_else(|| PyValueError::new_err("Invalid miner handle"))?;

    f(miner).map_err(to_py_err)
}

#[pyfunction]
#[pyo3(signature = (records, min_support, parallel = false))]
fn association_rules<'py>(
    py: Python<'py>,
    records: PyReadonlyArray2<'py, i64>,
    min_support: f64,
    parallel: bool,
) -> PyResult<(IdColumns<'py>, MetricColumns<'py>)> {
    let config = MinerConfig::new(min_support)
        .map_err(to_py_err)?
        .with_parallel(parallel);
    let outcome = mine_rules_from_array(records.as_array(), &config).map_err(to_py_err)?;
    rule_arrays(py, &outcome.rules)
}

#[pyfunction]
fn create_streaming_miner(min_support: f64) -> PyResult<usize> {
    let miner = MinerConfig::new(min_support)
        .and_then(StreamingMiner::new)
        .map_err(to_py_err)?;

    let mut next = NEXT_HANDLE
        .lock()
        .map_err(|e| PyRuntimeError::new_err(format!("Lock error: {}", e)))?;
    let handle = *next;
    *next += 1;
    drop(next);

    let mut miners = MINERS
        .lock()
        .map_err(|e| PyRuntimeError::new_err(format!("Lock error: {}", e)))?;
    miners.insert(handle, miner);

    Ok(handle)
}

#[pyfunction]
fn streaming_count_pass(handle: usize, chunk: PyReadonlyArray2<i64>) -> PyResult<()> {
    let chunk = chunk.as_array();
    with_miner(handle, |miner| streaming::count_pass(miner, chunk))
}

#[pyfunction]
fn streaming_finalize_counts(handle: usize) -> PyResult<()> {
    with_miner(handle, streaming::finalize_counts)
}

#[pyfunction]
fn streaming_size_pass(handle: usize, chunk: PyReadonlyArray2<i64>) -> PyResult<()> {
    let chunk = chunk.as_array();
    with_miner(handle, |miner| streaming::size_pass(miner, chunk))
}

#[pyfunction]
fn streaming_finalize_sizing(handle: usize) -> PyResult<()> {
    with_miner(handle, streaming::finalize_sizing)
}

#[pyfunction]
fn streaming_pair_pass(handle: usize, chunk: PyReadonlyArray2<i64>) -> PyResult<()> {
    let chunk = chunk.as_array();
    with_miner(handle, |miner| streaming::pair_pass(miner, chunk))
}

#[pyfunction]
fn streaming_finish<'py>(
    py: Python<'py>,
    handle: usize,
) -> PyResult<(IdColumns<'py>, MetricColumns<'py>)> {
    let outcome = with_miner(handle, streaming::finish)?;
    rule_arrays(py, &outcome.rules)
}

#[pyfunction]
fn streaming_cleanup(handle: usize) -> PyResult<()> {
    let mut miners = MINERS
        .lock()
        .map_err(|e| PyRuntimeError::new_err(format!("Lock error: {}", e)))?;

    miners
        .remove(&handle)
        .ok_or_else(|| PyValueError::new_err("Invalid miner handle"))?;

    Ok(())
}

#[pymodule]
fn pairwise(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(association_rules, m)?)?;
    m.add_function(wrap_pyfunction!(create_streaming_miner, m)?)?;
    m.add_function(wrap_pyfunction!(streaming_count_pass, m)?)?;
    m.add_function(wrap_pyfunction!(streaming_finalize_counts, m)?)?;
    m.add_function(wrap_pyfunction!(streaming_size_pass, m)?)?;
    m.add_function(wrap_pyfunction!(streaming_finalize_sizing, m)?)?;
    m.add_function(wrap_pyfunction!(streaming_pair_pass, m)?)?;
    m.add_function(wrap_pyfunction!(streaming_finish, m)?)?;
    m.add_function(wrap_pyfunction!(streaming_cleanup, m)?)?;
    Ok(())
}
