use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use tilefield_core::{FieldConfig, TileWorld, WorldFile};

fn load_world(world_json: &str, config_json: Option<&str>) -> PyResult<TileWorld> {
    let file: WorldFile = serde_json::from_str(world_json)
        .map_err(|e| PyValueError::new_err(format!("invalid world json: {e}")))?;
    let config = match config_json {
        Some(raw) => serde_json::from_str::<FieldConfig>(raw)
            .map_err(|e| PyValueError::new_err(format!("invalid config json: {e}")))?,
        None => FieldConfig::default(),
    };
    TileWorld::from_file(file, config).map_err(|e| PyValueError::new_err(e.to_string()))
}

#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Run one field pass and return the pass summary as JSON.
#[pyfunction]
#[pyo3(signature = (world_json, config_json=None))]
fn run_pass(world_json: &str, config_json: Option<&str>) -> PyResult<String> {
    let mut world = load_world(world_json, config_json)?;
    world.calculate_field();
    serde_json::to_string(&world.summary()).map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Positions of the candidate tiles the index returns for `(x, y)`.
#[pyfunction]
#[pyo3(signature = (world_json, x, y, config_json=None))]
fn candidates_at(
    world_json: &str,
    x: f64,
    y: f64,
    config_json: Option<&str>,
) -> PyResult<Vec<(f64, f64)>> {
    let mut world = load_world(world_json, config_json)?;
    world.calculate_field();
    Ok(world
        .candidates_at([x, y])
        .into_iter()
        .map(|t| (t.position[0], t.position[1]))
        .collect())
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_function(wrap_pyfunction!(run_pass, m)?)?;
    m.add_function(wrap_pyfunction!(candidates_at, m)?)?;
    Ok(())
}
