//! Python bindings for host shells written in Python

use crate::core::metadata::MetadataReport;
use crate::core::normalize::normalize_variable;
use crate::core::visualize::{LogSink, VisualizeOptions, Visualizer};
use crate::io::{GriddedDataset, NetcdfDataset};
use crate::types::{ErrorKind, NcGeoError};
use numpy::ToPyArray;
use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::path::PathBuf;

fn to_py_err(err: NcGeoError) -> PyErr {
    match err.kind() {
        ErrorKind::InvalidDimensionality => PyValueError::new_err(err.to_string()),
        ErrorKind::DatasetAccess => PyIOError::new_err(err.to_string()),
        ErrorKind::BackingStoreFailure | ErrorKind::HostRejected => PyRuntimeError::new_err(err.to_string()),
    }
}

/// Python wrapper for an open NetCDF dataset
#[pyclass(name = "Dataset", unsendable)]
struct PyDataset {
    inner: NetcdfDataset,
}

#[pymethods]
impl PyDataset {
    #[new]
    fn new(path: String) -> PyResult<Self> {
        let inner = NetcdfDataset::open(&path).map_err(to_py_err)?;
        Ok(PyDataset { inner })
    }

    /// Text metadata report
    fn metadata_report(&self) -> String {
        MetadataReport::from_dataset(&self.inner).to_string()
    }

    /// (name, shape) for every variable
    fn variables(&self) -> Vec<(String, Vec<usize>)> {
        MetadataReport::from_dataset(&self.inner).variable_listing()
    }

    fn dimensions(&self) -> Vec<(String, usize)> {
        self.inner
            .dimensions()
            .into_iter()
            .map(|d| (d.name, d.len))
            .collect()
    }

    /// Normalized 2-D grid of a variable as a float32 numpy array
    fn read_normalized(&self, py: Python, variable: String) -> PyResult<PyObject> {
        let info = self.inner.require_variable(&variable).map_err(to_py_err)?;
        let grid = normalize_variable(&self.inner, &info, crate::core::normalize::DEFAULT_FILL_VALUE)
            .map_err(to_py_err)?;
        Ok(grid.data.to_pyarray(py).into())
    }

    /// Render a variable to GeoTIFF.
    ///
    /// Returns `(path, display_name, valid, summary)` for the host's layer registry.
    #[pyo3(signature = (variable, output_dir=None))]
    fn visualize(
        &self,
        variable: String,
        output_dir: Option<String>,
    ) -> PyResult<(String, String, bool, Option<String>)> {
        let options = VisualizeOptions {
            output_dir: output_dir.map(PathBuf::from),
            ..Default::default()
        };
        let sink = LogSink;
        let visualizer = Visualizer::new(&self.inner, options, &sink);
        let outcome = visualizer.render(&variable).map_err(to_py_err)?;
        let handoff = outcome.handoff();
        Ok((
            handoff.path.display().to_string(),
            handoff.display_name,
            handoff.valid,
            handoff.summary,
        ))
    }
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyDataset>()?;
    Ok(())
}
